//! Target-size planning for vertical stacking.
//!
//! The first video in stacking order is the reference: it fixes the output width, frame rate and
//! frame count, and is never rescaled. Every other asset gets a target size whose width equals
//! the reference width.

use crate::{
    assets::asset::Asset,
    foundation::{
        core::{Constraint, Fps},
        error::{StackError, StackResult},
    },
};

/// Target size of one asset within the composite.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetPlan {
    /// Width of this asset's band; equal to the reference width.
    pub target_width: u32,
    /// Height of this asset's band.
    pub target_height: u32,
}

/// Sizing decisions for one combination run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackPlan {
    /// Index of the reference video in stacking order.
    pub reference: usize,
    /// Output frame rate (reference fps).
    pub fps: Fps,
    /// Output frame count (reference frame count).
    pub frame_count: u64,
    /// Output width (reference width).
    pub width: u32,
    /// Output height: sum of all target heights.
    pub total_height: u32,
    /// One entry per asset, in stacking order.
    pub targets: Vec<AssetPlan>,
}

/// Height that keeps a `src_w x src_h` aspect ratio at `target_w`, rounded, at least 1.
pub fn aspect_height(src_w: u32, src_h: u32, target_w: u32) -> u32 {
    if src_w == 0 {
        return src_h.max(1);
    }
    let aspect = f64::from(src_w) / f64::from(src_h);
    ((f64::from(target_w) / aspect).round() as u32).max(1)
}

/// Compute per-asset target sizes.
///
/// - The reference video keeps its own size.
/// - Images: `Width` keeps their aspect ratio at the reference width; `Height` forces them to the
///   full reference size.
/// - Other videos are fitted to the reference size.
pub fn plan_stack(assets: &[Asset], constraint: Constraint) -> StackResult<StackPlan> {
    let (reference, ref_video) = assets
        .iter()
        .enumerate()
        .find_map(|(idx, a)| a.as_video().map(|v| (idx, v)))
        .ok_or(StackError::NoVideoAsset)?;

    let ref_w = ref_video.width();
    let ref_h = ref_video.height();

    let mut targets = Vec::with_capacity(assets.len());
    let mut total_height = 0u32;
    for (idx, asset) in assets.iter().enumerate() {
        let target_height = match asset {
            // Non-reference videos are resized to the reference frame at stream time.
            Asset::Video(_) => ref_h,
            Asset::Image(image) => match constraint {
                Constraint::Width => aspect_height(image.width(), image.height(), ref_w),
                Constraint::Height => ref_h,
            },
        };
        tracing::debug!(
            idx,
            path = %asset.path().display(),
            kind = %asset.kind(),
            native = %format!("{}x{}", asset.width(), asset.height()),
            target = %format!("{ref_w}x{target_height}"),
            "planned asset"
        );

        total_height = total_height.checked_add(target_height).ok_or_else(|| {
            StackError::validation("combined output height overflows u32")
        })?;
        targets.push(AssetPlan {
            target_width: ref_w,
            target_height,
        });
    }

    Ok(StackPlan {
        reference,
        fps: ref_video.fps(),
        frame_count: ref_video.frame_count(),
        width: ref_w,
        total_height,
        targets,
    })
}
