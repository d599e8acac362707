//! Raster primitives used by the compositor: resize, bottom crop and vertical stacking.

use image::{RgbImage, imageops::FilterType};

use crate::foundation::{
    core::FrameRgb,
    error::{StackError, StackResult},
};

/// Resize `frame` to exactly `width x height` (bilinear).
///
/// Returns the input unchanged when it already has the requested size.
pub fn resize_frame(frame: FrameRgb, width: u32, height: u32) -> StackResult<FrameRgb> {
    if frame.has_size(width, height) {
        return Ok(frame);
    }
    if width == 0 || height == 0 {
        return Err(StackError::validation(format!(
            "cannot resize to {width}x{height}"
        )));
    }

    let (src_w, src_h) = (frame.width, frame.height);
    let img = RgbImage::from_raw(src_w, src_h, frame.data).ok_or_else(|| {
        StackError::validation(format!("frame buffer does not match {src_w}x{src_h}"))
    })?;
    let resized = image::imageops::resize(&img, width, height, FilterType::Triangle);
    FrameRgb::from_raw(width, height, resized.into_raw())
}

/// Drop the bottom `rows` rows of `frame`. Width is never changed.
pub fn crop_bottom(mut frame: FrameRgb, rows: u32) -> StackResult<FrameRgb> {
    if rows == 0 {
        return Ok(frame);
    }
    if rows >= frame.height {
        return Err(StackError::validation(format!(
            "crop of {rows} rows leaves nothing of a {}-row frame",
            frame.height
        )));
    }
    frame.height -= rows;
    let keep = frame.height as usize * frame.stride();
    frame.data.truncate(keep);
    Ok(frame)
}

/// Concatenate equal-width frames top to bottom.
pub fn vstack<'a>(frames: impl IntoIterator<Item = &'a FrameRgb>) -> StackResult<FrameRgb> {
    let mut iter = frames.into_iter().peekable();
    let width = iter
        .peek()
        .map(|f| f.width)
        .ok_or_else(|| StackError::validation("vstack needs at least one frame"))?;

    let mut height = 0u32;
    let mut data = Vec::new();
    for f in iter {
        if f.width != width {
            return Err(StackError::validation(format!(
                "vstack width mismatch: got {}, expected {width}",
                f.width
            )));
        }
        height += f.height;
        data.extend_from_slice(&f.data);
    }

    FrameRgb::from_raw(width, height, data)
}
