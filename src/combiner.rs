//! The per-frame compositing loop.
//!
//! A run goes through four phases:
//!
//! 1. **Init**: open every asset (fail fast on the first that does not load).
//! 2. **Planning**: pick the reference video, compute target sizes, pre-scale images once.
//! 3. **Streaming**: for each output frame, pull one band per asset, stack, push to the sink.
//! 4. **Finalize**: close the sink and release every asset, on success and on failure alike.
//!
//! A video that runs out before the reference contributes solid black bands from then on.

use std::{borrow::Cow, path::Path};

use crate::{
    assets::{
        asset::{Asset, ImageAsset, VideoAsset},
        store::AssetSet,
    },
    compose::{resize_frame, vstack},
    discover::discover,
    encode::{
        ffmpeg::{FfmpegSink, FfmpegSinkOpts},
        sink::{FrameSink, SinkConfig},
    },
    foundation::{
        core::{Constraint, Fps, FrameIndex, FrameRgb, ImagePosition},
        error::{StackError, StackResult},
    },
    plan::{AssetPlan, StackPlan, plan_stack},
};

/// Options for the single video + image mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SingleOpts {
    /// Rows removed from the bottom of every video frame.
    pub crop_bottom: u32,
    /// Image above or below the video.
    pub image_position: ImagePosition,
}

/// Summary of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CombineStats {
    /// Frames pushed to the sink.
    pub frames_written: u64,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
}

/// Stacks assets vertically into one video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VideoCombiner {
    constraint: Constraint,
}

impl VideoCombiner {
    /// Create a combiner using `constraint` for folder runs.
    pub fn new(constraint: Constraint) -> Self {
        Self { constraint }
    }

    /// Create a combiner from a constraint name (`width` or `height`).
    pub fn from_name(constraint: &str) -> StackResult<Self> {
        constraint.parse().map(Self::new)
    }

    /// Scaling policy in use.
    pub fn constraint(&self) -> Constraint {
        self.constraint
    }

    /// Stack every media file of `folder` (in file-name order) into `output`.
    ///
    /// Discovery, loading and planning all happen before `output` is created.
    #[tracing::instrument(skip(self), fields(constraint = %self.constraint))]
    pub fn combine_from_folder(&self, folder: &Path, output: &Path) -> StackResult<CombineStats> {
        let entries = discover(folder)?;
        if entries.is_empty() {
            return Err(StackError::EmptyFolder(folder.to_path_buf()));
        }

        let mut assets = AssetSet::load(&entries)?;
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(output));
        let result = self.combine_assets(&mut assets, &mut sink);
        assets.release_all();
        result
    }

    /// Stack one image above or below one video into `output`.
    #[tracing::instrument(skip(self))]
    pub fn combine_single(
        &self,
        video: &Path,
        image: &Path,
        output: &Path,
        opts: SingleOpts,
    ) -> StackResult<CombineStats> {
        let video = VideoAsset::open(video)?;
        let image = ImageAsset::open(image)?;
        let mut sink = FfmpegSink::new(FfmpegSinkOpts::new(output));
        self.combine_pair(video, image, opts, &mut sink)
    }

    /// Single-mode engine over already opened assets and an arbitrary sink.
    ///
    /// The image is always scaled to the video width with its aspect ratio kept, whatever the
    /// combiner's constraint.
    pub fn combine_pair(
        &self,
        mut video: VideoAsset,
        image: ImageAsset,
        opts: SingleOpts,
        sink: &mut dyn FrameSink,
    ) -> StackResult<CombineStats> {
        video.set_crop_bottom(opts.crop_bottom)?;
        if self.constraint != Constraint::Width {
            tracing::debug!(
                constraint = %self.constraint,
                "single mode always scales the image to the video width"
            );
        }

        let (video, image) = (Asset::Video(video), Asset::Image(image));
        let mut assets = AssetSet::new(match opts.image_position {
            ImagePosition::Top => vec![image, video],
            ImagePosition::Bottom => vec![video, image],
        });

        let result = Self::new(Constraint::Width).combine_assets(&mut assets, sink);
        assets.release_all();
        result
    }

    /// Plan and stream `assets` (in stacking order) into `sink`.
    ///
    /// The sink is closed before returning, also when streaming fails; frames pushed before a
    /// failure stay in the output. Releasing the assets is left to their owner.
    #[tracing::instrument(skip(self, assets, sink), fields(constraint = %self.constraint, assets = assets.len()))]
    pub fn combine_assets(
        &self,
        assets: &mut [Asset],
        sink: &mut dyn FrameSink,
    ) -> StackResult<CombineStats> {
        let plan = plan_stack(assets, self.constraint)?;
        tracing::debug!(
            reference = %assets[plan.reference].path().display(),
            width = plan.width,
            height = plan.total_height,
            fps = %plan.fps,
            frames = plan.frame_count,
            "planned stack"
        );

        let cached = prescale_images(assets, &plan)?;
        for asset in assets.iter_mut() {
            asset.reset()?;
        }

        let cfg = SinkConfig {
            width: plan.width,
            height: plan.total_height,
            fps: plan.fps,
        };
        sink.begin(cfg)?;

        let streamed = stream_frames(&plan, assets, &cached, sink);
        let closed = sink.end();
        let frames_written = match (streamed, closed) {
            (Ok(n), Ok(())) => n,
            (Ok(_), Err(e)) => return Err(e),
            (Err(e), closed) => {
                if let Err(close_err) = closed {
                    tracing::warn!("closing sink after failed stream also failed: {close_err}");
                }
                return Err(e);
            }
        };

        let stats = CombineStats {
            frames_written,
            width: plan.width,
            height: plan.total_height,
            fps: plan.fps,
        };
        tracing::info!(
            frames = stats.frames_written,
            width = stats.width,
            height = stats.height,
            "combined assets"
        );
        Ok(stats)
    }
}

/// Scale each image once to its target; videos get `None`.
fn prescale_images(assets: &[Asset], plan: &StackPlan) -> StackResult<Vec<Option<FrameRgb>>> {
    assets
        .iter()
        .zip(&plan.targets)
        .map(|(asset, target)| match asset {
            Asset::Image(image) => image
                .scaled_to(target.target_width, target.target_height)
                .map(Some),
            Asset::Video(_) => Ok(None),
        })
        .collect()
}

fn stream_frames(
    plan: &StackPlan,
    assets: &mut [Asset],
    cached: &[Option<FrameRgb>],
    sink: &mut dyn FrameSink,
) -> StackResult<u64> {
    let mut exhausted = vec![false; assets.len()];

    for t in 0..plan.frame_count {
        let mut bands: Vec<Cow<'_, FrameRgb>> = Vec::with_capacity(assets.len());
        for (idx, asset) in assets.iter_mut().enumerate() {
            let band = match &cached[idx] {
                Some(frame) => Cow::Borrowed(frame),
                None => Cow::Owned(video_band(
                    asset,
                    plan.targets[idx],
                    &mut exhausted[idx],
                    t,
                )?),
            };
            bands.push(band);
        }

        let composite = vstack(bands.iter().map(|b| &**b))?;
        sink.push_frame(FrameIndex(t), &composite)?;
    }

    Ok(plan.frame_count)
}

/// Next band of a video asset at its target size, or black once it is exhausted.
fn video_band(
    asset: &mut Asset,
    target: AssetPlan,
    exhausted: &mut bool,
    t: u64,
) -> StackResult<FrameRgb> {
    let frame = if *exhausted {
        None
    } else {
        asset.get_frame()?
    };

    match frame {
        Some(frame) => resize_frame(frame, target.target_width, target.target_height),
        None => {
            if !*exhausted {
                tracing::debug!(
                    path = %asset.path().display(),
                    frame = t,
                    "video exhausted; substituting black frames"
                );
                *exhausted = true;
            }
            Ok(FrameRgb::black(target.target_width, target.target_height))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_accepts_width_and_height() {
        assert_eq!(
            VideoCombiner::from_name("width").unwrap().constraint(),
            Constraint::Width
        );
        assert_eq!(
            VideoCombiner::from_name("height").unwrap().constraint(),
            Constraint::Height
        );
    }

    #[test]
    fn from_name_rejects_other_values() {
        let err = VideoCombiner::from_name("invalid").unwrap_err();
        assert!(matches!(err, StackError::InvalidConstraint(_)));
        assert!(err.to_string().contains("invalid constraint"));
    }

    #[test]
    fn empty_folder_fails_before_creating_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out").join("result.mp4");
        let err = VideoCombiner::default()
            .combine_from_folder(dir.path(), &out)
            .unwrap_err();
        assert!(matches!(err, StackError::EmptyFolder(_)));
        assert!(err.to_string().contains("no media files found"));
        assert!(!out.exists());
        assert!(!out.parent().unwrap().exists());
    }

    #[test]
    fn folder_of_unknown_files_counts_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        let err = VideoCombiner::default()
            .combine_from_folder(dir.path(), &dir.path().join("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, StackError::EmptyFolder(_)));
    }

    #[cfg(unix)]
    #[test]
    fn failing_ffmpeg_decoder_aborts_instead_of_blacking_out() {
        use std::os::unix::fs::PermissionsExt as _;

        use crate::{
            assets::media::{FfmpegDecoder, VideoSourceInfo},
            encode::sink::InMemorySink,
        };

        // One 4x2 frame, then a non-zero exit.
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("ffmpeg");
        std::fs::write(
            &program,
            "#!/bin/sh\nhead -c 24 /dev/zero\necho 'Decoder error' >&2\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

        let info = VideoSourceInfo {
            source_path: dir.path().join("clip.mp4"),
            width: 4,
            height: 2,
            fps: Fps::new(30, 1).unwrap(),
            frame_count: 5,
        };
        let decoder = FfmpegDecoder::launch(info.clone(), program).unwrap();
        let video = VideoAsset::from_checked_decoder(info, Box::new(decoder)).unwrap();
        let mut assets = AssetSet::new(vec![Asset::Video(video)]);
        let mut sink = InMemorySink::new();

        let err = VideoCombiner::default()
            .combine_assets(&mut assets, &mut sink)
            .unwrap_err();
        assert!(matches!(err, StackError::Media(_)));
        assert!(err.to_string().contains("Decoder error"));
        assert!(sink.is_ended());
        assert_eq!(sink.frames().len(), 1);
    }

    #[test]
    fn missing_folder_is_not_a_directory() {
        let err = VideoCombiner::default()
            .combine_from_folder(Path::new("/nonexistent/path"), Path::new("out.mp4"))
            .unwrap_err();
        assert!(matches!(err, StackError::NotADirectory(_)));
    }
}
