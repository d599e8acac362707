//! mediastack stacks still images and video clips vertically into a single output video.
//!
//! # Pipeline overview
//!
//! 1. **Discover** (folder mode): list the images/videos of a directory in file-name order.
//! 2. **Open**: decode images up front, probe videos and start their decoders.
//! 3. **Plan**: the first video is the reference; every asset gets a target size whose width is
//!    the reference width.
//! 4. **Stream**: per output frame, take one band from every asset, stack top to bottom, push to
//!    a [`FrameSink`].
//!
//! Video decoding and encoding go through the system `ffmpeg`/`ffprobe` binaries; images are
//! decoded with the `image` crate. Frames are RGB8 end-to-end.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod assets;
mod combiner;
mod compose;
/// Startup defaults and their environment overrides.
pub mod config;
mod discover;
/// Output sinks.
pub mod encode;
mod foundation;
mod mode;
mod plan;

pub use crate::foundation::core::{
    Constraint, Fps, FrameIndex, FrameRgb, ImagePosition, MediaKind, RGB_CHANNELS,
};
pub use crate::foundation::error::{StackError, StackResult};

pub use crate::assets::asset::{Asset, ImageAsset, VideoAsset, VideoFrames};
pub use crate::assets::decode::{decode_image, open_image};
pub use crate::assets::media::{
    FfmpegDecoder, MemoryDecoder, VideoDecoder, VideoSourceInfo, is_ffmpeg_on_path,
    is_ffprobe_on_path, probe_video,
};
pub use crate::assets::store::AssetSet;
pub use crate::combiner::{CombineStats, SingleOpts, VideoCombiner};
pub use crate::compose::{crop_bottom, resize_frame, vstack};
pub use crate::config::Settings;
pub use crate::discover::{
    DiscoveredAsset, IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, classify, discover,
};
pub use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, OUTPUT_FOURCC, ensure_parent_dir};
pub use crate::encode::sink::{FrameSink, InMemorySink, SinkConfig};
pub use crate::mode::{RunMode, resolve_mode};
pub use crate::plan::{AssetPlan, StackPlan, aspect_height, plan_stack};
