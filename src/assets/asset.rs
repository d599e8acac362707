use std::path::{Path, PathBuf};

use crate::{
    assets::{
        decode::open_image,
        media::{FfmpegDecoder, VideoDecoder, VideoSourceInfo, probe_video},
    },
    compose::{crop_bottom, resize_frame},
    foundation::{
        core::{Fps, FrameRgb, MediaKind},
        error::{StackError, StackResult},
    },
    plan::aspect_height,
};

/// A still image: one decoded buffer reproduced on every read.
#[derive(Clone, Debug)]
pub struct ImageAsset {
    path: PathBuf,
    frame: FrameRgb,
}

impl ImageAsset {
    /// Decode the image at `path`; fails with [`StackError::AssetLoad`].
    pub fn open(path: impl AsRef<Path>) -> StackResult<Self> {
        let path = path.as_ref();
        let frame = open_image(path)
            .map_err(|e| StackError::asset_load(path, MediaKind::Image, e.to_string()))?;
        if frame.width == 0 || frame.height == 0 {
            return Err(StackError::asset_load(
                path,
                MediaKind::Image,
                "image has zero width or height",
            ));
        }
        tracing::debug!(path = %path.display(), width = frame.width, height = frame.height, "opened image asset");
        Ok(Self {
            path: path.to_path_buf(),
            frame,
        })
    }

    /// Wrap an already decoded frame.
    pub fn from_frame(path: impl Into<PathBuf>, frame: FrameRgb) -> Self {
        Self {
            path: path.into(),
            frame,
        }
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Native width in pixels.
    pub fn width(&self) -> u32 {
        self.frame.width
    }

    /// Native height in pixels.
    pub fn height(&self) -> u32 {
        self.frame.height
    }

    /// Borrow the decoded buffer.
    pub fn frame(&self) -> &FrameRgb {
        &self.frame
    }

    /// A copy of the decoded buffer. Never exhausts.
    pub fn get_frame(&self) -> FrameRgb {
        self.frame.clone()
    }

    /// Aspect-preserving copy at `target_width`.
    pub fn get_scaled(&self, target_width: u32) -> StackResult<FrameRgb> {
        let target_height = aspect_height(self.width(), self.height(), target_width);
        self.scaled_to(target_width, target_height)
    }

    /// Copy resized to exactly `width x height`.
    pub fn scaled_to(&self, width: u32, height: u32) -> StackResult<FrameRgb> {
        resize_frame(self.frame.clone(), width, height)
    }

    /// Endless iterator over copies of the buffer; callers bound it.
    pub fn frames(&self) -> impl Iterator<Item = FrameRgb> + '_ {
        std::iter::repeat_with(|| self.frame.clone())
    }
}

/// A video: a sequential decoder with a monotonically advancing cursor.
pub struct VideoAsset {
    path: PathBuf,
    info: VideoSourceInfo,
    decoder: Option<Box<dyn VideoDecoder>>,
    cursor: u64,
    crop_bottom: u32,
}

impl VideoAsset {
    /// Probe and open the video at `path` through `ffprobe`/`ffmpeg`.
    ///
    /// Fails with [`StackError::AssetLoad`] when the file cannot be probed or decoded.
    pub fn open(path: impl AsRef<Path>) -> StackResult<Self> {
        let path = path.as_ref();
        let load_err = |e: StackError| StackError::asset_load(path, MediaKind::Video, e.to_string());

        let info = probe_video(path).map_err(load_err)?;
        let decoder = FfmpegDecoder::spawn(info.clone()).map_err(load_err)?;
        let asset = Self::from_checked_decoder(info, Box::new(decoder))?;
        tracing::debug!(
            path = %path.display(),
            width = asset.info.width,
            height = asset.info.height,
            fps = %asset.info.fps,
            frame_count = asset.info.frame_count,
            "opened video asset"
        );
        Ok(asset)
    }

    /// Like [`VideoAsset::from_decoder`], but decodes the first frame and rewinds, so a source
    /// that cannot be decoded fails here with [`StackError::AssetLoad`].
    pub fn from_checked_decoder(
        info: VideoSourceInfo,
        mut decoder: Box<dyn VideoDecoder>,
    ) -> StackResult<Self> {
        let load_err =
            |e: StackError| StackError::asset_load(&info.source_path, MediaKind::Video, e.to_string());
        decoder.next_frame().map_err(load_err)?;
        decoder.rewind().map_err(load_err)?;
        Ok(Self::from_decoder(info, decoder))
    }

    /// Build an asset over an arbitrary decoder. `info` must describe what it yields.
    pub fn from_decoder(info: VideoSourceInfo, decoder: Box<dyn VideoDecoder>) -> Self {
        Self {
            path: info.source_path.clone(),
            info,
            decoder: Some(decoder),
            cursor: 0,
            crop_bottom: 0,
        }
    }

    /// Remove `rows` pixel rows from the bottom of every frame read from now on.
    pub fn set_crop_bottom(&mut self, rows: u32) -> StackResult<()> {
        if rows >= self.info.height {
            return Err(StackError::validation(format!(
                "crop_bottom {rows} must be smaller than the video height {}",
                self.info.height
            )));
        }
        self.crop_bottom = rows;
        Ok(())
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Probed metadata.
    pub fn info(&self) -> &VideoSourceInfo {
        &self.info
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.info.width
    }

    /// Height in pixels after the bottom crop.
    pub fn height(&self) -> u32 {
        self.info.height - self.crop_bottom
    }

    /// Height in pixels as decoded.
    pub fn native_height(&self) -> u32 {
        self.info.height
    }

    /// Rows removed from the bottom of each frame.
    pub fn crop_bottom(&self) -> u32 {
        self.crop_bottom
    }

    /// Container frame rate.
    pub fn fps(&self) -> Fps {
        self.info.fps
    }

    /// Container frame count; may be approximate.
    pub fn frame_count(&self) -> u64 {
        self.info.frame_count
    }

    /// Frames read since the last open/reset.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Return `true` once [`VideoAsset::release`] ran.
    pub fn is_released(&self) -> bool {
        self.decoder.is_none()
    }

    /// Next frame, or `None` once the video is exhausted.
    pub fn get_frame(&mut self) -> StackResult<Option<FrameRgb>> {
        let decoder = self.decoder.as_mut().ok_or_else(|| {
            StackError::validation(format!(
                "video asset '{}' was already released",
                self.path.display()
            ))
        })?;

        let Some(frame) = decoder.next_frame()? else {
            return Ok(None);
        };
        self.cursor += 1;
        crop_bottom(frame, self.crop_bottom).map(Some)
    }

    /// Rewind to the first frame.
    pub fn reset(&mut self) -> StackResult<()> {
        if self.cursor == 0 {
            return Ok(());
        }
        let decoder = self.decoder.as_mut().ok_or_else(|| {
            StackError::validation(format!(
                "video asset '{}' was already released",
                self.path.display()
            ))
        })?;
        decoder.rewind()?;
        self.cursor = 0;
        Ok(())
    }

    /// Lazy iterator over the remaining frames; ends at exhaustion or on the first error.
    pub fn frames(&mut self) -> VideoFrames<'_> {
        VideoFrames {
            asset: self,
            done: false,
        }
    }

    /// Close the decoder. Safe to call more than once.
    pub fn release(&mut self) {
        if let Some(mut decoder) = self.decoder.take() {
            decoder.close();
            tracing::trace!(path = %self.path.display(), "released video asset");
        }
    }
}

impl std::fmt::Debug for VideoAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoAsset")
            .field("path", &self.path)
            .field("info", &self.info)
            .field("cursor", &self.cursor)
            .field("crop_bottom", &self.crop_bottom)
            .field("released", &self.is_released())
            .finish()
    }
}

impl Drop for VideoAsset {
    fn drop(&mut self) {
        self.release();
    }
}

/// Iterator returned by [`VideoAsset::frames`].
pub struct VideoFrames<'a> {
    asset: &'a mut VideoAsset,
    done: bool,
}

impl Iterator for VideoFrames<'_> {
    type Item = StackResult<FrameRgb>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.asset.get_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// One stackable source: a still image or a video.
#[derive(Debug)]
pub enum Asset {
    /// Static image.
    Image(ImageAsset),
    /// Time-varying video.
    Video(VideoAsset),
}

impl Asset {
    /// Open `path` as `kind`.
    pub fn open(path: impl AsRef<Path>, kind: MediaKind) -> StackResult<Self> {
        match kind {
            MediaKind::Image => ImageAsset::open(path).map(Self::Image),
            MediaKind::Video => VideoAsset::open(path).map(Self::Video),
        }
    }

    /// Media kind of this asset.
    pub fn kind(&self) -> MediaKind {
        match self {
            Self::Image(_) => MediaKind::Image,
            Self::Video(_) => MediaKind::Video,
        }
    }

    /// `true` for assets that produce the same frame at every step.
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Image(_))
    }

    /// Source path.
    pub fn path(&self) -> &Path {
        match self {
            Self::Image(a) => a.path(),
            Self::Video(a) => a.path(),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            Self::Image(a) => a.width(),
            Self::Video(a) => a.width(),
        }
    }

    /// Height in pixels (after crop, for videos).
    pub fn height(&self) -> u32 {
        match self {
            Self::Image(a) => a.height(),
            Self::Video(a) => a.height(),
        }
    }

    /// Next frame; `None` only for an exhausted video.
    pub fn get_frame(&mut self) -> StackResult<Option<FrameRgb>> {
        match self {
            Self::Image(a) => Ok(Some(a.get_frame())),
            Self::Video(a) => a.get_frame(),
        }
    }

    /// Rewind videos; no-op for images.
    pub fn reset(&mut self) -> StackResult<()> {
        match self {
            Self::Image(_) => Ok(()),
            Self::Video(a) => a.reset(),
        }
    }

    /// Release decoder resources; images hold nothing beyond their buffer.
    pub fn release(&mut self) {
        if let Self::Video(a) = self {
            a.release();
        }
    }

    /// Borrow as a video, if it is one.
    pub fn as_video(&self) -> Option<&VideoAsset> {
        match self {
            Self::Video(a) => Some(a),
            Self::Image(_) => None,
        }
    }

    /// Borrow as an image, if it is one.
    pub fn as_image(&self) -> Option<&ImageAsset> {
        match self {
            Self::Image(a) => Some(a),
            Self::Video(_) => None,
        }
    }
}
