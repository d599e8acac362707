use std::path::Path;

use anyhow::Context;

use crate::foundation::{core::FrameRgb, error::StackResult};

/// Decode an encoded image (png, jpeg, gif, bmp, webp, ...) into RGB8.
///
/// The format is sniffed from the bytes; alpha is dropped, animated formats yield their first
/// frame.
pub fn decode_image(bytes: &[u8]) -> StackResult<FrameRgb> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgb = dyn_img.to_rgb8();
    let (width, height) = rgb.dimensions();
    FrameRgb::from_raw(width, height, rgb.into_raw())
}

/// Read and decode the image at `path`.
pub fn open_image(path: &Path) -> StackResult<FrameRgb> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read image '{}'", path.display()))?;
    decode_image(&bytes)
}
