//! Startup defaults, overridable through environment variables.
//!
//! The core never reads the environment; the command surface builds one [`Settings`] value at
//! startup and passes what it needs down explicitly.

use std::path::PathBuf;

use crate::foundation::{
    core::{Constraint, ImagePosition},
    error::{StackError, StackResult},
};

/// Environment variable overriding [`Settings::default_video`].
pub const ENV_DEFAULT_VIDEO: &str = "DEFAULT_VIDEO";
/// Environment variable overriding [`Settings::default_image`].
pub const ENV_DEFAULT_IMAGE: &str = "DEFAULT_IMAGE";
/// Environment variable overriding [`Settings::default_output`].
pub const ENV_DEFAULT_OUTPUT: &str = "DEFAULT_OUTPUT";
/// Environment variable overriding [`Settings::default_constraint`].
pub const ENV_DEFAULT_CONSTRAINT: &str = "DEFAULT_CONSTRAINT";
/// Environment variable overriding [`Settings::default_image_position`].
pub const ENV_DEFAULT_IMAGE_POSITION: &str = "DEFAULT_IMAGE_POSITION";
/// Environment variable overriding [`Settings::default_crop_bottom`].
pub const ENV_DEFAULT_CROP_BOTTOM: &str = "DEFAULT_CROP_BOTTOM";

const FALLBACK_VIDEO: &str = "input/video.mp4";
const FALLBACK_IMAGE: &str = "input/image.png";
const FALLBACK_OUTPUT: &str = "output/output.mp4";

/// Resolved default paths and options.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    /// Video used by legacy mode when no paths are given.
    pub default_video: PathBuf,
    /// Image used by legacy mode when no paths are given.
    pub default_image: PathBuf,
    /// Output path when `--output` is omitted.
    pub default_output: PathBuf,
    /// Constraint when `--constraint` is omitted.
    pub default_constraint: Constraint,
    /// Image position when `--image-position` is omitted.
    pub default_image_position: ImagePosition,
    /// Bottom crop when `--crop-bottom` is omitted.
    pub default_crop_bottom: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_video: PathBuf::from(FALLBACK_VIDEO),
            default_image: PathBuf::from(FALLBACK_IMAGE),
            default_output: PathBuf::from(FALLBACK_OUTPUT),
            default_constraint: Constraint::Width,
            default_image_position: ImagePosition::Bottom,
            default_crop_bottom: 0,
        }
    }
}

impl Settings {
    /// Read overrides from the process environment.
    pub fn from_env() -> StackResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup; missing keys keep the literal defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StackResult<Self> {
        let mut s = Self::default();

        if let Some(v) = lookup(ENV_DEFAULT_VIDEO) {
            s.default_video = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DEFAULT_IMAGE) {
            s.default_image = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DEFAULT_OUTPUT) {
            s.default_output = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_DEFAULT_CONSTRAINT) {
            s.default_constraint = v.trim().parse()?;
        }
        if let Some(v) = lookup(ENV_DEFAULT_IMAGE_POSITION) {
            s.default_image_position = v.trim().parse()?;
        }
        if let Some(v) = lookup(ENV_DEFAULT_CROP_BOTTOM) {
            s.default_crop_bottom = v.trim().parse().map_err(|e| {
                StackError::validation(format!(
                    "{ENV_DEFAULT_CROP_BOTTOM} must be a non-negative integer, got '{v}': {e}"
                ))
            })?;
        }

        Ok(s)
    }
}
