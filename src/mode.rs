use std::path::{Path, PathBuf};

use crate::foundation::error::{StackError, StackResult};

/// How a run obtains its assets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunMode {
    /// Stack every media file of a directory.
    Folder {
        /// Directory to scan.
        input: PathBuf,
    },
    /// One video plus one image, both given explicitly.
    Legacy {
        /// Video path.
        video: PathBuf,
        /// Image path.
        image: PathBuf,
    },
    /// One video plus one image taken from the configured defaults.
    LegacyDefaults,
}

impl RunMode {
    /// Short name for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Folder { .. } => "folder",
            Self::Legacy { .. } => "legacy",
            Self::LegacyDefaults => "legacy (defaults)",
        }
    }
}

/// Pick the run mode from which path options were given.
///
/// `input` selects folder mode and excludes `video`/`image`; `video` and `image` must be given
/// together; nothing at all falls back to the configured defaults.
pub fn resolve_mode(
    input: Option<&Path>,
    video: Option<&Path>,
    image: Option<&Path>,
) -> StackResult<RunMode> {
    match (input, video, image) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(StackError::ModeResolution(
            "--input cannot be combined with --video or --image".to_string(),
        )),
        (Some(input), None, None) => Ok(RunMode::Folder {
            input: input.to_path_buf(),
        }),
        (None, Some(video), Some(image)) => Ok(RunMode::Legacy {
            video: video.to_path_buf(),
            image: image.to_path_buf(),
        }),
        (None, Some(_), None) => Err(StackError::ModeResolution(
            "--video requires --image".to_string(),
        )),
        (None, None, Some(_)) => Err(StackError::ModeResolution(
            "--image requires --video".to_string(),
        )),
        (None, None, None) => Ok(RunMode::LegacyDefaults),
    }
}
