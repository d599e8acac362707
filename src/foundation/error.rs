use std::path::PathBuf;

use crate::foundation::core::MediaKind;

/// Convenience result type used across mediastack.
pub type StackResult<T> = Result<T, StackError>;

/// Top-level error taxonomy used by the asset, planning and compositing APIs.
#[derive(thiserror::Error, Debug)]
pub enum StackError {
    /// A path did not decode as the declared media kind.
    #[error("failed to load {kind} asset '{}': {reason}", path.display())]
    AssetLoad {
        /// Offending path.
        path: PathBuf,
        /// Kind the path was opened as.
        kind: MediaKind,
        /// Decoder-provided reason.
        reason: String,
    },

    /// Folder mode input is not a directory.
    #[error("not a valid directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Folder mode input holds no recognized media.
    #[error("no media files found in: {}", .0.display())]
    EmptyFolder(PathBuf),

    /// The combined set has no video to act as reference.
    #[error("at least one video asset is required")]
    NoVideoAsset,

    /// Constraint name outside `{width, height}`.
    #[error("invalid constraint: '{0}' (must be 'width' or 'height')")]
    InvalidConstraint(String),

    /// Image position name outside `{top, bottom}`.
    #[error("invalid image position: '{0}' (must be 'top' or 'bottom')")]
    InvalidImagePosition(String),

    /// Ambiguous or insufficient command-line input.
    #[error("cannot resolve run mode: {0}")]
    ModeResolution(String),

    /// Invalid caller-provided values.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures from the media subprocesses (decode, probe, encode).
    #[error("media error: {0}")]
    Media(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StackError {
    /// Build a [`StackError::AssetLoad`] value.
    pub fn asset_load(path: impl Into<PathBuf>, kind: MediaKind, reason: impl Into<String>) -> Self {
        Self::AssetLoad {
            path: path.into(),
            kind,
            reason: reason.into(),
        }
    }

    /// Build a [`StackError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`StackError::Media`] value.
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media(msg.into())
    }
}
