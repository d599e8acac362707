//! Folder scanning: find the image and video files of a directory in stacking order.

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::{
    core::MediaKind,
    error::{StackError, StackResult},
};

/// Recognized still-image extensions (lowercase, without the dot).
pub const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Recognized video extensions (lowercase, without the dot).
pub const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "avi", "mov", "mkv", "webm", "wmv"];

/// One media file found by [`discover`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveredAsset {
    /// Full path (folder joined with the file name).
    pub path: PathBuf,
    /// Classification by extension.
    pub kind: MediaKind,
}

/// Classify `path` by its extension, case-insensitively.
pub fn classify(path: &Path) -> Option<MediaKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// List the media files directly inside `folder`, sorted by file name (case-insensitive).
///
/// Entries with unknown extensions and anything that is not a regular file are skipped. The
/// returned order is the top-to-bottom stacking order.
pub fn discover(folder: &Path) -> StackResult<Vec<DiscoveredAsset>> {
    if !folder.is_dir() {
        return Err(StackError::NotADirectory(folder.to_path_buf()));
    }

    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("read directory '{}'", folder.display()))?;

    let mut found = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry of '{}'", folder.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(kind) = classify(&path) {
            found.push(DiscoveredAsset { path, kind });
        }
    }

    found.sort_by_cached_key(|a| {
        let name = a
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        (name.to_lowercase(), name)
    });

    tracing::debug!(folder = %folder.display(), count = found.len(), "discovered assets");
    Ok(found)
}
