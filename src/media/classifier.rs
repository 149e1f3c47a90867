// SPDX-License-Identifier: GPL-3.0-only

//! Path classification by file extension
//!
//! Regular files are classified directly. Directories are walked recursively
//! and every file with a known extension is picked up, in sorted order so
//! that the resulting playback order does not depend on the filesystem.

use super::{MediaItem, MediaKind};
use crate::constants::file_formats;
use crate::errors::ClassificationError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Outcome of scanning a list of paths
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Classified items in discovery order
    pub items: Vec<MediaItem>,
    /// Rejected paths
    pub errors: Vec<ClassificationError>,
}

impl ScanResult {
    /// Number of items of the given kind
    pub fn count(&self, kind: MediaKind) -> usize {
        self.items.iter().filter(|item| item.kind() == kind).count()
    }
}

/// Lower-cased extension of `path`, if any
fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Classify a single file by its extension
pub fn classify_file(path: &Path) -> Result<MediaKind, ClassificationError> {
    match extension_of(path) {
        Some(ext) if file_formats::is_video_extension(&ext) => Ok(MediaKind::Video),
        Some(ext) if file_formats::is_audio_extension(&ext) => Ok(MediaKind::Audio),
        _ => Err(ClassificationError::Unsupported(path.to_path_buf())),
    }
}

/// Make `path` absolute against the current directory without touching
/// symlinks
fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Classify every path; directories are expanded recursively
pub fn scan_paths<P: AsRef<Path>>(paths: &[P]) -> ScanResult {
    let mut result = ScanResult::default();

    for path in paths {
        let path = absolutize(path.as_ref());

        if path.is_file() {
            match classify_file(&path) {
                Ok(kind) => result.items.push(MediaItem::new(path, kind)),
                Err(e) => {
                    debug!(path = %path.display(), "Rejected file");
                    result.errors.push(e);
                }
            }
        } else if path.is_dir() {
            let before = result.items.len();
            walk_directory(&path, &mut result.items);
            debug!(
                path = %path.display(),
                found = result.items.len() - before,
                "Expanded directory"
            );
        } else {
            result.errors.push(ClassificationError::NotFound(path));
        }
    }

    result
}

/// Append every media file below `dir` to `items`, in sorted name order
///
/// Symlinked directories are not followed, which keeps the walk finite.
fn walk_directory(dir: &Path, items: &mut Vec<MediaItem>) {
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %dir.display(), error = %e, "Failed to read directory entry");
                None
            }
        });

    for entry in walker {
        let path = entry.path();
        if entry.file_type().is_dir() || !path.is_file() {
            continue;
        }

        let known = extension_of(path)
            .map(|ext| file_formats::is_media_extension(&ext))
            .unwrap_or(false);
        if !known {
            continue;
        }
        if let Ok(kind) = classify_file(path) {
            items.push(MediaItem::new(path.to_path_buf(), kind));
        }
    }
}
