// SPDX-License-Identifier: GPL-3.0-only

//! Media items, classification and playback queues
//!
//! Paths handed to the engine are classified by extension into one of two
//! media kinds. Each kind has its own [`PlaybackQueue`] that the matching
//! stream worker consumes in FIFO order.
//!
//! # Modules
//!
//! - [`classifier`]: Extension based classification and directory expansion
//! - [`queue`]: Thread-safe per-medium playback queue
//! - [`frame`]: Decoded video frames and pixel format conversion

pub mod classifier;
pub mod frame;
pub mod queue;

pub use classifier::{ScanResult, classify_file, scan_paths};
pub use frame::{PixelFormat, VideoFrame};
pub use queue::PlaybackQueue;

use std::fmt;
use std::path::{Path, PathBuf};

/// The two independent media timelines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// Both kinds, video first
    pub const ALL: [MediaKind; 2] = [MediaKind::Video, MediaKind::Audio];

    /// Get display name for the kind
    pub fn display_name(&self) -> &'static str {
        match self {
            MediaKind::Video => "Video",
            MediaKind::Audio => "Audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A classified media file; immutable once created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaItem {
    path: PathBuf,
    kind: MediaKind,
}

impl MediaItem {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }
}
