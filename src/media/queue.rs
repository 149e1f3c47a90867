// SPDX-License-Identifier: GPL-3.0-only

//! Per-medium playback queue
//!
//! The queue is shared between the controller (which appends on load and
//! clears on reset) and the stream worker (which pops the head and re-appends
//! on loop), so every access goes through a mutex.

use super::MediaItem;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// FIFO of pending media items; insertion order is playback order
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    items: Mutex<VecDeque<MediaItem>>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    // A poisoned lock still guards a valid deque
    fn lock(&self) -> MutexGuard<'_, VecDeque<MediaItem>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append an item at the tail
    pub fn push(&self, item: MediaItem) {
        self.lock().push_back(item);
    }

    /// Remove and return the head item
    pub fn pop(&self) -> Option<MediaItem> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every pending item
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Paths of all pending items, head first
    pub fn paths(&self) -> Vec<PathBuf> {
        self.lock()
            .iter()
            .map(|item| item.path().to_path_buf())
            .collect()
    }
}
