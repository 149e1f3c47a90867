// SPDX-License-Identifier: GPL-3.0-only

//! Per-medium state shared between the controller and its worker

use crate::media::{MediaKind, PlaybackQueue};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Coarse lifecycle of one medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamState {
    #[default]
    Idle,
    Streaming,
}

/// Fields that only the live run may publish
#[derive(Debug, Default)]
struct RunSlot {
    generation: u64,
    current: Option<PathBuf>,
}

/// Queue, flags and "now playing" slot for one medium
///
/// Every worker run is tagged with a generation. Stopping bumps the
/// generation, so a worker that outlived its stop timeout can no longer
/// change the state or the current item of the medium.
#[derive(Debug)]
pub struct MediumState {
    kind: MediaKind,
    pub(crate) queue: PlaybackQueue,
    streaming: AtomicBool,
    looping: AtomicBool,
    slot: Mutex<RunSlot>,
}

impl MediumState {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            queue: PlaybackQueue::new(),
            streaming: AtomicBool::new(false),
            looping: AtomicBool::new(false),
            slot: Mutex::new(RunSlot::default()),
        }
    }

    fn slot(&self) -> MutexGuard<'_, RunSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        if self.streaming.load(Ordering::SeqCst) {
            StreamState::Streaming
        } else {
            StreamState::Idle
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    pub fn looping(&self) -> bool {
        self.looping.load(Ordering::SeqCst)
    }

    pub fn set_looping(&self, enabled: bool) {
        self.looping.store(enabled, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<PathBuf> {
        self.slot().current.clone()
    }

    /// Open a new run: mark Streaming and return its generation
    pub(crate) fn begin_run(&self) -> u64 {
        let mut slot = self.slot();
        slot.generation += 1;
        slot.current = None;
        self.streaming.store(true, Ordering::SeqCst);
        slot.generation
    }

    /// Invalidate whichever run is live and go Idle
    pub(crate) fn reset(&self) {
        let mut slot = self.slot();
        slot.generation += 1;
        slot.current = None;
        self.streaming.store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_live(&self, generation: u64) -> bool {
        self.slot().generation == generation
    }

    /// Publish the item being played, if `generation` is still live
    pub(crate) fn set_current(&self, generation: u64, path: Option<&Path>) -> bool {
        let mut slot = self.slot();
        if slot.generation != generation {
            return false;
        }
        slot.current = path.map(Path::to_path_buf);
        true
    }

    /// End the run `generation` on behalf of its worker
    ///
    /// Returns false when the run was already superseded, leaving the
    /// medium untouched.
    pub(crate) fn finish_run(&self, generation: u64) -> bool {
        let mut slot = self.slot();
        if slot.generation != generation {
            return false;
        }
        slot.current = None;
        self.streaming.store(false, Ordering::SeqCst);
        true
    }
}
