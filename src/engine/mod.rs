// SPDX-License-Identifier: GPL-3.0-only

//! Streaming engine: two independent playback timelines
//!
//! [`StreamEngine`] owns one queue, one loop flag and at most one worker
//! thread per [`MediaKind`]. Video frames go to the virtual camera, audio
//! samples to the virtual microphone; the two never wait on each other.
//!
//! ```text
//!  load(paths) ──► classifier ──► video queue ──► video worker ──► camera
//!                             └─► audio queue ──► audio worker ──► microphone
//!                                                      │
//!                                  status / errors ◄───┘ NotificationHub
//! ```
//!
//! Stopping is cooperative. Workers poll their stop signal at the head of
//! every outer and inner loop iteration, so the latency of a stop is bounded
//! by one frame send or one chunk write. Device handles are owned by the
//! worker alone and released on its own exit path; a worker that misses the
//! stop timeout is detached and can no longer touch the medium's state.

mod audio_worker;
mod medium;
mod notify;
mod video_worker;
mod worker;

pub use medium::StreamState;
pub use notify::{NotificationHub, Observer, ObserverId};

use crate::backends::{GstBackend, MediaBackend};
use crate::config::Config;
use crate::constants::{audio, timing};
use crate::media::{MediaKind, VideoFrame, scan_paths};
use medium::MediumState;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use video_worker::LatestFrame;
use worker::{WorkerContext, WorkerHandle};

/// Engine tunables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// PipeWire node name of the virtual microphone
    pub audio_device_name: String,
    /// Stereo frames per audio chunk
    pub audio_chunk_frames: usize,
    /// Pause after a failed item
    pub error_backoff: Duration,
    /// Bounded wait for each worker on stop
    pub stop_timeout: Duration,
    /// Pause after each audio chunk write
    pub chunk_pause: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            audio_device_name: audio::DEFAULT_DEVICE_NAME.to_string(),
            audio_chunk_frames: audio::CHUNK_FRAMES,
            error_backoff: timing::ERROR_BACKOFF,
            stop_timeout: timing::STOP_TIMEOUT,
            chunk_pause: timing::CHUNK_PAUSE,
        }
    }
}

/// Snapshot of one medium
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediumStatus {
    pub streaming: bool,
    pub current: Option<PathBuf>,
    pub queue_len: usize,
    pub loop_enabled: bool,
}

/// Snapshot of both media
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatus {
    pub video: MediumStatus,
    pub audio: MediumStatus,
}

impl EngineStatus {
    pub fn get(&self, kind: MediaKind) -> &MediumStatus {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    /// True when neither medium is streaming
    pub fn is_idle(&self) -> bool {
        !self.video.streaming && !self.audio.streaming
    }
}

/// Outcome of [`StreamEngine::load`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// "Video: <path>" / "Audio: <path>" per queued file
    pub loaded: Vec<String>,
    /// One message per rejected path
    pub errors: Vec<String>,
}

#[derive(Default)]
struct Workers {
    video: Option<WorkerHandle>,
    audio: Option<WorkerHandle>,
}

impl Workers {
    fn slot(&mut self, kind: MediaKind) -> &mut Option<WorkerHandle> {
        match kind {
            MediaKind::Video => &mut self.video,
            MediaKind::Audio => &mut self.audio,
        }
    }
}

/// Controller for the video and audio stream workers
///
/// All methods take `&self`; share the engine behind an `Arc` to drive it
/// from several threads (UI, signal handler). Observers run on worker
/// threads and must not call [`StreamEngine::stop_streaming`] themselves.
pub struct StreamEngine {
    backend: Arc<dyn MediaBackend>,
    settings: EngineSettings,
    hub: Arc<NotificationHub>,
    video: Arc<MediumState>,
    audio: Arc<MediumState>,
    latest_frame: Arc<LatestFrame>,
    /// Serializes start/stop; never held while observers run
    workers: Mutex<Workers>,
}

impl StreamEngine {
    pub fn new(backend: Arc<dyn MediaBackend>, settings: EngineSettings) -> Self {
        info!(?settings, "Creating stream engine");
        Self {
            backend,
            settings,
            hub: Arc::new(NotificationHub::new()),
            video: Arc::new(MediumState::new(MediaKind::Video)),
            audio: Arc::new(MediumState::new(MediaKind::Audio)),
            latest_frame: Arc::new(LatestFrame::default()),
            workers: Mutex::new(Workers::default()),
        }
    }

    /// Engine on the GStreamer backend, configured from `config`
    pub fn from_config(config: &Config) -> Self {
        let backend = GstBackend::new(config.video_output, config.audio_device_name.clone());
        let engine = Self::new(Arc::new(backend), config.engine_settings());
        engine.set_loop(MediaKind::Video, config.loop_video);
        engine.set_loop(MediaKind::Audio, config.loop_audio);
        engine
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    fn medium(&self, kind: MediaKind) -> &Arc<MediumState> {
        match kind {
            MediaKind::Video => &self.video,
            MediaKind::Audio => &self.audio,
        }
    }

    fn lock_workers(&self) -> MutexGuard<'_, Workers> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Classify `paths` and append the accepted files to their queues
    ///
    /// Directories are expanded recursively. Rejected paths do not stop the
    /// rest of the load.
    pub fn load<P: AsRef<Path>>(&self, paths: &[P]) -> LoadReport {
        let scan = scan_paths(paths);
        let mut report = LoadReport::default();

        for item in scan.items {
            report
                .loaded
                .push(format!("{}: {}", item.kind(), item.path().display()));
            self.medium(item.kind()).queue.push(item);
        }
        report.errors = scan.errors.iter().map(ToString::to_string).collect();

        info!(
            loaded = report.loaded.len(),
            errors = report.errors.len(),
            "Load finished"
        );

        let video_len = self.video.queue.len();
        let audio_len = self.audio.queue.len();
        if video_len > 0 && audio_len == 0 {
            self.hub
                .notify_status("Video files loaded but no audio files found");
        } else if audio_len > 0 && video_len == 0 {
            self.hub
                .notify_status("Audio files loaded but no video files found");
        }

        report
    }

    /// Start a worker for every Idle medium with a non-empty queue
    ///
    /// Media that are already streaming are left alone.
    pub fn start_streaming(&self) {
        let mut messages = Vec::new();
        let mut errors = Vec::new();

        {
            let mut workers = self.lock_workers();
            for kind in MediaKind::ALL {
                let medium = self.medium(kind);
                if medium.is_streaming() {
                    debug!(%kind, "Already streaming");
                    continue;
                }
                if medium.queue.is_empty() {
                    debug!(%kind, "Queue empty, not starting");
                    continue;
                }

                // The previous run already ended; this may be its own thread
                if let Some(finished) = workers.slot(kind).take() {
                    finished.reap();
                }

                match self.spawn_worker(kind) {
                    Ok(handle) => {
                        *workers.slot(kind) = Some(handle);
                        messages.push(format!("{} streaming started", kind));
                    }
                    Err(e) => {
                        medium.reset();
                        errors.push(format!("{} error: failed to start worker: {}", kind, e));
                    }
                }
            }
        }

        for message in messages {
            self.hub.notify_status(&message);
        }
        for error in errors {
            self.hub.notify_error(&error);
        }
    }

    fn spawn_worker(&self, kind: MediaKind) -> std::io::Result<WorkerHandle> {
        let medium = Arc::clone(self.medium(kind));
        let generation = medium.begin_run();
        let backend = Arc::clone(&self.backend);
        let hub = Arc::clone(&self.hub);
        let settings = self.settings.clone();
        let latest = Arc::clone(&self.latest_frame);

        let name = match kind {
            MediaKind::Video => "video-stream",
            MediaKind::Audio => "audio-stream",
        };

        WorkerHandle::spawn(name, move |stop| {
            let ctx = WorkerContext {
                backend,
                medium,
                hub,
                settings,
                stop,
                generation,
            };
            match kind {
                MediaKind::Video => video_worker::run(ctx, latest),
                MediaKind::Audio => audio_worker::run(ctx),
            }
        })
    }

    /// Signal both workers, wait for each up to the stop timeout, then reset
    /// both media to Idle
    ///
    /// Safe to call at any time; Idle media are untouched apart from reaping
    /// a worker that already ended.
    pub fn stop_streaming(&self) {
        let mut messages = Vec::new();

        {
            let mut workers = self.lock_workers();
            let mut stopping = Vec::new();

            // Raise both signals before waiting on either
            for kind in MediaKind::ALL {
                let was_streaming = self.medium(kind).is_streaming();
                if let Some(handle) = workers.slot(kind).take() {
                    handle.request_stop();
                    stopping.push((kind, handle));
                }
                if was_streaming {
                    messages.push(format!("{} streaming stopped", kind));
                }
            }

            for (kind, handle) in stopping {
                if !handle.stop_with_timeout(self.settings.stop_timeout) {
                    warn!(%kind, "Worker detached after stop timeout");
                }
            }

            for kind in MediaKind::ALL {
                self.medium(kind).reset();
            }
            self.latest_frame.clear();
        }

        for message in messages {
            self.hub.notify_status(&message);
        }
    }

    /// Toggle loop mode; the worker picks it up at its next decision point
    pub fn set_loop(&self, kind: MediaKind, enabled: bool) {
        info!(%kind, enabled, "Loop mode changed");
        self.medium(kind).set_looping(enabled);
    }

    pub fn state(&self, kind: MediaKind) -> StreamState {
        self.medium(kind).state()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            video: self.medium_status(MediaKind::Video),
            audio: self.medium_status(MediaKind::Audio),
        }
    }

    fn medium_status(&self, kind: MediaKind) -> MediumStatus {
        let medium = self.medium(kind);
        MediumStatus {
            streaming: medium.is_streaming(),
            current: medium.current(),
            queue_len: medium.queue.len(),
            loop_enabled: medium.looping(),
        }
    }

    pub fn register_status_observer(&self, observer: Observer) -> ObserverId {
        self.hub.register_status(observer)
    }

    pub fn register_error_observer(&self, observer: Observer) -> ObserverId {
        self.hub.register_error(observer)
    }

    pub fn unregister_observer(&self, id: ObserverId) -> bool {
        self.hub.unregister(id)
    }

    /// Paths waiting in the queue of `kind`, head first
    pub fn queued(&self, kind: MediaKind) -> Vec<PathBuf> {
        self.medium(kind).queue.paths()
    }

    /// Stop streaming and empty both queues
    pub fn clear_queues(&self) {
        self.stop_streaming();
        for kind in MediaKind::ALL {
            self.medium(kind).queue.clear();
        }
        self.hub.notify_status("Queues cleared");
    }

    /// Advance both media to their next queued item
    ///
    /// The items in flight are abandoned (or requeued when looping).
    pub fn skip(&self) {
        self.stop_streaming();
        self.start_streaming();
    }

    /// Most recent frame sent to the virtual camera
    pub fn latest_frame(&self) -> Option<Arc<VideoFrame>> {
        self.latest_frame.get()
    }

    /// Environment problems that would keep streaming from working
    pub fn check_devices(&self) -> Vec<String> {
        self.backend.diagnostics()
    }

    /// Stop streaming and drop every observer
    pub fn shutdown(&self) {
        info!("Shutting down stream engine");
        self.stop_streaming();
        self.hub.clear();
    }
}

impl Drop for StreamEngine {
    fn drop(&mut self) {
        let busy = {
            let workers = self.workers.get_mut().unwrap_or_else(PoisonError::into_inner);
            [&workers.video, &workers.audio]
                .into_iter()
                .flatten()
                .any(WorkerHandle::is_running)
        };
        if busy {
            debug!("StreamEngine dropped while active, shutting down");
            self.shutdown();
        }
    }
}
