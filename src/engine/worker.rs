// SPDX-License-Identifier: GPL-3.0-only
//! Thread lifecycle management for stream workers
//!
//! Each medium gets at most one worker thread at a time. The controller owns
//! a [`WorkerHandle`]; the thread owns everything it opens (decoders, sinks)
//! and releases it before signalling completion.

use super::EngineSettings;
use super::medium::MediumState;
use super::notify::NotificationHub;
use crate::backends::MediaBackend;
use crate::constants::timing;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Cooperative stop flag shared between controller and worker
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `duration`, waking early once the signal is raised
    ///
    /// Returns true if the full duration elapsed.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_raised() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(timing::STOP_CHECK_INTERVAL));
        }
    }
}

/// Sends on the done channel when dropped, including during a panic unwind
struct DoneGuard(Sender<()>);

impl Drop for DoneGuard {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

/// Controller side of a running worker thread
pub struct WorkerHandle {
    /// Thread handle for joining
    thread_handle: Option<JoinHandle<()>>,
    stop_signal: StopSignal,
    done_rx: Receiver<()>,
    /// Name for logging
    name: String,
}

impl WorkerHandle {
    /// Spawn `body` on a named thread
    ///
    /// The body receives the stop signal it must poll.
    pub fn spawn<F>(name: &str, body: F) -> std::io::Result<Self>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let stop_signal = StopSignal::new();
        let thread_signal = stop_signal.clone();
        let (done_tx, done_rx) = mpsc::channel();
        let name_clone = name.to_string();

        info!(name = %name, "Starting stream worker");

        let thread_handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let _done = DoneGuard(done_tx);
                debug!(name = %name_clone, "Worker thread started");
                body(thread_signal);
                info!(name = %name_clone, "Worker thread exiting");
            })?;

        Ok(Self {
            thread_handle: Some(thread_handle),
            stop_signal,
            done_rx,
            name: name.to_string(),
        })
    }

    /// Check if the thread is still running
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Signal the worker to stop (non-blocking)
    pub fn request_stop(&self) {
        debug!(name = %self.name, "Requesting worker stop");
        self.stop_signal.raise();
    }

    /// Stop the worker, waiting at most `timeout` for it to finish
    ///
    /// A worker that does not finish in time is detached; returns false in
    /// that case.
    pub fn stop_with_timeout(mut self, timeout: Duration) -> bool {
        self.request_stop();
        self.wait(timeout)
    }

    /// Release a worker whose run already ended, without blocking
    ///
    /// Joins if the thread has signalled done, otherwise detaches it. The
    /// caller may be the worker thread itself (an observer reacting to the
    /// end-of-run notification), which can never see its own done signal.
    pub fn reap(mut self) -> bool {
        let Some(handle) = self.thread_handle.take() else {
            return true;
        };

        match self.done_rx.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => {
                if let Err(e) = handle.join() {
                    warn!(name = %self.name, "Worker thread panicked: {:?}", e);
                }
                true
            }
            Err(TryRecvError::Empty) => {
                debug!(name = %self.name, "Worker still exiting, detaching");
                false
            }
        }
    }

    /// Wait for an already signalled worker, bounded by `timeout`
    pub fn wait(&mut self, timeout: Duration) -> bool {
        let Some(handle) = self.thread_handle.take() else {
            return true;
        };

        match self.done_rx.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if let Err(e) = handle.join() {
                    warn!(name = %self.name, "Worker thread panicked: {:?}", e);
                } else {
                    debug!(name = %self.name, "Worker thread finished");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    name = %self.name,
                    timeout_ms = timeout.as_millis() as u64,
                    "Worker did not stop in time, detaching"
                );
                false
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if self.thread_handle.is_some() {
            debug!(name = %self.name, "WorkerHandle dropped, signalling stop");
            self.request_stop();
        }
    }
}

/// Everything a worker thread needs, cloned out of the engine at start
pub(crate) struct WorkerContext {
    pub backend: Arc<dyn MediaBackend>,
    pub medium: Arc<MediumState>,
    pub hub: Arc<NotificationHub>,
    pub settings: EngineSettings,
    pub stop: StopSignal,
    pub generation: u64,
}

impl WorkerContext {
    pub fn should_stop(&self) -> bool {
        self.stop.is_raised() || !self.medium.is_live(self.generation)
    }

    pub fn set_current(&self, path: Option<&Path>) {
        self.medium.set_current(self.generation, path);
    }

    /// "Video error: ..." / "Audio error: ..."
    pub fn report_error(&self, error: impl std::fmt::Display) {
        self.hub
            .notify_error(&format!("{} error: {}", self.medium.kind(), error));
    }

    /// Pause after a failed item; cut short by a stop request
    pub fn backoff(&self) {
        self.stop.sleep(self.settings.error_backoff);
    }

    /// Mark the medium Idle and announce the end, unless superseded
    pub fn finish(&self) {
        if self.medium.finish_run(self.generation) {
            self.hub
                .notify_status(&format!("{} streaming ended", self.medium.kind()));
        } else {
            debug!(kind = %self.medium.kind(), "Superseded worker exiting quietly");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        condition()
    }

    #[test]
    fn test_worker_runs_to_completion() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = Arc::clone(&counter);

        let handle = WorkerHandle::spawn("test-worker", move |_| {
            counter_clone.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(handle.stop_with_timeout(Duration::from_secs(2)));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_signal_observed() {
        let handle = WorkerHandle::spawn("test-stop", |stop| {
            while !stop.is_raised() {
                thread::sleep(Duration::from_millis(5));
            }
        })
        .unwrap();

        thread::sleep(Duration::from_millis(20));
        assert!(handle.is_running());
        assert!(handle.stop_with_timeout(Duration::from_secs(2)));
    }

    #[test]
    fn test_unresponsive_worker_detached() {
        let handle = WorkerHandle::spawn("test-stuck", |_| {
            thread::sleep(Duration::from_millis(500));
        })
        .unwrap();

        let start = Instant::now();
        assert!(!handle.stop_with_timeout(Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_panicking_worker_still_signals_done() {
        let handle = WorkerHandle::spawn("test-panic", |_| panic!("worker failure")).unwrap();
        assert!(handle.stop_with_timeout(Duration::from_secs(2)));
    }

    #[test]
    fn test_reap_does_not_wait_for_running_worker() {
        let handle = WorkerHandle::spawn("test-reap-running", |_| {
            thread::sleep(Duration::from_millis(300));
        })
        .unwrap();

        let start = Instant::now();
        assert!(!handle.reap());
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_reap_joins_finished_worker() {
        let handle = WorkerHandle::spawn("test-reap-done", |_| {}).unwrap();
        assert!(wait_for(|| !handle.is_running()));
        assert!(handle.reap());
    }

    #[test]
    fn test_reap_from_own_thread() {
        let (tx, rx) = mpsc::channel::<WorkerHandle>();
        let (result_tx, result_rx) = mpsc::channel();
        let handle = WorkerHandle::spawn("test-reap-self", move |_| {
            let own = rx.recv().unwrap();
            let start = Instant::now();
            let joined = own.reap();
            result_tx.send((joined, start.elapsed())).unwrap();
        })
        .unwrap();

        tx.send(handle).unwrap();
        let (joined, elapsed) = result_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(!joined);
        assert!(elapsed < Duration::from_millis(100));
    }

    #[test]
    fn test_sleep_interrupted() {
        let signal = StopSignal::new();
        let remote = signal.clone();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.raise();
        });

        let start = Instant::now();
        assert!(!signal.sleep(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
        waker.join().unwrap();
    }
}
