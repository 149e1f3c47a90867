// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the stream engine, driven by a scripted backend

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread;
use std::time::{Duration, Instant};
use streamforge::backends::{
    AudioSink, DecodedAudio, MediaBackend, VideoInfo, VideoSink, VideoSource,
};
use streamforge::media::{PixelFormat, VideoFrame};
use streamforge::{BackendError, BackendResult, EngineSettings, MediaKind, StreamEngine};
use tempfile::TempDir;

const WIDTH: u32 = 4;
const HEIGHT: u32 = 2;

/// Shared record of what the engine asked the backend to do
#[derive(Default)]
struct Journal {
    availability_checks: AtomicUsize,
    video_opens: Mutex<Vec<PathBuf>>,
    audio_decodes: Mutex<Vec<PathBuf>>,
    frames_sent: AtomicUsize,
    audio_writes: Mutex<Vec<usize>>,
    audio_sinks: Mutex<Vec<(u32, u32, String)>>,
    live_handles: AtomicUsize,
}

impl Journal {
    fn video_opens(&self) -> Vec<PathBuf> {
        self.video_opens.lock().unwrap().clone()
    }
}

struct ScriptedBackend {
    journal: Arc<Journal>,
    video_available: bool,
    broken: HashSet<PathBuf>,
    camera_broken: bool,
    frames_per_video: usize,
    frame_interval: Duration,
    audio_frames: usize,
}

impl ScriptedBackend {
    fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            video_available: true,
            broken: HashSet::new(),
            camera_broken: false,
            frames_per_video: 3,
            frame_interval: Duration::from_millis(2),
            audio_frames: 2500,
        }
    }
}

struct Handle(Arc<Journal>);

impl Handle {
    fn new(journal: &Arc<Journal>) -> Self {
        journal.live_handles.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(journal))
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.0.live_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

struct ScriptedSource {
    _handle: Handle,
    total: usize,
    remaining: usize,
}

impl VideoSource for ScriptedSource {
    fn info(&self) -> VideoInfo {
        VideoInfo {
            width: WIDTH,
            height: HEIGHT,
            fps: 30.0,
        }
    }

    fn read_frame(&mut self) -> BackendResult<Option<VideoFrame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let data = vec![7u8; (WIDTH * HEIGHT * 4) as usize];
        Ok(Some(VideoFrame::packed(data, WIDTH, HEIGHT, PixelFormat::Bgra)))
    }

    fn seek_to_start(&mut self) -> BackendResult<()> {
        self.remaining = self.total;
        Ok(())
    }
}

struct ScriptedCamera {
    handle: Handle,
    interval: Duration,
}

impl VideoSink for ScriptedCamera {
    fn send(&mut self, frame: &VideoFrame) -> BackendResult<()> {
        assert_eq!(frame.format, PixelFormat::Rgb);
        assert_eq!(frame.data.len(), frame.rgb_len());
        self.handle.0.frames_sent.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn wait_for_next_slot(&mut self) {
        thread::sleep(self.interval);
    }
}

struct ScriptedMic {
    handle: Handle,
    started: bool,
}

impl AudioSink for ScriptedMic {
    fn start(&mut self) -> BackendResult<()> {
        self.started = true;
        Ok(())
    }

    fn write(&mut self, chunk: &[f32]) -> BackendResult<()> {
        assert!(self.started);
        self.handle.0.audio_writes.lock().unwrap().push(chunk.len());
        Ok(())
    }

    fn stop(&mut self) -> BackendResult<()> {
        self.started = false;
        Ok(())
    }
}

impl MediaBackend for ScriptedBackend {
    fn video_output_available(&self) -> BackendResult<()> {
        self.journal.availability_checks.fetch_add(1, Ordering::SeqCst);
        if self.video_available {
            Ok(())
        } else {
            Err(BackendError::NotAvailable("no virtual camera".into()))
        }
    }

    fn open_video_source(&self, path: &Path) -> BackendResult<Box<dyn VideoSource>> {
        self.journal.video_opens.lock().unwrap().push(path.to_path_buf());
        if self.broken.contains(path) {
            return Err(BackendError::SourceOpen(format!("corrupt: {}", path.display())));
        }
        Ok(Box::new(ScriptedSource {
            _handle: Handle::new(&self.journal),
            total: self.frames_per_video,
            remaining: self.frames_per_video,
        }))
    }

    fn open_video_sink(&self, info: &VideoInfo) -> BackendResult<Box<dyn VideoSink>> {
        assert_eq!((info.width, info.height), (WIDTH, HEIGHT));
        if self.camera_broken {
            return Err(BackendError::DeviceOpen("camera busy".into()));
        }
        Ok(Box::new(ScriptedCamera {
            handle: Handle::new(&self.journal),
            interval: self.frame_interval,
        }))
    }

    fn decode_audio(&self, path: &Path) -> BackendResult<DecodedAudio> {
        self.journal.audio_decodes.lock().unwrap().push(path.to_path_buf());
        if self.broken.contains(path) {
            return Err(BackendError::SourceOpen(format!("corrupt: {}", path.display())));
        }
        Ok(DecodedAudio {
            samples: vec![0.25; self.audio_frames],
            sample_rate: 44_100,
            channels: 1,
        })
    }

    fn open_audio_sink(
        &self,
        sample_rate: u32,
        channels: u32,
        device_name: &str,
    ) -> BackendResult<Box<dyn AudioSink>> {
        self.journal
            .audio_sinks
            .lock()
            .unwrap()
            .push((sample_rate, channels, device_name.to_string()));
        Ok(Box::new(ScriptedMic {
            handle: Handle::new(&self.journal),
            started: false,
        }))
    }

    fn diagnostics(&self) -> Vec<String> {
        if self.video_available {
            Vec::new()
        } else {
            vec!["no virtual camera".to_string()]
        }
    }
}

fn fast_settings() -> EngineSettings {
    EngineSettings {
        audio_device_name: "Test Mic".to_string(),
        audio_chunk_frames: 1024,
        error_backoff: Duration::from_millis(20),
        stop_timeout: Duration::from_secs(2),
        chunk_pause: Duration::from_millis(1),
    }
}

fn engine_with(backend: ScriptedBackend) -> StreamEngine {
    StreamEngine::new(Arc::new(backend), fast_settings())
}

/// Create empty media files in a fresh temp directory
fn media_files(names: &[&str]) -> (TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let paths = names
        .iter()
        .map(|name| {
            let path = dir.path().join(name);
            fs::write(&path, b"").unwrap();
            path
        })
        .collect();
    (dir, paths)
}

fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

fn collect_messages(engine: &StreamEngine) -> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>) {
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&statuses);
    engine.register_status_observer(Arc::new(move |msg: &str| {
        sink.lock().unwrap().push(msg.to_string());
    }));
    let sink = Arc::clone(&errors);
    engine.register_error_observer(Arc::new(move |msg: &str| {
        sink.lock().unwrap().push(msg.to_string());
    }));

    (statuses, errors)
}

#[test]
fn test_load_counts_both_media() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(journal));
    let (_dir, paths) = media_files(&["a.mp4", "b.MKV", "c.wav", "d.flac", "e.ogg"]);

    let report = engine.load(&paths);

    assert_eq!(report.loaded.len(), 5);
    assert!(report.errors.is_empty());
    let status = engine.status();
    assert_eq!(status.video.queue_len, 2);
    assert_eq!(status.audio.queue_len, 3);
    assert!(report.loaded[0].starts_with("Video: "));
    assert!(report.loaded.iter().any(|e| e.starts_with("Audio: ")));
}

#[test]
fn test_missing_path_single_error() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(journal));
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.mp4");

    let report = engine.load(&[&missing]);

    assert!(report.loaded.is_empty());
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("File or directory not found"));
    let status = engine.status();
    assert_eq!(status.video.queue_len, 0);
    assert_eq!(status.audio.queue_len, 0);
}

#[test]
fn test_load_reports_one_sided_queue() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(journal));
    let (statuses, errors) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["only.mp4"]);

    engine.load(&paths);

    assert_eq!(
        *statuses.lock().unwrap(),
        vec!["Video files loaded but no audio files found"]
    );
    assert!(errors.lock().unwrap().is_empty());
}

#[test]
fn test_start_with_empty_queues_stays_idle() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));

    engine.start_streaming();

    let status = engine.status();
    assert!(!status.video.streaming);
    assert!(!status.audio.streaming);
    assert_eq!(journal.availability_checks.load(Ordering::SeqCst), 0);
}

#[test]
fn test_start_twice_spawns_one_worker() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.frames_per_video = 1000;
    backend.frame_interval = Duration::from_millis(5);
    let engine = engine_with(backend);
    let (statuses, _) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["long.mp4"]);
    engine.load(&paths);

    engine.start_streaming();
    engine.start_streaming();
    thread::sleep(Duration::from_millis(50));

    assert!(engine.status().video.streaming);
    assert!(!engine.status().audio.streaming);
    assert_eq!(journal.availability_checks.load(Ordering::SeqCst), 1);
    assert_eq!(journal.video_opens().len(), 1);
    let started = statuses
        .lock()
        .unwrap()
        .iter()
        .filter(|m| *m == "Video streaming started")
        .count();
    assert_eq!(started, 1);

    engine.stop_streaming();
}

#[test]
fn test_loop_single_item_cycles() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    let (_dir, paths) = media_files(&["clip.webm"]);
    engine.load(&paths);
    engine.set_loop(MediaKind::Video, true);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || journal.video_opens().len() >= 3));
    assert_eq!(engine.status().video.current.as_deref(), Some(paths[0].as_path()));

    engine.stop_streaming();

    // Every pass opened the same file, and stopping mid-loop requeued it
    assert!(journal.video_opens().iter().all(|p| *p == paths[0]));
    assert_eq!(engine.queued(MediaKind::Video), paths);
    assert_eq!(engine.status().video.queue_len, 1);
}

#[test]
fn test_no_loop_single_item_goes_idle() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    let (statuses, errors) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["once.mov"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().video.streaming));

    let status = engine.status();
    assert_eq!(status.video.queue_len, 0);
    assert_eq!(status.video.current, None);
    assert_eq!(journal.frames_sent.load(Ordering::SeqCst), 3);
    assert!(statuses.lock().unwrap().contains(&"Video streaming ended".to_string()));
    assert!(errors.lock().unwrap().is_empty());
    assert!(wait_until(Duration::from_secs(1), || {
        journal.live_handles.load(Ordering::SeqCst) == 0
    }));
}

#[test]
fn test_stop_resets_even_when_worker_hangs() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.frames_per_video = 100;
    backend.frame_interval = Duration::from_millis(400);
    let mut settings = fast_settings();
    settings.stop_timeout = Duration::from_millis(30);
    let engine = StreamEngine::new(Arc::new(backend), settings);
    let (_dir, paths) = media_files(&["slow.avi", "tone.wav"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(2), || {
        journal.frames_sent.load(Ordering::SeqCst) >= 1
    }));

    let start = Instant::now();
    engine.stop_streaming();
    assert!(start.elapsed() < Duration::from_millis(350));

    let status = engine.status();
    assert!(status.is_idle());
    assert_eq!(status.video.current, None);
    assert_eq!(status.audio.current, None);

    // The detached worker wakes up later and must leave the state alone
    thread::sleep(Duration::from_millis(500));
    let status = engine.status();
    assert!(status.is_idle());
    assert_eq!(status.video.current, None);
    assert!(wait_until(Duration::from_secs(2), || {
        journal.live_handles.load(Ordering::SeqCst) == 0
    }));
}

#[test]
fn test_failed_source_reported_once_then_next_item() {
    let journal = Arc::new(Journal::default());
    let (_dir, paths) = media_files(&["1_bad.mp4", "2_good.mp4"]);
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.broken.insert(paths[0].clone());
    let engine = engine_with(backend);
    let (_, errors) = collect_messages(&engine);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().video.streaming));

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Video error:"));
    assert!(errors[0].contains("1_bad.mp4"));
    assert_eq!(journal.video_opens(), paths);
    assert_eq!(journal.frames_sent.load(Ordering::SeqCst), 3);
}

#[test]
fn test_unavailable_camera_leaves_queue() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.video_available = false;
    let engine = engine_with(backend);
    let (_, errors) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["a.mp4", "b.mp4"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(2), || !engine.status().video.streaming));

    assert_eq!(errors.lock().unwrap().len(), 1);
    assert_eq!(engine.status().video.queue_len, 2);
    assert!(journal.video_opens().is_empty());
    assert_eq!(engine.check_devices(), vec!["no virtual camera".to_string()]);
}

#[test]
fn test_audio_chunks_padded_stereo() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    let (_dir, paths) = media_files(&["voice.mp3"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().audio.streaming));

    // 2500 mono frames become 2500 stereo frames: two full chunks and a padded one
    assert_eq!(*journal.audio_writes.lock().unwrap(), vec![2048, 2048, 2048]);
    assert_eq!(
        *journal.audio_sinks.lock().unwrap(),
        vec![(44_100, 2, "Test Mic".to_string())]
    );
    assert_eq!(engine.status().audio.queue_len, 0);
}

#[test]
fn test_audio_loop_requeues_finished_item() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    let (_dir, paths) = media_files(&["a.aac", "b.wav"]);
    engine.load(&paths);
    engine.set_loop(MediaKind::Audio, true);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || {
        journal.audio_decodes.lock().unwrap().len() >= 3
    }));
    engine.stop_streaming();

    let decodes = journal.audio_decodes.lock().unwrap().clone();
    assert_eq!(decodes[..3], [paths[0].clone(), paths[1].clone(), paths[0].clone()]);
    assert!(engine.status().audio.loop_enabled);
}

#[test]
fn test_panicking_observer_does_not_stop_worker() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    engine.register_status_observer(Arc::new(|_| panic!("observer blew up")));
    let (statuses, _) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["x.mp4"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().video.streaming));

    assert_eq!(journal.frames_sent.load(Ordering::SeqCst), 3);
    assert!(statuses.lock().unwrap().contains(&"Video streaming ended".to_string()));
}

#[test]
fn test_latest_frame_available_while_streaming() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.frames_per_video = 1000;
    let engine = engine_with(backend);
    let (_dir, paths) = media_files(&["preview.mp4"]);
    engine.load(&paths);

    assert!(engine.latest_frame().is_none());
    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(2), || engine.latest_frame().is_some()));

    let frame = engine.latest_frame().unwrap();
    assert_eq!(frame.format, PixelFormat::Rgb);
    assert_eq!((frame.width, frame.height), (WIDTH, HEIGHT));

    engine.stop_streaming();
    assert!(engine.latest_frame().is_none());
}

#[test]
fn test_clear_queues_and_shutdown() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(journal));
    let (statuses, _) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["a.mp4", "b.wav"]);
    engine.load(&paths);

    engine.clear_queues();
    let status = engine.status();
    assert_eq!(status.video.queue_len, 0);
    assert_eq!(status.audio.queue_len, 0);
    assert!(statuses.lock().unwrap().contains(&"Queues cleared".to_string()));

    engine.shutdown();
    let before = statuses.lock().unwrap().len();
    engine.load(&paths[..1]);
    assert_eq!(statuses.lock().unwrap().len(), before);
}

#[test]
fn test_skip_advances_to_next_item() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.frames_per_video = 1000;
    backend.frame_interval = Duration::from_millis(5);
    let engine = engine_with(backend);
    let (_dir, paths) = media_files(&["first.mp4", "second.mp4"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(2), || journal.video_opens().len() == 1));
    engine.skip();
    assert!(wait_until(Duration::from_secs(2), || journal.video_opens().len() == 2));

    assert_eq!(journal.video_opens()[1], paths[1]);
    assert_eq!(engine.status().video.current.as_deref(), Some(paths[1].as_path()));
    engine.stop_streaming();
}

#[test]
fn test_sink_failure_keeps_item_when_looping() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.camera_broken = true;
    let engine = engine_with(backend);
    let (_, errors) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["clip.mp4"]);
    engine.load(&paths);
    engine.set_loop(MediaKind::Video, true);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(2), || !errors.lock().unwrap().is_empty()));
    engine.stop_streaming();

    let errors = errors.lock().unwrap();
    assert!(errors.iter().all(|e| e.starts_with("Video error:")));
    assert!(errors[0].contains("camera busy"));
    assert_eq!(engine.queued(MediaKind::Video), paths);
    assert_eq!(journal.frames_sent.load(Ordering::SeqCst), 0);
    assert!(wait_until(Duration::from_secs(1), || {
        journal.live_handles.load(Ordering::SeqCst) == 0
    }));
}

#[test]
fn test_sink_failure_without_loop_moves_on() {
    let journal = Arc::new(Journal::default());
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.camera_broken = true;
    let engine = engine_with(backend);
    let (_, errors) = collect_messages(&engine);
    let (_dir, paths) = media_files(&["a.mp4", "b.mp4"]);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().video.streaming));

    assert_eq!(errors.lock().unwrap().len(), 2);
    assert_eq!(journal.video_opens(), paths);
    assert_eq!(engine.status().video.queue_len, 0);
}

#[test]
fn test_loop_with_other_items_replays_current() {
    let journal = Arc::new(Journal::default());
    let engine = engine_with(ScriptedBackend::new(Arc::clone(&journal)));
    let (_dir, paths) = media_files(&["a.mp4", "b.mp4"]);
    engine.load(&paths);
    engine.set_loop(MediaKind::Video, true);

    engine.start_streaming();
    // Three frames per pass, so this needs at least two rewinds
    assert!(wait_until(Duration::from_secs(5), || {
        journal.frames_sent.load(Ordering::SeqCst) >= 9
    }));
    engine.stop_streaming();

    assert_eq!(journal.video_opens(), vec![paths[0].clone()]);
    assert!(journal.frames_sent.load(Ordering::SeqCst) > 3);
    // The interrupted item goes back behind the one still waiting
    assert_eq!(
        engine.queued(MediaKind::Video),
        vec![paths[1].clone(), paths[0].clone()]
    );
}

#[test]
fn test_audio_failure_reported_once_then_next_item() {
    let journal = Arc::new(Journal::default());
    let (_dir, paths) = media_files(&["1_bad.mp3", "2_good.wav"]);
    let mut backend = ScriptedBackend::new(Arc::clone(&journal));
    backend.broken.insert(paths[0].clone());
    let engine = engine_with(backend);
    let (_, errors) = collect_messages(&engine);
    engine.load(&paths);

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || !engine.status().audio.streaming));

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Audio error:"));
    assert!(errors[0].contains("1_bad.mp3"));
    assert_eq!(*journal.audio_decodes.lock().unwrap(), paths);
    assert_eq!(journal.audio_sinks.lock().unwrap().len(), 1);
    assert_eq!(*journal.audio_writes.lock().unwrap(), vec![2048, 2048, 2048]);
    assert_eq!(engine.status().audio.queue_len, 0);
}

#[test]
fn test_restart_from_ended_observer_does_not_block() {
    let journal = Arc::new(Journal::default());
    let engine = Arc::new(engine_with(ScriptedBackend::new(Arc::clone(&journal))));
    let (_dir, paths) = media_files(&["first.mp4", "second.mp4"]);
    engine.load(&paths);

    let restart_times = Arc::new(Mutex::new(Vec::new()));
    let weak: Weak<StreamEngine> = Arc::downgrade(&engine);
    let times = Arc::clone(&restart_times);
    engine.register_status_observer(Arc::new(move |msg: &str| {
        if msg != "Video streaming ended" {
            return;
        }
        if let Some(engine) = weak.upgrade() {
            let start = Instant::now();
            engine.start_streaming();
            times.lock().unwrap().push(start.elapsed());
        }
    }));

    engine.start_streaming();
    assert!(wait_until(Duration::from_secs(5), || {
        journal.video_opens().len() == 2 && !engine.status().video.streaming
    }));
    assert!(wait_until(Duration::from_secs(1), || restart_times.lock().unwrap().len() == 2));

    assert_eq!(journal.video_opens(), paths);
    assert_eq!(journal.frames_sent.load(Ordering::SeqCst), 6);
    for elapsed in restart_times.lock().unwrap().iter() {
        assert!(*elapsed < Duration::from_millis(500), "restart took {:?}", elapsed);
    }
    engine.shutdown();
}
