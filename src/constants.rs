// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Supported media file formats
pub mod file_formats {
    /// Supported video file extensions
    pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

    /// Supported audio file extensions
    pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "flac", "ogg", "aac"];

    /// Check if a file extension is a supported video format
    pub fn is_video_extension(ext: &str) -> bool {
        VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }

    /// Check if a file extension is a supported audio format
    pub fn is_audio_extension(ext: &str) -> bool {
        AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }

    /// Check if a file extension belongs to any supported format
    pub fn is_media_extension(ext: &str) -> bool {
        is_video_extension(ext) || is_audio_extension(ext)
    }
}

/// Streaming timing constants
pub mod timing {
    use super::Duration;

    /// Backoff after a failed item, so a broken file cannot spin the worker
    pub const ERROR_BACKOFF: Duration = Duration::from_secs(1);

    /// How long `stop_streaming` waits for a worker before detaching it
    pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

    /// Pause after each audio chunk write
    pub const CHUNK_PAUSE: Duration = Duration::from_millis(1);

    /// Granularity of the interruptible error backoff
    pub const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(50);

    /// GStreamer pipeline timeout for preroll and caps negotiation
    pub const PREROLL_TIMEOUT_SECS: u64 = 5;

    /// Timeout when waiting for the sink pipeline to reach Playing
    pub const START_TIMEOUT_SECS: u64 = 5;

    /// Log a frame counter every N frames
    pub const FRAME_LOG_INTERVAL: u64 = 100;
}

/// Audio output constants
pub mod audio {
    /// Frames per chunk written to the virtual microphone
    pub const CHUNK_FRAMES: usize = 1024;

    /// The virtual microphone is always stereo
    pub const OUTPUT_CHANNELS: u32 = 2;

    /// Default PipeWire node name of the virtual microphone
    pub const DEFAULT_DEVICE_NAME: &str = "StreamForge Virtual Microphone";

    /// Upper bound of queued bytes inside the sink before `write` blocks
    pub const SINK_MAX_BYTES: u64 = 64 * 1024;
}

/// Video output constants
pub mod video {
    /// PipeWire node name of the virtual camera
    pub const NODE_NAME: &str = "streamforge-virtual-camera";

    /// Human readable description of the virtual camera
    pub const NODE_DESCRIPTION: &str = "StreamForge Virtual Camera";

    /// Framerate used when a file does not advertise one
    pub const FALLBACK_FPS: f64 = 30.0;
}

/// Virtual camera output device type
///
/// Determines which sink to use for virtual camera output:
/// - PipeWire: Modern Linux multimedia framework (default)
/// - V4L2Loopback: Traditional V4L2 loopback device (better app compatibility)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VirtualCameraOutput {
    /// PipeWire virtual camera (pipewiresink)
    #[default]
    PipeWire,
    /// V4L2 loopback device (v4l2sink)
    /// Works with applications that expect /dev/video* devices (e.g., Discord, Chrome)
    V4L2Loopback,
}

impl VirtualCameraOutput {
    /// Get all output variants for iteration
    pub const ALL: [VirtualCameraOutput; 2] = [
        VirtualCameraOutput::PipeWire,
        VirtualCameraOutput::V4L2Loopback,
    ];

    /// Get display name for the output type
    pub fn display_name(&self) -> &'static str {
        match self {
            VirtualCameraOutput::PipeWire => "PipeWire",
            VirtualCameraOutput::V4L2Loopback => "V4L2 Loopback",
        }
    }

    /// Parse a command line spelling ("pipewire", "v4l2")
    pub fn from_arg(arg: &str) -> Option<Self> {
        match arg.to_lowercase().as_str() {
            "pipewire" | "pw" => Some(VirtualCameraOutput::PipeWire),
            "v4l2" | "v4l2loopback" | "loopback" => Some(VirtualCameraOutput::V4L2Loopback),
            _ => None,
        }
    }

    /// Check if this output type is available on the system
    pub fn is_available(&self) -> bool {
        match self {
            VirtualCameraOutput::PipeWire => is_pipewire_available(),
            VirtualCameraOutput::V4L2Loopback => find_v4l2loopback_device().is_some(),
        }
    }

    /// Get a description of why this output might not be available
    pub fn unavailable_reason(&self) -> Option<&'static str> {
        if self.is_available() {
            return None;
        }
        match self {
            VirtualCameraOutput::PipeWire => {
                Some("PipeWire not running or pipewiresink plugin not found")
            }
            VirtualCameraOutput::V4L2Loopback => Some("v4l2loopback module not loaded"),
        }
    }

    /// Get the v4l2loopback device path if available
    pub fn v4l2loopback_device() -> Option<String> {
        find_v4l2loopback_device()
    }
}

/// Check if PipeWire is available (GStreamer plugin present)
pub fn is_pipewire_available() -> bool {
    if gstreamer::init().is_err() {
        return false;
    }
    gstreamer::ElementFactory::find("pipewiresink").is_some()
}

/// Find a v4l2loopback device
///
/// Scans /dev/video* devices and checks the driver name via sysfs.
fn find_v4l2loopback_device() -> Option<String> {
    use std::fs;
    use std::path::Path;

    // In sandboxes /proc/modules may be unreadable; keep scanning then
    let modules_path = Path::new("/proc/modules");
    let module_check_passed = if modules_path.exists() {
        match fs::read_to_string(modules_path) {
            Ok(content) => content.contains("v4l2loopback"),
            Err(_) => true,
        }
    } else {
        true
    };

    if !module_check_passed {
        return None;
    }

    let dev_path = Path::new("/dev");
    if !dev_path.exists() {
        return None;
    }

    let mut video_devices: Vec<_> = fs::read_dir(dev_path)
        .ok()?
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with("video"))
        .collect();
    video_devices.sort_by_key(|e| e.file_name());

    for entry in video_devices {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        let Some(device_num) = name_str.strip_prefix("video") else {
            continue;
        };
        let sysfs_name = format!("/sys/class/video4linux/video{}/name", device_num);

        if let Ok(device_name) = fs::read_to_string(&sysfs_name) {
            let device_name = device_name.trim();
            if device_name.contains("Dummy video device")
                || device_name.to_lowercase().contains("loopback")
                || device_name.to_lowercase().contains("virtual")
            {
                return Some(entry.path().to_string_lossy().to_string());
            }
        }
    }

    None
}

/// Application information utilities
pub mod app_info {
    use std::path::Path;

    /// Get the application version from build-time environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    /// Check if the application is running inside a Flatpak sandbox
    pub fn is_flatpak() -> bool {
        Path::new("/.flatpak-info").exists()
    }

    /// Get the runtime environment string (e.g., "Flatpak" or "Native")
    pub fn runtime_environment() -> &'static str {
        if is_flatpak() { "Flatpak" } else { "Native" }
    }
}
