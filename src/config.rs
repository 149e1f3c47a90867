// SPDX-License-Identifier: GPL-3.0-only

//! User configuration stored as JSON under the XDG config directory

use crate::constants::{VirtualCameraOutput, audio, timing};
use crate::engine::EngineSettings;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Directory name below the platform config dir
const CONFIG_DIR_NAME: &str = "streamforge";

/// Config file name
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sink used for the virtual camera (PipeWire or V4L2 loopback)
    pub video_output: VirtualCameraOutput,
    /// PipeWire node name of the virtual microphone
    pub audio_device_name: String,
    /// Frames per audio chunk
    pub audio_chunk_frames: usize,
    /// Pause after a failed item, in milliseconds
    pub error_backoff_ms: u64,
    /// Bounded wait for a worker on stop, in milliseconds
    pub stop_timeout_ms: u64,
    /// Pause after each audio chunk, in milliseconds
    pub chunk_pause_ms: u64,
    /// Loop the video queue on startup
    pub loop_video: bool,
    /// Loop the audio queue on startup
    pub loop_audio: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            video_output: VirtualCameraOutput::default(),
            audio_device_name: audio::DEFAULT_DEVICE_NAME.to_string(),
            audio_chunk_frames: audio::CHUNK_FRAMES,
            error_backoff_ms: timing::ERROR_BACKOFF.as_millis() as u64,
            stop_timeout_ms: timing::STOP_TIMEOUT.as_millis() as u64,
            chunk_pause_ms: timing::CHUNK_PAUSE.as_millis() as u64,
            loop_video: false,
            loop_audio: false,
        }
    }
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load the config from the default location, falling back to defaults
    /// when no file exists yet
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Load the config from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Write the config to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// Engine tunables derived from this config
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            audio_device_name: self.audio_device_name.clone(),
            audio_chunk_frames: self.audio_chunk_frames.max(1),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
            chunk_pause: Duration::from_millis(self.chunk_pause_ms),
        }
    }
}
