// SPDX-License-Identifier: GPL-3.0-only

//! StreamForge - play local media files into a virtual camera and microphone
//!
//! Video files are decoded and pushed frame by frame, at their native rate,
//! into a virtual camera (PipeWire node or V4L2 loopback device). Audio files
//! are decoded and written in fixed-size chunks into a virtual microphone.
//! Other applications can then pick these devices like real hardware.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`engine`]: Stream controller, per-medium workers and notifications
//! - [`media`]: Media classification, playback queues and frames
//! - [`backends`]: Decoder and virtual device abstraction (GStreamer)
//! - [`config`]: User configuration handling
//! - [`constants`]: Supported formats, timings and defaults
//! - [`errors`]: Error types
//!
//! # Example
//!
//! ```ignore
//! use streamforge::{Config, MediaKind, StreamEngine};
//!
//! let engine = StreamEngine::from_config(&Config::default());
//! let report = engine.load(&["clips/", "music/theme.flac"]);
//! engine.set_loop(MediaKind::Video, true);
//! engine.start_streaming();
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod media;

// Re-export commonly used types
pub use config::Config;
pub use constants::VirtualCameraOutput;
pub use engine::{EngineSettings, EngineStatus, LoadReport, MediumStatus, StreamEngine};
pub use errors::{AppError, AppResult, BackendError, BackendResult};
pub use media::{MediaItem, MediaKind};
