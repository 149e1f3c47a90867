// SPDX-License-Identifier: GPL-3.0-only

//! Backend abstraction layer for media decoding and virtual devices
//!
//! The stream workers only talk to the traits in this module. The production
//! implementation is [`GstBackend`], which decodes files with GStreamer and
//! exposes the results as PipeWire nodes:
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               Stream workers                │
//! └────────────────────┬────────────────────────┘
//!                      │ MediaBackend
//! ┌────────────────────┴────────────────────────┐
//! │  ┌──────────────────┐  ┌─────────────────┐  │
//! │  │  Virtual Camera  │  │  Virtual Mic    │  │
//! │  │ file → appsink   │  │ decode → buffer │  │
//! │  │ appsrc → pw/v4l2 │  │ appsrc → pw     │  │
//! │  └──────────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Handles are released by dropping them. Each handle is owned by exactly one
//! worker thread, hence the `Send` bounds.
//!
//! # Modules
//!
//! - [`audio`]: Audio decoding, virtual microphone sink, device enumeration
//! - [`virtual_camera`]: Video file decoding and virtual camera sink
//! - [`pacing`]: Real-time frame clock used by video sinks

pub mod audio;
mod gst_backend;
pub mod pacing;
pub mod virtual_camera;

pub use gst_backend::GstBackend;

use crate::errors::BackendResult;
use crate::media::VideoFrame;
use std::path::Path;

/// Intrinsic properties of an opened video file
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// A fully decoded audio file
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u32,
}

impl DecodedAudio {
    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels as usize
        }
    }

    /// Force a two channel layout
    ///
    /// Mono is duplicated into both channels; layouts wider than stereo keep
    /// their first two channels.
    pub fn into_stereo(self) -> DecodedAudio {
        let channels = self.channels as usize;
        let samples = match channels {
            2 => self.samples,
            0 => Vec::new(),
            1 => self.samples.iter().flat_map(|&s| [s, s]).collect(),
            _ => self
                .samples
                .chunks_exact(channels)
                .flat_map(|frame| [frame[0], frame[1]])
                .collect(),
        };

        DecodedAudio {
            samples,
            sample_rate: self.sample_rate,
            channels: 2,
        }
    }
}

/// An open decoder bound to one video file
pub trait VideoSource: Send {
    /// Width, height and frame rate of the file
    fn info(&self) -> VideoInfo;

    /// Decode the next frame; `Ok(None)` at end of stream
    fn read_frame(&mut self) -> BackendResult<Option<VideoFrame>>;

    /// Rewind to the first frame
    fn seek_to_start(&mut self) -> BackendResult<()>;
}

/// An open virtual camera
pub trait VideoSink: Send {
    /// Send one tightly packed RGB frame matching the sink dimensions
    fn send(&mut self, frame: &VideoFrame) -> BackendResult<()>;

    /// Block until the next frame slot is due
    fn wait_for_next_slot(&mut self);
}

/// An open virtual microphone
pub trait AudioSink: Send {
    fn start(&mut self) -> BackendResult<()>;

    /// Write one chunk of interleaved stereo samples
    fn write(&mut self, chunk: &[f32]) -> BackendResult<()>;

    fn stop(&mut self) -> BackendResult<()>;
}

/// Factory for decoders and virtual devices
pub trait MediaBackend: Send + Sync {
    /// Whether the virtual camera integration can be used at all
    fn video_output_available(&self) -> BackendResult<()>;

    fn open_video_source(&self, path: &Path) -> BackendResult<Box<dyn VideoSource>>;

    /// Open a virtual camera configured with exactly `info`
    fn open_video_sink(&self, info: &VideoInfo) -> BackendResult<Box<dyn VideoSink>>;

    /// Decode a whole audio file at its native rate and channel count
    fn decode_audio(&self, path: &Path) -> BackendResult<DecodedAudio>;

    fn open_audio_sink(
        &self,
        sample_rate: u32,
        channels: u32,
        device_name: &str,
    ) -> BackendResult<Box<dyn AudioSink>>;

    /// Human readable problems with the device integration
    fn diagnostics(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_duplicated() {
        let audio = DecodedAudio {
            samples: vec![0.1, 0.2, 0.3],
            sample_rate: 22_050,
            channels: 1,
        };
        let stereo = audio.into_stereo();
        assert_eq!(stereo.channels, 2);
        assert_eq!(stereo.samples, vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
        assert_eq!(stereo.frames(), 3);
        assert_eq!(stereo.sample_rate, 22_050);
    }

    #[test]
    fn test_surround_keeps_front_pair() {
        let audio = DecodedAudio {
            samples: vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            sample_rate: 48_000,
            channels: 3,
        };
        let stereo = audio.into_stereo();
        assert_eq!(stereo.samples, vec![1.0, 2.0, 4.0, 5.0]);
    }
}
