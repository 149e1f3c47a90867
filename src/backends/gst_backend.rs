// SPDX-License-Identifier: GPL-3.0-only

//! Production backend: GStreamer decoding, PipeWire / v4l2loopback output

use super::audio::{self, VirtualMicrophone};
use super::virtual_camera::{VideoDecoder, VirtualCamera};
use super::{AudioSink, DecodedAudio, MediaBackend, VideoInfo, VideoSink, VideoSource};
use crate::constants::{VirtualCameraOutput, is_pipewire_available};
use crate::errors::{BackendError, BackendResult};
use std::path::Path;
use tracing::debug;

/// GStreamer based implementation of [`MediaBackend`]
#[derive(Debug, Clone)]
pub struct GstBackend {
    video_output: VirtualCameraOutput,
    audio_device_name: String,
}

impl GstBackend {
    /// `audio_device_name` is only used by diagnostics; sinks receive their
    /// device name per call
    pub fn new(video_output: VirtualCameraOutput, audio_device_name: impl Into<String>) -> Self {
        Self {
            video_output,
            audio_device_name: audio_device_name.into(),
        }
    }
}

impl MediaBackend for GstBackend {
    fn video_output_available(&self) -> BackendResult<()> {
        match self.video_output.unavailable_reason() {
            None => Ok(()),
            Some(reason) => Err(BackendError::NotAvailable(format!(
                "{} virtual camera unavailable: {}",
                self.video_output.display_name(),
                reason
            ))),
        }
    }

    fn open_video_source(&self, path: &Path) -> BackendResult<Box<dyn VideoSource>> {
        Ok(Box::new(VideoDecoder::new(path)?))
    }

    fn open_video_sink(&self, info: &VideoInfo) -> BackendResult<Box<dyn VideoSink>> {
        Ok(Box::new(VirtualCamera::open(self.video_output, info)?))
    }

    fn decode_audio(&self, path: &Path) -> BackendResult<DecodedAudio> {
        audio::decode_file(path)
    }

    fn open_audio_sink(
        &self,
        sample_rate: u32,
        channels: u32,
        device_name: &str,
    ) -> BackendResult<Box<dyn AudioSink>> {
        Ok(Box::new(VirtualMicrophone::open(
            sample_rate,
            channels,
            device_name,
        )?))
    }

    fn diagnostics(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Err(e) = gstreamer::init() {
            problems.push(format!("GStreamer could not be initialized: {}", e));
            return problems;
        }

        if let Some(reason) = self.video_output.unavailable_reason() {
            problems.push(format!(
                "Virtual camera ({}): {}",
                self.video_output.display_name(),
                reason
            ));
        }

        if !is_pipewire_available() {
            problems.push(
                "Virtual microphone: PipeWire not running or pipewiresink plugin not found"
                    .to_string(),
            );
        } else {
            let sources = audio::enumerate_audio_sources();
            debug!(count = sources.len(), "Enumerated audio sources");
            if sources.iter().any(|d| d.matches(&self.audio_device_name)) {
                problems.push(format!(
                    "Virtual microphone: a node named '{}' already exists",
                    self.audio_device_name
                ));
            }
        }

        for element in ["decodebin", "videoconvert", "audioconvert", "appsrc", "appsink"] {
            if gstreamer::ElementFactory::find(element).is_none() {
                problems.push(format!("GStreamer element '{}' not found", element));
            }
        }

        problems
    }
}
