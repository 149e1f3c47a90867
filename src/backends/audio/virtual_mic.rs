// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer pipeline for the virtual microphone
//!
//! `appsrc (F32LE stereo) → audioconvert → pipewiresink (provide)`
//!
//! The appsrc blocks once `SINK_MAX_BYTES` are queued, so `write` paces the
//! caller to the rate PipeWire consumes samples at.

use crate::backends::AudioSink;
use crate::constants::{audio, timing};
use crate::errors::{BackendError, BackendResult};
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use tracing::{debug, error, info, warn};

/// Virtual microphone exposed as a PipeWire `Audio/Source` node
pub struct VirtualMicrophone {
    pipeline: gstreamer::Pipeline,
    appsrc: AppSrc,
    channels: u32,
    running: bool,
}

impl VirtualMicrophone {
    /// Build the pipeline; nothing flows until [`AudioSink::start`]
    pub fn open(sample_rate: u32, channels: u32, device_name: &str) -> BackendResult<Self> {
        info!(sample_rate, channels, device = %device_name, "Creating virtual microphone");

        if channels != audio::OUTPUT_CHANNELS {
            return Err(BackendError::FormatNotSupported(format!(
                "Virtual microphone is stereo, got {} channels",
                channels
            )));
        }

        gstreamer::init().map_err(|e| {
            BackendError::InitializationFailed(format!("GStreamer init failed: {}", e))
        })?;

        let pipeline = gstreamer::Pipeline::new();

        let appsrc = gstreamer::ElementFactory::make("appsrc")
            .name("virtual_mic_src")
            .build()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create appsrc: {}", e))
            })?
            .downcast::<AppSrc>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to downcast to AppSrc".into())
            })?;

        let audioconvert = gstreamer::ElementFactory::make("audioconvert")
            .name("virtual_mic_convert")
            .build()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create audioconvert: {}", e))
            })?;

        let sink = gstreamer::ElementFactory::make("pipewiresink")
            .name("virtual_mic_sink")
            .build()
            .map_err(|e| {
                BackendError::DeviceOpen(format!("Failed to create pipewiresink: {}", e))
            })?;

        let caps = gstreamer::Caps::builder("audio/x-raw")
            .field("format", "F32LE")
            .field("layout", "interleaved")
            .field("rate", sample_rate as i32)
            .field("channels", channels as i32)
            .build();

        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_do_timestamp(true);
        appsrc.set_block(true);
        appsrc.set_max_bytes(audio::SINK_MAX_BYTES);

        sink.set_property_from_str("mode", "provide");
        let stream_props = gstreamer::Structure::builder("props")
            .field("media.class", "Audio/Source")
            .field("media.role", "Communication")
            .field("node.name", device_name)
            .field("node.description", device_name)
            .build();
        sink.set_property("stream-properties", &stream_props);

        pipeline
            .add_many([appsrc.upcast_ref(), &audioconvert, &sink])
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to add elements: {}", e))
            })?;
        gstreamer::Element::link_many([appsrc.upcast_ref(), &audioconvert, &sink]).map_err(
            |e| BackendError::InitializationFailed(format!("Failed to link elements: {}", e)),
        )?;

        Ok(Self {
            pipeline,
            appsrc,
            channels,
            running: false,
        })
    }
}

impl AudioSink for VirtualMicrophone {
    fn start(&mut self) -> BackendResult<()> {
        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| BackendError::DeviceOpen(format!("Failed to start pipeline: {}", e)))?;

        let (result, _state, _pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS));
        if result.is_err() {
            return Err(BackendError::DeviceOpen(
                "Virtual microphone failed to reach Playing state".into(),
            ));
        }

        self.running = true;
        info!("Virtual microphone started");
        Ok(())
    }

    fn write(&mut self, chunk: &[f32]) -> BackendResult<()> {
        if !self.running {
            return Err(BackendError::Stream("Virtual microphone not started".into()));
        }
        if chunk.len() % self.channels as usize != 0 {
            return Err(BackendError::FormatNotSupported(format!(
                "Chunk of {} samples is not a whole number of frames",
                chunk.len()
            )));
        }

        let bytes: Vec<u8> = chunk.iter().flat_map(|s| s.to_le_bytes()).collect();
        let buffer = gstreamer::Buffer::from_mut_slice(bytes);

        self.appsrc.push_buffer(buffer).map(|_| ()).map_err(|e| {
            warn!(?e, "Failed to push audio chunk");
            BackendError::Stream(format!("Failed to push audio: {:?}", e))
        })
    }

    fn stop(&mut self) -> BackendResult<()> {
        if !self.running {
            return Ok(());
        }
        self.running = false;

        if let Err(e) = self.appsrc.end_of_stream() {
            debug!(?e, "EOS not accepted by virtual microphone");
        }
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        info!("Virtual microphone stopped");
        Ok(())
    }
}

impl Drop for VirtualMicrophone {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!(?e, "Failed to set virtual microphone to Null on drop");
        }
    }
}
