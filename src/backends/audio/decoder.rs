// SPDX-License-Identifier: GPL-3.0-only

//! Whole-file audio decoding
//!
//! The audio worker plays a file from an in-memory buffer, so decoding runs
//! the pipeline to end of stream without clock sync and collects every
//! sample as interleaved `f32` at the file's native rate and channel count.

use crate::backends::DecodedAudio;
use crate::constants::timing;
use crate::errors::{BackendError, BackendResult};
use gstreamer::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Little-endian f32 bytes to samples
fn samples_from_bytes(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Decode `path` completely into memory
pub fn decode_file(path: &Path) -> BackendResult<DecodedAudio> {
    info!(path = %path.display(), "Decoding audio file");

    if !path.is_file() {
        return Err(BackendError::SourceOpen(format!(
            "Could not open audio file: {}",
            path.display()
        )));
    }

    gstreamer::init().map_err(|e| {
        BackendError::InitializationFailed(format!("GStreamer init failed: {}", e))
    })?;

    let pipeline = gstreamer::parse::launch(
        "filesrc name=src ! decodebin ! queue ! audioconvert ! \
         audio/x-raw,format=F32LE,layout=interleaved ! appsink name=audiosink sync=false",
    )
    .map_err(|e| {
        BackendError::InitializationFailed(format!("Failed to create audio pipeline: {}", e))
    })?
    .downcast::<gstreamer::Pipeline>()
    .map_err(|_| BackendError::InitializationFailed("Failed to downcast to Pipeline".into()))?;

    let filesrc = pipeline
        .by_name("src")
        .ok_or_else(|| BackendError::InitializationFailed("Failed to find filesrc".into()))?;
    filesrc.set_property("location", path.to_string_lossy().to_string());

    let appsink = pipeline
        .by_name("audiosink")
        .ok_or_else(|| {
            BackendError::InitializationFailed("Failed to find audio appsink".into())
        })?
        .downcast::<gstreamer_app::AppSink>()
        .map_err(|_| BackendError::InitializationFailed("Failed to downcast to AppSink".into()))?;

    if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
        let _ = pipeline.set_state(gstreamer::State::Null);
        return Err(BackendError::SourceOpen(format!(
            "Failed to start audio pipeline: {:?}",
            e
        )));
    }

    let result = pull_all(&pipeline, &appsink);
    let _ = pipeline.set_state(gstreamer::State::Null);

    let audio = result?;
    info!(
        sample_rate = audio.sample_rate,
        channels = audio.channels,
        frames = audio.frames(),
        "Audio file decoded"
    );
    Ok(audio)
}

/// Pull samples until end of stream
fn pull_all(
    pipeline: &gstreamer::Pipeline,
    appsink: &gstreamer_app::AppSink,
) -> BackendResult<DecodedAudio> {
    let mut audio = DecodedAudio::default();
    let timeout = gstreamer::ClockTime::from_seconds(timing::PREROLL_TIMEOUT_SECS);

    loop {
        let Some(sample) = appsink.try_pull_sample(timeout) else {
            if appsink.is_eos() {
                break;
            }
            return Err(bus_error(pipeline)
                .unwrap_or_else(|| BackendError::SourceOpen("Timeout decoding audio".into())));
        };

        if audio.sample_rate == 0 {
            let structure = sample
                .caps()
                .and_then(|caps| caps.structure(0))
                .ok_or_else(|| BackendError::SourceOpen("No caps on audio sample".into()))?;
            let rate = structure
                .get::<i32>("rate")
                .map_err(|_| BackendError::SourceOpen("No rate in caps".into()))?;
            let channels = structure
                .get::<i32>("channels")
                .map_err(|_| BackendError::SourceOpen("No channels in caps".into()))?;
            audio.sample_rate = rate.max(0) as u32;
            audio.channels = channels.max(0) as u32;
            debug!(rate, channels, "Negotiated audio caps");
        }

        let buffer = sample
            .buffer()
            .ok_or_else(|| BackendError::Stream("No buffer in sample".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|_| BackendError::Stream("Failed to map buffer".into()))?;
        audio.samples.extend(samples_from_bytes(map.as_slice()));
    }

    if audio.sample_rate == 0 || audio.channels == 0 {
        return Err(BackendError::SourceOpen("File contains no audio".into()));
    }

    Ok(audio)
}

/// Error posted on the pipeline bus, if any
fn bus_error(pipeline: &gstreamer::Pipeline) -> Option<BackendError> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
    match msg.view() {
        gstreamer::MessageView::Error(err) => Some(BackendError::SourceOpen(format!(
            "Audio pipeline error: {}",
            err.error()
        ))),
        _ => None,
    }
}
