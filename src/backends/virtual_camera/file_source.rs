// SPDX-License-Identifier: GPL-3.0-only

//! Video file decoding for the virtual camera
//!
//! Frames are pulled from an appsink as fast as the consumer asks for them;
//! real-time pacing is the sink's job, so the appsink runs with `sync=false`.

use crate::backends::{VideoInfo, VideoSource};
use crate::constants::{timing, video};
use crate::errors::{BackendError, BackendResult};
use crate::media::{PixelFormat, VideoFrame};
use gstreamer::prelude::*;
use gstreamer_video::VideoInfo as GstVideoInfo;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Drain the bus until preroll completes or an error is posted
fn wait_for_preroll(pipeline: &gstreamer::Pipeline, timeout_secs: u64) -> BackendResult<()> {
    let bus = pipeline
        .bus()
        .ok_or_else(|| BackendError::Other("No bus on pipeline".into()))?;
    let deadline = std::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);

    while std::time::Instant::now() < deadline {
        if let Some(msg) = bus.timed_pop(gstreamer::ClockTime::from_mseconds(100)) {
            use gstreamer::MessageView;
            match msg.view() {
                MessageView::Error(err) => {
                    return Err(BackendError::SourceOpen(format!(
                        "Pipeline error: {}",
                        err.error()
                    )));
                }
                MessageView::AsyncDone(_) => return Ok(()),
                _ => {}
            }
        }
    }

    Err(BackendError::SourceOpen(
        "Timeout waiting for video preroll".into(),
    ))
}

/// Video file decoder producing packed RGBA frames
pub struct VideoDecoder {
    pipeline: gstreamer::Pipeline,
    appsink: gstreamer_app::AppSink,
    info: VideoInfo,
}

impl VideoDecoder {
    /// Open `path` and preroll far enough to learn its dimensions and rate
    pub fn new(path: &Path) -> BackendResult<Self> {
        info!(path = %path.display(), "Creating video decoder");

        if !path.is_file() {
            return Err(BackendError::SourceOpen(format!(
                "Could not open video file: {}",
                path.display()
            )));
        }

        gstreamer::init().map_err(|e| {
            BackendError::InitializationFailed(format!("GStreamer init failed: {}", e))
        })?;

        // Location is set as a property so quotes in file names are harmless
        let description = format!(
            "filesrc name=src ! decodebin ! queue ! videoconvert ! \
             video/x-raw,format={} ! appsink name=videosink sync=false max-buffers=4",
            PixelFormat::Rgba.to_gst_format_string()
        );
        let pipeline = gstreamer::parse::launch(&description)
            .map_err(|e| {
                BackendError::InitializationFailed(format!(
                    "Failed to create video pipeline: {}",
                    e
                ))
            })?
            .downcast::<gstreamer::Pipeline>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to downcast to Pipeline".into())
            })?;

        let filesrc = pipeline.by_name("src").ok_or_else(|| {
            BackendError::InitializationFailed("Failed to find filesrc".into())
        })?;
        filesrc.set_property("location", path.to_string_lossy().to_string());

        let appsink = pipeline
            .by_name("videosink")
            .ok_or_else(|| {
                BackendError::InitializationFailed("Failed to find video appsink".into())
            })?
            .downcast::<gstreamer_app::AppSink>()
            .map_err(|_| {
                BackendError::InitializationFailed("Failed to downcast to AppSink".into())
            })?;

        if let Err(e) = pipeline.set_state(gstreamer::State::Paused) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::SourceOpen(format!(
                "Failed to pause pipeline: {:?}",
                e
            )));
        }

        if let Err(e) = wait_for_preroll(&pipeline, timing::PREROLL_TIMEOUT_SECS) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(e);
        }

        let info = match Self::probe_info(&appsink) {
            Ok(info) => info,
            Err(e) => {
                let _ = pipeline.set_state(gstreamer::State::Null);
                return Err(e);
            }
        };

        if let Err(e) = pipeline.set_state(gstreamer::State::Playing) {
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(BackendError::SourceOpen(format!(
                "Failed to start video pipeline: {:?}",
                e
            )));
        }

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Video decoder created"
        );

        Ok(Self {
            pipeline,
            appsink,
            info,
        })
    }

    /// Read dimensions and frame rate from the preroll sample caps
    fn probe_info(appsink: &gstreamer_app::AppSink) -> BackendResult<VideoInfo> {
        let sample = appsink
            .try_pull_preroll(gstreamer::ClockTime::from_seconds(
                timing::PREROLL_TIMEOUT_SECS,
            ))
            .ok_or_else(|| BackendError::SourceOpen("No preroll frame available".into()))?;
        let caps = sample
            .caps()
            .ok_or_else(|| BackendError::SourceOpen("No caps on preroll sample".into()))?;
        let gst_info = GstVideoInfo::from_caps(caps)
            .map_err(|e| BackendError::SourceOpen(format!("Invalid video caps: {}", e)))?;

        if gst_info.width() == 0 || gst_info.height() == 0 {
            return Err(BackendError::SourceOpen(
                "Failed to determine video dimensions".into(),
            ));
        }

        let fraction = gst_info.fps();
        let fps = if fraction.numer() > 0 && fraction.denom() > 0 {
            fraction.numer() as f64 / fraction.denom() as f64
        } else {
            warn!("Video has no fixed framerate, assuming fallback");
            video::FALLBACK_FPS
        };

        Ok(VideoInfo {
            width: gst_info.width(),
            height: gst_info.height(),
            fps,
        })
    }

    /// Convert a GStreamer sample to a VideoFrame using its own caps
    fn sample_to_frame(sample: &gstreamer::Sample) -> BackendResult<VideoFrame> {
        let caps = sample
            .caps()
            .ok_or_else(|| BackendError::Stream("No caps on sample".into()))?;
        let gst_info = GstVideoInfo::from_caps(caps)
            .map_err(|e| BackendError::Stream(format!("Invalid video caps: {}", e)))?;
        let format = PixelFormat::from_gst_format_string(gst_info.format().to_str().as_str())
            .ok_or_else(|| {
                BackendError::FormatNotSupported(format!(
                    "Unexpected format {:?}",
                    gst_info.format()
                ))
            })?;

        let buffer = sample
            .buffer()
            .ok_or_else(|| BackendError::Stream("No buffer in sample".into()))?;
        let map = buffer
            .map_readable()
            .map_err(|_| BackendError::Stream("Failed to map buffer".into()))?;

        Ok(VideoFrame {
            data: Arc::from(map.as_slice()),
            width: gst_info.width(),
            height: gst_info.height(),
            stride: gst_info.stride()[0] as u32,
            format,
        })
    }

    /// First error message waiting on the bus, if any
    fn pending_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
        match msg.view() {
            gstreamer::MessageView::Error(err) => Some(err.error().to_string()),
            _ => None,
        }
    }
}

impl VideoSource for VideoDecoder {
    fn info(&self) -> VideoInfo {
        self.info
    }

    fn read_frame(&mut self) -> BackendResult<Option<VideoFrame>> {
        match self
            .appsink
            .try_pull_sample(gstreamer::ClockTime::from_seconds(timing::PREROLL_TIMEOUT_SECS))
        {
            Some(sample) => Self::sample_to_frame(&sample).map(Some),
            None if self.appsink.is_eos() => {
                debug!("Video reached end of stream");
                Ok(None)
            }
            None => match self.pending_error() {
                Some(msg) => Err(BackendError::Stream(msg)),
                None => Err(BackendError::Stream("Timeout waiting for video frame".into())),
            },
        }
    }

    fn seek_to_start(&mut self) -> BackendResult<()> {
        debug!("Restarting video for loop");

        self.pipeline
            .seek_simple(
                gstreamer::SeekFlags::FLUSH | gstreamer::SeekFlags::KEY_UNIT,
                gstreamer::ClockTime::ZERO,
            )
            .map_err(|e| BackendError::Stream(format!("Video seek failed: {}", e)))
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        let _ = self.pipeline.set_state(gstreamer::State::Null);
        debug!("Video decoder released");
    }
}
