// SPDX-License-Identifier: GPL-3.0-only

//! Virtual camera backend for streaming video files
//!
//! This module creates a virtual camera device that other applications (like
//! video conferencing software) can use as a camera source.
//!
//! # Architecture
//!
//! ```text
//!   Video file
//!        │
//!        ▼
//! ┌──────────────────┐
//! │ VideoDecoder     │  ← filesrc → decodebin → videoconvert → appsink
//! │ (file → RGBA)    │
//! └──────────────────┘
//!        │  to_rgb()
//!        ▼
//! ┌──────────────────┐
//! │ VirtualCamera    │  ← appsrc → videoconvert → pipewiresink / v4l2sink
//! │ (paced RGB)      │    FrameClock enforces the file's frame rate
//! └──────────────────┘
//!        │
//!        ▼
//!   Video Apps (Zoom, Teams, etc.)
//! ```

mod file_source;
mod pipeline;

pub use file_source::VideoDecoder;
pub use pipeline::VirtualCameraPipeline;

use crate::backends::pacing::FrameClock;
use crate::backends::{VideoInfo, VideoSink};
use crate::constants::VirtualCameraOutput;
use crate::errors::{BackendError, BackendResult};
use crate::media::{PixelFormat, VideoFrame};
use tracing::{error, info};

/// An open virtual camera paced to a fixed frame rate
pub struct VirtualCamera {
    pipeline: VirtualCameraPipeline,
    clock: FrameClock,
    info: VideoInfo,
}

impl VirtualCamera {
    /// Open the virtual camera with exactly the given size and rate
    pub fn open(output: VirtualCameraOutput, info: &VideoInfo) -> BackendResult<Self> {
        let pipeline = VirtualCameraPipeline::new(output, info.width, info.height, info.fps)?;
        pipeline.start()?;

        info!(
            width = info.width,
            height = info.height,
            fps = info.fps,
            "Virtual camera started"
        );

        Ok(Self {
            pipeline,
            clock: FrameClock::new(info.fps),
            info: *info,
        })
    }
}

impl VideoSink for VirtualCamera {
    fn send(&mut self, frame: &VideoFrame) -> BackendResult<()> {
        if frame.format != PixelFormat::Rgb {
            return Err(BackendError::FormatNotSupported(format!(
                "Virtual camera expects RGB frames, got {:?}",
                frame.format
            )));
        }
        if let Some(e) = self.pipeline.poll_error() {
            return Err(e);
        }
        self.pipeline
            .push_frame_rgb(&frame.data, frame.width, frame.height)
    }

    fn wait_for_next_slot(&mut self) {
        self.clock.wait();
    }
}

impl Drop for VirtualCamera {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.stop() {
            error!(?e, "Failed to stop virtual camera on drop");
        }
        info!(
            width = self.info.width,
            height = self.info.height,
            "Virtual camera stopped"
        );
    }
}
