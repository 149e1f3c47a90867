// SPDX-License-Identifier: GPL-3.0-only

//! GStreamer pipeline for virtual camera output
//!
//! Creates a pipeline that:
//! 1. Receives RGB frames from the video worker (via appsrc)
//! 2. Converts format as needed (via videoconvert)
//! 3. Outputs to a PipeWire virtual camera node or a v4l2loopback device

use crate::constants::{VirtualCameraOutput, timing, video};
use crate::errors::{BackendError, BackendResult};
use crate::media::PixelFormat;
use gstreamer::prelude::*;
use gstreamer_app::AppSrc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

static FRAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Virtual camera GStreamer pipeline
///
/// Accepts tightly packed RGB frames of a fixed size and frame rate.
pub struct VirtualCameraPipeline {
    pipeline: gstreamer::Pipeline,
    appsrc: AppSrc,
    width: u32,
    height: u32,
}

/// Closest GStreamer fraction for a floating point frame rate
fn framerate_fraction(fps: f64) -> gstreamer::Fraction {
    gstreamer::Fraction::approximate_f64(fps)
        .filter(|f| f.numer() > 0 && f.denom() > 0)
        .unwrap_or_else(|| gstreamer::Fraction::new(video::FALLBACK_FPS as i32, 1))
}

impl VirtualCameraPipeline {
    /// Create a new virtual camera pipeline
    ///
    /// With [`VirtualCameraOutput::PipeWire`] the node appears as
    /// "StreamForge Virtual Camera"; with [`VirtualCameraOutput::V4L2Loopback`]
    /// frames are written to the first loopback device found.
    pub fn new(
        output: VirtualCameraOutput,
        width: u32,
        height: u32,
        fps: f64,
    ) -> BackendResult<Self> {
        info!(
            width,
            height,
            fps,
            output = output.display_name(),
            "Creating virtual camera pipeline"
        );

        gstreamer::init().map_err(|e| {
            BackendError::InitializationFailed(format!("GStreamer init failed: {}", e))
        })?;

        let pipeline = gstreamer::Pipeline::new();

        let appsrc = gstreamer::ElementFactory::make("appsrc")
            .name("virtual_camera_src")
            .build()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create appsrc: {}", e))
            })?;

        // videoconvert: handles format negotiation between appsrc and the sink
        let videoconvert = gstreamer::ElementFactory::make("videoconvert")
            .name("virtual_camera_convert")
            .build()
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to create videoconvert: {}", e))
            })?;

        let sink = Self::make_sink(output)?;

        let appsrc = appsrc.downcast::<AppSrc>().map_err(|_| {
            BackendError::InitializationFailed("Failed to downcast to AppSrc".into())
        })?;

        let caps = gstreamer::Caps::builder("video/x-raw")
            .field("format", PixelFormat::Rgb.to_gst_format_string())
            .field("width", width as i32)
            .field("height", height as i32)
            .field("framerate", framerate_fraction(fps))
            .build();

        appsrc.set_caps(Some(&caps));
        appsrc.set_format(gstreamer::Format::Time);
        appsrc.set_is_live(true);
        appsrc.set_do_timestamp(true);

        pipeline
            .add_many([appsrc.upcast_ref(), &videoconvert, &sink])
            .map_err(|e| {
                BackendError::InitializationFailed(format!("Failed to add elements: {}", e))
            })?;

        gstreamer::Element::link_many([appsrc.upcast_ref(), &videoconvert, &sink]).map_err(
            |e| BackendError::InitializationFailed(format!("Failed to link elements: {}", e)),
        )?;

        debug!("Virtual camera pipeline created (RGB -> videoconvert -> sink)");

        Ok(Self {
            pipeline,
            appsrc,
            width,
            height,
        })
    }

    /// Build the output element for the chosen device type
    fn make_sink(output: VirtualCameraOutput) -> BackendResult<gstreamer::Element> {
        match output {
            VirtualCameraOutput::PipeWire => {
                let sink = gstreamer::ElementFactory::make("pipewiresink")
                    .name("virtual_camera_sink")
                    .build()
                    .map_err(|e| {
                        BackendError::NotAvailable(format!("Failed to create pipewiresink: {}", e))
                    })?;

                // "provide" mode creates a video source that other applications can use
                sink.set_property_from_str("mode", "provide");

                // media.role = "Camera" is required for xdg-desktop-portal to list the node
                let stream_props = gstreamer::Structure::builder("props")
                    .field("media.class", "Video/Source")
                    .field("media.role", "Camera")
                    .field("node.name", video::NODE_NAME)
                    .field("node.description", video::NODE_DESCRIPTION)
                    .build();
                sink.set_property("stream-properties", &stream_props);
                Ok(sink)
            }
            VirtualCameraOutput::V4L2Loopback => {
                let device = VirtualCameraOutput::v4l2loopback_device().ok_or_else(|| {
                    BackendError::NotAvailable("No v4l2loopback device found".into())
                })?;

                let sink = gstreamer::ElementFactory::make("v4l2sink")
                    .name("virtual_camera_sink")
                    .property("device", device.as_str())
                    .build()
                    .map_err(|e| {
                        BackendError::NotAvailable(format!("Failed to create v4l2sink: {}", e))
                    })?;
                debug!(device = %device, "Using v4l2loopback device");
                Ok(sink)
            }
        }
    }

    /// Start the pipeline
    pub fn start(&self) -> BackendResult<()> {
        debug!("Starting virtual camera pipeline");

        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| BackendError::DeviceOpen(format!("Failed to start pipeline: {}", e)))?;

        let (result, _state, _pending) = self
            .pipeline
            .state(gstreamer::ClockTime::from_seconds(timing::START_TIMEOUT_SECS));
        if result.is_err() {
            return Err(BackendError::DeviceOpen(
                "Pipeline failed to reach Playing state".into(),
            ));
        }

        info!("Virtual camera pipeline started");
        Ok(())
    }

    /// Stop the pipeline
    pub fn stop(&self) -> BackendResult<()> {
        debug!("Stopping virtual camera pipeline");

        self.appsrc
            .end_of_stream()
            .map_err(|e| BackendError::Other(format!("Failed to send EOS: {}", e)))?;

        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| BackendError::Other(format!("Failed to stop pipeline: {}", e)))?;

        info!("Virtual camera pipeline stopped");
        Ok(())
    }

    /// Push a tightly packed RGB frame to the virtual camera
    pub fn push_frame_rgb(&self, rgb_data: &[u8], width: u32, height: u32) -> BackendResult<()> {
        if width != self.width || height != self.height {
            return Err(BackendError::FormatNotSupported(format!(
                "Frame size {}x{} doesn't match pipeline {}x{}",
                width, height, self.width, self.height
            )));
        }

        let expected_size = (width * height * 3) as usize;
        if rgb_data.len() != expected_size {
            return Err(BackendError::FormatNotSupported(format!(
                "Frame data size {} doesn't match expected {} for {}x{} RGB",
                rgb_data.len(),
                expected_size,
                width,
                height
            )));
        }

        let buffer = gstreamer::Buffer::from_mut_slice(rgb_data.to_vec());

        match self.appsrc.push_buffer(buffer) {
            Ok(_) => {
                let count = FRAME_COUNTER.fetch_add(1, Ordering::Relaxed);
                if count % timing::FRAME_LOG_INTERVAL == 0 {
                    debug!(frame = count, "Virtual camera frames pushed");
                }
                Ok(())
            }
            Err(e) => {
                warn!(?e, "Failed to push frame to virtual camera");
                Err(BackendError::Stream(format!("Failed to push frame: {:?}", e)))
            }
        }
    }

    /// Check the bus for an asynchronous sink error
    pub fn poll_error(&self) -> Option<BackendError> {
        let bus = self.pipeline.bus()?;
        while let Some(msg) = bus.pop() {
            if let gstreamer::MessageView::Error(err) = msg.view() {
                return Some(BackendError::Stream(format!(
                    "Virtual camera error: {}",
                    err.error()
                )));
            }
        }
        None
    }
}

impl Drop for VirtualCameraPipeline {
    fn drop(&mut self) {
        debug!("Dropping virtual camera pipeline");
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            error!(?e, "Failed to set pipeline to Null on drop");
        }
    }
}
