// SPDX-License-Identifier: GPL-3.0-only

//! Video stream worker
//!
//! Pops video items, decodes them frame by frame and pushes RGB frames to the
//! virtual camera at the file's native rate.

use super::worker::WorkerContext;
use crate::backends::{VideoSink, VideoSource};
use crate::constants::timing;
use crate::errors::BackendError;
use crate::media::{MediaItem, VideoFrame};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Most recent frame sent to the virtual camera, for previews
#[derive(Debug, Default)]
pub struct LatestFrame {
    frame: Mutex<Option<Arc<VideoFrame>>>,
}

impl LatestFrame {
    pub fn publish(&self, frame: Arc<VideoFrame>) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }

    pub fn get(&self) -> Option<Arc<VideoFrame>> {
        self.frame
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear(&self) {
        *self.frame.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// How a single item ended
enum ItemOutcome {
    /// Reached end of stream
    Finished,
    /// Stop was requested mid-item
    Stopped,
    /// Source could not be opened; the item is dropped
    OpenFailed(BackendError),
    /// Sink open or streaming failure; requeued when looping
    Failed(BackendError),
}

/// Worker thread body
pub(crate) fn run(ctx: WorkerContext, latest: Arc<LatestFrame>) {
    if let Err(e) = ctx.backend.video_output_available() {
        ctx.report_error(e);
        ctx.finish();
        return;
    }

    while !ctx.should_stop() {
        let Some(item) = ctx.medium.queue.pop() else {
            debug!("Video queue drained");
            break;
        };
        ctx.set_current(Some(item.path()));

        let outcome = play_item(&ctx, &item, &latest);
        // Read once so requeue and continue agree
        let looping = ctx.medium.looping();

        match outcome {
            ItemOutcome::OpenFailed(e) => {
                ctx.report_error(e);
                ctx.backoff();
                continue;
            }
            ItemOutcome::Failed(e) => {
                if looping {
                    ctx.medium.queue.push(item);
                }
                ctx.report_error(e);
                ctx.backoff();
                continue;
            }
            ItemOutcome::Finished | ItemOutcome::Stopped => {
                if looping {
                    ctx.medium.queue.push(item);
                }
            }
        }

        if !looping {
            break;
        }
    }

    if ctx.medium.is_live(ctx.generation) {
        latest.clear();
    }
    ctx.finish();
}

/// Open the item, pump frames until EOS or stop, then release both handles
fn play_item(ctx: &WorkerContext, item: &MediaItem, latest: &LatestFrame) -> ItemOutcome {
    let mut source = match ctx.backend.open_video_source(item.path()) {
        Ok(source) => source,
        Err(e) => return ItemOutcome::OpenFailed(e),
    };
    let info = source.info();

    let mut sink = match ctx.backend.open_video_sink(&info) {
        Ok(sink) => sink,
        Err(e) => return ItemOutcome::Failed(e),
    };

    info!(
        path = %item.path().display(),
        width = info.width,
        height = info.height,
        fps = info.fps,
        "Streaming video"
    );

    pump_frames(ctx, source.as_mut(), sink.as_mut(), latest)
}

fn pump_frames(
    ctx: &WorkerContext,
    source: &mut dyn VideoSource,
    sink: &mut dyn VideoSink,
    latest: &LatestFrame,
) -> ItemOutcome {
    let mut frames_sent: u64 = 0;

    loop {
        if ctx.should_stop() {
            return ItemOutcome::Stopped;
        }

        let frame = match source.read_frame() {
            Ok(Some(frame)) => Some(frame),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Video read failed, treating as end of stream");
                None
            }
        };

        let Some(frame) = frame else {
            // Rewind only while something else is waiting its turn
            if ctx.medium.looping() && !ctx.medium.queue.is_empty() {
                if let Err(e) = source.seek_to_start() {
                    return ItemOutcome::Failed(e);
                }
                debug!("Rewound video for loop");
                continue;
            }
            debug!(frames_sent, "Video reached end of stream");
            return ItemOutcome::Finished;
        };

        let rgb = match frame.to_rgb() {
            Ok(rgb) => rgb,
            Err(e) => return ItemOutcome::Failed(e),
        };
        if let Err(e) = sink.send(&rgb) {
            return ItemOutcome::Failed(e);
        }
        latest.publish(Arc::new(rgb));

        frames_sent += 1;
        if frames_sent % timing::FRAME_LOG_INTERVAL == 0 {
            debug!(frames_sent, "Video frames sent");
        }

        sink.wait_for_next_slot();
    }
}
