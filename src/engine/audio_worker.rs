// SPDX-License-Identifier: GPL-3.0-only

//! Audio stream worker
//!
//! Each item is decoded fully into memory, forced to stereo, then written to
//! the virtual microphone in fixed-size chunks. The last chunk is padded
//! with silence so the sink never sees a short write.

use super::worker::WorkerContext;
use crate::backends::AudioSink;
use crate::constants::audio;
use crate::errors::BackendError;
use crate::media::MediaItem;
use std::thread;
use tracing::{debug, info, warn};

enum ItemOutcome {
    Finished,
    Stopped,
    Failed(BackendError),
}

/// Worker thread body
pub(crate) fn run(ctx: WorkerContext) {
    while !ctx.should_stop() {
        let Some(item) = ctx.medium.queue.pop() else {
            debug!("Audio queue drained");
            break;
        };
        ctx.set_current(Some(item.path()));

        let outcome = play_item(&ctx, &item);
        let looping = ctx.medium.looping();

        match outcome {
            ItemOutcome::Finished => {
                if looping {
                    ctx.medium.queue.push(item);
                }
            }
            ItemOutcome::Stopped => {}
            ItemOutcome::Failed(e) => {
                ctx.report_error(e);
                ctx.backoff();
                continue;
            }
        }

        if !looping {
            break;
        }
    }

    ctx.finish();
}

fn play_item(ctx: &WorkerContext, item: &MediaItem) -> ItemOutcome {
    let decoded = match ctx.backend.decode_audio(item.path()) {
        Ok(decoded) => decoded.into_stereo(),
        Err(e) => return ItemOutcome::Failed(e),
    };

    let mut sink = match ctx.backend.open_audio_sink(
        decoded.sample_rate,
        audio::OUTPUT_CHANNELS,
        &ctx.settings.audio_device_name,
    ) {
        Ok(sink) => sink,
        Err(e) => return ItemOutcome::Failed(e),
    };

    info!(
        path = %item.path().display(),
        sample_rate = decoded.sample_rate,
        frames = decoded.frames(),
        "Streaming audio"
    );

    let outcome = match sink.start() {
        Ok(()) => write_chunks(ctx, sink.as_mut(), &decoded.samples),
        Err(e) => ItemOutcome::Failed(e),
    };

    if let Err(e) = sink.stop() {
        warn!(error = %e, "Failed to stop audio sink");
    }
    outcome
}

/// Split `samples` into chunks of `frames_per_chunk` stereo frames,
/// zero-padding the tail chunk
pub(crate) fn padded_chunks(
    samples: &[f32],
    frames_per_chunk: usize,
) -> impl Iterator<Item = Vec<f32>> + '_ {
    let chunk_len = frames_per_chunk.max(1) * audio::OUTPUT_CHANNELS as usize;
    samples.chunks(chunk_len).map(move |chunk| {
        let mut buf = chunk.to_vec();
        buf.resize(chunk_len, 0.0);
        buf
    })
}

fn write_chunks(ctx: &WorkerContext, sink: &mut dyn AudioSink, samples: &[f32]) -> ItemOutcome {
    for chunk in padded_chunks(samples, ctx.settings.audio_chunk_frames) {
        if ctx.should_stop() {
            return ItemOutcome::Stopped;
        }
        if let Err(e) = sink.write(&chunk) {
            return ItemOutcome::Failed(e);
        }
        thread::sleep(ctx.settings.chunk_pause);
    }
    ItemOutcome::Finished
}
