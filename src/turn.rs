//! Incremental turn detection over a growing input audio buffer.
//!
//! This module decides, after every append, whether the speaker has started or
//! stopped talking. Cost per call is bounded: only a trailing window of the buffer is
//! re-analyzed, never the whole turn. The flip side is the window-eviction rule — a
//! span whose end has drifted out of the window's recent zone counts as evidence that
//! speech already ended, even though the detector still reports its residual tail.

use std::time::Instant;

use anyhow::Result;
use tracing::warn;

use crate::audio::MS_SAMPLE_RATE;
use crate::buffer::InputAudioBuffer;
use crate::config::TurnDetection;
use crate::detector::{DetectorOpts, SpeechDetector};

/// Maximum trailing window re-analyzed per append (ms).
pub const MAX_VAD_WINDOW_MS: u64 = 3_000;

/// Maximum trailing window re-analyzed per append (samples at the canonical rate).
pub const MAX_VAD_WINDOW_SAMPLES: usize = MAX_VAD_WINDOW_MS as usize * MS_SAMPLE_RATE;

/// A state transition produced by one evaluation. At most one per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadTransition {
    SpeechStarted { audio_start_ms: u64 },
    SpeechStopped { audio_end_ms: u64 },
}

/// Re-evaluate the trailing window of `buffer` and advance its VAD state.
///
/// Returns the transition that occurred, if any. The buffer's markers are the single
/// source of truth for the current state:
/// - no `audio_start_ms`: pre-speech, a span starts the turn
/// - `audio_start_ms` only: in-speech, silence (or a stale span) ends the turn
/// - `audio_end_ms` set: closed, the engine never re-enters a finished turn
///
/// A detector failure does not fail the append: the evaluation is skipped with a
/// warning and prior state is preserved, which keeps the session live at the cost of
/// one delayed decision.
pub fn evaluate<D: SpeechDetector>(
    buffer: &mut InputAudioBuffer,
    config: &TurnDetection,
    detector: &mut D,
) -> Result<Option<VadTransition>> {
    if buffer.vad_state.audio_end_ms.is_some() {
        return Ok(None);
    }

    let data = buffer.data();
    let window = &data[data.len().saturating_sub(MAX_VAD_WINDOW_SAMPLES)..];
    let window_ms = (window.len() / MS_SAMPLE_RATE) as u64;

    let opts = DetectorOpts {
        threshold: config.threshold,
        min_silence_duration_ms: config.silence_duration_ms,
        speech_pad_ms: config.prefix_padding_ms,
    };

    let started_at = Instant::now();
    let spans = match detector.speech_spans(window, &opts) {
        Ok(spans) => spans,
        Err(err) => {
            warn!(buffer_id = buffer.id(), error = %err, "speech detector failed; skipping evaluation");
            return Ok(None);
        }
    };

    let elapsed_ms = started_at.elapsed().as_millis() as u64;
    if window_ms > 0 && elapsed_ms > window_ms {
        warn!(
            elapsed_ms,
            window_ms, "speech detector is running slower than realtime"
        );
    }

    if spans.len() > 1 {
        // Earlier spans should have been resolved by prior calls; the most recent one
        // is authoritative.
        warn!(buffer_id = buffer.id(), count = spans.len(), "more than one speech span in window");
    }

    let span_ms = spans.last().map(|span| {
        (
            (span.start / MS_SAMPLE_RATE) as u64,
            (span.end / MS_SAMPLE_RATE) as u64,
        )
    });

    let duration_ms = buffer.duration_ms();

    match (buffer.vad_state.audio_start_ms, span_ms) {
        (None, None) => Ok(None),
        (None, Some((start_ms, _))) => {
            let audio_start_ms = duration_ms - window_ms + start_ms;
            buffer.vad_state.audio_start_ms = Some(audio_start_ms);
            Ok(Some(VadTransition::SpeechStarted { audio_start_ms }))
        }
        (Some(_), None) => Ok(Some(stop(buffer, config, duration_ms))),
        (Some(_), Some((_, end_ms))) => {
            // NOTE: tied to the 3000ms window size; the "recent zone" boundary must be
            // re-derived if MAX_VAD_WINDOW_MS ever changes.
            let stale = end_ms < MAX_VAD_WINDOW_MS && duration_ms > MAX_VAD_WINDOW_MS;
            if stale {
                Ok(Some(stop(buffer, config, duration_ms)))
            } else {
                Ok(None)
            }
        }
    }
}

fn stop(buffer: &mut InputAudioBuffer, config: &TurnDetection, duration_ms: u64) -> VadTransition {
    let audio_end_ms = duration_ms.saturating_sub(config.prefix_padding_ms as u64);
    buffer.vad_state.audio_end_ms = Some(audio_end_ms);
    VadTransition::SpeechStopped { audio_end_ms }
}
