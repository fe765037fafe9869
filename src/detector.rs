//! The speech-detection capability consumed by the turn-detection engine.
//!
//! Hark treats the acoustic algorithm as a black box behind [`SpeechDetector`]: any
//! engine that can report speech spans over a window of canonical-rate samples is
//! substitutable (Silero, WebRTC VAD, an ONNX model, ...). The crate ships
//! [`EnergyDetector`], a frame-RMS gate that is dependency-free and good enough for
//! tests and low-noise captures.

use anyhow::Result;

use crate::audio::MS_SAMPLE_RATE;

/// Options passed to the detector for a single evaluation.
///
/// These mirror the session's turn-detection settings; the engine fills them in from
/// [`TurnDetection`](crate::config::TurnDetection) on every call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectorOpts {
    /// Sensitivity in `[0, 1]`.
    pub threshold: f32,

    /// Spans separated by less than this are considered one utterance.
    pub min_silence_duration_ms: u32,

    /// Padding applied to both ends of each detected span.
    pub speech_pad_ms: u32,
}

/// One detected speech span, in samples relative to the analyzed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeechSpan {
    pub start: usize,
    pub end: usize,
}

/// A frame-level speech/silence classifier.
///
/// Implementations must return spans ordered by start offset, non-overlapping, and
/// clamped to the window. `&mut self` accommodates engines with internal inference
/// state; the contract is still that each call is independent of the last.
pub trait SpeechDetector {
    fn speech_spans(&mut self, window: &[f32], opts: &DetectorOpts) -> Result<Vec<SpeechSpan>>;
}

/// Analysis frame length for [`EnergyDetector`].
const FRAME_MS: usize = 10;

/// A simple energy gate: a frame is speech when its RMS meets the threshold.
///
/// `opts.threshold` is interpreted directly as an RMS floor, so useful values sit well
/// below the `[0.5, 1.0]` range a probability-based engine would want. Spans are
/// merged across silences shorter than `min_silence_duration_ms` and padded by
/// `speech_pad_ms` on both sides.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnergyDetector;

impl SpeechDetector for EnergyDetector {
    fn speech_spans(&mut self, window: &[f32], opts: &DetectorOpts) -> Result<Vec<SpeechSpan>> {
        let frame_len = FRAME_MS * MS_SAMPLE_RATE;
        let merge_gap = opts.min_silence_duration_ms as usize * MS_SAMPLE_RATE;
        let pad = opts.speech_pad_ms as usize * MS_SAMPLE_RATE;

        let mut spans: Vec<SpeechSpan> = Vec::new();
        let mut current: Option<SpeechSpan> = None;

        let mut offset = 0;
        while offset < window.len() {
            let frame_end = (offset + frame_len).min(window.len());
            let voiced = rms(&window[offset..frame_end]) >= opts.threshold;

            match (&mut current, voiced) {
                (None, true) => current = Some(SpeechSpan { start: offset, end: frame_end }),
                (Some(span), true) => span.end = frame_end,
                (Some(span), false) => {
                    push_merged(&mut spans, *span, merge_gap, pad, window.len());
                    current = None;
                }
                (None, false) => {}
            }

            offset = frame_end;
        }

        if let Some(span) = current {
            push_merged(&mut spans, span, merge_gap, pad, window.len());
        }

        Ok(spans)
    }
}

/// Pad a raw span and append it, merging with the previous span when the remaining
/// gap is shorter than `merge_gap`. Keeps `spans` sorted and non-overlapping.
fn push_merged(spans: &mut Vec<SpeechSpan>, raw: SpeechSpan, merge_gap: usize, pad: usize, len: usize) {
    let padded = SpeechSpan {
        start: raw.start.saturating_sub(pad),
        end: (raw.end + pad).min(len),
    };

    if let Some(prev) = spans.last_mut() {
        let gap = padded.start.saturating_sub(prev.end);
        if padded.start <= prev.end || gap < merge_gap {
            prev.end = prev.end.max(padded.end);
            return;
        }
    }

    spans.push(padded);
}

fn rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = frame.iter().map(|s| s * s).sum();
    (sum_sq / frame.len() as f32).sqrt()
}
