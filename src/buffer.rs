//! Per-turn input audio buffers.
//!
//! A buffer represents one user turn: an append-only store of canonical-rate mono
//! samples plus the VAD markers the turn-detection engine sets as speech begins and
//! ends. Buffers never shrink; a session drops a buffer only on an explicit clear.

use crate::audio::MS_SAMPLE_RATE;
use crate::ids::generate_item_id;

/// Mutable VAD markers for a buffer.
///
/// Invariants (enforced by [`crate::turn::evaluate`], which is the only writer):
/// - `audio_start_ms` is set at most once and never unset.
/// - `audio_end_ms` is only ever set after `audio_start_ms`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VadState {
    /// Millisecond offset into the buffer where speech began.
    pub audio_start_ms: Option<u64>,

    /// Millisecond offset into the buffer where speech ended.
    pub audio_end_ms: Option<u64>,
}

/// An append-only store of one turn's audio at the canonical sample rate.
#[derive(Debug)]
pub struct InputAudioBuffer {
    id: String,
    data: Vec<f32>,
    pub vad_state: VadState,
}

impl InputAudioBuffer {
    /// Create a new, empty buffer with a fresh id.
    pub fn new() -> Self {
        Self {
            id: generate_item_id(),
            data: Vec::new(),
            vad_state: VadState::default(),
        }
    }

    /// This buffer's opaque identity. Stable for the buffer's lifetime; also used as
    /// the conversation item id once the buffer is committed.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Append canonical-rate mono samples to the end of the buffer.
    pub fn append(&mut self, samples: &[f32]) {
        self.data.extend_from_slice(samples);
    }

    /// All buffered samples, oldest first.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of buffered samples.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Buffered audio duration in whole milliseconds at the canonical rate.
    pub fn duration_ms(&self) -> u64 {
        (self.data.len() / MS_SAMPLE_RATE) as u64
    }
}

impl Default for InputAudioBuffer {
    fn default() -> Self {
        Self::new()
    }
}
