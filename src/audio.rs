//! Audio normalization for Hark.
//!
//! Responsibilities:
//! - Decode the wire audio payload (base64-encoded PCM16 LE mono) into `f32` samples
//! - Resample arbitrary-rate mono audio to Hark's canonical sample rate
//!
//! Downstream VAD is tuned for one specific sample rate, so everything that enters a
//! buffer goes through this module first.

use anyhow::{Context, Result, ensure};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Hark's canonical mono sample rate (Hz). All buffered audio is at this rate.
pub const SAMPLE_RATE: u32 = 16_000;

/// Samples per millisecond at the canonical rate.
pub const MS_SAMPLE_RATE: usize = (SAMPLE_RATE / 1_000) as usize;

/// Sample rate of client-supplied audio (Hz), fixed by the protocol contract.
pub const CLIENT_SAMPLE_RATE: u32 = 24_000;

/// Resample a mono `f32` sequence from `from_rate` to `to_rate` by linear interpolation.
///
/// Output length is `round(len * to_rate / from_rate)`; output sample `i` is the input
/// evaluated at position `i * from_rate / to_rate`. Equal rates are an identity pass
/// (up to rounding). This is a pure function.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if samples.is_empty() || from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let target_len = (samples.len() as f64 * ratio).round() as usize;
    let mut out = Vec::with_capacity(target_len);

    for i in 0..target_len {
        let pos = i as f64 / ratio;
        let idx = pos.floor() as usize;

        if idx + 1 >= samples.len() {
            out.push(samples[samples.len() - 1]);
            continue;
        }

        let frac = (pos - idx as f64) as f32;
        out.push(samples[idx] + (samples[idx + 1] - samples[idx]) * frac);
    }

    out
}

/// Decode PCM16 little-endian mono bytes into `f32` samples in `[-1, 1]`.
///
/// An odd byte count means a truncated or corrupt payload; callers decide whether to
/// drop the chunk or terminate the session.
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>> {
    ensure!(
        bytes.len() % 2 == 0,
        "PCM16 payload has odd length ({} bytes)",
        bytes.len()
    );

    let samples = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32_768.0)
        .collect();

    Ok(samples)
}

/// Decode a base64-encoded PCM16 LE mono payload into `f32` samples.
pub fn decode_base64_pcm16(audio: &str) -> Result<Vec<f32>> {
    let bytes = BASE64
        .decode(audio)
        .context("failed to base64-decode audio payload")?;
    decode_pcm16(&bytes)
}
