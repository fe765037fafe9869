//! `hark` — an incremental voice-activity turn-detection core for realtime speech sessions.
//!
//! This crate provides:
//! - Wire audio decoding and resampling to the canonical 16 kHz rate
//! - Per-turn input audio buffers with VAD state
//! - Trailing-window turn detection over a pluggable speech detector
//! - Session lifecycle management (append / commit / clear, buffer rotation)
//! - Serializable protocol events published over a fire-and-forget channel
//!
//! The acoustic algorithm itself is a black box behind [`detector::SpeechDetector`];
//! hark owns the deterministic state-transition and buffer-management contract around
//! whatever spans that detector reports.

// High-level API (most consumers should start here).
pub mod config;
pub mod session;

// Audio decoding and resampling.
pub mod audio;

// Per-turn buffers and the turn-detection engine.
pub mod buffer;
pub mod turn;

// The speech-detection capability and its built-in reference implementation.
pub mod detector;

// Outbound protocol events and id generation.
pub mod events;
pub mod ids;

// Crate-wide error type.
pub mod error;

// Logging configuration and control.
#[cfg(feature = "logging")]
pub mod logging;

pub use buffer::{InputAudioBuffer, VadState};
pub use config::{SessionConfig, TurnDetection};
pub use detector::{DetectorOpts, EnergyDetector, SpeechDetector, SpeechSpan};
pub use error::{Error, Result};
pub use events::{ConversationItem, ErrorDetail, ServerEvent};
pub use session::SessionContext;
pub use turn::VadTransition;
