//! Session-level configuration.
//!
//! This struct represents *library-level configuration*, not wire messages directly.
//! The hosting transport is responsible for mapping a client's session.update payload
//! into these types so that:
//! - the library remains reusable outside of any one wire protocol
//! - other frontends (tests, batch replay tools) can construct configs programmatically

use serde::{Deserialize, Serialize};

/// Server-side turn-detection settings, immutable for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnDetection {
    /// VAD sensitivity in `[0, 1]` (higher = more conservative).
    pub threshold: f32,

    /// Audio assumed to precede a detected speech start, and subtracted from the
    /// buffer duration when a stop boundary is computed.
    pub prefix_padding_ms: u32,

    /// Minimum trailing silence required to confirm a speech stop.
    pub silence_duration_ms: u32,

    /// Downstream hint: whether a response should be generated once a turn ends.
    /// Not consulted by the turn-detection core itself.
    pub create_response: bool,
}

impl Default for TurnDetection {
    fn default() -> Self {
        Self {
            threshold: 0.9,
            prefix_padding_ms: 0,
            silence_duration_ms: 550,
            create_response: false,
        }
    }
}

/// Per-session configuration consumed by [`SessionContext`](crate::session::SessionContext).
///
/// When `turn_detection` is `None`, appended audio is accumulated but never analyzed;
/// turns end only via explicit commits.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    pub turn_detection: Option<TurnDetection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_detection_defaults_match_protocol() {
        let td = TurnDetection::default();
        assert_eq!(td.threshold, 0.9);
        assert_eq!(td.prefix_padding_ms, 0);
        assert_eq!(td.silence_duration_ms, 550);
        assert!(!td.create_response);
    }

    #[test]
    fn session_config_round_trips_through_json() -> anyhow::Result<()> {
        let config = SessionConfig {
            turn_detection: Some(TurnDetection::default()),
        };
        let json = serde_json::to_string(&config)?;
        let back: SessionConfig = serde_json::from_str(&json)?;
        assert_eq!(back.turn_detection, config.turn_detection);
        Ok(())
    }
}
