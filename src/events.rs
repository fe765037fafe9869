//! Outbound protocol events.
//!
//! Every transition the session makes is surfaced as exactly one serializable event
//! carrying a fresh `event_id`. The wire shape follows the realtime protocol's
//! `type`-tagged JSON objects, so a hosting transport can serialize these with
//! `serde_json` and ship them as-is.

use serde::{Deserialize, Serialize};

use crate::ids::generate_event_id;

/// A conversation item synthesized when an input audio buffer is committed.
///
/// The item id equals the committed buffer's id; the content is an audio placeholder
/// whose transcript arrives later from a transcription collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub id: String,
    pub object: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub status: String,
    pub role: String,
    pub content: Vec<ConversationItemContent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItemContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub transcript: Option<String>,
}

impl ConversationItem {
    /// Build the completed user-audio item for a committed buffer.
    pub fn user_audio(item_id: impl Into<String>) -> Self {
        Self {
            id: item_id.into(),
            object: "realtime.item".to_string(),
            item_type: "message".to_string(),
            status: "completed".to_string(),
            role: "user".to_string(),
            content: vec![ConversationItemContent {
                content_type: "input_audio".to_string(),
                transcript: None,
            }],
        }
    }
}

/// Structured error payload for the `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl ErrorDetail {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            error_type: "invalid_request_error".to_string(),
            message: message.into(),
        }
    }
}

/// Events published by a session, in the order they occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted {
        event_id: String,
        item_id: String,
        audio_start_ms: u64,
    },

    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped {
        event_id: String,
        item_id: String,
        audio_end_ms: u64,
    },

    #[serde(rename = "input_audio_buffer.committed")]
    Committed {
        event_id: String,
        item_id: String,
        previous_item_id: Option<String>,
    },

    #[serde(rename = "input_audio_buffer.cleared")]
    Cleared { event_id: String },

    #[serde(rename = "conversation.item.created")]
    ConversationItemCreated {
        event_id: String,
        previous_item_id: Option<String>,
        item: ConversationItem,
    },

    #[serde(rename = "error")]
    Error {
        event_id: String,
        error: ErrorDetail,
    },
}

impl ServerEvent {
    pub fn speech_started(item_id: impl Into<String>, audio_start_ms: u64) -> Self {
        Self::SpeechStarted {
            event_id: generate_event_id(),
            item_id: item_id.into(),
            audio_start_ms,
        }
    }

    pub fn speech_stopped(item_id: impl Into<String>, audio_end_ms: u64) -> Self {
        Self::SpeechStopped {
            event_id: generate_event_id(),
            item_id: item_id.into(),
            audio_end_ms,
        }
    }

    pub fn committed(item_id: impl Into<String>, previous_item_id: Option<String>) -> Self {
        Self::Committed {
            event_id: generate_event_id(),
            item_id: item_id.into(),
            previous_item_id,
        }
    }

    pub fn cleared() -> Self {
        Self::Cleared {
            event_id: generate_event_id(),
        }
    }

    pub fn conversation_item_created(item: ConversationItem) -> Self {
        // previous_item_id is always null here: true second-to-last ordering is not
        // tracked yet, and a wrong-but-plausible value would be worse than null.
        Self::ConversationItemCreated {
            event_id: generate_event_id(),
            previous_item_id: None,
            item,
        }
    }

    pub fn error(error: ErrorDetail) -> Self {
        Self::Error {
            event_id: generate_event_id(),
            error,
        }
    }

    /// The unique id assigned to this event at construction.
    pub fn event_id(&self) -> &str {
        match self {
            Self::SpeechStarted { event_id, .. }
            | Self::SpeechStopped { event_id, .. }
            | Self::Committed { event_id, .. }
            | Self::Cleared { event_id }
            | Self::ConversationItemCreated { event_id, .. }
            | Self::Error { event_id, .. } => event_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speech_started_serializes_with_protocol_tag() -> anyhow::Result<()> {
        let event = ServerEvent::speech_started("item_abc", 2_001);
        let json: serde_json::Value = serde_json::to_value(&event)?;

        assert_eq!(json["type"], "input_audio_buffer.speech_started");
        assert_eq!(json["item_id"], "item_abc");
        assert_eq!(json["audio_start_ms"], 2_001);
        assert!(json["event_id"].as_str().unwrap().starts_with("event_"));
        Ok(())
    }

    #[test]
    fn committed_serializes_null_previous_item() -> anyhow::Result<()> {
        let event = ServerEvent::committed("item_abc", None);
        let json: serde_json::Value = serde_json::to_value(&event)?;

        assert_eq!(json["type"], "input_audio_buffer.committed");
        assert!(json["previous_item_id"].is_null());
        Ok(())
    }

    #[test]
    fn conversation_item_created_always_reports_null_previous() -> anyhow::Result<()> {
        let event = ServerEvent::conversation_item_created(ConversationItem::user_audio("item_1"));
        let json: serde_json::Value = serde_json::to_value(&event)?;

        assert_eq!(json["type"], "conversation.item.created");
        assert!(json["previous_item_id"].is_null());
        assert_eq!(json["item"]["id"], "item_1");
        assert_eq!(json["item"]["role"], "user");
        assert_eq!(json["item"]["status"], "completed");
        assert_eq!(json["item"]["content"][0]["type"], "input_audio");
        assert!(json["item"]["content"][0]["transcript"].is_null());
        Ok(())
    }

    #[test]
    fn error_event_carries_invalid_request_shape() -> anyhow::Result<()> {
        let event = ServerEvent::error(ErrorDetail::invalid_request("the buffer is empty"));
        let json: serde_json::Value = serde_json::to_value(&event)?;

        assert_eq!(json["type"], "error");
        assert_eq!(json["error"]["type"], "invalid_request_error");
        assert_eq!(json["error"]["message"], "the buffer is empty");
        Ok(())
    }

    #[test]
    fn events_deserialize_back_from_the_wire() -> anyhow::Result<()> {
        let event = ServerEvent::speech_stopped("item_xyz", 3_101);
        let json = serde_json::to_string(&event)?;
        let back: ServerEvent = serde_json::from_str(&json)?;
        assert_eq!(back, event);
        Ok(())
    }
}
