//! Per-session state and the input-audio-buffer lifecycle.
//!
//! A [`SessionContext`] is the single logical owner of one realtime session: the
//! ordered sequence of turn buffers, the conversation items created from committed
//! turns, and the outbound event channel. All mutation goes through `append`,
//! `commit`, and `clear`; callers must serialize those per session (there is no
//! internal locking). Distinct sessions are fully independent.

use anyhow::anyhow;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::audio::{CLIENT_SAMPLE_RATE, SAMPLE_RATE, decode_base64_pcm16, resample};
use crate::buffer::InputAudioBuffer;
use crate::config::SessionConfig;
use crate::detector::SpeechDetector;
use crate::error::Result;
use crate::events::{ConversationItem, ErrorDetail, ServerEvent};
use crate::turn::{self, VadTransition};

/// `previous_item_id` used on the auto-commit of the very first turn, when no
/// conversation item exists yet. The protocol requires the field to be present on
/// that path, so an explicit placeholder marks "start of conversation".
pub const FIRST_PREVIOUS_ITEM_ID: &str = "root";

const EMPTY_COMMIT_MESSAGE: &str = "Error committing input audio buffer: the buffer is empty.";

/// One realtime session: config, detector, turn buffers, conversation, and the
/// outbound event channel.
///
/// The most recently installed buffer is the *active* one; it receives all appended
/// audio and all VAD re-evaluation. Earlier buffers are immutable history, kept
/// addressable because conversation items reference them by id.
pub struct SessionContext<D: SpeechDetector> {
    config: SessionConfig,
    detector: D,
    buffers: Vec<InputAudioBuffer>,
    conversation: Vec<ConversationItem>,
    events_tx: mpsc::UnboundedSender<ServerEvent>,
}

impl<D: SpeechDetector> SessionContext<D> {
    /// Create a session with an empty active buffer, returning the receiving end of
    /// its outbound event stream.
    ///
    /// Publication is fire-and-forget FIFO: operations never block on (or fail
    /// because of) the subscriber.
    pub fn new(config: SessionConfig, detector: D) -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let ctx = Self {
            config,
            detector,
            buffers: vec![InputAudioBuffer::new()],
            conversation: Vec::new(),
            events_tx,
        };
        (ctx, events_rx)
    }

    /// Append a base64-encoded PCM16 LE mono chunk (at the client rate) to the
    /// active buffer, then re-evaluate turn detection if the session has it
    /// configured.
    ///
    /// Undecodable audio is an error for the caller to handle (drop the chunk or end
    /// the session); session state is untouched in that case. Retrying the same
    /// bytes fails identically.
    pub fn append(&mut self, audio_base64: &str) -> Result<()> {
        let chunk = decode_base64_pcm16(audio_base64)?;
        let chunk = resample(&chunk, CLIENT_SAMPLE_RATE, SAMPLE_RATE);

        let buffer = self
            .buffers
            .last_mut()
            .ok_or_else(|| anyhow!("session has no active buffer"))?;
        buffer.append(&chunk);
        debug!(
            buffer_id = buffer.id(),
            samples = chunk.len(),
            duration_ms = buffer.duration_ms(),
            "appended audio chunk"
        );

        let Some(turn_detection) = self.config.turn_detection.clone() else {
            return Ok(());
        };
        if buffer.size() == 0 {
            // Nothing to analyze; an empty buffer never reaches the detector.
            return Ok(());
        }

        let transition = turn::evaluate(buffer, &turn_detection, &mut self.detector)?;
        match transition {
            None => {}
            Some(VadTransition::SpeechStarted { audio_start_ms }) => {
                let item_id = buffer.id().to_string();
                self.publish(ServerEvent::speech_started(item_id, audio_start_ms));
            }
            Some(VadTransition::SpeechStopped { audio_end_ms }) => {
                let stopped_id = buffer.id().to_string();
                self.publish(ServerEvent::speech_stopped(stopped_id.clone(), audio_end_ms));

                // Server-driven rotation: the stopped turn is committed and any
                // further audio starts a fresh buffer.
                self.buffers.push(InputAudioBuffer::new());
                let previous_item_id = self
                    .last_conversation_item_id()
                    .unwrap_or_else(|| FIRST_PREVIOUS_ITEM_ID.to_string());
                self.publish(ServerEvent::committed(
                    stopped_id.clone(),
                    Some(previous_item_id),
                ));
                self.create_conversation_item(stopped_id);
            }
        }

        Ok(())
    }

    /// Commit the active buffer, closing the turn explicitly.
    ///
    /// Committing an empty buffer publishes the `invalid_request_error` event and
    /// changes nothing else. Otherwise the buffer is committed, kept as history, and
    /// replaced by a fresh active buffer.
    pub fn commit(&mut self) -> Result<()> {
        let buffer = self
            .buffers
            .last()
            .ok_or_else(|| anyhow!("session has no active buffer"))?;

        if buffer.size() == 0 {
            self.publish(ServerEvent::error(ErrorDetail::invalid_request(
                EMPTY_COMMIT_MESSAGE,
            )));
            return Ok(());
        }

        let committed_id = buffer.id().to_string();
        let previous_item_id = self.last_conversation_item_id();
        self.publish(ServerEvent::committed(committed_id.clone(), previous_item_id));

        self.buffers.push(InputAudioBuffer::new());
        self.create_conversation_item(committed_id);
        Ok(())
    }

    /// Discard the active buffer outright and install a fresh one.
    ///
    /// Clearing an already-empty buffer is not an error; the operation is idempotent
    /// from the client's point of view. The discarded buffer is *not* retained as
    /// history.
    pub fn clear(&mut self) -> Result<()> {
        let dropped = self
            .buffers
            .pop()
            .ok_or_else(|| anyhow!("session has no active buffer"))?;
        debug!(
            buffer_id = dropped.id(),
            duration_ms = dropped.duration_ms(),
            "cleared input audio buffer"
        );

        self.publish(ServerEvent::cleared());
        self.buffers.push(InputAudioBuffer::new());
        Ok(())
    }

    /// Id of the buffer currently receiving audio.
    pub fn active_buffer_id(&self) -> &str {
        // A session always holds at least one buffer; every path that removes one
        // installs a replacement.
        self.buffers
            .last()
            .map(|buffer| buffer.id())
            .unwrap_or_default()
    }

    /// Look up any buffer (active or history) by id.
    pub fn buffer(&self, id: &str) -> Option<&InputAudioBuffer> {
        self.buffers.iter().find(|buffer| buffer.id() == id)
    }

    /// All buffer ids, oldest first. The last id is the active buffer.
    pub fn buffer_ids(&self) -> Vec<&str> {
        self.buffers.iter().map(|buffer| buffer.id()).collect()
    }

    /// Conversation items created so far, in creation order.
    pub fn conversation_items(&self) -> &[ConversationItem] {
        &self.conversation
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn last_conversation_item_id(&self) -> Option<String> {
        self.conversation.last().map(|item| item.id.clone())
    }

    /// Synthesize the user audio item for a committed buffer and announce it.
    fn create_conversation_item(&mut self, item_id: String) {
        let item = ConversationItem::user_audio(item_id);
        self.conversation.push(item.clone());
        self.publish(ServerEvent::conversation_item_created(item));
        info!("created user audio conversation item");
    }

    fn publish(&self, event: ServerEvent) {
        // Fire-and-forget: a dropped subscriber must never stall the session.
        if self.events_tx.send(event).is_err() {
            debug!("event subscriber is gone; discarding event");
        }
    }
}
