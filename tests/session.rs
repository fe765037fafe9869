//! End-to-end session scenarios driven through the public API with the built-in
//! energy detector and synthetic client-rate audio.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use tokio::sync::mpsc::UnboundedReceiver;

use hark::{EnergyDetector, ServerEvent, SessionConfig, SessionContext, TurnDetection};

/// Encode f32 samples as the wire format: base64 PCM16 LE mono at 24 kHz.
fn encode_chunk(samples_24k: &[f32]) -> String {
    let mut bytes = Vec::with_capacity(samples_24k.len() * 2);
    for sample in samples_24k {
        let value = (sample.clamp(-1.0, 1.0) * 32_767.0) as i16;
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    BASE64.encode(&bytes)
}

fn silence_24k(ms: usize) -> Vec<f32> {
    vec![0.0; ms * 24]
}

/// A 100 Hz square-ish tone at the client rate; loud enough to clear the energy gate.
fn tone_24k(ms: usize) -> Vec<f32> {
    (0..ms * 24)
        .map(|i| if (i / 120) % 2 == 0 { 0.5 } else { -0.5 })
        .collect()
}

fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn vad_session() -> (SessionContext<EnergyDetector>, UnboundedReceiver<ServerEvent>) {
    let config = SessionConfig {
        turn_detection: Some(TurnDetection {
            threshold: 0.3,
            prefix_padding_ms: 0,
            silence_duration_ms: 550,
            create_response: false,
        }),
    };
    SessionContext::new(config, EnergyDetector)
}

#[test]
fn detects_a_full_turn_and_rotates() -> anyhow::Result<()> {
    let (mut session, mut rx) = vad_session();

    // ~2s of leading silence, chunked the way a microphone stream would arrive.
    for _ in 0..3 {
        session.append(&encode_chunk(&silence_24k(667)))?;
    }
    assert!(drain(&mut rx).is_empty(), "silence must not produce events");

    // Half a second of speech.
    let first_id = session.active_buffer_id().to_string();
    session.append(&encode_chunk(&tone_24k(500)))?;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::SpeechStarted {
            item_id,
            audio_start_ms,
            ..
        } => {
            assert_eq!(item_id, &first_id);
            // Speech began 2001ms in; detection is frame-aligned.
            assert!(
                (1_990..=2_010).contains(audio_start_ms),
                "audio_start_ms = {audio_start_ms}"
            );
        }
        other => panic!("expected speech_started, got {other:?}"),
    }

    // Enough trailing silence to push the span out of the window's recent zone.
    session.append(&encode_chunk(&silence_24k(600)))?;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3, "got {events:?}");
    match &events[0] {
        ServerEvent::SpeechStopped {
            item_id,
            audio_end_ms,
            ..
        } => {
            assert_eq!(item_id, &first_id);
            // duration_ms - prefix_padding_ms with zero padding.
            assert_eq!(*audio_end_ms, 3_101);
        }
        other => panic!("expected speech_stopped, got {other:?}"),
    }
    assert!(
        matches!(&events[1], ServerEvent::Committed { item_id, .. } if item_id == &first_id)
    );
    assert!(
        matches!(&events[2], ServerEvent::ConversationItemCreated { item, .. } if item.id == first_id)
    );

    // The turn rotated: fresh active buffer, stopped buffer kept as history.
    assert_ne!(session.active_buffer_id(), first_id);
    assert!(session.buffer(&first_id).is_some());
    assert_eq!(session.conversation_items().len(), 1);
    Ok(())
}

#[test]
fn ongoing_speech_starts_exactly_once() -> anyhow::Result<()> {
    let (mut session, mut rx) = vad_session();

    for _ in 0..4 {
        session.append(&encode_chunk(&tone_24k(500)))?;
    }

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1, "got {events:?}");
    assert!(matches!(
        &events[0],
        ServerEvent::SpeechStarted {
            audio_start_ms: 0,
            ..
        }
    ));
    Ok(())
}

#[test]
fn next_turn_links_back_to_the_first_item() -> anyhow::Result<()> {
    let (mut session, mut rx) = vad_session();

    // Turn one: speech then enough silence to close it.
    session.append(&encode_chunk(&tone_24k(2_600)))?;
    session.append(&encode_chunk(&silence_24k(700)))?;
    let first_item_id = {
        let events = drain(&mut rx);
        match events.last() {
            Some(ServerEvent::ConversationItemCreated { item, .. }) => item.id.clone(),
            other => panic!("expected conversation.item.created last, got {other:?}"),
        }
    };

    // Turn two: fresh buffer picks up new speech, then an explicit commit.
    let second_id = session.active_buffer_id().to_string();
    session.append(&encode_chunk(&tone_24k(400)))?;
    session.commit()?;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 3, "got {events:?}");
    assert!(
        matches!(&events[0], ServerEvent::SpeechStarted { item_id, .. } if item_id == &second_id)
    );
    match &events[1] {
        ServerEvent::Committed {
            item_id,
            previous_item_id,
            ..
        } => {
            assert_eq!(item_id, &second_id);
            assert_eq!(previous_item_id.as_deref(), Some(first_item_id.as_str()));
        }
        other => panic!("expected committed, got {other:?}"),
    }
    assert!(
        matches!(&events[2], ServerEvent::ConversationItemCreated { item, .. } if item.id == second_id)
    );
    Ok(())
}

#[test]
fn commit_on_a_fresh_session_only_reports_the_error() -> anyhow::Result<()> {
    let (mut session, mut rx) = vad_session();
    let active_before = session.active_buffer_id().to_string();

    session.commit()?;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        ServerEvent::Error { error, .. } => {
            assert_eq!(error.error_type, "invalid_request_error");
        }
        other => panic!("expected error event, got {other:?}"),
    }
    assert_eq!(session.active_buffer_id(), active_before);
    Ok(())
}

#[test]
fn duration_accounting_is_chunking_independent() -> anyhow::Result<()> {
    let (mut one_shot, _rx_a) = vad_session();
    one_shot.append(&encode_chunk(&silence_24k(1_200)))?;

    let (mut chunked, _rx_b) = vad_session();
    for _ in 0..8 {
        chunked.append(&encode_chunk(&silence_24k(150)))?;
    }

    let a = one_shot
        .buffer(&one_shot.active_buffer_id().to_string())
        .unwrap()
        .duration_ms();
    let b = chunked
        .buffer(&chunked.active_buffer_id().to_string())
        .unwrap()
        .duration_ms();
    assert_eq!(a, 1_200);
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn events_serialize_to_protocol_json() -> anyhow::Result<()> {
    let (mut session, mut rx) = vad_session();
    session.append(&encode_chunk(&tone_24k(300)))?;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    let json = serde_json::to_string(&events[0])?;
    assert!(json.contains("\"type\":\"input_audio_buffer.speech_started\""));
    assert!(json.contains("\"event_id\":\"event_"));
    Ok(())
}
