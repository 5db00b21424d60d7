// Tests for the data-channel message protocol
//
// Wire format of each tag, dispatch of inbound frames (malformed frames are
// dropped without stopping the loop), and silent drop of outbound messages
// while the channel is not open.

mod common;

use avatar_talk::error::ProtocolError;
use avatar_talk::peer::{ChannelEvent, ChannelState};
use avatar_talk::protocol::{ChannelMessage, DataChannelProtocol};
use common::MockDataChannel;
use std::sync::Arc;
use tokio::sync::mpsc;

#[test]
fn test_decode_each_tag() {
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"asr","text":"hello"}"#).unwrap(),
        ChannelMessage::Asr {
            text: "hello".to_string()
        }
    );
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"llm","text":"Hi there"}"#).unwrap(),
        ChannelMessage::Llm {
            text: "Hi there".to_string()
        }
    );
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"tts_start"}"#).unwrap(),
        ChannelMessage::TtsStart
    );
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"tts_end"}"#).unwrap(),
        ChannelMessage::TtsEnd
    );
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"error","message":"boom"}"#).unwrap(),
        ChannelMessage::Error {
            message: "boom".to_string()
        }
    );
}

#[test]
fn test_unknown_tag_decodes_to_unknown() {
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"viseme","frame":12}"#).unwrap(),
        ChannelMessage::Unknown
    );
}

#[test]
fn test_error_message_is_optional() {
    assert_eq!(
        ChannelMessage::decode(r#"{"type":"error"}"#).unwrap(),
        ChannelMessage::Error {
            message: String::new()
        }
    );
}

#[test]
fn test_malformed_frames() {
    for frame in [
        "not json",
        r#"{"text":"no tag"}"#,
        r#"{"type":"asr"}"#,
        r#"{"type":"llm","text":5}"#,
    ] {
        assert!(
            matches!(ChannelMessage::decode(frame), Err(ProtocolError::Parse(_))),
            "{} should fail to parse",
            frame
        );
    }
}

#[test]
fn test_encode_is_single_line_tagged_json() {
    let frame = ChannelMessage::Llm {
        text: "line one\nline two".to_string(),
    }
    .encode()
    .unwrap();

    assert!(!frame.contains('\n'));
    let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(value["type"], "llm");
    assert_eq!(value["text"], "line one\nline two");

    assert_eq!(ChannelMessage::TtsEnd.encode().unwrap(), r#"{"type":"tts_end"}"#);
    assert!(ChannelMessage::Unknown.encode().is_err());
}

#[tokio::test]
async fn test_send_drops_while_not_open() {
    let channel = Arc::new(MockDataChannel::new("chat"));
    let protocol = DataChannelProtocol::new(channel.clone());

    assert_eq!(protocol.state(), ChannelState::Connecting);
    assert!(!protocol.send(&ChannelMessage::TtsStart).await.unwrap());
    assert!(channel.sent().is_empty(), "Nothing is queued");

    channel.set_state(ChannelState::Open);
    assert!(protocol.send(&ChannelMessage::TtsStart).await.unwrap());
    assert_eq!(channel.sent(), vec![r#"{"type":"tts_start"}"#.to_string()]);
}

#[tokio::test]
async fn test_close_is_idempotent_and_stops_sends() {
    let channel = Arc::new(MockDataChannel::new("chat"));
    channel.set_state(ChannelState::Open);
    let protocol = DataChannelProtocol::new(channel.clone());

    protocol.close().await.unwrap();
    protocol.close().await.unwrap();

    assert_eq!(protocol.state(), ChannelState::Closed);
    assert!(!protocol.send(&ChannelMessage::TtsEnd).await.unwrap());
    assert!(channel.sent().is_empty());
}

#[tokio::test]
async fn test_dispatch_skips_malformed_frames_in_order() {
    let channel = Arc::new(MockDataChannel::new("chat"));
    let protocol = DataChannelProtocol::new(channel);
    let (tx, rx) = mpsc::unbounded_channel();

    for event in [
        ChannelEvent::Open,
        ChannelEvent::Message(r#"{"type":"asr","text":"one"}"#.to_string()),
        ChannelEvent::Message("{broken".to_string()),
        ChannelEvent::Message(r#"{"type":"llm","text":"two"}"#.to_string()),
        ChannelEvent::Message(r#"{"type":"surprise"}"#.to_string()),
        ChannelEvent::Message(r#"{"type":"tts_end"}"#.to_string()),
    ] {
        tx.send(event).unwrap();
    }
    drop(tx);

    let mut received = Vec::new();
    let stats = protocol.dispatch(rx, |m| received.push(m)).await;

    assert_eq!(stats.malformed, 1);
    assert_eq!(stats.delivered, 4);
    assert_eq!(
        received,
        vec![
            ChannelMessage::Asr {
                text: "one".to_string()
            },
            ChannelMessage::Llm {
                text: "two".to_string()
            },
            ChannelMessage::Unknown,
            ChannelMessage::TtsEnd,
        ]
    );
}

#[tokio::test]
async fn test_dispatch_stops_on_close() {
    let channel = Arc::new(MockDataChannel::new("chat"));
    channel.set_state(ChannelState::Open);
    let protocol = DataChannelProtocol::new(channel);
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(ChannelEvent::Message(r#"{"type":"tts_start"}"#.to_string()))
        .unwrap();
    tx.send(ChannelEvent::Close).unwrap();
    tx.send(ChannelEvent::Message(r#"{"type":"tts_end"}"#.to_string()))
        .unwrap();

    let mut received = Vec::new();
    let stats = protocol.dispatch(rx, |m| received.push(m)).await;

    assert_eq!(stats.delivered, 1);
    assert_eq!(received, vec![ChannelMessage::TtsStart]);
    assert_eq!(protocol.state(), ChannelState::Closed);
}
