use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Application message carried by one data-channel frame.
///
/// The `type` field selects the variant. Tags this client does not know
/// decode to `Unknown` and are ignored by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    /// Finalized transcript of the user's speech, recognized remotely
    Asr { text: String },

    /// Assistant response text (may arrive sentence by sentence)
    Llm { text: String },

    /// Speech output started
    TtsStart,

    /// Speech output ended
    TtsEnd,

    Error {
        #[serde(default)]
        message: String,
    },

    #[serde(other)]
    Unknown,
}

impl ChannelMessage {
    pub fn tag(&self) -> &'static str {
        match self {
            ChannelMessage::Asr { .. } => "asr",
            ChannelMessage::Llm { .. } => "llm",
            ChannelMessage::TtsStart => "tts_start",
            ChannelMessage::TtsEnd => "tts_end",
            ChannelMessage::Error { .. } => "error",
            ChannelMessage::Unknown => "unknown",
        }
    }

    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(frame)?)
    }

    /// Single-line JSON encoding
    pub fn encode(&self) -> Result<String, ProtocolError> {
        if *self == ChannelMessage::Unknown {
            return Err(ProtocolError::Encode(
                "cannot encode a message with an unknown tag".to_string(),
            ));
        }
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}
