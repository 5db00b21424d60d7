use serde::{Deserialize, Serialize};

use crate::error::SignalingError;
use crate::peer::{SdpType, SessionDescription};
use crate::session::SessionId;

/// Offer sent to the session-negotiation endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct OfferRequest {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub avatar_id: String,
}

impl OfferRequest {
    pub fn new(local: &SessionDescription, avatar_id: &str) -> Self {
        Self {
            sdp: local.sdp.clone(),
            sdp_type: local.sdp_type,
            avatar_id: avatar_id.to_string(),
        }
    }
}

/// Answer received from the session-negotiation endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub sdp: String,
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sessionid: u64,
}

/// Remote description paired with the session identifier it was issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedAnswer {
    pub description: SessionDescription,
    pub session_id: SessionId,
}

impl TryFrom<AnswerResponse> for NegotiatedAnswer {
    type Error = SignalingError;

    fn try_from(answer: AnswerResponse) -> Result<Self, Self::Error> {
        if answer.sdp_type != SdpType::Answer {
            return Err(SignalingError::MalformedResponse(format!(
                "expected an answer, got {:?}",
                answer.sdp_type
            )));
        }

        Ok(Self {
            description: SessionDescription::answer(answer.sdp),
            session_id: SessionId(answer.sessionid),
        })
    }
}

/// User message posted to the outbound endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub interrupt: bool,
    pub sessionid: u64,
}

impl ChatRequest {
    pub fn chat(session_id: SessionId, text: &str) -> Self {
        Self {
            text: text.to_string(),
            kind: "chat".to_string(),
            interrupt: true,
            sessionid: session_id.0,
        }
    }
}

/// One entry of the avatar-metadata list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: String,
}

/// Envelope of the avatar-metadata endpoint (`code == 0` means success)
#[derive(Debug, Serialize, Deserialize)]
pub struct AvatarListResponse {
    pub code: i64,
    #[serde(default)]
    pub data: Option<Vec<AvatarRecord>>,
}
