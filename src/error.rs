use thiserror::Error;

use crate::session::SessionStatus;

/// Failures of the single offer/answer exchange with the remote service
#[derive(Debug, Error)]
pub enum SignalingError {
    #[error("signaling request failed: {0}")]
    Network(String),

    #[error("signaling request timed out")]
    Timeout,

    #[error("malformed signaling response: {0}")]
    MalformedResponse(String),

    #[error("signaling endpoint rejected the request with status {status}")]
    Rejected { status: u16 },
}

impl From<reqwest::Error> for SignalingError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SignalingError::Timeout
        } else if e.is_decode() {
            SignalingError::MalformedResponse(e.to_string())
        } else if let Some(status) = e.status() {
            SignalingError::Rejected {
                status: status.as_u16(),
            }
        } else {
            SignalingError::Network(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("failed to construct peer connection: {0}")]
    Construction(String),

    #[error("incompatible session description: {0}")]
    IncompatibleDescription(String),

    #[error("no local description available after offer")]
    MissingLocalDescription,

    #[error("ICE gathering did not complete within {0:?}")]
    GatheringTimedOut(std::time::Duration),

    #[error("peer connection closed during negotiation")]
    ConnectionClosed,
}

/// Data-channel protocol failures. None of these close the channel.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("failed to parse channel frame: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to encode channel message: {0}")]
    Encode(String),

    #[error("failed to send on data channel: {0}")]
    Send(String),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone permission denied")]
    PermissionDenied,

    #[error("capture device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("speech recognizer failed: {0}")]
    Recognizer(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Signaling(#[from] SignalingError),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("peer connection failed")]
    ConnectionFailure,

    #[error("invalid session transition {from:?} -> {to:?}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

impl SessionError {
    /// Message shown to the user in the blocking error notification
    pub fn user_message(&self) -> String {
        match self {
            SessionError::ConnectionFailure => {
                "Connection failed, please refresh the page".to_string()
            }
            SessionError::Capture(_) => {
                "Cannot access microphone, please check permissions".to_string()
            }
            other => format!("Connection failed: {}", other),
        }
    }
}
