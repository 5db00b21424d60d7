use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::error::NegotiationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Protocol-level session description (offer or answer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IceGatheringState {
    New,
    Gathering,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Notifications raised by a peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    IceGatheringStateChanged(IceGatheringState),
    ConnectionStateChanged(ConnectionState),
    /// Inbound media track from the remote side
    Track { kind: MediaKind, stream_id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Raw events of the auxiliary data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Open,
    Message(String),
    Close,
}

/// Reliable, ordered channel carried alongside the media connection
#[async_trait::async_trait]
pub trait DataChannel: Send + Sync {
    fn label(&self) -> &str;

    fn state(&self) -> ChannelState;

    async fn send_text(&self, text: String) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

/// A data channel together with its inbound event stream
pub struct DataChannelHandle {
    pub channel: Arc<dyn DataChannel>,
    pub events: mpsc::UnboundedReceiver<ChannelEvent>,
}

/// Peer connection trait
///
/// Implementations:
/// - `WebRtcPeerConnection`: webrtc-rs
/// - Scripted connections for tests
#[async_trait::async_trait]
pub trait PeerConnection: Send + Sync {
    /// Add a receive-only transceiver for `kind`
    async fn add_recv_only_transceiver(&self, kind: MediaKind) -> Result<(), NegotiationError>;

    /// Open the local side of a data channel
    async fn create_data_channel(&self, label: &str)
        -> Result<DataChannelHandle, NegotiationError>;

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError>;

    async fn set_local_description(&self, desc: SessionDescription)
        -> Result<(), NegotiationError>;

    /// Current local description, including gathered candidates
    async fn local_description(&self) -> Option<SessionDescription>;

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError>;

    fn ice_gathering_state(&self) -> IceGatheringState;

    /// Subscribe to connection notifications. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> broadcast::Receiver<PeerEvent>;

    async fn close(&self) -> Result<()>;

    /// Implementation name for logging
    fn name(&self) -> &str;
}
