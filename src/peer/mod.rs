//! Peer connection negotiation
//!
//! `PeerSession` drives one offer/answer negotiation over a `PeerConnection`
//! and exposes connection-state and remote-track notifications.

pub mod connection;
pub mod rtc;
pub mod session;

pub use connection::{
    ChannelEvent, ChannelState, ConnectionState, DataChannel, DataChannelHandle,
    IceGatheringState, MediaKind, PeerConnection, PeerEvent, SdpType, SessionDescription,
};
pub use rtc::WebRtcPeerConnection;
pub use session::PeerSession;
