use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::api::APIBuilder;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::data_channel::data_channel_state::RTCDataChannelState;
use webrtc::data_channel::RTCDataChannel;
use webrtc::ice_transport::ice_gatherer_state::RTCIceGathererState;
use webrtc::ice_transport::ice_gathering_state::RTCIceGatheringState;
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::RTCRtpTransceiverInit;

use super::connection::{
    ChannelEvent, ChannelState, ConnectionState, DataChannel, DataChannelHandle,
    IceGatheringState, MediaKind, PeerConnection, PeerEvent, SdpType, SessionDescription,
};
use crate::error::NegotiationError;

const EVENT_CAPACITY: usize = 64;

/// Peer connection backed by webrtc-rs
pub struct WebRtcPeerConnection {
    pc: Arc<RTCPeerConnection>,
    events: broadcast::Sender<PeerEvent>,
}

impl WebRtcPeerConnection {
    /// Build a connection with the default codecs and interceptors
    pub async fn new(ice_servers: &[String]) -> Result<Self, NegotiationError> {
        let mut media_engine = MediaEngine::default();
        media_engine
            .register_default_codecs()
            .map_err(construction)?;

        let registry = register_default_interceptors(Registry::new(), &mut media_engine)
            .map_err(construction)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let config = RTCConfiguration {
            ice_servers: if ice_servers.is_empty() {
                Vec::new()
            } else {
                vec![RTCIceServer {
                    urls: ice_servers.to_vec(),
                    ..Default::default()
                }]
            },
            ..Default::default()
        };

        let pc = Arc::new(api.new_peer_connection(config).await.map_err(construction)?);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self::register_handlers(&pc, &events);

        info!(
            "WebRTC peer connection created ({} ICE servers)",
            ice_servers.len()
        );

        Ok(Self { pc, events })
    }

    fn register_handlers(pc: &Arc<RTCPeerConnection>, events: &broadcast::Sender<PeerEvent>) {
        let tx = events.clone();
        pc.on_ice_gathering_state_change(Box::new(move |state: RTCIceGathererState| {
            let mapped = match state {
                RTCIceGathererState::Complete => IceGatheringState::Complete,
                RTCIceGathererState::Gathering => IceGatheringState::Gathering,
                _ => IceGatheringState::New,
            };
            // No subscribers is fine: nobody is waiting on gathering
            let _ = tx.send(PeerEvent::IceGatheringStateChanged(mapped));
            Box::pin(async {})
        }));

        let tx = events.clone();
        pc.on_peer_connection_state_change(Box::new(move |state: RTCPeerConnectionState| {
            info!("Connection state: {}", state);
            let mapped = match state {
                RTCPeerConnectionState::Connecting => ConnectionState::Connecting,
                RTCPeerConnectionState::Connected => ConnectionState::Connected,
                RTCPeerConnectionState::Disconnected => ConnectionState::Disconnected,
                RTCPeerConnectionState::Failed => ConnectionState::Failed,
                RTCPeerConnectionState::Closed => ConnectionState::Closed,
                _ => ConnectionState::New,
            };
            let _ = tx.send(PeerEvent::ConnectionStateChanged(mapped));
            Box::pin(async {})
        }));

        let tx = events.clone();
        pc.on_track(Box::new(move |track, _receiver, _transceiver| {
            let kind = match track.kind() {
                RTPCodecType::Video => Some(MediaKind::Video),
                RTPCodecType::Audio => Some(MediaKind::Audio),
                _ => None,
            };
            match kind {
                Some(kind) => {
                    info!("Received remote stream: {}", kind);
                    let _ = tx.send(PeerEvent::Track {
                        kind,
                        stream_id: track.stream_id(),
                    });
                }
                None => warn!("Ignoring remote track of unknown kind"),
            }
            Box::pin(async {})
        }));
    }
}

fn construction(e: webrtc::Error) -> NegotiationError {
    NegotiationError::Construction(e.to_string())
}

fn incompatible(e: webrtc::Error) -> NegotiationError {
    NegotiationError::IncompatibleDescription(e.to_string())
}

fn to_rtc(desc: SessionDescription) -> Result<RTCSessionDescription, NegotiationError> {
    match desc.sdp_type {
        SdpType::Offer => RTCSessionDescription::offer(desc.sdp),
        SdpType::Answer => RTCSessionDescription::answer(desc.sdp),
    }
    .map_err(incompatible)
}

fn from_rtc(desc: RTCSessionDescription) -> Result<SessionDescription, NegotiationError> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => Err(NegotiationError::IncompatibleDescription(format!(
            "unsupported description type {}",
            other
        ))),
    }
}

#[async_trait]
impl PeerConnection for WebRtcPeerConnection {
    async fn add_recv_only_transceiver(&self, kind: MediaKind) -> Result<(), NegotiationError> {
        let codec_type = match kind {
            MediaKind::Audio => RTPCodecType::Audio,
            MediaKind::Video => RTPCodecType::Video,
        };

        self.pc
            .add_transceiver_from_kind(
                codec_type,
                Some(RTCRtpTransceiverInit {
                    direction: RTCRtpTransceiverDirection::Recvonly,
                    send_encodings: vec![],
                }),
            )
            .await
            .map_err(construction)?;

        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
    ) -> Result<DataChannelHandle, NegotiationError> {
        // Default init is ordered and reliable
        let channel = self
            .pc
            .create_data_channel(label, None)
            .await
            .map_err(construction)?;

        let (tx, events) = mpsc::unbounded_channel();

        let open_tx = tx.clone();
        let open_label = label.to_string();
        channel.on_open(Box::new(move || {
            info!("Data channel '{}' opened", open_label);
            let _ = open_tx.send(ChannelEvent::Open);
            Box::pin(async {})
        }));

        let message_tx = tx.clone();
        channel.on_message(Box::new(move |msg: DataChannelMessage| {
            match String::from_utf8(msg.data.to_vec()) {
                Ok(text) => {
                    let _ = message_tx.send(ChannelEvent::Message(text));
                }
                Err(e) => warn!("Dropping non-UTF-8 data channel frame: {}", e),
            }
            Box::pin(async {})
        }));

        let close_label = label.to_string();
        channel.on_close(Box::new(move || {
            info!("Data channel '{}' closed", close_label);
            let _ = tx.send(ChannelEvent::Close);
            Box::pin(async {})
        }));

        Ok(DataChannelHandle {
            channel: Arc::new(WebRtcDataChannel {
                label: label.to_string(),
                inner: channel,
            }),
            events,
        })
    }

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        let offer = self.pc.create_offer(None).await.map_err(construction)?;
        from_rtc(offer)
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.pc
            .set_local_description(to_rtc(desc)?)
            .await
            .map_err(incompatible)
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let desc = self.pc.local_description().await?;
        match from_rtc(desc) {
            Ok(desc) => Some(desc),
            Err(e) => {
                warn!("Unusable local description: {}", e);
                None
            }
        }
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        self.pc
            .set_remote_description(to_rtc(desc)?)
            .await
            .map_err(incompatible)
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        match self.pc.ice_gathering_state() {
            RTCIceGatheringState::Complete => IceGatheringState::Complete,
            RTCIceGatheringState::Gathering => IceGatheringState::Gathering,
            _ => IceGatheringState::New,
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<()> {
        self.pc.close().await?;
        debug!("WebRTC peer connection closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "webrtc-rs"
    }
}

struct WebRtcDataChannel {
    label: String,
    inner: Arc<RTCDataChannel>,
}

#[async_trait]
impl DataChannel for WebRtcDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> ChannelState {
        match self.inner.ready_state() {
            RTCDataChannelState::Open => ChannelState::Open,
            RTCDataChannelState::Closing => ChannelState::Closing,
            RTCDataChannelState::Closed => ChannelState::Closed,
            _ => ChannelState::Connecting,
        }
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.inner.send_text(text).await?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}
