use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use super::connection::{
    DataChannelHandle, IceGatheringState, MediaKind, PeerConnection, PeerEvent, SdpType,
    SessionDescription,
};
use crate::error::NegotiationError;

/// Owns the peer connection for one negotiation.
///
/// Produces a fully-formed local description and consumes the remote one.
/// A session creates at most one offer.
pub struct PeerSession {
    connection: Arc<dyn PeerConnection>,
    offered: bool,
    remote_description: Option<SessionDescription>,
}

impl PeerSession {
    pub fn new(connection: Arc<dyn PeerConnection>) -> Self {
        info!("Peer session using {}", connection.name());
        Self {
            connection,
            offered: false,
            remote_description: None,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.connection.subscribe()
    }

    pub async fn open_data_channel(&self, label: &str) -> Result<DataChannelHandle, NegotiationError> {
        let handle = self.connection.create_data_channel(label).await?;
        info!("Data channel '{}' created", handle.channel.label());
        Ok(handle)
    }

    /// Add receive-only video and audio transceivers, create an offer and apply it locally
    pub async fn create_local_offer(&mut self) -> Result<SessionDescription, NegotiationError> {
        if self.offered {
            return Err(NegotiationError::IncompatibleDescription(
                "an offer was already created for this session".to_string(),
            ));
        }

        for kind in [MediaKind::Video, MediaKind::Audio] {
            self.connection.add_recv_only_transceiver(kind).await?;
            debug!("Added recvonly {} transceiver", kind);
        }

        let offer = self.connection.create_offer().await?;
        if offer.sdp_type != SdpType::Offer {
            return Err(NegotiationError::IncompatibleDescription(format!(
                "connection produced {:?} instead of an offer",
                offer.sdp_type
            )));
        }

        self.connection.set_local_description(offer.clone()).await?;
        self.offered = true;

        info!("Local offer applied ({} bytes)", offer.sdp.len());
        Ok(offer)
    }

    /// Wait until ICE candidate gathering reaches `complete`.
    ///
    /// Returns immediately when gathering already finished. Imposes no timeout.
    pub async fn await_ice_gathering_complete(&self) -> Result<(), NegotiationError> {
        // Subscribe before reading the state so a transition in between is not lost
        let mut events = self.connection.subscribe();

        if self.connection.ice_gathering_state() == IceGatheringState::Complete {
            debug!("ICE gathering already complete");
            return Ok(());
        }

        loop {
            match events.recv().await {
                Ok(PeerEvent::IceGatheringStateChanged(IceGatheringState::Complete)) => break,
                Ok(PeerEvent::IceGatheringStateChanged(state)) => {
                    debug!("ICE gathering state: {:?}", state);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Missed {} peer events while gathering", skipped);
                    if self.connection.ice_gathering_state() == IceGatheringState::Complete {
                        break;
                    }
                }
                Err(RecvError::Closed) => return Err(NegotiationError::ConnectionClosed),
            }
        }

        info!("ICE gathering complete");
        Ok(())
    }

    /// Local description as it stands now (with any gathered candidates)
    pub async fn local_description(&self) -> Result<SessionDescription, NegotiationError> {
        self.connection
            .local_description()
            .await
            .ok_or(NegotiationError::MissingLocalDescription)
    }

    pub async fn apply_remote_description(
        &mut self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        if !self.offered {
            return Err(NegotiationError::IncompatibleDescription(
                "remote description received before a local offer".to_string(),
            ));
        }
        if desc.sdp_type != SdpType::Answer {
            return Err(NegotiationError::IncompatibleDescription(format!(
                "expected an answer, got {:?}",
                desc.sdp_type
            )));
        }
        if desc.sdp.trim().is_empty() {
            return Err(NegotiationError::IncompatibleDescription(
                "empty answer".to_string(),
            ));
        }

        self.connection.set_remote_description(desc.clone()).await?;
        self.remote_description = Some(desc);

        info!("Remote description applied");
        Ok(())
    }

    pub fn remote_description(&self) -> Option<&SessionDescription> {
        self.remote_description.as_ref()
    }

    pub async fn close(&self) -> Result<()> {
        info!("Closing peer connection");
        self.connection.close().await
    }
}
