use async_trait::async_trait;

use super::messages::{AvatarRecord, NegotiatedAnswer};
use crate::error::SignalingError;
use crate::peer::SessionDescription;
use crate::session::SessionId;

/// Request/response exchanges with the remote media service
///
/// Implementations:
/// - `HttpSignaling`: JSON over HTTP (`/offer`, `/human`, `/api/avatars`)
/// - Test doubles in `tests/common`
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Send the local offer and receive the remote answer plus session id.
    ///
    /// Exactly one attempt; no retry.
    async fn exchange(
        &self,
        local: &SessionDescription,
        avatar_id: &str,
    ) -> Result<NegotiatedAnswer, SignalingError>;

    /// Deliver a finalized user utterance. The reply arrives over the data channel.
    async fn send_chat(&self, session_id: SessionId, text: &str) -> Result<(), SignalingError>;

    /// Fetch avatar metadata records
    async fn fetch_avatars(&self) -> Result<Vec<AvatarRecord>, SignalingError>;
}
