use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::session::{Session, SessionId, SessionStatus};
use crate::avatar::AvatarProfile;
use crate::conversation::TurnState;

/// Point-in-time view of a session, served by the control API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Identifier assigned by the remote endpoint (0 until negotiated)
    pub session_id: SessionId,

    pub status: SessionStatus,

    /// Local correlation id
    pub trace_id: String,

    pub created_at: DateTime<Utc>,

    pub connected_at: Option<DateTime<Utc>>,

    pub avatar: AvatarProfile,

    /// Current turn-taking state
    pub turn_state: TurnState,
}

impl SessionSnapshot {
    pub fn capture(session: &Session, avatar: &AvatarProfile, turn_state: TurnState) -> Self {
        Self {
            session_id: session.id(),
            status: session.status(),
            trace_id: session.trace_id().to_string(),
            created_at: session.created_at(),
            connected_at: session.connected_at(),
            avatar: avatar.clone(),
            turn_state,
        }
    }
}
