use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SessionError;

/// Opaque session token assigned by the remote endpoint (`0` = unassigned)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    pub const UNASSIGNED: SessionId = SessionId(0);

    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Negotiating,
    Connected,
    Failed,
    Closed,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Failed | SessionStatus::Closed)
    }

    /// Status only moves forward: idle -> negotiating -> {connected | failed} -> closed
    fn can_advance_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Idle, Negotiating)
                | (Idle, Closed)
                | (Negotiating, Connected)
                | (Negotiating, Failed)
                | (Negotiating, Closed)
                | (Connected, Failed)
                | (Connected, Closed)
                | (Failed, Closed)
        )
    }
}

/// One negotiation attempt with the remote media service.
///
/// Owned by `SessionLifecycle`; other components only read the identifier.
#[derive(Debug, Clone)]
pub struct Session {
    /// Local identifier used to correlate log lines
    trace_id: Uuid,

    /// Identifier assigned by the remote endpoint
    id: SessionId,

    status: SessionStatus,

    created_at: DateTime<Utc>,

    connected_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            id: SessionId::UNASSIGNED,
            status: SessionStatus::Idle,
            created_at: Utc::now(),
            connected_at: None,
        }
    }

    pub fn trace_id(&self) -> Uuid {
        self.trace_id
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn connected_at(&self) -> Option<DateTime<Utc>> {
        self.connected_at
    }

    pub fn begin_negotiation(&mut self) -> Result<(), SessionError> {
        self.advance(SessionStatus::Negotiating)
    }

    /// Record the identifier returned by the signaling exchange
    pub fn assign_id(&mut self, id: SessionId) -> Result<(), SessionError> {
        if self.status != SessionStatus::Negotiating {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: SessionStatus::Negotiating,
            });
        }
        if self.id.is_assigned() && self.id != id {
            warn!("Session {} reassigned to {}", self.id, id);
        }
        self.id = id;
        info!("Session {} assigned id {}", self.trace_id, id);
        Ok(())
    }

    pub fn mark_connected(&mut self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Connected {
            return Ok(());
        }
        self.advance(SessionStatus::Connected)?;
        self.connected_at = Some(Utc::now());
        Ok(())
    }

    pub fn mark_failed(&mut self) -> Result<(), SessionError> {
        if self.status == SessionStatus::Failed {
            return Ok(());
        }
        self.advance(SessionStatus::Failed)
    }

    /// Close the session. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.status == SessionStatus::Closed {
            return;
        }
        // Every non-closed status may advance to closed
        self.status = SessionStatus::Closed;
        info!("Session {} ({}) closed", self.trace_id, self.id);
    }

    fn advance(&mut self, next: SessionStatus) -> Result<(), SessionError> {
        if !self.status.can_advance_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        info!(
            "Session {} status: {:?} -> {:?}",
            self.trace_id, self.status, next
        );
        self.status = next;
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
