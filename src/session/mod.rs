//! Session lifecycle management
//!
//! This module provides the `Session` value and the `SessionLifecycle`
//! orchestrator that sequences:
//! - Avatar profile lookup
//! - Offer/answer negotiation with ICE-gathering synchronization
//! - Data-channel protocol and conversation controller wiring
//! - Teardown on disconnect

mod config;
mod lifecycle;
mod session;
mod stats;

pub use config::SessionConfig;
pub use lifecycle::SessionLifecycle;
pub use session::{Session, SessionId, SessionStatus};
pub use stats::SessionSnapshot;
