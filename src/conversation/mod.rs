//! Turn-taking and subtitle lifecycle
//!
//! `ConversationController` consumes voice-input transcripts and inbound
//! data-channel messages, and drives the presenter:
//! - recording and push-to-talk gating
//! - user and assistant turns
//! - subtitle show and hide-after-delay

mod controller;
mod subtitle;
mod timer;
mod turn;

pub use controller::{ControllerHandle, ConversationController, TurnState};
pub use subtitle::SubtitleState;
pub use timer::{sleep_until, Deadline};
pub use turn::{ConversationTurn, Role};
