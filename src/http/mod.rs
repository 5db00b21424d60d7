//! HTTP API server for local control
//!
//! Gesture sources, the host-side microphone and speech engine, and viewers
//! talk to the running session through this REST API:
//! - GET /session, GET /view - Query session and presenter state
//! - POST /voice/press, /voice/release, /voice/toggle - Voice input gestures
//! - POST /voice/audio, /voice/transcript, /voice/error, /voice/end - Capture and
//!   recognizer feeds
//! - POST /chat - Typed chat message
//! - POST /subtitles/toggle - Show or hide subtitles
//! - POST /disconnect - End the session
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
