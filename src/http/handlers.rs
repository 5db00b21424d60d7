use super::state::AppState;
use crate::session::SessionSnapshot;
use crate::voice::TranscriptEvent;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AudioRequest {
    /// Base64-encoded audio bytes
    pub pcm: String,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub text: String,

    /// Finalized utterance rather than interim text
    #[serde(default, rename = "final")]
    pub is_final: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecognizerErrorRequest {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    pub accepted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn accepted(accepted: bool) -> axum::response::Response {
    (StatusCode::ACCEPTED, Json(AcceptedResponse { accepted })).into_response()
}

fn controller_stopped() -> axum::response::Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorResponse {
            error: "conversation controller is not running".to_string(),
        }),
    )
        .into_response()
}

fn forwarded(sent: bool) -> axum::response::Response {
    if sent {
        accepted(true)
    } else {
        controller_stopped()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /session
/// Session id, status, avatar and turn state
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    let session = state.session.lock().await;
    let snapshot =
        SessionSnapshot::capture(&session, &state.avatar, state.controller.turn_state());
    (StatusCode::OK, Json(snapshot))
}

/// GET /view
/// What the presenter currently shows
pub async fn get_view(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.view.snapshot()))
}

/// POST /voice/press
pub async fn voice_press(State(state): State<AppState>) -> impl IntoResponse {
    forwarded(state.controller.talk_pressed())
}

/// POST /voice/release
pub async fn voice_release(State(state): State<AppState>) -> impl IntoResponse {
    forwarded(state.controller.talk_released())
}

/// POST /voice/toggle
/// Microphone button
pub async fn voice_toggle(State(state): State<AppState>) -> impl IntoResponse {
    forwarded(state.controller.toggle_voice_input())
}

/// POST /voice/audio
/// Feed one microphone fragment; dropped unless recording
pub async fn voice_audio(
    State(state): State<AppState>,
    Json(req): Json<AudioRequest>,
) -> impl IntoResponse {
    let data = match STANDARD.decode(req.pcm.as_bytes()) {
        Ok(data) => data,
        Err(e) => {
            warn!("Rejecting audio fragment: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: format!("Invalid base64 audio: {}", e),
                }),
            )
                .into_response();
        }
    };

    debug!("Audio fragment: {} bytes", data.len());
    accepted(state.capture_feed.push(data))
}

/// POST /voice/transcript
/// Feed one interim or final recognizer result
pub async fn voice_transcript(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> impl IntoResponse {
    let event = if req.is_final {
        TranscriptEvent::Final(req.text)
    } else {
        TranscriptEvent::Interim(req.text)
    };
    accepted(state.recognizer_feed.push(event))
}

/// POST /voice/error
pub async fn voice_error(
    State(state): State<AppState>,
    Json(req): Json<RecognizerErrorRequest>,
) -> impl IntoResponse {
    accepted(state.recognizer_feed.push(TranscriptEvent::Error(req.error)))
}

/// POST /voice/end
/// The speech engine stopped on its own; an active recording is stopped
pub async fn voice_end(State(state): State<AppState>) -> impl IntoResponse {
    accepted(state.recognizer_feed.push(TranscriptEvent::Ended))
}

/// POST /chat
/// Typed chat message
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> impl IntoResponse {
    if req.text.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "text must not be empty".to_string(),
            }),
        )
            .into_response();
    }
    forwarded(state.controller.send_text(req.text))
}

/// POST /subtitles/toggle
pub async fn toggle_subtitles(State(state): State<AppState>) -> impl IntoResponse {
    forwarded(state.controller.toggle_subtitles())
}

/// POST /disconnect
/// End the session; the server shuts down once teardown completes
pub async fn disconnect(State(state): State<AppState>) -> impl IntoResponse {
    info!("Disconnect requested");
    state.shutdown.notify_one();
    accepted(true)
}
