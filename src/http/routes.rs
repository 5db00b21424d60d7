use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Session and view queries
        .route("/session", get(handlers::get_session))
        .route("/view", get(handlers::get_view))
        // Voice input gestures
        .route("/voice/press", post(handlers::voice_press))
        .route("/voice/release", post(handlers::voice_release))
        .route("/voice/toggle", post(handlers::voice_toggle))
        // Host-side capture and recognition
        .route("/voice/audio", post(handlers::voice_audio))
        .route("/voice/transcript", post(handlers::voice_transcript))
        .route("/voice/error", post(handlers::voice_error))
        .route("/voice/end", post(handlers::voice_end))
        // Conversation
        .route("/chat", post(handlers::chat))
        .route("/subtitles/toggle", post(handlers::toggle_subtitles))
        .route("/disconnect", post(handlers::disconnect))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
