use std::sync::Arc;
use tokio::sync::{Mutex, Notify};

use crate::avatar::AvatarProfile;
use crate::conversation::ControllerHandle;
use crate::presenter::ViewPresenter;
use crate::session::Session;
use crate::voice::{CaptureFeed, RecognizerFeed};

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: ControllerHandle,

    pub session: Arc<Mutex<Session>>,

    pub avatar: AvatarProfile,

    /// Latest presenter view
    pub view: ViewPresenter,

    /// Microphone fragments pushed by the host
    pub capture_feed: CaptureFeed,

    /// Recognizer results pushed by the host
    pub recognizer_feed: RecognizerFeed,

    /// Notified by `POST /disconnect`
    pub shutdown: Arc<Notify>,
}
