//! Presentation boundary
//!
//! The core never renders anything itself. It reports subtitle, chat,
//! control and error changes through `Presenter`; `ViewPresenter` keeps the
//! latest view in memory so the control API can serve it.

use serde::Serialize;
use std::sync::{Arc, RwLock};
use tracing::{debug, error, info};

use crate::avatar::AvatarProfile;
use crate::conversation::ConversationTurn;
use crate::peer::MediaKind;

/// Callbacks consumed by the presentation collaborator
pub trait Presenter: Send + Sync {
    fn on_subtitle_change(&self, text: &str, visible: bool);

    fn on_chat_turn(&self, turn: &ConversationTurn);

    fn on_controls_visibility_change(&self, visible: bool);

    /// Blocking, user-visible notification
    fn on_fatal_error(&self, message: &str);

    fn on_loading_progress(&self, _stage: &str) {}

    fn on_remote_track(&self, _kind: MediaKind, _stream_id: &str) {}

    fn on_avatar_profile(&self, _profile: &AvatarProfile) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteTrack {
    pub kind: MediaKind,
    pub stream_id: String,
}

/// Everything a viewer needs to render the page
#[derive(Debug, Clone, Default, Serialize)]
pub struct ViewState {
    pub subtitle: String,
    pub subtitle_visible: bool,
    pub controls_visible: bool,
    pub loading_stage: Option<String>,
    pub chat: Vec<ConversationTurn>,
    pub last_error: Option<String>,
    pub avatar: Option<AvatarProfile>,
    pub remote_tracks: Vec<RemoteTrack>,
}

/// Presenter that logs every change and keeps the resulting view
#[derive(Clone, Default)]
pub struct ViewPresenter {
    view: Arc<RwLock<ViewState>>,
}

impl ViewPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ViewState {
        match self.view.read() {
            Ok(view) => view.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut ViewState)) {
        match self.view.write() {
            Ok(mut view) => apply(&mut view),
            Err(poisoned) => apply(&mut poisoned.into_inner()),
        }
    }
}

impl Presenter for ViewPresenter {
    fn on_subtitle_change(&self, text: &str, visible: bool) {
        debug!("Subtitle ({}): {}", if visible { "shown" } else { "hidden" }, text);
        self.update(|view| {
            view.subtitle = text.to_string();
            view.subtitle_visible = visible;
        });
    }

    fn on_chat_turn(&self, turn: &ConversationTurn) {
        info!("Chat turn ({:?}): {}", turn.role, turn.text);
        self.update(|view| view.chat.push(turn.clone()));
    }

    fn on_controls_visibility_change(&self, visible: bool) {
        debug!("Controls visible: {}", visible);
        self.update(|view| {
            view.controls_visible = visible;
            if visible {
                view.loading_stage = None;
            }
        });
    }

    fn on_fatal_error(&self, message: &str) {
        error!("Fatal: {}", message);
        self.update(|view| view.last_error = Some(message.to_string()));
    }

    fn on_loading_progress(&self, stage: &str) {
        info!("Loading: {}", stage);
        self.update(|view| view.loading_stage = Some(stage.to_string()));
    }

    fn on_remote_track(&self, kind: MediaKind, stream_id: &str) {
        self.update(|view| {
            view.remote_tracks.push(RemoteTrack {
                kind,
                stream_id: stream_id.to_string(),
            })
        });
    }

    fn on_avatar_profile(&self, profile: &AvatarProfile) {
        info!("Avatar: {} ({})", profile.name, profile.id);
        self.update(|view| view.avatar = Some(profile.clone()));
    }
}
