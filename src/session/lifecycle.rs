use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::session::Session;
use super::stats::SessionSnapshot;
use crate::avatar::AvatarProfile;
use crate::conversation::{ControllerHandle, ConversationController, TurnState};
use crate::error::{NegotiationError, ProtocolError, SessionError};
use crate::peer::{
    ConnectionState, DataChannelHandle, MediaKind, PeerConnection, PeerEvent, PeerSession,
};
use crate::presenter::Presenter;
use crate::protocol::{ChannelMessage, DataChannelProtocol};
use crate::signaling::SignalingTransport;
use crate::voice::VoiceInput;

/// Label of the auxiliary data channel
pub const CHAT_CHANNEL: &str = "chat";

/// Wait between closing the data channel and closing the peer connection,
/// so in-flight close frames can drain
const CLOSE_GRACE: Duration = Duration::from_millis(500);

/// Top-level orchestrator for one session.
///
/// Sequences avatar lookup, negotiation, protocol setup and input wiring,
/// and owns teardown. One `SessionLifecycle` negotiates at most once.
pub struct SessionLifecycle {
    config: SessionConfig,
    signaling: Arc<dyn SignalingTransport>,
    presenter: Arc<dyn Presenter>,
    session: Arc<Mutex<Session>>,
    avatar: AvatarProfile,
    peer: Option<PeerSession>,
    protocol: Option<Arc<DataChannelProtocol>>,
    controller: Option<ControllerHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionLifecycle {
    pub fn new(
        config: SessionConfig,
        signaling: Arc<dyn SignalingTransport>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let avatar = AvatarProfile::fallback(&config.avatar_id);
        Self {
            config,
            signaling,
            presenter,
            session: Arc::new(Mutex::new(Session::new())),
            avatar,
            peer: None,
            protocol: None,
            controller: None,
            tasks: Vec::new(),
        }
    }

    pub fn session(&self) -> Arc<Mutex<Session>> {
        self.session.clone()
    }

    pub fn avatar(&self) -> &AvatarProfile {
        &self.avatar
    }

    pub fn controller(&self) -> Option<&ControllerHandle> {
        self.controller.as_ref()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let turn_state = self
            .controller
            .as_ref()
            .map(|c| c.turn_state())
            .unwrap_or(TurnState::Idle);
        SessionSnapshot::capture(&*self.session.lock().await, &self.avatar, turn_state)
    }

    /// Negotiate over `connection` and wire the conversation controller.
    ///
    /// Any signaling or negotiation failure is fatal: the session is marked
    /// failed, the presenter is told, and the peer connection is closed.
    pub async fn start(
        &mut self,
        connection: Arc<dyn PeerConnection>,
        voice: VoiceInput,
    ) -> Result<ControllerHandle, SessionError> {
        self.session.lock().await.begin_negotiation()?;

        self.load_avatar().await;
        self.presenter.on_controls_visibility_change(false);
        self.presenter.on_loading_progress("Establishing connection...");

        let mut peer = PeerSession::new(connection);
        // Subscribe before negotiating so early state changes are kept
        let peer_events = peer.subscribe();

        let channel = match self.negotiate(&mut peer).await {
            Ok(channel) => channel,
            Err(e) => {
                self.abort(&peer, &e).await;
                return Err(e);
            }
        };

        let session_id = self.session.lock().await.id();
        let DataChannelHandle { channel, events } = channel;
        let protocol = Arc::new(DataChannelProtocol::new(channel));

        let (controller, controller_task) = ConversationController::spawn(
            self.config.conversation.clone(),
            session_id,
            voice,
            self.signaling.clone(),
            self.presenter.clone(),
        );

        self.presenter.on_loading_progress("Waiting for video stream...");

        let watcher = tokio::spawn(watch_peer_events(
            peer_events,
            self.session.clone(),
            self.presenter.clone(),
            controller.clone(),
        ));

        // Frames received so far wait in `events` until this point
        let pump = {
            let protocol = protocol.clone();
            let controller = controller.clone();
            tokio::spawn(async move {
                protocol
                    .dispatch(events, |message| {
                        controller.deliver(message);
                    })
                    .await;
            })
        };

        self.tasks.extend([controller_task, watcher, pump]);
        self.peer = Some(peer);
        self.protocol = Some(protocol);
        self.controller = Some(controller.clone());

        info!("Session {} ready", session_id);
        Ok(controller)
    }

    async fn negotiate(&self, peer: &mut PeerSession) -> Result<DataChannelHandle, SessionError> {
        let channel = peer.open_data_channel(CHAT_CHANNEL).await?;
        peer.create_local_offer().await?;

        self.presenter.on_loading_progress("Gathering information...");
        let limit = self.config.ice_gathering_timeout;
        tokio::time::timeout(limit, peer.await_ice_gathering_complete())
            .await
            .map_err(|_| NegotiationError::GatheringTimedOut(limit))??;

        // Read after gathering so the offer carries every candidate
        let local = peer.local_description().await?;

        self.presenter.on_loading_progress("Loading AI avatar...");
        let answer = self
            .signaling
            .exchange(&local, &self.config.avatar_id)
            .await?;
        self.session.lock().await.assign_id(answer.session_id)?;

        self.presenter
            .on_loading_progress("Establishing video connection...");
        peer.apply_remote_description(answer.description).await?;

        Ok(channel)
    }

    async fn abort(&self, peer: &PeerSession, e: &SessionError) {
        error!("Negotiation failed: {}", e);

        if let Err(transition) = self.session.lock().await.mark_failed() {
            warn!("{}", transition);
        }
        self.presenter.on_loading_progress("Connection failed");
        self.presenter.on_fatal_error(&e.user_message());

        if let Err(close) = peer.close().await {
            warn!("Failed to close peer connection: {}", close);
        }
    }

    /// Unknown avatars and fetch failures fall back to the default profile
    async fn load_avatar(&mut self) {
        let id = self.config.avatar_id.clone();
        match self.signaling.fetch_avatars().await {
            Ok(records) => match AvatarProfile::select(&records, &id) {
                Some(profile) => self.avatar = profile,
                None => warn!("No avatar metadata for '{}', using default profile", id),
            },
            Err(e) => warn!("Failed to load avatar metadata: {}", e),
        }
        self.presenter.on_avatar_profile(&self.avatar);
    }

    /// Send one application message over the data channel.
    ///
    /// Returns `Ok(false)` when the message was dropped because the channel is
    /// not open (or not set up yet).
    pub async fn send_message(&self, message: &ChannelMessage) -> Result<bool, ProtocolError> {
        match &self.protocol {
            Some(protocol) => protocol.send(message).await,
            None => {
                warn!("Dropping outbound '{}' message, no data channel", message.tag());
                Ok(false)
            }
        }
    }

    /// Stop recording, close the data channel, then close the peer connection
    /// after a short grace period.
    pub async fn disconnect(&mut self) {
        info!("Disconnecting session");

        if let Some(controller) = self.controller.take() {
            controller.shutdown().await;
        }

        if let Some(protocol) = self.protocol.take() {
            if let Err(e) = protocol.close().await {
                warn!("Failed to close data channel: {}", e);
            }
        }

        if let Some(peer) = self.peer.take() {
            tokio::time::sleep(CLOSE_GRACE).await;
            if let Err(e) = peer.close().await {
                warn!("Failed to close peer connection: {}", e);
            }
        }

        for task in self.tasks.drain(..) {
            task.abort();
        }

        self.session.lock().await.close();
    }
}

async fn watch_peer_events(
    mut events: broadcast::Receiver<PeerEvent>,
    session: Arc<Mutex<Session>>,
    presenter: Arc<dyn Presenter>,
    controller: ControllerHandle,
) {
    loop {
        match events.recv().await {
            Ok(PeerEvent::ConnectionStateChanged(state)) => {
                info!("Peer connection state: {:?}", state);
                match state {
                    ConnectionState::Connected => {
                        if let Err(e) = session.lock().await.mark_connected() {
                            warn!("{}", e);
                        }
                        presenter.on_controls_visibility_change(true);
                    }
                    ConnectionState::Failed => {
                        if let Err(e) = session.lock().await.mark_failed() {
                            warn!("{}", e);
                        }
                        presenter.on_fatal_error(&SessionError::ConnectionFailure.user_message());
                        controller.connection_lost("peer connection failed");
                        break;
                    }
                    ConnectionState::Closed => break,
                    _ => {}
                }
            }
            Ok(PeerEvent::Track { kind, stream_id }) => {
                info!("Remote {} track on stream {}", kind, stream_id);
                presenter.on_remote_track(kind, &stream_id);
                if kind == MediaKind::Video {
                    presenter.on_controls_visibility_change(true);
                }
            }
            Ok(PeerEvent::IceGatheringStateChanged(_)) => {}
            Err(RecvError::Lagged(skipped)) => warn!("Missed {} peer events", skipped),
            Err(RecvError::Closed) => break,
        }
    }
}
