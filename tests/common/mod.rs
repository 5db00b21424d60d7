// Shared test doubles for integration tests
//
// Scripted peer connection and data channel, signaling transport, speech
// recognizer, and a presenter that records every callback.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use avatar_talk::avatar::AvatarProfile;
use avatar_talk::config::ConversationConfig;
use avatar_talk::conversation::{ControllerHandle, ConversationController, ConversationTurn, Role};
use avatar_talk::error::{CaptureError, NegotiationError, SignalingError};
use avatar_talk::peer::{
    ChannelEvent, ChannelState, DataChannel, DataChannelHandle, IceGatheringState, MediaKind,
    PeerConnection, PeerEvent, SessionDescription,
};
use avatar_talk::presenter::Presenter;
use avatar_talk::session::SessionId;
use avatar_talk::signaling::{AvatarRecord, NegotiatedAnswer, SignalingTransport};
use avatar_talk::voice::{
    CaptureFeed, ChannelCapture, SpeechRecognizer, TranscriptEvent, TranscriptSink, VoiceInput,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

pub const MOCK_OFFER_SDP: &str = "v=0\r\no=- 1 1 IN IP4 127.0.0.1\r\ns=-\r\n";
pub const MOCK_CANDIDATE: &str = "a=candidate:1 1 udp 2130706431 127.0.0.1 50000 typ host\r\n";
pub const MOCK_ANSWER_SDP: &str = "v=0\r\no=- 2 2 IN IP4 127.0.0.1\r\ns=answer\r\n";

/// Ordered record of interesting events across mocks
pub type OrderLog = Arc<Mutex<Vec<String>>>;

pub fn order_log() -> OrderLog {
    Arc::new(Mutex::new(Vec::new()))
}

fn note(log: &Option<OrderLog>, entry: impl Into<String>) {
    if let Some(log) = log {
        log.lock().unwrap().push(entry.into());
    }
}

// ============================================================================
// Peer connection
// ============================================================================

/// How ICE gathering progresses once the local description is set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gathering {
    /// Gathering -> Complete as soon as the local description is applied
    CompleteOnLocal,
    /// Stays in Gathering until the test calls `set_gathering`
    Manual,
}

pub struct MockDataChannel {
    label: String,
    state: Mutex<ChannelState>,
    sent: Mutex<Vec<String>>,
}

impl MockDataChannel {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            state: Mutex::new(ChannelState::Connecting),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn set_state(&self, state: ChannelState) {
        *self.state.lock().unwrap() = state;
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataChannel for MockDataChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap()
    }

    async fn send_text(&self, text: String) -> Result<()> {
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.set_state(ChannelState::Closed);
        Ok(())
    }
}

pub struct MockPeerConnection {
    events: broadcast::Sender<PeerEvent>,
    gathering_mode: Gathering,
    gathering: Mutex<IceGatheringState>,
    local: Mutex<Option<SessionDescription>>,
    remote: Mutex<Option<SessionDescription>>,
    transceivers: Mutex<Vec<MediaKind>>,
    channel: Arc<MockDataChannel>,
    channel_tx: Mutex<Option<mpsc::UnboundedSender<ChannelEvent>>>,
    /// Channel events queued as soon as the channel is created
    preload: Vec<ChannelEvent>,
    fail_offer: bool,
    closed: AtomicBool,
    log: Option<OrderLog>,
}

impl MockPeerConnection {
    pub fn new(gathering_mode: Gathering) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            events,
            gathering_mode,
            gathering: Mutex::new(IceGatheringState::New),
            local: Mutex::new(None),
            remote: Mutex::new(None),
            transceivers: Mutex::new(Vec::new()),
            channel: Arc::new(MockDataChannel::new("chat")),
            channel_tx: Mutex::new(None),
            preload: Vec::new(),
            fail_offer: false,
            closed: AtomicBool::new(false),
            log: None,
        }
    }

    pub fn with_log(mut self, log: OrderLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn with_preloaded_frames(mut self, events: Vec<ChannelEvent>) -> Self {
        self.preload = events;
        self
    }

    pub fn failing_offer(mut self) -> Self {
        self.fail_offer = true;
        self
    }

    pub fn set_gathering(&self, state: IceGatheringState) {
        *self.gathering.lock().unwrap() = state;
        let _ = self.events.send(PeerEvent::IceGatheringStateChanged(state));
    }

    pub fn emit(&self, event: PeerEvent) {
        let _ = self.events.send(event);
    }

    pub fn emit_channel(&self, event: ChannelEvent) {
        if let ChannelEvent::Open = event {
            self.channel.set_state(ChannelState::Open);
        }
        if let Some(tx) = self.channel_tx.lock().unwrap().as_ref() {
            let _ = tx.send(event);
        }
    }

    pub fn channel(&self) -> Arc<MockDataChannel> {
        self.channel.clone()
    }

    pub fn transceivers(&self) -> Vec<MediaKind> {
        self.transceivers.lock().unwrap().clone()
    }

    pub fn remote(&self) -> Option<SessionDescription> {
        self.remote.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }
}

#[async_trait]
impl PeerConnection for MockPeerConnection {
    async fn add_recv_only_transceiver(&self, kind: MediaKind) -> Result<(), NegotiationError> {
        self.transceivers.lock().unwrap().push(kind);
        Ok(())
    }

    async fn create_data_channel(
        &self,
        label: &str,
    ) -> Result<DataChannelHandle, NegotiationError> {
        assert_eq!(label, self.channel.label());
        let (tx, rx) = mpsc::unbounded_channel();
        for event in &self.preload {
            if let ChannelEvent::Open = event {
                self.channel.set_state(ChannelState::Open);
            }
            let _ = tx.send(event.clone());
        }
        *self.channel_tx.lock().unwrap() = Some(tx);
        Ok(DataChannelHandle {
            channel: self.channel.clone(),
            events: rx,
        })
    }

    async fn create_offer(&self) -> Result<SessionDescription, NegotiationError> {
        if self.fail_offer {
            return Err(NegotiationError::Construction("no transport".to_string()));
        }
        Ok(SessionDescription::offer(MOCK_OFFER_SDP))
    }

    async fn set_local_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        *self.local.lock().unwrap() = Some(desc);
        self.set_gathering(IceGatheringState::Gathering);
        if self.gathering_mode == Gathering::CompleteOnLocal {
            self.set_gathering(IceGatheringState::Complete);
        }
        Ok(())
    }

    async fn local_description(&self) -> Option<SessionDescription> {
        let local = self.local.lock().unwrap().clone()?;
        if *self.gathering.lock().unwrap() == IceGatheringState::Complete {
            Some(SessionDescription {
                sdp_type: local.sdp_type,
                sdp: format!("{}{}", local.sdp, MOCK_CANDIDATE),
            })
        } else {
            Some(local)
        }
    }

    async fn set_remote_description(
        &self,
        desc: SessionDescription,
    ) -> Result<(), NegotiationError> {
        *self.remote.lock().unwrap() = Some(desc);
        note(&self.log, "remote_applied");
        Ok(())
    }

    fn ice_gathering_state(&self) -> IceGatheringState {
        *self.gathering.lock().unwrap()
    }

    fn subscribe(&self) -> broadcast::Receiver<PeerEvent> {
        self.events.subscribe()
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        note(&self.log, "peer_closed");
        Ok(())
    }

    fn name(&self) -> &str {
        "mock-peer"
    }
}

// ============================================================================
// Signaling
// ============================================================================

pub struct MockSignaling {
    session_id: u64,
    answer_sdp: String,
    fail_exchange: bool,
    fail_chat: AtomicBool,
    avatars: Option<Vec<AvatarRecord>>,
    exchanges: Mutex<Vec<(SessionDescription, String)>>,
    chats: Mutex<Vec<(SessionId, String)>>,
    log: Option<OrderLog>,
}

impl MockSignaling {
    pub fn answering(session_id: u64) -> Self {
        Self {
            session_id,
            answer_sdp: MOCK_ANSWER_SDP.to_string(),
            fail_exchange: false,
            fail_chat: AtomicBool::new(false),
            avatars: Some(Vec::new()),
            exchanges: Mutex::new(Vec::new()),
            chats: Mutex::new(Vec::new()),
            log: None,
        }
    }

    pub fn failing_exchange() -> Self {
        Self {
            fail_exchange: true,
            ..Self::answering(0)
        }
    }

    pub fn with_answer_sdp(mut self, sdp: &str) -> Self {
        self.answer_sdp = sdp.to_string();
        self
    }

    pub fn with_avatars(mut self, avatars: Vec<AvatarRecord>) -> Self {
        self.avatars = Some(avatars);
        self
    }

    pub fn without_avatars(mut self) -> Self {
        self.avatars = None;
        self
    }

    pub fn with_log(mut self, log: OrderLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn set_chat_failure(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> Vec<(SessionDescription, String)> {
        self.exchanges.lock().unwrap().clone()
    }

    pub fn chats(&self) -> Vec<(SessionId, String)> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl SignalingTransport for MockSignaling {
    async fn exchange(
        &self,
        local: &SessionDescription,
        avatar_id: &str,
    ) -> Result<NegotiatedAnswer, SignalingError> {
        self.exchanges
            .lock()
            .unwrap()
            .push((local.clone(), avatar_id.to_string()));
        note(&self.log, "exchange");

        if self.fail_exchange {
            return Err(SignalingError::Network("connection refused".to_string()));
        }
        Ok(NegotiatedAnswer {
            description: SessionDescription::answer(self.answer_sdp.clone()),
            session_id: SessionId(self.session_id),
        })
    }

    async fn send_chat(&self, session_id: SessionId, text: &str) -> Result<(), SignalingError> {
        self.chats
            .lock()
            .unwrap()
            .push((session_id, text.to_string()));
        note(&self.log, format!("chat:{}", text));

        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(SignalingError::Rejected { status: 500 });
        }
        Ok(())
    }

    async fn fetch_avatars(&self) -> Result<Vec<AvatarRecord>, SignalingError> {
        self.avatars
            .clone()
            .ok_or_else(|| SignalingError::Network("avatar service down".to_string()))
    }
}

// ============================================================================
// Speech recognizer
// ============================================================================

/// Test-side view of a `MockRecognizer`
#[derive(Clone, Default)]
pub struct RecognizerProbe {
    sink: Arc<Mutex<Option<TranscriptSink>>>,
    final_on_stop: Arc<Mutex<Option<String>>>,
    events_on_stop: Arc<Mutex<Vec<TranscriptEvent>>>,
    starts: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl RecognizerProbe {
    /// Deliver an engine result. Returns false when recognition is inactive.
    pub fn push(&self, event: TranscriptEvent) -> bool {
        match self.sink.lock().unwrap().as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }

    /// Final result the engine flushes on the next stop
    pub fn flush_on_stop(&self, text: &str) {
        *self.final_on_stop.lock().unwrap() = Some(text.to_string());
    }

    /// Event the engine emits on its stream while stopping
    pub fn emit_on_stop(&self, event: TranscriptEvent) {
        self.events_on_stop.lock().unwrap().push(event);
    }

    pub fn is_active(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct MockRecognizer {
    probe: RecognizerProbe,
}

impl MockRecognizer {
    pub fn new(probe: RecognizerProbe) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl SpeechRecognizer for MockRecognizer {
    async fn start(&mut self, sink: TranscriptSink) -> Result<(), CaptureError> {
        *self.probe.sink.lock().unwrap() = Some(sink);
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Option<String>, CaptureError> {
        if let Some(sink) = self.probe.sink.lock().unwrap().take() {
            for event in self.probe.events_on_stop.lock().unwrap().drain(..) {
                let _ = sink.send(event);
            }
        }
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
        Ok(self.probe.final_on_stop.lock().unwrap().take())
    }

    fn name(&self) -> &str {
        "mock-recognizer"
    }
}

// ============================================================================
// Presenter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenterEvent {
    Subtitle { text: String, visible: bool },
    Turn { role: Role, text: String },
    Controls(bool),
    Fatal(String),
    Loading(String),
    Track(MediaKind, String),
    Avatar(AvatarProfile),
}

#[derive(Default)]
pub struct RecordingPresenter {
    events: Mutex<Vec<PresenterEvent>>,
    log: Option<OrderLog>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(log: OrderLog) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            log: Some(log),
        }
    }

    fn record(&self, event: PresenterEvent) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<PresenterEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn turns(&self) -> Vec<(Role, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Turn { role, text } => Some((role, text)),
                _ => None,
            })
            .collect()
    }

    /// Most recent `(text, visible)` subtitle change
    pub fn subtitle(&self) -> Option<(String, bool)> {
        self.events().into_iter().rev().find_map(|e| match e {
            PresenterEvent::Subtitle { text, visible } => Some((text, visible)),
            _ => None,
        })
    }

    pub fn fatal_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Fatal(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn loading_stages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Loading(stage) => Some(stage),
                _ => None,
            })
            .collect()
    }

    pub fn controls(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresenterEvent::Controls(visible) => Some(visible),
                _ => None,
            })
            .collect()
    }
}

impl Presenter for RecordingPresenter {
    fn on_subtitle_change(&self, text: &str, visible: bool) {
        self.record(PresenterEvent::Subtitle {
            text: text.to_string(),
            visible,
        });
    }

    fn on_chat_turn(&self, turn: &ConversationTurn) {
        note(&self.log, format!("turn:{}", turn.text));
        self.record(PresenterEvent::Turn {
            role: turn.role,
            text: turn.text.clone(),
        });
    }

    fn on_controls_visibility_change(&self, visible: bool) {
        self.record(PresenterEvent::Controls(visible));
    }

    fn on_fatal_error(&self, message: &str) {
        self.record(PresenterEvent::Fatal(message.to_string()));
    }

    fn on_loading_progress(&self, stage: &str) {
        self.record(PresenterEvent::Loading(stage.to_string()));
    }

    fn on_remote_track(&self, kind: MediaKind, stream_id: &str) {
        self.record(PresenterEvent::Track(kind, stream_id.to_string()));
    }

    fn on_avatar_profile(&self, profile: &AvatarProfile) {
        self.record(PresenterEvent::Avatar(profile.clone()));
    }
}

// ============================================================================
// Controller harness
// ============================================================================

pub struct Harness {
    pub handle: ControllerHandle,
    pub task: JoinHandle<()>,
    pub presenter: Arc<RecordingPresenter>,
    pub signaling: Arc<MockSignaling>,
    pub recognizer: RecognizerProbe,
    pub capture: CaptureFeed,
}

/// Voice input over an external capture feed and a mock recognizer
pub fn voice_input(
    permission_granted: bool,
) -> (VoiceInput, CaptureFeed, RecognizerProbe) {
    let capture = CaptureFeed::default();
    let recognizer = RecognizerProbe::default();
    let voice = VoiceInput::new(
        Box::new(ChannelCapture::new(capture.clone(), permission_granted)),
        Some(Box::new(MockRecognizer::new(recognizer.clone()))),
    );
    (voice, capture, recognizer)
}

pub fn spawn_controller(permission_granted: bool) -> Harness {
    spawn_controller_with(ConversationConfig::default(), permission_granted)
}

pub fn spawn_controller_with(config: ConversationConfig, permission_granted: bool) -> Harness {
    let (voice, capture, recognizer) = voice_input(permission_granted);
    let presenter = Arc::new(RecordingPresenter::new());
    let signaling = Arc::new(MockSignaling::answering(7));

    let (handle, task) = ConversationController::spawn(
        config,
        SessionId(7),
        voice,
        signaling.clone(),
        presenter.clone(),
    );

    Harness {
        handle,
        task,
        presenter,
        signaling,
        recognizer,
        capture,
    }
}

/// Let spawned tasks run, then wait for the controller to drain its queues
pub async fn settle(handle: &ControllerHandle) {
    for _ in 0..3 {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        handle.barrier().await;
    }
}
