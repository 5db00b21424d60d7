use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::subtitle::SubtitleState;
use super::timer::{sleep_until, Deadline};
use super::turn::ConversationTurn;
use crate::config::ConversationConfig;
use crate::error::SessionError;
use crate::presenter::Presenter;
use crate::protocol::ChannelMessage;
use crate::session::SessionId;
use crate::signaling::SignalingTransport;
use crate::voice::{TranscriptEvent, VoiceInput};

/// Recognizer error that only means the user said nothing
const NO_SPEECH: &str = "no-speech";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    Recording,
    /// Capture is being released; the engine may still flush a final result
    AwaitingFinalTranscript,
    /// User text is on its way to the remote endpoint
    Sending,
    /// Waiting on the remote side to answer or finish speaking
    Listening,
}

enum Command {
    TalkPressed,
    TalkReleased,
    ToggleVoiceInput,
    StartVoiceInput,
    StopVoiceInput,
    Inbound(ChannelMessage),
    SendText(String),
    ToggleSubtitles,
    ConnectionLost(String),
    Barrier(oneshot::Sender<()>),
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to a running `ConversationController`.
///
/// Fire-and-forget methods return false once the controller has stopped.
#[derive(Clone)]
pub struct ControllerHandle {
    tx: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<TurnState>,
}

impl ControllerHandle {
    fn post(&self, command: Command) -> bool {
        self.tx.send(command).is_ok()
    }

    /// Push-to-talk pressed
    pub fn talk_pressed(&self) -> bool {
        self.post(Command::TalkPressed)
    }

    /// Push-to-talk released
    pub fn talk_released(&self) -> bool {
        self.post(Command::TalkReleased)
    }

    /// Microphone button
    pub fn toggle_voice_input(&self) -> bool {
        self.post(Command::ToggleVoiceInput)
    }

    pub fn start_voice_input(&self) -> bool {
        self.post(Command::StartVoiceInput)
    }

    pub fn stop_voice_input(&self) -> bool {
        self.post(Command::StopVoiceInput)
    }

    /// Hand over one inbound data-channel message
    pub fn deliver(&self, message: ChannelMessage) -> bool {
        self.post(Command::Inbound(message))
    }

    /// Typed chat message
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.post(Command::SendText(text.into()))
    }

    pub fn toggle_subtitles(&self) -> bool {
        self.post(Command::ToggleSubtitles)
    }

    pub fn connection_lost(&self, reason: impl Into<String>) -> bool {
        self.post(Command::ConnectionLost(reason.into()))
    }

    /// Resolves once every command posted before it has been handled
    pub async fn barrier(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.post(Command::Barrier(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    /// Stop any recording and end the controller task
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.post(Command::Shutdown(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    pub fn turn_state(&self) -> TurnState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.tx.is_closed()
    }
}

/// Turn-taking state machine.
///
/// Runs as a single task that owns the voice input, the subtitle state and
/// both timers. Commands, transcript results, send completions and timer
/// expiries are handled strictly one at a time.
pub struct ConversationController {
    config: ConversationConfig,
    session_id: SessionId,
    state: TurnState,
    speaking: bool,
    halted: bool,
    subtitles: SubtitleState,
    /// Push-to-talk hold gate; capture starts only once it fires
    press: Deadline,
    voice: VoiceInput,
    outbound: Arc<dyn SignalingTransport>,
    presenter: Arc<dyn Presenter>,
    state_tx: watch::Sender<TurnState>,
    inbox: mpsc::UnboundedReceiver<Command>,
    transcripts_tx: mpsc::UnboundedSender<TranscriptEvent>,
    transcripts: mpsc::UnboundedReceiver<TranscriptEvent>,
    sends_tx: mpsc::UnboundedSender<Result<(), String>>,
    sends: mpsc::UnboundedReceiver<Result<(), String>>,
}

impl ConversationController {
    pub fn spawn(
        config: ConversationConfig,
        session_id: SessionId,
        voice: VoiceInput,
        outbound: Arc<dyn SignalingTransport>,
        presenter: Arc<dyn Presenter>,
    ) -> (ControllerHandle, JoinHandle<()>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(TurnState::Idle);
        let (transcripts_tx, transcripts) = mpsc::unbounded_channel();
        let (sends_tx, sends) = mpsc::unbounded_channel();

        let controller = Self {
            subtitles: SubtitleState::new(config.subtitles_enabled),
            config,
            session_id,
            state: TurnState::Idle,
            speaking: false,
            halted: false,
            press: Deadline::new(),
            voice,
            outbound,
            presenter,
            state_tx,
            inbox,
            transcripts_tx,
            transcripts,
            sends_tx,
            sends,
        };

        let task = tokio::spawn(controller.run());
        (ControllerHandle { tx, state: state_rx }, task)
    }

    async fn run(mut self) {
        info!("Conversation controller started for session {}", self.session_id);

        loop {
            let hide_at = self.subtitles.hide_deadline();
            let press_at = self.press.at();

            tokio::select! {
                biased;

                Some(event) = self.transcripts.recv() => self.on_transcript(event).await,

                _ = sleep_until(hide_at) => self.on_hide_deadline(),

                _ = sleep_until(press_at) => self.on_press_held().await,

                command = self.inbox.recv() => match command {
                    Some(Command::Shutdown(ack)) => {
                        // Later events are refused once the caller is acknowledged
                        self.inbox.close();
                        self.teardown().await;
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.handle(command).await,
                    None => {
                        self.teardown().await;
                        break;
                    }
                },

                Some(result) = self.sends.recv() => self.on_send_finished(result),
            }
        }

        info!("Conversation controller stopped");
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::TalkPressed => self.on_talk_pressed(),
            Command::TalkReleased => self.on_talk_released().await,
            Command::ToggleVoiceInput => {
                if self.state == TurnState::Recording {
                    self.stop_voice_input().await;
                } else {
                    self.start_voice_input().await;
                }
            }
            Command::StartVoiceInput => self.start_voice_input().await,
            Command::StopVoiceInput => self.stop_voice_input().await,
            Command::Inbound(message) => self.on_inbound(message).await,
            Command::SendText(text) => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    debug!("Ignoring blank chat message");
                } else {
                    self.submit(text);
                }
            }
            Command::ToggleSubtitles => self.toggle_subtitles(),
            Command::ConnectionLost(reason) => self.on_connection_lost(reason).await,
            Command::Barrier(ack) => {
                let _ = ack.send(());
            }
            // Handled by the run loop
            Command::Shutdown(ack) => {
                let _ = ack.send(());
            }
        }
    }

    fn set_state(&mut self, next: TurnState) {
        if self.state != next {
            debug!("Turn state {:?} -> {:?}", self.state, next);
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }

    fn on_talk_pressed(&mut self) {
        // Repeats while held keep the first press as the start of the gesture
        if self.halted || self.state == TurnState::Recording || self.press.is_pending() {
            return;
        }
        self.press.schedule(self.config.push_to_talk_min_hold());
    }

    async fn on_talk_released(&mut self) {
        if self.press.cancel() {
            debug!(
                "Push-to-talk released within {}ms, ignored",
                self.config.push_to_talk_min_hold_ms
            );
            return;
        }
        self.stop_voice_input().await;
    }

    async fn on_press_held(&mut self) {
        if self.press.fire(Instant::now()) {
            self.start_voice_input().await;
        }
    }

    async fn start_voice_input(&mut self) {
        if self.halted {
            warn!("Voice input unavailable, connection lost");
            return;
        }
        if matches!(
            self.state,
            TurnState::Recording | TurnState::AwaitingFinalTranscript
        ) {
            return;
        }

        match self.voice.start(self.transcripts_tx.clone()).await {
            Ok(()) => {
                info!("Recording started");
                self.set_state(TurnState::Recording);
                let prompt = self.config.recording_prompt.clone();
                self.show_subtitle(&prompt);
            }
            Err(e) => {
                warn!("Failed to start voice input: {}", e);
                self.presenter
                    .on_fatal_error(&SessionError::from(e).user_message());
                self.set_state(TurnState::Idle);
            }
        }
    }

    /// Release capture. The engine's final result, if one arrives, is sent.
    async fn stop_voice_input(&mut self) {
        if self.state != TurnState::Recording {
            return;
        }

        self.set_state(TurnState::AwaitingFinalTranscript);
        let mut final_text = self.voice.stop().await;

        // Results flushed while stopping
        while let Ok(event) = self.transcripts.try_recv() {
            match event {
                TranscriptEvent::Final(text) => {
                    final_text.get_or_insert(text);
                }
                TranscriptEvent::Error(reason) => self.on_recognizer_error(&reason),
                TranscriptEvent::Interim(_) | TranscriptEvent::Ended => {}
            }
        }

        match final_text.filter(|text| !text.trim().is_empty()) {
            Some(text) => self.submit(text.trim().to_string()),
            None => {
                info!("Recording stopped without a final transcript, nothing sent");
                self.hide_subtitle();
                self.set_state(TurnState::Idle);
            }
        }
    }

    async fn on_transcript(&mut self, event: TranscriptEvent) {
        match event {
            TranscriptEvent::Interim(text) => {
                if self.state == TurnState::Recording {
                    self.show_subtitle(&text);
                }
            }
            TranscriptEvent::Final(text) => {
                if self.state != TurnState::Recording {
                    debug!("Dropping final transcript outside recording");
                    return;
                }
                self.set_state(TurnState::AwaitingFinalTranscript);
                self.voice.stop().await;
                let text = text.trim().to_string();
                if text.is_empty() {
                    self.hide_subtitle();
                    self.set_state(TurnState::Idle);
                } else {
                    self.submit(text);
                }
            }
            TranscriptEvent::Error(reason) => self.on_recognizer_error(&reason),
            TranscriptEvent::Ended => {
                debug!("Speech recognizer ended");
                self.stop_voice_input().await;
            }
        }
    }

    fn on_recognizer_error(&self, reason: &str) {
        if reason == NO_SPEECH {
            info!("Speech recognizer heard nothing");
        } else {
            warn!("Speech recognition error: {}", reason);
            self.presenter
                .on_fatal_error(&format!("Speech recognition failed: {}", reason));
        }
    }

    /// Show `text` as a user turn and post it to the remote endpoint
    fn submit(&mut self, text: String) {
        if self.halted {
            warn!("Not sending message, connection lost");
            self.set_state(TurnState::Idle);
            return;
        }

        self.presenter.on_chat_turn(&ConversationTurn::user(&text));
        self.show_subtitle(&text);

        // Typed text does not interrupt an ongoing recording
        if self.state != TurnState::Recording {
            self.set_state(TurnState::Sending);
        }

        let outbound = self.outbound.clone();
        let sends_tx = self.sends_tx.clone();
        let session_id = self.session_id;
        tokio::spawn(async move {
            info!("Sending user message ({} chars)", text.chars().count());
            let result = outbound
                .send_chat(session_id, &text)
                .await
                .map_err(|e| e.to_string());
            let _ = sends_tx.send(result);
        });
    }

    fn on_send_finished(&mut self, result: Result<(), String>) {
        match result {
            Ok(()) => {
                if self.state == TurnState::Sending {
                    self.set_state(TurnState::Listening);
                }
            }
            Err(e) => {
                warn!("Failed to send message: {}", e);
                self.presenter.on_fatal_error("Send failed, please try again");
                if self.state == TurnState::Sending {
                    self.set_state(TurnState::Idle);
                }
            }
        }
    }

    async fn on_inbound(&mut self, message: ChannelMessage) {
        debug!("Handling '{}' message", message.tag());

        match message {
            ChannelMessage::Asr { text } => {
                self.presenter.on_chat_turn(&ConversationTurn::user(&text));
                self.show_subtitle(&text);
                if self.state == TurnState::Idle {
                    self.set_state(TurnState::Listening);
                }
            }
            ChannelMessage::Llm { text } => {
                // More text may follow
                self.subtitles.cancel_hide();
                self.show_subtitle(&text);
                self.presenter
                    .on_chat_turn(&ConversationTurn::assistant(&text));
                if self.state == TurnState::Sending {
                    self.set_state(TurnState::Listening);
                }
            }
            ChannelMessage::TtsStart => {
                self.speaking = true;
                self.subtitles.cancel_hide();
                if self.state == TurnState::Sending {
                    self.set_state(TurnState::Listening);
                }
            }
            ChannelMessage::TtsEnd => {
                self.speaking = false;
                self.schedule_hide();
                if self.state == TurnState::Listening {
                    self.set_state(TurnState::Idle);
                }
            }
            ChannelMessage::Error { message } => {
                warn!("Remote error: {}", message);
                let shown = if message.is_empty() {
                    "Unknown error".to_string()
                } else {
                    message
                };
                self.presenter.on_fatal_error(&format!("Error: {}", shown));
                self.abandon_turn().await;
            }
            ChannelMessage::Unknown => debug!("Ignoring message with unknown tag"),
        }
    }

    async fn on_connection_lost(&mut self, reason: String) {
        warn!("Connection lost: {}", reason);
        self.halted = true;
        self.speaking = false;
        self.abandon_turn().await;
    }

    /// Back to `Idle` without sending anything
    async fn abandon_turn(&mut self) {
        self.press.cancel();
        if self.voice.is_recording() {
            self.voice.stop().await;
        }
        while self.transcripts.try_recv().is_ok() {}
        self.set_state(TurnState::Idle);
    }

    fn schedule_hide(&mut self) {
        if self.speaking {
            return;
        }
        if self.subtitles.schedule_hide(self.config.subtitle_hide_delay()) {
            debug!("Replaced pending subtitle hide");
        }
    }

    fn on_hide_deadline(&mut self) {
        if self.subtitles.expire(Instant::now()) {
            self.presenter
                .on_subtitle_change(self.subtitles.text(), false);
        }
    }

    fn show_subtitle(&mut self, text: &str) {
        if self.subtitles.show(text) {
            self.presenter.on_subtitle_change(text, true);
        }
    }

    fn hide_subtitle(&mut self) {
        if self.subtitles.hide() {
            self.presenter
                .on_subtitle_change(self.subtitles.text(), false);
        }
    }

    fn toggle_subtitles(&mut self) {
        let enabled = !self.subtitles.is_enabled();
        info!("Subtitles {}", if enabled { "enabled" } else { "disabled" });
        if self.subtitles.set_enabled(enabled) {
            self.presenter
                .on_subtitle_change(self.subtitles.text(), false);
        }
    }

    async fn teardown(&mut self) {
        self.press.cancel();
        self.subtitles.cancel_hide();
        if self.voice.is_recording() {
            self.voice.stop().await;
            info!("Recording stopped on shutdown");
        }
        self.set_state(TurnState::Idle);
    }
}
