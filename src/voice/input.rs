use tracing::{error, info, warn};

use super::capture::{AudioCapture, SpeechRecognizer, TranscriptSink};
use super::recording::{RecordingSession, RecordingSummary};
use crate::error::CaptureError;

/// Microphone capture plus streaming recognition, owned by the conversation controller
pub struct VoiceInput {
    capture: Box<dyn AudioCapture>,

    /// `None` when no speech engine is available; capture still works
    recognizer: Option<Box<dyn SpeechRecognizer>>,

    recording: Option<RecordingSession>,
}

impl VoiceInput {
    pub fn new(
        capture: Box<dyn AudioCapture>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
    ) -> Self {
        match &recognizer {
            Some(r) => info!("Voice input: {} + {}", capture.name(), r.name()),
            None => warn!("Voice input: {} without speech recognition", capture.name()),
        }

        Self {
            capture,
            recognizer,
            recording: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Acquire the microphone and start recognition.
    ///
    /// Only a capture failure is an error; a recognizer that fails to start
    /// is logged and recording continues without transcripts.
    pub async fn start(&mut self, transcripts: TranscriptSink) -> Result<(), CaptureError> {
        if self.recording.is_some() {
            return Ok(());
        }

        let fragments_rx = self.capture.start().await?;
        self.recording = Some(RecordingSession::begin(fragments_rx));

        if let Some(recognizer) = self.recognizer.as_mut() {
            if let Err(e) = recognizer.start(transcripts).await {
                error!("Failed to start speech recognition: {}", e);
            }
        }

        info!("Voice input started");
        Ok(())
    }

    /// Release capture resources and stop recognition.
    ///
    /// Returns the final transcript the engine delivered while stopping.
    pub async fn stop(&mut self) -> Option<String> {
        let recording = self.recording.take()?;

        if let Err(e) = self.capture.stop().await {
            error!("Failed to stop capture: {}", e);
        }

        let summary: RecordingSummary = recording.finish().await;
        info!(
            "Voice input stopped after {} fragments",
            summary.fragments
        );

        match self.recognizer.as_mut() {
            Some(recognizer) => match recognizer.stop().await {
                Ok(final_text) => final_text,
                Err(e) => {
                    error!("Failed to stop speech recognition: {}", e);
                    None
                }
            },
            None => None,
        }
    }
}
