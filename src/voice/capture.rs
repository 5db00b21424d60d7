use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CaptureError;

/// One chunk of raw captured audio
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFragment {
    /// Encoded or PCM bytes as produced by the capture device
    pub data: Vec<u8>,
    /// Position in the capture stream (0-based)
    pub sequence: u64,
}

/// Result stream of a streaming speech-to-text engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Provisional text, may still change
    Interim(String),
    /// Finalized utterance
    Final(String),
    /// Engine error, e.g. `no-speech` or `network`
    Error(String),
    /// Engine stopped on its own
    Ended,
}

/// Where a recognizer delivers its results
pub type TranscriptSink = mpsc::UnboundedSender<TranscriptEvent>;

/// Microphone capture trait
///
/// `start` is where permission is requested; a denied permission fails with
/// `CaptureError::PermissionDenied` and nothing is captured.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Start capturing. Fragments arrive on the returned receiver until `stop`.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFragment>, CaptureError>;

    /// Stop capturing and release the device
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Streaming speech-to-text engine
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Begin recognition, delivering interim and final results to `sink`
    async fn start(&mut self, sink: TranscriptSink) -> Result<(), CaptureError>;

    /// Stop recognition. Returns the final result the engine produced while
    /// stopping, if any.
    async fn stop(&mut self) -> Result<Option<String>, CaptureError>;

    fn name(&self) -> &str;
}
