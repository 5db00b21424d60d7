//! Voice input boundary
//!
//! Local microphone capture and a streaming speech-to-text engine, combined
//! into `VoiceInput`. The controller only sees start/stop and transcript events.

pub mod capture;
pub mod external;
mod input;
mod recording;

pub use capture::{AudioCapture, AudioFragment, SpeechRecognizer, TranscriptEvent, TranscriptSink};
pub use external::{CaptureFeed, ChannelCapture, ChannelRecognizer, RecognizerFeed};
pub use input::VoiceInput;
pub use recording::{RecordingSession, RecordingSummary};
