//! Capture and recognition fed from outside the process
//!
//! The host (gesture source, browser, STT sidecar) pushes microphone
//! fragments and transcript results through the control API. While voice
//! input is inactive pushed data is dropped.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::capture::{AudioCapture, AudioFragment, SpeechRecognizer, TranscriptEvent, TranscriptSink};
use crate::error::CaptureError;

const FRAGMENT_BUFFER: usize = 256;

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Producer side of `ChannelCapture`
#[derive(Clone, Default)]
pub struct CaptureFeed {
    slot: Arc<Mutex<Option<mpsc::Sender<AudioFragment>>>>,
    sequence: Arc<AtomicU64>,
}

impl CaptureFeed {
    /// Push one fragment. Returns false when nothing is capturing or the buffer is full.
    pub fn push(&self, data: Vec<u8>) -> bool {
        let slot = lock(&self.slot);
        let Some(tx) = slot.as_ref() else {
            debug!("Dropping audio fragment, capture inactive");
            return false;
        };

        let fragment = AudioFragment {
            data,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        };
        tx.try_send(fragment).is_ok()
    }
}

/// Microphone whose audio is pushed in through a `CaptureFeed`
pub struct ChannelCapture {
    feed: CaptureFeed,
    permission_granted: bool,
}

impl ChannelCapture {
    pub fn new(feed: CaptureFeed, permission_granted: bool) -> Self {
        Self {
            feed,
            permission_granted,
        }
    }
}

#[async_trait]
impl AudioCapture for ChannelCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFragment>, CaptureError> {
        if !self.permission_granted {
            return Err(CaptureError::PermissionDenied);
        }

        let (tx, rx) = mpsc::channel(FRAGMENT_BUFFER);
        *lock(&self.feed.slot) = Some(tx);
        self.feed.sequence.store(0, Ordering::SeqCst);

        info!("External capture started");
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        // Dropping the sender ends the fragment stream
        lock(&self.feed.slot).take();
        Ok(())
    }

    fn name(&self) -> &str {
        "external-capture"
    }
}

/// Producer side of `ChannelRecognizer`
#[derive(Clone, Default)]
pub struct RecognizerFeed {
    slot: Arc<Mutex<Option<TranscriptSink>>>,
}

impl RecognizerFeed {
    /// Forward one engine result. Returns false when recognition is inactive.
    pub fn push(&self, event: TranscriptEvent) -> bool {
        match lock(&self.slot).as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => {
                debug!("Dropping transcript event, recognition inactive");
                false
            }
        }
    }
}

/// Speech engine whose results are pushed in through a `RecognizerFeed`
pub struct ChannelRecognizer {
    feed: RecognizerFeed,
}

impl ChannelRecognizer {
    pub fn new(feed: RecognizerFeed) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl SpeechRecognizer for ChannelRecognizer {
    async fn start(&mut self, sink: TranscriptSink) -> Result<(), CaptureError> {
        *lock(&self.feed.slot) = Some(sink);
        Ok(())
    }

    async fn stop(&mut self) -> Result<Option<String>, CaptureError> {
        lock(&self.feed.slot).take();
        Ok(None)
    }

    fn name(&self) -> &str {
        "external-recognizer"
    }
}
