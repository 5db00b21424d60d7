use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info};

use super::capture::AudioFragment;

const FLUSH_TIMEOUT: Duration = Duration::from_millis(250);

/// What a finished recording amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordingSummary {
    pub fragments: usize,
    pub bytes: usize,
    pub duration: Duration,
}

/// One `start -> (fragments)* -> stop` capture.
///
/// Fragments are appended in arrival order while active and released when the
/// recording finishes.
pub struct RecordingSession {
    started_at: Instant,

    /// Accumulated fragments (append-only)
    fragments: Arc<Mutex<Vec<AudioFragment>>>,

    /// Handle for the fragment collecting task
    collect_task: Option<JoinHandle<()>>,
}

impl RecordingSession {
    /// Start collecting fragments from a capture stream
    pub fn begin(mut fragments_rx: mpsc::Receiver<AudioFragment>) -> Self {
        let fragments = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fragments);
        let collect_task = tokio::spawn(async move {
            debug!("Fragment collecting task started");

            while let Some(fragment) = fragments_rx.recv().await {
                let mut fragments = sink.lock().await;
                fragments.push(fragment);
            }

            debug!("Fragment collecting task stopped");
        });

        Self {
            started_at: Instant::now(),
            fragments,
            collect_task: Some(collect_task),
        }
    }

    /// Stop collecting and release the fragments.
    ///
    /// Call after the capture was stopped so the stream drains; a stream
    /// still open after `FLUSH_TIMEOUT` is cut off.
    pub async fn finish(mut self) -> RecordingSummary {
        if let Some(mut task) = self.collect_task.take() {
            if timeout(FLUSH_TIMEOUT, &mut task).await.is_err() {
                debug!("Capture stream still open, aborting fragment collection");
                task.abort();
            }
        }

        let mut fragments = self.fragments.lock().await;
        let summary = RecordingSummary {
            fragments: fragments.len(),
            bytes: fragments.iter().map(|f| f.data.len()).sum(),
            duration: self.started_at.elapsed(),
        };
        fragments.clear();
        fragments.shrink_to_fit();

        info!(
            "Recording finished: {} fragments, {} bytes, {:.1}s",
            summary.fragments,
            summary.bytes,
            summary.duration.as_secs_f64()
        );

        summary
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(task) = self.collect_task.take() {
            task.abort();
        }
    }
}
