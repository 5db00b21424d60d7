use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::messages::ChannelMessage;
use crate::error::ProtocolError;
use crate::peer::{ChannelEvent, ChannelState, DataChannel};

/// Counters reported when the inbound stream ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: usize,
    pub malformed: usize,
}

/// Application protocol over the auxiliary data channel
pub struct DataChannelProtocol {
    channel: Arc<dyn DataChannel>,
    closed: AtomicBool,
}

impl DataChannelProtocol {
    pub fn new(channel: Arc<dyn DataChannel>) -> Self {
        Self {
            channel,
            closed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ChannelState {
        if self.closed.load(Ordering::SeqCst) {
            ChannelState::Closed
        } else {
            self.channel.state()
        }
    }

    /// Serialize and transmit `message`.
    ///
    /// Returns `Ok(false)` when the channel is not open: the message is
    /// dropped, never queued.
    pub async fn send(&self, message: &ChannelMessage) -> Result<bool, ProtocolError> {
        let state = self.state();
        if state != ChannelState::Open {
            warn!(
                "Dropping outbound '{}' message, channel is {:?}",
                message.tag(),
                state
            );
            return Ok(false);
        }

        let frame = message.encode()?;
        self.channel
            .send_text(frame)
            .await
            .map_err(|e| ProtocolError::Send(e.to_string()))?;

        debug!("Sent '{}' message", message.tag());
        Ok(true)
    }

    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        info!("Closing data channel '{}'", self.channel.label());
        self.channel.close().await
    }

    /// Decode every inbound frame and hand it to `on_message`, one at a time.
    ///
    /// Malformed frames are logged and dropped. Returns when the channel closes
    /// or the event stream ends.
    pub async fn dispatch<F>(
        &self,
        mut events: mpsc::UnboundedReceiver<ChannelEvent>,
        mut on_message: F,
    ) -> DispatchStats
    where
        F: FnMut(ChannelMessage) + Send,
    {
        let mut stats = DispatchStats::default();

        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::Open => info!("Data channel opened"),
                ChannelEvent::Message(frame) => match ChannelMessage::decode(&frame) {
                    Ok(message) => {
                        debug!("Received data channel message: {}", message.tag());
                        on_message(message);
                        stats.delivered += 1;
                    }
                    Err(e) => {
                        warn!("Failed to process message: {} (frame: {})", e, frame);
                        stats.malformed += 1;
                    }
                },
                ChannelEvent::Close => {
                    info!("Data channel closed");
                    self.closed.store(true, Ordering::SeqCst);
                    break;
                }
            }
        }

        info!(
            "Inbound dispatch stopped ({} delivered, {} malformed)",
            stats.delivered, stats.malformed
        );
        stats
    }
}
