use std::time::Duration;
use tokio::time::Instant;

/// Single-slot deadline.
///
/// At most one deadline is pending; scheduling always replaces the previous one.
#[derive(Debug, Default)]
pub struct Deadline {
    at: Option<Instant>,
    scheduled: u64,
    cancelled: u64,
}

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `after` from now. Returns true if a pending deadline was replaced.
    pub fn schedule(&mut self, after: Duration) -> bool {
        let replaced = self.cancel();
        self.at = Some(Instant::now() + after);
        self.scheduled += 1;
        replaced
    }

    /// Returns true if a pending deadline was cancelled
    pub fn cancel(&mut self) -> bool {
        match self.at.take() {
            Some(_) => {
                self.cancelled += 1;
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.at.is_some()
    }

    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    /// Consume the deadline if it is due at `now`
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if at <= now => {
                self.at = None;
                true
            }
            _ => false,
        }
    }

    pub fn scheduled_count(&self) -> u64 {
        self.scheduled
    }

    pub fn cancelled_count(&self) -> u64 {
        self.cancelled
    }
}

/// Sleep until `at`, or forever when there is nothing scheduled
pub async fn sleep_until(at: Option<Instant>) {
    match at {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}
