use std::time::Duration;
use tokio::time::Instant;

use super::timer::Deadline;

/// On-screen caption: text, visibility and the pending hide deadline.
///
/// Visible only while no hide deadline has passed.
#[derive(Debug)]
pub struct SubtitleState {
    text: String,
    visible: bool,
    enabled: bool,
    hide: Deadline,
}

impl SubtitleState {
    pub fn new(enabled: bool) -> Self {
        Self {
            text: String::new(),
            visible: false,
            enabled,
            hide: Deadline::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replace the text. Returns true if the subtitle is now on screen.
    pub fn show(&mut self, text: &str) -> bool {
        self.text = text.to_string();
        if self.enabled {
            self.visible = true;
        }
        self.visible
    }

    /// Hide now and drop any pending deadline. Returns true if it was visible.
    pub fn hide(&mut self) -> bool {
        self.hide.cancel();
        std::mem::replace(&mut self.visible, false)
    }

    pub fn schedule_hide(&mut self, after: Duration) -> bool {
        self.hide.schedule(after)
    }

    pub fn cancel_hide(&mut self) -> bool {
        self.hide.cancel()
    }

    pub fn hide_deadline(&self) -> Option<Instant> {
        self.hide.at()
    }

    /// Apply a due hide deadline. Returns true if this hid the subtitle.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.hide.fire(now) {
            std::mem::replace(&mut self.visible, false)
        } else {
            false
        }
    }

    /// Turn subtitles on or off. Disabling hides the current subtitle.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        self.enabled = enabled;
        if enabled {
            false
        } else {
            self.hide()
        }
    }
}
