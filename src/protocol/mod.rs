//! Data-channel message protocol
//!
//! One JSON object per frame, tagged by `type`:
//! - `asr` / `llm` carry `text`
//! - `tts_start` / `tts_end` carry nothing
//! - `error` carries `message`

mod channel;
mod messages;

pub use channel::{DataChannelProtocol, DispatchStats};
pub use messages::ChannelMessage;
