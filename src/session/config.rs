use std::time::Duration;

use crate::avatar::DEFAULT_AVATAR_ID;
use crate::config::{Config, ConversationConfig};

/// Configuration for one session lifecycle
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Avatar/session-profile selector sent with the offer
    pub avatar_id: String,

    /// Upper bound on ICE gathering before negotiation is abandoned
    pub ice_gathering_timeout: Duration,

    /// Turn-taking and subtitle settings handed to the conversation controller
    pub conversation: ConversationConfig,
}

impl SessionConfig {
    pub fn from_config(config: &Config, avatar_id: String) -> Self {
        Self {
            avatar_id,
            ice_gathering_timeout: config.negotiation.ice_gathering_timeout(),
            conversation: config.conversation.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            avatar_id: DEFAULT_AVATAR_ID.to_string(),
            ice_gathering_timeout: Duration::from_secs(10),
            conversation: ConversationConfig::default(),
        }
    }
}
