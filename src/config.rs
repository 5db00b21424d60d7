use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::avatar::DEFAULT_AVATAR_ID;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub server: ServerConfig,
    pub avatar: AvatarConfig,
    pub negotiation: NegotiationConfig,
    pub conversation: ConversationConfig,
    pub voice: VoiceConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "avatar-talk".to_string(),
        }
    }
}

/// Remote media-generation service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Offer exchanges slower than this are logged as a warning
    pub slow_offer_warn_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8010".to_string(),
            request_timeout_secs: 30,
            slow_offer_warn_ms: 3000,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn slow_offer_warn(&self) -> Duration {
        Duration::from_millis(self.slow_offer_warn_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub id: String,
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            id: DEFAULT_AVATAR_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// STUN/TURN URLs; empty means host candidates only
    pub ice_servers: Vec<String>,
    pub ice_gathering_timeout_secs: u64,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            ice_gathering_timeout_secs: 10,
        }
    }
}

impl NegotiationConfig {
    pub fn ice_gathering_timeout(&self) -> Duration {
        Duration::from_secs(self.ice_gathering_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// Delay between the end of speech output and hiding the subtitle
    pub subtitle_hide_delay_ms: u64,
    /// Push-to-talk presses shorter than this never start capture
    pub push_to_talk_min_hold_ms: u64,
    pub subtitles_enabled: bool,
    pub recording_prompt: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            subtitle_hide_delay_ms: 3000,
            push_to_talk_min_hold_ms: 200,
            subtitles_enabled: true,
            recording_prompt: "Recording, release to send...".to_string(),
        }
    }
}

impl ConversationConfig {
    pub fn subtitle_hide_delay(&self) -> Duration {
        Duration::from_millis(self.subtitle_hide_delay_ms)
    }

    pub fn push_to_talk_min_hold(&self) -> Duration {
        Duration::from_millis(self.push_to_talk_min_hold_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub microphone_enabled: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            microphone_enabled: true,
        }
    }
}

/// Local control API
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8090,
        }
    }
}

impl Config {
    /// Load from an optional config file, then `AVATAR_TALK__SECTION__KEY` env overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("AVATAR_TALK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
