//! Avatar profile selection
//!
//! The selector is a single avatar/session-profile id. It is read once at
//! startup and falls back to a default profile when absent.

use anyhow::{Context, Result};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::signaling::AvatarRecord;

pub const DEFAULT_AVATAR_ID: &str = "ai_model";
pub const DEFAULT_AVATAR_NAME: &str = "AI Avatar";

/// The `(name, image)` pair exposed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarProfile {
    pub id: String,
    pub name: String,
    /// Image path or URL; empty when unknown
    pub image: String,
}

impl AvatarProfile {
    /// Profile used until (or unless) metadata for the selector is found
    pub fn fallback(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: DEFAULT_AVATAR_NAME.to_string(),
            image: String::new(),
        }
    }

    /// Pick the record matching `id` out of the avatar list
    pub fn select(records: &[AvatarRecord], id: &str) -> Option<Self> {
        records.iter().find(|r| r.id == id).map(|r| Self {
            id: r.id.clone(),
            name: r.name.clone(),
            image: r.image.clone(),
        })
    }
}

/// Read the `avatar` query parameter from a page URL
pub fn selector_from_page_url(page_url: &str) -> Result<Option<String>> {
    let url = Url::parse(page_url).with_context(|| format!("Invalid page URL: {}", page_url))?;

    Ok(url
        .query_pairs()
        .find(|(key, _)| key == "avatar")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty()))
}

/// Resolve the selector: explicit id, then page query parameter, then configured default
pub fn resolve_selector(
    explicit: Option<&str>,
    page_url: Option<&str>,
    configured: &str,
) -> Result<String> {
    if let Some(id) = explicit.filter(|id| !id.is_empty()) {
        return Ok(id.to_string());
    }

    if let Some(url) = page_url {
        if let Some(id) = selector_from_page_url(url)? {
            return Ok(id);
        }
    }

    if configured.is_empty() {
        Ok(DEFAULT_AVATAR_ID.to_string())
    } else {
        Ok(configured.to_string())
    }
}
