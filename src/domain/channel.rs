use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// External platform a channel lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Twitch,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Twitch];

    /// The counter each platform's daily leaderboard ranks by.
    pub fn ranking_metric(&self) -> &'static str {
        match self {
            Platform::Youtube => "subscribers",
            Platform::Twitch => "followers",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Twitch => "twitch",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "youtube" => Ok(Platform::Youtube),
            "twitch" => Ok(Platform::Twitch),
            other => Err(format!("unknown platform: {}", other)),
        }
    }
}

/// Canonical record for one content-creator account.
///
/// (platform, platform_id) is unique; handle is not, duplicate handles are
/// cleaned up by a separate maintenance pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub platform: Platform,
    pub platform_id: String,
    pub handle: String,
    pub title: String,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Display-only counters, never persisted with the channel row.
    #[serde(skip)]
    pub counters: HashMap<String, i64>,
}

impl Channel {
    pub fn new(platform: Platform, platform_id: String, handle: String, title: String) -> Self {
        Self {
            id: 0,
            platform,
            platform_id,
            handle,
            title,
            avatar_url: None,
            country: None,
            created_at: Utc::now(),
            counters: HashMap::new(),
        }
    }
}

/// What a connector knows about a channel before it is persisted.
#[derive(Debug, Clone)]
pub struct ChannelIdentity {
    pub platform: Platform,
    pub platform_id: String,
    pub title: Option<String>,
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
}

impl ChannelIdentity {
    pub fn new(platform: Platform, platform_id: impl Into<String>) -> Self {
        Self {
            platform,
            platform_id: platform_id.into(),
            title: None,
            handle: None,
            avatar_url: None,
            country: None,
        }
    }
}

/// Partial channel update; only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct ChannelPatch {
    pub title: Option<String>,
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
    pub country: Option<String>,
}

impl ChannelPatch {
    /// Build a patch from an identity, skipping absent and empty fields.
    pub fn from_identity(identity: &ChannelIdentity) -> Self {
        let non_empty = |v: &Option<String>| v.as_deref().filter(|s| !s.is_empty()).map(String::from);
        Self {
            title: non_empty(&identity.title),
            handle: non_empty(&identity.handle),
            avatar_url: non_empty(&identity.avatar_url),
            country: non_empty(&identity.country),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.handle.is_none()
            && self.avatar_url.is_none()
            && self.country.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_parse_roundtrip() {
        assert_eq!("youtube".parse::<Platform>().unwrap(), Platform::Youtube);
        assert_eq!("Twitch".parse::<Platform>().unwrap(), Platform::Twitch);
        assert!("myspace".parse::<Platform>().is_err());
        assert_eq!(Platform::Youtube.to_string(), "youtube");
    }

    #[test]
    fn test_ranking_metric_table() {
        assert_eq!(Platform::Youtube.ranking_metric(), "subscribers");
        assert_eq!(Platform::Twitch.ranking_metric(), "followers");
    }

    #[test]
    fn test_patch_skips_empty_fields() {
        let mut identity = ChannelIdentity::new(Platform::Youtube, "UC123");
        identity.title = Some("MKBHD".into());
        identity.handle = Some(String::new());

        let patch = ChannelPatch::from_identity(&identity);
        assert_eq!(patch.title, Some("MKBHD".into()));
        assert_eq!(patch.handle, None);
        assert_eq!(patch.avatar_url, None);
    }

    #[test]
    fn test_empty_patch() {
        let patch = ChannelPatch::from_identity(&ChannelIdentity::new(Platform::Youtube, "UC123"));
        assert!(patch.is_empty());
    }
}
