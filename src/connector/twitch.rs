//! Twitch Helix API connector.
//!
//! Uses the app-access-token flow; the token is cached and refreshed
//! shortly before expiry.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::app::{RankError, Result};
use crate::connector::{Connector, ConnectorDiagnostics};
use crate::domain::{handle, ChannelIdentity, Platform};

const API_BASE: &str = "https://api.twitch.tv/helix";
const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const MAX_SEARCH_RESULTS: usize = 25;

#[derive(Debug, Clone)]
struct Credentials {
    client_id: String,
    client_secret: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct TwitchConnector {
    client: Client,
    credentials: Option<Credentials>,
    token: Mutex<Option<CachedToken>>,
}

impl TwitchConnector {
    pub fn new(client_id: Option<String>, client_secret: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .user_agent(concat!("channelrank/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        let credentials = match (client_id, client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Credentials {
                    client_id: id,
                    client_secret: secret,
                })
            }
            _ => None,
        };

        Self {
            client,
            credentials,
            token: Mutex::new(None),
        }
    }

    async fn bearer_token(&self, credentials: &Credentials) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            // Refresh one minute early to avoid mid-call expiry.
            if token.expires_at > Utc::now() + chrono::Duration::seconds(60) {
                return Ok(token.access_token.clone());
            }
        }

        let response: TokenResponse = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()
            .map_err(|e| match e.status() {
                // A rejected credential will never start working on retry.
                Some(status) if status.is_client_error() => {
                    RankError::Permanent(format!("Twitch token request rejected: {}", status))
                }
                _ => RankError::Http(e),
            })?
            .json()
            .await?;

        let token = CachedToken {
            access_token: response.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(response.expires_in),
        };
        *cached = Some(token);
        Ok(response.access_token)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        credentials: &Credentials,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let token = self.bearer_token(credentials).await?;
        let response = self
            .client
            .get(format!("{}/{}", API_BASE, path))
            .query(query)
            .header("Client-Id", &credentials.client_id)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response)
    }

    async fn fetch_by_login(
        &self,
        credentials: &Credentials,
        login: &str,
    ) -> Result<Option<ChannelIdentity>> {
        let response: DataResponse<User> = self
            .get_json(credentials, "users", &[("login", login)])
            .await?;
        Ok(response.data.into_iter().next().map(map_user))
    }
}

#[async_trait]
impl Connector for TwitchConnector {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    async fn resolve_and_hydrate(&self, handle_or_url: &str) -> Result<Option<ChannelIdentity>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };
        let input = handle_or_url.trim();
        if input.is_empty() {
            return Ok(None);
        }

        // Handle token: the login is the handle without '@'.
        if let Some(login) = input.strip_prefix('@') {
            return self.fetch_by_login(credentials, &login.to_ascii_lowercase()).await;
        }

        // URL: twitch.tv/<login>, falling through to search on a miss.
        if input.starts_with("http") {
            if let Some(login) = extract_login(input) {
                if let Some(identity) = self.fetch_by_login(credentials, &login).await? {
                    return Ok(Some(identity));
                }
                return Ok(self.search(&login, 1).await?.into_iter().next());
            }
        }

        // Free text: first search result.
        Ok(self.search(input, 1).await?.into_iter().next())
    }

    async fn fetch_counters(&self, platform_id: &str) -> Result<HashMap<String, i64>> {
        let Some(credentials) = &self.credentials else {
            return Ok(HashMap::new());
        };
        if platform_id.is_empty() {
            return Ok(HashMap::new());
        }

        let followers: FollowerResponse = self
            .get_json(
                credentials,
                "channels/followers",
                &[("broadcaster_id", platform_id), ("first", "1")],
            )
            .await?;

        let streams: DataResponse<Stream> = self
            .get_json(credentials, "streams", &[("user_id", platform_id)])
            .await?;
        let live_views = streams
            .data
            .first()
            .map(|s| s.viewer_count)
            .unwrap_or(0);

        let mut counters = HashMap::new();
        counters.insert("followers".to_string(), followers.total);
        counters.insert("live_views".to_string(), live_views);
        Ok(counters)
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ChannelIdentity>> {
        let Some(credentials) = &self.credentials else {
            return Ok(Vec::new());
        };
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let capped = max_results.clamp(1, MAX_SEARCH_RESULTS);

        let response: DataResponse<SearchChannel> = self
            .get_json(
                credentials,
                "search/channels",
                &[("query", query), ("first", &capped.to_string())],
            )
            .await?;

        Ok(response
            .data
            .into_iter()
            .filter(|c| !c.display_name.trim().is_empty())
            .map(map_search_channel)
            .collect())
    }

    fn diagnostics(&self) -> ConnectorDiagnostics {
        ConnectorDiagnostics {
            platform: Platform::Twitch,
            configured: self.credentials.is_some(),
            endpoint: API_BASE,
        }
    }
}

// ---- Wire types ----

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Deserialize)]
struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    login: String,
    display_name: String,
    #[serde(default)]
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchChannel {
    id: String,
    broadcaster_login: String,
    display_name: String,
    #[serde(default)]
    thumbnail_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FollowerResponse {
    #[serde(default)]
    total: i64,
}

#[derive(Debug, Deserialize)]
struct Stream {
    viewer_count: i64,
}

// ---- Mapping ----

fn map_user(user: User) -> ChannelIdentity {
    let mut identity = ChannelIdentity::new(Platform::Twitch, user.id);
    identity.handle = handle::normalize(&user.login).or_else(|| Some(handle::placeholder()));
    identity.title = Some(user.display_name).filter(|t| !t.trim().is_empty());
    identity.avatar_url = user.profile_image_url.filter(|u| !u.is_empty());
    identity
}

fn map_search_channel(channel: SearchChannel) -> ChannelIdentity {
    let mut identity = ChannelIdentity::new(Platform::Twitch, channel.id);
    identity.handle =
        handle::normalize(&channel.broadcaster_login).or_else(|| Some(handle::placeholder()));
    identity.title = Some(channel.display_name);
    identity.avatar_url = channel.thumbnail_url.filter(|u| !u.is_empty());
    identity
}

fn extract_login(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    if !url
        .host_str()
        .map(|h| h.ends_with("twitch.tv"))
        .unwrap_or(false)
    {
        return None;
    }
    url.path_segments()?
        .find(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_payload() {
        let body = r#"{
            "data": [{
                "id": "141981764",
                "login": "twitchdev",
                "display_name": "TwitchDev",
                "profile_image_url": "https://static.example/dev.png"
            }]
        }"#;
        let parsed: DataResponse<User> = serde_json::from_str(body).unwrap();
        let identity = map_user(parsed.data.into_iter().next().unwrap());

        assert_eq!(identity.platform_id, "141981764");
        assert_eq!(identity.handle.as_deref(), Some("@twitchdev"));
        assert_eq!(identity.title.as_deref(), Some("TwitchDev"));
        assert_eq!(
            identity.avatar_url.as_deref(),
            Some("https://static.example/dev.png")
        );
    }

    #[test]
    fn test_parse_follower_total() {
        let parsed: FollowerResponse =
            serde_json::from_str(r#"{"total": 8642, "data": []}"#).unwrap();
        assert_eq!(parsed.total, 8642);
    }

    #[test]
    fn test_parse_search_payload() {
        let body = r#"{
            "data": [{
                "id": "1",
                "broadcaster_login": "somestreamer",
                "display_name": "SomeStreamer",
                "thumbnail_url": ""
            }]
        }"#;
        let parsed: DataResponse<SearchChannel> = serde_json::from_str(body).unwrap();
        let identity = map_search_channel(parsed.data.into_iter().next().unwrap());
        assert_eq!(identity.handle.as_deref(), Some("@somestreamer"));
        assert_eq!(identity.avatar_url, None);
    }

    #[test]
    fn test_extract_login_from_url() {
        assert_eq!(
            extract_login("https://www.twitch.tv/Shroud/videos"),
            Some("shroud".to_string())
        );
        assert_eq!(extract_login("https://example.com/shroud"), None);
        assert_eq!(extract_login("not a url"), None);
    }

    #[tokio::test]
    async fn test_keyless_connector_is_a_silent_noop() {
        let connector = TwitchConnector::new(None, None);
        assert!(connector
            .resolve_and_hydrate("@shroud")
            .await
            .unwrap()
            .is_none());
        assert!(connector.fetch_counters("123").await.unwrap().is_empty());
        assert!(connector.search("fps", 5).await.unwrap().is_empty());
        assert!(!connector.diagnostics().configured);
    }

    #[tokio::test]
    async fn test_partial_credentials_treated_as_keyless() {
        let connector = TwitchConnector::new(Some("id".into()), None);
        assert!(!connector.diagnostics().configured);
        assert!(connector.search("fps", 5).await.unwrap().is_empty());
    }
}
