//! YouTube Data API v3 connector.
//!
//! Payloads are parsed into typed structs at this boundary; optional fields
//! are validated once here, never re-checked downstream.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::app::Result;
use crate::connector::{Connector, ConnectorDiagnostics};
use crate::domain::{handle, ChannelIdentity, Platform};

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const MAX_SEARCH_RESULTS: usize = 25;

pub struct YouTubeConnector {
    client: Client,
    api_key: Option<String>,
}

impl YouTubeConnector {
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .gzip(true)
            .user_agent(concat!("channelrank/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    async fn fetch_by_handle(&self, handle_with_at: &str) -> Result<Option<ChannelIdentity>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };

        let response: ChannelListResponse = self
            .client
            .get(format!("{}/channels", API_BASE))
            .query(&[
                ("part", "snippet,statistics"),
                ("forHandle", handle_with_at),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.items.into_iter().next().and_then(map_resource))
    }

    async fn fetch_by_id(&self, channel_id: &str) -> Result<Option<ChannelIdentity>> {
        let Some(key) = &self.api_key else {
            return Ok(None);
        };
        if channel_id.is_empty() {
            return Ok(None);
        }

        let response: ChannelListResponse = self
            .client
            .get(format!("{}/channels", API_BASE))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", channel_id),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.items.into_iter().next().and_then(map_resource))
    }

    async fn search_first(&self, query: &str) -> Result<Option<ChannelIdentity>> {
        Ok(self.search(query, 1).await?.into_iter().next())
    }
}

#[async_trait]
impl Connector for YouTubeConnector {
    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    async fn resolve_and_hydrate(&self, handle_or_url: &str) -> Result<Option<ChannelIdentity>> {
        if self.api_key.is_none() {
            return Ok(None);
        }
        let input = handle_or_url.trim();
        if input.is_empty() {
            return Ok(None);
        }

        // Handle token: direct lookup, keep the '@'.
        if input.starts_with('@') {
            return self.fetch_by_handle(input).await;
        }

        // URL: try direct-id path, then handle path, then legacy vanity
        // path, each falling through to a search on the extracted fragment.
        if input.starts_with("http") {
            if let Some(id) = extract_channel_id(input) {
                if let Some(identity) = self.fetch_by_id(&id).await? {
                    return Ok(Some(identity));
                }
                return self.search_first(&id).await;
            }
            if let Some(h) = extract_url_handle(input) {
                if let Some(identity) = self.fetch_by_handle(&h).await? {
                    return Ok(Some(identity));
                }
                return self.search_first(h.trim_start_matches('@')).await;
            }
            if let Some(vanity) = extract_vanity(input) {
                // Legacy vanity names often equal the modern handle.
                if let Some(identity) = self.fetch_by_handle(&format!("@{}", vanity)).await? {
                    return Ok(Some(identity));
                }
                return self.search_first(&vanity).await;
            }
            // Unrecognized URL shape: treat the whole thing as a query.
        }

        // Free text: first search result.
        self.search_first(input).await
    }

    async fn fetch_counters(&self, platform_id: &str) -> Result<HashMap<String, i64>> {
        let Some(key) = &self.api_key else {
            return Ok(HashMap::new());
        };
        if platform_id.is_empty() {
            return Ok(HashMap::new());
        }

        let response: ChannelListResponse = self
            .client
            .get(format!("{}/channels", API_BASE))
            .query(&[("part", "statistics"), ("id", platform_id), ("key", key)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(stats) = response.items.into_iter().next().and_then(|r| r.statistics) else {
            return Ok(HashMap::new());
        };

        let mut counters = HashMap::new();
        counters.insert("subscribers".to_string(), stats.subscribers());
        counters.insert("views".to_string(), stats.views());
        counters.insert("videos".to_string(), stats.videos());
        Ok(counters)
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ChannelIdentity>> {
        let Some(key) = &self.api_key else {
            return Ok(Vec::new());
        };
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let capped = max_results.clamp(1, MAX_SEARCH_RESULTS);

        let search: SearchListResponse = self
            .client
            .get(format!("{}/search", API_BASE))
            .query(&[
                ("part", "snippet"),
                ("type", "channel"),
                ("q", query),
                ("maxResults", &capped.to_string()),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let channel_ids: Vec<String> = search
            .items
            .into_iter()
            .filter_map(|item| item.id.channel_id)
            .filter(|id| !id.is_empty())
            .collect();

        if channel_ids.is_empty() {
            return Ok(Vec::new());
        }

        // Batch hydrate the hits in one channels.list call.
        let response: ChannelListResponse = self
            .client
            .get(format!("{}/channels", API_BASE))
            .query(&[
                ("part", "snippet,statistics"),
                ("id", &channel_ids.join(",")),
                ("key", key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(map_resource)
            .filter(|identity| identity.title.is_some())
            .collect())
    }

    fn diagnostics(&self) -> ConnectorDiagnostics {
        ConnectorDiagnostics {
            platform: Platform::Youtube,
            configured: self.api_key.is_some(),
            endpoint: API_BASE,
        }
    }
}

// ---- Wire types ----

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelResource>,
}

#[derive(Debug, Deserialize)]
struct ChannelResource {
    id: String,
    snippet: Option<Snippet>,
    statistics: Option<Statistics>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    custom_url: Option<String>,
    country: Option<String>,
    thumbnails: Option<Thumbnails>,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    high: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    #[serde(rename = "default")]
    default_res: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

/// YouTube returns counters as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<String>,
    view_count: Option<String>,
    video_count: Option<String>,
}

impl Statistics {
    fn subscribers(&self) -> i64 {
        parse_count(&self.subscriber_count)
    }
    fn views(&self) -> i64 {
        parse_count(&self.view_count)
    }
    fn videos(&self) -> i64 {
        parse_count(&self.video_count)
    }
}

fn parse_count(value: &Option<String>) -> i64 {
    value
        .as_deref()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchResource>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    id: SearchResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResourceId {
    channel_id: Option<String>,
}

// ---- Mapping ----

fn map_resource(resource: ChannelResource) -> Option<ChannelIdentity> {
    let snippet = resource.snippet?;
    let synthesized = synthesize_handle(&snippet, &resource.id);

    let mut identity = ChannelIdentity::new(Platform::Youtube, resource.id);
    identity.title = snippet.title.filter(|t| !t.trim().is_empty());
    identity.handle = Some(synthesized);
    identity.avatar_url = snippet.thumbnails.and_then(|t| {
        t.high
            .or(t.medium)
            .or(t.default_res)
            .map(|thumb| thumb.url)
    });
    identity.country = snippet.country.filter(|c| !c.is_empty());
    Some(identity)
}

/// Derive a handle from whatever the snippet offers, in priority order:
/// canonical customUrl, a handle-shaped token in the description, a slug of
/// the title, a slug of the opaque channel id, a unique placeholder.
fn synthesize_handle(snippet: &Snippet, channel_id: &str) -> String {
    if let Some(h) = snippet
        .custom_url
        .as_deref()
        .and_then(normalize_custom_url)
    {
        return h;
    }
    if let Some(h) = snippet.description.as_deref().and_then(handle::scrape_from_text) {
        return h;
    }
    if let Some(h) = snippet.title.as_deref().and_then(handle::from_title) {
        return h;
    }
    if let Some(rest) = channel_id.strip_prefix("UC") {
        if rest.len() >= 8 {
            if let Some(h) = handle::normalize(&rest[..8].to_ascii_lowercase()) {
                return h;
            }
        }
    }
    handle::placeholder()
}

/// customUrl can be "@name", "name", or a full URL.
fn normalize_custom_url(custom_url: &str) -> Option<String> {
    let s = custom_url.trim();
    if s.is_empty() {
        return None;
    }
    if s.starts_with("http") {
        if let Some(h) = extract_url_handle(s) {
            return Some(h);
        }
        return extract_vanity(s).and_then(|v| handle::normalize(&v));
    }
    handle::normalize(s)
}

fn extract_channel_id(input: &str) -> Option<String> {
    path_segment_after(input, "channel")
}

fn extract_url_handle(input: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    let first = url.path_segments()?.find(|s| !s.is_empty())?;
    if first.starts_with('@') {
        return handle::normalize(first);
    }
    None
}

fn extract_vanity(input: &str) -> Option<String> {
    path_segment_after(input, "user").or_else(|| path_segment_after(input, "c"))
}

fn path_segment_after(input: &str, marker: &str) -> Option<String> {
    let url = Url::parse(input).ok()?;
    let mut segments = url.path_segments()?;
    segments
        .find(|s| *s == marker)
        .and_then(|_| segments.next())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet_json(body: &str) -> Snippet {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_parse_channel_list_payload() {
        let body = r#"{
            "items": [{
                "id": "UCBJycsmduvYEL83R_U4JriQ",
                "snippet": {
                    "title": "Marques Brownlee",
                    "description": "Quality tech videos",
                    "customUrl": "@mkbhd",
                    "country": "US",
                    "thumbnails": {
                        "default": {"url": "https://yt.example/d.jpg"},
                        "high": {"url": "https://yt.example/h.jpg"}
                    }
                },
                "statistics": {
                    "subscriberCount": "18100000",
                    "viewCount": "4000000000",
                    "videoCount": "1600"
                }
            }]
        }"#;

        let parsed: ChannelListResponse = serde_json::from_str(body).unwrap();
        let identity = map_resource(parsed.items.into_iter().next().unwrap()).unwrap();

        assert_eq!(identity.platform_id, "UCBJycsmduvYEL83R_U4JriQ");
        assert_eq!(identity.title.as_deref(), Some("Marques Brownlee"));
        assert_eq!(identity.handle.as_deref(), Some("@mkbhd"));
        assert_eq!(identity.avatar_url.as_deref(), Some("https://yt.example/h.jpg"));
        assert_eq!(identity.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_parse_statistics_strings() {
        let stats: Statistics = serde_json::from_str(
            r#"{"subscriberCount": "123", "viewCount": "not a number"}"#,
        )
        .unwrap();
        assert_eq!(stats.subscribers(), 123);
        assert_eq!(stats.views(), 0);
        assert_eq!(stats.videos(), 0);
    }

    #[test]
    fn test_parse_search_payload() {
        let body = r#"{
            "items": [
                {"id": {"kind": "youtube#channel", "channelId": "UC1"}},
                {"id": {"kind": "youtube#video"}}
            ]
        }"#;
        let parsed: SearchListResponse = serde_json::from_str(body).unwrap();
        let ids: Vec<_> = parsed
            .items
            .into_iter()
            .filter_map(|i| i.id.channel_id)
            .collect();
        assert_eq!(ids, vec!["UC1"]);
    }

    #[test]
    fn test_handle_from_custom_url() {
        let snippet = snippet_json(r#"{"customUrl": "@mkbhd", "title": "Ignored"}"#);
        assert_eq!(synthesize_handle(&snippet, "UC123456789"), "@mkbhd");

        let snippet = snippet_json(r#"{"customUrl": "mkbhd"}"#);
        assert_eq!(synthesize_handle(&snippet, "UC123456789"), "@mkbhd");

        let snippet = snippet_json(r#"{"customUrl": "https://youtube.com/@mkbhd"}"#);
        assert_eq!(synthesize_handle(&snippet, "UC123456789"), "@mkbhd");

        let snippet = snippet_json(r#"{"customUrl": "https://youtube.com/c/mkbhd"}"#);
        assert_eq!(synthesize_handle(&snippet, "UC123456789"), "@mkbhd");
    }

    #[test]
    fn test_handle_scraped_from_description() {
        let snippet = snippet_json(
            r#"{"description": "Follow me at @techperson for more", "title": "!!"}"#,
        );
        assert_eq!(synthesize_handle(&snippet, "XX"), "@techperson");
    }

    #[test]
    fn test_handle_from_title_slug() {
        let snippet = snippet_json(r#"{"title": "Linus Tech Tips"}"#);
        assert_eq!(synthesize_handle(&snippet, "XX"), "@linus.tech.tips");
    }

    #[test]
    fn test_handle_from_opaque_id() {
        let snippet = snippet_json(r#"{"title": "!!"}"#);
        assert_eq!(
            synthesize_handle(&snippet, "UCBJycsmduvYEL83R_U4JriQ"),
            "@bjycsmdu"
        );
    }

    #[test]
    fn test_handle_placeholder_when_everything_fails() {
        let snippet = snippet_json(r#"{"title": "!!"}"#);
        let h = synthesize_handle(&snippet, "short");
        assert!(h.starts_with("@unknown"));
    }

    #[test]
    fn test_extract_channel_id_from_url() {
        assert_eq!(
            extract_channel_id("https://www.youtube.com/channel/UC123/videos"),
            Some("UC123".to_string())
        );
        assert_eq!(extract_channel_id("https://www.youtube.com/@mkbhd"), None);
    }

    #[test]
    fn test_extract_handle_from_url() {
        assert_eq!(
            extract_url_handle("https://www.youtube.com/@mkbhd?sub_confirmation=1"),
            Some("@mkbhd".to_string())
        );
        assert_eq!(
            extract_url_handle("https://www.youtube.com/channel/UC123"),
            None
        );
    }

    #[test]
    fn test_unparseable_url_extracts_nothing() {
        // Falls through to the free-text search path instead of erroring.
        let junk = "http://exa mple.com/channel/UC1";
        assert_eq!(extract_channel_id(junk), None);
        assert_eq!(extract_url_handle(junk), None);
        assert_eq!(extract_vanity(junk), None);
    }

    #[test]
    fn test_extract_vanity_from_url() {
        assert_eq!(
            extract_vanity("https://www.youtube.com/user/pewdiepie"),
            Some("pewdiepie".to_string())
        );
        assert_eq!(
            extract_vanity("https://www.youtube.com/c/veritasium/videos"),
            Some("veritasium".to_string())
        );
        assert_eq!(extract_vanity("https://www.youtube.com/@mkbhd"), None);
    }

    #[tokio::test]
    async fn test_keyless_connector_is_a_silent_noop() {
        let connector = YouTubeConnector::new(None);
        assert!(connector
            .resolve_and_hydrate("@mkbhd")
            .await
            .unwrap()
            .is_none());
        assert!(connector.fetch_counters("UC1").await.unwrap().is_empty());
        assert!(connector.search("tech", 10).await.unwrap().is_empty());
        assert!(!connector.diagnostics().configured);
    }
}
