pub mod gate;
pub mod twitch;
pub mod youtube;

#[cfg(test)]
pub mod mock;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{ChannelIdentity, Platform};

pub use gate::RateGate;
pub use twitch::TwitchConnector;
pub use youtube::YouTubeConnector;

/// Configured-state report for a connector, exposed explicitly instead of
/// poking at connector internals.
#[derive(Debug, Clone)]
pub struct ConnectorDiagnostics {
    pub platform: Platform,
    pub configured: bool,
    pub endpoint: &'static str,
}

/// Per-platform adapter: resolve an identity from a handle/URL, fetch
/// counters, search by keyword.
///
/// `Ok(None)` / an empty list means "not found" and is a valid result; an
/// `Err` is a transient or permanent failure and must propagate. A connector
/// without credentials returns empty results from every call.
#[async_trait]
pub trait Connector: Send + Sync {
    fn platform(&self) -> Platform;

    async fn resolve_and_hydrate(&self, handle_or_url: &str) -> Result<Option<ChannelIdentity>>;

    async fn fetch_counters(&self, platform_id: &str) -> Result<HashMap<String, i64>>;

    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<ChannelIdentity>> {
        Ok(Vec::new())
    }

    fn diagnostics(&self) -> ConnectorDiagnostics;
}
