//! Scripted connector for service and engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::app::{RankError, Result};
use crate::connector::{Connector, ConnectorDiagnostics};
use crate::domain::{ChannelIdentity, Platform};

pub fn identity(platform: Platform, platform_id: &str, handle: &str, title: &str) -> ChannelIdentity {
    let mut id = ChannelIdentity::new(platform, platform_id);
    id.handle = Some(handle.to_string());
    id.title = Some(title.to_string());
    id
}

#[derive(Default)]
pub struct MockConnector {
    platform: Option<Platform>,
    resolve: HashMap<String, ChannelIdentity>,
    search_results: HashMap<String, Vec<ChannelIdentity>>,
    counters: HashMap<String, HashMap<String, i64>>,
    failing_queries: HashSet<String>,
    pub search_calls: AtomicUsize,
    pub counter_calls: AtomicUsize,
}

impl MockConnector {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform: Some(platform),
            ..Default::default()
        }
    }

    pub fn with_resolve(mut self, input: &str, identity: ChannelIdentity) -> Self {
        self.resolve.insert(input.to_string(), identity);
        self
    }

    pub fn with_search(mut self, query: &str, results: Vec<ChannelIdentity>) -> Self {
        self.search_results.insert(query.to_string(), results);
        self
    }

    pub fn with_counters(mut self, platform_id: &str, counters: HashMap<String, i64>) -> Self {
        self.counters.insert(platform_id.to_string(), counters);
        self
    }

    pub fn with_failing_query(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn platform(&self) -> Platform {
        self.platform.unwrap_or(Platform::Youtube)
    }

    async fn resolve_and_hydrate(&self, handle_or_url: &str) -> Result<Option<ChannelIdentity>> {
        Ok(self.resolve.get(handle_or_url).cloned())
    }

    async fn fetch_counters(&self, platform_id: &str) -> Result<HashMap<String, i64>> {
        self.counter_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.counters.get(platform_id).cloned().unwrap_or_default())
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<ChannelIdentity>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.contains(query) {
            return Err(RankError::Transient(format!("scripted failure: {}", query)));
        }
        let mut results = self.search_results.get(query).cloned().unwrap_or_default();
        results.truncate(max_results);
        Ok(results)
    }

    fn diagnostics(&self) -> ConnectorDiagnostics {
        ConnectorDiagnostics {
            platform: self.platform(),
            configured: true,
            endpoint: "mock",
        }
    }
}
