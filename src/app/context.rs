//! Shared wiring for the CLI and daemon.

use std::collections::HashMap;
use std::fs;
use std::sync::Arc;

use tracing::info;

use crate::app::Result;
use crate::channels::ChannelService;
use crate::config::Config;
use crate::connector::gate::RateGate;
use crate::connector::twitch::TwitchConnector;
use crate::connector::youtube::YouTubeConnector;
use crate::connector::Connector;
use crate::discovery::DiscoveryEngine;
use crate::domain::Platform;
use crate::ranking::RankingService;
use crate::scheduler::IngestionScheduler;
use crate::stats::StatsService;
use crate::store::{SqliteStore, Store};

/// Everything a command needs, built once from config.
pub struct AppContext {
    pub store: Arc<SqliteStore>,
    pub channels: Arc<ChannelService<SqliteStore>>,
    pub stats: Arc<StatsService<SqliteStore>>,
    pub ranking: Arc<RankingService<SqliteStore>>,
    pub engine: DiscoveryEngine<SqliteStore>,
    pub scheduler: IngestionScheduler<SqliteStore>,
    pub connectors: HashMap<Platform, Arc<dyn Connector>>,
    pub gate: Arc<RateGate>,
}

impl AppContext {
    /// Open (or create) the database and wire up services and connectors.
    pub fn build(config: &Config) -> Result<Self> {
        let db_path = config
            .database_path()
            .map_err(|e| crate::app::RankError::Config(e.to_string()))?;
        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        info!(path = %db_path.display(), "opening database");

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Ok(Self::wire(store, config))
    }

    /// In-memory variant for tests and dry runs.
    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::wire(store, config))
    }

    fn wire(store: Arc<SqliteStore>, config: &Config) -> Self {
        let mut connectors: HashMap<Platform, Arc<dyn Connector>> = HashMap::new();
        connectors.insert(
            Platform::Youtube,
            Arc::new(YouTubeConnector::new(config.youtube.api_key.clone())),
        );
        connectors.insert(
            Platform::Twitch,
            Arc::new(TwitchConnector::new(
                config.twitch.client_id.clone(),
                config.twitch.client_secret.clone(),
            )),
        );

        let gate = Arc::new(config.gate.build());
        let channels = Arc::new(ChannelService::new(store.clone()));
        let stats = Arc::new(StatsService::new(store.clone()));
        let ranking = Arc::new(RankingService::new(store.clone()));

        let engine = DiscoveryEngine::new(
            store.clone(),
            channels.clone(),
            stats.clone(),
            connectors.clone(),
            gate.clone(),
            config.discovery.tuning(),
        );
        let scheduler = IngestionScheduler::new(
            store.clone(),
            stats.clone(),
            ranking.clone(),
            connectors.clone(),
            gate.clone(),
            config.discovery.snapshot_workers,
        );

        Self {
            store,
            channels,
            stats,
            ranking,
            engine,
            scheduler,
            connectors,
            gate,
        }
    }

    /// Connector for the requested platform.
    pub fn connector(&self, platform: Platform) -> Result<Arc<dyn Connector>> {
        self.connectors
            .get(&platform)
            .cloned()
            .ok_or(crate::app::RankError::NoConnector(platform))
    }

    pub fn channel_count(&self) -> Result<i64> {
        self.store.channel_count()
    }
}
