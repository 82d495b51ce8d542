//! Daily ingestion: snapshot every known channel per platform, then compute
//! that platform's ranks. Ranking only runs after the platform's snapshot
//! fan-out has fully joined, so every stat for the (date, platform) slice is
//! durable before it is ranked. Platforms recover independently; one
//! platform's failure never blocks another's ranking run.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::app::{RankError, Result};
use crate::connector::gate::RateGate;
use crate::connector::Connector;
use crate::domain::{Channel, DailyStat, Platform};
use crate::ranking::RankingService;
use crate::stats::StatsService;
use crate::store::Store;

pub const DEFAULT_WORKERS: usize = 4;

/// Aggregate of one daily ingestion run.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestionReport {
    pub snapshots: usize,
    pub ranked: usize,
}

pub struct IngestionScheduler<S: Store + 'static> {
    store: Arc<S>,
    stats: Arc<StatsService<S>>,
    ranking: Arc<RankingService<S>>,
    connectors: HashMap<Platform, Arc<dyn Connector>>,
    gate: Arc<RateGate>,
    workers: Arc<Semaphore>,
}

impl<S: Store + 'static> IngestionScheduler<S> {
    pub fn new(
        store: Arc<S>,
        stats: Arc<StatsService<S>>,
        ranking: Arc<RankingService<S>>,
        connectors: HashMap<Platform, Arc<dyn Connector>>,
        gate: Arc<RateGate>,
        workers: usize,
    ) -> Self {
        Self {
            store,
            stats,
            ranking,
            connectors,
            gate,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Snapshot all channels of every configured platform, then rank each
    /// platform's slice for today.
    pub async fn run_daily(&self) -> Result<IngestionReport> {
        let today = Utc::now().date_naive();
        let mut report = IngestionReport::default();

        for platform in Platform::ALL {
            let Some(connector) = self.connectors.get(&platform).cloned() else {
                info!(%platform, "no connector configured, skipping platform");
                continue;
            };

            let channels = self.store.channels_by_platform(platform)?;
            report.snapshots += self.snapshot_platform(connector, channels).await;

            match self.ranking.compute_daily_ranks(today, platform) {
                Ok(ranked) => report.ranked += ranked,
                Err(e) => warn!(%platform, error = %e, "ranking failed"),
            }
        }

        info!(
            snapshots = report.snapshots,
            ranked = report.ranked,
            "daily ingestion complete"
        );
        Ok(report)
    }

    /// Snapshot one channel on demand.
    pub async fn snapshot_one(&self, channel_id: i64) -> Result<DailyStat> {
        let channel = self
            .store
            .get_channel(channel_id)?
            .ok_or(RankError::ChannelNotFound(channel_id))?;
        let connector = self
            .connectors
            .get(&channel.platform)
            .ok_or(RankError::NoConnector(channel.platform))?;

        let counters = self
            .gate
            .call(|| connector.fetch_counters(&channel.platform_id))
            .await?;
        self.stats.snapshot_today(channel.id, &counters)
    }

    /// Snapshot every known channel without ranking.
    pub async fn snapshot_all(&self) -> Result<usize> {
        let mut snapshots = 0;
        for platform in Platform::ALL {
            let Some(connector) = self.connectors.get(&platform).cloned() else {
                continue;
            };
            let channels = self.store.channels_by_platform(platform)?;
            snapshots += self.snapshot_platform(connector, channels).await;
        }
        Ok(snapshots)
    }

    /// Bounded snapshot fan-out; returns how many channels were stored.
    async fn snapshot_platform(
        &self,
        connector: Arc<dyn Connector>,
        channels: Vec<Channel>,
    ) -> usize {
        let mut handles = Vec::new();
        for channel in channels {
            let connector = connector.clone();
            let gate = self.gate.clone();
            let stats = self.stats.clone();
            let semaphore = self.workers.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                let counters = gate
                    .call(|| connector.fetch_counters(&channel.platform_id))
                    .await;
                match counters.and_then(|c| stats.snapshot_today(channel.id, &c)) {
                    Ok(_) => true,
                    Err(e) => {
                        warn!(handle = %channel.handle, error = %e, "snapshot failed");
                        false
                    }
                }
            }));
        }

        let mut stored = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => stored += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Task join error: {}", e),
            }
        }
        stored
    }
}
