//! Channel discovery orchestration.
//!
//! Mode selection hangs on a single gauge: total known channels against a
//! bootstrap threshold. Below it, rapid mode samples several categories and
//! fans the searches out concurrently; above it, a daily round-robin cursor
//! walks the category list one search at a time. Sub-tasks within a run are
//! independent dedup-upserts, so a failing term is logged, counts as zero
//! discovered, and never aborts its siblings.

pub mod categories;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::app::Result;
use crate::channels::ChannelService;
use crate::connector::gate::RateGate;
use crate::connector::Connector;
use crate::domain::{Channel, Platform};
use crate::stats::StatsService;
use crate::store::Store;

use categories::{sample_categories, sample_terms, CATEGORIES, SEED_HANDLES, TRENDING_TERMS};

/// Knobs for discovery and snapshot fan-out.
#[derive(Debug, Clone)]
pub struct DiscoveryTuning {
    /// Channel count below which rapid mode stays active.
    pub rapid_threshold: i64,
    pub rapid_categories: usize,
    pub rapid_terms_per_category: usize,
    pub rapid_results_per_term: usize,
    pub standard_results: usize,
    pub trending_results: usize,
    pub related_sample: usize,
    pub related_results: usize,
    pub opportunistic_results: usize,
    pub discovery_workers: usize,
    pub snapshot_workers: usize,
    /// A channel is stale when its latest snapshot is older than this.
    pub stale_after_days: i64,
}

impl Default for DiscoveryTuning {
    fn default() -> Self {
        Self {
            rapid_threshold: 1000,
            rapid_categories: 4,
            rapid_terms_per_category: 6,
            rapid_results_per_term: 20,
            standard_results: 25,
            trending_results: 15,
            related_sample: 30,
            related_results: 8,
            opportunistic_results: 12,
            discovery_workers: 8,
            snapshot_workers: 4,
            stale_after_days: 1,
        }
    }
}

/// Aggregate of one mass-discovery run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MassDiscoveryReport {
    pub seeded: usize,
    pub trending: usize,
    pub parallel: usize,
    pub related: usize,
    pub total_channels: i64,
}

/// Outcome of one batch-snapshot pass over the stale backlog.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotBacklogReport {
    pub processed: usize,
    pub selected: usize,
}

/// Operator-facing progress summary.
#[derive(Debug, Clone)]
pub struct DiscoveryStats {
    pub total_channels: i64,
    pub youtube_channels: i64,
    pub twitch_channels: i64,
    pub channels_with_stats: i64,
    pub queries_completed: i64,
    pub rapid_mode: bool,
    pub rapid_threshold: i64,
}

pub struct DiscoveryEngine<S: Store + 'static> {
    store: Arc<S>,
    channels: Arc<ChannelService<S>>,
    stats: Arc<StatsService<S>>,
    connectors: HashMap<Platform, Arc<dyn Connector>>,
    gate: Arc<RateGate>,
    discovery_workers: Arc<Semaphore>,
    snapshot_workers: Arc<Semaphore>,
    tuning: DiscoveryTuning,
}

impl<S: Store + 'static> DiscoveryEngine<S> {
    pub fn new(
        store: Arc<S>,
        channels: Arc<ChannelService<S>>,
        stats: Arc<StatsService<S>>,
        connectors: HashMap<Platform, Arc<dyn Connector>>,
        gate: Arc<RateGate>,
        tuning: DiscoveryTuning,
    ) -> Self {
        Self {
            discovery_workers: Arc::new(Semaphore::new(tuning.discovery_workers)),
            snapshot_workers: Arc::new(Semaphore::new(tuning.snapshot_workers)),
            store,
            channels,
            stats,
            connectors,
            gate,
            tuning,
        }
    }

    /// Rapid mode stays active until the corpus reaches the bootstrap
    /// threshold.
    pub fn rapid_mode(&self) -> Result<bool> {
        Ok(self.store.channel_count()? < self.tuning.rapid_threshold)
    }

    /// One rapid-mode run: sample a few categories and a few terms each,
    /// search them concurrently, report the aggregate discovered count.
    pub async fn run_rapid(&self) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        let mut terms = Vec::new();
        for category in sample_categories(self.tuning.rapid_categories) {
            terms.extend(sample_terms(category, self.tuning.rapid_terms_per_category));
        }

        info!(terms = terms.len(), "rapid discovery starting");
        let discovered = self
            .fan_out_terms(connector, terms, self.tuning.rapid_results_per_term)
            .await;
        info!(
            discovered,
            total = self.store.channel_count()?,
            "rapid discovery complete"
        );
        Ok(discovered)
    }

    /// One standard-mode run: advance the round-robin cursor and issue a
    /// single search from that category.
    pub async fn run_standard(&self) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        let cursor = self.store.bump_discovery_cursor()?;
        let category = &CATEGORIES[cursor as usize % CATEGORIES.len()];
        let term = sample_terms(category, 1)
            .pop()
            .unwrap_or_else(|| category.terms[0].to_string());

        info!(category = category.name, term = %term, "daily discovery starting");
        let discovered = discover_term(
            &connector,
            &self.gate,
            &self.channels,
            &term,
            self.tuning.standard_results,
        )
        .await?;
        info!(term = %term, discovered, "daily discovery complete");
        Ok(discovered)
    }

    /// Resolve the curated seed list one handle at a time via full upsert.
    /// Quality matters here, so each hit is hydrated and authoritative.
    pub async fn seed_popular(&self) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        info!("bootstrap seeding starting");
        let mut added = 0;
        for &seed in SEED_HANDLES {
            match self.gate.call(|| connector.resolve_and_hydrate(seed)).await {
                Ok(Some(identity)) => {
                    self.channels.upsert_full(&identity)?;
                    added += 1;
                    debug!(handle = seed, "seeded");
                }
                Ok(None) => debug!(handle = seed, "seed handle not found"),
                Err(e) => warn!(handle = seed, error = %e, "seed resolve failed"),
            }
        }
        info!(added, "bootstrap seeding complete");
        Ok(added)
    }

    /// Search the fixed trend-oriented term list concurrently.
    pub async fn discover_trending(&self) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        let terms: Vec<String> = TRENDING_TERMS.iter().map(|t| t.to_string()).collect();
        let discovered = self
            .fan_out_terms(connector, terms, self.tuning.trending_results)
            .await;
        info!(discovered, "trending discovery complete");
        Ok(discovered)
    }

    /// Sample existing channels and search for similar ones, deriving the
    /// secondary terms from their titles.
    pub async fn discover_related(&self) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        let sampled = self.store.sample_channels(self.tuning.related_sample)?;
        let mut terms = Vec::with_capacity(sampled.len() * 2);
        for channel in &sampled {
            terms.push(format!("like {}", channel.title));
            terms.push(format!("{} similar", channel.title));
        }

        let discovered = self
            .fan_out_terms(connector, terms, self.tuning.related_results)
            .await;
        info!(discovered, sampled = sampled.len(), "related discovery complete");
        Ok(discovered)
    }

    /// Single synchronous search issued when an external caller found too
    /// few existing results for a user query.
    pub async fn opportunistic(&self, term: &str) -> Result<usize> {
        let Some(connector) = self.search_connector() else {
            return Ok(0);
        };

        debug!(term, "opportunistic discovery");
        discover_term(
            &connector,
            &self.gate,
            &self.channels,
            term,
            self.tuning.opportunistic_results,
        )
        .await
    }

    /// Run seeding, trending, rapid, and related discovery concurrently and
    /// report the joined aggregate. A failed leg contributes zero.
    pub async fn mass_discovery(&self) -> Result<MassDiscoveryReport> {
        info!("mass discovery starting");
        let (seeded, trending, parallel, related) = tokio::join!(
            self.seed_popular(),
            self.discover_trending(),
            self.run_rapid(),
            self.discover_related(),
        );

        let count_or_zero = |label: &str, result: Result<usize>| match result {
            Ok(n) => n,
            Err(e) => {
                warn!(leg = label, error = %e, "mass discovery leg failed");
                0
            }
        };

        let report = MassDiscoveryReport {
            seeded: count_or_zero("seed", seeded),
            trending: count_or_zero("trending", trending),
            parallel: count_or_zero("rapid", parallel),
            related: count_or_zero("related", related),
            total_channels: self.store.channel_count()?,
        };
        info!(total = report.total_channels, "mass discovery complete");
        Ok(report)
    }

    /// Snapshot up to `limit` channels whose latest snapshot is older than
    /// the staleness cutoff or absent.
    pub async fn batch_snapshot(&self, limit: usize) -> Result<SnapshotBacklogReport> {
        let cutoff = Utc::now().date_naive() - Duration::days(self.tuning.stale_after_days);
        let backlog = self.store.stale_channels(cutoff, limit)?;
        let selected = backlog.len();

        let mut handles = Vec::new();
        for channel in backlog {
            let Some(connector) = self.connectors.get(&channel.platform).cloned() else {
                debug!(platform = %channel.platform, "no connector, skipping snapshot");
                continue;
            };
            let gate = self.gate.clone();
            let stats = self.stats.clone();
            let semaphore = self.snapshot_workers.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                match snapshot_channel(&connector, &gate, &stats, &channel).await {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(handle = %channel.handle, error = %e, "snapshot failed");
                        false
                    }
                }
            }));
        }

        let mut processed = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => processed += 1,
                Ok(false) => {}
                Err(e) => tracing::error!("Task join error: {}", e),
            }
        }

        info!(processed, selected, "batch snapshot complete");
        Ok(SnapshotBacklogReport { processed, selected })
    }

    pub fn discovery_stats(&self) -> Result<DiscoveryStats> {
        let total_channels = self.store.channel_count()?;
        Ok(DiscoveryStats {
            total_channels,
            youtube_channels: self.store.channel_count_by_platform(Platform::Youtube)?,
            twitch_channels: self.store.channel_count_by_platform(Platform::Twitch)?,
            channels_with_stats: self.store.channels_with_stats_count()?,
            queries_completed: self.store.discovery_cursor()?,
            rapid_mode: total_channels < self.tuning.rapid_threshold,
            rapid_threshold: self.tuning.rapid_threshold,
        })
    }

    /// Discovery searches only run against platforms with a search API.
    fn search_connector(&self) -> Option<Arc<dyn Connector>> {
        let connector = self.connectors.get(&Platform::Youtube).cloned();
        if connector.is_none() {
            warn!("no search connector configured, skipping discovery run");
        }
        connector
    }

    /// Bounded fan-out over a term list; each term's failure is isolated.
    async fn fan_out_terms(
        &self,
        connector: Arc<dyn Connector>,
        terms: Vec<String>,
        max_results: usize,
    ) -> usize {
        let mut handles = Vec::new();
        for term in terms {
            let connector = connector.clone();
            let gate = self.gate.clone();
            let channels = self.channels.clone();
            let semaphore = self.discovery_workers.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");
                match discover_term(&connector, &gate, &channels, &term, max_results).await {
                    Ok(n) => n,
                    Err(e) => {
                        warn!(term = %term, error = %e, "discovery sub-task failed");
                        0
                    }
                }
            }));
        }

        let mut total = 0;
        for handle in handles {
            match handle.await {
                Ok(n) => total += n,
                Err(e) => tracing::error!("Task join error: {}", e),
            }
        }
        total
    }
}

/// Search one term and identity-only upsert every hit; only rows actually
/// created count as discovered.
async fn discover_term<S: Store>(
    connector: &Arc<dyn Connector>,
    gate: &RateGate,
    channels: &ChannelService<S>,
    term: &str,
    max_results: usize,
) -> Result<usize> {
    let found = gate.call(|| connector.search(term, max_results)).await?;

    let mut discovered = 0;
    for identity in &found {
        let (_, created) = channels.upsert_identity_only(identity)?;
        if created {
            discovered += 1;
        }
    }

    if discovered > 0 {
        debug!(term, discovered, "new channels");
    }
    Ok(discovered)
}

async fn snapshot_channel<S: Store>(
    connector: &Arc<dyn Connector>,
    gate: &RateGate,
    stats: &StatsService<S>,
    channel: &Channel,
) -> Result<()> {
    let counters = gate
        .call(|| connector.fetch_counters(&channel.platform_id))
        .await?;
    stats.snapshot_today(channel.id, &counters)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::mock::{identity, MockConnector};
    use crate::domain::ChannelIdentity;
    use crate::store::SqliteStore;

    struct Fixture {
        store: Arc<SqliteStore>,
        channels: Arc<ChannelService<SqliteStore>>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = Arc::new(SqliteStore::in_memory().unwrap());
            let channels = Arc::new(ChannelService::new(store.clone()));
            Self { store, channels }
        }

        fn engine(&self, connector: MockConnector) -> DiscoveryEngine<SqliteStore> {
            let mut connectors: HashMap<Platform, Arc<dyn Connector>> = HashMap::new();
            connectors.insert(Platform::Youtube, Arc::new(connector));
            DiscoveryEngine::new(
                self.store.clone(),
                self.channels.clone(),
                Arc::new(StatsService::new(self.store.clone())),
                connectors,
                Arc::new(RateGate::default()),
                DiscoveryTuning::default(),
            )
        }

        fn seed_channels(&self, count: usize) {
            for i in 0..count {
                let id = identity(
                    Platform::Youtube,
                    &format!("UC{:04}", i),
                    &format!("@ch{}", i),
                    &format!("Channel {}", i),
                );
                self.channels.upsert_identity_only(&id).unwrap();
            }
        }
    }

    fn results(n: usize, prefix: &str) -> Vec<ChannelIdentity> {
        (0..n)
            .map(|i| {
                identity(
                    Platform::Youtube,
                    &format!("{}{}", prefix, i),
                    &format!("@{}{}", prefix, i),
                    &format!("{} {}", prefix, i),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_opportunistic_counts_only_new_rows() {
        let fx = Fixture::new();

        // 5 search hits, 2 already known by platform_id.
        let hits = results(5, "mc");
        for known in &hits[..2] {
            fx.channels.upsert_identity_only(known).unwrap();
        }
        let engine = fx.engine(MockConnector::new(Platform::Youtube).with_search("minecraft", hits));

        let discovered = engine.opportunistic("minecraft").await.unwrap();
        assert_eq!(discovered, 3);
        assert_eq!(fx.store.channel_count().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_rapid_mode_boundary() {
        let fx = Fixture::new();
        let engine = fx.engine(MockConnector::new(Platform::Youtube));

        fx.seed_channels(999);
        assert!(engine.rapid_mode().unwrap());

        fx.seed_channels(1000); // one more unique row past 999
        assert!(!engine.rapid_mode().unwrap());
    }

    #[tokio::test]
    async fn test_failing_term_never_aborts_siblings() {
        let fx = Fixture::new();
        let connector = MockConnector::new(Platform::Youtube)
            .with_search("good", results(4, "g"))
            .with_failing_query("bad");
        let engine = fx.engine(connector);

        let connector = engine.connectors[&Platform::Youtube].clone();
        let discovered = engine
            .fan_out_terms(connector, vec!["good".into(), "bad".into()], 10)
            .await;
        assert_eq!(discovered, 4);
    }

    #[tokio::test]
    async fn test_standard_run_advances_cursor() {
        let fx = Fixture::new();
        let engine = fx.engine(MockConnector::new(Platform::Youtube));

        engine.run_standard().await.unwrap();
        engine.run_standard().await.unwrap();
        assert_eq!(fx.store.discovery_cursor().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_seed_popular_full_upserts_resolved_handles() {
        let fx = Fixture::new();
        let connector = MockConnector::new(Platform::Youtube).with_resolve(
            "@mkbhd",
            identity(Platform::Youtube, "UC_mkbhd", "@mkbhd", "Marques Brownlee"),
        );
        let engine = fx.engine(connector);

        let added = engine.seed_popular().await.unwrap();
        assert_eq!(added, 1);

        let saved = fx
            .store
            .find_channel(Platform::Youtube, "UC_mkbhd")
            .unwrap()
            .unwrap();
        assert_eq!(saved.handle, "@mkbhd");
        assert_eq!(saved.title, "Marques Brownlee");
    }

    #[tokio::test]
    async fn test_batch_snapshot_fills_stale_backlog() {
        let fx = Fixture::new();
        fx.seed_channels(3);
        let connector = MockConnector::new(Platform::Youtube)
            .with_counters("UC0000", [("subscribers".to_string(), 100)].into())
            .with_counters("UC0001", [("subscribers".to_string(), 200)].into())
            .with_counters("UC0002", [("subscribers".to_string(), 300)].into());
        let engine = fx.engine(connector);

        let report = engine.batch_snapshot(10).await.unwrap();
        assert_eq!(report.selected, 3);
        assert_eq!(report.processed, 3);
        assert_eq!(fx.store.channels_with_stats_count().unwrap(), 3);

        // Everything is fresh now; a second pass selects nothing.
        let report = engine.batch_snapshot(10).await.unwrap();
        assert_eq!(report.selected, 0);
    }

    #[tokio::test]
    async fn test_mass_discovery_joins_all_legs() {
        let fx = Fixture::new();
        let connector = MockConnector::new(Platform::Youtube)
            .with_search("viral", results(2, "v"))
            .with_resolve(
                "@veritasium",
                identity(Platform::Youtube, "UC_ver", "@veritasium", "Veritasium"),
            );
        let engine = fx.engine(connector);

        let report = engine.mass_discovery().await.unwrap();
        assert_eq!(report.seeded, 1);
        assert_eq!(report.trending, 2);
        assert_eq!(report.total_channels, fx.store.channel_count().unwrap());
    }

    #[tokio::test]
    async fn test_no_connector_is_a_silent_noop() {
        let fx = Fixture::new();
        let engine = DiscoveryEngine::new(
            fx.store.clone(),
            fx.channels.clone(),
            Arc::new(StatsService::new(fx.store.clone())),
            HashMap::new(),
            Arc::new(RateGate::default()),
            DiscoveryTuning::default(),
        );

        assert_eq!(engine.run_rapid().await.unwrap(), 0);
        assert_eq!(engine.opportunistic("anything").await.unwrap(), 0);
        assert_eq!(engine.seed_popular().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_discovery_stats_snapshot() {
        let fx = Fixture::new();
        fx.seed_channels(2);
        let engine = fx.engine(MockConnector::new(Platform::Youtube));

        let stats = engine.discovery_stats().unwrap();
        assert_eq!(stats.total_channels, 2);
        assert_eq!(stats.youtube_channels, 2);
        assert_eq!(stats.twitch_channels, 0);
        assert!(stats.rapid_mode);
    }
}
