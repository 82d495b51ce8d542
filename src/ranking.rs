//! Daily per-platform leaderboard computation.
//!
//! Every platform ranks by its own designated counter and is computed
//! independently; there is no cross-platform normalization.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use crate::app::Result;
use crate::domain::{DailyStat, Platform, RankSnapshot};
use crate::store::Store;

pub struct RankingService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> RankingService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Rank every channel with a snapshot on (date, platform) by the
    /// platform's metric, descending. Ranks are 1-based and cover the slice
    /// exactly; ties keep the stats' stored order. Returns the number of
    /// rank rows written.
    pub fn compute_daily_ranks(&self, date: NaiveDate, platform: Platform) -> Result<usize> {
        let metric = platform.ranking_metric();
        let mut stats: Vec<DailyStat> = self.store.stats_on(date, platform)?;
        if stats.is_empty() {
            return Ok(0);
        }

        // Stable sort: equal metric values keep their read order.
        stats.sort_by(|a, b| b.metric(metric).cmp(&a.metric(metric)));

        let ranks: Vec<RankSnapshot> = stats
            .iter()
            .enumerate()
            .map(|(i, stat)| {
                RankSnapshot::new(date, platform, metric, stat.channel_id, (i + 1) as i64)
            })
            .collect();

        let written = self.store.insert_ranks(&ranks)?;
        info!(%platform, %date, metric, ranked = written, "daily ranks computed");
        Ok(written)
    }

    /// Top `limit` entries of the platform's leaderboard for a date.
    pub fn leaderboard(
        &self,
        date: NaiveDate,
        platform: Platform,
        limit: usize,
    ) -> Result<Vec<RankSnapshot>> {
        self.store
            .ranks_on(date, platform, platform.ranking_metric(), limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::domain::Channel;
    use crate::store::SqliteStore;

    fn setup() -> (Arc<SqliteStore>, RankingService<SqliteStore>) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        (store.clone(), RankingService::new(store))
    }

    fn seed(store: &SqliteStore, platform: Platform, n: &str, date: NaiveDate, value: i64) -> i64 {
        let channel = Channel::new(
            platform,
            n.to_string(),
            format!("@{}", n),
            n.to_string(),
        );
        let (saved, _) = store.insert_channel(&channel).unwrap();
        let mut counters = HashMap::new();
        counters.insert(platform.ranking_metric().to_string(), value);
        store
            .insert_stat(&DailyStat::from_counters(saved.id, date, &counters))
            .unwrap();
        saved.id
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_ranks_cover_one_through_k() {
        let (store, svc) = setup();
        let d = date("2024-06-01");
        for (n, v) in [("a", 10), ("b", 30), ("c", 20), ("d", 40), ("e", 5)] {
            seed(&store, Platform::Youtube, n, d, v);
        }

        assert_eq!(svc.compute_daily_ranks(d, Platform::Youtube).unwrap(), 5);

        let board = svc.leaderboard(d, Platform::Youtube, 100).unwrap();
        let mut ranks: Vec<i64> = board.iter().map(|r| r.rank).collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_higher_metric_gets_lower_rank() {
        let (store, svc) = setup();
        let d = date("2024-06-01");
        let small = seed(&store, Platform::Youtube, "small", d, 100);
        let big = seed(&store, Platform::Youtube, "big", d, 1_000_000);

        svc.compute_daily_ranks(d, Platform::Youtube).unwrap();

        let board = svc.leaderboard(d, Platform::Youtube, 10).unwrap();
        assert_eq!(board[0].channel_id, big);
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].channel_id, small);
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn test_ties_keep_stored_order() {
        let (store, svc) = setup();
        let d = date("2024-06-01");
        let first = seed(&store, Platform::Youtube, "first", d, 500);
        let second = seed(&store, Platform::Youtube, "second", d, 500);

        svc.compute_daily_ranks(d, Platform::Youtube).unwrap();

        let board = svc.leaderboard(d, Platform::Youtube, 10).unwrap();
        assert_eq!(board[0].channel_id, first);
        assert_eq!(board[1].channel_id, second);
    }

    #[test]
    fn test_platforms_rank_independently() {
        let (store, svc) = setup();
        let d = date("2024-06-01");
        seed(&store, Platform::Youtube, "yt", d, 10);
        let tw = seed(&store, Platform::Twitch, "tw", d, 99);

        assert_eq!(svc.compute_daily_ranks(d, Platform::Youtube).unwrap(), 1);
        assert_eq!(svc.compute_daily_ranks(d, Platform::Twitch).unwrap(), 1);

        let board = svc.leaderboard(d, Platform::Twitch, 10).unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].channel_id, tw);
        assert_eq!(board[0].metric, "followers");
        assert_eq!(board[0].rank, 1);
    }

    #[test]
    fn test_empty_slice_writes_nothing() {
        let (_store, svc) = setup();
        let written = svc
            .compute_daily_ranks(date("2024-06-01"), Platform::Youtube)
            .unwrap();
        assert_eq!(written, 0);
    }
}
