//! Idempotent per-day counter snapshots.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::debug;

use crate::app::Result;
use crate::domain::DailyStat;
use crate::store::Store;

pub struct StatsService<S: Store> {
    store: Arc<S>,
}

impl<S: Store> StatsService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record one day's counters for a channel. The first write for a
    /// (channel, date) wins; later calls return the stored row unchanged
    /// even when the counters differ. Missing counter keys default to 0.
    pub fn snapshot(
        &self,
        channel_id: i64,
        counters: &HashMap<String, i64>,
        date: NaiveDate,
    ) -> Result<DailyStat> {
        let stat = self
            .store
            .insert_stat(&DailyStat::from_counters(channel_id, date, counters))?;
        debug!(channel_id, %date, "snapshot stored");
        Ok(stat)
    }

    /// Snapshot under the current UTC date.
    pub fn snapshot_today(
        &self,
        channel_id: i64,
        counters: &HashMap<String, i64>,
    ) -> Result<DailyStat> {
        self.snapshot(channel_id, counters, Utc::now().date_naive())
    }

    pub fn latest(&self, channel_id: i64) -> Result<Option<DailyStat>> {
        self.store.latest_stat(channel_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Channel, Platform};
    use crate::store::SqliteStore;

    fn setup() -> (Arc<SqliteStore>, StatsService<SqliteStore>, i64) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let channel = Channel::new(
            Platform::Youtube,
            "UC1".to_string(),
            "@one".to_string(),
            "One".to_string(),
        );
        let (saved, _) = store.insert_channel(&channel).unwrap();
        (store.clone(), StatsService::new(store), saved.id)
    }

    fn counters(pairs: &[(&str, i64)]) -> HashMap<String, i64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_snapshot_first_write_wins() {
        let (store, svc, channel_id) = setup();
        let d = date("2024-06-01");

        let first = svc
            .snapshot(channel_id, &counters(&[("subscribers", 100)]), d)
            .unwrap();
        let second = svc
            .snapshot(channel_id, &counters(&[("subscribers", 999)]), d)
            .unwrap();
        let third = svc
            .snapshot(channel_id, &counters(&[("subscribers", 5)]), d)
            .unwrap();

        assert_eq!(second, first);
        assert_eq!(third, first);
        assert_eq!(first.subscribers, 100);
        assert_eq!(store.channels_with_stats_count().unwrap(), 1);
    }

    #[test]
    fn test_snapshot_missing_keys_default_to_zero() {
        let (_store, svc, channel_id) = setup();

        let stat = svc
            .snapshot(
                channel_id,
                &counters(&[("followers", 42)]),
                date("2024-06-01"),
            )
            .unwrap();

        assert_eq!(stat.followers, 42);
        assert_eq!(stat.subscribers, 0);
        assert_eq!(stat.views, 0);
    }

    #[test]
    fn test_distinct_dates_get_distinct_rows() {
        let (_store, svc, channel_id) = setup();

        svc.snapshot(channel_id, &counters(&[("subscribers", 1)]), date("2024-06-01"))
            .unwrap();
        svc.snapshot(channel_id, &counters(&[("subscribers", 2)]), date("2024-06-02"))
            .unwrap();

        let latest = svc.latest(channel_id).unwrap().unwrap();
        assert_eq!(latest.snapshot_date, date("2024-06-02"));
        assert_eq!(latest.subscribers, 2);
    }
}
