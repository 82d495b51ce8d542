use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar-day snapshot of a channel's popularity counters.
///
/// Unique per (channel_id, snapshot_date); the first write for a date wins
/// and the row is never updated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStat {
    pub id: i64,
    pub channel_id: i64,
    pub snapshot_date: NaiveDate,
    pub subscribers: i64,
    pub views: i64,
    pub videos: i64,
    pub followers: i64,
    pub live_views: i64,
}

impl DailyStat {
    /// Build a stat from raw connector counters; missing keys default to 0.
    pub fn from_counters(
        channel_id: i64,
        snapshot_date: NaiveDate,
        counters: &HashMap<String, i64>,
    ) -> Self {
        let get = |key: &str| counters.get(key).copied().unwrap_or(0);
        Self {
            id: 0,
            channel_id,
            snapshot_date,
            subscribers: get("subscribers"),
            views: get("views"),
            videos: get("videos"),
            followers: get("followers"),
            live_views: get("live_views"),
        }
    }

    /// Counter value for a named metric.
    pub fn metric(&self, name: &str) -> i64 {
        match name {
            "subscribers" => self.subscribers,
            "views" => self.views,
            "videos" => self.videos,
            "followers" => self.followers,
            "live_views" => self.live_views,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_counters_default_to_zero() {
        let mut counters = HashMap::new();
        counters.insert("subscribers".to_string(), 1_000_000);
        counters.insert("views".to_string(), 5_000);

        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let stat = DailyStat::from_counters(7, date, &counters);

        assert_eq!(stat.subscribers, 1_000_000);
        assert_eq!(stat.views, 5_000);
        assert_eq!(stat.videos, 0);
        assert_eq!(stat.followers, 0);
        assert_eq!(stat.live_views, 0);
    }

    #[test]
    fn test_metric_lookup() {
        let mut counters = HashMap::new();
        counters.insert("followers".to_string(), 42);
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let stat = DailyStat::from_counters(1, date, &counters);

        assert_eq!(stat.metric("followers"), 42);
        assert_eq!(stat.metric("subscribers"), 0);
        assert_eq!(stat.metric("no_such_metric"), 0);
    }
}
