use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::Platform;

/// Materialized daily leaderboard position for one channel.
///
/// Rows are append-only; each ranking run inserts a fresh set for its
/// (date, platform, metric) slice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankSnapshot {
    pub id: i64,
    pub snapshot_date: NaiveDate,
    pub platform: Platform,
    pub metric: String,
    pub channel_id: i64,
    pub rank: i64,
}

impl RankSnapshot {
    pub fn new(
        snapshot_date: NaiveDate,
        platform: Platform,
        metric: impl Into<String>,
        channel_id: i64,
        rank: i64,
    ) -> Self {
        Self {
            id: 0,
            snapshot_date,
            platform,
            metric: metric.into(),
            channel_id,
            rank,
        }
    }
}
