pub mod sqlite;

use chrono::NaiveDate;

use crate::app::Result;
use crate::domain::{Channel, ChannelPatch, DailyStat, Platform, RankSnapshot};

pub use sqlite::SqliteStore;

pub trait Store: Send + Sync {
    // Channel operations
    /// Insert a channel; on a (platform, platform_id) conflict the row that
    /// won the race is re-read and returned instead. The flag reports whether
    /// this call created the row.
    fn insert_channel(&self, channel: &Channel) -> Result<(Channel, bool)>;
    fn get_channel(&self, id: i64) -> Result<Option<Channel>>;
    fn find_channel(&self, platform: Platform, platform_id: &str) -> Result<Option<Channel>>;
    fn update_channel(&self, id: i64, patch: &ChannelPatch) -> Result<()>;
    fn delete_channel(&self, id: i64) -> Result<()>;
    fn all_channels(&self) -> Result<Vec<Channel>>;
    fn channels_by_platform(&self, platform: Platform) -> Result<Vec<Channel>>;
    fn channel_count(&self) -> Result<i64>;
    fn channel_count_by_platform(&self, platform: Platform) -> Result<i64>;
    fn sample_channels(&self, limit: usize) -> Result<Vec<Channel>>;
    /// Channels whose latest snapshot is older than `cutoff`, or absent.
    fn stale_channels(&self, cutoff: NaiveDate, limit: usize) -> Result<Vec<Channel>>;

    // Stat operations
    /// Insert a daily stat; on a (channel_id, snapshot_date) conflict the
    /// existing row is returned unchanged (first write wins).
    fn insert_stat(&self, stat: &DailyStat) -> Result<DailyStat>;
    fn latest_stat(&self, channel_id: i64) -> Result<Option<DailyStat>>;
    /// All stats for a (date, platform) slice, ordered by row id for stable
    /// tie-breaking downstream.
    fn stats_on(&self, date: NaiveDate, platform: Platform) -> Result<Vec<DailyStat>>;
    fn channels_with_stats_count(&self) -> Result<i64>;

    // Rank operations
    fn insert_ranks(&self, ranks: &[RankSnapshot]) -> Result<usize>;
    fn ranks_on(
        &self,
        date: NaiveDate,
        platform: Platform,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<RankSnapshot>>;

    // Meta operations
    /// Atomically increment and return the standard-discovery cursor.
    fn bump_discovery_cursor(&self) -> Result<i64>;
    /// Current cursor value without advancing it; 0 before the first bump.
    fn discovery_cursor(&self) -> Result<i64>;
}
