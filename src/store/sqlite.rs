use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{RankError, Result};
use crate::domain::{Channel, ChannelPatch, DailyStat, Platform, RankSnapshot};
use crate::store::Store;

const DATE_FMT: &str = "%Y-%m-%d";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| RankError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RankError::Other(format!("Store lock poisoned: {}", e)))
    }

    fn parse_date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FMT).unwrap_or_default()
    }

    fn parse_datetime(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn row_to_channel(row: &Row<'_>) -> rusqlite::Result<Channel> {
        let platform: String = row.get(1)?;
        Ok(Channel {
            id: row.get(0)?,
            platform: platform.parse().unwrap_or(Platform::Youtube),
            platform_id: row.get(2)?,
            handle: row.get(3)?,
            title: row.get(4)?,
            avatar_url: row.get(5)?,
            country: row.get(6)?,
            created_at: Self::parse_datetime(&row.get::<_, String>(7)?),
            counters: Default::default(),
        })
    }

    fn row_to_stat(row: &Row<'_>) -> rusqlite::Result<DailyStat> {
        Ok(DailyStat {
            id: row.get(0)?,
            channel_id: row.get(1)?,
            snapshot_date: Self::parse_date(&row.get::<_, String>(2)?),
            subscribers: row.get(3)?,
            views: row.get(4)?,
            videos: row.get(5)?,
            followers: row.get(6)?,
            live_views: row.get(7)?,
        })
    }

    fn row_to_rank(row: &Row<'_>) -> rusqlite::Result<RankSnapshot> {
        let platform: String = row.get(2)?;
        Ok(RankSnapshot {
            id: row.get(0)?,
            snapshot_date: Self::parse_date(&row.get::<_, String>(1)?),
            platform: platform.parse().unwrap_or(Platform::Youtube),
            metric: row.get(3)?,
            channel_id: row.get(4)?,
            rank: row.get(5)?,
        })
    }
}

const CHANNEL_COLS: &str =
    "id, platform, platform_id, handle, title, avatar_url, country, created_at";
const STAT_COLS: &str =
    "id, channel_id, snapshot_date, subscribers, views, videos, followers, live_views";
const RANK_COLS: &str = "id, snapshot_date, platform, metric, channel_id, rank";

impl Store for SqliteStore {
    fn insert_channel(&self, channel: &Channel) -> Result<(Channel, bool)> {
        let conn = self.lock()?;

        let inserted = conn.execute(
            "INSERT INTO channels (platform, platform_id, handle, title, avatar_url, country, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(platform, platform_id) DO NOTHING",
            params![
                channel.platform.as_str(),
                channel.platform_id,
                channel.handle,
                channel.title,
                channel.avatar_url,
                channel.country,
                channel.created_at.to_rfc3339()
            ],
        )? > 0;

        // Conflict means someone else inserted concurrently; return their row.
        let row = conn.query_row(
            &format!(
                "SELECT {} FROM channels WHERE platform = ?1 AND platform_id = ?2",
                CHANNEL_COLS
            ),
            params![channel.platform.as_str(), channel.platform_id],
            Self::row_to_channel,
        )?;
        Ok((row, inserted))
    }

    fn get_channel(&self, id: i64) -> Result<Option<Channel>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {} FROM channels WHERE id = ?1", CHANNEL_COLS),
                params![id],
                Self::row_to_channel,
            )
            .optional()?;
        Ok(result)
    }

    fn find_channel(&self, platform: Platform, platform_id: &str) -> Result<Option<Channel>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM channels WHERE platform = ?1 AND platform_id = ?2",
                    CHANNEL_COLS
                ),
                params![platform.as_str(), platform_id],
                Self::row_to_channel,
            )
            .optional()?;
        Ok(result)
    }

    fn update_channel(&self, id: i64, patch: &ChannelPatch) -> Result<()> {
        let conn = self.lock()?;

        if let Some(ref title) = patch.title {
            conn.execute(
                "UPDATE channels SET title = ?1 WHERE id = ?2",
                params![title, id],
            )?;
        }
        if let Some(ref handle) = patch.handle {
            conn.execute(
                "UPDATE channels SET handle = ?1 WHERE id = ?2",
                params![handle, id],
            )?;
        }
        if let Some(ref avatar_url) = patch.avatar_url {
            conn.execute(
                "UPDATE channels SET avatar_url = ?1 WHERE id = ?2",
                params![avatar_url, id],
            )?;
        }
        if let Some(ref country) = patch.country {
            conn.execute(
                "UPDATE channels SET country = ?1 WHERE id = ?2",
                params![country, id],
            )?;
        }

        Ok(())
    }

    fn delete_channel(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM channels WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn all_channels(&self) -> Result<Vec<Channel>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare(&format!("SELECT {} FROM channels ORDER BY id", CHANNEL_COLS))?;
        let channels = stmt
            .query_map([], Self::row_to_channel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    fn channels_by_platform(&self, platform: Platform) -> Result<Vec<Channel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM channels WHERE platform = ?1 ORDER BY id",
            CHANNEL_COLS
        ))?;
        let channels = stmt
            .query_map(params![platform.as_str()], Self::row_to_channel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    fn channel_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))?;
        Ok(count)
    }

    fn channel_count_by_platform(&self, platform: Platform) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM channels WHERE platform = ?1",
            params![platform.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn sample_channels(&self, limit: usize) -> Result<Vec<Channel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM channels ORDER BY id LIMIT ?1",
            CHANNEL_COLS
        ))?;
        let channels = stmt
            .query_map(params![limit as i64], Self::row_to_channel)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    fn stale_channels(&self, cutoff: NaiveDate, limit: usize) -> Result<Vec<Channel>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM channels c
             LEFT JOIN (SELECT channel_id, MAX(snapshot_date) AS latest
                        FROM daily_stats GROUP BY channel_id) s
               ON c.id = s.channel_id
             WHERE s.latest IS NULL OR s.latest < ?1
             ORDER BY c.id LIMIT ?2",
            "c.id, c.platform, c.platform_id, c.handle, c.title, c.avatar_url, c.country, c.created_at"
        ))?;
        let channels = stmt
            .query_map(
                params![cutoff.format(DATE_FMT).to_string(), limit as i64],
                Self::row_to_channel,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(channels)
    }

    fn insert_stat(&self, stat: &DailyStat) -> Result<DailyStat> {
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR IGNORE INTO daily_stats
             (channel_id, snapshot_date, subscribers, views, videos, followers, live_views)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stat.channel_id,
                stat.snapshot_date.format(DATE_FMT).to_string(),
                stat.subscribers,
                stat.views,
                stat.videos,
                stat.followers,
                stat.live_views
            ],
        )?;

        // First write wins; re-read whatever row holds the slot.
        conn.query_row(
            &format!(
                "SELECT {} FROM daily_stats WHERE channel_id = ?1 AND snapshot_date = ?2",
                STAT_COLS
            ),
            params![stat.channel_id, stat.snapshot_date.format(DATE_FMT).to_string()],
            Self::row_to_stat,
        )
        .map_err(Into::into)
    }

    fn latest_stat(&self, channel_id: i64) -> Result<Option<DailyStat>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!(
                    "SELECT {} FROM daily_stats WHERE channel_id = ?1
                     ORDER BY snapshot_date DESC LIMIT 1",
                    STAT_COLS
                ),
                params![channel_id],
                Self::row_to_stat,
            )
            .optional()?;
        Ok(result)
    }

    fn stats_on(&self, date: NaiveDate, platform: Platform) -> Result<Vec<DailyStat>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_stats s
             JOIN channels c ON c.id = s.channel_id
             WHERE s.snapshot_date = ?1 AND c.platform = ?2
             ORDER BY s.id",
            "s.id, s.channel_id, s.snapshot_date, s.subscribers, s.views, s.videos, s.followers, s.live_views"
        ))?;
        let stats = stmt
            .query_map(
                params![date.format(DATE_FMT).to_string(), platform.as_str()],
                Self::row_to_stat,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(stats)
    }

    fn channels_with_stats_count(&self) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            "SELECT COUNT(DISTINCT channel_id) FROM daily_stats",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn insert_ranks(&self, ranks: &[RankSnapshot]) -> Result<usize> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut count = 0;

        for rank in ranks {
            count += tx.execute(
                "INSERT INTO rank_snapshots (snapshot_date, platform, metric, channel_id, rank)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    rank.snapshot_date.format(DATE_FMT).to_string(),
                    rank.platform.as_str(),
                    rank.metric,
                    rank.channel_id,
                    rank.rank
                ],
            )?;
        }

        tx.commit()?;
        Ok(count)
    }

    fn ranks_on(
        &self,
        date: NaiveDate,
        platform: Platform,
        metric: &str,
        limit: usize,
    ) -> Result<Vec<RankSnapshot>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM rank_snapshots
             WHERE snapshot_date = ?1 AND platform = ?2 AND metric = ?3
             ORDER BY rank LIMIT ?4",
            RANK_COLS
        ))?;
        let ranks = stmt
            .query_map(
                params![
                    date.format(DATE_FMT).to_string(),
                    platform.as_str(),
                    metric,
                    limit as i64
                ],
                Self::row_to_rank,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ranks)
    }

    fn bump_discovery_cursor(&self) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO meta (key, value) VALUES ('discovery_cursor', 0)
             ON CONFLICT(key) DO UPDATE SET value = value + 1",
            [],
        )?;
        let value = conn.query_row(
            "SELECT value FROM meta WHERE key = 'discovery_cursor'",
            [],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    fn discovery_cursor(&self) -> Result<i64> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'discovery_cursor'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.unwrap_or(0))
    }
}
