use chrono::{NaiveDate, Utc};

use crate::app::{AppContext, Result};
use crate::domain::Platform;
use crate::store::Store;

pub async fn ingest(ctx: &AppContext, platform: Platform, input: &str) -> Result<()> {
    let connector = ctx.connector(platform)?;

    let resolved = ctx
        .gate
        .call(|| connector.resolve_and_hydrate(input))
        .await?;
    let Some(identity) = resolved else {
        println!("No channel found for '{}'", input);
        return Ok(());
    };

    let channel = ctx.channels.upsert_full(&identity)?;
    println!("Ingested {} ({})", channel.title, channel.handle);

    let counters = ctx
        .gate
        .call(|| connector.fetch_counters(&channel.platform_id))
        .await?;
    let stat = ctx.stats.snapshot_today(channel.id, &counters)?;
    let metric = platform.ranking_metric();
    println!("  {}: {}", metric, stat.metric(metric));

    Ok(())
}

pub async fn snapshot(ctx: &AppContext, channel_id: i64) -> Result<()> {
    let stat = ctx.scheduler.snapshot_one(channel_id).await?;
    println!(
        "Snapshot for channel {} on {}: subscribers {}, views {}, followers {}",
        channel_id, stat.snapshot_date, stat.subscribers, stat.views, stat.followers
    );
    Ok(())
}

pub async fn snapshot_all(ctx: &AppContext) -> Result<()> {
    let total = ctx.store.channel_count()?;
    if total == 0 {
        println!("No channels to snapshot");
        return Ok(());
    }

    println!("Snapshotting {} channels...", total);
    let stored = ctx.scheduler.snapshot_all().await?;
    println!("Snapshot complete: {}/{} channels stored", stored, total);
    Ok(())
}

pub async fn discover(ctx: &AppContext, term: &str) -> Result<()> {
    let discovered = ctx.engine.opportunistic(term).await?;
    println!("Discovered {} new channels for '{}'", discovered, term);
    Ok(())
}

pub async fn mass_discovery(ctx: &AppContext) -> Result<()> {
    println!("Running mass discovery (seed + trending + rapid + related)...");
    let report = ctx.engine.mass_discovery().await?;
    println!("  seeded:   {}", report.seeded);
    println!("  trending: {}", report.trending);
    println!("  rapid:    {}", report.parallel);
    println!("  related:  {}", report.related);
    println!("Mass discovery complete. Total channels: {}", report.total_channels);
    Ok(())
}

pub async fn seed(ctx: &AppContext) -> Result<()> {
    println!("Seeding curated popular channels...");
    let added = ctx.engine.seed_popular().await?;
    println!("Seeding complete: {} channels added", added);
    Ok(())
}

pub async fn batch_snapshot(ctx: &AppContext, limit: usize) -> Result<()> {
    let report = ctx.engine.batch_snapshot(limit).await?;
    println!(
        "Batch snapshot complete: processed {}/{} stale channels",
        report.processed, report.selected
    );
    Ok(())
}

pub fn cleanup(ctx: &AppContext) -> Result<()> {
    let report = ctx.channels.cleanup_duplicates()?;
    println!(
        "Cleanup complete: {} duplicates found, {} removed",
        report.duplicates_found, report.duplicates_removed
    );
    Ok(())
}

pub fn ranks(
    ctx: &AppContext,
    platform: Platform,
    date: Option<NaiveDate>,
    limit: usize,
) -> Result<()> {
    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    let board = ctx.ranking.leaderboard(date, platform, limit)?;

    if board.is_empty() {
        println!("No ranks for {} on {}", platform, date);
        return Ok(());
    }

    println!("{} leaderboard for {} (by {}):", platform, date, platform.ranking_metric());
    for entry in board {
        let label = match ctx.store.get_channel(entry.channel_id)? {
            Some(channel) => format!("{} ({})", channel.title, channel.handle),
            None => format!("channel {}", entry.channel_id),
        };
        println!("  #{:<3} {}", entry.rank, label);
    }
    Ok(())
}

pub fn stats(ctx: &AppContext) -> Result<()> {
    let stats = ctx.engine.discovery_stats()?;

    println!("Channels: {}", stats.total_channels);
    println!("  youtube: {}", stats.youtube_channels);
    println!("  twitch:  {}", stats.twitch_channels);
    println!("Channels with stats: {}", stats.channels_with_stats);
    if stats.rapid_mode {
        println!(
            "Discovery mode: rapid ({}/{} channels)",
            stats.total_channels, stats.rapid_threshold
        );
    } else {
        println!(
            "Discovery mode: standard ({} daily queries completed)",
            stats.queries_completed
        );
    }

    println!("Connectors:");
    for platform in Platform::ALL {
        if let Ok(connector) = ctx.connector(platform) {
            let diag = connector.diagnostics();
            let status = if diag.configured { "configured" } else { "keyless" };
            println!("  {}: {} ({})", diag.platform, status, diag.endpoint);
        }
    }
    Ok(())
}
