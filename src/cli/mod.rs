pub mod commands;

use clap::{Parser, Subcommand};

use crate::domain::Platform;

#[derive(Parser)]
#[command(name = "channelrank")]
#[command(about = "Channel discovery, ingestion, and daily ranking", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a handle or URL and ingest the channel
    Ingest {
        /// Platform the channel lives on (youtube, twitch)
        platform: Platform,
        /// Handle (@name), channel URL, or free-text query
        handle_or_url: String,
    },
    /// Snapshot today's counters for one channel
    Snapshot {
        /// Channel row id
        channel_id: i64,
    },
    /// Snapshot today's counters for every known channel
    SnapshotAll,
    /// Run one discovery search for a term
    Discover {
        /// Search term
        term: String,
    },
    /// Run all discovery methods concurrently
    MassDiscovery,
    /// Seed the database with the curated popular-channel list
    Seed,
    /// Snapshot channels with stale or missing counters
    BatchSnapshot {
        /// Maximum channels to process
        #[arg(short, long, default_value_t = 50)]
        limit: usize,
    },
    /// Remove channels that duplicate another row's handle
    Cleanup,
    /// Show a platform's daily leaderboard
    Ranks {
        /// Platform to show (youtube, twitch)
        platform: Platform,
        /// Date (YYYY-MM-DD), defaults to today
        #[arg(short, long)]
        date: Option<chrono::NaiveDate>,
        /// Number of entries
        #[arg(short, long, default_value_t = 25)]
        limit: usize,
    },
    /// Show discovery progress and connector status
    Stats,
    /// Background daemon for scheduled discovery and ingestion
    Daemon {
        #[command(subcommand)]
        action: DaemonAction,
    },
}

#[derive(Subcommand)]
pub enum DaemonAction {
    /// Start the background daemon
    Start {
        /// Log file path (default: stdout)
        #[arg(short, long)]
        log: Option<std::path::PathBuf>,

        /// Run in foreground (don't detach)
        #[arg(short, long)]
        foreground: bool,
    },
    /// Stop the running daemon
    Stop,
    /// Check daemon status
    Status,
}
