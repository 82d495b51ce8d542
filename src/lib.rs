//! # channelrank
//!
//! A channel discovery, ingestion, and daily-ranking engine for
//! social-video platforms.
//!
//! ## Architecture
//!
//! channelrank follows a modular pipeline architecture:
//!
//! ```text
//! Connector → Discovery → Store → Stats → Ranking
//! ```
//!
//! - [`connector`]: Platform API clients behind a shared rate gate
//! - [`discovery`]: Search-driven channel discovery (rapid and standard modes)
//! - [`store`]: SQLite persistence layer
//! - [`ranking`]: Dense daily ranks from counter snapshots
//!
//! ## Quick Start
//!
//! ```bash
//! # Ingest a channel by handle
//! channelrank ingest youtube @mkbhd
//!
//! # Run every discovery method at once
//! channelrank mass-discovery
//!
//! # Snapshot all channels and show today's leaderboard
//! channelrank snapshot-all
//! channelrank ranks youtube
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`cli`]: Command-line interface definitions
//! - [`domain`]: Core domain models (Channel, DailyStat, RankSnapshot)
//! - [`connector`]: Platform connectors and the politeness gate
//! - [`discovery`]: Discovery engine, categories, and seed lists
//! - [`scheduler`]: Daily snapshot-then-rank ingestion
//! - [`store`]: Database persistence

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, connectors, discovery engine, scheduler.
pub mod app;

/// Channel upserts and duplicate cleanup.
///
/// Two write paths with different overwrite rules:
/// - full upsert (resolved data wins)
/// - identity-only upsert (never clobbers existing fields)
pub mod channels;

/// Command-line interface using clap.
///
/// Defines the CLI structure and subcommands:
/// - `ingest <platform> <handle-or-url>` - Resolve and store a channel
/// - `discover <term>` - One-off discovery search
/// - `mass-discovery` - All discovery methods concurrently
/// - `ranks <platform>` - Daily leaderboard
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/channelrank/config.toml`, supporting:
/// - API credentials per platform
/// - Rate-gate and discovery tuning overrides
pub mod config;

/// Platform connectors.
///
/// - [`Connector`](connector::Connector): Async trait for platform APIs
/// - [`RateGate`](connector::RateGate): Shared concurrency cap, retry, timeout
/// - YouTube Data API v3 and Twitch Helix implementations
pub mod connector;

/// Background daemon for scheduled discovery and ingestion.
///
/// Provides cron-style background processing:
/// - `channelrank daemon start` - Start the background worker
/// - `channelrank daemon stop` - Stop the daemon
/// - `channelrank daemon status` - Check if daemon is running
pub mod daemon;

/// Search-driven channel discovery.
///
/// Rapid mode fans out dozens of category searches while the corpus is
/// small; standard mode runs one cursor-advanced query per day.
pub mod discovery;

/// Core domain models.
///
/// - [`Channel`](domain::Channel): A creator account on one platform
/// - [`DailyStat`](domain::DailyStat): One day's counter snapshot
/// - [`RankSnapshot`](domain::RankSnapshot): A channel's dense rank for a day
pub mod domain;

/// Daily rank computation.
pub mod ranking;

/// Snapshot-then-rank ingestion across all platforms.
pub mod scheduler;

/// Idempotent daily counter snapshots.
pub mod stats;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
