use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use channelrank::app::AppContext;
use channelrank::cli::{commands, Cli, Commands, DaemonAction};
use channelrank::config::Config;
use channelrank::daemon::{self, Daemon, DaemonConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Ingest {
            platform,
            handle_or_url,
        } => {
            let ctx = AppContext::build(&config)?;
            commands::ingest(&ctx, platform, &handle_or_url).await?;
        }
        Commands::Snapshot { channel_id } => {
            let ctx = AppContext::build(&config)?;
            commands::snapshot(&ctx, channel_id).await?;
        }
        Commands::SnapshotAll => {
            let ctx = AppContext::build(&config)?;
            commands::snapshot_all(&ctx).await?;
        }
        Commands::Discover { term } => {
            let ctx = AppContext::build(&config)?;
            commands::discover(&ctx, &term).await?;
        }
        Commands::MassDiscovery => {
            let ctx = AppContext::build(&config)?;
            commands::mass_discovery(&ctx).await?;
        }
        Commands::Seed => {
            let ctx = AppContext::build(&config)?;
            commands::seed(&ctx).await?;
        }
        Commands::BatchSnapshot { limit } => {
            let ctx = AppContext::build(&config)?;
            commands::batch_snapshot(&ctx, limit).await?;
        }
        Commands::Cleanup => {
            let ctx = AppContext::build(&config)?;
            commands::cleanup(&ctx)?;
        }
        Commands::Ranks {
            platform,
            date,
            limit,
        } => {
            let ctx = AppContext::build(&config)?;
            commands::ranks(&ctx, platform, date, limit)?;
        }
        Commands::Stats => {
            let ctx = AppContext::build(&config)?;
            commands::stats(&ctx)?;
        }
        Commands::Daemon { action } => match action {
            DaemonAction::Start { log, foreground } => {
                if Daemon::is_running() {
                    println!("Daemon is already running");
                    return Ok(());
                }

                if foreground {
                    let ctx = Arc::new(AppContext::build(&config)?);
                    let daemon = Daemon::new(
                        ctx,
                        DaemonConfig {
                            tick_mins: config.daemon.tick_mins,
                            log_file: log,
                        },
                    );
                    daemon.run().await?;
                } else {
                    // Detach by re-executing ourselves in foreground mode
                    let exe = std::env::current_exe()?;
                    let mut cmd = std::process::Command::new(exe);
                    cmd.args(["daemon", "start", "--foreground"]);
                    if let Some(ref log_path) = log {
                        cmd.arg("--log").arg(log_path);
                    }
                    let child = cmd
                        .stdin(std::process::Stdio::null())
                        .stdout(std::process::Stdio::null())
                        .stderr(std::process::Stdio::null())
                        .spawn()?;
                    println!("Daemon started (PID: {})", child.id());
                }
            }
            DaemonAction::Stop => match daemon::stop_daemon() {
                Ok(()) => println!("Daemon stopped"),
                Err(e) => println!("{}", e),
            },
            DaemonAction::Status => {
                println!("{}", daemon::daemon_status());
            }
        },
    }

    Ok(())
}
