//! # agenda-sync
//!
//! Command-line driver for the agenda-sync protocol engine.
//!
//! ## Commands
//!
//! - `simulate`: Run a full sync against an in-process watch
//! - `preview`: Print the list a sync would send
//! - `wire-time`: Encode an instant in the watch time format
//!
//! ## Example
//!
//! ```bash
//! # Sync a file of items, nacking every third message
//! agenda-sync simulate --items agenda.json --nack-every 3
//!
//! # Show what would be sent, in order
//! agenda-sync preview --items agenda.json
//!
//! # Encode a time as the watch stores it
//! agenda-sync wire-time 2024-03-05T14:30:00Z --tz +01:00
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;

use commands::{preview, simulate, wire_time};
use config::Config;

/// Command-line driver for the agenda-sync protocol engine.
#[derive(Parser, Debug)]
#[command(name = "agenda-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./agenda.toml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sync an item file to a simulated watch
    Simulate {
        /// JSON file with `items` and/or calendar `events`
        #[arg(long, short)]
        items: PathBuf,

        /// Nack every Nth message the watch receives
        #[arg(long)]
        nack_every: Option<u32>,

        /// Lose the ack of the first item; the link reports a nack late
        #[arg(long)]
        drop_ack: bool,

        /// Version the simulated watch reports
        #[arg(long, default_value_t = simulate::WATCH_VERSION)]
        watch_version: u8,

        /// Give up after this many seconds
        #[arg(long, default_value = "30")]
        timeout_secs: u64,
    },

    /// Print the aggregated list a sync would send
    Preview {
        /// JSON file with `items` and/or calendar `events`
        #[arg(long, short)]
        items: PathBuf,

        /// Evaluate expiry at this RFC 3339 instant instead of now
        #[arg(long)]
        now: Option<String>,
    },

    /// Encode an RFC 3339 instant in the watch time format
    WireTime {
        /// Instant to encode, e.g. 2024-03-05T14:30:00Z
        instant: String,

        /// Zone to evaluate in: local, UTC, an offset like +02:00 or a name like Europe/Paris
        #[arg(long, default_value = "local")]
        tz: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate {
            items,
            nack_every,
            drop_ack,
            watch_version,
            timeout_secs,
        } => {
            let options = simulate::Options {
                nack_every,
                drop_ack,
                watch_version,
                timeout: std::time::Duration::from_secs(timeout_secs),
            };
            simulate::run(&config, &items, options).await?;
        }
        Commands::Preview { items, now } => {
            preview::run(&config, &items, now.as_deref())?;
        }
        Commands::WireTime { instant, tz } => {
            wire_time::run(&instant, &tz)?;
        }
    }

    Ok(())
}

/// Install the fmt subscriber. `RUST_LOG` wins over `--log-level`.
fn setup_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();
}
