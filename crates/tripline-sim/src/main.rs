//! Tripline command-line driver.
//!
//! # Usage
//!
//! ```bash
//! # Scripted scenario against the in-process relay
//! tripline-sim --peers 4 --seed 7
//!
//! # Live session: every stdin line is sent to the open thread
//! tripline-sim --endpoint wss://example.org/realtime --user u1 --token "$TOKEN" --peer u2
//! ```

mod live;
mod scenario;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Tripline realtime sync driver
#[derive(Parser, Debug)]
#[command(name = "tripline-sim")]
#[command(about = "Drive the Tripline sync layer against a simulated or live server")]
#[command(version)]
struct Args {
    /// Realtime endpoint to connect to (enables live mode)
    ///
    /// If not provided, runs the scripted scenario with an in-process relay.
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Tolerance when matching a sent message to its server echo
    #[arg(long, default_value = "10000")]
    reconcile_window_ms: u64,

    /// Simulated peers
    #[arg(long, default_value = "3")]
    peers: usize,

    /// Seed for simulated timing and chaos
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Probability that the relay delivers an echo twice
    #[arg(long, default_value = "0.2")]
    duplicate_rate: f64,

    /// Local user id (live mode)
    #[arg(long, default_value = "anonymous")]
    user: String,

    /// Bearer token (live mode)
    #[arg(long, env = "TRIPLINE_TOKEN")]
    token: Option<String>,

    /// Peer to open a direct thread with (live mode)
    #[arg(long)]
    peer: Option<String>,

    /// Community to open instead of a direct thread (live mode)
    #[arg(long, conflicts_with = "peer")]
    community: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let reconcile_window = Duration::from_millis(args.reconcile_window_ms);

    match args.endpoint {
        Some(endpoint) => {
            let config = live::LiveConfig {
                endpoint,
                user: args.user,
                token: args.token,
                peer: args.peer,
                community: args.community,
                reconcile_window,
            };
            live::run(config).await?;
        },
        None => {
            let config = scenario::ScenarioConfig {
                peers: args.peers,
                seed: args.seed,
                duplicate_rate: args.duplicate_rate,
                reconcile_window,
            };
            let summary = scenario::run(&config).await?;
            summary.log();
        },
    }

    Ok(())
}
