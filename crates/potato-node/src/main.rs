//! Potato Node binary
//!
//! Plays one game of hot potato across a local cluster of nodes.

use std::time::Duration;

use clap::Parser;
use potato_node::{Cluster, ClusterConfig, Error, GameConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Play hot potato across a local cluster of peer nodes.
#[derive(Debug, Parser)]
#[command(name = "potato-node", version)]
struct Args {
    /// Number of nodes in the cluster
    #[arg(short, long, default_value_t = 3)]
    nodes: usize,

    /// Message carried by the token
    #[arg(short, long, default_value = "hot potato")]
    message: String,

    /// Passes before the game ends (default: $POTATO_MAX_PASSES, else unbounded)
    #[arg(long)]
    max_passes: Option<u64>,

    /// Seconds to pause on every hop (default: $POTATO_DELAY, else 0)
    #[arg(long)]
    delay: Option<f64>,

    /// Seconds to wait for the game to finish
    #[arg(long, default_value_t = 60.0)]
    timeout: f64,

    /// Seed for reproducible games
    #[arg(long)]
    seed: Option<u64>,

    /// Index of the node that starts the game
    #[arg(long, default_value_t = 0)]
    starter: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "potato_node=info,potato_protocols=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut game = GameConfig::from_env()?;
    if let Some(max_passes) = args.max_passes {
        game.max_passes = Some(max_passes);
    }
    if let Some(delay) = args.delay {
        game.delay = delay;
    }
    if game.max_passes.is_none() {
        tracing::warn!("No pass limit set, the game runs until the timeout");
    }

    let timeout = Duration::try_from_secs_f64(args.timeout)
        .map_err(|e| Error::Config(format!("timeout {}: {}", args.timeout, e)))?;

    let mut config = ClusterConfig::new(args.nodes)
        .with_game(game)
        .with_timeout(timeout);
    if let Some(seed) = args.seed {
        config = config.with_seed(seed);
    }

    tracing::info!("Starting hot potato with {} nodes", args.nodes);
    let mut cluster = Cluster::launch(config)?;
    let result = cluster.play(args.starter, args.message).await;
    cluster.shutdown().await;

    let report = result?;
    println!("{}: {}", report.node, report.status);

    Ok(())
}
