//! Waypoint CLI entry point

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use config::WaypointConfig;

#[derive(Parser)]
#[command(name = "waypoint")]
#[command(about = "Live breadth-first search over an editable graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./waypoint.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP + WebSocket server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
    /// Run one traversal on the default graph and print its events
    Run {
        /// Node to start from
        start: String,

        /// Node to search for
        end: String,

        /// Remove this node before searching (repeatable)
        #[arg(long = "remove", value_name = "NODE")]
        remove: Vec<String>,

        /// Add an edge written as A-B before searching (repeatable)
        #[arg(long = "edge", value_name = "A-B")]
        edges: Vec<String>,

        /// Delay after each discovery, in milliseconds
        #[arg(long)]
        pacing_ms: Option<u64>,
    },
    /// Print the default graph
    Show,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "waypoint={0},waypoint_core={0},waypoint_traversal={0},waypoint_server={0}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = WaypointConfig::load(cli.config.as_deref())?;
    tracing::debug!("Configuration: {:?}", config);

    match cli.command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            tracing::info!("Waypoint v{}", env!("CARGO_PKG_VERSION"));
            commands::serve(config).await
        }
        Commands::Run {
            start,
            end,
            remove,
            edges,
            pacing_ms,
        } => {
            if let Some(pacing_ms) = pacing_ms {
                config.traversal.pacing_ms = pacing_ms;
            }
            commands::run(config, &start, &end, &remove, &edges).await
        }
        Commands::Show => commands::show().await,
        Commands::Version => {
            println!("Waypoint v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
