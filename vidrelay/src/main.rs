mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use vidrelay_api::AppState;
use vidrelay_core::{bootstrap::load_config, logging, TracingObserver};

use server::RelayServer;

#[derive(Parser, Debug)]
#[command(name = "vidrelay")]
#[command(about = "Same-origin relay for plain-HTTP video streams", long_about = None)]
struct Args {
    /// Path to a YAML config file
    #[arg(short, long, env = "VIDRELAY_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Load and validate configuration
    let config = load_config(args.config.as_deref())?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("vidrelay starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Relay path: {}", config.relay.path);

    // 3. Build the relay and serve
    let state = AppState::new(&config.relay, Arc::new(TracingObserver))?;
    RelayServer::new(config, state).start().await
}
