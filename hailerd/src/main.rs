//! hailerd -- multi-network IRC announce relay daemon.
//!
//! Maintains one persistent connection per configured network and fans
//! announce commands received on the control socket out to channels.
//!
//! # Usage
//!
//! ```bash
//! # Run with the default config (~/.config/hailerd/config.toml)
//! cargo run --bin hailerd
//!
//! # Run with an explicit config file and control address
//! cargo run --bin hailerd -- --config ./hailerd.toml --control 127.0.0.1:7330
//!
//! # Or via environment variable
//! HAILERD_CONTROL=127.0.0.1:7330 cargo run --bin hailerd
//! ```

use clap::Parser;
use hailerd::chat::irc::IrcNetwork;
use hailerd::config::{DaemonCliArgs, DaemonConfig};
use hailerd::supervisor;

#[tokio::main]
async fn main() {
    let cli = DaemonCliArgs::parse();

    // Load config from CLI args + config file + env vars + defaults.
    let config = match DaemonConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize tracing with the resolved log level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        control = %config.control_addr,
        networks = config.networks.len(),
        "starting hailer daemon"
    );

    if let Err(e) = supervisor::run(&config, |net| IrcNetwork::new(net.clone())).await {
        tracing::error!(error = %e, "daemon failed to start");
        std::process::exit(1);
    }

    tracing::info!("exiting");
}
