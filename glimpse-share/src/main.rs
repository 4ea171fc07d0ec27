//! glimpse sharer — entry point.
//!
//! ```text
//! glimpse-share                   Serve with defaults
//! glimpse-share --bind <addr>     Override the listen address
//! glimpse-share --config <path>   Load a custom config TOML
//! glimpse-share --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use glimpse_core::ShutdownCoordinator;
use glimpse_share::config::ShareConfig;
use glimpse_share::service::ShareService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "glimpse-share", about = "glimpse screen sharer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "glimpse-share.toml")]
    config: PathBuf,

    /// Listen address (overrides config). Example: 0.0.0.0:8080
    #[arg(short, long)]
    bind: Option<String>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ShareConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ShareConfig::load(&cli.config);
    if let Some(addr) = cli.bind {
        config.network.bind_address = addr;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("glimpse-share v{}", env!("CARGO_PKG_VERSION"));
    info!("bind address: {}", config.network.bind_address);
    info!("capture interval: {} ms", config.capture.interval_ms);
    info!("monitor: {}", config.capture.monitor_index);

    let grace = config.shutdown_grace();
    let service = ShareService::new(config);

    // SIGINT/SIGTERM: stop capture loops, then the server.
    let coordinator = ShutdownCoordinator::new(Arc::clone(service.controller()), grace);
    let shutdown = tokio::spawn(coordinator.run());

    let served = service.run().await;
    if served.is_err() {
        // The server never came up; release the capture side too.
        service.controller().shutdown(grace).await;
    }
    match shutdown.await {
        Ok(true) | Err(_) => {}
        Ok(false) => warn!("capture loops did not stop within {grace:?}"),
    }
    served?;

    info!("bye");
    Ok(())
}
