//! glimpse viewer — entry point.
//!
//! ```text
//! glimpse-view                    Poll the default sharer
//! glimpse-view --server <url>     Sharer base URL (overrides config)
//! glimpse-view --output <path>    Where the latest frame is written
//! glimpse-view --dry-run          Log frames instead of writing them
//! glimpse-view --config <path>    Use custom config TOML
//! glimpse-view --gen-config       Dump default config and exit
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use glimpse_core::{ConsumerPollLoop, RenderSink, termination_signal};
use glimpse_view::config::ViewConfig;
use glimpse_view::connection::HttpFrameSource;
use glimpse_view::display::{FileSink, LogSink};

const STATS_EVERY: Duration = Duration::from_secs(30);

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "glimpse-view", about = "glimpse screen viewer")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "glimpse-view.toml")]
    config: PathBuf,

    /// Sharer base URL (overrides config). Example: http://192.168.1.100:8080
    #[arg(short, long)]
    server: Option<String>,

    /// Output file for the latest frame (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log received frames instead of writing them to disk.
    #[arg(long)]
    dry_run: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&ViewConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = ViewConfig::load(&cli.config);
    if let Some(url) = cli.server {
        config.network.server_url = url;
    }
    if let Some(path) = cli.output {
        config.output.path = path;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("glimpse-view v{}", env!("CARGO_PKG_VERSION"));

    let source = Arc::new(HttpFrameSource::new(&config)?);
    let sink: Arc<dyn RenderSink> = if cli.dry_run {
        info!("dry run: frames are logged, not written");
        Arc::new(LogSink)
    } else {
        let file = FileSink::new(config.output.path.clone());
        info!("writing frames to {}", file.path().display());
        Arc::new(file)
    };

    let poll = ConsumerPollLoop::new(source, sink, config.to_poll_config());

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        termination_signal().await;
        info!("termination requested");
        trigger.cancel();
    });

    // Periodic progress line while polling.
    let mut stats_rx = poll.stats_receiver();
    let reporter_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut every = tokio::time::interval(STATS_EVERY);
        every.tick().await;
        loop {
            tokio::select! {
                _ = reporter_cancel.cancelled() => break,
                _ = every.tick() => {}
            }
            let stats = stats_rx.borrow_and_update().clone();
            info!(
                fetches = stats.fetches,
                rendered = stats.rendered,
                skipped = stats.skipped_busy,
                failures = stats.failures,
                "polling"
            );
        }
    });

    let stats = poll.run(cancel).await;
    info!(
        rendered = stats.rendered,
        unchanged = stats.unchanged,
        empty = stats.empty,
        "bye"
    );
    Ok(())
}
