//! mevshare-watch
//!
//! Subscribes to a MEV-Share matchmaker event stream and prints every event.

mod config;
mod shutdown;
mod watcher;

use clap::Parser;
use config::file::OutputFormat;
use config::{ConfigLoader, Overrides};
use mevshare_sdk::client::SseClient;
use mevshare_sdk::event_channel;
use shutdown::shutdown_signal;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Watch the MEV-Share matchmaker event stream
#[derive(Parser, Debug)]
#[command(name = "mevshare-watch")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (defaults to ./mevshare-watch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the event stream URL
    #[arg(short, long, env = "MEVSHARE_URL")]
    url: Option<Url>,

    /// Stop after this many events
    #[arg(short = 'n', long)]
    limit: Option<u64>,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Emit logs as JSON
    #[arg(long, default_value = "false")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_tracing(args.log_json);

    tracing::info!("Starting mevshare-watch v{}", env!("CARGO_PKG_VERSION"));

    let overrides = Overrides {
        url: args.url,
        limit: args.limit,
        format: args.format,
    };
    let config = ConfigLoader::new(args.config, overrides)
        .load()
        .map_err(|e| {
            tracing::error!("Failed to load configuration: {}", e);
            e
        })?;

    let client =
        SseClient::new(config.stream_url.clone()).with_max_line_bytes(config.max_line_bytes);

    let (tx, rx) = event_channel();
    let subscription = client.subscribe(tx).await?;

    let mut stdout = std::io::stdout();
    let summary = watcher::consume(
        &subscription,
        rx,
        config.output,
        &mut stdout,
        shutdown_signal(),
    )
    .await?;

    subscription.closed().await;
    tracing::info!(
        events = summary.events,
        decode_errors = summary.decode_errors,
        "Subscription closed"
    );

    match summary.terminal_error {
        Some(e) if !summary.stop_requested => Err(e.into()),
        _ => Ok(()),
    }
}

/// Initialize the tracing subscriber with environment-based filtering.
///
/// Logs go to stderr so stdout only carries events.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
