//! The consumer side of a subscription.
//!
//! Reads the event channel until the engine closes it, printing every event,
//! and asks the engine to stop on shutdown or once the event limit is hit.
//! It never walks away from the channel early: after `stop()` it keeps
//! receiving until `None`.

use std::fmt::Write as _;
use std::future::Future;
use std::io::Write;

use mevshare_sdk::{EventReceiver, MatchMakerEvent, StreamError, Subscription};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{error, info, warn};

use crate::config::OutputOptions;
use crate::config::file::OutputFormat;

/// What happened during one watch run.
#[derive(Debug, Default)]
pub struct WatchSummary {
    /// Events written to the output.
    pub events: u64,
    /// Frames that failed to decode.
    pub decode_errors: u64,
    /// `true` if the watcher asked the engine to stop.
    pub stop_requested: bool,
    /// The error that ended the stream, if the server side ended it.
    pub terminal_error: Option<StreamError>,
}

/// Drain `events` until the subscription closes.
pub async fn consume<W, F>(
    subscription: &Subscription,
    mut events: EventReceiver,
    options: OutputOptions,
    out: &mut W,
    shutdown: F,
) -> anyhow::Result<WatchSummary>
where
    W: Write,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut summary = WatchSummary::default();

    loop {
        tokio::select! {
            _ = &mut shutdown, if !summary.stop_requested => {
                subscription.stop();
                summary.stop_requested = true;
            }

            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };

                match event {
                    Ok(event) => {
                        // Events still in the channel after a stop are drained
                        // but not printed.
                        if summary.stop_requested {
                            continue;
                        }
                        writeln!(out, "{}", render(&event, options.format)?)?;
                        summary.events += 1;

                        if options.limit.is_some_and(|limit| summary.events >= limit) {
                            info!(events = summary.events, "Event limit reached, stopping subscription");
                            subscription.stop();
                            summary.stop_requested = true;
                        }
                    }
                    Err(e) if e.is_terminal() => {
                        error!(error = %e, "Event stream terminated");
                        summary.terminal_error = Some(e);
                    }
                    Err(e) => {
                        warn!(error = %e, "Skipping malformed event");
                        summary.decode_errors += 1;
                    }
                }
            }
        }
    }

    out.flush()?;
    Ok(summary)
}

/// Render one event in the configured format.
pub fn render(event: &MatchMakerEvent, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(event)?),
        OutputFormat::Text => Ok(render_text(event, OffsetDateTime::now_utc())),
    }
}

fn render_text(event: &MatchMakerEvent, received_at: OffsetDateTime) -> String {
    let timestamp = received_at.format(&Rfc3339).unwrap_or_default();
    let mut text = format!(
        "{timestamp} {} txs={} logs={}",
        event.hash,
        event.txs.len(),
        event.logs.len()
    );
    if let Some(price) = event.mev_gas_price {
        let _ = write!(text, " mev_gas_price={price}");
    }
    if let Some(gas) = event.gas_used {
        let _ = write!(text, " gas_used={gas}");
    }

    for tx in &event.txs {
        text.push_str("\n  tx");
        if let Some(hash) = tx.hash {
            let _ = write!(text, " hash={hash}");
        }
        if let Some(to) = tx.to {
            let _ = write!(text, " to={to}");
        }
        if !tx.function_selector.is_zero() {
            let _ = write!(text, " selector={}", tx.function_selector);
        }
        if !tx.call_data.is_empty() {
            let _ = write!(text, " call_data={}B", tx.call_data.len());
        }
    }
    text
}
