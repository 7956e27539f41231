//! Subscription client for the matchmaker event stream.

use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use tracing::{error, info};
use url::Url;

use super::{ClientError, ResponseLines};
use crate::stream::{DEFAULT_MAX_LINE_BYTES, EventSender, Subscription};

/// Public Flashbots MEV-Share event stream.
pub const DEFAULT_STREAM_URL: &str = "https://mev-share.flashbots.net";

/// Opens subscriptions to a matchmaker event stream.
///
/// Every call to [`subscribe`](Self::subscribe) opens its own HTTP
/// connection and engine.
#[derive(Debug, Clone)]
pub struct SseClient {
    http: Client,
    base_url: Url,
    max_line_bytes: usize,
}

impl SseClient {
    /// Create a new `SseClient` for the stream at `base_url`.
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure a proxy).
    ///
    /// Do not set a total request timeout; it would cut the stream.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Override the longest line the stream may carry.
    pub fn with_max_line_bytes(mut self, max_line_bytes: usize) -> Self {
        self.max_line_bytes = max_line_bytes;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET {base_url}` and start delivering events into `events`.
    ///
    /// Fails without starting an engine if the request cannot be sent or
    /// the server answers with a non-2xx status. On success the engine owns
    /// `events` and closes it when the subscription ends.
    pub async fn subscribe(&self, events: EventSender) -> Result<Subscription, ClientError> {
        let resp = self
            .http
            .get(self.base_url.clone())
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.base_url, error = %e, "Failed to open event stream");
                e
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(url = %self.base_url, %status, "Event stream rejected");
            return Err(ClientError::Api { status, body });
        }

        info!(url = %self.base_url, "Subscribed to event stream");
        let source = ResponseLines::new(resp, self.max_line_bytes);
        Ok(Subscription::spawn(source, events))
    }
}
