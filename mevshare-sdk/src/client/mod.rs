//! HTTP client for the matchmaker event stream.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the event types and the engine do not pull in `reqwest`.

mod response_lines;
mod sse;

pub use response_lines::ResponseLines;
pub use sse::{DEFAULT_STREAM_URL, SseClient};

use reqwest::StatusCode;

/// Errors produced while opening a subscription.
///
/// Failures after the stream is open are delivered on the event channel as
/// [`StreamError`](crate::StreamError) instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure before a response arrived.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },
}
