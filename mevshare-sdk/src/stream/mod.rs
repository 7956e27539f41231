//! The subscription engine.
//!
//! A [`Subscription`] owns a background task that reads lines from a
//! [`LineSource`], skips keep-alives, decodes each frame and hands the
//! result to the consumer over a single-slot channel.
//!
//! # Shutdown
//!
//! 1. The consumer calls [`Subscription::stop`] (any number of times).
//! 2. The engine observes the request at its next suspension point (line
//!    read or handoff), drops the item it was holding, and closes.
//! 3. Closing drops the line source and the only [`EventSender`], so the
//!    consumer's `recv()` returns `None`.
//!
//! The consumer should keep calling `recv()` until it sees `None`.

mod lines;
mod subscription;

pub use lines::{DEFAULT_MAX_LINE_BYTES, LineBuffer, LineSource};
pub use subscription::{Subscription, SubscriptionState};

use crate::objects::MatchMakerEvent;
use thiserror::Error;
use tokio::sync::mpsc;

/// One delivery from the engine.
pub type Event = Result<MatchMakerEvent, StreamError>;

/// Capacity of the delivery channel.
///
/// A single slot keeps the engine at most one event ahead of the consumer.
pub const EVENT_CHANNEL_CAPACITY: usize = 1;

/// Sender handle for delivered events. Owned by the engine.
pub type EventSender = mpsc::Sender<Event>;
/// Receiver handle for delivered events. Owned by the consumer.
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create a new delivery channel.
///
/// Returns a (sender, receiver) pair. Pass the sender to
/// [`Subscription::spawn`] (or `SseClient::subscribe`) and keep the
/// receiver.
///
/// The channel holds one event, so it is not a strict rendezvous: the engine
/// can have one event waiting in the slot and be holding the next one while
/// the consumer is busy. Events already in the slot when `stop()` takes
/// effect are still received before `None`.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::channel(EVENT_CHANNEL_CAPACITY)
}

/// Errors delivered on the event channel.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A frame was not a valid event. The subscription keeps running.
    #[error("malformed event frame: {0}")]
    Decode(#[from] serde_json::Error),

    /// The server closed the stream.
    #[error("event stream ended")]
    EndOfStream,

    /// A line grew past the configured limit without a terminator.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// Reading the underlying byte stream failed.
    #[error("stream read error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP body failed mid-stream.
    #[cfg(feature = "client")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StreamError {
    /// Returns `true` if this error ends the subscription.
    ///
    /// Terminal errors are always the last delivery before the channel
    /// closes.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Decode(_))
    }
}
