//! SDK for the MEV-Share matchmaker event stream.
//!
//! - [`objects`] holds the hint types pushed by the matchmaker.
//! - [`codec`] turns one wire line into a [`MatchMakerEvent`].
//! - [`stream`] runs the background read loop and its stop handshake.
//! - `client` (behind the `client` feature) opens the HTTP stream.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod codec;
pub mod objects;
pub mod stream;

pub use objects::{Log, MatchMakerEvent, PendingTransaction};
pub use stream::{
    Event, EventReceiver, EventSender, LineSource, StreamError, Subscription, SubscriptionState,
    event_channel,
};
