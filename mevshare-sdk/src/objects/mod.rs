//! Hint types pushed by the MEV-Share matchmaker.
//!
//! Every frame on the event stream carries one [`MatchMakerEvent`]. The
//! matchmaker only reveals what the sender opted into, so almost every field
//! is optional on the wire.

mod event;
mod pending_tx;

pub use event::{Log, MatchMakerEvent};
pub use pending_tx::PendingTransaction;

use serde::{Deserialize, Deserializer};

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
