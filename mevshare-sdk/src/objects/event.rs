use alloy_primitives::{Address, B256, Bytes, U256};
use serde::{Deserialize, Serialize};

use super::{PendingTransaction, null_as_default};

/// One notification from the matchmaker: a pending transaction or bundle,
/// described only by the hints its sender chose to share.
///
/// ```json
/// {"hash":"0x42bf...","logs":[...],"txs":[...],"mevGasPrice":"0x3b9aca00","gasUsed":"0x5208"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchMakerEvent {
    /// Transaction or bundle hash.
    pub hash: B256,
    /// Logs the transaction is expected to emit.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub logs: Vec<Log>,
    /// Per-transaction hints. Bundles carry one entry per transaction.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub txs: Vec<PendingTransaction>,
    /// Gas price paid to the builder on top of the base fee.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mev_gas_price: Option<U256>,
    /// Gas consumed by the transaction or bundle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<U256>,
}

/// A log entry revealed by the matchmaker.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Log {
    #[serde(default)]
    pub address: Address,
    #[serde(default, deserialize_with = "null_as_default")]
    pub topics: Vec<B256>,
    #[serde(default, skip_serializing_if = "<[u8]>::is_empty")]
    pub data: Bytes,
}
