use alloy_primitives::{Address, B256, Bytes, Selector, hex};
use serde::{Deserialize, Serialize};

/// Hints about a single pending transaction.
///
/// `hash` and `to` are decoded strictly. `functionSelector` and `callData`
/// are hint-quality data from an external feed: an empty string, a bare
/// `0x`, malformed hex, or a selector shorter than four bytes all decode to
/// "no value" instead of failing the surrounding event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawPendingTransaction")]
pub struct PendingTransaction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<B256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// All zero when the selector was not shared.
    #[serde(skip_serializing_if = "Selector::is_zero")]
    pub function_selector: Selector,
    /// Empty when the call data was not shared.
    #[serde(skip_serializing_if = "<[u8]>::is_empty")]
    pub call_data: Bytes,
}

/// Wire shape before the lenient hex fields are resolved.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPendingTransaction {
    #[serde(default)]
    hash: Option<B256>,
    #[serde(default)]
    to: Option<Address>,
    #[serde(default)]
    function_selector: Option<String>,
    #[serde(default)]
    call_data: Option<String>,
}

impl From<RawPendingTransaction> for PendingTransaction {
    fn from(raw: RawPendingTransaction) -> Self {
        let function_selector = decode_hex_lenient(raw.function_selector.as_deref())
            .and_then(|bytes| bytes.get(..4).and_then(|head| <[u8; 4]>::try_from(head).ok()))
            .map(Selector::from)
            .unwrap_or_default();

        let call_data = decode_hex_lenient(raw.call_data.as_deref())
            .map(Bytes::from)
            .unwrap_or_default();

        Self {
            hash: raw.hash,
            to: raw.to,
            function_selector,
            call_data,
        }
    }
}

/// Decode an optional hex string, mapping every unusable input to `None`.
fn decode_hex_lenient(value: Option<&str>) -> Option<Vec<u8>> {
    let value = value?;
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    // `hex::decode` accepts its own `0x`, so a doubled prefix must be
    // rejected here.
    if digits.is_empty() || digits.starts_with("0x") || digits.starts_with("0X") {
        return None;
    }
    hex::decode(digits).ok()
}
