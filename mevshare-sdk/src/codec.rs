//! Line framing for the matchmaker event stream.
//!
//! The stream is newline-delimited text. Each event is a single line,
//! usually prefixed with [`DATA_PREFIX`]. The server interleaves
//! [`KEEP_ALIVE`] heartbeats and blank lines, which carry nothing.

use crate::objects::MatchMakerEvent;

/// Prefix of an event frame.
pub const DATA_PREFIX: &str = "data: ";

/// Heartbeat line sent while the feed is idle.
pub const KEEP_ALIVE: &str = ":ping";

/// Returns `true` for lines that are protocol noise rather than events.
pub fn is_noise(line: &str) -> bool {
    line.is_empty() || line == KEEP_ALIVE
}

/// Decode one event frame.
///
/// The [`DATA_PREFIX`] is stripped when present; a line without it is
/// decoded as a bare JSON payload.
pub fn decode_frame(line: &str) -> Result<MatchMakerEvent, serde_json::Error> {
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    serde_json::from_str(payload)
}

/// Encode an event as a single `data: {...}` frame, without the trailing
/// newline.
pub fn encode_frame(event: &MatchMakerEvent) -> Result<String, serde_json::Error> {
    Ok(format!("{DATA_PREFIX}{}", serde_json::to_string(event)?))
}
