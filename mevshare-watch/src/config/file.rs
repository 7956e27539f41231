//! TOML file configuration structures.
//!
//! These structs directly map to the `mevshare-watch.toml` file format.
//! Every section and field is optional.

use mevshare_sdk::client::DEFAULT_STREAM_URL;
use mevshare_sdk::stream::DEFAULT_MAX_LINE_BYTES;
use serde::{Deserialize, Serialize};
use url::Url;

/// Root configuration structure as read from the TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Event stream section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Matchmaker event stream URL.
    #[serde(default = "default_stream_url")]
    pub url: Url,
    /// Longest line accepted from the stream, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: default_stream_url(),
            max_line_bytes: default_max_line_bytes(),
        }
    }
}

fn default_stream_url() -> Url {
    Url::parse(DEFAULT_STREAM_URL).expect("valid default url")
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

/// Output section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Stop after this many events.
    #[serde(default)]
    pub limit: Option<u64>,
}

/// How events are written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One human-readable summary per event.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}
