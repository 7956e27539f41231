//! Configuration module for mevshare-watch.
//!
//! Handles loading configuration from an optional TOML file and applying
//! CLI overrides on top of it.

pub mod file;

use crate::config::file::{FileConfig, OutputFormat};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

/// Config file looked up in the working directory when `--config` is not
/// given.
pub const DEFAULT_CONFIG_PATH: &str = "./mevshare-watch.toml";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Values given on the command line. `None` keeps the file value.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub url: Option<Url>,
    pub limit: Option<u64>,
    pub format: Option<OutputFormat>,
}

/// Validated configuration for one watch run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub stream_url: Url,
    pub max_line_bytes: usize,
    pub output: OutputOptions,
}

/// How the consumer loop renders and bounds its output.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
    pub format: OutputFormat,
    pub limit: Option<u64>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    overrides: Overrides,
}

impl ConfigLoader {
    /// Create a new config loader.
    ///
    /// An explicit `config_path` must exist. Without one, the default path
    /// is used if present and built-in defaults otherwise.
    pub fn new(config_path: Option<PathBuf>, overrides: Overrides) -> Self {
        Self {
            config_path,
            overrides,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file, if any
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    pub fn load(&self) -> Result<WatchConfig, ConfigError> {
        let mut file_config = self.read_file()?;

        if let Some(url) = &self.overrides.url {
            file_config.stream.url = url.clone();
        }
        if let Some(limit) = self.overrides.limit {
            file_config.output.limit = Some(limit);
        }
        if let Some(format) = self.overrides.format {
            file_config.output.format = format;
        }

        self.validate(&file_config)?;

        Ok(WatchConfig {
            stream_url: file_config.stream.url,
            max_line_bytes: file_config.stream.max_line_bytes,
            output: OutputOptions {
                format: file_config.output.format,
                limit: file_config.output.limit,
            },
        })
    }

    fn read_file(&self) -> Result<FileConfig, ConfigError> {
        let path = match &self.config_path {
            Some(path) => path.as_path(),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if !default.exists() {
                    tracing::debug!("No config file found, using defaults");
                    return Ok(FileConfig::default());
                }
                default
            }
        };

        let config_content = std::fs::read_to_string(path)?;
        let file_config = toml::from_str(&config_content)?;
        tracing::info!("Configuration loaded from {:?}", path);
        Ok(file_config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let scheme = config.stream.url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::ValidationError(format!(
                "stream url must be http or https, got {scheme}"
            )));
        }
        if config.stream.max_line_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_line_bytes must be greater than zero".to_string(),
            ));
        }
        if config.output.limit == Some(0) {
            return Err(ConfigError::ValidationError(
                "limit must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
