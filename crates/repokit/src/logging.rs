//! Logging setup
//!
//! The library only emits `tracing` events. Applications that want to see
//! them can install a subscriber themselves or call `init_logging` with one of
//! the presets below.

use std::io;
use tracing_subscriber::{fmt::Layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ModelError, ModelResult};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Level used when no filter is given (e.g. "info")
    pub level: String,
    /// JSON lines instead of text
    pub json_format: bool,
    /// Multi-line human readable output
    pub pretty_print: bool,
    /// Include file and line number information
    pub include_location: bool,
    /// Directive string such as "repokit=debug"; `RUST_LOG` wins when set
    pub env_filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: None,
        }
    }
}

impl LoggingConfig {
    pub fn production() -> Self {
        Self {
            level: "info".to_string(),
            json_format: true,
            pretty_print: false,
            include_location: false,
            env_filter: Some("repokit=info,repokit_cache=warn".to_string()),
        }
    }

    pub fn development() -> Self {
        Self {
            level: "debug".to_string(),
            json_format: false,
            pretty_print: true,
            include_location: true,
            env_filter: Some("repokit=debug,repokit_cache=debug".to_string()),
        }
    }

    /// Minimal output for test runs
    pub fn test() -> Self {
        Self {
            level: "error".to_string(),
            json_format: false,
            pretty_print: false,
            include_location: false,
            env_filter: Some("repokit=error".to_string()),
        }
    }

    pub fn with_env_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    pub fn with_level(mut self, level: &str) -> Self {
        self.level = level.to_string();
        self
    }

    fn filter(&self) -> ModelResult<EnvFilter> {
        let directives = self.env_filter.as_deref().unwrap_or(&self.level);
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(directives))
            .map_err(|e| {
                ModelError::Configuration(format!("invalid log filter '{}': {}", directives, e))
            })
    }
}

/// Install a global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> ModelResult<()> {
    let filter = config.filter()?;
    let layer = Layer::new()
        .with_writer(io::stdout)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let installed = if config.json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .try_init()
    } else if config.pretty_print {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty())
            .try_init()
    } else {
        tracing_subscriber::registry().with(filter).with(layer).try_init()
    };
    installed
        .map_err(|e| ModelError::Configuration(format!("logging already initialized: {}", e)))?;

    tracing::debug!(
        target: "repokit::logging",
        level = %config.level,
        json = config.json_format,
        "logging initialized"
    );
    Ok(())
}
