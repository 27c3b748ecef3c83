//! Logging setup for processes embedding the engine.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use siprelay_core::{Error, Result};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// The log level to use
    pub level: Level,
    /// Whether to include file and line information
    pub file_info: bool,
    /// Application name to include in logs
    pub app_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: Level::INFO,
            file_info: false,
            app_name: "siprelay".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create a new logging configuration.
    pub fn new(level: Level, app_name: impl Into<String>) -> Self {
        LoggingConfig {
            level,
            app_name: app_name.into(),
            ..Default::default()
        }
    }

    /// Enable file and line information in logs.
    pub fn with_file_info(mut self) -> Self {
        self.file_info = true;
        self
    }
}

/// Set up the logging system with the provided configuration.
pub fn setup_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive(config.level.into());

    let builder = fmt::Subscriber::builder().with_env_filter(filter);

    let result = if config.file_info {
        builder.with_file(true).with_line_number(true).try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| Error::config(format!("logging setup failed: {e}")))?;
    tracing::info!("{} logging initialized", config.app_name);
    Ok(())
}

/// Parse a log level from a string.
pub fn parse_log_level(level: &str) -> Result<Level> {
    Level::from_str(level).map_err(|_| Error::config(format!("invalid log level: {level}")))
}
