//! Logging subsystem for AppDB
//!
//! Thin setup layer over `tracing-subscriber`. `RUST_LOG` always wins over the
//! configured level so operators can raise verbosity per module without
//! touching the config file. Output goes to stderr; stdout is reserved for
//! command output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_subscriber::{Layer, Registry};

use crate::config::LoggingConfig;

mod error;
mod level;

pub use error::LoggingError;
pub use level::LogLevel;

/// Line format of emitted events
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

/// Subscriber settings
#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Print the emitting module path
    pub target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new(LogLevel::Info)
    }
}

impl LogConfig {
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            format: LogFormat::Plain,
            timestamps: true,
            target: true,
        }
    }

    /// Build from the `[logging]` section of the application config
    pub fn from_settings(settings: &LoggingConfig) -> Result<Self, LoggingError> {
        let format = if settings.json_format {
            LogFormat::Json
        } else {
            LogFormat::Plain
        };

        Ok(Self::new(settings.level.parse()?)
            .format(format)
            .timestamps(settings.with_timestamp)
            .target(settings.with_target))
    }

    pub fn format(self, format: LogFormat) -> Self {
        Self { format, ..self }
    }

    pub fn timestamps(self, timestamps: bool) -> Self {
        Self { timestamps, ..self }
    }

    pub fn target(self, target: bool) -> Self {
        Self { target, ..self }
    }
}

/// Install a plain-text subscriber at `info`
pub fn init_logging() -> Result<(), LoggingError> {
    init_logging_with_config(LogConfig::default())
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
///
/// # Example
/// ```
/// use appdb_core::logging::{init_logging_with_config, LogConfig, LogFormat, LogLevel};
///
/// let config = LogConfig::new(LogLevel::Debug)
///     .format(LogFormat::Json)
///     .timestamps(false);
///
/// init_logging_with_config(config).expect("no subscriber installed yet");
/// ```
pub fn init_logging_with_config(config: LogConfig) -> Result<(), LoggingError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let base = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.target);
    let layer: Box<dyn Layer<Registry> + Send + Sync> = match (config.format, config.timestamps) {
        (LogFormat::Json, true) => base.json().boxed(),
        (LogFormat::Json, false) => base.json().without_time().boxed(),
        (LogFormat::Plain, true) => base.boxed(),
        (LogFormat::Plain, false) => base.without_time().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .try_init()
        .map_err(|e| LoggingError::InitializationFailed(e.to_string()))
}
