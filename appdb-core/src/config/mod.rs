//! Configuration management for AppDB
//!
//! Configuration is read from an optional TOML file and then overridden by
//! `APPDB_<SECTION>_<KEY>` environment variables. Every section has defaults,
//! so a partial file (or no file at all) is valid.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::logging::LogLevel;

mod error;

pub use error::ConfigError;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP endpoint configuration
    pub server: ServerConfig,

    /// Record storage configuration
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Metrics configuration
    pub metrics: MetricsConfig,
}

/// HTTP endpoint configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the worker endpoint binds to
    pub bind_address: SocketAddr,

    /// How long in-flight requests get to finish after a shutdown signal
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

/// Record storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Maximum pooled connections
    pub pool_size: u32,

    /// How long a connection waits on a locked database before failing
    #[serde(with = "humantime_serde")]
    pub busy_timeout: Duration,

    /// Well-known namespace holding developer registrations
    pub registry_namespace: String,

    /// Prefix prepended to the derivation input of every developer namespace
    pub namespace_prefix: String,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8787)),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("./data/appdb.sqlite3"),
            pool_size: 8,
            busy_timeout: Duration::from_secs(5),
            registry_namespace: "chatStore".to_string(),
            namespace_prefix: "dev_".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })
}

fn parse_duration_var(var: &'static str, value: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(value).map_err(|e| ConfigError::InvalidValue {
        var,
        reason: e.to_string(),
    })
}

impl Config {
    /// Load configuration from environment variables on top of the defaults
    ///
    /// Environment variables follow the pattern: APPDB_<SECTION>_<KEY>
    /// Example: APPDB_SERVER_BIND_ADDRESS=0.0.0.0:8787
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Load the file (when given), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        // Server
        if let Ok(addr) = env::var("APPDB_SERVER_BIND_ADDRESS") {
            self.server.bind_address = parse_var("APPDB_SERVER_BIND_ADDRESS", &addr)?;
        }
        if let Ok(timeout) = env::var("APPDB_SERVER_SHUTDOWN_TIMEOUT") {
            self.server.shutdown_timeout = parse_duration_var("APPDB_SERVER_SHUTDOWN_TIMEOUT", &timeout)?;
        }

        // Storage
        if let Ok(path) = env::var("APPDB_STORAGE_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(path);
        }
        if let Ok(size) = env::var("APPDB_STORAGE_POOL_SIZE") {
            self.storage.pool_size = parse_var("APPDB_STORAGE_POOL_SIZE", &size)?;
        }
        if let Ok(timeout) = env::var("APPDB_STORAGE_BUSY_TIMEOUT") {
            self.storage.busy_timeout = parse_duration_var("APPDB_STORAGE_BUSY_TIMEOUT", &timeout)?;
        }
        if let Ok(ns) = env::var("APPDB_STORAGE_REGISTRY_NAMESPACE") {
            self.storage.registry_namespace = ns;
        }
        if let Ok(prefix) = env::var("APPDB_STORAGE_NAMESPACE_PREFIX") {
            self.storage.namespace_prefix = prefix;
        }

        // Logging
        if let Ok(level) = env::var("APPDB_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("APPDB_LOG_JSON") {
            self.logging.json_format = parse_var("APPDB_LOG_JSON", &json)?;
        }

        // Metrics
        if let Ok(enabled) = env::var("APPDB_METRICS_ENABLED") {
            self.metrics.enabled = parse_var("APPDB_METRICS_ENABLED", &enabled)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.pool_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "pool_size must be greater than 0".to_string(),
            ));
        }

        if self.storage.registry_namespace.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "registry_namespace must not be empty".to_string(),
            ));
        }

        // Developer namespaces are always prefixed, so a non-empty prefix the
        // registry name does not start with keeps the two apart.
        if self.storage.namespace_prefix.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "namespace_prefix must not be empty".to_string(),
            ));
        }
        if self
            .storage
            .registry_namespace
            .starts_with(&self.storage.namespace_prefix)
        {
            return Err(ConfigError::ValidationFailed(format!(
                "registry_namespace '{}' collides with namespace_prefix '{}'",
                self.storage.registry_namespace, self.storage.namespace_prefix
            )));
        }

        if let Err(e) = self.logging.level.parse::<LogLevel>() {
            return Err(ConfigError::ValidationFailed(e.to_string()));
        }

        Ok(())
    }

    /// Render as TOML, in the same layout `from_file` reads
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = self.to_toml()?;

        std::fs::write(path, contents).map_err(|source| ConfigError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}
