//! Configuration handling for UserSync
//!
//! All settings come from environment-style key/value pairs. They are read
//! once through a [`ConfigSource`] and assembled into a [`SyncConfig`] that is
//! handed to the rest of the pipeline; nothing else looks at the environment.

use std::collections::HashMap;
use std::fmt;

use reqwest::Url;

use crate::error::{Error, Result};

pub const DB_HOST: &str = "DB_HOST";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_PORT: &str = "DB_PORT";
pub const API_URL: &str = "API_URL";
pub const API_KEY: &str = "API_KEY";
pub const LOG_LEVEL: &str = "LOG_LEVEL";
pub const LOG_FORMAT: &str = "LOG_FORMAT";

/// MySQL's well-known port, used when `DB_PORT` is unset
pub const DEFAULT_DB_PORT: u16 = 3306;

/// A key/value lookup that configuration is resolved from
pub trait ConfigSource {
    /// Raw value for `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Value for `key`, with empty strings treated as absent
    fn non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }
}

/// Reads from the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// A string that never shows up in logs or debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The underlying value, for handing to a driver or header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Database connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Not validated; the driver falls back to `localhost` when unset
    pub host: Option<String>,
    pub user: String,
    pub password: Secret,
    pub database: Option<String>,
    pub port: u16,
}

/// Third-party API configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub url: Url,
    pub api_key: Option<Secret>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Everything a sync run needs, resolved once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub database: DatabaseConfig,
    pub api: ApiConfig,
}

impl SyncConfig {
    /// Resolve both database and API configuration, failing on the first problem
    pub fn resolve(source: &impl ConfigSource) -> Result<Self> {
        let database = resolve_database_config(source)?;
        let api = resolve_api_config(source)?;

        Ok(Self { database, api })
    }
}

/// Build the database configuration from `DB_*` keys
pub fn resolve_database_config(source: &impl ConfigSource) -> Result<DatabaseConfig> {
    let (user, password) = match (source.non_empty(DB_USER), source.non_empty(DB_PASSWORD)) {
        (Some(user), Some(password)) => (user, password),
        _ => {
            return Err(Error::ConfigError(
                "Database credentials must be set via environment variables".to_string(),
            ))
        }
    };

    let port = match source.non_empty(DB_PORT) {
        Some(raw) => parse_port(&raw)?,
        None => DEFAULT_DB_PORT,
    };

    Ok(DatabaseConfig {
        host: source.non_empty(DB_HOST),
        user,
        password: Secret::new(password),
        database: source.non_empty(DB_NAME),
        port,
    })
}

/// Build the API configuration from `API_*` keys
pub fn resolve_api_config(source: &impl ConfigSource) -> Result<ApiConfig> {
    let raw_url = source.non_empty(API_URL).ok_or_else(|| {
        Error::ConfigError("API_URL environment variable is required".to_string())
    })?;

    let url = Url::parse(&raw_url)
        .map_err(|e| Error::ConfigError(format!("API_URL must be an absolute URL: {}", e)))?;

    Ok(ApiConfig {
        url,
        api_key: source.non_empty(API_KEY).map(Secret::new),
    })
}

/// Build the logging configuration; unknown values fall back to defaults
pub fn resolve_logging_config(source: &impl ConfigSource) -> LoggingConfig {
    let defaults = LoggingConfig::default();

    LoggingConfig {
        level: source
            .non_empty(LOG_LEVEL)
            .map(|level| level.to_lowercase())
            .unwrap_or(defaults.level),
        format: source
            .non_empty(LOG_FORMAT)
            .map(|format| format.to_lowercase())
            .unwrap_or(defaults.format),
    }
}

fn parse_port(raw: &str) -> Result<u16> {
    raw.trim().parse::<u16>().map_err(|_| {
        Error::ConfigError(format!(
            "DB_PORT must be a port number between 0 and 65535, got '{}'",
            raw
        ))
    })
}
