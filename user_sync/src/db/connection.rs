//! Database connection handling
//!
//! A run uses exactly one connection, opened directly from configuration.
//! There is no pool.

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::ConnectOptions;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Translate configuration into driver connect options
pub fn connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .port(config.port)
        .username(&config.user)
        .password(config.password.expose());

    if let Some(host) = &config.host {
        options = options.host(host);
    }
    if let Some(database) = &config.database {
        options = options.database(database);
    }

    options
}

/// Open a single connection
pub async fn open(config: &DatabaseConfig) -> Result<MySqlConnection> {
    tracing::debug!(
        host = config.host.as_deref().unwrap_or("localhost"),
        port = config.port,
        database = config.database.as_deref(),
        "Opening database connection"
    );

    connect_options(config)
        .connect()
        .await
        .map_err(Error::ConnectionError)
}
