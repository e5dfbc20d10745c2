//! User repository
//!
//! Reads every row of the `users` table in one query and always closes the
//! connection it opened before returning.

use async_trait::async_trait;
use sqlx::mysql::MySqlConnection;
use sqlx::Connection;

use crate::config::DatabaseConfig;
use crate::db::connection;
use crate::error::{Error, Result};
use crate::models::RawUserRecord;

/// The one query a sync run executes
pub const USERS_QUERY: &str = "SELECT id, name, email, created_at FROM users";

/// Source of user rows
#[async_trait]
pub trait UserStore {
    /// Load all users, fully materialized, in the order the engine returns them
    async fn fetch_users(&self) -> Result<Vec<RawUserRecord>>;
}

/// MySQL-backed [`UserStore`]
#[derive(Debug, Clone)]
pub struct MySqlUserStore {
    config: DatabaseConfig,
}

impl MySqlUserStore {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl UserStore for MySqlUserStore {
    async fn fetch_users(&self) -> Result<Vec<RawUserRecord>> {
        fetch_users(&self.config).await
    }
}

/// An open connection that can read users and must be closed afterwards
#[async_trait]
pub trait UsersConnection: Send + Sized {
    async fn query_users(&mut self) -> Result<Vec<RawUserRecord>>;

    async fn close(self) -> std::result::Result<(), sqlx::Error>;
}

#[async_trait]
impl UsersConnection for MySqlConnection {
    async fn query_users(&mut self) -> Result<Vec<RawUserRecord>> {
        sqlx::query_as::<_, RawUserRecord>(USERS_QUERY)
            .fetch_all(&mut *self)
            .await
            .map_err(Error::QueryError)
    }

    async fn close(self) -> std::result::Result<(), sqlx::Error> {
        Connection::close(self).await
    }
}

/// Open a connection, run [`USERS_QUERY`], close the connection
pub async fn fetch_users(config: &DatabaseConfig) -> Result<Vec<RawUserRecord>> {
    let conn = connection::open(config).await?;
    read_and_release(conn).await
}

/// Query through `conn`, then close it whether or not the query succeeded
///
/// A query failure takes precedence over a failure to close.
pub async fn read_and_release<C: UsersConnection>(mut conn: C) -> Result<Vec<RawUserRecord>> {
    let rows = conn.query_users().await;
    let closed = conn.close().await;

    match (rows, closed) {
        (Ok(rows), Ok(())) => {
            tracing::debug!(row_count = rows.len(), "Fetched users");
            Ok(rows)
        }
        (Ok(_), Err(e)) => Err(Error::ConnectionError(e)),
        (Err(query_err), Ok(())) => Err(query_err),
        (Err(query_err), Err(close_err)) => {
            tracing::warn!(error = %close_err, "Failed to close connection after query error");
            Err(query_err)
        }
    }
}
