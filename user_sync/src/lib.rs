//! UserSync: one-shot delivery of database users to a third-party API
//!
//! UserSync reads the `users` table from MySQL, reshapes each row into its
//! canonical form and POSTs the whole batch to a remote endpoint under a
//! fixed deadline.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod sync;
pub mod utils;

use std::io::Write;

// Re-export main types for easier access
pub use api::ApiPublisher;
pub use config::{ApiConfig, ConfigSource, DatabaseConfig, ProcessEnv, SyncConfig};
pub use db::{MySqlUserStore, UserStore};
pub use error::{Error, Result};
pub use models::{map_users, CanonicalUser, RawUserRecord, UserBatch};
pub use sync::{SyncJob, SyncReport, SyncStage};

/// Complete workflow: resolve config, read users from MySQL, deliver them
///
/// Configuration is validated before any connection or request is made.
pub async fn run<W: Write>(source: &impl ConfigSource, out: &mut W) -> Result<SyncReport> {
    let mut job = SyncJob::resolve(source)?;

    let store = MySqlUserStore::new(job.config().database.clone());
    let publisher = ApiPublisher::new(job.config().api.clone())?;

    job.run(&store, &publisher, out).await
}
