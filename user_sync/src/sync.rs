//! Sync job orchestration
//!
//! Runs the pipeline fetch -> map -> send as a strict sequence. The first
//! failing stage ends the run and its error is returned unchanged.

use std::io::Write;

use crate::api::ApiPublisher;
use crate::config::{ConfigSource, SyncConfig};
use crate::db::UserStore;
use crate::error::Result;
use crate::models::map_users;

/// Where a sync run currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStage {
    Idle,
    ConfigResolved,
    UsersFetched,
    UsersMapped,
    Delivered,
    Failed,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub rows_fetched: usize,
    pub stage: SyncStage,
}

/// A single sync run over resolved configuration
#[derive(Debug)]
pub struct SyncJob {
    config: SyncConfig,
    stage: SyncStage,
}

impl SyncJob {
    /// Create a job from already resolved configuration
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            stage: SyncStage::ConfigResolved,
        }
    }

    /// Resolve configuration from `source` and create a job
    pub fn resolve(source: &impl ConfigSource) -> Result<Self> {
        let config = SyncConfig::resolve(source).map_err(|e| {
            tracing::error!(stage = ?SyncStage::Idle, kind = e.kind(), error = %e, "Sync failed");
            e
        })?;

        Ok(Self::new(config))
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn stage(&self) -> SyncStage {
        self.stage
    }

    /// Fetch, map and deliver users, writing progress lines to `out`
    pub async fn run<S, W>(
        &mut self,
        store: &S,
        publisher: &ApiPublisher,
        out: &mut W,
    ) -> Result<SyncReport>
    where
        S: UserStore + ?Sized,
        W: Write,
    {
        match self.execute(store, publisher, out).await {
            Ok(report) => Ok(report),
            Err(e) => {
                tracing::error!(stage = ?self.stage, kind = e.kind(), error = %e, "Sync failed");
                self.stage = SyncStage::Failed;
                Err(e)
            }
        }
    }

    async fn execute<S, W>(
        &mut self,
        store: &S,
        publisher: &ApiPublisher,
        out: &mut W,
    ) -> Result<SyncReport>
    where
        S: UserStore + ?Sized,
        W: Write,
    {
        let rows = store.fetch_users().await?;
        let rows_fetched = rows.len();
        self.advance(SyncStage::UsersFetched);
        writeln!(out, "Retrieved {} user records.", rows_fetched)?;

        let batch = map_users(rows);
        self.advance(SyncStage::UsersMapped);

        publisher.send(&batch).await?;
        self.advance(SyncStage::Delivered);
        writeln!(out, "Data successfully sent to third-party API.")?;

        Ok(SyncReport {
            rows_fetched,
            stage: self.stage,
        })
    }

    fn advance(&mut self, next: SyncStage) {
        tracing::info!(from = ?self.stage, to = ?next, "Sync stage complete");
        self.stage = next;
    }
}
