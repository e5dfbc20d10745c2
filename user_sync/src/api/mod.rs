//! Outbound API module for UserSync
//!
//! This module delivers the mapped user batch to the third-party endpoint.

pub mod publisher;

// Re-export key types
pub use publisher::{ApiPublisher, SyncPayload, DEFAULT_TIMEOUT};
