//! Models module for UserSync
//!
//! This module holds the user records as read from the database, their
//! canonical outbound form, and the mapping between the two.

pub mod mapper;
pub mod user;

// Re-export key types
pub use mapper::map_users;
pub use user::{CanonicalUser, RawUserRecord, UserBatch};
