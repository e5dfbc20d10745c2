//! Database module for UserSync
//!
//! This module opens the single MySQL connection a run uses and reads the
//! users table through it.

pub mod connection;
pub mod repository;
pub mod row;

// Re-export key types
pub use repository::{
    fetch_users, read_and_release, MySqlUserStore, UserStore, UsersConnection, USERS_QUERY,
};
