//! Utilities for UserSync
//!
//! This module provides utility functions used across the library.

pub mod logging;

// Re-export key utility functions
pub use logging::init_logging;
