// src/utils/mod.rs
//! Utilities module for common functionality
//!
//! This module contains shared utilities used throughout the supervisor,
//! including error handling and logging infrastructure.

/// Error types and handling utilities
///
/// Contains the [`MinerError`] enum which defines all possible error conditions
/// for the supervisor, along with conversion implementations.
pub mod error;

/// Logging configuration and utilities
///
/// Provides logging initialization for the binaries and the injectable
/// [`EventLog`] handle used by library code.
pub mod logging;

// Re-export for easier access
pub use error::MinerError;
pub use logging::{EventLog, init_logging};
