//! guiminer-rs - supervision core for external mining workers
//!
//! This crate launches one external mining worker per configured profile
//! and keeps track of what each one reports:
//! - Classifies the worker's line-oriented stdout into typed events
//! - Forwards events from a reader thread per worker to one consumer
//! - Keeps pool/solo counters and status text per profile
//! - Aggregates rates across profiles for summary views

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Worker launch, monitoring, sessions and the session registry
pub mod miner;

/// Status formatting and reporting
pub mod stats;

/// Utility functions and error handling
pub mod utils;

/// Command-line interface definitions
pub mod cli;

/// Configuration management
pub mod config;

/// Shared type definitions
pub mod types;

// Core exports
pub use cli::Commands;
pub use config::{Config, MinerConfig};
pub use miner::{
    EventSink, MinerSession, SessionRegistry, StatusObserver, WorkerCommand, WorkerLauncher,
    WorkerMonitor, WorkerProcess, classify,
};
pub use stats::{StatsReporter, SummaryRow, format_khash};
pub use types::{SessionId, SessionState, StatusSlot, UpdateKind, WorkerEvent};
pub use utils::{EventLog, MinerError, init_logging};
