// src/miner/mod.rs
//! Worker supervision
//!
//! This module contains all components related to running external miners:
//! - Output classification
//! - Subprocess launch and termination
//! - Background output monitoring
//! - Per-profile sessions and the registry that owns them

/// Worker output classification
pub mod classifier;

/// Background reader for worker stdout
///
/// One thread per running worker, publishing classified events in order.
pub mod monitor;

/// Set of sessions and the event queue they share
pub mod registry;

/// Lifecycle, counters and status of one profile
pub mod session;

/// Worker subprocess handling
///
/// Command-line construction, spawning and best-effort termination.
pub mod worker;

// Re-export main components for cleaner imports
pub use self::classifier::classify;
pub use self::monitor::{EventSink, MonitorState, WorkerMonitor};
pub use self::registry::{SessionRegistry, StatusObserver};
pub use self::session::MinerSession;
pub use self::worker::{WorkerCommand, WorkerLauncher, WorkerProcess};
