//! Status formatting and reporting
//!
//! This module turns session state into the text operators see:
//! - Hash rate formatting (khash/s, Mhash/s, Ghash/s)
//! - Pool share and solo progress lines
//! - Summary-grid rows and periodic log reports
//!

/// Status text formatting helpers
pub mod format;

/// Summary rows and the periodic reporter
///
/// The reporter runs on the consumer thread and logs one line per
/// session at a fixed interval.
pub mod reporter;

// Re-export main components
pub use format::format_khash;
pub use reporter::{StatsReporter, SummaryRow};
