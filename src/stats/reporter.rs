// src/stats/reporter.rs
use crate::miner::registry::SessionRegistry;
use crate::stats::format::format_khash;
use crate::utils::logging::EventLog;
use std::time::{Duration, Instant};

/// One line of the summary grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    /// Profile name
    pub name: String,
    /// "Stopped", "Connection problems" or the formatted rate
    pub status: String,
    /// Accepted shares, or difficulty-1 hashes in solo mode
    pub accepted: String,
    /// Stale/invalid shares, or "-" in solo mode
    pub invalid: String,
    /// Label for the start/stop control
    pub start_stop: String,
    /// Autostart flag of the profile
    pub autostart: bool,
}

/// Periodically logs the state of every session
///
/// Runs on the consumer thread: call [`StatsReporter::tick`] from the
/// loop that drains the registry.
pub struct StatsReporter {
    /// Interval at which stats are reported
    report_interval: Duration,
    /// When the last report was written
    last_report: Instant,
    log: EventLog,
}

impl StatsReporter {
    /// Creates a new StatsReporter with the specified reporting interval
    ///
    /// # Arguments
    /// * `report_interval` - How often to log statistics
    /// * `log` - Where reports go
    pub fn new(report_interval: Duration, log: EventLog) -> Self {
        StatsReporter {
            report_interval,
            last_report: Instant::now(),
            log,
        }
    }

    /// Reports if the interval elapsed since the last report
    ///
    /// # Returns
    /// `true` when a report was written
    pub fn tick(&mut self, registry: &SessionRegistry) -> bool {
        if self.last_report.elapsed() < self.report_interval {
            return false;
        }
        self.report(registry);
        true
    }

    /// Logs one line per session plus the aggregate rate
    pub fn report(&mut self, registry: &SessionRegistry) {
        self.last_report = Instant::now();
        for row in registry.summary_rows() {
            self.log.info(format_args!("{}", format_row(&row)));
        }
        if registry.any_running() {
            self.log.info(format_args!(
                "Total: {}",
                format_khash(registry.total_rate())
            ));
        }
    }
}

/// Renders a summary row as a single log line
pub fn format_row(row: &SummaryRow) -> String {
    format!(
        "{} | {} | Accepted/Stale: {}/{}{}",
        row.name,
        row.status,
        row.accepted,
        row.invalid,
        if row.autostart { " | autostart" } else { "" }
    )
}
