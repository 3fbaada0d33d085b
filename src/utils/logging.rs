// src/utils/logging.rs
//! Logging configuration and utilities
//!
//! This module handles logging setup for the supervisor, including:
//! - Process-wide logger configuration for the binaries
//! - An injectable [`EventLog`] handle used by sessions and monitors
//!
//! Uses `env_logger` under the hood with custom formatting and filtering.
//! Library code never reaches for the global logger directly; it logs
//! through the `EventLog` it was constructed with, which by default
//! forwards to whatever `env_logger` installed.

use crate::utils::error::MinerError;
use env_logger::{Builder, Target};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::env;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Initializes the logging subsystem
///
/// # Configuration
/// - Logs to stdout, or to `log_file` when given (truncated on start)
/// - Default log level: Info
/// - Custom timestamp and source location formatting
/// - Respects `RUST_LOG` environment variable if set
///
/// # Errors
/// Returns `MinerError` if the log file can't be created or a logger
/// is already installed.
pub fn init_logging(log_file: Option<&Path>) -> Result<(), MinerError> {
    let mut builder = common_log_config();
    builder.filter(None, LevelFilter::Info);

    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }

    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}

/// Creates and configures a base logger builder with common settings
///
/// # Features
/// - Custom log format including:
///   - Timestamp (seconds since epoch)
///   - Log level
///   - Target (module path or session target)
///   - Line number
///   - Message
/// - Output to stdout
fn common_log_config() -> Builder {
    let mut builder = Builder::new();

    builder
        .format(|buf, record| {
            use std::io::Write;
            let ts = buf.timestamp_seconds();
            let level = record.level();
            let target = record.target();

            match record.line() {
                Some(line) => writeln!(buf, "[{} {} {}:{}] {}", ts, level, target, line, record.args()),
                None => writeln!(buf, "[{} {} {}] {}", ts, level, target, record.args()),
            }
        })
        .target(Target::Stdout);

    builder
}

/// Forwards records to the process-wide logger
struct GlobalLog;

impl Log for GlobalLog {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level() && log::logger().enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if record.level() <= log::max_level() {
            log::logger().log(record);
        }
    }

    fn flush(&self) {
        log::logger().flush();
    }
}

/// Cloneable logging handle injected into sessions and monitors
///
/// Wraps any [`log::Log`] implementation together with a target string.
/// Tests hand in a capturing logger; the binaries use [`EventLog::global`].
#[derive(Clone)]
pub struct EventLog {
    sink: Arc<dyn Log>,
    target: Arc<str>,
}

impl EventLog {
    /// Creates a handle logging to `sink` under `target`
    pub fn new(sink: Arc<dyn Log>, target: &str) -> Self {
        EventLog {
            sink,
            target: Arc::from(target),
        }
    }

    /// Creates a handle forwarding to the process-wide logger
    pub fn global(target: &str) -> Self {
        Self::new(Arc::new(GlobalLog), target)
    }

    /// Same sink, different target
    pub fn scoped(&self, target: &str) -> Self {
        Self::new(Arc::clone(&self.sink), target)
    }

    /// Target records are emitted under
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Logs at debug level
    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, args);
    }

    /// Logs at info level
    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, args);
    }

    /// Logs at warn level
    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, args);
    }

    /// Logs at error level
    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, args);
    }

    fn emit(&self, level: Level, args: fmt::Arguments<'_>) {
        let metadata = Metadata::builder()
            .level(level)
            .target(&self.target)
            .build();
        if self.sink.enabled(&metadata) {
            self.sink
                .log(&Record::builder().metadata(metadata).args(args).build());
        }
    }
}

impl fmt::Debug for EventLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLog")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use log::{Level, Log, Metadata, Record};
    use std::sync::Mutex;

    /// Logger that keeps every record in memory
    #[derive(Default)]
    pub struct CaptureLog {
        pub records: Mutex<Vec<(Level, String)>>,
    }

    impl CaptureLog {
        pub fn messages(&self) -> Vec<(Level, String)> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Log for CaptureLog {
        fn enabled(&self, _: &Metadata<'_>) -> bool {
            true
        }

        fn log(&self, record: &Record<'_>) {
            self.records
                .lock()
                .unwrap()
                .push((record.level(), record.args().to_string()));
        }

        fn flush(&self) {}
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CaptureLog;
    use super::*;

    #[test]
    fn event_log_writes_to_injected_sink() {
        let capture = Arc::new(CaptureLog::default());
        let log = EventLog::new(capture.clone(), "session");

        log.info(format_args!("Listener for \"{}\" started", "rig"));
        log.scoped("other").warn(format_args!("worker said {}", 42));

        let messages = capture.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], (Level::Info, "Listener for \"rig\" started".to_string()));
        assert_eq!(messages[1], (Level::Warn, "worker said 42".to_string()));
    }

    #[test]
    fn scoped_keeps_sink_and_changes_target() {
        let log = EventLog::global("guiminer");
        let scoped = log.scoped("guiminer::monitor");
        assert_eq!(scoped.target(), "guiminer::monitor");
        assert_eq!(log.target(), "guiminer");
    }
}
