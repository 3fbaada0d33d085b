// src/miner/monitor.rs
//! Background reader for worker output
//!
//! A [`WorkerMonitor`] owns one dedicated thread that blocks on the
//! worker's stdout, classifies every non-empty line and publishes the
//! resulting [`WorkerEvent`]s, in order, to an [`EventSink`].
//!
//! The blocking read can't be interrupted by a flag, so `stop()` only
//! marks the monitor as shutting down and detaches the thread. The thread
//! exits by itself once the terminated worker closes its stream.

use crate::miner::classifier::classify;
use crate::types::WorkerEvent;
use crate::utils::error::MinerError;
use crate::utils::logging::EventLog;
use crossbeam_channel::Sender;
use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::JoinHandle;

/// Receives events published by a monitor thread
///
/// Called from the monitor's own thread; implementations must not block
/// for long.
pub trait EventSink: Send + 'static {
    /// Forward one classified event
    fn publish(&self, event: WorkerEvent);

    /// The worker's stream ended (EOF or read error)
    fn closed(&self) {}
}

impl EventSink for Sender<WorkerEvent> {
    fn publish(&self, event: WorkerEvent) {
        let _ = self.send(event);
    }
}

/// Lifecycle of a monitor
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MonitorState {
    /// Constructed, no thread yet
    Created,
    /// Reader thread is consuming the stream
    Running,
    /// Stop requested; thread may still be blocked in a read
    ShuttingDown,
    /// Reader thread finished
    Stopped,
}

impl MonitorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => MonitorState::Created,
            1 => MonitorState::Running,
            2 => MonitorState::ShuttingDown,
            _ => MonitorState::Stopped,
        }
    }
}

/// Reader loop bound to one worker's stdout
///
/// Never reused: once stopped, a new monitor is created for the next run.
#[derive(Debug)]
pub struct WorkerMonitor {
    /// Profile name, used for the thread name and log lines
    name: String,
    /// Current [`MonitorState`] as its discriminant
    state: Arc<AtomicU8>,
    /// Set once `stop()` was called
    shutdown: Arc<AtomicBool>,
    /// Reader thread, if still attached
    handle: Option<JoinHandle<()>>,
    log: EventLog,
}

impl WorkerMonitor {
    /// Creates a monitor in the `Created` state
    pub fn new(name: impl Into<String>, log: EventLog) -> Self {
        WorkerMonitor {
            name: name.into(),
            state: Arc::new(AtomicU8::new(MonitorState::Created as u8)),
            shutdown: Arc::new(AtomicBool::new(false)),
            handle: None,
            log,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        MonitorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Spawns the reader thread over `stream`
    ///
    /// # Errors
    /// Returns `MinerError::InvalidState` if the monitor was already
    /// started, or `MinerError::IoError` if the thread can't be spawned.
    pub fn start<R, S>(&mut self, stream: R, sink: S) -> Result<(), MinerError>
    where
        R: Read + Send + 'static,
        S: EventSink,
    {
        if self.state() != MonitorState::Created {
            return Err(MinerError::InvalidState(format!(
                "monitor for \"{}\" is {:?}, not Created",
                self.name,
                self.state()
            )));
        }

        self.state.store(MonitorState::Running as u8, Ordering::SeqCst);
        let reader = ReaderLoop {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            shutdown: Arc::clone(&self.shutdown),
            log: self.log.clone(),
        };

        let spawned = std::thread::Builder::new()
            .name(format!("monitor-{}", self.name.replace('\0', "")))
            .spawn(move || reader.run(stream, sink));

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.state.store(MonitorState::Stopped as u8, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Requests shutdown without blocking
    ///
    /// Idempotent. Joins the reader only if it already finished, otherwise
    /// leaves it to exit once its stream closes.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.state.compare_exchange(
            MonitorState::Created as u8,
            MonitorState::Stopped as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let _ = self.state.compare_exchange(
            MonitorState::Running as u8,
            MonitorState::ShuttingDown as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                self.log.debug(format_args!(
                    "Listener for \"{}\" detached while blocked on read",
                    self.name
                ));
            }
        }
    }
}

struct ReaderLoop {
    name: String,
    state: Arc<AtomicU8>,
    shutdown: Arc<AtomicBool>,
    log: EventLog,
}

impl ReaderLoop {
    fn run<R: Read, S: EventSink>(self, stream: R, sink: S) {
        self.log
            .debug(format_args!("Listener for \"{}\" started", self.name));

        let mut reader = BufReader::new(stream);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    self.log.debug(format_args!(
                        "Listener for \"{}\" read failed: {}",
                        self.name, e
                    ));
                    break;
                }
            }
            if self.shutdown.load(Ordering::SeqCst) {
                break;
            }

            let text = String::from_utf8_lossy(&buf);
            let line = text.trim();
            if line.is_empty() {
                continue;
            }

            let event = classify(line);
            if let WorkerEvent::StatusText(message) = &event {
                self.log
                    .info(format_args!("Listener for \"{}\": {}", self.name, message));
            }
            sink.publish(event);
        }

        self.state.store(MonitorState::Stopped as u8, Ordering::SeqCst);
        self.log
            .debug(format_args!("Listener for \"{}\" shutting down", self.name));
        sink.closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::logging::testing::CaptureLog;
    use crossbeam_channel::{Receiver, unbounded};
    use std::io::Cursor;
    use std::time::Duration;

    struct Recorder {
        events: Sender<WorkerEvent>,
        closed: Sender<()>,
    }

    impl EventSink for Recorder {
        fn publish(&self, event: WorkerEvent) {
            let _ = self.events.send(event);
        }

        fn closed(&self) {
            let _ = self.closed.send(());
        }
    }

    fn recorder() -> (Recorder, Receiver<WorkerEvent>, Receiver<()>) {
        let (events, event_rx) = unbounded();
        let (closed, closed_rx) = unbounded();
        (Recorder { events, closed }, event_rx, closed_rx)
    }

    #[test]
    fn publishes_events_in_line_order_and_stops_at_eof() {
        let output = "Connecting...\n\n   \n120 khash/s\r\nAccepted 1a2b\nstale\nchecking 5\n";
        let (sink, events, closed) = recorder();
        let capture = Arc::new(CaptureLog::default());
        let mut monitor = WorkerMonitor::new("rig", EventLog::new(capture.clone(), "test"));

        monitor.start(Cursor::new(output), sink).unwrap();
        closed.recv_timeout(Duration::from_secs(5)).unwrap();

        let received: Vec<_> = events.try_iter().collect();
        assert_eq!(
            received,
            vec![
                WorkerEvent::StatusText("Connecting...".into()),
                WorkerEvent::HashRate(120),
                WorkerEvent::ShareAccepted,
                WorkerEvent::ShareRejected,
                WorkerEvent::SoloCheck,
            ]
        );
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(
            capture
                .messages()
                .iter()
                .any(|(_, msg)| msg == "Listener for \"rig\": Connecting...")
        );
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let (sink, events, closed) = recorder();
        let mut monitor = WorkerMonitor::new("rig", EventLog::global("test"));
        monitor
            .start(Cursor::new(b"GPU \xff error\n".to_vec()), sink)
            .unwrap();
        closed.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            vec![WorkerEvent::StatusText("GPU \u{fffd} error".into())]
        );
    }

    #[test]
    fn cannot_start_twice() {
        let (tx, _rx) = unbounded::<WorkerEvent>();
        let mut monitor = WorkerMonitor::new("rig", EventLog::global("test"));
        monitor.start(Cursor::new(Vec::<u8>::new()), tx.clone()).unwrap();
        assert!(monitor.start(Cursor::new(Vec::<u8>::new()), tx).is_err());
    }

    #[test]
    fn profile_name_with_nul_still_starts() {
        let (sink, events, closed) = recorder();
        let mut monitor = WorkerMonitor::new("rig\0x", EventLog::global("test"));
        monitor.start(Cursor::new("accepted\n"), sink).unwrap();
        closed.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(events.try_iter().collect::<Vec<_>>(), vec![WorkerEvent::ShareAccepted]);
    }

    #[test]
    fn stop_before_start_is_terminal() {
        let mut monitor = WorkerMonitor::new("rig", EventLog::global("test"));
        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);
    }

    #[cfg(unix)]
    #[test]
    fn stop_does_not_block_on_a_pending_read() {
        use std::os::unix::net::UnixStream;

        let (reader_end, writer_end) = UnixStream::pair().unwrap();
        let (sink, events, closed) = recorder();
        let mut monitor = WorkerMonitor::new("rig", EventLog::global("test"));
        monitor.start(reader_end, sink).unwrap();

        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::ShuttingDown);

        // Output after shutdown is swallowed; closing the stream ends the thread.
        use std::io::Write;
        let mut writer_end = writer_end;
        writer_end.write_all(b"accepted\n").unwrap();
        drop(writer_end);

        closed.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(events.try_iter().next().is_none());
        assert_eq!(monitor.state(), MonitorState::Stopped);
    }
}
