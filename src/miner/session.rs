// src/miner/session.rs
//! Lifecycle of one mining profile
//!
//! A [`MinerSession`] launches the worker for its profile, attaches a
//! [`WorkerMonitor`] and turns the events it receives into counters and
//! status text. Events reach the session through the registry's queue and
//! are applied on the consumer thread only, so counters are never touched
//! concurrently.

use crate::config::MinerConfig;
use crate::miner::monitor::{EventSink, WorkerMonitor};
use crate::miner::worker::{WorkerCommand, WorkerLauncher, WorkerProcess};
use crate::stats::format::{format_khash, shares_text, solo_text};
use crate::stats::reporter::SummaryRow;
use crate::types::{
    MessageBody, SessionId, SessionMessage, SessionState, StatusSlot, UpdateKind, WorkerEvent,
};
use crate::utils::error::MinerError;
use crate::utils::logging::EventLog;
use chrono::{DateTime, Local};
use crossbeam_channel::Sender;

/// Tags monitor output with the session and run it belongs to
struct SessionSink {
    session: SessionId,
    run: u64,
    tx: Sender<SessionMessage>,
}

impl SessionSink {
    fn send(&self, body: MessageBody) {
        let _ = self.tx.send(SessionMessage {
            session: self.session,
            run: self.run,
            body,
        });
    }
}

impl EventSink for SessionSink {
    fn publish(&self, event: WorkerEvent) {
        self.send(MessageBody::Event(event));
    }

    fn closed(&self) {
        self.send(MessageBody::StreamClosed);
    }
}

/// One profile's worker, counters and status
pub struct MinerSession {
    id: SessionId,
    config: MinerConfig,
    launcher: WorkerLauncher,
    state: SessionState,
    /// POOL mode only
    accepted_shares: u64,
    /// POOL mode only
    invalid_shares: u64,
    /// SOLO mode only
    diff1_hashes: u64,
    /// khash/s
    last_rate: u64,
    /// Whether the current run reported a rate yet
    rate_seen: bool,
    last_update_kind: UpdateKind,
    last_update_time: Option<DateTime<Local>>,
    possible_error: bool,
    status_message: String,
    status_rate: String,
    /// Incremented on every launch; messages from older runs are dropped
    run: u64,
    worker: Option<WorkerProcess>,
    monitor: Option<WorkerMonitor>,
    events: Sender<SessionMessage>,
    log: EventLog,
}

impl MinerSession {
    /// Creates an idle session
    ///
    /// # Arguments
    /// * `id` - Identity used to route monitor output back to this session
    /// * `config` - Profile settings
    /// * `launcher` - Worker executable and working directory
    /// * `events` - Queue the monitor publishes to
    /// * `log` - Logging handle
    pub fn new(
        id: SessionId,
        config: MinerConfig,
        launcher: WorkerLauncher,
        events: Sender<SessionMessage>,
        log: EventLog,
    ) -> Self {
        MinerSession {
            id,
            config,
            launcher,
            state: SessionState::Idle,
            accepted_shares: 0,
            invalid_shares: 0,
            diff1_hashes: 0,
            last_rate: 0,
            rate_seen: false,
            last_update_kind: UpdateKind::Pool,
            last_update_time: None,
            possible_error: false,
            status_message: shares_text(0, 0, None),
            status_rate: "Not started".to_string(),
            run: 0,
            worker: None,
            monitor: None,
            events,
            log,
        }
    }

    /// Launches the worker and attaches a monitor
    ///
    /// # Errors
    /// - `MinerError::InvalidState` unless the session is idle
    /// - `MinerError::LaunchError` if the worker can't be spawned; the
    ///   session stays idle
    pub fn start(&mut self) -> Result<(), MinerError> {
        if self.state != SessionState::Idle {
            return Err(MinerError::InvalidState(format!(
                "\"{}\" is {}, can only start when idle",
                self.config.name, self.state
            )));
        }

        let command = WorkerCommand::for_profile(&self.launcher, &self.config);
        self.log.debug(format_args!("Running command: {}", command));
        let mut worker = match WorkerProcess::start(&command, &self.launcher.working_dir) {
            Ok(worker) => worker,
            Err(e) => {
                self.log
                    .error(format_args!("\"{}\" could not start: {}", self.config.name, e));
                return Err(e);
            }
        };

        self.state = SessionState::Starting;
        self.run += 1;
        self.rate_seen = false;

        let mut monitor = WorkerMonitor::new(self.config.name.clone(), self.log.clone());
        let attached = match worker.take_stdout() {
            Some(stdout) => monitor.start(
                stdout,
                SessionSink {
                    session: self.id,
                    run: self.run,
                    tx: self.events.clone(),
                },
            ),
            None => Err(MinerError::InvalidState("worker stdout is not piped".into())),
        };

        if let Err(e) = attached {
            self.log.error(format_args!(
                "\"{}\" could not attach a listener: {}",
                self.config.name, e
            ));
            let _ = worker.terminate();
            worker.reap_in_background();
            self.state = SessionState::Idle;
            return Err(e);
        }

        self.log.info(format_args!(
            "\"{}\" started worker pid {}: {}",
            self.config.name,
            worker.id(),
            worker.command()
        ));
        self.worker = Some(worker);
        self.monitor = Some(monitor);
        self.state = SessionState::Running;
        self.status_rate = "Starting...".to_string();
        Ok(())
    }

    /// Terminates the worker and detaches its monitor
    ///
    /// Idempotent; a no-op when idle. Never waits for the worker to exit.
    pub fn stop(&mut self) {
        if self.state == SessionState::Idle {
            return;
        }
        self.state = SessionState::Stopping;

        if let Some(mut worker) = self.worker.take() {
            if let Err(e) = worker.terminate() {
                self.log.debug(format_args!("\"{}\": {}", self.config.name, e));
            }
            worker.reap_in_background();
        }
        if let Some(mut monitor) = self.monitor.take() {
            monitor.stop();
        }

        self.state = SessionState::Idle;
        self.status_rate = "Stopped".to_string();
        self.log
            .info(format_args!("\"{}\" stopped", self.config.name));
    }

    /// Starts when idle, stops otherwise
    pub fn toggle(&mut self) -> Result<(), MinerError> {
        if self.state == SessionState::Idle {
            self.start()
        } else {
            self.stop();
            Ok(())
        }
    }

    /// Applies a message from the event queue
    ///
    /// Messages for another session, from an earlier run, or arriving
    /// after the session stopped are dropped.
    pub fn apply(&mut self, message: SessionMessage) {
        if message.session != self.id || message.run != self.run || !self.is_mining() {
            self.log.debug(format_args!(
                "\"{}\" dropped message from run {}: {:?}",
                self.config.name, message.run, message.body
            ));
            return;
        }
        match message.body {
            MessageBody::Event(event) => self.on_event(event),
            MessageBody::StreamClosed => self.on_worker_exit(),
        }
    }

    /// Updates counters and status from one worker event
    pub fn on_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::ShareAccepted => {
                self.last_update_kind = UpdateKind::Pool;
                self.accepted_shares += 1;
                self.touch();
                self.status_message = self.summary_line();
            }
            WorkerEvent::ShareRejected => {
                self.last_update_kind = UpdateKind::Pool;
                self.invalid_shares += 1;
                self.touch();
                self.status_message = self.summary_line();
            }
            WorkerEvent::HashRate(rate) => {
                self.last_rate = rate;
                self.rate_seen = true;
                self.status_rate = format_khash(rate);
                // A rate line is the only sign a reported problem went away.
                if self.possible_error {
                    self.possible_error = false;
                    self.status_message = self.summary_line();
                }
            }
            WorkerEvent::SoloCheck => {
                self.last_update_kind = UpdateKind::Solo;
                self.diff1_hashes += 1;
                self.touch();
                self.status_message = self.summary_line();
            }
            WorkerEvent::StatusText(text) => {
                self.possible_error = true;
                self.status_message = text;
            }
        }
    }

    fn on_worker_exit(&mut self) {
        let exit = self.worker.as_mut().and_then(WorkerProcess::try_wait);
        let text = match exit {
            Some(status) => format!("Worker exited ({})", status),
            None => "Worker exited".to_string(),
        };
        self.log
            .warn(format_args!("\"{}\": {}", self.config.name, text));
        self.stop();
        self.possible_error = true;
        self.status_message = text;
    }

    fn touch(&mut self) {
        self.last_update_time = Some(Local::now());
    }

    /// Shares line in pool mode, difficulty-1 line in solo mode
    pub fn summary_line(&self) -> String {
        let time = self.last_update_time.as_ref();
        match self.last_update_kind {
            UpdateKind::Pool => shares_text(self.accepted_shares, self.invalid_shares, time),
            UpdateKind::Solo => solo_text(self.diff1_hashes, time),
        }
    }

    /// Recomputes both status slots, e.g. when the profile gains focus
    ///
    /// A pending worker message is kept until a rate line clears it.
    pub fn refresh_status(&mut self) {
        if !self.possible_error {
            self.status_message = self.summary_line();
        }
        self.status_rate = if !self.is_mining() {
            "Stopped".to_string()
        } else if self.rate_seen {
            format_khash(self.last_rate)
        } else {
            "Starting...".to_string()
        };
    }

    /// Current text of one status slot
    pub fn status(&self, slot: StatusSlot) -> &str {
        match slot {
            StatusSlot::Message => &self.status_message,
            StatusSlot::Rate => &self.status_rate,
        }
    }

    /// Row for the summary grid
    pub fn summary_row(&self) -> SummaryRow {
        let status = if !self.is_mining() {
            "Stopped".to_string()
        } else if self.possible_error {
            "Connection problems".to_string()
        } else {
            format_khash(self.last_rate)
        };
        let (accepted, invalid) = match self.last_update_kind {
            UpdateKind::Solo => (self.diff1_hashes.to_string(), "-".to_string()),
            UpdateKind::Pool => (
                self.accepted_shares.to_string(),
                self.invalid_shares.to_string(),
            ),
        };
        SummaryRow {
            name: self.config.name.clone(),
            status,
            accepted,
            invalid,
            start_stop: (if self.is_mining() { "Stop" } else { "Start" }).to_string(),
            autostart: self.config.autostart,
        }
    }

    /// Hover text for the taskbar icon
    pub fn taskbar_text(&self) -> String {
        if self.is_mining() {
            format!("{}: {}", self.config.name, format_khash(self.last_rate))
        } else {
            format!("{}: Stopped", self.config.name)
        }
    }

    /// Replaces the profile settings; takes effect on the next start
    pub fn set_config(&mut self, config: MinerConfig) {
        self.config = config;
    }

    /// Registry-assigned identity
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Profile name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Profile settings
    pub fn config(&self) -> &MinerConfig {
        &self.config
    }

    /// Lifecycle state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a worker is currently owned
    pub fn is_mining(&self) -> bool {
        self.state.has_worker()
    }

    /// Whether a monitor is currently attached
    pub fn has_monitor(&self) -> bool {
        self.monitor.is_some()
    }

    /// OS process id of the running worker
    pub fn worker_pid(&self) -> Option<u32> {
        self.worker.as_ref().map(WorkerProcess::id)
    }

    /// Accepted shares (pool mode)
    pub fn accepted_shares(&self) -> u64 {
        self.accepted_shares
    }

    /// Stale or invalid shares (pool mode)
    pub fn invalid_shares(&self) -> u64 {
        self.invalid_shares
    }

    /// Difficulty-1 hashes (solo mode)
    pub fn diff1_hashes(&self) -> u64 {
        self.diff1_hashes
    }

    /// Last reported rate in khash/s
    pub fn last_rate(&self) -> u64 {
        self.last_rate
    }

    /// Mode of the last share-like update
    pub fn last_update_kind(&self) -> UpdateKind {
        self.last_update_kind
    }

    /// Time of the last share-like update
    pub fn last_update_time(&self) -> Option<DateTime<Local>> {
        self.last_update_time
    }

    /// Whether an unrecognized worker line is still the latest news
    pub fn possible_error(&self) -> bool {
        self.possible_error
    }

    /// Launch counter
    pub fn run(&self) -> u64 {
        self.run
    }
}

impl Drop for MinerSession {
    fn drop(&mut self) {
        self.stop();
    }
}
