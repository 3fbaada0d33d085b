// src/miner/registry.rs
//! Set of mining sessions, one per profile
//!
//! The registry owns every [`MinerSession`] together with the single
//! queue all monitors publish to. Whoever owns the registry is the one
//! serialized consumer: it drains the queue with [`SessionRegistry::dispatch_pending`]
//! or [`SessionRegistry::wait_and_dispatch`] and the matching session
//! applies each message.

use crate::config::MinerConfig;
use crate::miner::session::MinerSession;
use crate::miner::worker::{WorkerCommand, WorkerLauncher, WorkerProcess};
use crate::stats::format::format_khash;
use crate::stats::reporter::SummaryRow;
use crate::types::{SessionId, SessionMessage, SessionState, StatusSlot};
use crate::utils::error::MinerError;
use crate::utils::logging::EventLog;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use std::time::Duration;

/// Receives status text for the profile currently in focus
///
/// Typically a status bar with a message field and a rate field.
pub trait StatusObserver: Send {
    /// One slot of the focused session's status changed
    fn on_status(&mut self, text: &str, slot: StatusSlot);
}

const SLOTS: [StatusSlot; 2] = [StatusSlot::Message, StatusSlot::Rate];

/// Insertion-ordered collection of sessions
pub struct SessionRegistry {
    sessions: Vec<MinerSession>,
    next_id: u64,
    tx: Sender<SessionMessage>,
    rx: Receiver<SessionMessage>,
    launcher: WorkerLauncher,
    focused: Option<SessionId>,
    observer: Option<Box<dyn StatusObserver>>,
    log: EventLog,
}

impl SessionRegistry {
    /// Creates an empty registry
    ///
    /// # Arguments
    /// * `launcher` - Worker executable and directory shared by all sessions
    /// * `log` - Logging handle handed down to every session
    pub fn new(launcher: WorkerLauncher, log: EventLog) -> Self {
        let (tx, rx) = unbounded();
        SessionRegistry {
            sessions: Vec::new(),
            next_id: 1,
            tx,
            rx,
            launcher,
            focused: None,
            observer: None,
            log,
        }
    }

    /// Adds an idle session for `config`
    pub fn add(&mut self, config: MinerConfig) -> SessionId {
        let id = SessionId(self.next_id);
        self.next_id += 1;
        self.log
            .debug(format_args!("Adding profile \"{}\" as {}", config.name, id));
        self.sessions.push(MinerSession::new(
            id,
            config,
            self.launcher.clone(),
            self.tx.clone(),
            self.log.clone(),
        ));
        id
    }

    /// Stops and removes a session, returning its profile
    pub fn remove(&mut self, id: SessionId) -> Result<MinerConfig, MinerError> {
        let index = self.index_of(id)?;
        let mut session = self.sessions.remove(index);
        session.stop();
        if self.focused == Some(id) {
            self.focused = None;
        }
        Ok(session.config().clone())
    }

    /// Stops everything and replaces all sessions with `profiles`
    ///
    /// An empty list yields one session with default settings.
    pub fn load_profiles(&mut self, profiles: Vec<MinerConfig>) -> Vec<SessionId> {
        self.stop_all();
        self.sessions.clear();
        self.focused = None;

        let profiles = if profiles.is_empty() {
            vec![MinerConfig::default()]
        } else {
            profiles
        };
        profiles.into_iter().map(|config| self.add(config)).collect()
    }

    /// Profiles in tab order, for saving
    pub fn configs(&self) -> Vec<MinerConfig> {
        self.sessions.iter().map(|s| s.config().clone()).collect()
    }

    /// Session by id
    pub fn get(&self, id: SessionId) -> Option<&MinerSession> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    /// Mutable session by id
    ///
    /// Changes made through this handle are not forwarded to the observer;
    /// prefer the registry's own `start`/`stop`.
    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut MinerSession> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }

    /// First session whose profile has this name
    pub fn find_by_name(&self, name: &str) -> Option<&MinerSession> {
        self.sessions.iter().find(|s| s.name() == name)
    }

    /// Sessions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &MinerSession> {
        self.sessions.iter()
    }

    /// Number of sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether there are no sessions
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Starts one session
    pub fn start(&mut self, id: SessionId) -> Result<(), MinerError> {
        self.tracked(id, MinerSession::start)?
    }

    /// Stops one session
    pub fn stop(&mut self, id: SessionId) -> Result<(), MinerError> {
        self.tracked(id, MinerSession::stop)
    }

    /// Starts or stops one session
    pub fn toggle(&mut self, id: SessionId) -> Result<(), MinerError> {
        self.tracked(id, MinerSession::toggle)?
    }

    /// Starts every idle session flagged for autostart
    ///
    /// # Returns
    /// The sessions that failed to launch, with their errors
    pub fn start_autostart(&mut self) -> Vec<(SessionId, MinerError)> {
        let ids: Vec<_> = self
            .sessions
            .iter()
            .filter(|s| s.config().autostart && s.state() == SessionState::Idle)
            .map(MinerSession::id)
            .collect();

        ids.into_iter()
            .filter_map(|id| self.start(id).err().map(|e| (id, e)))
            .collect()
    }

    /// Launches the official client in server mode for solo mining
    ///
    /// The client runs on its own; it is not tracked as a session and is
    /// not stopped by `stop_all`.
    ///
    /// # Returns
    /// OS process id of the client
    ///
    /// # Errors
    /// - `MinerError::ConfigError` if `executable` is blank
    /// - `MinerError::LaunchError` if the client can't be spawned
    pub fn launch_solo_server(&self, executable: &str) -> Result<u32, MinerError> {
        let command = WorkerCommand::solo_server(executable)?;
        match WorkerProcess::launch_detached(&command, &self.launcher.working_dir) {
            Ok(client) => {
                let pid = client.id();
                self.log.info(format_args!(
                    "Client launched ok (pid {}). You can start the miner now.",
                    pid
                ));
                client.reap_in_background();
                Ok(pid)
            }
            Err(e) => {
                self.log.error(format_args!(
                    "Couldn't find Bitcoin at {}. Is your path set correctly?",
                    executable
                ));
                Err(e)
            }
        }
    }

    /// Stops every session
    pub fn stop_all(&mut self) {
        let ids: Vec<_> = self.sessions.iter().map(MinerSession::id).collect();
        for id in ids {
            let _ = self.stop(id);
        }
    }

    /// Applies every queued message without blocking
    ///
    /// # Returns
    /// Number of messages applied
    pub fn dispatch_pending(&mut self) -> usize {
        let mut count = 0;
        while let Ok(message) = self.rx.try_recv() {
            self.dispatch(message);
            count += 1;
        }
        count
    }

    /// Waits up to `timeout` for a message, then drains the queue
    ///
    /// # Returns
    /// Number of messages applied (0 on timeout)
    pub fn wait_and_dispatch(&mut self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(message) => {
                self.dispatch(message);
                1 + self.dispatch_pending()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    fn dispatch(&mut self, message: SessionMessage) {
        let id = message.session;
        if self.tracked(id, |session| session.apply(message)).is_err() {
            self.log
                .debug(format_args!("Dropped message for removed session {}", id));
        }
    }

    /// Gives `id` focus and replays its status to the observer
    pub fn focus(&mut self, id: SessionId) -> Result<(), MinerError> {
        let index = self.index_of(id)?;
        self.focused = Some(id);
        let session = &mut self.sessions[index];
        session.refresh_status();
        if let Some(observer) = self.observer.as_mut() {
            for slot in SLOTS {
                observer.on_status(session.status(slot), slot);
            }
        }
        Ok(())
    }

    /// Session currently in focus
    pub fn focused(&self) -> Option<SessionId> {
        self.focused
    }

    /// Installs the observer that receives the focused session's status
    pub fn set_observer(&mut self, observer: Box<dyn StatusObserver>) {
        self.observer = Some(observer);
    }

    /// Sum of the last rate over running sessions, in khash/s
    ///
    /// Saturates at `u64::MAX`.
    pub fn total_rate(&self) -> u64 {
        self.sessions
            .iter()
            .filter(|s| s.state() == SessionState::Running)
            .map(MinerSession::last_rate)
            .fold(0, u64::saturating_add)
    }

    /// Whether any session is running
    pub fn any_running(&self) -> bool {
        self.sessions
            .iter()
            .any(|s| s.state() == SessionState::Running)
    }

    /// Aggregate rate for a status bar; empty when nothing runs
    pub fn status_bar_text(&self) -> String {
        if self.any_running() {
            format_khash(self.total_rate())
        } else {
            String::new()
        }
    }

    /// One summary-grid row per session
    pub fn summary_rows(&self) -> Vec<SummaryRow> {
        self.sessions.iter().map(MinerSession::summary_row).collect()
    }

    /// Taskbar hover text, one line per session
    pub fn taskbar_text(&self) -> String {
        self.sessions
            .iter()
            .map(MinerSession::taskbar_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Sending half of the event queue
    pub fn sender(&self) -> Sender<SessionMessage> {
        self.tx.clone()
    }

    fn index_of(&self, id: SessionId) -> Result<usize, MinerError> {
        self.sessions
            .iter()
            .position(|s| s.id() == id)
            .ok_or(MinerError::UnknownSession(id))
    }

    /// Runs `f` on a session and forwards changed status slots to the
    /// observer when that session has focus
    fn tracked<T>(
        &mut self,
        id: SessionId,
        f: impl FnOnce(&mut MinerSession) -> T,
    ) -> Result<T, MinerError> {
        let index = self.index_of(id)?;
        let session = &mut self.sessions[index];
        let before = SLOTS.map(|slot| session.status(slot).to_string());

        let out = f(&mut *session);

        if self.focused == Some(id) {
            if let Some(observer) = self.observer.as_mut() {
                for (slot, old) in SLOTS.into_iter().zip(before) {
                    let now = session.status(slot);
                    if now != old {
                        observer.on_status(now, slot);
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MessageBody, WorkerEvent};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(String, StatusSlot)>>>);

    impl StatusObserver for Recorder {
        fn on_status(&mut self, text: &str, slot: StatusSlot) {
            self.0.lock().unwrap().push((text.to_string(), slot));
        }
    }

    fn registry() -> SessionRegistry {
        SessionRegistry::new(
            WorkerLauncher::new(vec!["/nonexistent/worker".into()], "."),
            EventLog::global("test"),
        )
    }

    #[test]
    fn keeps_insertion_order_and_looks_up_by_name() {
        let mut registry = registry();
        let a = registry.add(MinerConfig::named("alpha"));
        let b = registry.add(MinerConfig::named("beta"));

        let names: Vec<_> = registry.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names, ["alpha", "beta"]);
        assert_eq!(registry.find_by_name("beta").map(MinerSession::id), Some(b));
        assert_eq!(registry.remove(a).unwrap().name, "alpha");
        assert_eq!(registry.len(), 1);
        assert!(matches!(registry.remove(a), Err(MinerError::UnknownSession(_))));
    }

    #[test]
    fn nothing_running_means_zero_total() {
        let mut registry = registry();
        let id = registry.add(MinerConfig::named("alpha"));
        registry.get_mut(id).unwrap().on_event(WorkerEvent::HashRate(500));

        assert_eq!(registry.total_rate(), 0);
        assert!(!registry.any_running());
        assert_eq!(registry.status_bar_text(), "");
        assert_eq!(registry.taskbar_text(), "alpha: Stopped");
    }

    #[test]
    fn empty_profile_list_creates_a_default_session() {
        let mut registry = registry();
        registry.add(MinerConfig::named("old"));
        let ids = registry.load_profiles(Vec::new());
        assert_eq!(ids.len(), 1);
        assert_eq!(registry.configs(), vec![MinerConfig::default()]);
    }

    #[test]
    fn autostart_reports_launch_failures() {
        let mut registry = registry();
        let auto = registry.add(MinerConfig {
            autostart: true,
            ..MinerConfig::named("auto")
        });
        registry.add(MinerConfig::named("manual"));

        let failures = registry.start_autostart();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, auto);
        assert!(failures[0].1.is_launch_error());
        assert!(!registry.any_running());
    }

    #[test]
    fn solo_server_launch_failures_are_reported() {
        let registry = registry();
        assert!(matches!(
            registry.launch_solo_server(""),
            Err(MinerError::ConfigError(_))
        ));
        let err = registry.launch_solo_server("/nonexistent/bitcoin").unwrap_err();
        assert!(err.is_launch_error());
        assert!(err.to_string().contains("/nonexistent/bitcoin -server"));
    }

    #[cfg(unix)]
    #[test]
    fn solo_server_runs_outside_the_sessions() {
        let mut registry = registry();
        registry.add(MinerConfig::named("alpha"));
        let pid = registry.launch_solo_server("true").unwrap();
        assert!(pid > 0);
        assert!(!registry.any_running());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn messages_for_unknown_sessions_are_ignored() {
        let mut registry = registry();
        registry
            .sender()
            .send(SessionMessage {
                session: SessionId(99),
                run: 1,
                body: MessageBody::Event(WorkerEvent::ShareAccepted),
            })
            .unwrap();
        assert_eq!(registry.dispatch_pending(), 1);
        assert_eq!(registry.wait_and_dispatch(Duration::from_millis(10)), 0);
    }

    #[test]
    fn focus_replays_status_to_observer() {
        let mut registry = registry();
        let a = registry.add(MinerConfig::named("alpha"));
        let b = registry.add(MinerConfig::named("beta"));
        let recorder = Recorder::default();
        registry.set_observer(Box::new(recorder.clone()));

        registry.focus(a).unwrap();
        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec![
                ("Shares: 0 accepted".to_string(), StatusSlot::Message),
                ("Stopped".to_string(), StatusSlot::Rate),
            ]
        );

        // Launch failure on an unfocused session stays silent.
        recorder.0.lock().unwrap().clear();
        assert!(registry.start(b).is_err());
        registry.stop(b).unwrap();
        assert!(recorder.0.lock().unwrap().is_empty());
        assert_eq!(registry.focused(), Some(a));
    }

    #[cfg(unix)]
    #[test]
    fn focused_session_forwards_changes_and_aggregates_rate() {
        let mut registry = SessionRegistry::new(
            WorkerLauncher::new(
                vec!["sh".into(), "-c".into(), "echo '700 khash/s'; exec sleep 30".into()],
                ".",
            ),
            EventLog::global("test"),
        );
        let a = registry.add(MinerConfig::named("alpha"));
        let b = registry.add(MinerConfig::named("beta"));
        let recorder = Recorder::default();
        registry.set_observer(Box::new(recorder.clone()));
        registry.focus(a).unwrap();
        recorder.0.lock().unwrap().clear();

        registry.start(a).unwrap();
        registry.start(b).unwrap();
        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        while registry.total_rate() < 1_400 && std::time::Instant::now() < deadline {
            registry.wait_and_dispatch(Duration::from_millis(100));
        }

        assert_eq!(registry.total_rate(), 1_400);
        assert_eq!(registry.status_bar_text(), "1.4 Mhash/s");
        let seen = recorder.0.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![
                ("Starting...".to_string(), StatusSlot::Rate),
                ("700 khash/s".to_string(), StatusSlot::Rate),
            ]
        );

        registry.stop_all();
        assert!(!registry.any_running());
    }

    #[cfg(unix)]
    #[test]
    fn total_rate_saturates_on_huge_rates() {
        let mut registry = SessionRegistry::new(
            WorkerLauncher::new(
                vec![
                    "sh".into(),
                    "-c".into(),
                    "echo '18446744073709551615 khash/s'; exec sleep 30".into(),
                ],
                ".",
            ),
            EventLog::global("test"),
        );
        let a = registry.add(MinerConfig::named("alpha"));
        let b = registry.add(MinerConfig::named("beta"));
        registry.start(a).unwrap();
        registry.start(b).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(10);
        let reported = |r: &SessionRegistry| r.iter().all(|s| s.last_rate() == u64::MAX);
        while !reported(&registry) && std::time::Instant::now() < deadline {
            registry.wait_and_dispatch(Duration::from_millis(100));
        }

        assert!(reported(&registry));
        assert_eq!(registry.total_rate(), u64::MAX);
        assert!(registry.status_bar_text().ends_with("Ghash/s"));
        registry.stop_all();
    }
}
