// src/types.rs
use std::fmt;

/// Typed status event derived from one line of worker output
///
/// Produced by the monitor thread, consumed immediately by the owning
/// session. Nothing here is persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkerEvent {
    /// The pool accepted a share
    ShareAccepted,

    /// The pool rejected a share as invalid or stale
    ShareRejected,

    /// Current throughput report in khash/s
    HashRate(u64),

    /// Solo mode found a difficulty-1 hash
    SoloCheck,

    /// Any line that is not recognized, passed through verbatim
    ///
    /// Usually a warning or an error from the worker.
    StatusText(String),
}

/// How the last share-like update was counted
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum UpdateKind {
    /// Mining against a pool: accepted/invalid shares
    #[default]
    Pool,
    /// Mining solo: difficulty-1 hashes
    Solo,
}

/// Lifecycle state of a mining session
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No worker process
    #[default]
    Idle,
    /// Worker launched, monitor not yet attached
    Starting,
    /// Worker and monitor both running
    Running,
    /// Tear-down in progress
    Stopping,
}

impl SessionState {
    /// Whether a worker handle is owned in this state
    pub fn has_worker(self) -> bool {
        !matches!(self, SessionState::Idle)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Starting => write!(f, "starting"),
            SessionState::Running => write!(f, "running"),
            SessionState::Stopping => write!(f, "stopping"),
        }
    }
}

/// One of the two status fields every session maintains
///
/// Mirrors a two-field status bar: a wide message field on the left and
/// a narrow rate field on the right.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatusSlot {
    /// Shares summary, solo progress or verbatim worker messages
    Message,
    /// Formatted hash rate, or lifecycle words like "Stopped"
    Rate,
}

/// Registry-assigned identity of a session
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Payload of a [`SessionMessage`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageBody {
    /// A classified line of worker output
    Event(WorkerEvent),
    /// The worker's stdout reached EOF or failed
    StreamClosed,
}

/// Envelope carried from monitor threads to the consumer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionMessage {
    /// Session the monitor belongs to
    pub session: SessionId,
    /// Launch counter of that session when the monitor was started
    pub run: u64,
    /// What happened
    pub body: MessageBody,
}
