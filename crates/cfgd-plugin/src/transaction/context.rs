//! Transaction context — the in-flight transaction handed to transaction hooks.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

impl TransactionId {
    /// Create a new time-ordered identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Opaque reference to a configuration store snapshot.
///
/// The storage layer owns the snapshot; this is only its name or path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotRef(Arc<str>);

impl SnapshotRef {
    /// Wraps a snapshot name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Returns the snapshot name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a transaction is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionPhase {
    /// Created, no hook run yet.
    NotStarted,
    /// `transaction_begin` has been dispatched.
    Began,
    /// `transaction_complete` has been dispatched.
    Completed,
    /// Every `transaction_end` hook succeeded.
    Ended,
    /// `transaction_abort` is being dispatched.
    Aborting,
    /// `transaction_abort` has been dispatched.
    Aborted,
}

impl TransactionPhase {
    /// Returns whether no further phase may run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended | Self::Aborted)
    }
}

impl fmt::Display for TransactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not_started",
            Self::Began => "began",
            Self::Completed => "completed",
            Self::Ended => "ended",
            Self::Aborting => "aborting",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// One in-flight transaction.
///
/// Built by the transaction driver for each commit; hooks receive a copy
/// reflecting the phase being dispatched.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    /// Transaction identifier.
    id: TransactionId,
    /// When the context was created.
    started_at: DateTime<Utc>,
    /// Proposed configuration.
    candidate: SnapshotRef,
    /// Last committed configuration.
    running: SnapshotRef,
    /// Current phase.
    phase: TransactionPhase,
}

impl TransactionContext {
    /// Creates a fresh transaction between two snapshots.
    pub fn new(candidate: SnapshotRef, running: SnapshotRef) -> Self {
        Self {
            id: TransactionId::new(),
            started_at: Utc::now(),
            candidate,
            running,
            phase: TransactionPhase::NotStarted,
        }
    }

    /// Returns the transaction identifier.
    pub fn id(&self) -> TransactionId {
        self.id
    }

    /// Returns when the transaction was created.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns the candidate snapshot.
    pub fn candidate(&self) -> &SnapshotRef {
        &self.candidate
    }

    /// Returns the running snapshot.
    pub fn running(&self) -> &SnapshotRef {
        &self.running
    }

    /// Returns the current phase.
    pub fn phase(&self) -> TransactionPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: TransactionPhase) {
        self.phase = phase;
    }
}
