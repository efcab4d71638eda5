//! Transaction protocol: the in-flight context and the phase orchestrator.

pub mod context;
pub mod orchestrator;

pub use context::{SnapshotRef, TransactionContext, TransactionId, TransactionPhase};
pub use orchestrator::{TransactionError, TransactionOrchestrator};
