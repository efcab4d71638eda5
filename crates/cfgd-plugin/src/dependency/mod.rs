//! Key dependencies registered by plugins.

pub mod entry;
pub mod pattern;
pub mod table;

pub use entry::{ChangeOp, DependencyCallback, DependencyEntry, DependencyKind, KeyChange};
pub use pattern::{KeyPattern, match_key};
pub use table::DependencyTable;
