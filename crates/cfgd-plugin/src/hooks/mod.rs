//! Hook system — hook kinds, per-plugin hook tables, and phase dispatch.

pub mod definitions;
pub mod dispatcher;
pub mod table;

pub use definitions::{HookArgs, HookKind, HookSignal};
pub use dispatcher::{PhaseReport, SuppressedFailure};
pub use table::{HookFn, HookTable};
