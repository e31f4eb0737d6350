//! # Reconciliation engine
//!
//! The state machine core of the operator: per-kind reconcilers sharing one
//! skeleton, dependency resolution over fresh status reads, a permanent vs.
//! transient error taxonomy driving the retry policy, the order drift
//! poller, and the status patch helpers everything writes through.

pub mod context;
pub mod deps;
pub mod drift;
pub mod error;
pub mod reconcile;
pub mod status;

pub use context::Context;
pub use error::{error_policy, ReconcileError, Severity};
