//! # Reconciliation error taxonomy
//!
//! Every failure a reconciler can produce, classified into permanent
//! (never retried automatically) and transient (retried after a fixed
//! delay). The shared `error_policy` turns that classification into the
//! controller's requeue decision, so no per-kind code schedules retries.

use kube_runtime::controller::Action;
use kube_runtime::finalizer;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

use crate::metrics;
use crate::terminal::ApiError;

use super::context::Context;

/// Retry delay when a referenced resource does not exist yet.
pub const RETRY_DEPENDENCY_MISSING: Duration = Duration::from_secs(60);
/// Retry delay when a referenced resource exists but is still provisioning.
/// Shorter than the missing case: the dependency is actively converging.
pub const RETRY_DEPENDENCY_PENDING: Duration = Duration::from_secs(15);
/// Retry delay for server-side and transport failures.
pub const RETRY_EXTERNAL: Duration = Duration::from_secs(60);

/// Error produced by a reconciler invocation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The spec is missing or carries an unusable required field.
    #[error("invalid spec: {0}")]
    Validation(String),

    /// A referenced prerequisite does not exist.
    #[error("dependency {kind} {namespace}/{name} not found")]
    DependencyNotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// A referenced prerequisite exists but is not in its ready phase.
    #[error("dependency {kind} {namespace}/{name} not ready (phase {phase})")]
    DependencyNotReady {
        kind: &'static str,
        namespace: String,
        name: String,
        phase: String,
    },

    /// The service answered successfully but without the data the contract
    /// promises (e.g. a create response with no identifier).
    #[error("external service contract violation: {0}")]
    ContractViolation(String),

    /// The Terminal API call failed.
    #[error(transparent)]
    External(#[from] ApiError),

    /// A Kubernetes API call failed (status patch, dependency read).
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    /// Finalizer bookkeeping failed.
    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<finalizer::Error<ReconcileError>>),
}

/// How an error should be handled by the retry machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Do not retry; the resource stays Failed until its spec changes.
    Permanent,
    /// Retry once after the given delay.
    Transient(Duration),
}

impl ReconcileError {
    /// Classify the error per the taxonomy: validation and contract
    /// violations and 4xx rejections are permanent; missing/unready
    /// dependencies, 5xx responses, transport failures, and Kubernetes API
    /// errors are transient.
    pub fn severity(&self) -> Severity {
        match self {
            ReconcileError::Validation(_) | ReconcileError::ContractViolation(_) => {
                Severity::Permanent
            }
            ReconcileError::DependencyNotFound { .. } => {
                Severity::Transient(RETRY_DEPENDENCY_MISSING)
            }
            ReconcileError::DependencyNotReady { .. } => {
                Severity::Transient(RETRY_DEPENDENCY_PENDING)
            }
            ReconcileError::External(e) => classify_api_error(e),
            ReconcileError::Kube(_) => Severity::Transient(RETRY_EXTERNAL),
            ReconcileError::Finalizer(inner) => match inner.as_ref() {
                finalizer::Error::ApplyFailed(e) | finalizer::Error::CleanupFailed(e) => {
                    e.severity()
                }
                _ => Severity::Transient(RETRY_EXTERNAL),
            },
        }
    }

    pub fn is_permanent(&self) -> bool {
        self.severity() == Severity::Permanent
    }
}

/// Map a Terminal API failure onto the retry taxonomy.
fn classify_api_error(error: &ApiError) -> Severity {
    match error {
        // A malformed success response will not improve on retry.
        ApiError::Decode(_) => Severity::Permanent,
        _ if error.is_client_error() => Severity::Permanent,
        _ => Severity::Transient(RETRY_EXTERNAL),
    }
}

/// Shared error policy for all kind controllers. Transient errors schedule
/// exactly one future attempt at the classified delay (kube-runtime
/// supersedes any pending requeue for the same object); permanent errors
/// stop the retry chain until the spec changes.
pub fn error_policy<K>(obj: Arc<K>, error: &ReconcileError, _ctx: Arc<Context>) -> Action
where
    K: kube::Resource<DynamicType = ()>,
{
    let kind = K::kind(&());
    let name = obj.meta().name.as_deref().unwrap_or("unknown");
    let namespace = obj.meta().namespace.as_deref().unwrap_or("default");

    metrics::increment_reconciliation_errors(&kind);

    match error.severity() {
        Severity::Transient(delay) => {
            warn!(
                "Reconciliation of {} {}/{} failed (retrying in {}s): {}",
                kind,
                namespace,
                name,
                delay.as_secs(),
                error
            );
            Action::requeue(delay)
        }
        Severity::Permanent => {
            error!(
                "Reconciliation of {} {}/{} failed permanently: {}",
                kind, namespace, name, error
            );
            Action::await_change()
        }
    }
}
