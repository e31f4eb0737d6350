//! # Controller context
//!
//! Shared state handed to every reconciler invocation. The Terminal API and
//! the dependency resolver are injected as trait objects so tests can run
//! the engine against doubles.

use kube::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::deps::ReferenceResolver;
use crate::terminal::TerminalApi;

/// Per-process context shared by all kind controllers.
#[derive(Clone)]
pub struct Context {
    /// Kubernetes client for status patches and dependency reads.
    pub client: Client,
    /// External-action interface for the Terminal API.
    pub terminal: Arc<dyn TerminalApi>,
    /// Dependency resolver backed by fresh status reads.
    pub resolver: Arc<dyn ReferenceResolver>,
    /// Fixed interval between external re-reads of non-terminal orders.
    pub order_poll_interval: Duration,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("order_poll_interval", &self.order_poll_interval)
            .finish_non_exhaustive()
    }
}
