//! Per-run context handed to every component
//!
//! Carries the run identifier, the tracing span all log events of a run are
//! recorded under, and a cooperative cancellation flag.

use crate::error::{HousingError, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Span;
use uuid::Uuid;

/// Cloneable cancellation flag shared between a run and its controller
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed at the next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns `Err(Cancelled)` once cancellation was requested
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(HousingError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Context for a single pipeline run
#[derive(Debug, Clone)]
pub struct RunContext {
    run_id: String,
    span: Span,
    cancel: CancellationToken,
}

impl RunContext {
    /// Create a context with a generated run id
    pub fn new() -> Self {
        Self::with_run_id(generate_run_id())
    }

    /// Create a context for an explicit run id
    pub fn with_run_id(run_id: impl Into<String>) -> Self {
        let run_id = run_id.into();
        let span = tracing::info_span!("run", run_id = %run_id);
        Self {
            run_id,
            span,
            cancel: CancellationToken::new(),
        }
    }

    /// Share an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Shorthand for `cancellation().check()`
    pub fn checkpoint(&self) -> Result<()> {
        self.cancel.check()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

/// UTC timestamp plus a short random suffix, e.g. `2026-10-16-08-30-00-1a2b3c4d`
pub fn generate_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().format("%Y-%m-%d-%H-%M-%S"), &suffix[..8])
}
