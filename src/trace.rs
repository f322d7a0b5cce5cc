//! Trace sinks consumed by [`TraceFs`](crate::TraceFs).
//!
//! A sink is attached to a [`Context`](crate::Context) with
//! [`Context::with_trace`](crate::Context::with_trace). Calls made without a
//! sink are not traced.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// How a traced call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The call was issued.
    Started,
    /// The call succeeded.
    Ok,
    /// The call failed with the rendered error.
    Err(String),
}

/// One structured trace entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Name of the traced filesystem.
    pub fs: String,
    /// Operation name, e.g. `open`.
    pub operation: &'static str,
    /// Path or prefix the call addressed.
    pub path: String,
    /// What happened.
    pub outcome: Outcome,
    /// Time spent in the call. `None` for [`Outcome::Started`].
    pub elapsed: Option<Duration>,
}

/// Sink for trace entries. No acknowledgement is returned.
pub trait Trace: Send + Sync {
    /// Record an entry.
    fn record(&self, event: TraceEvent);

    /// Mark the whole trace as errored.
    fn set_error(&self);
}

/// In-memory sink that keeps every entry for later inspection.
#[derive(Debug, Default)]
pub struct TraceLog {
    events: Mutex<Vec<TraceEvent>>,
    errored: AtomicBool,
}

impl TraceLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries, oldest first.
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether any traced call failed.
    pub fn is_errored(&self) -> bool {
        self.errored.load(Ordering::Acquire)
    }
}

impl Trace for TraceLog {
    fn record(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn set_error(&self) {
        self.errored.store(true, Ordering::Release);
    }
}

/// Sink that forwards entries to the `tracing` subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTrace;

impl Trace for TracingTrace {
    fn record(&self, event: TraceEvent) {
        let elapsed_ms = event.elapsed.map(|d| d.as_secs_f64() * 1000.0);
        match &event.outcome {
            Outcome::Started => tracing::debug!(
                fs = %event.fs,
                operation = event.operation,
                path = %event.path,
                "storage call"
            ),
            Outcome::Ok => tracing::debug!(
                fs = %event.fs,
                operation = event.operation,
                path = %event.path,
                elapsed_ms,
                "storage call ok"
            ),
            Outcome::Err(error) => tracing::warn!(
                fs = %event.fs,
                operation = event.operation,
                path = %event.path,
                elapsed_ms,
                error = %error,
                "storage call failed"
            ),
        }
    }

    fn set_error(&self) {}
}
