//! # Call Context
//!
//! Every storage operation takes a [`Context`]: the caller's cancellation
//! signal, an optional deadline, and an optional [`Trace`] sink.
//!
//! Contexts form a tree. Deriving a context (`with_cancel`, `with_timeout`,
//! `with_deadline`) creates a child whose cancellation never reaches the
//! parent, while cancelling the parent reaches every child. A child's
//! deadline is never later than its parent's.
//!
//! ```rust
//! use std::time::Duration;
//! use tierfs::{Context, FsError};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let root = Context::background();
//! let child = root.with_timeout(Duration::from_secs(5));
//!
//! root.cancel();
//! assert!(matches!(child.err(), Some(FsError::Cancelled)));
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{FsError, Trace};

/// Cancellation, deadline, and trace scope for one or more storage calls.
///
/// Cloning a context shares its cancellation token: cancelling a clone
/// cancels the original.
#[derive(Clone, Default)]
pub struct Context {
    token: CancellationToken,
    deadline: Option<Instant>,
    trace: Option<Arc<dyn Trace>>,
}

impl Context {
    /// A root context with no deadline and no trace.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a child that can be cancelled on its own.
    pub fn with_cancel(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            trace: self.trace.clone(),
        }
    }

    /// Derive a child that expires at `deadline`, or at the parent's
    /// deadline if that comes first.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
            trace: self.trace.clone(),
        }
    }

    /// Derive a child that expires `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Attach a trace sink. The returned context shares this context's
    /// cancellation token and deadline.
    pub fn with_trace(&self, trace: Arc<dyn Trace>) -> Self {
        Self {
            token: self.token.clone(),
            deadline: self.deadline,
            trace: Some(trace),
        }
    }

    /// A new root that keeps this context's trace sink but neither its
    /// cancellation nor its deadline.
    ///
    /// For follow-up work that must finish once the caller's part is done.
    pub fn detached(&self) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            trace: self.trace.clone(),
        }
    }

    /// Cancel this context and every context derived from it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// The attached trace sink, if any.
    pub fn trace(&self) -> Option<&Arc<dyn Trace>> {
        self.trace.as_ref()
    }

    /// Why this context is done, or `None` while it is still live.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<FsError> {
        if self.token.is_cancelled() {
            return Some(FsError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(FsError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> FsError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => FsError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => FsError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                FsError::Cancelled
            }
        }
    }

    /// Run `fut` unless the context finishes first.
    ///
    /// Fails immediately if the context is already done. When the context
    /// finishes mid-flight, `fut` is dropped and the matching error returned.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, FsError>
    where
        F: Future<Output = Result<T, FsError>>,
    {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            res = fut => res,
            err = self.done() => Err(err),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.token.is_cancelled())
            .field("deadline", &self.deadline)
            .field("traced", &self.trace.is_some())
            .finish()
    }
}
