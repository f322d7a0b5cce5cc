//! # Decorators
//!
//! Each decorator wraps an [`Fs`](crate::Fs) and is itself an `Fs`, so they
//! stack in any order:
//!
//! | Decorator | Layer | Adds |
//! |-----------|-------|------|
//! | [`CacheFs`] | [`CacheLayer`] | read-through / write-through cache tier with expiry |
//! | [`TimeoutFs`] | [`TimeoutLayer`] | per-call read and write deadlines |
//! | [`SlowFs`] | [`SlowLayer`] | fixed, cancellable latency before each call |
//! | [`TraceFs`] | [`TraceLayer`] | per-call trace entries |

mod cache;
mod slow;
mod timeout;
mod trace;

pub use cache::{CacheErrorPolicy, CacheFs, CacheLayer, CacheOptions};
pub use slow::{SlowFs, SlowLayer};
pub use timeout::{TimeoutFs, TimeoutLayer};
pub use trace::{TraceFs, TraceLayer};
