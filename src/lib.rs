//! # tierfs
//!
//! A uniform, asynchronous file-storage contract with composable decorators.
//!
//! Every backend (in-memory map, local directory, remote object store) and
//! every decorator implements the same [`Fs`] trait. Decorators wrap an `Fs`
//! and are themselves an `Fs`, so caching, timeouts, latency injection and
//! tracing stack without touching backend code.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use tierfs::{
//!     CacheLayer, CacheOptions, Context, FsExt, LayerExt, MemoryFs, ReaderOptions,
//!     TimeoutLayer, WriterOptions,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), tierfs::FsError> {
//! let source = MemoryFs::new();
//! let cache = MemoryFs::new();
//! let fs = source
//!     .layer(CacheLayer::new(cache.clone(), CacheOptions::default().max_age(Duration::from_secs(30))))
//!     .layer(TimeoutLayer::new(Duration::from_secs(1), Duration::from_secs(5)));
//!
//! let ctx = Context::background();
//! fs.write(&ctx, "reports/q1.csv", b"a,b\n1,2\n", &WriterOptions::default()).await?;
//!
//! // Served from the cache tier.
//! let data = fs.read(&ctx, "reports/q1.csv", &ReaderOptions::default()).await?;
//! assert_eq!(&data[..], b"a,b\n1,2\n");
//! assert!(cache.exists(&ctx, "reports/q1.csv").await?);
//! # Ok(())
//! # }
//! ```
//!
//! ---
//!
//! ## Core Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`Fs`] | The storage contract: [`FsRead`] + [`FsWrite`] |
//! | [`Context`] | Per-call cancellation, deadline and trace sink |
//! | [`File`] | Open read stream with [`Attributes`] and creation time |
//! | [`Writer`] | Write sink; content is committed on `close` |
//! | [`FsError`] | Error type; `NotFound` is always distinguishable |
//!
//! ## Decorators
//!
//! | Decorator | Purpose |
//! |-----------|---------|
//! | [`CacheFs`] | Source tier + cache tier with expiry and marker-only mode |
//! | [`TimeoutFs`] | Independent read and write deadlines |
//! | [`SlowFs`] | Fixed, cancellable delays for fault injection |
//! | [`TraceFs`] | Records calls to the context's [`Trace`] sink |
//!
//! ---
//!
//! ## Cancellation
//!
//! Every call takes a [`Context`]. Cancelling it, or letting its deadline
//! pass, makes in-flight calls down the whole decorator chain return
//! [`FsError::Cancelled`] or [`FsError::DeadlineExceeded`] promptly.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. No decorator holds a
//! lock across calls, and none serializes concurrent writers to one path.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Serialization for options and [`Attributes`]; `FsExtJson` helpers |

// Private modules
mod backends;
mod context;
mod error;
mod ext;
mod layer;
mod middleware;
mod trace;
mod traits;
mod types;

// Public re-exports - error types
pub use error::{BoxError, FsError};

// Public re-exports - core types
pub use context::Context;
pub use types::{
    AclRule, Attributes, File, Reader, ReaderOptions, SignedUrlOptions, WriterOptions,
};

// Public re-exports - contract
pub use traits::{FileWriter, Fs, FsRead, FsWrite, WalkFn, Writer};

// Public re-exports - backends
pub use backends::{LocalFs, MemoryFs};

// Public re-exports - decorators
pub use middleware::{
    CacheErrorPolicy, CacheFs, CacheLayer, CacheOptions, SlowFs, SlowLayer, TimeoutFs,
    TimeoutLayer, TraceFs, TraceLayer,
};

// Public re-exports - tracing sinks
pub use trace::{Outcome, Trace, TraceEvent, TraceLog, TracingTrace};

// Public re-exports - infrastructure
pub use ext::FsExt;
pub use layer::{Layer, LayerExt};

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
