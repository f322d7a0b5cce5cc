//! # Layer Trait
//!
//! Tower-style composition of decorators.
//!
//! ## How It Works
//!
//! ```text
//! Backend ──▶ Layer::layer() ──▶ Wrapped Backend
//! ```
//!
//! Each decorator provides:
//! 1. A wrapper struct that implements [`Fs`]
//! 2. A `Layer` implementation that creates the wrapper
//!
//! ## Fluent Composition
//!
//! [`LayerExt`] adds `.layer()` to every backend. Layers apply inside-out:
//! the first `.layer()` call wraps the backend directly.
//!
//! ```rust
//! use std::time::Duration;
//! use tierfs::{
//!     CacheLayer, CacheOptions, LayerExt, MemoryFs, TimeoutLayer, TraceLayer,
//! };
//!
//! // Trace -> Timeout -> Cache(source = remote, cache = local)
//! let remote = MemoryFs::new();
//! let local = MemoryFs::new();
//! let fs = remote
//!     .layer(CacheLayer::new(local, CacheOptions::default().max_age(Duration::from_secs(60))))
//!     .layer(TimeoutLayer::new(Duration::from_secs(5), Duration::from_secs(30)))
//!     .layer(TraceLayer::new("assets"));
//! # let _ = fs;
//! ```

use crate::Fs;

/// A layer that wraps a backend to add functionality.
///
/// # Type Parameters
///
/// - `B`: The backend type being wrapped
///
/// # Design Notes
///
/// - `layer(self, backend)` consumes both the layer and backend
/// - The resulting `Backend` type implements [`Fs`] for every layer shipped
///   with this crate
pub trait Layer<B> {
    /// The resulting backend type after applying this layer.
    type Backend;

    /// Wrap the given backend with this layer's functionality.
    fn layer(self, backend: B) -> Self::Backend;
}

/// Extension trait for fluent layer composition.
///
/// Provides the `.layer()` method on any `Fs` backend for ergonomic chaining.
pub trait LayerExt: Fs + Sized {
    /// Apply a layer to this backend.
    fn layer<L: Layer<Self>>(self, layer: L) -> L::Backend {
        layer.layer(self)
    }
}

// Blanket implementation - any Fs backend gets LayerExt for free
impl<B: Fs> LayerExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        CacheLayer, CacheOptions, Context, FsExt, MemoryFs, ReaderOptions, SlowLayer,
        TimeoutLayer, TraceLayer, TraceLog, WriterOptions,
    };
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn layer_ext_is_auto_implemented() {
        fn _check<B: Fs + LayerExt>() {}
    }

    #[tokio::test]
    async fn layers_compose_into_fs() {
        let source = MemoryFs::new();
        let cache = MemoryFs::new();
        let fs = source
            .clone()
            .layer(CacheLayer::new(cache.clone(), CacheOptions::default()))
            .layer(SlowLayer::new(Duration::ZERO, Duration::ZERO))
            .layer(TimeoutLayer::new(Duration::from_secs(5), Duration::from_secs(5)))
            .layer(TraceLayer::new("stack"));

        fn _takes_fs<T: Fs>(_: &T) {}
        _takes_fs(&fs);

        let log = Arc::new(TraceLog::new());
        let ctx = Context::background().with_trace(log.clone());
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();

        let opts = ReaderOptions::default();
        assert_eq!(&source.read(&ctx, "foo", &opts).await.unwrap()[..], b"bar");
        assert_eq!(&cache.read(&ctx, "foo", &opts).await.unwrap()[..], b"bar");
        assert!(!log.events().is_empty());
    }
}
