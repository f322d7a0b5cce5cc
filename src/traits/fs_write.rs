//! Write-class operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Context, FsError, WriterOptions};

/// Write sink returned by [`FsWrite::create`].
///
/// Content becomes visible at the path only when [`close`](Self::close)
/// succeeds, and then replaces whatever was there. Dropping a writer without
/// closing it discards the buffered content.
#[async_trait]
pub trait FileWriter: Send {
    /// Append `buf` to the pending content.
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError>;

    /// Commit the pending content.
    async fn close(self: Box<Self>) -> Result<(), FsError>;
}

/// Boxed write sink.
pub type Writer = Box<dyn FileWriter>;

/// Write-class operations of the storage contract.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Concurrent writers to the same
/// path are not serialized; the last successful `close` wins.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
#[async_trait]
pub trait FsWrite: Send + Sync {
    /// Start writing `path`, replacing its content on commit.
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError>;

    /// Remove `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError>;
}

#[async_trait]
impl<T: FsWrite + ?Sized> FsWrite for Arc<T> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        (**self).create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        (**self).delete(ctx, path).await
    }
}

#[async_trait]
impl<T: FsWrite + ?Sized> FsWrite for Box<T> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        (**self).create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        (**self).delete(ctx, path).await
    }
}
