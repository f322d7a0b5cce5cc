//! Read-class operations.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{Attributes, Context, File, FsError, ReaderOptions, SignedUrlOptions};

/// Visitor invoked by [`FsRead::walk`] once per matching path.
///
/// Returning an error stops the walk; the error is returned from `walk`.
pub type WalkFn<'a> = dyn FnMut(&str) -> Result<(), FsError> + Send + 'a;

/// Read-class operations of the storage contract.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods take `&self` so one
/// value can serve concurrent callers; backends synchronize internally.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
#[async_trait]
pub trait FsRead: Send + Sync {
    /// Open a file for reading.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::Cancelled`] / [`FsError::DeadlineExceeded`] if `ctx` finishes first
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError>;

    /// Fetch the attributes stored for a path.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError>;

    /// Visit every path that starts with `prefix`.
    ///
    /// An empty prefix visits everything. An absent prefix is not an error.
    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError>;

    /// Produce a URL granting access to `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] if the backend cannot sign URLs
    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError>;
}

#[async_trait]
impl<T: FsRead + ?Sized> FsRead for Arc<T> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        (**self).open(ctx, path, options).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        (**self).attributes(ctx, path, options).await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        (**self).walk(ctx, prefix, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        (**self).url(ctx, path, options).await
    }
}

#[async_trait]
impl<T: FsRead + ?Sized> FsRead for Box<T> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        (**self).open(ctx, path, options).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        (**self).attributes(ctx, path, options).await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        (**self).walk(ctx, prefix, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        (**self).url(ctx, path, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_read_is_object_safe() {
        fn _check(_: &dyn FsRead) {}
    }

    #[test]
    fn fs_read_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        fn _check<T: FsRead>() {
            _assert_send_sync::<T>();
        }
    }
}
