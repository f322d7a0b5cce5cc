//! Per-call deadlines.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Attributes, Context, File, FileWriter, Fs, FsError, FsRead, FsWrite, Layer, ReaderOptions,
    SignedUrlOptions, WalkFn, Writer, WriterOptions,
};

/// Bounds every call by a read or write timeout.
///
/// Read-class calls (`open`, `attributes`, `walk`, `url`) get the read
/// timeout. `create` gets the write timeout, and the same deadline covers
/// every `write` and the `close` of the returned writer. `delete` gets the
/// write timeout.
///
/// Each call runs under a child [`Context`] carrying the deadline. When the
/// deadline passes first, the child is cancelled, the inner future dropped,
/// and [`FsError::DeadlineExceeded`] returned. A zero timeout disables the
/// bound. A stream returned by `open` is not cut off once handed out.
pub struct TimeoutFs<B> {
    inner: B,
    read: Duration,
    write: Duration,
}

impl<B> TimeoutFs<B> {
    /// Wrap `inner` with the given read and write timeouts.
    pub fn new(inner: B, read: Duration, write: Duration) -> Self {
        Self { inner, read, write }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

fn scoped(ctx: &Context, timeout: Duration) -> Context {
    if timeout.is_zero() {
        ctx.with_cancel()
    } else {
        ctx.with_timeout(timeout)
    }
}

/// Run `fut` under `ctx`, cancelling `ctx` if it finished first.
async fn bounded<T>(
    ctx: &Context,
    fut: impl Future<Output = Result<T, FsError>>,
) -> Result<T, FsError> {
    let res = ctx.run(fut).await;
    if matches!(res, Err(FsError::DeadlineExceeded)) {
        ctx.cancel();
    }
    res
}

#[async_trait]
impl<B: Fs> FsRead for TimeoutFs<B> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        let ctx = scoped(ctx, self.read);
        bounded(&ctx, self.inner.open(&ctx, path, options)).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        let ctx = scoped(ctx, self.read);
        bounded(&ctx, self.inner.attributes(&ctx, path, options)).await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        let ctx = scoped(ctx, self.read);
        bounded(&ctx, self.inner.walk(&ctx, prefix, visit)).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        let ctx = scoped(ctx, self.read);
        bounded(&ctx, self.inner.url(&ctx, path, options)).await
    }
}

#[async_trait]
impl<B: Fs> FsWrite for TimeoutFs<B> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        let ctx = scoped(ctx, self.write);
        let inner = bounded(&ctx, self.inner.create(&ctx, path, options)).await?;
        Ok(Box::new(TimeoutWriter { inner, ctx }))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        let ctx = scoped(ctx, self.write);
        bounded(&ctx, self.inner.delete(&ctx, path)).await
    }
}

struct TimeoutWriter {
    inner: Writer,
    ctx: Context,
}

#[async_trait]
impl FileWriter for TimeoutWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
        bounded(&self.ctx, self.inner.write(buf)).await
    }

    async fn close(self: Box<Self>) -> Result<(), FsError> {
        let TimeoutWriter { inner, ctx } = *self;
        bounded(&ctx, inner.close()).await
    }
}

/// Layer that bounds calls with [`TimeoutFs`].
#[derive(Debug, Clone, Copy)]
pub struct TimeoutLayer {
    read: Duration,
    write: Duration,
}

impl TimeoutLayer {
    /// Use the given read and write timeouts.
    pub fn new(read: Duration, write: Duration) -> Self {
        Self { read, write }
    }
}

impl<B: Fs> Layer<B> for TimeoutLayer {
    type Backend = TimeoutFs<B>;

    fn layer(self, backend: B) -> Self::Backend {
        TimeoutFs::new(backend, self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsExt, MemoryFs, SlowFs};
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn open_times_out() {
        let fs = TimeoutFs::new(SlowFs::new(MemoryFs::new(), DELAY * 2, DELAY * 2), DELAY, DELAY);
        let start = Instant::now();
        let err = fs
            .open(&Context::background(), "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "context deadline exceeded");
        assert!(start.elapsed() < DELAY * 2);
    }

    #[tokio::test]
    async fn create_times_out() {
        let fs = TimeoutFs::new(SlowFs::new(MemoryFs::new(), DELAY * 2, DELAY * 2), DELAY, DELAY);
        let err = fs
            .create(&Context::background(), "foo", &WriterOptions::default())
            .await
            .err()
            .unwrap();
        assert!(err.is_timeout());
    }

    /// Creates writers whose `close` takes `delay`, ignoring the context.
    struct SlowCommit {
        inner: MemoryFs,
        delay: Duration,
    }

    struct SlowCommitWriter {
        inner: Writer,
        delay: Duration,
    }

    #[async_trait]
    impl FileWriter for SlowCommitWriter {
        async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
            self.inner.write(buf).await
        }

        async fn close(self: Box<Self>) -> Result<(), FsError> {
            tokio::time::sleep(self.delay).await;
            self.inner.close().await
        }
    }

    #[async_trait]
    impl FsRead for SlowCommit {
        async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
            self.inner.open(ctx, path, options).await
        }

        async fn attributes(
            &self,
            ctx: &Context,
            path: &str,
            options: &ReaderOptions,
        ) -> Result<Attributes, FsError> {
            self.inner.attributes(ctx, path, options).await
        }

        async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
            self.inner.walk(ctx, prefix, visit).await
        }

        async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
            self.inner.url(ctx, path, options).await
        }
    }

    #[async_trait]
    impl FsWrite for SlowCommit {
        async fn create(&self, _ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
            let inner = self.inner.create(&Context::background(), path, options).await?;
            Ok(Box::new(SlowCommitWriter {
                inner,
                delay: self.delay,
            }))
        }

        async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
            self.inner.delete(ctx, path).await
        }
    }

    #[tokio::test]
    async fn create_deadline_bounds_writer_close() {
        let mem = MemoryFs::new();
        let slow = SlowCommit {
            inner: mem.clone(),
            delay: DELAY * 2,
        };
        let fs = TimeoutFs::new(slow, DELAY * 10, DELAY);

        let start = Instant::now();
        let err = fs
            .write(&Context::background(), "foo", b"bar", &WriterOptions::default())
            .await
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout());
        assert!(elapsed >= DELAY, "{elapsed:?}");
        assert!(elapsed < DELAY * 2, "{elapsed:?}");
        assert!(mem.is_empty());
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let fs = TimeoutFs::new(MemoryFs::new(), DELAY, DELAY);
        let ctx = Context::background();
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();
        let data = fs.read(&ctx, "foo", &ReaderOptions::default()).await.unwrap();
        assert_eq!(&data[..], b"bar");
        assert!(fs.read(&ctx, "missing", &ReaderOptions::default()).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn zero_timeout_disables_bound() {
        let fs = TimeoutFs::new(
            SlowFs::new(MemoryFs::new(), Duration::from_millis(20), Duration::ZERO),
            Duration::ZERO,
            Duration::ZERO,
        );
        let err = fs
            .open(&Context::background(), "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn caller_cancellation_wins() {
        let fs = TimeoutFs::new(SlowFs::new(MemoryFs::new(), DELAY, DELAY), DELAY * 10, DELAY * 10);
        let ctx = Context::background();
        ctx.cancel();
        let err = fs
            .open(&ctx, "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
    }
}
