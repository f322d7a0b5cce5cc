//! Latency injection for exercising timeouts and cancellation.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    Attributes, Context, File, Fs, FsError, FsRead, FsWrite, Layer, ReaderOptions,
    SignedUrlOptions, WalkFn, Writer, WriterOptions,
};

/// Delays every call by a fixed amount before delegating.
///
/// Read-class calls (`open`, `attributes`, `walk`, `url`) wait the read
/// delay; `create` and `delete` wait the write delay. Writes through a
/// returned writer are not delayed. The wait ends early with the context's
/// error if the caller's [`Context`] is cancelled or its deadline passes.
pub struct SlowFs<B> {
    inner: B,
    read: Duration,
    write: Duration,
}

impl<B> SlowFs<B> {
    /// Wrap `inner` with the given read and write delays.
    pub fn new(inner: B, read: Duration, write: Duration) -> Self {
        Self { inner, read, write }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }
}

async fn pause(ctx: &Context, delay: Duration) -> Result<(), FsError> {
    ctx.run(async {
        tokio::time::sleep(delay).await;
        Ok(())
    })
    .await
}

#[async_trait]
impl<B: Fs> FsRead for SlowFs<B> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        pause(ctx, self.read).await?;
        self.inner.open(ctx, path, options).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        pause(ctx, self.read).await?;
        self.inner.attributes(ctx, path, options).await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        pause(ctx, self.read).await?;
        self.inner.walk(ctx, prefix, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        pause(ctx, self.read).await?;
        self.inner.url(ctx, path, options).await
    }
}

#[async_trait]
impl<B: Fs> FsWrite for SlowFs<B> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        pause(ctx, self.write).await?;
        self.inner.create(ctx, path, options).await
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        pause(ctx, self.write).await?;
        self.inner.delete(ctx, path).await
    }
}

/// Layer that delays calls with [`SlowFs`].
#[derive(Debug, Clone, Copy)]
pub struct SlowLayer {
    read: Duration,
    write: Duration,
}

impl SlowLayer {
    /// Use the given read and write delays.
    pub fn new(read: Duration, write: Duration) -> Self {
        Self { read, write }
    }
}

impl<B: Fs> Layer<B> for SlowLayer {
    type Backend = SlowFs<B>;

    fn layer(self, backend: B) -> Self::Backend {
        SlowFs::new(backend, self.read, self.write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsExt, MemoryFs};
    use tokio::time::Instant;

    const DELAY: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn each_call_is_delayed() {
        let fs = SlowFs::new(MemoryFs::new(), DELAY, DELAY);
        let ctx = Context::background();
        let start = Instant::now();

        // create + open + attributes
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();
        fs.read(&ctx, "foo", &ReaderOptions::default()).await.unwrap();
        fs.attributes(&ctx, "foo", &ReaderOptions::default()).await.unwrap();

        let elapsed = start.elapsed();
        assert!(elapsed >= DELAY * 3, "{elapsed:?}");
        assert!(elapsed < DELAY * 3 + Duration::from_secs(1), "{elapsed:?}");
    }

    #[tokio::test]
    async fn cancelled_context_fails_immediately() {
        let fs = SlowFs::new(MemoryFs::new(), Duration::from_secs(10), Duration::from_secs(10));
        let ctx = Context::background();
        ctx.cancel();
        let start = Instant::now();
        let err = fs.delete(&ctx, "foo").await.unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn cancellation_interrupts_wait() {
        let fs = SlowFs::new(MemoryFs::new(), Duration::from_secs(10), Duration::from_secs(10));
        let ctx = Context::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(DELAY).await;
            canceller.cancel();
        });
        let start = Instant::now();
        let err = fs
            .open(&ctx, "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn deadline_interrupts_wait() {
        let fs = SlowFs::new(MemoryFs::new(), Duration::from_secs(10), Duration::from_secs(10));
        let ctx = Context::background().with_timeout(DELAY);
        let err = fs
            .attributes(&ctx, "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }
}
