//! Call tracing.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::{
    Attributes, Context, File, FileWriter, Fs, FsError, FsRead, FsWrite, Layer, Outcome,
    ReaderOptions, SignedUrlOptions, Trace, TraceEvent, WalkFn, Writer, WriterOptions,
};

/// Records every call to the [`Trace`] attached to the caller's [`Context`].
///
/// Each call produces a `Started` entry and, on completion, an `Ok` or `Err`
/// entry with the elapsed time. A failure also marks the trace as errored.
/// Committing a writer from `create` is traced as a separate `close` call.
/// `walk` is traced as one call, never per visited path.
///
/// Results pass through unchanged. Calls without a trace are forwarded
/// without recording anything.
pub struct TraceFs<B> {
    inner: B,
    name: String,
}

impl<B> TraceFs<B> {
    /// Wrap `inner`, labelling entries with `name`.
    pub fn new(inner: B, name: impl Into<String>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn start(&self, ctx: &Context, operation: &'static str, path: &str) -> Option<Call> {
        ctx.trace()
            .map(|trace| Call::start(Arc::clone(trace), self.name.clone(), operation, path))
    }
}

struct Call {
    trace: Arc<dyn Trace>,
    fs: String,
    operation: &'static str,
    path: String,
    started: Instant,
}

impl Call {
    fn start(trace: Arc<dyn Trace>, fs: String, operation: &'static str, path: &str) -> Self {
        trace.record(TraceEvent {
            fs: fs.clone(),
            operation,
            path: path.to_string(),
            outcome: Outcome::Started,
            elapsed: None,
        });
        Self {
            trace,
            fs,
            operation,
            path: path.to_string(),
            started: Instant::now(),
        }
    }

    fn finish<T>(self, res: &Result<T, FsError>) {
        let outcome = match res {
            Ok(_) => Outcome::Ok,
            Err(e) => Outcome::Err(e.to_string()),
        };
        let failed = res.is_err();
        self.trace.record(TraceEvent {
            fs: self.fs,
            operation: self.operation,
            path: self.path,
            outcome,
            elapsed: Some(self.started.elapsed()),
        });
        if failed {
            self.trace.set_error();
        }
    }
}

fn finish<T>(call: Option<Call>, res: Result<T, FsError>) -> Result<T, FsError> {
    if let Some(call) = call {
        call.finish(&res);
    }
    res
}

#[async_trait]
impl<B: Fs> FsRead for TraceFs<B> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        let call = self.start(ctx, "open", path);
        finish(call, self.inner.open(ctx, path, options).await)
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        let call = self.start(ctx, "attributes", path);
        finish(call, self.inner.attributes(ctx, path, options).await)
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        let call = self.start(ctx, "walk", prefix);
        finish(call, self.inner.walk(ctx, prefix, visit).await)
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        let call = self.start(ctx, "url", path);
        finish(call, self.inner.url(ctx, path, options).await)
    }
}

#[async_trait]
impl<B: Fs> FsWrite for TraceFs<B> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        let call = self.start(ctx, "create", path);
        let inner = finish(call, self.inner.create(ctx, path, options).await)?;
        match ctx.trace() {
            Some(trace) => Ok(Box::new(TraceWriter {
                inner,
                trace: Arc::clone(trace),
                fs: self.name.clone(),
                path: path.to_string(),
            })),
            None => Ok(inner),
        }
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        let call = self.start(ctx, "delete", path);
        finish(call, self.inner.delete(ctx, path).await)
    }
}

struct TraceWriter {
    inner: Writer,
    trace: Arc<dyn Trace>,
    fs: String,
    path: String,
}

#[async_trait]
impl FileWriter for TraceWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
        self.inner.write(buf).await
    }

    async fn close(self: Box<Self>) -> Result<(), FsError> {
        let TraceWriter {
            inner,
            trace,
            fs,
            path,
        } = *self;
        let call = Call::start(trace, fs, "close", &path);
        finish(Some(call), inner.close().await)
    }
}

/// Layer that records calls with [`TraceFs`].
#[derive(Debug, Clone)]
pub struct TraceLayer {
    name: String,
}

impl TraceLayer {
    /// Label entries with `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl<B: Fs> Layer<B> for TraceLayer {
    type Backend = TraceFs<B>;

    fn layer(self, backend: B) -> Self::Backend {
        TraceFs::new(backend, self.name)
    }
}
