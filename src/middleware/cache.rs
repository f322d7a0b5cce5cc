//! Read-through / write-through cache over two tiers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::{
    Attributes, Context, File, FileWriter, Fs, FsError, FsExt, FsRead, FsWrite, Layer,
    ReaderOptions, SignedUrlOptions, WalkFn, Writer, WriterOptions,
};

/// What to do when the cache tier fails while the source tier succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CacheErrorPolicy {
    /// Log the failure and serve the source result.
    #[default]
    FailOpen,
    /// Return the cache-tier error to the caller.
    FailClosed,
}

/// Cache behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheOptions {
    /// Entries older than this are refreshed from the source tier.
    /// `None` or zero means entries never expire by time.
    pub max_age: Option<Duration>,
    /// Store only a presence marker in the cache tier, never content.
    pub no_data: bool,
    /// Cache-tier failure handling.
    pub on_cache_error: CacheErrorPolicy,
}

impl CacheOptions {
    /// Set the time-to-live of cache entries.
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Enable or disable marker-only caching.
    pub fn no_data(mut self, no_data: bool) -> Self {
        self.no_data = no_data;
        self
    }

    /// Set the cache-tier failure policy.
    pub fn on_cache_error(mut self, policy: CacheErrorPolicy) -> Self {
        self.on_cache_error = policy;
        self
    }

    /// Whether an entry of the given age may still be served.
    pub fn is_fresh(&self, age: Duration) -> bool {
        match self.max_age {
            Some(max_age) if !max_age.is_zero() => age < max_age,
            _ => true,
        }
    }
}

/// Presents a `source` tier and a `cache` tier as one filesystem.
///
/// - `open` serves a fresh cache entry without touching the source.
///   Otherwise it reads the source and refills the cache at the same path.
///   With [`CacheOptions::no_data`] every open goes to the source and only an
///   empty marker is written to the cache.
/// - `create` evicts the cache entry, commits to the source, then mirrors
///   the content (or a marker) into the cache.
/// - `delete` removes from the source first, then from the cache.
/// - `attributes`, `walk` and `url` are answered by the source only.
///
/// Source errors always reach the caller. Cache-tier errors are handled per
/// [`CacheErrorPolicy`]; under the default `FailOpen` they are logged with
/// `tracing::warn!` and the source result is returned. A failed mirror write
/// also evicts the cache entry so the next `open` misses instead of serving
/// old content.
///
/// Cache-tier copies and evictions run detached from the caller's
/// cancellation and deadline, so a caller that gives up after the source
/// committed cannot leave old content behind.
///
/// A hit returns the attributes the cache tier reports, a miss those of the
/// source. Tiers that do not store content type or metadata (such as
/// [`LocalFs`](crate::LocalFs)) report them empty on a hit.
///
/// Concurrent `create` calls to one path are not serialized.
pub struct CacheFs<S, C> {
    source: S,
    cache: Arc<C>,
    options: CacheOptions,
}

impl<S, C> CacheFs<S, C> {
    /// Compose `source` and `cache`.
    pub fn new(source: S, cache: C, options: CacheOptions) -> Self {
        Self {
            source,
            cache: Arc::new(cache),
            options,
        }
    }

    /// The active options.
    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    /// The source tier.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The cache tier.
    pub fn cache(&self) -> &C {
        &self.cache
    }
}

fn cache_failure(
    policy: CacheErrorPolicy,
    operation: &'static str,
    path: &str,
    error: FsError,
) -> Result<(), FsError> {
    match policy {
        CacheErrorPolicy::FailOpen => {
            warn!(path, operation, error = %error, "cache tier failure ignored");
            Ok(())
        }
        CacheErrorPolicy::FailClosed => Err(error),
    }
}

/// Write `content` to the cache tier, evicting the entry if that fails.
///
/// Runs detached from the caller's cancellation and deadline: the source
/// tier has already answered, and an abandoned copy would leave old content
/// in the cache.
async fn mirror<C: Fs>(
    cache: &C,
    ctx: &Context,
    path: &str,
    content: &[u8],
    attributes: &Attributes,
) -> Result<(), FsError> {
    let ctx = ctx.detached();
    let options = WriterOptions {
        attributes: attributes.clone(),
        ..WriterOptions::default()
    };
    let Err(error) = cache.write(&ctx, path, content, &options).await else {
        return Ok(());
    };
    if let Err(e) = evict(cache, &ctx, path).await {
        warn!(path, error = %e, "cache eviction after failed write");
    }
    Err(error)
}

/// Remove `path` from the cache tier, detached from the caller. A missing
/// entry is not an error.
async fn evict<C: Fs>(cache: &C, ctx: &Context, path: &str) -> Result<(), FsError> {
    match cache.delete(&ctx.detached(), path).await {
        Err(e) if !e.is_not_found() => Err(e),
        _ => Ok(()),
    }
}

impl<S: Fs, C: Fs + 'static> CacheFs<S, C> {
    async fn refill(&self, ctx: &Context, path: &str, file: File) -> Result<File, FsError> {
        let refreshed = SystemTime::now();

        if self.options.no_data {
            if let Err(e) = mirror(&*self.cache, ctx, path, &[], &file.attributes).await {
                cache_failure(self.options.on_cache_error, "refill", path, e)?;
            }
            return Ok(File {
                creation_time: refreshed,
                ..file
            });
        }

        let attributes = file.attributes.clone();
        let data = file.read_to_end().await?;
        if let Err(e) = mirror(&*self.cache, ctx, path, &data, &attributes).await {
            cache_failure(self.options.on_cache_error, "refill", path, e)?;
        }
        debug!(path, size = data.len(), "cache refilled from source");
        Ok(File::from_bytes(data, attributes, refreshed))
    }
}

#[async_trait]
impl<S: Fs, C: Fs + 'static> FsRead for CacheFs<S, C> {
    async fn open(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<File, FsError> {
        if !self.options.no_data {
            match self.cache.open(ctx, path, options).await {
                Ok(file) => {
                    let age = file.age(SystemTime::now());
                    if self.options.is_fresh(age) {
                        debug!(path, "cache hit");
                        return Ok(file);
                    }
                    debug!(path, age = ?age, "cache entry expired");
                }
                Err(e) if e.is_not_found() => debug!(path, "cache miss"),
                Err(e) => cache_failure(self.options.on_cache_error, "open", path, e)?,
            }
        }

        let file = self.source.open(ctx, path, options).await?;
        self.refill(ctx, path, file).await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        self.source.attributes(ctx, path, options).await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        self.source.walk(ctx, prefix, visit).await
    }

    async fn url(&self, ctx: &Context, path: &str, options: &SignedUrlOptions) -> Result<String, FsError> {
        self.source.url(ctx, path, options).await
    }
}

#[async_trait]
impl<S: Fs, C: Fs + 'static> FsWrite for CacheFs<S, C> {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        let source = self.source.create(ctx, path, options).await?;
        Ok(Box::new(CacheWriter {
            source,
            cache: Arc::clone(&self.cache),
            ctx: ctx.clone(),
            path: path.to_string(),
            attributes: options.attributes.clone(),
            buf: Vec::new(),
            no_data: self.options.no_data,
            policy: self.options.on_cache_error,
        }))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        self.source.delete(ctx, path).await?;
        match evict(&*self.cache, ctx, path).await {
            Ok(()) => Ok(()),
            Err(e) => cache_failure(self.options.on_cache_error, "delete", path, e),
        }
    }
}

struct CacheWriter<C> {
    source: Writer,
    cache: Arc<C>,
    ctx: Context,
    path: String,
    attributes: Attributes,
    buf: Vec<u8>,
    no_data: bool,
    policy: CacheErrorPolicy,
}

#[async_trait]
impl<C: Fs + 'static> FileWriter for CacheWriter<C> {
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
        self.source.write(buf).await?;
        if !self.no_data {
            self.buf.extend_from_slice(buf);
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), FsError> {
        let CacheWriter {
            source,
            cache,
            ctx,
            path,
            attributes,
            buf,
            policy,
            ..
        } = *self;

        // Drop the old copy before the source commits, so a close abandoned
        // between the two steps leaves a miss rather than stale content.
        if let Err(e) = evict(&*cache, &ctx, &path).await {
            cache_failure(policy, "evict", &path, e)?;
        }
        source.close().await?;
        if let Err(e) = mirror(&*cache, &ctx, &path, &buf, &attributes).await {
            cache_failure(policy, "mirror", &path, e)?;
        }
        Ok(())
    }
}

/// Layer that puts a cache tier in front of the wrapped backend.
///
/// The wrapped backend becomes the source tier.
pub struct CacheLayer<C> {
    cache: C,
    options: CacheOptions,
}

impl<C> CacheLayer<C> {
    /// Use `cache` as the cache tier.
    pub fn new(cache: C, options: CacheOptions) -> Self {
        Self { cache, options }
    }
}

impl<B: Fs, C: Fs + 'static> Layer<B> for CacheLayer<C> {
    type Backend = CacheFs<B, C>;

    fn layer(self, backend: B) -> Self::Backend {
        CacheFs::new(backend, self.cache, self.options)
    }
}
