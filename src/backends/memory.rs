//! In-memory backend.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    Attributes, Context, File, FileWriter, FsError, FsRead, FsWrite, ReaderOptions,
    SignedUrlOptions, WalkFn, Writer, WriterOptions,
};

#[derive(Debug, Clone)]
struct Entry {
    data: Bytes,
    attributes: Attributes,
    created: SystemTime,
}

type Entries = Arc<RwLock<BTreeMap<String, Entry>>>;

/// An ordered in-memory map of paths to content.
///
/// Clones share the same storage.
///
/// Re-creating a path stamps a creation time that is never earlier than the
/// one it replaces, even if the wall clock steps backwards.
#[derive(Debug, Default, Clone)]
pub struct MemoryFs {
    entries: Entries,
}

impl MemoryFs {
    /// Create an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored paths.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, path: &str) -> Result<Entry, FsError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound {
                path: path.to_string(),
            })
    }
}

#[async_trait]
impl FsRead for MemoryFs {
    async fn open(&self, ctx: &Context, path: &str, _options: &ReaderOptions) -> Result<File, FsError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let entry = self.get(path)?;
        Ok(File::from_bytes(entry.data, entry.attributes, entry.created))
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        _options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        Ok(self.get(path)?.attributes)
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        // Snapshot so the visitor runs without holding the lock.
        let paths: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .range(prefix.to_string()..)
            .map(|(path, _)| path)
            .take_while(|path| path.starts_with(prefix))
            .cloned()
            .collect();

        for path in paths {
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            visit(&path)?;
        }
        Ok(())
    }

    async fn url(&self, _ctx: &Context, _path: &str, _options: &SignedUrlOptions) -> Result<String, FsError> {
        Err(FsError::NotSupported { operation: "url" })
    }
}

#[async_trait]
impl FsWrite for MemoryFs {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        Ok(Box::new(MemoryWriter {
            entries: Arc::clone(&self.entries),
            ctx: ctx.clone(),
            path: path.to_string(),
            buf: Vec::with_capacity(options.buffer_size),
            attributes: options.attributes.clone(),
        }))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| FsError::NotFound {
                path: path.to_string(),
            })
    }
}

struct MemoryWriter {
    entries: Entries,
    ctx: Context,
    path: String,
    buf: Vec<u8>,
    attributes: Attributes,
}

#[async_trait]
impl FileWriter for MemoryWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
        if let Some(err) = self.ctx.err() {
            return Err(err);
        }
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), FsError> {
        if let Some(err) = self.ctx.err() {
            return Err(err);
        }
        let MemoryWriter {
            entries,
            path,
            buf,
            mut attributes,
            ..
        } = *self;

        let mut entries = entries.write().unwrap_or_else(PoisonError::into_inner);
        let now = SystemTime::now();
        let created = match entries.get(&path) {
            Some(previous) if previous.created > now => previous.created,
            _ => now,
        };
        attributes.size = buf.len() as u64;
        attributes.mod_time = created;
        entries.insert(
            path,
            Entry {
                data: Bytes::from(buf),
                attributes,
                created,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsExt;

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let fs = MemoryFs::new();
        let err = fs
            .open(&Context::background(), "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_overwrites() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        fs.write(&ctx, "foo", b"", &WriterOptions::default()).await.unwrap();
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();
        let data = fs.read(&ctx, "foo", &ReaderOptions::default()).await.unwrap();
        assert_eq!(&data[..], b"bar");
        assert_eq!(fs.len(), 1);
    }

    #[tokio::test]
    async fn uncommitted_writer_is_discarded() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        let mut w = fs.create(&ctx, "foo", &WriterOptions::default()).await.unwrap();
        w.write(b"bar").await.unwrap();
        drop(w);
        assert!(fs.is_empty());
    }

    #[tokio::test]
    async fn attributes_are_stored() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        let opts = WriterOptions::default()
            .content_type("text/plain")
            .metadata("owner", "ops");
        fs.write(&ctx, "foo", b"bar", &opts).await.unwrap();

        let attrs = fs.attributes(&ctx, "foo", &ReaderOptions::default()).await.unwrap();
        assert_eq!(attrs.content_type, "text/plain");
        assert_eq!(attrs.size, 3);
        assert_eq!(attrs.metadata.get("owner").map(String::as_str), Some("ops"));
    }

    #[tokio::test]
    async fn creation_time_is_monotonic() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        fs.write(&ctx, "foo", b"1", &WriterOptions::default()).await.unwrap();
        let first = fs.open(&ctx, "foo", &ReaderOptions::default()).await.unwrap().creation_time;
        fs.write(&ctx, "foo", b"2", &WriterOptions::default()).await.unwrap();
        let second = fs.open(&ctx, "foo", &ReaderOptions::default()).await.unwrap().creation_time;
        assert!(second >= first);
    }

    #[tokio::test]
    async fn walk_visits_prefix_only() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        for path in ["a/1", "a/2", "b/1", "a"] {
            fs.write(&ctx, path, b"x", &WriterOptions::default()).await.unwrap();
        }
        let mut seen = Vec::new();
        fs.walk(&ctx, "a/", &mut |p: &str| {
            seen.push(p.to_string());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(seen, ["a/1", "a/2"]);
    }

    #[tokio::test]
    async fn walk_stops_on_visitor_error() {
        let ctx = Context::background();
        let fs = MemoryFs::new();
        for path in ["a", "b", "c"] {
            fs.write(&ctx, path, b"x", &WriterOptions::default()).await.unwrap();
        }
        let mut count = 0;
        let err = fs
            .walk(&ctx, "", &mut |_: &str| {
                count += 1;
                Err(FsError::NotSupported { operation: "visit" })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotSupported { .. }));
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let fs = MemoryFs::new();
        let err = fs.delete(&Context::background(), "foo").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn cancelled_context_is_honored() {
        let ctx = Context::background();
        ctx.cancel();
        let fs = MemoryFs::new();
        let err = fs
            .open(&ctx, "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::Cancelled));
    }

    #[tokio::test]
    async fn url_is_not_supported() {
        let fs = MemoryFs::new();
        let err = fs
            .url(&Context::background(), "foo", &SignedUrlOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FsError::NotSupported { operation: "url" }));
    }
}
