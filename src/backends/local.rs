//! Local directory backend over `tokio::fs`.

use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    Attributes, Context, File, FileWriter, FsError, FsRead, FsWrite, ReaderOptions,
    SignedUrlOptions, WalkFn, Writer, WriterOptions,
};

/// Suffix of in-flight writes. Such files are never visible as paths.
const TEMP_SUFFIX: &str = ".tierfs-tmp";

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Stores each path as a file below a root directory.
///
/// Paths are `/`-separated keys relative to the root. Keys with absolute or
/// `..` components are rejected. Content type and metadata are not persisted.
#[derive(Debug, Clone)]
pub struct LocalFs {
    root: PathBuf,
}

impl LocalFs {
    /// Create a backend rooted at `root`. The directory is created on first write.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, FsError> {
        let rel = Path::new(key);
        if key.is_empty() {
            return Err(FsError::InvalidPath {
                path: key.to_string(),
                reason: "empty path",
            });
        }
        if key.ends_with(TEMP_SUFFIX) {
            return Err(FsError::InvalidPath {
                path: key.to_string(),
                reason: "reserved suffix",
            });
        }
        for component in rel.components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(FsError::InvalidPath {
                    path: key.to_string(),
                    reason: "must be relative without `.` or `..`",
                });
            }
        }
        Ok(self.root.join(rel))
    }

    async fn stat(&self, key: &str) -> Result<(PathBuf, std::fs::Metadata), FsError> {
        let path = self.path_for(key)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FsError::io("stat", key, e))?;
        if !meta.is_file() {
            return Err(FsError::NotFound {
                path: key.to_string(),
            });
        }
        Ok((path, meta))
    }
}

fn attributes_from(meta: &std::fs::Metadata) -> Attributes {
    Attributes {
        size: meta.len(),
        mod_time: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
        ..Attributes::default()
    }
}

#[async_trait]
impl FsRead for LocalFs {
    async fn open(&self, ctx: &Context, path: &str, _options: &ReaderOptions) -> Result<File, FsError> {
        ctx.run(async {
            let (full, meta) = self.stat(path).await?;
            let file = tokio::fs::File::open(&full)
                .await
                .map_err(|e| FsError::io("open", path, e))?;
            let attributes = attributes_from(&meta);
            let creation_time = attributes.mod_time;
            Ok(File {
                reader: Box::new(file),
                attributes,
                creation_time,
            })
        })
        .await
    }

    async fn attributes(
        &self,
        ctx: &Context,
        path: &str,
        _options: &ReaderOptions,
    ) -> Result<Attributes, FsError> {
        ctx.run(async {
            let (_, meta) = self.stat(path).await?;
            Ok(attributes_from(&meta))
        })
        .await
    }

    async fn walk(&self, ctx: &Context, prefix: &str, visit: &mut WalkFn<'_>) -> Result<(), FsError> {
        let mut keys = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            if let Some(err) = ctx.err() {
                return Err(err);
            }
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(FsError::io("walk", key_prefix, e)),
            };
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FsError::io("walk", key_prefix.as_str(), e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    continue;
                };
                let key = format!("{key_prefix}{name}");
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| FsError::io("walk", key.as_str(), e))?;
                if file_type.is_dir() {
                    // Only descend where a match is still possible.
                    let dir_key = format!("{key}/");
                    if dir_key.starts_with(prefix) || prefix.starts_with(&dir_key) {
                        pending.push((entry.path(), dir_key));
                    }
                } else if key.starts_with(prefix) && !key.ends_with(TEMP_SUFFIX) {
                    keys.push(key);
                }
            }
        }

        keys.sort();
        for key in keys {
            visit(&key)?;
        }
        Ok(())
    }

    async fn url(&self, ctx: &Context, path: &str, _options: &SignedUrlOptions) -> Result<String, FsError> {
        let (full, _) = ctx.run(self.stat(path)).await?;
        let full = tokio::fs::canonicalize(&full)
            .await
            .map_err(|e| FsError::io("url", path, e))?;
        Ok(format!("file://{}", full.display()))
    }
}

#[async_trait]
impl FsWrite for LocalFs {
    async fn create(&self, ctx: &Context, path: &str, options: &WriterOptions) -> Result<Writer, FsError> {
        if let Some(err) = ctx.err() {
            return Err(err);
        }
        let target = self.path_for(path)?;
        Ok(Box::new(LocalWriter {
            ctx: ctx.clone(),
            key: path.to_string(),
            target,
            buf: Vec::with_capacity(options.buffer_size),
        }))
    }

    async fn delete(&self, ctx: &Context, path: &str) -> Result<(), FsError> {
        let (full, _) = ctx.run(self.stat(path)).await?;
        ctx.run(async {
            tokio::fs::remove_file(&full)
                .await
                .map_err(|e| FsError::io("delete", path, e))
        })
        .await
    }
}

struct LocalWriter {
    ctx: Context,
    key: String,
    target: PathBuf,
    buf: Vec<u8>,
}

#[async_trait]
impl FileWriter for LocalWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<(), FsError> {
        if let Some(err) = self.ctx.err() {
            return Err(err);
        }
        self.buf.extend_from_slice(buf);
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), FsError> {
        let LocalWriter {
            ctx,
            key,
            target,
            buf,
        } = *self;

        let data = Bytes::from(buf);
        let mut temp = target.clone().into_os_string();
        temp.push(format!(
            ".{}{TEMP_SUFFIX}",
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let temp = PathBuf::from(temp);

        let res = ctx
            .run(async {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent)
                        .await
                        .map_err(|e| FsError::io("create", key.as_str(), e))?;
                }
                tokio::fs::write(&temp, &data)
                    .await
                    .map_err(|e| FsError::io("create", key.as_str(), e))?;
                tokio::fs::rename(&temp, &target)
                    .await
                    .map_err(|e| FsError::io("create", key.as_str(), e))
            })
            .await;

        if res.is_err() {
            let _ = tokio::fs::remove_file(&temp).await;
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FsExt;

    fn local() -> (tempfile::TempDir, LocalFs) {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path());
        (dir, fs)
    }

    #[tokio::test]
    async fn open_missing_is_not_found() {
        let (_dir, fs) = local();
        let err = fs
            .open(&Context::background(), "foo", &ReaderOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_and_overwrite() {
        let (_dir, fs) = local();
        let ctx = Context::background();
        fs.write(&ctx, "nested/foo", b"", &WriterOptions::default()).await.unwrap();
        fs.write(&ctx, "nested/foo", b"bar", &WriterOptions::default()).await.unwrap();
        let data = fs.read(&ctx, "nested/foo", &ReaderOptions::default()).await.unwrap();
        assert_eq!(&data[..], b"bar");

        let attrs = fs.attributes(&ctx, "nested/foo", &ReaderOptions::default()).await.unwrap();
        assert_eq!(attrs.size, 3);
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let (_dir, fs) = local();
        let ctx = Context::background();
        for path in ["../escape", "/abs", "a/../b", ""] {
            let err = fs
                .create(&ctx, path, &WriterOptions::default())
                .await
                .err()
                .unwrap();
            assert!(matches!(err, FsError::InvalidPath { .. }), "{path}");
        }
    }

    #[tokio::test]
    async fn delete_removes_and_reports_missing() {
        let (_dir, fs) = local();
        let ctx = Context::background();
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();
        fs.delete(&ctx, "foo").await.unwrap();
        assert!(!fs.exists(&ctx, "foo").await.unwrap());
        assert!(fs.delete(&ctx, "foo").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn walk_lists_nested_keys_by_prefix() {
        let (_dir, fs) = local();
        let ctx = Context::background();
        for path in ["a/1", "a/b/2", "ab", "c"] {
            fs.write(&ctx, path, b"x", &WriterOptions::default()).await.unwrap();
        }
        let mut seen = Vec::new();
        fs.walk(&ctx, "a", &mut |p: &str| {
            seen.push(p.to_string());
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(seen, ["a/1", "a/b/2", "ab"]);
    }

    #[tokio::test]
    async fn walk_on_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFs::new(dir.path().join("missing"));
        let mut count = 0;
        fs.walk(&Context::background(), "", &mut |_: &str| {
            count += 1;
            Ok(())
        })
        .await
        .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn url_points_at_file() {
        let (_dir, fs) = local();
        let ctx = Context::background();
        fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await.unwrap();
        let url = fs.url(&ctx, "foo", &SignedUrlOptions::default()).await.unwrap();
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/foo"));
    }
}
