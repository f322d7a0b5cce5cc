//! # Extension Traits
//!
//! Convenience methods for storage backends.
//!
//! ## Overview
//!
//! [`FsExt`] provides whole-file helpers that aren't part of the core
//! contract. They are default methods with a blanket implementation, so any
//! `Fs` (backend or decorator stack) gets them for free.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`exists`](FsExt::exists) | Check whether a path is present |
//! | [`read`](FsExt::read) | Open a path and read it fully |
//! | [`write`](FsExt::write) | Create a path, write a buffer, commit |
//!
//! ## JSON Support (Feature-Gated)
//!
//! With the `serde` feature enabled, `FsExtJson` adds `read_json` and
//! `write_json`.

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Context, Fs, FsError, ReaderOptions, WriterOptions};

/// Extension methods for any storage backend.
///
/// # Example
///
/// ```rust
/// use tierfs::{Context, FsExt, MemoryFs, ReaderOptions, WriterOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), tierfs::FsError> {
/// let fs = MemoryFs::new();
/// let ctx = Context::background();
///
/// assert!(!fs.exists(&ctx, "foo").await?);
/// fs.write(&ctx, "foo", b"bar", &WriterOptions::default()).await?;
/// assert_eq!(&fs.read(&ctx, "foo", &ReaderOptions::default()).await?[..], b"bar");
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait FsExt: Fs {
    /// Check whether `path` is present.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    /// Returns `Err` only for actual failures.
    async fn exists(&self, ctx: &Context, path: &str) -> Result<bool, FsError> {
        match self.attributes(ctx, path, &ReaderOptions::default()).await {
            Ok(_) => Ok(true),
            Err(FsError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Read the full content of `path`.
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if the path doesn't exist.
    async fn read(&self, ctx: &Context, path: &str, options: &ReaderOptions) -> Result<Bytes, FsError> {
        self.open(ctx, path, options).await?.read_to_end().await
    }

    /// Replace the content of `path` with `data`.
    async fn write(
        &self,
        ctx: &Context,
        path: &str,
        data: &[u8],
        options: &WriterOptions,
    ) -> Result<(), FsError> {
        let mut writer = self.create(ctx, path, options).await?;
        writer.write(data).await?;
        writer.close().await
    }
}

// Blanket implementation - any Fs backend gets FsExt for free
impl<B: Fs + ?Sized> FsExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{Serialize, de::DeserializeOwned};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    #[async_trait]
    pub trait FsExtJson: Fs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - `FsError::NotFound`: File doesn't exist
        /// - `FsError::Deserialization`: JSON parsing failed
        async fn read_json<T: DeserializeOwned + Send>(&self, ctx: &Context, path: &str) -> Result<T, FsError> {
            let data = self.read(ctx, path, &ReaderOptions::default()).await?;
            serde_json::from_slice(&data).map_err(|e| FsError::Deserialization(e.to_string()))
        }

        /// Serialize a value and write it as JSON with content type
        /// `application/json`.
        async fn write_json<T: Serialize + Sync>(
            &self,
            ctx: &Context,
            path: &str,
            value: &T,
        ) -> Result<(), FsError> {
            let json = serde_json::to_vec_pretty(value)
                .map_err(|e| FsError::Serialization(e.to_string()))?;
            let options = WriterOptions::default().content_type("application/json");
            self.write(ctx, path, &json, &options).await
        }
    }

    // Blanket implementation
    impl<B: Fs + ?Sized> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;
