//! # Storage Traits
//!
//! The storage contract is split into a read side and a write side:
//!
//! | Trait | Operations |
//! |-------|------------|
//! | [`FsRead`] | `open`, `attributes`, `walk`, `url` |
//! | [`FsWrite`] | `create`, `delete` |
//! | [`Fs`] | both, via blanket implementation |
//!
//! The split matches how decorators classify calls: the timeout and slow
//! layers apply their read policy to [`FsRead`] methods and their write
//! policy to [`FsWrite`] methods.
//!
//! ## Object Safety
//!
//! All traits are object-safe. `Arc<T>` and `Box<T>` forward to `T`, so a
//! shared handle to a tier can be passed wherever an `Fs` is expected:
//!
//! ```rust
//! use std::sync::Arc;
//! use tierfs::{Fs, MemoryFs};
//!
//! fn takes_fs<B: Fs>(_: B) {}
//!
//! let shared: Arc<dyn Fs> = Arc::new(MemoryFs::new());
//! takes_fs(shared.clone());
//! takes_fs(shared);
//! ```

mod fs_read;
mod fs_write;

pub use fs_read::{FsRead, WalkFn};
pub use fs_write::{FileWriter, FsWrite, Writer};

/// The full storage contract.
///
/// Automatically implemented for any type that implements [`FsRead`] and
/// [`FsWrite`]. Every backend and every decorator is an `Fs`, so decorators
/// nest to any depth.
pub trait Fs: FsRead + FsWrite {}

// Blanket implementation - any type implementing both halves gets Fs for free
impl<T: FsRead + FsWrite + ?Sized> Fs for T {}
