//! Storage backends shipped with the crate.
//!
//! Both map "not present" to [`FsError::NotFound`](crate::FsError::NotFound).

mod local;
mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;
