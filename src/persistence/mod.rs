//! Persistence collaborators
//!
//! The memory core never touches storage directly: it loads and saves whole
//! [`MemoryState`](crate::memory::MemoryState) snapshots through
//! [`MemoryPersistence`].
//!
//! - [`json_file`] — `graph.json` on disk, atomic replace on save
//! - [`memory`] — in-process backend with save-failure injection

pub mod json_file;
pub mod memory;
pub mod traits;

pub use json_file::JsonFilePersistence;
pub use memory::InMemoryPersistence;
pub use traits::MemoryPersistence;
