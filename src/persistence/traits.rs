//! MemoryPersistence trait definition

use crate::memory::models::MemoryState;
use anyhow::Result;
use async_trait::async_trait;

/// Durable home of the memory state.
///
/// `load` may be called any number of times and must return the last saved
/// state (or an empty one if nothing was ever saved). `save` must be atomic:
/// after a failed save, `load` still returns the previous state.
#[async_trait]
pub trait MemoryPersistence: Send + Sync {
    /// Load the whole state
    async fn load(&self) -> Result<MemoryState>;

    /// Replace the stored state
    async fn save(&self, state: &MemoryState) -> Result<()>;

    /// Human-readable location, for logs
    fn describe(&self) -> String;
}
