//! In-process persistence, for tests and ephemeral hosts.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::traits::MemoryPersistence;
use crate::memory::models::MemoryState;

/// Keeps the last saved state in memory.
///
/// `fail_saves(true)` makes every subsequent save fail without touching the
/// stored state.
#[derive(Debug, Default)]
pub struct InMemoryPersistence {
    pub saved: RwLock<Option<MemoryState>>,
    fail_saves: AtomicBool,
    save_count: AtomicUsize,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a pre-existing state.
    pub fn with_state(state: MemoryState) -> Self {
        Self {
            saved: RwLock::new(Some(state)),
            ..Default::default()
        }
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemoryPersistence for InMemoryPersistence {
    async fn load(&self) -> Result<MemoryState> {
        Ok(self.saved.read().await.clone().unwrap_or_default())
    }

    async fn save(&self, state: &MemoryState) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            bail!("injected save failure");
        }
        *self.saved.write().await = Some(state.clone());
        self.save_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
