//! JSON file persistence (`graph.json`).

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::traits::MemoryPersistence;
use crate::memory::models::MemoryState;

/// Stores the state as pretty-printed camelCase JSON.
///
/// Saves go to a sibling `*.tmp` file which is then renamed over the target,
/// so a crash mid-save never leaves a truncated file behind.
#[derive(Debug, Clone)]
pub struct JsonFilePersistence {
    path: PathBuf,
}

impl JsonFilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "graph.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl MemoryPersistence for JsonFilePersistence {
    async fn load(&self) -> Result<MemoryState> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            info!(path = %self.path.display(), "No memory file yet, starting empty");
            return Ok(MemoryState::default());
        }

        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut state: MemoryState = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        state.recompute_energy();

        debug!(
            path = %self.path.display(),
            items = state.item_count(),
            edges = state.edge_count(),
            "Memory state loaded"
        );
        Ok(state)
    }

    async fn save(&self, state: &MemoryState) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_vec_pretty(state).context("Failed to serialize memory state")?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), bytes = json.len(), "Memory state saved");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}
