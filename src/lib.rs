//! Vessel Memory
//!
//! Persistent associative memory for agents:
//! - Typed memory items and weighted edges, persisted as one JSON document
//! - Energy lifecycle: half-life decay, bounded reinforcement, ttl sweeps
//! - Spreading-activation recall over the item graph
//! - A bounded, deterministic graph manifest with a staleness-aware cache

pub mod clock;
pub mod error;
pub mod events;
pub mod graph;
pub mod manifest;
pub mod memory;
pub mod neurons;
pub mod persistence;

#[cfg(test)]
pub(crate) mod test_helpers;

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clock::SystemClock;
use graph::AnalyticsConfig;
use manifest::ManifestConfig;
use memory::{DecayConfig, MemoryManager, MemorySettings};
use neurons::{AutoReinforcementConfig, SpreadingActivationConfig};
use persistence::JsonFilePersistence;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub store: StoreYamlConfig,
    pub activation: SpreadingActivationConfig,
    pub decay: DecayConfig,
    pub manifest: ManifestConfig,
    pub analytics: AnalyticsConfig,
    pub reinforcement: AutoReinforcementConfig,
}

/// Store configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreYamlConfig {
    /// JSON document holding the whole state
    pub path: String,
}

impl Default for StoreYamlConfig {
    fn default() -> Self {
        Self {
            path: "memory.json".into(),
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub store_path: PathBuf,
    pub memory: MemorySettings,
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    let raw = std::env::var(var).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Ignoring {}={}: not a valid value", var, raw);
            None
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "vessel.yaml" in CWD. If the file doesn't
    /// exist, falls back to pure env var / defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> anyhow::Result<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let mut activation = yaml.activation;
        if let Some(steps) = env_parse("VESSEL_ACTIVATION_STEPS") {
            activation.steps = steps;
        }
        if let Some(decay) = env_parse("VESSEL_ACTIVATION_DECAY") {
            activation.decay = decay;
        }
        if let Some(threshold) = env_parse("VESSEL_ACTIVATION_THRESHOLD") {
            activation.threshold = threshold;
        }
        if let Some(max_results) = env_parse("VESSEL_MAX_RESULTS") {
            activation.max_results = max_results;
        }

        let mut manifest = yaml.manifest;
        if let Some(ttl) = env_parse("VESSEL_MANIFEST_TTL_SECS") {
            manifest.ttl_secs = ttl;
        }

        let mut reinforcement = yaml.reinforcement;
        if let Some(coactivate) = env_parse("VESSEL_COACTIVATION_ON_RECALL") {
            reinforcement.coactivation_on_recall = coactivate;
        }

        Ok(Self {
            store_path: std::env::var("VESSEL_STORE_PATH")
                .unwrap_or(yaml.store.path)
                .into(),
            memory: MemorySettings {
                activation,
                decay: yaml.decay,
                manifest,
                analytics: yaml.analytics,
                reinforcement,
            },
        })
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("vessel.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    /// Open the file-backed store this configuration points at.
    pub async fn open(&self) -> error::Result<MemoryManager> {
        MemoryManager::open(
            Arc::new(JsonFilePersistence::new(self.store_path.clone())),
            Arc::new(SystemClock),
            self.memory.clone(),
        )
        .await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod config_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_yaml_config_loading() {
        let yaml = r#"
store:
  path: /var/lib/vessel/memory.json

activation:
  steps: 3
  decay: 0.5

decay:
  never_half_life_days: 730

manifest:
  max_communities: 3
  ttl_secs: 60

reinforcement:
  coactivation_on_recall: true
"#;

        let config: YamlConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.store.path, "/var/lib/vessel/memory.json");
        assert_eq!(config.activation.steps, 3);
        assert_eq!(config.activation.decay, 0.5);
        // Unset fields keep their defaults
        assert_eq!(config.activation.threshold, 0.1);
        assert_eq!(config.activation.max_results, 10);
        assert_eq!(config.decay.never_half_life_days, 730.0);
        assert_eq!(config.manifest.max_communities, 3);
        assert_eq!(config.manifest.max_key_nodes, 5);
        assert_eq!(config.manifest.ttl_secs, 60);
        assert!(config.reinforcement.coactivation_on_recall);
        assert!(config.reinforcement.touch_on_recall);
    }

    #[test]
    fn test_yaml_defaults() {
        let config = YamlConfig::default();
        assert_eq!(config.store.path, "memory.json");
        assert_eq!(config.activation, SpreadingActivationConfig::default());
        assert_eq!(config.manifest.ttl_secs, 300);
        assert!(!config.reinforcement.coactivation_on_recall);
    }

    /// Single test for YAML loading and env overrides, to avoid parallel env var races.
    #[test]
    fn test_yaml_and_env_lifecycle() {
        fn clear_env() {
            for var in &[
                "VESSEL_STORE_PATH",
                "VESSEL_ACTIVATION_STEPS",
                "VESSEL_ACTIVATION_DECAY",
                "VESSEL_ACTIVATION_THRESHOLD",
                "VESSEL_MAX_RESULTS",
                "VESSEL_MANIFEST_TTL_SECS",
                "VESSEL_COACTIVATION_ON_RECALL",
            ] {
                std::env::remove_var(var);
            }
        }

        // --- Phase 1: YAML values loaded correctly ---
        let yaml = r#"
store:
  path: /data/yaml.json
activation:
  steps: 4
  max_results: 20
"#;
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("vessel.yaml");
        let mut file = std::fs::File::create(&file_path).unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        clear_env();

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/data/yaml.json"));
        assert_eq!(config.memory.activation.steps, 4);
        assert_eq!(config.memory.activation.max_results, 20);

        // --- Phase 2: Env vars override YAML ---
        std::env::set_var("VESSEL_STORE_PATH", "/data/env.json");
        std::env::set_var("VESSEL_ACTIVATION_STEPS", "1");
        std::env::set_var("VESSEL_COACTIVATION_ON_RECALL", "true");
        std::env::set_var("VESSEL_MAX_RESULTS", "not-a-number");

        let config = Config::from_yaml_and_env(Some(&file_path)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("/data/env.json"));
        assert_eq!(config.memory.activation.steps, 1);
        assert!(config.memory.reinforcement.coactivation_on_recall);
        // Unparseable override is ignored
        assert_eq!(config.memory.activation.max_results, 20);

        clear_env();

        // --- Phase 3: No YAML file → defaults ---
        let nonexistent = Path::new("/tmp/nonexistent-vessel-config-12345.yaml");
        let config = Config::from_yaml_and_env(Some(nonexistent)).unwrap();
        assert_eq!(config.store_path, PathBuf::from("memory.json"));
        assert_eq!(config.memory, MemorySettings::default());
    }

    #[tokio::test]
    async fn test_open_creates_nothing_until_first_write() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            store_path: dir.path().join("memory.json"),
            memory: MemorySettings::default(),
        };
        let manager = config.open().await.unwrap();
        assert_eq!(manager.stats().await.item_count, 0);
        assert!(!config.store_path.exists());
    }
}
