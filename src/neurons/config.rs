//! Configuration for the Spreading Activation engine.
//!
//! All parameters have sensible defaults and can be overridden per-query.

use crate::error::{MemoryError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the spreading activation algorithm.
///
/// Controls the 3-phase retrieval process:
/// 1. Seeding (explicit ids or lexical match → initial activation)
/// 2. Spreading (propagation through weighted edges, step by step)
/// 3. Ranking (drop zeros, sort by score, truncate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpreadingActivationConfig {
    /// Number of propagation rounds.
    /// 1 = direct neighbors only, 2 = neighbors-of-neighbors.
    pub steps: usize,

    /// Attenuation applied to every propagated contribution.
    /// Formula: delta = source_activation × edge_weight × decay
    pub decay: f64,

    /// Only items whose activation strictly exceeds this value emit.
    pub threshold: f64,

    /// Maximum number of results to return (Phase 3).
    pub max_results: usize,
}

impl Default for SpreadingActivationConfig {
    fn default() -> Self {
        Self {
            steps: 2,
            decay: 0.7,
            threshold: 0.1,
            max_results: 10,
        }
    }
}

impl SpreadingActivationConfig {
    /// Reject factors outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("decay", self.decay), ("threshold", self.threshold)] {
            if value.is_nan() || !(0.0..=1.0).contains(&value) {
                return Err(MemoryError::validation(format!(
                    "activation {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for implicit reinforcement on recall.
///
/// Controls learning that happens during normal reads:
/// - **touch**: items returned by `recall` get their access tracked and energy boosted
/// - **co-activation**: edges between co-returned items are strengthened
///
/// Boost sizes live in the persisted `MemoryPolicy`.
/// Set `enabled = false` to disable all implicit reinforcement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoReinforcementConfig {
    /// Master switch — when false, recall is read-only.
    pub enabled: bool,

    /// Track access on every item returned by recall.
    pub touch_on_recall: bool,

    /// Strengthen (or create) edges between items returned together.
    pub coactivation_on_recall: bool,
}

impl Default for AutoReinforcementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            touch_on_recall: true,
            coactivation_on_recall: false,
        }
    }
}

impl AutoReinforcementConfig {
    pub fn touches(&self) -> bool {
        self.enabled && self.touch_on_recall
    }

    pub fn coactivates(&self) -> bool {
        self.enabled && self.coactivation_on_recall
    }
}
