//! Manifest data structures and configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{MemoryError, Result};
use crate::graph::CommunityInfo;
use crate::memory::models::ItemId;

// ============================================================================
// Configuration
// ============================================================================

/// Caps, widths and thresholds for manifest generation.
///
/// Rendering truncates every variable-length field to a fixed width, so the
/// length of the rendered text depends only on these values
/// (see [`ManifestConfig::max_rendered_len`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManifestConfig {
    /// Communities listed in the text (all are kept in the struct)
    pub max_communities: usize,
    /// Key nodes selected
    pub max_key_nodes: usize,
    /// Recently accessed ids listed
    pub max_recent: usize,
    /// Characters of item text shown per key node
    pub preview_chars: usize,
    /// Characters of an id shown
    pub id_width: usize,
    /// Characters of a community label shown
    pub label_width: usize,
    /// Characters of an item type shown
    pub type_width: usize,
    /// Cache lifetime of a generated manifest, in seconds
    pub ttl_secs: u64,
    /// Items created at most this long ago are `emerging`
    pub emerging_hours: i64,
    /// Items accessed at most this long ago (and energetic enough) are `active`
    pub active_days: i64,
    /// Minimum energy for `active`
    pub active_min_energy: f64,
    /// Energy under which an idle item is `decaying`
    pub decaying_max_energy: f64,
    /// Idle time after which a low-energy item is `decaying`
    pub decaying_idle_days: i64,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            max_communities: 5,
            max_key_nodes: 5,
            max_recent: 5,
            preview_chars: 80,
            id_width: 36,
            label_width: 24,
            type_width: 16,
            ttl_secs: 300,
            emerging_hours: 24,
            active_days: 7,
            active_min_energy: 0.3,
            decaying_max_energy: 0.2,
            decaying_idle_days: 30,
        }
    }
}

/// Widest rendering of any number in the manifest.
pub(crate) const NUM_WIDTH: usize = 20;

impl ManifestConfig {
    /// Reject negative or unrepresentable time windows and energy
    /// thresholds outside [0, 1].
    pub fn validate(&self) -> Result<()> {
        let windows = [
            ("emerging_hours", Duration::try_hours(self.emerging_hours)),
            ("active_days", Duration::try_days(self.active_days)),
            ("decaying_idle_days", Duration::try_days(self.decaying_idle_days)),
        ];
        for (name, window) in windows {
            match window {
                Some(w) if w >= Duration::zero() => {}
                _ => {
                    return Err(MemoryError::validation(format!(
                        "manifest {} is out of range",
                        name
                    )))
                }
            }
        }
        for (name, value) in [
            ("active_min_energy", self.active_min_energy),
            ("decaying_max_energy", self.decaying_max_energy),
        ] {
            if value.is_nan() || !(0.0..=1.0).contains(&value) {
                return Err(MemoryError::validation(format!(
                    "manifest {} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    /// Upper bound, in characters, of [`Manifest::text`] for any graph.
    pub fn max_rendered_len(&self) -> usize {
        let memory = 31 + 3 * NUM_WIDTH;
        let topology = 68 + 5 * NUM_WIDTH;
        let communities = 15
            + NUM_WIDTH
            + self.max_communities * (8 + self.label_width + 2 * NUM_WIDTH)
            + 7
            + NUM_WIDTH;
        let temporal = 51 + 4 * NUM_WIDTH;
        let key_nodes = 10
            + self.max_key_nodes
                * (1 + 9 + self.id_width + self.type_width + NUM_WIDTH + self.preview_chars);
        let recent = 8 + 4 + self.max_recent * (self.id_width + 2);
        // Newlines between the six sections
        memory + topology + communities + temporal + key_nodes + recent + 5
    }
}

// ============================================================================
// Temporal classification
// ============================================================================

/// Temporal bucket of an item. Each item is in exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalBucket {
    Emerging,
    Active,
    Stable,
    Decaying,
}

impl fmt::Display for TemporalBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emerging => write!(f, "emerging"),
            Self::Active => write!(f, "active"),
            Self::Stable => write!(f, "stable"),
            Self::Decaying => write!(f, "decaying"),
        }
    }
}

/// Item ids per temporal bucket, each list sorted.
///
/// Every live item lands in exactly one bucket, so the lists together are
/// as large as the store. Rendering only prints the per-bucket counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalSummary {
    pub emerging: Vec<ItemId>,
    pub active: Vec<ItemId>,
    pub stable: Vec<ItemId>,
    pub decaying: Vec<ItemId>,
}

impl TemporalSummary {
    pub fn push(&mut self, bucket: TemporalBucket, id: ItemId) {
        match bucket {
            TemporalBucket::Emerging => self.emerging.push(id),
            TemporalBucket::Active => self.active.push(id),
            TemporalBucket::Stable => self.stable.push(id),
            TemporalBucket::Decaying => self.decaying.push(id),
        }
    }

    pub fn total(&self) -> usize {
        self.emerging.len() + self.active.len() + self.stable.len() + self.decaying.len()
    }
}

// ============================================================================
// Manifest
// ============================================================================

/// Graph-wide structural counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub node_count: usize,
    pub edge_count: usize,
    pub density: f64,
    pub average_degree: f64,
    pub component_count: usize,
    pub isolated_count: usize,
    pub modularity: f64,
}

/// A highly ranked item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyNode {
    pub id: ItemId,
    pub item_type: String,
    /// `0.4·importance + 0.3·energy + 0.3·degree/maxDegree`
    pub score: f64,
    pub degree: usize,
    /// Fixed-width text preview
    pub preview: String,
}

/// Bounded, deterministic summary of the memory graph's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: DateTime<Utc>,
    pub item_count: usize,
    pub edge_count: usize,
    /// Mean item energy
    pub energy: f64,
    pub topology: Topology,
    /// Every community, sorted by size desc, label, anchor.
    ///
    /// Not capped: grows with the graph, members included. Only `text`
    /// is bounded (`max_communities`, `max_rendered_len`).
    pub communities: Vec<CommunityInfo>,
    /// Full bucket membership, unbounded like `communities`
    pub temporal: TemporalSummary,
    pub key_nodes: Vec<KeyNode>,
    /// Most recently accessed ids, newest first
    pub recent: Vec<ItemId>,
    /// Rendered text for context injection
    pub text: String,
}
