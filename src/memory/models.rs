//! Memory models and DTOs
//!
//! Memory items are discrete pieces of knowledge an agent keeps across
//! sessions. Items are connected by weighted edges, carry a volatile
//! `energy` that decays over time, and an intrinsic `importance` set by
//! the caller.
//!
//! The serialized layout (camelCase, `items` map + `edges` array,
//! RFC 3339 timestamps) is the JSON document written by the file backend.
//! Item identity, scores and timestamps are required; counters, tags,
//! ttl and the state-level sections fall back to defaults when absent.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a memory item.
pub type ItemId = String;

/// Clamp a score to [0, 1]. NaN collapses to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

// ============================================================================
// Item type (open vocabulary)
// ============================================================================

/// Open string tag describing what kind of memory an item is
/// (e.g. `insight`, `pattern`, `convergent-pattern`).
///
/// New types never require a rebuild; the allowed set is enforced at the
/// boundary by [`MemoryPolicy::allowed_types`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemType(String);

impl ItemType {
    /// Normalizes to a trimmed, lowercase tag.
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// ============================================================================
// TTL
// ============================================================================

/// Relevance window of an item before aggressive decay and sweep eligibility.
///
/// Serialized as `"never"` or a compact duration such as `"30d"`, `"12h"`,
/// `"45m"`, `"90s"`, `"2w"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    Never,
    After(Duration),
}

impl Ttl {
    /// Default ttl for new items.
    pub fn default_window() -> Self {
        Self::After(Duration::days(30))
    }

    /// The window length, or `None` for `Never`.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Never => None,
            Self::After(d) => Some(*d),
        }
    }
}

impl Default for Ttl {
    fn default() -> Self {
        Self::default_window()
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Never => write!(f, "never"),
            Self::After(d) => {
                let secs = d.num_seconds();
                if secs != 0 && secs % (7 * 86_400) == 0 {
                    write!(f, "{}w", secs / (7 * 86_400))
                } else if secs != 0 && secs % 86_400 == 0 {
                    write!(f, "{}d", secs / 86_400)
                } else if secs != 0 && secs % 3_600 == 0 {
                    write!(f, "{}h", secs / 3_600)
                } else if secs != 0 && secs % 60 == 0 {
                    write!(f, "{}m", secs / 60)
                } else {
                    write!(f, "{}s", secs)
                }
            }
        }
    }
}

impl FromStr for Ttl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "never" | "perm" | "permanent" | "forever" => return Ok(Self::Never),
            "" => return Err("Empty ttl".to_string()),
            _ => {}
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(s.len());
        let (digits, unit) = s.split_at(split);
        let amount: i64 = digits
            .parse()
            .map_err(|_| format!("Invalid ttl amount: {}", s))?;
        if amount <= 0 {
            return Err(format!("Ttl must be positive: {}", s));
        }

        let duration = match unit {
            "s" => Duration::try_seconds(amount),
            "m" => Duration::try_minutes(amount),
            "h" => Duration::try_hours(amount),
            "d" | "" => Duration::try_days(amount),
            "w" => Duration::try_weeks(amount),
            _ => return Err(format!("Unknown ttl unit '{}' in {}", unit, s)),
        };
        duration
            .map(Self::After)
            .ok_or_else(|| format!("Ttl out of range: {}", s))
    }
}

impl Serialize for Ttl {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Ttl {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// Outcome signal recorded against an item after it was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "success" | "ok" | "helpful" => Ok(Self::Success),
            "failure" | "fail" | "unhelpful" => Ok(Self::Failure),
            _ => Err(format!("Unknown outcome: {}", s)),
        }
    }
}

// ============================================================================
// Items and edges
// ============================================================================

/// A single memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryItem {
    pub id: ItemId,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub text: String,
    /// Sorted, de-duplicated
    #[serde(default)]
    pub tags: Vec<String>,
    /// Intrinsic significance, caller-assigned (0.0 - 1.0)
    pub importance: f64,
    /// Volatile hotness (0.0 - 1.0), decayed and reinforced
    pub energy: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Decay checkpoint: energy already reflects decay up to this instant
    pub last_decayed_at: DateTime<Utc>,
    #[serde(default)]
    pub access_count: u64,
    #[serde(default)]
    pub ttl: Ttl,
    /// Namespace used by scoped recall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Last recorded feedback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default)]
    pub success: u32,
    #[serde(default)]
    pub fail: u32,
}

impl MemoryItem {
    /// True if the item is visible from `scope`. Unscoped lookups see everything.
    pub fn in_scope(&self, scope: Option<&str>) -> bool {
        match scope {
            None => true,
            Some(s) => self.scope.as_deref() == Some(s),
        }
    }
}

/// Normalize a tag list: trimmed, lowercase, sorted, unique, empties dropped.
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = tags
        .into_iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    out.sort();
    out.dedup();
    out
}

/// Request to create a new memory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub text: String,
    pub item_type: ItemType,
    pub importance: f64,
    #[serde(default)]
    pub ttl: Ttl,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl NewItem {
    /// Request with default ttl, no tags and no scope.
    pub fn new(text: impl Into<String>, item_type: impl Into<ItemType>, importance: f64) -> Self {
        Self {
            text: text.into(),
            item_type: item_type.into(),
            importance,
            ttl: Ttl::default(),
            tags: vec![],
            scope: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags.into_iter().map(|t| t.as_ref().to_string()).collect();
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

/// Weighted relation between two items. Stored directed, traversed undirected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEdge {
    pub from: ItemId,
    pub to: ItemId,
    pub relation: String,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
    pub last_reinforced_at: DateTime<Utc>,
}

impl MemoryEdge {
    /// True if this edge touches `id` on either end.
    pub fn touches(&self, id: &str) -> bool {
        self.from == id || self.to == id
    }

    /// True if this edge links `a` and `b`, in either direction.
    pub fn links(&self, a: &str, b: &str) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }
}

/// Relation label used for edges created by co-activation reinforcement.
pub const CO_ACTIVATED_RELATION: &str = "co_activated";

// ============================================================================
// History
// ============================================================================

/// Kind of mutation recorded in the history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    Remembered,
    Associated,
    Reinforced,
    Accessed,
    Feedback,
    Deleted,
    Expired,
    Decayed,
    PolicyChanged,
}

/// Append-only record of a mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub at: DateTime<Utc>,
    pub action: HistoryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<ItemId>,
    /// Other end of an edge, for `Associated` / `Reinforced`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related: Option<ItemId>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl HistoryEntry {
    pub fn new(at: DateTime<Utc>, action: HistoryAction, item_id: Option<&str>) -> Self {
        Self {
            at,
            action,
            item_id: item_id.map(str::to_string),
            related: None,
            detail: serde_json::Value::Null,
        }
    }

    pub fn with_related(mut self, related: &str) -> Self {
        self.related = Some(related.to_string());
        self
    }

    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = detail;
        self
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Tunables persisted with the state. Changes are versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryPolicy {
    pub version: u32,
    /// Energy added by one access (bounded reinforcement delta)
    pub touch_boost: f64,
    /// Energy added on success, removed on failure
    pub feedback_boost: f64,
    /// Edge weight added to co-activated pairs on recall
    pub coactivation_boost: f64,
    /// Item types accepted by `remember`; empty means any non-empty tag
    pub allowed_types: Vec<String>,
}

impl Default for MemoryPolicy {
    fn default() -> Self {
        Self {
            version: 1,
            touch_boost: 0.1,
            feedback_boost: 0.05,
            coactivation_boost: 0.03,
            allowed_types: vec![],
        }
    }
}

impl MemoryPolicy {
    /// True if `item_type` passes the allow-list.
    pub fn allows_type(&self, item_type: &ItemType) -> bool {
        !item_type.is_empty()
            && (self.allowed_types.is_empty()
                || self
                    .allowed_types
                    .iter()
                    .any(|t| ItemType::new(t) == *item_type))
    }
}

/// A superseded policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyVersion {
    pub policy: MemoryPolicy,
    pub replaced_at: DateTime<Utc>,
}

// ============================================================================
// Sessions
// ============================================================================

/// Maximum number of sessions kept in `recent_sessions`.
pub const MAX_RECENT_SESSIONS: usize = 10;

/// A caller session that touched the store recently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub operations: u64,
}

// ============================================================================
// Aggregate root
// ============================================================================

/// The whole memory graph plus aggregate bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryState {
    pub items: BTreeMap<ItemId, MemoryItem>,
    /// Insertion-ordered; duplicate pairs are allowed
    pub edges: Vec<MemoryEdge>,
    /// Mean item energy, recomputed after every mutation
    pub energy: f64,
    /// Activation threshold currently in force for recall
    pub threshold: f64,
    pub history: Vec<HistoryEntry>,
    pub policy: MemoryPolicy,
    pub policy_versions: Vec<PolicyVersion>,
    pub recent_sessions: Vec<SessionRecord>,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            edges: vec![],
            energy: 0.0,
            threshold: 0.1,
            history: vec![],
            policy: MemoryPolicy::default(),
            policy_versions: vec![],
            recent_sessions: vec![],
        }
    }
}

impl MemoryState {
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recompute the aggregate energy as the mean item energy.
    pub fn recompute_energy(&mut self) {
        self.energy = if self.items.is_empty() {
            0.0
        } else {
            self.items.values().map(|i| i.energy).sum::<f64>() / self.items.len() as f64
        };
    }
}

// ============================================================================
// Read-side DTOs
// ============================================================================

/// One recall result: identifier and score only (bodies are fetched separately).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallHit {
    pub id: ItemId,
    pub score: f64,
}

/// Cheap aggregate counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub item_count: usize,
    pub edge_count: usize,
    pub mean_energy: f64,
    pub history_len: usize,
    pub policy_version: u32,
    pub prune_candidates: usize,
    /// Mean staleness score (0.0 fresh - 1.0 stale), 0.0 for an empty store
    pub mean_staleness: f64,
}
