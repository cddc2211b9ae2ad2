//! Energy Lifecycle Management
//!
//! Pull-based aging of memory items: no scheduler lives here. Every function
//! takes "now" explicitly so the host decides when decay runs (lazily on read
//! or from an external tick).
//!
//! Decay is exponential with a half-life derived from the item's ttl and
//! stretched by its importance:
//!
//! ```text
//! half_life = base(ttl) * (1 + importance * importance_slowdown)
//! energy(t) = energy(checkpoint) * 0.5 ^ (elapsed / half_life)
//! ```
//!
//! The checkpoint is `max(last_decayed_at, last_accessed_at)`, so applying
//! decay twice over two intervals equals applying it once over their sum.

use super::models::{clamp_unit, ItemId, MemoryItem, Ttl};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Tuning parameters for decay and prune signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecayConfig {
    /// Half-life used for items whose ttl is `never`
    pub never_half_life_days: f64,
    /// How strongly importance stretches the half-life (0 disables)
    pub importance_slowdown: f64,
    /// Items under this energy are considered spent
    pub energy_floor: f64,
    /// How long a spent item must go unaccessed before it is prune-eligible
    pub stale_window_days: f64,
}

impl Default for DecayConfig {
    fn default() -> Self {
        Self {
            never_half_life_days: 365.0,
            importance_slowdown: 1.0,
            energy_floor: 0.05,
            stale_window_days: 30.0,
        }
    }
}

/// Result of one decay pass over the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecayReport {
    /// Items whose energy changed
    pub decayed: usize,
    /// Items now eligible for external pruning
    pub prune_candidates: Vec<ItemId>,
}

fn seconds_between(later: DateTime<Utc>, earlier: DateTime<Utc>) -> f64 {
    (later.signed_duration_since(earlier).num_milliseconds() as f64 / 1000.0).max(0.0)
}

/// Decay, reinforcement and staleness rules.
#[derive(Debug, Clone, Default)]
pub struct EnergyLifecycle {
    config: DecayConfig,
}

impl EnergyLifecycle {
    pub fn new(config: DecayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecayConfig {
        &self.config
    }

    /// Base half-life of a ttl, in seconds.
    fn base_half_life_secs(&self, ttl: Ttl) -> f64 {
        match ttl.duration() {
            Some(d) => (d.num_milliseconds() as f64 / 1000.0).max(1.0),
            None => self.config.never_half_life_days * SECONDS_PER_DAY,
        }
    }

    /// Effective half-life of an item in seconds. Shorter ttl decays faster,
    /// higher importance decays slower.
    pub fn half_life_secs(&self, item: &MemoryItem) -> f64 {
        let stretch = 1.0 + clamp_unit(item.importance) * self.config.importance_slowdown.max(0.0);
        self.base_half_life_secs(item.ttl) * stretch
    }

    /// Energy of `item` as of `now`, without committing anything.
    pub fn decayed_energy(&self, item: &MemoryItem, now: DateTime<Utc>) -> f64 {
        let checkpoint = item.last_decayed_at.max(item.last_accessed_at);
        let elapsed = seconds_between(now, checkpoint);
        if elapsed == 0.0 {
            return clamp_unit(item.energy);
        }
        let half_life = self.half_life_secs(item);
        clamp_unit(item.energy * 0.5f64.powf(elapsed / half_life))
    }

    /// Commit decay up to `now` on one item. Returns true if the energy changed.
    pub fn decay_item(&self, item: &mut MemoryItem, now: DateTime<Utc>) -> bool {
        let checkpoint = item.last_decayed_at.max(item.last_accessed_at);
        if now <= checkpoint {
            return false;
        }
        let next = self.decayed_energy(item, now);
        let changed = next != item.energy;
        item.energy = next;
        item.last_decayed_at = now;
        changed
    }

    /// Bounded reinforcement: never jumps straight to 1.
    pub fn reinforce(energy: f64, delta: f64) -> f64 {
        clamp_unit(energy + delta.max(0.0))
    }

    /// Bounded dampening (negative feedback).
    pub fn dampen(energy: f64, delta: f64) -> f64 {
        clamp_unit(energy - delta.max(0.0))
    }

    /// True if the item is spent (under the floor) and has gone unaccessed
    /// longer than the stale window.
    pub fn is_prune_eligible(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        let idle_days = seconds_between(now, item.last_accessed_at) / SECONDS_PER_DAY;
        self.decayed_energy(item, now) < self.config.energy_floor
            && idle_days > self.config.stale_window_days
    }

    /// True if the item's ttl elapsed since its last access.
    pub fn is_expired(&self, item: &MemoryItem, now: DateTime<Utc>) -> bool {
        match item.ttl.duration() {
            Some(ttl) => now.signed_duration_since(item.last_accessed_at) > ttl,
            None => false,
        }
    }

    /// Staleness score for reporting (0.0 = fresh, 1.0 = very stale).
    ///
    /// `1 - exp(-idle_days / base_days)`, scaled down for important items.
    pub fn staleness_score(&self, item: &MemoryItem, now: DateTime<Utc>) -> f64 {
        let base_days = self.base_half_life_secs(item.ttl) / SECONDS_PER_DAY;
        let idle_days = seconds_between(now, item.last_accessed_at) / SECONDS_PER_DAY;
        let staleness = 1.0 - (-idle_days / base_days).exp();
        let importance_factor = 1.3 - 0.8 * clamp_unit(item.importance);
        (staleness * importance_factor).clamp(0.0, 1.0)
    }
}
