//! Manifest generation.
//!
//! Pure function of a state snapshot and "now": the same inputs always give
//! the same manifest, byte for byte. Energies are read as decayed up to
//! "now", so the manifest agrees with the prune signal without a decay pass.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::models::{KeyNode, Manifest, ManifestConfig, TemporalBucket, TemporalSummary, Topology};
use super::render::{render, truncate, RenderInput};
use crate::graph::{compute_all, AnalyticsConfig, GraphAnalytics, MemoryGraph};
use crate::memory::lifecycle::EnergyLifecycle;
use crate::memory::models::{clamp_unit, ItemId, MemoryItem, MemoryState};

/// Builds [`Manifest`]s from state snapshots.
#[derive(Debug, Clone, Default)]
pub struct ManifestGenerator {
    config: ManifestConfig,
    analytics: AnalyticsConfig,
    lifecycle: EnergyLifecycle,
}

impl ManifestGenerator {
    pub fn new(
        config: ManifestConfig,
        analytics: AnalyticsConfig,
        lifecycle: EnergyLifecycle,
    ) -> Self {
        Self {
            config,
            analytics,
            lifecycle,
        }
    }

    pub fn config(&self) -> &ManifestConfig {
        &self.config
    }

    /// Temporal bucket of one item, first matching rule wins:
    /// emerging, active, decaying, else stable.
    pub fn classify(&self, item: &MemoryItem, now: DateTime<Utc>) -> TemporalBucket {
        let c = &self.config;
        let since_created = now.signed_duration_since(item.created_at);
        let since_access = now.signed_duration_since(item.last_accessed_at);
        let energy = self.lifecycle.decayed_energy(item, now);

        // Windows too large to represent never match
        let emerging = Duration::try_hours(c.emerging_hours);
        let active = Duration::try_days(c.active_days);
        let idle = Duration::try_days(c.decaying_idle_days);

        if emerging.is_some_and(|w| since_created <= w) {
            TemporalBucket::Emerging
        } else if active.is_some_and(|w| since_access <= w) && energy >= c.active_min_energy {
            TemporalBucket::Active
        } else if energy < c.decaying_max_energy && idle.is_some_and(|w| since_access > w) {
            TemporalBucket::Decaying
        } else {
            TemporalBucket::Stable
        }
    }

    /// Generate a manifest. An empty state yields a zero-valued manifest.
    pub fn generate(&self, state: &MemoryState, now: DateTime<Utc>) -> Manifest {
        let graph = MemoryGraph::from_state_with(state, |item| {
            self.lifecycle.decayed_energy(item, now)
        });
        let analytics = compute_all(&graph, &self.analytics);

        let topology = Topology {
            node_count: analytics.node_count,
            edge_count: analytics.edge_count,
            density: analytics.density,
            average_degree: analytics.average_degree,
            component_count: analytics.components.len(),
            isolated_count: analytics.isolated_count,
            modularity: analytics.modularity,
        };

        let mut temporal = TemporalSummary::default();
        for item in state.items.values() {
            temporal.push(self.classify(item, now), item.id.clone());
        }

        let key_nodes = self.key_nodes(state, &analytics, now);
        let recent = self.recent(state);
        let energy = self.mean_energy(state, now);

        let text = render(
            &RenderInput {
                item_count: state.item_count(),
                edge_count: analytics.edge_count,
                energy,
                topology: &topology,
                communities: &analytics.communities,
                temporal: &temporal,
                key_nodes: &key_nodes,
                recent: &recent,
            },
            &self.config,
        );

        debug!(
            items = state.item_count(),
            communities = analytics.communities.len(),
            len = text.chars().count(),
            "Manifest generated"
        );

        Manifest {
            generated_at: now,
            item_count: state.item_count(),
            edge_count: analytics.edge_count,
            energy,
            topology,
            communities: analytics.communities,
            temporal,
            key_nodes,
            recent,
            text,
        }
    }

    /// Top items by `0.4·importance + 0.3·energy + 0.3·degree/maxDegree`, id tie-break.
    fn key_nodes(
        &self,
        state: &MemoryState,
        analytics: &GraphAnalytics,
        now: DateTime<Utc>,
    ) -> Vec<KeyNode> {
        let max_degree = analytics.max_degree();
        let mut scored: Vec<KeyNode> = state
            .items
            .values()
            .map(|item| {
                let degree = analytics.degrees.get(&item.id).copied().unwrap_or(0);
                let centrality = if max_degree == 0 {
                    0.0
                } else {
                    degree as f64 / max_degree as f64
                };
                KeyNode {
                    id: item.id.clone(),
                    item_type: item.item_type.to_string(),
                    score: 0.4 * clamp_unit(item.importance)
                        + 0.3 * self.lifecycle.decayed_energy(item, now)
                        + 0.3 * centrality,
                    degree,
                    preview: truncate(&item.text, self.config.preview_chars),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(self.config.max_key_nodes);
        scored
    }

    /// Most recently accessed ids, newest first, id tie-break.
    fn recent(&self, state: &MemoryState) -> Vec<ItemId> {
        let mut items: Vec<&MemoryItem> = state.items.values().collect();
        items.sort_by(|a, b| {
            b.last_accessed_at
                .cmp(&a.last_accessed_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        items
            .into_iter()
            .take(self.config.max_recent)
            .map(|item| item.id.clone())
            .collect()
    }

    fn mean_energy(&self, state: &MemoryState, now: DateTime<Utc>) -> f64 {
        if state.items.is_empty() {
            return 0.0;
        }
        let total: f64 = state
            .items
            .values()
            .map(|item| self.lifecycle.decayed_energy(item, now))
            .sum();
        total / state.items.len() as f64
    }
}
