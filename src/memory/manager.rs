//! Memory Manager
//!
//! Caller-facing operations over one explicitly opened store.
//!
//! Writers hold the write lock for the whole validate → apply on a draft →
//! save → commit sequence: a mutation is visible only once it is durable, and
//! a failed save leaves the in-memory view at the last durable state.
//! Readers work under the read lock and never observe a partial mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use super::lifecycle::{DecayConfig, DecayReport, EnergyLifecycle};
use super::models::*;
use super::store::MemoryStore;
use crate::clock::Clock;
use crate::error::{MemoryError, Result};
use crate::events::{EventBus, EventEmitter, MemoryEvent};
use crate::graph::AnalyticsConfig;
use crate::manifest::{Manifest, ManifestCache, ManifestConfig, ManifestGenerator, ManifestStaleness};
use crate::neurons::{
    seeds_from_query, AutoReinforcementConfig, SpreadingActivationConfig,
    SpreadingActivationEngine,
};
use crate::persistence::MemoryPersistence;

// ============================================================================
// Settings
// ============================================================================

/// Tunables of a manager instance (not persisted with the state).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    pub activation: SpreadingActivationConfig,
    pub decay: DecayConfig,
    pub manifest: ManifestConfig,
    pub analytics: AnalyticsConfig,
    pub reinforcement: AutoReinforcementConfig,
}

// ============================================================================
// Recall requests
// ============================================================================

/// Where recall activation starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecallSeed {
    /// Explicit `(id, value)` pairs
    Items(Vec<(ItemId, f64)>),
    /// Free text, seeded by token overlap
    Query(String),
}

/// A recall query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallRequest {
    pub seed: RecallSeed,
    /// Defaults to `activation.max_results`
    #[serde(default)]
    pub limit: Option<usize>,
    /// Only return items of this scope
    #[serde(default)]
    pub scope: Option<String>,
}

impl RecallRequest {
    pub fn query(text: impl Into<String>) -> Self {
        Self {
            seed: RecallSeed::Query(text.into()),
            limit: None,
            scope: None,
        }
    }

    pub fn items<I, S>(seeds: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<ItemId>,
    {
        Self {
            seed: RecallSeed::Items(seeds.into_iter().map(|(id, v)| (id.into(), v)).collect()),
            limit: None,
            scope: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Handle to one open memory store.
pub struct MemoryManager {
    store: RwLock<MemoryStore>,
    persistence: Arc<dyn MemoryPersistence>,
    clock: Arc<dyn Clock>,
    settings: MemorySettings,
    engine: SpreadingActivationEngine,
    generator: ManifestGenerator,
    manifest: ManifestCache,
    events: EventBus,
}

impl MemoryManager {
    /// Load the state through `persistence` and open a manager over it.
    pub async fn open(
        persistence: Arc<dyn MemoryPersistence>,
        clock: Arc<dyn Clock>,
        settings: MemorySettings,
    ) -> Result<Self> {
        settings.activation.validate()?;
        settings.manifest.validate()?;

        let mut state = persistence
            .load()
            .await
            .map_err(|e| MemoryError::LoadFailed(format!("{:#}", e)))?;
        if state.is_empty() && state.history.is_empty() {
            state.threshold = settings.activation.threshold;
        }
        state.recompute_energy();

        info!(
            backend = %persistence.describe(),
            items = state.item_count(),
            edges = state.edge_count(),
            "Memory store opened"
        );

        Ok(Self {
            store: RwLock::new(MemoryStore::new(state, settings.decay.clone())),
            persistence,
            clock,
            engine: SpreadingActivationEngine::new(settings.activation.clone()),
            generator: ManifestGenerator::new(
                settings.manifest.clone(),
                settings.analytics.clone(),
                EnergyLifecycle::new(settings.decay.clone()),
            ),
            manifest: ManifestCache::new(settings.manifest.ttl_secs),
            events: EventBus::default(),
            settings,
        })
    }

    /// Save the current state one last time.
    pub async fn shutdown(&self) -> Result<()> {
        let guard = self.store.read().await;
        self.persistence
            .save(guard.state())
            .await
            .map_err(|e| MemoryError::PersistFailed(format!("{:#}", e)))?;
        info!(backend = %self.persistence.describe(), "Memory store closed");
        Ok(())
    }

    pub fn settings(&self) -> &MemorySettings {
        &self.settings
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Receive every event emitted after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.events.subscribe()
    }

    /// Validate → apply on a draft → save → commit, all under the write lock.
    async fn mutate<T, F>(&self, op: F) -> Result<(T, DateTime<Utc>)>
    where
        F: FnOnce(&mut MemoryStore, DateTime<Utc>) -> Result<T>,
    {
        let mut guard = self.store.write().await;
        let now = self.clock.now();
        let mut draft = guard.clone();
        let out = op(&mut draft, now)?;

        if let Err(e) = self.persistence.save(draft.state()).await {
            warn!(error = %format!("{:#}", e), "Save failed, mutation rolled back");
            return Err(MemoryError::PersistFailed(format!("{:#}", e)));
        }
        *guard = draft;
        self.manifest.invalidate();
        Ok((out, now))
    }

    // ========================================================================
    // Items & edges
    // ========================================================================

    /// Store a new memory.
    pub async fn remember(&self, request: NewItem) -> Result<MemoryItem> {
        let (item, at) = self.mutate(|store, now| store.create_item(request, now)).await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::Remembered, at)
                .with_item(&item.id)
                .with_payload(json!({ "type": item.item_type })),
        );
        info!(id = %item.id, item_type = %item.item_type, "Memory remembered");
        Ok(item)
    }

    /// Fetch an item, tracking the access.
    pub async fn get_item(&self, id: &str) -> Result<MemoryItem> {
        let (item, at) = self
            .mutate(|store, now| store.touch(id, now).cloned())
            .await?;
        self.events.emit_for_item(HistoryAction::Accessed, id, at);
        Ok(item)
    }

    /// Fetch an item without any side effect.
    pub async fn peek(&self, id: &str) -> Result<MemoryItem> {
        self.store.read().await.get_item(id).cloned()
    }

    /// Link two items.
    pub async fn associate(
        &self,
        from: &str,
        to: &str,
        relation: &str,
        weight: f64,
    ) -> Result<MemoryEdge> {
        let (edge, at) = self
            .mutate(|store, now| store.add_edge(from, to, relation, weight, now))
            .await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::Associated, at)
                .with_item(from)
                .with_related(to)
                .with_payload(json!({ "relation": edge.relation, "weight": edge.weight })),
        );
        Ok(edge)
    }

    /// Record whether an item helped.
    pub async fn feedback(&self, id: &str, outcome: Outcome) -> Result<MemoryItem> {
        let (item, at) = self
            .mutate(|store, now| store.record_feedback(id, outcome, now).cloned())
            .await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::Feedback, at)
                .with_item(id)
                .with_payload(json!({ "outcome": outcome })),
        );
        Ok(item)
    }

    /// Delete an item and its edges. Returns the number of edges removed.
    pub async fn delete(&self, id: &str) -> Result<usize> {
        let (removed, at) = self.mutate(|store, now| store.delete_item(id, now)).await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::Deleted, at)
                .with_item(id)
                .with_payload(json!({ "removedEdges": removed })),
        );
        info!(id = %id, removed_edges = removed, "Memory deleted");
        Ok(removed)
    }

    // ========================================================================
    // Recall
    // ========================================================================

    /// Spreading-activation recall.
    ///
    /// Scoring runs on the current state without touching it; afterwards the
    /// returned items are touched and, if enabled, their links reinforced.
    pub async fn recall(&self, request: RecallRequest) -> Result<Vec<RecallHit>> {
        let limit = request
            .limit
            .unwrap_or(self.settings.activation.max_results);

        let hits = {
            let guard = self.store.read().await;
            let state = guard.state();
            let seeds = match &request.seed {
                RecallSeed::Items(seeds) => seeds.clone(),
                RecallSeed::Query(text) => seeds_from_query(state, text),
            };
            let engine = SpreadingActivationEngine::new(SpreadingActivationConfig {
                threshold: state.threshold,
                ..self.engine.config().clone()
            });
            let activations = engine.activate(state, &seeds);
            let scope = request.scope.as_deref();
            SpreadingActivationEngine::rank(&activations, limit, |id| {
                state.items.get(id).is_some_and(|item| item.in_scope(scope))
            })
        };

        debug!(hits = hits.len(), limit, "Recall scored");

        let reinforcement = &self.settings.reinforcement;
        if hits.is_empty() || !(reinforcement.touches() || reinforcement.coactivates()) {
            return Ok(hits);
        }

        let ids: Vec<ItemId> = hits.iter().map(|h| h.id.clone()).collect();
        let touch = reinforcement.touches();
        let coactivate = reinforcement.coactivates();
        let (pairs, at) = self
            .mutate(|store, now| {
                if touch {
                    for id in &ids {
                        // A concurrent delete may have removed it since scoring
                        if let Err(e) = store.touch(id, now) {
                            debug!(id = %id, error = %e, "Skipping touch");
                        }
                    }
                }
                let pairs = if coactivate {
                    let boost = store.state().policy.coactivation_boost;
                    store.reinforce_coactivation(&ids, boost, now)
                } else {
                    0
                };
                Ok(pairs)
            })
            .await?;

        if touch {
            for id in &ids {
                self.events.emit_for_item(HistoryAction::Accessed, id, at);
            }
        }
        if pairs > 0 {
            self.events.emit(
                MemoryEvent::new(HistoryAction::Reinforced, at)
                    .with_payload(json!({ "pairs": pairs })),
            );
        }
        Ok(hits)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Commit decay for every item as of now.
    pub async fn apply_decay(&self) -> Result<DecayReport> {
        let (report, at) = self.mutate(|store, now| Ok(store.apply_decay(now))).await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::Decayed, at).with_payload(json!({
                "decayed": report.decayed,
                "pruneCandidates": report.prune_candidates.len(),
            })),
        );
        Ok(report)
    }

    /// Delete every item whose ttl elapsed since its last access.
    pub async fn sweep_expired(&self) -> Result<Vec<ItemId>> {
        let (removed, at) = self.mutate(|store, now| Ok(store.sweep_expired(now))).await?;
        for id in &removed {
            self.events.emit_for_item(HistoryAction::Expired, id, at);
        }
        Ok(removed)
    }

    /// Items spent and idle past the stale window.
    pub async fn prune_candidates(&self) -> Vec<ItemId> {
        let now = self.clock.now();
        self.store.read().await.prune_candidates(now)
    }

    // ========================================================================
    // Policy & sessions
    // ========================================================================

    /// Replace the policy; returns the new version.
    pub async fn set_policy(&self, policy: MemoryPolicy) -> Result<u32> {
        let (version, at) = self.mutate(|store, now| store.set_policy(policy, now)).await?;
        self.events.emit(
            MemoryEvent::new(HistoryAction::PolicyChanged, at)
                .with_payload(json!({ "version": version })),
        );
        Ok(version)
    }

    /// Change the activation threshold used by recall.
    pub async fn set_threshold(&self, threshold: f64) -> Result<()> {
        self.mutate(|store, _| store.set_threshold(threshold))
            .await
            .map(|_| ())
    }

    /// Note that a caller session was active.
    pub async fn record_session(&self, session_id: &str) -> Result<()> {
        if session_id.trim().is_empty() {
            return Err(MemoryError::validation("session id must not be empty"));
        }
        self.mutate(|store, now| {
            store.record_session(session_id, now);
            Ok(())
        })
        .await
        .map(|_| ())
    }

    // ========================================================================
    // Read side
    // ========================================================================

    /// Aggregate counters.
    pub async fn stats(&self) -> MemoryStats {
        let now = self.clock.now();
        self.store.read().await.stats(now)
    }

    /// A copy of the whole state.
    pub async fn snapshot(&self) -> MemoryState {
        self.store.read().await.state().clone()
    }

    /// The manifest, regenerated only if missing, expired or invalidated.
    pub async fn manifest(&self) -> Arc<Manifest> {
        let now = self.clock.now();
        self.manifest
            .get_or_generate(now, || self.generate_manifest(now))
            .await
    }

    /// Regenerate the manifest now, regardless of freshness.
    pub async fn regenerate_manifest(&self) -> Arc<Manifest> {
        let now = self.clock.now();
        self.manifest
            .force_regenerate(|| self.generate_manifest(now))
            .await
    }

    /// Freshness of the cached manifest.
    pub async fn manifest_staleness(&self) -> ManifestStaleness {
        self.manifest.staleness(self.clock.now()).await
    }

    async fn generate_manifest(&self, now: DateTime<Utc>) -> Manifest {
        let guard = self.store.read().await;
        self.generator.generate(guard.state(), now)
    }
}
