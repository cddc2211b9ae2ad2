//! Memory Store
//!
//! Authoritative container for items, edges and the aggregate state.
//! Every mutation validates first and only then applies, so a rejected call
//! leaves the state untouched. Every successful mutation appends to the
//! history log and refreshes the aggregate energy.
//!
//! The store is synchronous and clock-free: callers pass "now" explicitly.
//! Serialization of concurrent writers is the manager's job.

use super::lifecycle::{DecayConfig, DecayReport, EnergyLifecycle};
use super::models::*;
use crate::error::{MemoryError, Result};
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// In-memory memory graph with invariant enforcement.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: MemoryState,
    lifecycle: EnergyLifecycle,
}

fn validate_unit(name: &str, value: f64) -> Result<()> {
    if value.is_nan() || !(0.0..=1.0).contains(&value) {
        return Err(MemoryError::validation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )));
    }
    Ok(())
}

impl MemoryStore {
    /// Wrap an existing state (e.g. freshly loaded from persistence).
    pub fn new(state: MemoryState, decay: DecayConfig) -> Self {
        Self {
            state,
            lifecycle: EnergyLifecycle::new(decay),
        }
    }

    /// An empty store with default decay settings.
    pub fn empty() -> Self {
        Self::new(MemoryState::default(), DecayConfig::default())
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn lifecycle(&self) -> &EnergyLifecycle {
        &self.lifecycle
    }

    fn log(&mut self, entry: HistoryEntry) {
        self.state.history.push(entry);
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut MemoryItem> {
        self.state
            .items
            .get_mut(id)
            .ok_or_else(|| MemoryError::item_not_found(id))
    }

    fn fresh_id(&self) -> ItemId {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.state.items.contains_key(&id) {
                return id;
            }
        }
    }

    // ========================================================================
    // Items
    // ========================================================================

    /// Create an item. Energy is seeded with the importance.
    pub fn create_item(&mut self, request: NewItem, now: DateTime<Utc>) -> Result<MemoryItem> {
        validate_unit("importance", request.importance)?;
        if request.text.trim().is_empty() {
            return Err(MemoryError::validation("text must not be empty"));
        }
        let item_type = ItemType::new(request.item_type.as_str());
        if !self.state.policy.allows_type(&item_type) {
            return Err(MemoryError::validation(format!(
                "item type '{}' is not allowed",
                item_type
            )));
        }

        let item = MemoryItem {
            id: self.fresh_id(),
            item_type,
            text: request.text,
            tags: normalize_tags(&request.tags),
            importance: request.importance,
            energy: request.importance,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            last_decayed_at: now,
            access_count: 0,
            ttl: request.ttl,
            scope: request.scope.filter(|s| !s.trim().is_empty()),
            outcome: None,
            success: 0,
            fail: 0,
        };

        self.state.items.insert(item.id.clone(), item.clone());
        self.log(
            HistoryEntry::new(now, HistoryAction::Remembered, Some(item.id.as_str()))
                .with_detail(json!({ "type": item.item_type, "importance": item.importance })),
        );
        self.state.recompute_energy();
        debug!(id = %item.id, item_type = %item.item_type, "Item created");
        Ok(item)
    }

    /// Look up an item without any side effect.
    pub fn get_item(&self, id: &str) -> Result<&MemoryItem> {
        self.state
            .items
            .get(id)
            .ok_or_else(|| MemoryError::item_not_found(id))
    }

    /// Delete an item and every incident edge. Returns the number of edges removed.
    pub fn delete_item(&mut self, id: &str, now: DateTime<Utc>) -> Result<usize> {
        self.remove_item(id, now, HistoryAction::Deleted)
    }

    fn remove_item(&mut self, id: &str, now: DateTime<Utc>, action: HistoryAction) -> Result<usize> {
        if self.state.items.remove(id).is_none() {
            return Err(MemoryError::item_not_found(id));
        }
        let before = self.state.edges.len();
        self.state.edges.retain(|e| !e.touches(id));
        let removed_edges = before - self.state.edges.len();

        self.log(
            HistoryEntry::new(now, action, Some(id))
                .with_detail(json!({ "removedEdges": removed_edges })),
        );
        self.state.recompute_energy();
        debug!(id = %id, removed_edges, "Item removed");
        Ok(removed_edges)
    }

    /// Access tracking: materialize pending decay, bump the counter and apply
    /// bounded reinforcement.
    pub fn touch(&mut self, id: &str, now: DateTime<Utc>) -> Result<&MemoryItem> {
        let boost = self.state.policy.touch_boost;
        let lifecycle = self.lifecycle.clone();
        let item = self.item_mut(id)?;

        lifecycle.decay_item(item, now);
        item.access_count = item.access_count.saturating_add(1);
        item.last_accessed_at = item.last_accessed_at.max(now);
        item.last_decayed_at = item.last_decayed_at.max(now);
        item.energy = EnergyLifecycle::reinforce(item.energy, boost);
        let access_count = item.access_count;

        self.log(
            HistoryEntry::new(now, HistoryAction::Accessed, Some(id))
                .with_detail(json!({ "accessCount": access_count })),
        );
        self.state.recompute_energy();
        self.get_item(id)
    }

    /// Record a feedback outcome. Success reinforces, failure dampens.
    pub fn record_feedback(
        &mut self,
        id: &str,
        outcome: Outcome,
        now: DateTime<Utc>,
    ) -> Result<&MemoryItem> {
        let boost = self.state.policy.feedback_boost;
        let lifecycle = self.lifecycle.clone();
        let item = self.item_mut(id)?;

        lifecycle.decay_item(item, now);
        match outcome {
            Outcome::Success => {
                item.success = item.success.saturating_add(1);
                item.energy = EnergyLifecycle::reinforce(item.energy, boost);
            }
            Outcome::Failure => {
                item.fail = item.fail.saturating_add(1);
                item.energy = EnergyLifecycle::dampen(item.energy, boost);
            }
        }
        item.outcome = Some(outcome);
        item.updated_at = now;

        self.log(
            HistoryEntry::new(now, HistoryAction::Feedback, Some(id))
                .with_detail(json!({ "outcome": outcome })),
        );
        self.state.recompute_energy();
        self.get_item(id)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Add a weighted relation. Self-loops are rejected; duplicate pairs are kept.
    pub fn add_edge(
        &mut self,
        from: &str,
        to: &str,
        relation: &str,
        weight: f64,
        now: DateTime<Utc>,
    ) -> Result<MemoryEdge> {
        validate_unit("weight", weight)?;
        let relation = relation.trim();
        if relation.is_empty() {
            return Err(MemoryError::validation("relation must not be empty"));
        }
        if !self.state.items.contains_key(from) {
            return Err(MemoryError::endpoint_not_found(from));
        }
        if !self.state.items.contains_key(to) {
            return Err(MemoryError::endpoint_not_found(to));
        }
        if from == to {
            return Err(MemoryError::validation(format!(
                "self-loop on '{}' is not allowed",
                from
            )));
        }

        let edge = MemoryEdge {
            from: from.to_string(),
            to: to.to_string(),
            relation: relation.to_string(),
            weight,
            created_at: now,
            last_reinforced_at: now,
        };
        self.state.edges.push(edge.clone());
        self.log(
            HistoryEntry::new(now, HistoryAction::Associated, Some(from))
                .with_related(to)
                .with_detail(json!({ "relation": relation, "weight": weight })),
        );
        debug!(from = %from, to = %to, relation = %relation, weight, "Edge added");
        Ok(edge)
    }

    /// Strengthen links between items that were activated together.
    ///
    /// For each distinct pair: the first existing edge gets `boost` added to
    /// its weight (clamped); a pair with no edge gets a new `co_activated`
    /// edge of weight `boost`. Unknown ids are ignored. Returns the number of
    /// pairs touched.
    pub fn reinforce_coactivation(
        &mut self,
        ids: &[ItemId],
        boost: f64,
        now: DateTime<Utc>,
    ) -> usize {
        let boost = clamp_unit(boost);
        if boost == 0.0 {
            return 0;
        }
        let mut live: Vec<&ItemId> = ids
            .iter()
            .filter(|id| self.state.items.contains_key(id.as_str()))
            .collect();
        live.sort();
        live.dedup();
        let live: Vec<ItemId> = live.into_iter().cloned().collect();

        let mut pairs = 0;
        for (i, a) in live.iter().enumerate() {
            for b in &live[i + 1..] {
                match self.state.edges.iter_mut().find(|e| e.links(a, b)) {
                    Some(edge) => {
                        edge.weight = clamp_unit(edge.weight + boost);
                        edge.last_reinforced_at = now;
                    }
                    None => self.state.edges.push(MemoryEdge {
                        from: a.clone(),
                        to: b.clone(),
                        relation: CO_ACTIVATED_RELATION.to_string(),
                        weight: boost,
                        created_at: now,
                        last_reinforced_at: now,
                    }),
                }
                self.log(
                    HistoryEntry::new(now, HistoryAction::Reinforced, Some(a.as_str()))
                        .with_related(b)
                        .with_detail(json!({ "boost": boost })),
                );
                pairs += 1;
            }
        }
        pairs
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Commit decay for every item as of `now`.
    pub fn apply_decay(&mut self, now: DateTime<Utc>) -> DecayReport {
        let lifecycle = self.lifecycle.clone();
        let mut decayed = 0;
        for item in self.state.items.values_mut() {
            if lifecycle.decay_item(item, now) {
                decayed += 1;
            }
        }
        let prune_candidates = self.prune_candidates(now);

        if decayed > 0 {
            self.log(
                HistoryEntry::new(now, HistoryAction::Decayed, None).with_detail(json!({
                    "decayed": decayed,
                    "pruneCandidates": prune_candidates.len(),
                })),
            );
        }
        self.state.recompute_energy();
        debug!(decayed, prune_candidates = prune_candidates.len(), "Decay applied");
        DecayReport {
            decayed,
            prune_candidates,
        }
    }

    /// Items spent and idle past the stale window (the prune signal).
    pub fn prune_candidates(&self, now: DateTime<Utc>) -> Vec<ItemId> {
        self.state
            .items
            .values()
            .filter(|item| self.lifecycle.is_prune_eligible(item, now))
            .map(|item| item.id.clone())
            .collect()
    }

    /// Delete every item whose ttl elapsed since last access, cascading edges.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<ItemId> {
        let expired: Vec<ItemId> = self
            .state
            .items
            .values()
            .filter(|item| self.lifecycle.is_expired(item, now))
            .map(|item| item.id.clone())
            .collect();

        for id in &expired {
            if let Err(e) = self.remove_item(id, now, HistoryAction::Expired) {
                warn!(id = %id, error = %e, "Failed to remove expired item");
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Swept expired items");
        }
        expired
    }

    // ========================================================================
    // Policy, threshold, sessions
    // ========================================================================

    /// Replace the policy. The previous one is archived and the version bumped.
    pub fn set_policy(&mut self, mut policy: MemoryPolicy, now: DateTime<Utc>) -> Result<u32> {
        validate_unit("touch_boost", policy.touch_boost)?;
        validate_unit("feedback_boost", policy.feedback_boost)?;
        validate_unit("coactivation_boost", policy.coactivation_boost)?;

        let previous = self.state.policy.clone();
        policy.version = previous.version + 1;
        let version = policy.version;
        self.state.policy_versions.push(PolicyVersion {
            policy: previous,
            replaced_at: now,
        });
        self.state.policy = policy;
        self.log(
            HistoryEntry::new(now, HistoryAction::PolicyChanged, None)
                .with_detail(json!({ "version": version })),
        );
        info!(version, "Memory policy updated");
        Ok(version)
    }

    /// Set the activation threshold used by recall.
    pub fn set_threshold(&mut self, threshold: f64) -> Result<()> {
        validate_unit("threshold", threshold)?;
        self.state.threshold = threshold;
        Ok(())
    }

    /// Note that a caller session was active. Most recent first, capped.
    pub fn record_session(&mut self, session_id: &str, now: DateTime<Utc>) {
        let sessions = &mut self.state.recent_sessions;
        let record = match sessions.iter().position(|s| s.id == session_id) {
            Some(pos) => {
                let mut existing = sessions.remove(pos);
                existing.last_seen_at = now;
                existing.operations = existing.operations.saturating_add(1);
                existing
            }
            None => SessionRecord {
                id: session_id.to_string(),
                started_at: now,
                last_seen_at: now,
                operations: 1,
            },
        };
        sessions.insert(0, record);
        sessions.truncate(MAX_RECENT_SESSIONS);
    }

    /// Aggregate counters.
    pub fn stats(&self, now: DateTime<Utc>) -> MemoryStats {
        MemoryStats {
            item_count: self.state.item_count(),
            edge_count: self.state.edge_count(),
            mean_energy: self.state.energy,
            history_len: self.state.history.len(),
            policy_version: self.state.policy.version,
            prune_candidates: self.prune_candidates(now).len(),
            mean_staleness: self.mean_staleness(now),
        }
    }

    fn mean_staleness(&self, now: DateTime<Utc>) -> f64 {
        let items = &self.state.items;
        if items.is_empty() {
            return 0.0;
        }
        items
            .values()
            .map(|item| self.lifecycle.staleness_score(item, now))
            .sum::<f64>()
            / items.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neurons::SpreadingActivationEngine;
    use chrono::Duration;

    fn store_with(ids: usize, now: DateTime<Utc>) -> (MemoryStore, Vec<ItemId>) {
        let mut store = MemoryStore::empty();
        let ids = (0..ids)
            .map(|i| {
                store
                    .create_item(NewItem::new(format!("memory {}", i), "insight", 0.5), now)
                    .unwrap()
                    .id
            })
            .collect();
        (store, ids)
    }

    #[test]
    fn test_create_item_seeds_energy_and_timestamps() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let item = store
            .create_item(
                NewItem::new("FalkorDB client works", "Insight", 0.8)
                    .with_tags(["Graph", "db", "graph"])
                    .with_scope("vessel"),
                now,
            )
            .unwrap();

        assert_eq!(item.energy, 0.8);
        assert_eq!(item.item_type.as_str(), "insight");
        assert_eq!(item.tags, vec!["db".to_string(), "graph".to_string()]);
        assert_eq!(item.created_at, now);
        assert_eq!(item.last_accessed_at, now);
        assert_eq!(item.access_count, 0);
        assert_eq!(item.scope.as_deref(), Some("vessel"));
        assert_eq!(store.state().history.len(), 1);
        assert!((store.state().energy - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_create_item_validation() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();

        let err = store
            .create_item(NewItem::new("text", "insight", 1.5), now)
            .unwrap_err();
        assert!(err.is_validation());

        let err = store
            .create_item(NewItem::new("text", "insight", f64::NAN), now)
            .unwrap_err();
        assert!(err.is_validation());

        let err = store
            .create_item(NewItem::new("   ", "insight", 0.5), now)
            .unwrap_err();
        assert!(err.is_validation());

        let err = store.create_item(NewItem::new("text", "", 0.5), now).unwrap_err();
        assert!(err.is_validation());

        // Nothing was applied
        assert!(store.state().is_empty());
        assert!(store.state().history.is_empty());
    }

    #[test]
    fn test_type_allow_list() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let policy = MemoryPolicy {
            allowed_types: vec!["insight".into(), "pattern".into()],
            ..Default::default()
        };
        store.set_policy(policy, now).unwrap();

        assert!(store
            .create_item(NewItem::new("ok", "pattern", 0.5), now)
            .is_ok());
        assert!(store
            .create_item(NewItem::new("nope", "gossip", 0.5), now)
            .unwrap_err()
            .is_validation());
    }

    #[test]
    fn test_get_item_not_found() {
        let store = MemoryStore::empty();
        assert!(store.get_item("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn test_add_edge_contracts() {
        let now = Utc::now();
        let (mut store, ids) = store_with(2, now);

        let edge = store.add_edge(&ids[0], &ids[1], "relates_to", 0.7, now).unwrap();
        assert_eq!(edge.weight, 0.7);

        assert!(store
            .add_edge(&ids[0], "ghost", "relates_to", 0.7, now)
            .unwrap_err()
            .is_not_found());
        assert!(store
            .add_edge(&ids[0], &ids[1], "relates_to", 1.2, now)
            .unwrap_err()
            .is_validation());
        assert!(store
            .add_edge(&ids[0], &ids[0], "relates_to", 0.5, now)
            .unwrap_err()
            .is_validation());
        assert!(store
            .add_edge(&ids[0], &ids[1], "  ", 0.5, now)
            .unwrap_err()
            .is_validation());

        // Duplicates are kept as separate edges
        store.add_edge(&ids[1], &ids[0], "relates_to", 0.3, now).unwrap();
        assert_eq!(store.state().edge_count(), 2);
    }

    #[test]
    fn test_delete_cascades_edges() {
        let now = Utc::now();
        let (mut store, ids) = store_with(3, now);
        store.add_edge(&ids[0], &ids[1], "a", 0.5, now).unwrap();
        store.add_edge(&ids[2], &ids[0], "b", 0.5, now).unwrap();
        store.add_edge(&ids[1], &ids[2], "c", 0.5, now).unwrap();

        let removed = store.delete_item(&ids[0], now).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.state().edge_count(), 1);
        assert!(store.state().edges.iter().all(|e| !e.touches(&ids[0])));
        assert!(store.delete_item(&ids[0], now).unwrap_err().is_not_found());
    }

    #[test]
    fn test_touch_reinforces_with_bounded_delta() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let id = store
            .create_item(NewItem::new("hot", "insight", 0.95), now)
            .unwrap()
            .id;

        let item = store.touch(&id, now).unwrap();
        assert_eq!(item.access_count, 1);
        assert_eq!(item.energy, 1.0);

        let mut store = MemoryStore::empty();
        let id = store
            .create_item(NewItem::new("warm", "insight", 0.3), now)
            .unwrap()
            .id;
        let later = now + Duration::hours(1);
        let item = store.touch(&id, later).unwrap();
        assert_eq!(item.access_count, 1);
        assert_eq!(item.last_accessed_at, later);
        // Decay over one hour is tiny, then +0.1
        assert!(item.energy > 0.39 && item.energy <= 0.4);
    }

    #[test]
    fn test_feedback_counts_and_adjusts_energy() {
        let now = Utc::now();
        let (mut store, ids) = store_with(1, now);

        let item = store.record_feedback(&ids[0], Outcome::Success, now).unwrap();
        assert_eq!(item.success, 1);
        assert!((item.energy - 0.55).abs() < 1e-12);

        let item = store.record_feedback(&ids[0], Outcome::Failure, now).unwrap();
        assert_eq!(item.fail, 1);
        assert_eq!(item.outcome, Some(Outcome::Failure));
        assert!((item.energy - 0.5).abs() < 1e-12);

        assert!(store
            .record_feedback("ghost", Outcome::Success, now)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_reinforce_coactivation_strengthens_or_creates() {
        let now = Utc::now();
        let (mut store, ids) = store_with(3, now);
        store.add_edge(&ids[0], &ids[1], "relates_to", 0.5, now).unwrap();

        let pairs = store.reinforce_coactivation(
            &[ids[1].clone(), ids[0].clone(), ids[2].clone(), "ghost".into()],
            0.1,
            now,
        );
        assert_eq!(pairs, 3);

        let existing = store
            .state()
            .edges
            .iter()
            .find(|e| e.links(&ids[0], &ids[1]))
            .unwrap();
        assert!((existing.weight - 0.6).abs() < 1e-12);

        let created: Vec<_> = store
            .state()
            .edges
            .iter()
            .filter(|e| e.relation == CO_ACTIVATED_RELATION)
            .collect();
        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|e| (e.weight - 0.1).abs() < 1e-12));
    }

    #[test]
    fn test_apply_decay_and_prune_signal() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let faint = store
            .create_item(NewItem::new("faint", "insight", 0.06), now)
            .unwrap()
            .id;
        let strong = store
            .create_item(NewItem::new("strong", "insight", 1.0).with_ttl(Ttl::Never), now)
            .unwrap()
            .id;

        let later = now + Duration::days(45);
        let report = store.apply_decay(later);
        assert_eq!(report.decayed, 2);
        assert_eq!(report.prune_candidates, vec![faint.clone()]);
        assert!(store.get_item(&strong).unwrap().energy > 0.9);
        // The store only signals; nothing was deleted
        assert_eq!(store.state().item_count(), 2);
    }

    #[test]
    fn test_sweep_expired_cascades() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let short = store
            .create_item(
                NewItem::new("scratch", "context", 0.5).with_ttl(Ttl::After(Duration::hours(1))),
                now,
            )
            .unwrap()
            .id;
        let keep = store
            .create_item(NewItem::new("keeper", "insight", 0.5), now)
            .unwrap()
            .id;
        store.add_edge(&short, &keep, "relates_to", 0.5, now).unwrap();

        let removed = store.sweep_expired(now + Duration::hours(2));
        assert_eq!(removed, vec![short]);
        assert_eq!(store.state().item_count(), 1);
        assert_eq!(store.state().edge_count(), 0);
        assert_eq!(
            store.state().history.last().unwrap().action,
            HistoryAction::Expired
        );
    }

    #[test]
    fn test_removed_items_drop_out_of_activation() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let scratch = store
            .create_item(
                NewItem::new("scratch", "context", 0.5).with_ttl(Ttl::After(Duration::hours(1))),
                now,
            )
            .unwrap()
            .id;
        let hub = store
            .create_item(NewItem::new("hub", "insight", 0.5), now)
            .unwrap()
            .id;
        let gone = store
            .create_item(NewItem::new("gone", "insight", 0.5), now)
            .unwrap()
            .id;
        store.add_edge(&hub, &scratch, "relates_to", 1.0, now).unwrap();
        store.add_edge(&hub, &gone, "relates_to", 1.0, now).unwrap();

        store.delete_item(&gone, now).unwrap();
        store.sweep_expired(now + Duration::hours(2));

        let result = SpreadingActivationEngine::default()
            .activate(store.state(), &[(hub.clone(), 1.0), (gone.clone(), 1.0)]);
        assert_eq!(result.len(), 1);
        assert_eq!(result[&hub], 1.0);
        assert!(!result.contains_key(&gone));
        assert!(!result.contains_key(&scratch));
    }

    #[test]
    fn test_stats_report_mean_staleness() {
        let now = Utc::now();
        assert_eq!(MemoryStore::empty().stats(now).mean_staleness, 0.0);

        let (store, _) = store_with(2, now);
        assert_eq!(store.stats(now).mean_staleness, 0.0);

        let later = store.stats(now + Duration::days(20)).mean_staleness;
        let much_later = store.stats(now + Duration::days(90)).mean_staleness;
        assert!(later > 0.0);
        assert!(much_later > later);
        assert!(much_later <= 1.0);
    }

    #[test]
    fn test_set_policy_versions() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        let version = store
            .set_policy(
                MemoryPolicy {
                    touch_boost: 0.2,
                    ..Default::default()
                },
                now,
            )
            .unwrap();
        assert_eq!(version, 2);
        assert_eq!(store.state().policy_versions.len(), 1);
        assert_eq!(store.state().policy_versions[0].policy.version, 1);

        let bad = MemoryPolicy {
            touch_boost: 2.0,
            ..Default::default()
        };
        assert!(store.set_policy(bad, now).unwrap_err().is_validation());
        assert_eq!(store.state().policy.version, 2);
    }

    #[test]
    fn test_record_session_caps_and_orders() {
        let now = Utc::now();
        let mut store = MemoryStore::empty();
        for i in 0..12 {
            store.record_session(&format!("s{}", i), now + Duration::minutes(i));
        }
        store.record_session("s5", now + Duration::hours(1));

        let sessions = &store.state().recent_sessions;
        assert_eq!(sessions.len(), MAX_RECENT_SESSIONS);
        assert_eq!(sessions[0].id, "s5");
        assert_eq!(sessions[0].operations, 2);
    }

    #[test]
    fn test_history_is_append_only() {
        let now = Utc::now();
        let (mut store, ids) = store_with(2, now);
        let snapshot = store.state().history.clone();

        store.add_edge(&ids[0], &ids[1], "r", 0.4, now).unwrap();
        store.touch(&ids[0], now).unwrap();
        store.delete_item(&ids[1], now).unwrap();

        let history = &store.state().history;
        assert_eq!(&history[..snapshot.len()], &snapshot[..]);
        assert_eq!(history.len(), snapshot.len() + 3);
    }
}
