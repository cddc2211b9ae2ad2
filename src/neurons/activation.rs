//! Spreading Activation Engine
//!
//! Implements a 3-phase associative retrieval algorithm over memory items:
//! 1. **Seeding**: explicit `(id, value)` pairs, or lexical overlap with a query
//! 2. **Spreading**: propagate activation through edges (weighted, thresholded)
//! 3. **Ranking**: drop zeros, sort by score, limit
//!
//! Spreading is pure: it reads a state snapshot and never mutates it.
//! Edges are traversed in both directions. Within a step, every contribution
//! is computed from the activations at the start of the step and applied
//! together afterwards, so the result does not depend on iteration order.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::error::MemoryError;
use crate::memory::models::{clamp_unit, ItemId, MemoryState, RecallHit};

use super::config::SpreadingActivationConfig;

/// Final activation of every known item.
pub type Activations = BTreeMap<ItemId, f64>;

// ============================================================================
// Adjacency
// ============================================================================

/// Dense, index-based view of the undirected link structure.
struct Adjacency<'a> {
    ids: Vec<&'a ItemId>,
    index: HashMap<&'a str, usize>,
    links: Vec<Vec<(usize, f64)>>,
}

impl<'a> Adjacency<'a> {
    fn build(state: &'a MemoryState) -> Self {
        let ids: Vec<&ItemId> = state.items.keys().collect();
        let index: HashMap<&str, usize> = state
            .items
            .keys()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut links = vec![Vec::new(); ids.len()];

        for edge in &state.edges {
            if edge.from == edge.to {
                let err = MemoryError::InvariantViolation(format!("self-loop on '{}'", edge.from));
                warn!(error = %err, "Edge skipped during spreading");
                continue;
            }
            let (Some(&a), Some(&b)) = (index.get(edge.from.as_str()), index.get(edge.to.as_str()))
            else {
                let err = MemoryError::InvariantViolation(format!(
                    "dangling edge '{}' -> '{}'",
                    edge.from, edge.to
                ));
                warn!(error = %err, "Edge skipped during spreading");
                continue;
            };
            let w = clamp_unit(edge.weight);
            // Each stored edge links both ways; duplicates each contribute.
            links[a].push((b, w));
            links[b].push((a, w));
        }

        Self { ids, index, links }
    }
}

// ============================================================================
// Engine
// ============================================================================

/// Spreading Activation Engine.
///
/// Stateless apart from its configuration; cheap to construct per query.
#[derive(Debug, Clone, Default)]
pub struct SpreadingActivationEngine {
    config: SpreadingActivationConfig,
}

impl SpreadingActivationEngine {
    pub fn new(config: SpreadingActivationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpreadingActivationConfig {
        &self.config
    }

    /// Run the spreading phase from `seeds` over `state`.
    ///
    /// Every item of the state appears in the result. Seeds naming unknown
    /// ids are ignored. Repeated seeds add up (clamped).
    pub fn activate(&self, state: &MemoryState, seeds: &[(ItemId, f64)]) -> Activations {
        let adjacency = Adjacency::build(state);
        let n = adjacency.ids.len();
        let mut activation = vec![0.0f64; n];

        for (id, value) in seeds {
            match adjacency.index.get(id.as_str()) {
                Some(&i) => activation[i] = clamp_unit(activation[i] + clamp_unit(*value)),
                None => debug!(id = %id, "Ignoring seed for unknown item"),
            }
        }

        let decay = clamp_unit(self.config.decay);
        let threshold = self.config.threshold;

        for step in 0..self.config.steps {
            let mut delta = vec![0.0f64; n];
            let mut emitters = 0usize;

            for (i, &a) in activation.iter().enumerate() {
                if a <= threshold {
                    continue;
                }
                emitters += 1;
                for &(j, w) in &adjacency.links[i] {
                    delta[j] += a * w * decay;
                }
            }

            debug!(step = step + 1, emitters, "Spreading step");
            if emitters == 0 {
                break;
            }

            for (a, d) in activation.iter_mut().zip(delta) {
                *a = clamp_unit(*a + d);
            }
        }

        adjacency
            .ids
            .into_iter()
            .cloned()
            .zip(activation)
            .collect()
    }

    /// Ranking phase: non-zero activations accepted by `filter`, score
    /// descending then id ascending, at most `limit` entries.
    pub fn rank<F>(activations: &Activations, limit: usize, filter: F) -> Vec<RecallHit>
    where
        F: Fn(&str) -> bool,
    {
        let mut hits: Vec<RecallHit> = activations
            .iter()
            .filter(|(id, score)| **score > 0.0 && filter(id))
            .map(|(id, score)| RecallHit {
                id: id.clone(),
                score: *score,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(limit);
        hits
    }
}

// ============================================================================
// Lexical seeding
// ============================================================================

/// Lowercase alphanumeric tokens of at least two characters.
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

/// Seed values from a free-text query: for each item, the fraction of query
/// tokens found in its text, tags or type. Items with no overlap are omitted.
pub fn seeds_from_query(state: &MemoryState, query: &str) -> Vec<(ItemId, f64)> {
    let query_tokens = tokenize(query);
    if query_tokens.is_empty() {
        return vec![];
    }

    state
        .items
        .values()
        .filter_map(|item| {
            let mut tokens = tokenize(&item.text);
            for tag in &item.tags {
                tokens.extend(tokenize(tag));
            }
            tokens.extend(tokenize(item.item_type.as_str()));

            let matched = query_tokens.intersection(&tokens).count();
            (matched > 0).then(|| {
                (
                    item.id.clone(),
                    matched as f64 / query_tokens.len() as f64,
                )
            })
        })
        .collect()
}
