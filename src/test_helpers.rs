//! Test helper factories and state builders
//!
//! Provides convenience functions for creating test objects with sensible defaults.
#![allow(dead_code)]

use crate::memory::models::*;
use chrono::{DateTime, Utc};

// ============================================================================
// Item factories
// ============================================================================

/// Create an item whose timestamps are all `at` and whose energy equals its importance.
pub fn test_item(id: &str, importance: f64, at: DateTime<Utc>) -> MemoryItem {
    MemoryItem {
        id: id.to_string(),
        item_type: ItemType::new("note"),
        text: format!("memory {}", id),
        tags: vec![],
        importance,
        energy: importance,
        created_at: at,
        updated_at: at,
        last_accessed_at: at,
        last_decayed_at: at,
        access_count: 0,
        ttl: Ttl::default(),
        scope: None,
        outcome: None,
        success: 0,
        fail: 0,
    }
}

/// Create an item with a given text, type and tags.
pub fn test_item_with(
    id: &str,
    text: &str,
    item_type: &str,
    tags: &[&str],
    at: DateTime<Utc>,
) -> MemoryItem {
    MemoryItem {
        text: text.to_string(),
        item_type: ItemType::new(item_type),
        tags: normalize_tags(tags),
        ..test_item(id, 0.5, at)
    }
}

/// Create an edge stamped at `at`.
pub fn test_edge(from: &str, to: &str, weight: f64, at: DateTime<Utc>) -> MemoryEdge {
    MemoryEdge {
        from: from.to_string(),
        to: to.to_string(),
        relation: "relates_to".to_string(),
        weight,
        created_at: at,
        last_reinforced_at: at,
    }
}

// ============================================================================
// State builders
// ============================================================================

/// Build a state from items and `(from, to, weight)` triples, bypassing validation.
pub fn state_with(items: Vec<MemoryItem>, edges: &[(&str, &str, f64)]) -> MemoryState {
    let at = items
        .first()
        .map(|i| i.created_at)
        .unwrap_or_else(Utc::now);
    let mut state = MemoryState::default();
    for item in items {
        state.items.insert(item.id.clone(), item);
    }
    state.edges = edges
        .iter()
        .map(|(from, to, weight)| test_edge(from, to, *weight, at))
        .collect();
    state.recompute_energy();
    state
}

/// Items `ids` with importance/energy 0.5 and no edges yet.
pub fn items(ids: &[&str], at: DateTime<Utc>) -> Vec<MemoryItem> {
    ids.iter().map(|id| test_item(id, 0.5, at)).collect()
}

/// Two 4-cliques (a0..a3, b0..b3) joined by one weak bridge a0-b0.
pub fn two_cliques(at: DateTime<Utc>) -> MemoryState {
    let ids = ["a0", "a1", "a2", "a3", "b0", "b1", "b2", "b3"];
    let mut edges = Vec::new();
    for group in [&ids[..4], &ids[4..]] {
        for i in 0..group.len() {
            for j in i + 1..group.len() {
                edges.push((group[i], group[j], 1.0));
            }
        }
    }
    edges.push(("a0", "b0", 0.1));
    state_with(items(&ids, at), &edges)
}

/// A hub connected to `n` leaves (leaf0..leafN).
pub fn star(n: usize, at: DateTime<Utc>) -> MemoryState {
    let leaves: Vec<String> = (0..n).map(|i| format!("leaf{}", i)).collect();
    let mut all = vec![test_item("hub", 0.5, at)];
    all.extend(leaves.iter().map(|id| test_item(id, 0.5, at)));
    let edges: Vec<(&str, &str, f64)> = leaves.iter().map(|l| ("hub", l.as_str(), 1.0)).collect();
    state_with(all, &edges)
}
