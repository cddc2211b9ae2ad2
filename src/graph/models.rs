//! Data structures for memory graph analytics.
//!
//! Contains the petgraph wrapper ([`MemoryGraph`]), per-community and
//! per-component results, and the aggregate [`GraphAnalytics`].

use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

use crate::error::MemoryError;
use crate::memory::models::{clamp_unit, ItemId, ItemType, MemoryItem, MemoryState};

// ============================================================================
// Input types
// ============================================================================

/// The slice of a memory item the analytics need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: ItemId,
    pub item_type: ItemType,
    pub tags: Vec<String>,
    pub importance: f64,
    pub energy: f64,
}

// ============================================================================
// MemoryGraph — petgraph wrapper with ID mapping
// ============================================================================

/// Wrapper around `petgraph::UnGraph` with ID ↔ NodeIndex mapping.
///
/// Nodes are inserted in id order, so `NodeIndex::index()` order equals id
/// order. Edge weights are the (clamped) relation weights.
#[derive(Debug, Clone)]
pub struct MemoryGraph {
    /// The underlying undirected graph
    pub graph: UnGraph<GraphNode, f64>,
    /// Mapping from item id to petgraph NodeIndex
    pub id_to_index: HashMap<ItemId, NodeIndex>,
}

impl MemoryGraph {
    /// Create a MemoryGraph with pre-allocated capacity.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: UnGraph::with_capacity(nodes, edges),
            id_to_index: HashMap::with_capacity(nodes),
        }
    }

    /// Build the analytics view of a state from stored energies.
    pub fn from_state(state: &MemoryState) -> Self {
        Self::from_state_with(state, |item| item.energy)
    }

    /// Build the analytics view of a state, taking each node's energy from
    /// `energy_of` (e.g. energy decayed as of a reporting instant).
    ///
    /// Dangling edges and self-loops are skipped with a warning.
    pub fn from_state_with<F>(state: &MemoryState, energy_of: F) -> Self
    where
        F: Fn(&MemoryItem) -> f64,
    {
        let mut g = Self::with_capacity(state.items.len(), state.edges.len());
        for item in state.items.values() {
            g.add_node(GraphNode {
                id: item.id.clone(),
                item_type: item.item_type.clone(),
                tags: item.tags.clone(),
                importance: clamp_unit(item.importance),
                energy: clamp_unit(energy_of(item)),
            });
        }
        for edge in &state.edges {
            if edge.from == edge.to {
                let err = MemoryError::InvariantViolation(format!("self-loop on '{}'", edge.from));
                warn!(error = %err, "Edge skipped in analytics");
                continue;
            }
            if g.add_edge(&edge.from, &edge.to, clamp_unit(edge.weight)).is_none() {
                let err = MemoryError::InvariantViolation(format!(
                    "dangling edge '{}' -> '{}'",
                    edge.from, edge.to
                ));
                warn!(error = %err, "Edge skipped in analytics");
            }
        }
        g
    }

    /// Add a node to the graph. Returns the NodeIndex.
    /// If a node with the same ID already exists, returns its existing index.
    pub fn add_node(&mut self, node: GraphNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// Add an edge between two nodes identified by their IDs.
    /// Returns `Some(EdgeIndex)` if both nodes exist, `None` otherwise.
    pub fn add_edge(
        &mut self,
        from_id: &str,
        to_id: &str,
        weight: f64,
    ) -> Option<petgraph::graph::EdgeIndex> {
        let from_idx = self.id_to_index.get(from_id)?;
        let to_idx = self.id_to_index.get(to_id)?;
        Some(self.graph.add_edge(*from_idx, *to_idx, weight))
    }

    /// Number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges in the graph.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

// ============================================================================
// Output types — Analytics results
// ============================================================================

/// A community detected by the Louvain algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunityInfo {
    /// Community identifier (order of first member in id order)
    pub id: u32,
    /// Number of nodes in this community
    pub size: usize,
    /// Member ids, sorted
    pub members: Vec<ItemId>,
    /// Most frequent tag, else most frequent type (ties alphabetical)
    pub label: String,
    /// Mean energy of the members
    pub mean_energy: f64,
    /// Member with the highest importance (id tie-break)
    pub anchor: ItemId,
}

/// A connected component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Component identifier
    pub id: u32,
    /// Number of nodes in this component
    pub size: usize,
    /// Member ids, sorted
    pub members: Vec<ItemId>,
    /// Whether this is the largest (main) component
    pub is_main: bool,
}

/// Complete analytics result for one memory graph snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphAnalytics {
    pub node_count: usize,
    pub edge_count: usize,
    /// `e / (n(n-1)/2)`, 0 for fewer than 2 nodes
    pub density: f64,
    /// `2e / n`, 0 for an empty graph
    pub average_degree: f64,
    /// Incident edge count per item
    pub degrees: BTreeMap<ItemId, usize>,
    /// Item → community id
    pub community_of: BTreeMap<ItemId, u32>,
    /// Sorted by size desc, then label, then anchor
    pub communities: Vec<CommunityInfo>,
    pub modularity: f64,
    /// Sorted by size desc, then first member
    pub components: Vec<ComponentInfo>,
    /// Items with no incident edge
    pub isolated_count: usize,
}

impl GraphAnalytics {
    /// Largest degree in the graph, 0 when empty.
    pub fn max_degree(&self) -> usize {
        self.degrees.values().copied().max().unwrap_or(0)
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the analytics algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Louvain resolution parameter (default: 1.0). Higher → more communities
    pub louvain_resolution: f64,
    /// Maximum local-move passes for Louvain (default: 100)
    pub max_iterations: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            louvain_resolution: 1.0,
            max_iterations: 100,
        }
    }
}
