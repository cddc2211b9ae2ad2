//! Graph analytics algorithms.
//!
//! Implements the structural summaries used by the manifest on petgraph graphs:
//! - **Community detection (Louvain)** — custom deterministic implementation
//! - **Connected components** — BFS on the undirected graph
//! - **Degree, density, modularity**
//!
//! All algorithms operate on [`MemoryGraph`] and return results keyed by item id.
//! Louvain visits nodes in id order and breaks gain ties toward the smallest
//! community id, so the same graph always yields the same partition.

use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use super::models::{
    AnalyticsConfig, CommunityInfo, ComponentInfo, GraphAnalytics, GraphNode, MemoryGraph,
};
use crate::memory::models::ItemId;

// ============================================================================
// Community Detection — Louvain (custom implementation)
// ============================================================================

/// Detect communities using the Louvain method (local-move phase).
///
/// Returns `(node_to_community, communities, modularity)`.
///
/// Nodes without edges stay in their own singleton community.
pub fn louvain_communities(
    graph: &MemoryGraph,
    config: &AnalyticsConfig,
) -> (BTreeMap<ItemId, u32>, Vec<CommunityInfo>, f64) {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return (BTreeMap::new(), vec![], 0.0);
    }
    let resolution = config.louvain_resolution;

    // Undirected adjacency lists and weighted degrees
    let mut adj: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    let mut node_strengths: Vec<f64> = vec![0.0; n];

    for edge in g.edge_references() {
        let s = edge.source().index();
        let t = edge.target().index();
        let w = *edge.weight();

        adj[s].push((t, w));
        adj[t].push((s, w));
        node_strengths[s] += w;
        node_strengths[t] += w;
    }

    let total_weight: f64 = node_strengths.iter().sum::<f64>() / 2.0;

    // Initialize: each node in its own community
    let mut community: Vec<u32> = (0..n as u32).collect();
    let mut comm_total_strength: Vec<f64> = node_strengths.clone();

    if total_weight > 0.0 {
        let m2 = 2.0 * total_weight;
        let mut improved = true;
        let mut iterations = 0;

        while improved && iterations < config.max_iterations {
            improved = false;
            iterations += 1;

            for node_idx in 0..n {
                let current_comm = community[node_idx];

                // Ordered so that equal gains resolve to the smallest community id
                let mut comm_weights: BTreeMap<u32, f64> = BTreeMap::new();
                for &(neighbor, w) in &adj[node_idx] {
                    *comm_weights.entry(community[neighbor]).or_default() += w;
                }

                let w_in_current = comm_weights.get(&current_comm).copied().unwrap_or(0.0);
                let ki = node_strengths[node_idx];
                let sigma_tot_current = comm_total_strength[current_comm as usize];
                let remove_cost =
                    w_in_current / m2 - resolution * ki * (sigma_tot_current - ki) / (m2 * m2);

                let mut best_comm = current_comm;
                let mut best_gain = 0.0;

                for (&target_comm, &w_to_target) in &comm_weights {
                    if target_comm == current_comm {
                        continue;
                    }
                    let sigma_tot_target = comm_total_strength[target_comm as usize];
                    let insert_cost =
                        w_to_target / m2 - resolution * ki * sigma_tot_target / (m2 * m2);
                    let gain = insert_cost - remove_cost;

                    if gain > best_gain {
                        best_gain = gain;
                        best_comm = target_comm;
                    }
                }

                if best_comm != current_comm {
                    comm_total_strength[current_comm as usize] -= ki;
                    comm_total_strength[best_comm as usize] += ki;
                    community[node_idx] = best_comm;
                    improved = true;
                }
            }
        }
        debug!(iterations, "Louvain converged");
    }

    // Renumber communities to be contiguous, in order of first member
    let mut comm_remap: BTreeMap<u32, u32> = BTreeMap::new();
    let mut remapped: Vec<u32> = Vec::with_capacity(n);
    for &c in &community {
        let next_id = comm_remap.len() as u32;
        remapped.push(*comm_remap.entry(c).or_insert(next_id));
    }
    let community = remapped;

    let mut node_map = BTreeMap::new();
    let mut comm_members: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for idx in g.node_indices() {
        let comm_id = community[idx.index()];
        node_map.insert(g[idx].id.clone(), comm_id);
        comm_members.entry(comm_id).or_default().push(idx.index());
    }

    let mut communities: Vec<CommunityInfo> = comm_members
        .into_iter()
        .map(|(id, members)| describe_community(graph, id, &members))
        .collect();
    communities.sort_by(|a, b| {
        b.size
            .cmp(&a.size)
            .then_with(|| a.label.cmp(&b.label))
            .then_with(|| a.anchor.cmp(&b.anchor))
    });

    let modularity = compute_modularity(&community, &adj, &node_strengths, total_weight);

    (node_map, communities, modularity)
}

/// Build the label, mean energy and anchor of a community.
fn describe_community(graph: &MemoryGraph, id: u32, members: &[usize]) -> CommunityInfo {
    let g = &graph.graph;
    let nodes: Vec<&GraphNode> = members
        .iter()
        .map(|&i| &g[petgraph::graph::NodeIndex::new(i)])
        .collect();

    let mut tag_counts: BTreeMap<&str, usize> = BTreeMap::new();
    let mut type_counts: BTreeMap<&str, usize> = BTreeMap::new();
    for node in &nodes {
        for tag in &node.tags {
            *tag_counts.entry(tag.as_str()).or_default() += 1;
        }
        *type_counts.entry(node.item_type.as_str()).or_default() += 1;
    }
    let label = most_frequent(&tag_counts)
        .or_else(|| most_frequent(&type_counts))
        .unwrap_or("unlabeled")
        .to_string();

    let mean_energy = nodes.iter().map(|n| n.energy).sum::<f64>() / nodes.len().max(1) as f64;

    // Highest importance wins; members are in id order, so the first max is the smallest id
    let anchor = nodes
        .iter()
        .copied()
        .fold(None::<&GraphNode>, |best, node| match best {
            Some(b) if b.importance >= node.importance => Some(b),
            _ => Some(node),
        })
        .map(|n| n.id.clone())
        .unwrap_or_default();

    let mut member_ids: Vec<ItemId> = nodes.iter().map(|n| n.id.clone()).collect();
    member_ids.sort();

    CommunityInfo {
        id,
        size: member_ids.len(),
        members: member_ids,
        label,
        mean_energy,
        anchor,
    }
}

/// Key with the highest count; alphabetical on ties (BTreeMap order + strict `>`).
fn most_frequent<'a>(counts: &BTreeMap<&'a str, usize>) -> Option<&'a str> {
    let mut best: Option<(&str, usize)> = None;
    for (&key, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((key, count));
        }
    }
    best.map(|(key, _)| key)
}

/// Compute Newman's modularity Q for a given community assignment.
fn compute_modularity(
    community: &[u32],
    adj: &[Vec<(usize, f64)>],
    node_strengths: &[f64],
    total_weight: f64,
) -> f64 {
    if total_weight == 0.0 {
        return 0.0;
    }
    let m2 = 2.0 * total_weight;
    let mut q = 0.0;

    for (i, neighbors) in adj.iter().enumerate() {
        for &(j, w) in neighbors {
            if community[i] == community[j] {
                q += w;
            }
        }
    }
    // Expected term over all same-community pairs (including i == j)
    let mut comm_strength: BTreeMap<u32, f64> = BTreeMap::new();
    for (i, &k) in node_strengths.iter().enumerate() {
        *comm_strength.entry(community[i]).or_default() += k;
    }
    let expected: f64 = comm_strength.values().map(|s| s * s / m2).sum();

    // Each undirected edge is counted twice in the adjacency list
    (q - expected) / m2
}

// ============================================================================
// Connected Components
// ============================================================================

/// Identify connected components.
///
/// Returns `(node_to_component, component_infos)`. Components are numbered in
/// order of their smallest member id.
pub fn connected_components(graph: &MemoryGraph) -> (BTreeMap<ItemId, u32>, Vec<ComponentInfo>) {
    let g = &graph.graph;
    let n = g.node_count();
    if n == 0 {
        return (BTreeMap::new(), vec![]);
    }

    let mut component_of: Vec<Option<u32>> = vec![None; n];
    let mut component_id = 0u32;

    for start in g.node_indices() {
        if component_of[start.index()].is_some() {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        component_of[start.index()] = Some(component_id);

        while let Some(current) = queue.pop_front() {
            for neighbor in g.neighbors(current) {
                if component_of[neighbor.index()].is_none() {
                    component_of[neighbor.index()] = Some(component_id);
                    queue.push_back(neighbor);
                }
            }
        }
        component_id += 1;
    }

    let mut node_map = BTreeMap::new();
    let mut comp_members: BTreeMap<u32, Vec<ItemId>> = BTreeMap::new();

    for idx in g.node_indices() {
        let id = g[idx].id.clone();
        let comp = component_of[idx.index()].unwrap_or(0);
        node_map.insert(id.clone(), comp);
        comp_members.entry(comp).or_default().push(id);
    }

    let max_size = comp_members.values().map(|v| v.len()).max().unwrap_or(0);

    let mut components: Vec<ComponentInfo> = comp_members
        .into_iter()
        .map(|(id, members)| ComponentInfo {
            id,
            size: members.len(),
            is_main: members.len() == max_size,
            members,
        })
        .collect();
    components.sort_by(|a, b| b.size.cmp(&a.size).then_with(|| a.members.cmp(&b.members)));

    (node_map, components)
}

// ============================================================================
// Degree & density
// ============================================================================

/// Incident edge count per node.
pub fn degrees(graph: &MemoryGraph) -> BTreeMap<ItemId, usize> {
    let g = &graph.graph;
    g.node_indices()
        .map(|idx| (g[idx].id.clone(), g.edges(idx).count()))
        .collect()
}

/// `e / (n(n-1)/2)` for n ≥ 2, else 0.
pub fn density(node_count: usize, edge_count: usize) -> f64 {
    if node_count < 2 {
        return 0.0;
    }
    let possible = node_count as f64 * (node_count as f64 - 1.0) / 2.0;
    edge_count as f64 / possible
}

// ============================================================================
// Orchestration
// ============================================================================

/// Run every algorithm and assemble a [`GraphAnalytics`].
pub fn compute_all(graph: &MemoryGraph, config: &AnalyticsConfig) -> GraphAnalytics {
    let node_count = graph.node_count();
    let edge_count = graph.edge_count();

    let degrees = degrees(graph);
    let isolated_count = degrees.values().filter(|d| **d == 0).count();
    let (community_of, communities, modularity) = louvain_communities(graph, config);
    let (_, components) = connected_components(graph);

    let average_degree = if node_count == 0 {
        0.0
    } else {
        2.0 * edge_count as f64 / node_count as f64
    };

    debug!(
        node_count,
        edge_count,
        communities = communities.len(),
        components = components.len(),
        "Graph analytics computed"
    );

    GraphAnalytics {
        node_count,
        edge_count,
        density: density(node_count, edge_count),
        average_degree,
        degrees,
        community_of,
        communities,
        modularity,
        components,
        isolated_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{items, star, state_with, test_item_with, two_cliques};
    use chrono::Utc;

    fn analyze(state: &crate::memory::models::MemoryState) -> GraphAnalytics {
        compute_all(&MemoryGraph::from_state(state), &AnalyticsConfig::default())
    }

    #[test]
    fn test_empty_graph() {
        let result = analyze(&state_with(vec![], &[]));
        assert_eq!(result.node_count, 0);
        assert_eq!(result.density, 0.0);
        assert_eq!(result.average_degree, 0.0);
        assert!(result.communities.is_empty());
        assert!(result.components.is_empty());
        assert_eq!(result.modularity, 0.0);
    }

    #[test]
    fn test_louvain_two_cliques_detects_2_communities() {
        let g = MemoryGraph::from_state(&two_cliques(Utc::now()));
        let (node_map, communities, modularity) =
            louvain_communities(&g, &AnalyticsConfig::default());

        assert_eq!(node_map.len(), 8);
        assert_eq!(
            communities.len(),
            2,
            "Expected 2 communities, got {:?}",
            communities
        );
        assert!(modularity > 0.0, "Modularity should be positive");

        let a_comm = node_map["a0"];
        for id in ["a1", "a2", "a3"] {
            assert_eq!(node_map[id], a_comm, "{} should be with a0", id);
        }
        let b_comm = node_map["b0"];
        assert_ne!(a_comm, b_comm);
        for id in ["b1", "b2", "b3"] {
            assert_eq!(node_map[id], b_comm, "{} should be with b0", id);
        }
    }

    #[test]
    fn test_louvain_is_deterministic() {
        let g = MemoryGraph::from_state(&two_cliques(Utc::now()));
        let first = louvain_communities(&g, &AnalyticsConfig::default());
        let second = louvain_communities(&g, &AnalyticsConfig::default());
        assert_eq!(first.0, second.0);
        assert_eq!(first.1, second.1);
    }

    #[test]
    fn test_partition_is_exact() {
        let now = Utc::now();
        let state = state_with(
            items(&["a", "b", "c", "d", "e", "lonely"], now),
            &[("a", "b", 1.0), ("b", "c", 1.0), ("d", "e", 0.5)],
        );
        let result = analyze(&state);

        // Every item in exactly one community
        let mut seen: Vec<&str> = result
            .communities
            .iter()
            .flat_map(|c| c.members.iter().map(String::as_str))
            .collect();
        seen.sort();
        assert_eq!(seen, vec!["a", "b", "c", "d", "e", "lonely"]);
        assert_eq!(
            result.communities.iter().map(|c| c.size).sum::<usize>(),
            result.node_count
        );

        // Isolated items are singletons
        let lonely = result.community_of["lonely"];
        let lonely_info = result.communities.iter().find(|c| c.id == lonely).unwrap();
        assert_eq!(lonely_info.members, vec!["lonely".to_string()]);
        assert_eq!(result.isolated_count, 1);
    }

    #[test]
    fn test_components_and_topology() {
        let now = Utc::now();
        let state = state_with(
            items(&["a", "b", "c", "d", "e", "f"], now),
            &[("a", "b", 1.0), ("b", "c", 1.0), ("d", "e", 1.0)],
        );
        let result = analyze(&state);

        assert_eq!(result.components.len(), 3);
        assert_eq!(result.components[0].members, vec!["a", "b", "c"]);
        assert!(result.components[0].is_main);
        assert_eq!(result.components[1].members, vec!["d", "e"]);
        assert_eq!(result.components[2].members, vec!["f"]);

        assert!((result.density - 3.0 / 15.0).abs() < 1e-12);
        assert!((result.average_degree - 1.0).abs() < 1e-12);
        assert_eq!(result.degrees["b"], 2);
        assert_eq!(result.max_degree(), 2);
    }

    #[test]
    fn test_star_degrees() {
        let result = analyze(&star(5, Utc::now()));
        assert_eq!(result.degrees["hub"], 5);
        assert_eq!(result.degrees["leaf0"], 1);
        assert_eq!(result.components.len(), 1);
        assert_eq!(result.isolated_count, 0);
    }

    #[test]
    fn test_community_label_anchor_and_energy() {
        let now = Utc::now();
        let mut x = test_item_with("x", "graph db client", "insight", &["db", "rust"], now);
        x.importance = 0.9;
        x.energy = 0.8;
        let mut y = test_item_with("y", "pool sizing", "insight", &["db"], now);
        y.importance = 0.9;
        y.energy = 0.4;
        let mut z = test_item_with("z", "no tags here", "pattern", &[], now);
        z.importance = 0.2;
        z.energy = 0.0;
        let state = state_with(vec![x, y, z], &[("x", "y", 1.0)]);

        let result = analyze(&state);
        let pair = result.communities.iter().find(|c| c.size == 2).unwrap();
        assert_eq!(pair.label, "db");
        assert_eq!(pair.anchor, "x");
        assert!((pair.mean_energy - 0.6).abs() < 1e-12);

        let single = result.communities.iter().find(|c| c.size == 1).unwrap();
        assert_eq!(single.label, "pattern");
        assert_eq!(single.anchor, "z");
    }

    #[test]
    fn test_most_frequent_ties_are_alphabetical() {
        let mut counts = BTreeMap::new();
        counts.insert("zeta", 2);
        counts.insert("alpha", 2);
        counts.insert("mid", 1);
        assert_eq!(most_frequent(&counts), Some("alpha"));
        assert_eq!(most_frequent(&BTreeMap::new()), None);
    }

    #[test]
    fn test_modularity_single_community_is_zero() {
        // One community covering all nodes: Q = 0
        let adj = vec![vec![(1, 1.0)], vec![(0, 1.0)]];
        let q = compute_modularity(&[0, 0], &adj, &[1.0, 1.0], 1.0);
        assert!(q.abs() < 1e-12);
    }
}
