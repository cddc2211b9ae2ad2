//! Text rendering of a manifest.
//!
//! Output shape:
//!
//! ```text
//! Memory: 42 items, 57 edges, energy 0.61
//! Topology: density 0.066, avg degree 2.71, 3 components, 2 isolated, modularity 0.412
//! Communities (4): rust (18, e0.72); storage (12, e0.55); ... +1 more
//! Temporal: emerging 3 | active 11 | stable 25 | decaying 3
//! Key nodes:
//! - 3f2a... [insight] 0.91 "FalkorDB client works with the redis protocol"
//! Recent: 3f2a..., 9c1b...
//! ```
//!
//! Every variable-length field is cut to a fixed width and every list is
//! capped, so the length is bounded by [`ManifestConfig::max_rendered_len`].

use super::models::{KeyNode, ManifestConfig, TemporalSummary, Topology, NUM_WIDTH};
use crate::graph::CommunityInfo;
use crate::memory::models::ItemId;

const NUM_LIMIT: f64 = 1e9;

/// Collapse whitespace and control characters, then cut to `width` characters.
pub fn truncate(text: &str, width: usize) -> String {
    let clean = text
        .split(|c: char| c.is_whitespace() || c.is_control())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if clean.chars().count() <= width {
        return clean;
    }
    if width == 0 {
        return String::new();
    }
    let mut cut: String = clean.chars().take(width - 1).collect();
    cut.push('…');
    cut
}

fn num(value: f64, decimals: usize) -> String {
    let value = if value.is_finite() {
        value.clamp(-NUM_LIMIT, NUM_LIMIT)
    } else {
        0.0
    };
    let out = format!("{:.*}", decimals, value);
    debug_assert!(out.chars().count() <= NUM_WIDTH);
    out
}

/// Everything the text needs, borrowed from the manifest being built.
pub struct RenderInput<'a> {
    pub item_count: usize,
    pub edge_count: usize,
    pub energy: f64,
    pub topology: &'a Topology,
    pub communities: &'a [CommunityInfo],
    pub temporal: &'a TemporalSummary,
    pub key_nodes: &'a [KeyNode],
    pub recent: &'a [ItemId],
}

/// Render the manifest text.
pub fn render(input: &RenderInput<'_>, config: &ManifestConfig) -> String {
    let mut lines = Vec::with_capacity(6 + input.key_nodes.len());

    lines.push(format!(
        "Memory: {} items, {} edges, energy {}",
        input.item_count,
        input.edge_count,
        num(input.energy, 2)
    ));

    let t = input.topology;
    lines.push(format!(
        "Topology: density {}, avg degree {}, {} components, {} isolated, modularity {}",
        num(t.density, 3),
        num(t.average_degree, 2),
        t.component_count,
        t.isolated_count,
        num(t.modularity, 3)
    ));

    let mut communities = format!("Communities ({}):", input.communities.len());
    if input.communities.is_empty() {
        communities.push_str(" none");
    }
    for c in input.communities.iter().take(config.max_communities) {
        communities.push_str(&format!(
            " {} ({}, e{});",
            truncate(&c.label, config.label_width),
            c.size,
            num(c.mean_energy, 2)
        ));
    }
    let hidden = input.communities.len().saturating_sub(config.max_communities);
    if hidden > 0 {
        communities.push_str(&format!(" +{} more", hidden));
    }
    lines.push(communities);

    let tm = input.temporal;
    lines.push(format!(
        "Temporal: emerging {} | active {} | stable {} | decaying {}",
        tm.emerging.len(),
        tm.active.len(),
        tm.stable.len(),
        tm.decaying.len()
    ));

    let mut key_nodes = String::from("Key nodes:");
    for node in input.key_nodes.iter().take(config.max_key_nodes) {
        key_nodes.push_str(&format!(
            "\n- {} [{}] {} \"{}\"",
            truncate(&node.id, config.id_width),
            truncate(&node.item_type, config.type_width),
            num(node.score, 2),
            truncate(&node.preview, config.preview_chars)
        ));
    }
    lines.push(key_nodes);

    let recent: Vec<String> = input
        .recent
        .iter()
        .take(config.max_recent)
        .map(|id| truncate(id, config.id_width))
        .collect();
    lines.push(if recent.is_empty() {
        "Recent: none".to_string()
    } else {
        format!("Recent: {}", recent.join(", "))
    });

    lines.join("\n")
}
