//! Graph analytics over the memory graph.
//!
//! Builds an undirected petgraph view of a memory state and computes the
//! structural summaries the manifest reports: communities (Louvain),
//! connected components, degrees, density and modularity.
//!
//! ## Architecture
//!
//! ```text
//! MemoryState ──► MemoryGraph (petgraph::UnGraph)
//!                        │
//!                   algorithms
//!                        │
//!               GraphAnalytics result ──► manifest
//! ```
//!
//! ## Modules
//!
//! - [`models`] — Data structures (MemoryGraph, CommunityInfo, GraphAnalytics, AnalyticsConfig)
//! - [`algorithms`] — Algorithm implementations (Louvain, components, degree, modularity)

pub mod algorithms;
pub mod models;

// Re-export primary types for convenience
pub use algorithms::compute_all;
pub use models::{
    AnalyticsConfig, CommunityInfo, ComponentInfo, GraphAnalytics, GraphNode, MemoryGraph,
};
