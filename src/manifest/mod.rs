//! Memory manifest
//!
//! A bounded, deterministic text summary of the memory graph's current shape
//! (topology, communities, temporal buckets, key nodes, recent activity),
//! meant for ambient injection into a constrained context budget.
//!
//! ## Modules
//!
//! - [`models`] — Manifest, Topology, TemporalSummary, KeyNode, ManifestConfig
//! - [`generator`] — `ManifestGenerator`: state snapshot + now → Manifest
//! - [`render`] — fixed-width text rendering
//! - [`cache`] — `ManifestCache`: TTL memoization and invalidation

pub mod cache;
pub mod generator;
pub mod models;
pub mod render;

pub use cache::{ManifestCache, ManifestStaleness};
pub use generator::ManifestGenerator;
pub use models::{
    KeyNode, Manifest, ManifestConfig, TemporalBucket, TemporalSummary, Topology,
};
