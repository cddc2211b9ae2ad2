//! Associative retrieval for memory items
//!
//! Implements spreading activation over the memory graph:
//! items act as neurons, edges as weighted symmetric connections.
//! Seeds come either from explicit ids or from lexical overlap with a query.

pub mod activation;
pub mod config;

pub use activation::{seeds_from_query, Activations, SpreadingActivationEngine};
pub use config::{AutoReinforcementConfig, SpreadingActivationConfig};
