//! Memory module
//!
//! Items, edges and the aggregate state, plus the decay lifecycle and the
//! caller-facing [`MemoryManager`].

pub mod lifecycle;
pub mod manager;
pub mod models;
pub mod store;

pub use lifecycle::{DecayConfig, DecayReport, EnergyLifecycle};
pub use manager::{MemoryManager, MemorySettings, RecallRequest, RecallSeed};
pub use models::*;
pub use store::MemoryStore;
