//! Memory event system
//!
//! This module provides:
//! - `MemoryEvent` — typed events emitted after every durable mutation
//! - `EventBus` — broadcast channel for distributing events to subscribers

mod bus;
mod types;

pub use bus::EventBus;
pub use types::{EventEmitter, MemoryEvent};
