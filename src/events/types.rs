//! Memory event types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::models::HistoryAction;

/// An event emitted after a mutation was made durable.
///
/// Must be Clone for `tokio::sync::broadcast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEvent {
    /// What happened
    pub action: HistoryAction,
    /// The item concerned, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Other end of an edge (Associated / Reinforced)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
    /// Optional payload (e.g. outcome, removed edge count)
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
    /// Clock time of the mutation
    pub at: DateTime<Utc>,
}

impl MemoryEvent {
    pub fn new(action: HistoryAction, at: DateTime<Utc>) -> Self {
        Self {
            action,
            item_id: None,
            related: None,
            payload: serde_json::Value::Null,
            at,
        }
    }

    pub fn with_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }

    pub fn with_related(mut self, related: impl Into<String>) -> Self {
        self.related = Some(related.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Sink for memory events. Emitting must never block or fail.
pub trait EventEmitter: Send + Sync {
    fn emit(&self, event: MemoryEvent);

    fn emit_for_item(&self, action: HistoryAction, item_id: &str, at: DateTime<Utc>) {
        self.emit(MemoryEvent::new(action, at).with_item(item_id));
    }

    fn emit_linked(&self, action: HistoryAction, from: &str, to: &str, at: DateTime<Utc>) {
        self.emit(MemoryEvent::new(action, at).with_item(from).with_related(to));
    }
}
