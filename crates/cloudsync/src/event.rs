//! Sync event sink

use crate::model::ResourceMeta;
use crate::store::FieldChange;
use parking_lot::Mutex;

/// Receives the audit trail of a pass: creations, diff logs, deletions and
/// records flagged out-of-sync.
pub trait EventSink: Send + Sync {
    fn created(&self, keyword: &str, meta: &ResourceMeta);
    fn updated(&self, keyword: &str, meta: &ResourceMeta, diff: &[FieldChange]);
    fn deleted(&self, keyword: &str, meta: &ResourceMeta);
    fn flagged(&self, keyword: &str, meta: &ResourceMeta, reason: &str);
}

/// Writes events as structured `tracing` records
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn created(&self, keyword: &str, meta: &ResourceMeta) {
        tracing::info!(keyword, id = %meta.id, name = %meta.name, external_id = %meta.external_id, "Created");
    }

    fn updated(&self, keyword: &str, meta: &ResourceMeta, diff: &[FieldChange]) {
        for change in diff {
            tracing::info!(
                keyword,
                id = %meta.id,
                field = %change.field,
                old = %change.old,
                new = %change.new,
                "Updated"
            );
        }
    }

    fn deleted(&self, keyword: &str, meta: &ResourceMeta) {
        tracing::info!(keyword, id = %meta.id, name = %meta.name, "Deleted");
    }

    fn flagged(&self, keyword: &str, meta: &ResourceMeta, reason: &str) {
        tracing::warn!(keyword, id = %meta.id, name = %meta.name, reason, "Marked out of sync");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Created { keyword: String, id: String, name: String },
    Updated { keyword: String, id: String, fields: Vec<String> },
    Deleted { keyword: String, id: String },
    Flagged { keyword: String, id: String, reason: String },
}

/// Keeps events in memory for inspection
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<SyncEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SyncEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn created(&self, keyword: &str, meta: &ResourceMeta) {
        self.events.lock().push(SyncEvent::Created {
            keyword: keyword.to_string(),
            id: meta.id.clone(),
            name: meta.name.clone(),
        });
    }

    fn updated(&self, keyword: &str, meta: &ResourceMeta, diff: &[FieldChange]) {
        self.events.lock().push(SyncEvent::Updated {
            keyword: keyword.to_string(),
            id: meta.id.clone(),
            fields: diff.iter().map(|c| c.field.clone()).collect(),
        });
    }

    fn deleted(&self, keyword: &str, meta: &ResourceMeta) {
        self.events.lock().push(SyncEvent::Deleted {
            keyword: keyword.to_string(),
            id: meta.id.clone(),
        });
    }

    fn flagged(&self, keyword: &str, meta: &ResourceMeta, reason: &str) {
        self.events.lock().push(SyncEvent::Flagged {
            keyword: keyword.to_string(),
            id: meta.id.clone(),
            reason: reason.to_string(),
        });
    }
}
