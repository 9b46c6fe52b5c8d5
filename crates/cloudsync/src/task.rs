//! Follow-on task trigger

use crate::error::{Result, SyncError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::mpsc;

/// A follow-on provisioning/reconciliation task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// Task name (e.g. "LoadbalancerRemoteUpdateTask")
    pub name: String,

    pub keyword: String,

    /// Local id of the record the task works on
    pub target_id: String,

    #[serde(default)]
    pub params: serde_json::Value,
}

impl TaskRequest {
    pub fn new(
        name: impl Into<String>,
        keyword: impl Into<String>,
        target_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            keyword: keyword.into(),
            target_id: target_id.into(),
            params: serde_json::Value::Null,
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }
}

/// Fire-and-forget task scheduling.
///
/// `trigger` must not block; a failure is logged by the caller and never
/// rolls back the sync.
pub trait TaskTrigger: Send + Sync {
    fn trigger(&self, request: TaskRequest) -> Result<()>;

    /// Whether a task is currently running against the record
    fn is_in_task(&self, keyword: &str, id: &str) -> bool;
}

/// Drops every request; nothing is ever busy
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTasks;

impl TaskTrigger for NoopTasks {
    fn trigger(&self, request: TaskRequest) -> Result<()> {
        tracing::debug!(task = %request.name, target = %request.target_id, "Dropping task request");
        Ok(())
    }

    fn is_in_task(&self, _keyword: &str, _id: &str) -> bool {
        false
    }
}

/// Hands requests to a worker over an unbounded channel and tracks busy records
#[derive(Debug)]
pub struct QueuedTasks {
    sender: mpsc::UnboundedSender<TaskRequest>,
    busy: Mutex<HashSet<(String, String)>>,
}

impl QueuedTasks {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TaskRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                busy: Mutex::new(HashSet::new()),
            },
            receiver,
        )
    }

    pub fn mark_busy(&self, keyword: &str, id: &str) {
        self.busy
            .lock()
            .insert((keyword.to_string(), id.to_string()));
    }

    pub fn mark_idle(&self, keyword: &str, id: &str) {
        self.busy
            .lock()
            .remove(&(keyword.to_string(), id.to_string()));
    }
}

impl TaskTrigger for QueuedTasks {
    fn trigger(&self, request: TaskRequest) -> Result<()> {
        self.sender
            .send(request)
            .map_err(|e| SyncError::Transient(format!("task queue closed: {}", e.0.name)))
    }

    fn is_in_task(&self, keyword: &str, id: &str) -> bool {
        self.busy
            .lock()
            .contains(&(keyword.to_string(), id.to_string()))
    }
}
