//! Collaborators shared by every orchestrator

use crate::context::SyncContext;
use crate::error::Result;
use crate::event::{EventSink, TracingEventSink};
use crate::lock::{LockManager, MemoryLockManager};
use crate::model::{Record, STATUS_UNKNOWN};
use crate::project::{ProjectMapper, ProjectSync};
use crate::store::{LocalStore, Mutator};
use crate::task::{NoopTasks, TaskTrigger};
use std::sync::Arc;

/// Pass-wide behavior switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Add/remove-only pass: matched records are neither updated nor cascaded
    pub xor: bool,

    /// Follow remote renames of matched records
    pub enable_sync_name: bool,

    /// Status given to records that vanished remotely but cannot be deleted
    pub unknown_status: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            xor: false,
            enable_sync_name: true,
            unknown_status: STATUS_UNKNOWN.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct SyncServices {
    pub locks: Arc<dyn LockManager>,
    pub projects: Arc<dyn ProjectSync>,
    pub tasks: Arc<dyn TaskTrigger>,
    pub events: Arc<dyn EventSink>,
    pub options: SyncOptions,
}

impl SyncServices {
    /// In-process collaborators: memory locks, no project rules, no tasks,
    /// events written to `tracing`.
    pub fn new(options: SyncOptions) -> Self {
        Self {
            locks: Arc::new(MemoryLockManager::new()),
            projects: Arc::new(ProjectMapper::new()),
            tasks: Arc::new(NoopTasks),
            events: Arc::new(TracingEventSink),
            options,
        }
    }

    pub fn with_locks(mut self, locks: Arc<dyn LockManager>) -> Self {
        self.locks = locks;
        self
    }

    pub fn with_projects(mut self, projects: Arc<dyn ProjectSync>) -> Self {
        self.projects = projects;
        self
    }

    pub fn with_tasks(mut self, tasks: Arc<dyn TaskTrigger>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Update a record outside the orchestrator's own update path.
    ///
    /// Runs under the record's object lock and writes a non-empty diff to the
    /// event sink. Returns whether anything changed.
    pub async fn update_record<T: Record>(
        &self,
        ctx: &SyncContext,
        keyword: &str,
        store: &dyn LocalStore<T>,
        record: &T,
        mutator: Mutator<'_, T>,
    ) -> Result<bool> {
        let _lock = self.locks.lock_object(ctx, keyword, record.id()).await?;
        let (updated, diff) = store.update_with_lock(record, mutator).await?;
        if diff.is_empty() {
            return Ok(false);
        }
        self.events.updated(keyword, updated.meta(), &diff);
        Ok(true)
    }
}

impl Default for SyncServices {
    fn default() -> Self {
        Self::new(SyncOptions::default())
    }
}

impl std::fmt::Debug for SyncServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncServices")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
