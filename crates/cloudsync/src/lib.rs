//! CloudSync reconciliation engine
//!
//! Keeps a local inventory consistent with the state reported by cloud
//! providers. Every resource kind follows the same contract: list remote
//! state, load the local set, compute a three-way diff, then apply
//! deletes, updates and creations under locks.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │         ScopeDriver / SyncRegistry               │
//! │      (scheduled or on-demand resync)             │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               SyncOrchestrator<K>                │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │ compare_sets │  │ FieldMapper / Deletable   │ │
//! │  └──────────────┘  └──────────────────────────┘ │
//! │  ┌──────────────┐  ┌──────────────────────────┐ │
//! │  │  SyncResult  │  │ Cascade (per vendor)      │ │
//! │  └──────────────┘  └──────────────────────────┘ │
//! └───────┬─────────────────┬───────────────────────┘
//!         │                 │
//! ┌───────▼───────┐ ┌───────▼───────┐
//! │  LocalStore   │ │ RemoteLister  │
//! │  LockManager  │ │ ChildLister   │
//! └───────────────┘ └───────────────┘
//! ```

pub mod cascade;
pub mod compare;
pub mod context;
pub mod driver;
pub mod error;
pub mod event;
pub mod key;
pub mod kind;
pub mod lock;
pub mod model;
pub mod orchestrator;
pub mod project;
pub mod registry;
pub mod remote;
pub mod result;
pub mod scope;
pub mod services;
pub mod store;
pub mod task;
pub mod vendor;

#[cfg(test)]
mod testing;

// Re-exports
pub use cascade::{Cascade, ChildSync};
pub use compare::{KeyConflict, Partition, compare_sets};
pub use context::SyncContext;
pub use driver::{ScopeDriver, ScopeJob};
pub use error::{Result, SyncError};
pub use event::{EventSink, RecordingEventSink, SyncEvent, TracingEventSink};
pub use key::{SyncKey, composite_key, global_or_composite};
pub use kind::{Deletable, FieldMapper, ResourceKind};
pub use lock::{LockGuard, LockManager, MemoryLockManager};
pub use model::{Owner, Record, RemoteMeta, RemoteRecord, ResourceMeta, STATUS_UNKNOWN};
pub use orchestrator::{SyncOrchestrator, SyncOutcome};
pub use project::{ProjectMapper, ProjectRule, ProjectSync};
pub use registry::{RegisteredSync, ScopeSync, SyncRegistry};
pub use remote::{ChildLister, RemoteLister, StaticLister};
pub use result::{KeywordStats, SyncResult, SyncResultSet, SyncSummary};
pub use scope::Scope;
pub use services::{SyncOptions, SyncServices};
pub use store::{FieldChange, LocalStore, MemoryStore, Mutator, RecordDiff, diff_records};
pub use task::{NoopTasks, QueuedTasks, TaskRequest, TaskTrigger};
pub use vendor::{Vendor, VendorTable};
