//! Per-resource-type capabilities
//!
//! A resource kind tells the orchestrator how its local and remote records
//! look ([`ResourceKind`]), how remote fields map onto a local record
//! ([`FieldMapper`]) and whether a vanished record may be deleted
//! ([`Deletable`]). The orchestrator depends on these traits only.

use crate::context::SyncContext;
use crate::error::Result;
use crate::key::SyncKey;
use crate::model::{Record, RemoteRecord};
use crate::scope::Scope;
use crate::task::TaskRequest;
use async_trait::async_trait;

pub trait ResourceKind: Send + Sync + 'static {
    type Local: Record + SyncKey;
    type Remote: RemoteRecord + SyncKey + Clone;

    /// Keyword used for locks, logs and the registry
    fn keyword(&self) -> &'static str;
}

#[async_trait]
pub trait FieldMapper: ResourceKind {
    /// Build a new local record for `remote` within `scope`.
    ///
    /// The name is assigned by the orchestrator afterwards.
    fn new_local(&self, scope: &Scope, remote: &Self::Remote) -> Result<Self::Local>;

    /// Copy the mutable remote fields onto `local`.
    ///
    /// Name, status and owner are handled by the orchestrator.
    fn map_fields(&self, local: &mut Self::Local, remote: &Self::Remote);

    /// Hook run after a record was created or updated, outside the update
    /// itself (linking related records, updating a parent).
    ///
    /// Returns whether it changed any record. Writes go through
    /// [`SyncServices::update_record`](crate::SyncServices::update_record).
    async fn after_sync(
        &self,
        _ctx: &SyncContext,
        _local: &Self::Local,
        _remote: &Self::Remote,
    ) -> Result<bool> {
        Ok(false)
    }

    /// Follow-on task to enqueue after a create (`created`) or a change
    fn follow_up(&self, _local: &Self::Local, _created: bool) -> Option<TaskRequest> {
        None
    }
}

#[async_trait]
pub trait Deletable: ResourceKind {
    /// Delete-eligibility check for a record that vanished remotely.
    ///
    /// Returning [`SyncError::ConstraintViolation`](crate::SyncError::ConstraintViolation)
    /// flags the record instead of deleting it.
    async fn validate_delete(&self, _ctx: &SyncContext, _local: &Self::Local) -> Result<()> {
        Ok(())
    }

    /// Remove records owned by `local` before it is deleted
    async fn purge_children(&self, _ctx: &SyncContext, _local: &Self::Local) -> Result<()> {
        Ok(())
    }
}
