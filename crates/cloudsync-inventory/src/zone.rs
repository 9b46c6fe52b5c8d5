//! Availability zones

use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use crate::storage::{RemoteStorage, Storage};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope,
    SyncContext, SyncError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "zone";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(flatten)]
    pub meta: ResourceMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteZone {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub storages: Vec<RemoteStorage>,
}

impl_record!(Zone);
impl_remote_record!(RemoteZone);
impl_external_key!(Zone, RemoteZone);

/// Zones block deletion while storages remain in them
pub struct ZoneKind {
    storages: Arc<dyn LocalStore<Storage>>,
}

impl ZoneKind {
    pub fn new(storages: Arc<dyn LocalStore<Storage>>) -> Self {
        Self { storages }
    }
}

impl ResourceKind for ZoneKind {
    type Local = Zone;
    type Remote = RemoteZone;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for ZoneKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteZone) -> Result<Zone> {
        Ok(Zone {
            meta: ResourceMeta::discovered(scope, &remote.meta),
        })
    }

    fn map_fields(&self, _local: &mut Zone, _remote: &RemoteZone) {}
}

#[async_trait]
impl Deletable for ZoneKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &Zone) -> Result<()> {
        let storages = crate::child_count(self.storages.as_ref(), &local.meta).await?;
        if storages > 0 {
            return Err(SyncError::ConstraintViolation(format!(
                "zone {} still has {} storages",
                local.meta.name, storages
            )));
        }
        Ok(())
    }
}
