//! Storages and their disks

use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope,
    SyncContext, SyncError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "storage";
pub const DISK_KEYWORD: &str = "disk";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Storage {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub capacity_gb: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteStorage {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub storage_type: String,
    #[serde(default)]
    pub capacity_gb: u64,
    #[serde(default)]
    pub disks: Vec<RemoteDisk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disk {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub size_gb: u64,
    #[serde(default)]
    pub disk_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDisk {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub size_gb: u64,
    #[serde(default)]
    pub disk_type: String,
}

impl_record!(Storage, Disk);
impl_remote_record!(RemoteStorage, RemoteDisk);
impl_external_key!(Storage, RemoteStorage);
impl_external_key!(Disk, RemoteDisk);

/// A storage with disks on it is flagged instead of deleted
pub struct StorageKind {
    disks: Arc<dyn LocalStore<Disk>>,
}

impl StorageKind {
    pub fn new(disks: Arc<dyn LocalStore<Disk>>) -> Self {
        Self { disks }
    }
}

impl ResourceKind for StorageKind {
    type Local = Storage;
    type Remote = RemoteStorage;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for StorageKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteStorage) -> Result<Storage> {
        let mut storage = Storage {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            storage_type: String::new(),
            capacity_gb: 0,
        };
        self.map_fields(&mut storage, remote);
        Ok(storage)
    }

    fn map_fields(&self, local: &mut Storage, remote: &RemoteStorage) {
        local.storage_type = remote.storage_type.clone();
        local.capacity_gb = remote.capacity_gb;
    }
}

#[async_trait]
impl Deletable for StorageKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &Storage) -> Result<()> {
        let disks = crate::child_count(self.disks.as_ref(), &local.meta).await?;
        if disks > 0 {
            return Err(SyncError::ConstraintViolation(format!(
                "storage {} still has {} disks",
                local.meta.name, disks
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct DiskKind;

impl ResourceKind for DiskKind {
    type Local = Disk;
    type Remote = RemoteDisk;

    fn keyword(&self) -> &'static str {
        DISK_KEYWORD
    }
}

#[async_trait]
impl FieldMapper for DiskKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteDisk) -> Result<Disk> {
        Ok(Disk {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            size_gb: remote.size_gb,
            disk_type: remote.disk_type.clone(),
        })
    }

    fn map_fields(&self, local: &mut Disk, remote: &RemoteDisk) {
        local.size_gb = remote.size_gb;
        local.disk_type = remote.disk_type.clone();
    }
}

impl Deletable for DiskKind {}
