//! Database instances

use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, Record, RemoteMeta, ResourceKind, ResourceMeta, Result, Scope,
    SyncContext, SyncError, TaskRequest,
};
use serde::{Deserialize, Serialize};

pub const KEYWORD: &str = "dbinstance";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DbInstance {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub delete_protection: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteDbInstance {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub engine: String,
    #[serde(default)]
    pub engine_version: String,
    #[serde(default)]
    pub instance_type: String,
    #[serde(default)]
    pub delete_protection: bool,
}

impl_record!(DbInstance);
impl_remote_record!(RemoteDbInstance);
impl_external_key!(DbInstance, RemoteDbInstance);

#[derive(Debug, Default)]
pub struct DbInstanceKind;

impl ResourceKind for DbInstanceKind {
    type Local = DbInstance;
    type Remote = RemoteDbInstance;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for DbInstanceKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteDbInstance) -> Result<DbInstance> {
        Ok(DbInstance {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            engine: remote.engine.clone(),
            engine_version: remote.engine_version.clone(),
            instance_type: remote.instance_type.clone(),
            delete_protection: remote.delete_protection,
        })
    }

    fn map_fields(&self, local: &mut DbInstance, remote: &RemoteDbInstance) {
        local.engine = remote.engine.clone();
        local.engine_version = remote.engine_version.clone();
        local.instance_type = remote.instance_type.clone();
        local.delete_protection = remote.delete_protection;
    }

    /// New instances get their databases and accounts synced by a task
    fn follow_up(&self, local: &DbInstance, created: bool) -> Option<TaskRequest> {
        created.then(|| {
            TaskRequest::new("DBInstanceSyncTask", KEYWORD, local.id())
                .with_params(serde_json::json!({ "engine": local.engine }))
        })
    }
}

#[async_trait]
impl Deletable for DbInstanceKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &DbInstance) -> Result<()> {
        if local.delete_protection {
            return Err(SyncError::ConstraintViolation(format!(
                "dbinstance {} has delete protection enabled",
                local.meta.name
            )));
        }
        Ok(())
    }
}
