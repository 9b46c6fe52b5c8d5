//! Local and remote resource projections

use crate::scope::Scope;
use crate::vendor::Vendor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default out-of-sync status for records that vanished remotely but
/// cannot be deleted yet.
pub const STATUS_UNKNOWN: &str = "unknown";

/// Owning domain/project of a record
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner {
    pub domain_id: String,
    pub project_id: String,
}

impl Owner {
    pub fn new(domain_id: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            domain_id: domain_id.into(),
            project_id: project_id.into(),
        }
    }
}

/// Fields shared by every locally persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceMeta {
    /// Local identifier, assigned at creation and never changed
    pub id: String,

    /// Provider-assigned global id (empty for virtual resources)
    #[serde(default)]
    pub external_id: String,

    pub name: String,

    pub status: String,

    /// Provider account the record was discovered through
    pub manager_id: String,

    /// Local id of the parent record (the provider account for top-level kinds)
    pub parent_id: String,

    #[serde(default)]
    pub vendor: Vendor,

    #[serde(default)]
    pub owner: Option<Owner>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl ResourceMeta {
    /// Metadata for a record discovered remotely within `scope`.
    ///
    /// The name is left empty; the orchestrator assigns a unique one under
    /// the class lock.
    pub fn discovered(scope: &Scope, remote: &RemoteMeta) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            external_id: remote.global_id.clone(),
            name: String::new(),
            status: remote.status.clone(),
            manager_id: scope.manager_id.clone(),
            parent_id: scope.parent_id.clone(),
            vendor: scope.vendor,
            owner: None,
            created_at: remote.created_at.unwrap_or(now),
            updated_at: now,
        }
    }

    /// Key used for name uniqueness: records are unique by name per owner project.
    pub fn owner_key(&self) -> String {
        match &self.owner {
            Some(owner) if !owner.project_id.is_empty() => owner.project_id.clone(),
            _ => self.manager_id.clone(),
        }
    }
}

/// A record held by the local store.
pub trait Record: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    fn meta(&self) -> &ResourceMeta;
    fn meta_mut(&mut self) -> &mut ResourceMeta;

    fn id(&self) -> &str {
        &self.meta().id
    }

    fn external_id(&self) -> &str {
        &self.meta().external_id
    }

    fn name(&self) -> &str {
        &self.meta().name
    }

    fn status(&self) -> &str {
        &self.meta().status
    }
}

/// Provider-reported fields shared by every remote projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteMeta {
    #[serde(default)]
    pub global_id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub status: String,

    /// Provider-side project the resource belongs to, if any
    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteMeta {
    pub fn new(global_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            global_id: global_id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Read-only projection of provider state for one pass.
pub trait RemoteRecord: Send + Sync + 'static {
    fn remote_meta(&self) -> &RemoteMeta;

    fn global_id(&self) -> &str {
        &self.remote_meta().global_id
    }

    fn name(&self) -> &str {
        &self.remote_meta().name
    }

    fn status(&self) -> &str {
        &self.remote_meta().status
    }
}
