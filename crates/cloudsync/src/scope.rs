//! Sync scopes

use crate::key::KEY_SEPARATOR;
use crate::model::{Owner, ResourceMeta};
use crate::vendor::Vendor;
use serde::{Deserialize, Serialize};

/// One reconciliation unit: a provider account plus the parent record whose
/// children are being synchronised.
///
/// Two passes for the same resource keyword and scope never run
/// concurrently; disjoint scopes may.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// Provider account id
    pub manager_id: String,

    /// Local id of the parent record
    pub parent_id: String,

    pub vendor: Vendor,

    /// Owner new records fall back to when no project mapping applies
    #[serde(default)]
    pub owner: Option<Owner>,
}

impl Scope {
    pub fn new(manager_id: impl Into<String>, parent_id: impl Into<String>, vendor: Vendor) -> Self {
        Self {
            manager_id: manager_id.into(),
            parent_id: parent_id.into(),
            vendor,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Scope of the children of `parent`
    pub fn child_of(parent: &ResourceMeta) -> Self {
        Self {
            manager_id: parent.manager_id.clone(),
            parent_id: parent.id.clone(),
            vendor: parent.vendor,
            owner: parent.owner.clone(),
        }
    }

    /// Scope `meta` itself belongs to, i.e. its siblings
    pub fn containing(meta: &ResourceMeta) -> Self {
        Self {
            manager_id: meta.manager_id.clone(),
            parent_id: meta.parent_id.clone(),
            vendor: meta.vendor,
            owner: None,
        }
    }

    /// Lock and log key
    pub fn key(&self) -> String {
        format!("{}{}{}", self.manager_id, KEY_SEPARATOR, self.parent_id)
    }

    /// Whether `meta` belongs to this scope
    pub fn contains(&self, meta: &ResourceMeta) -> bool {
        meta.manager_id == self.manager_id && meta.parent_id == self.parent_id
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.manager_id, self.parent_id)
    }
}
