//! Provider accounts

use cloudsync::{Owner, Scope, Vendor};
use serde::{Deserialize, Serialize};

/// A cloud account the inventory is synchronised from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAccount {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub vendor: Vendor,
    /// Project owning resources no mapping rule claims
    #[serde(default)]
    pub owner: Option<Owner>,
}

impl ProviderAccount {
    pub fn new(id: impl Into<String>, name: impl Into<String>, vendor: Vendor) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            vendor,
            owner: None,
        }
    }

    pub fn with_owner(mut self, owner: Owner) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Scope of the account's top-level records (regions)
    pub fn scope(&self) -> Scope {
        let scope = Scope::new(self.id.clone(), self.id.clone(), self.vendor);
        match &self.owner {
            Some(owner) => scope.with_owner(owner.clone()),
            None => scope,
        }
    }
}
