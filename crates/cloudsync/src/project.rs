//! Ownership/project assignment

use crate::error::Result;
use crate::model::{Owner, RemoteMeta};
use crate::scope::Scope;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Decides which project owns a record discovered remotely.
///
/// `None` leaves the decision to the orchestrator, which falls back to the
/// scope owner.
pub trait ProjectSync: Send + Sync {
    fn resolve_owner(&self, scope: &Scope, remote: &RemoteMeta) -> Result<Option<Owner>>;
}

/// Assign `owner` to resources carrying every tag in `tags`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRule {
    pub tags: BTreeMap<String, String>,
    pub owner: Owner,
}

impl ProjectRule {
    fn matches(&self, remote: &RemoteMeta) -> bool {
        !self.tags.is_empty()
            && self
                .tags
                .iter()
                .all(|(k, v)| remote.tags.get(k).is_some_and(|actual| actual == v))
    }
}

/// Tag rules first, then the provider project table.
#[derive(Debug, Clone, Default)]
pub struct ProjectMapper {
    rules: Vec<ProjectRule>,
    // provider project id -> local owner
    external_projects: HashMap<String, Owner>,
}

impl ProjectMapper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, rule: ProjectRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn with_external_project(mut self, external_id: impl Into<String>, owner: Owner) -> Self {
        self.external_projects.insert(external_id.into(), owner);
        self
    }
}

impl ProjectSync for ProjectMapper {
    fn resolve_owner(&self, _scope: &Scope, remote: &RemoteMeta) -> Result<Option<Owner>> {
        if let Some(rule) = self.rules.iter().find(|r| r.matches(remote)) {
            return Ok(Some(rule.owner.clone()));
        }

        Ok(remote
            .project_id
            .as_ref()
            .and_then(|id| self.external_projects.get(id))
            .cloned())
    }
}
