//! Load balancer backend groups

use super::backend::{Backend, RemoteBackend};
use super::listener::Listener;
use super::rule::ListenerRule;
use super::Loadbalancer;
use crate::macros::{impl_record, impl_remote_record};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, Record, RemoteMeta, ResourceKind, ResourceMeta, Result,
    Scope, SyncContext, SyncError, SyncKey, SyncServices, global_or_composite,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "loadbalancerbackendgroup";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendGroup {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub group_type: String,
    #[serde(default)]
    pub is_default: bool,
    /// Provider id of the listener a synthetic group belongs to
    #[serde(default)]
    pub listener_ext_id: String,
    #[serde(default)]
    pub rule_ext_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteBackendGroup {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub group_type: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub listener_id: String,
    #[serde(default)]
    pub rule_id: String,
    #[serde(default)]
    pub backends: Vec<RemoteBackend>,
}

impl_record!(BackendGroup);
impl_remote_record!(RemoteBackendGroup);

impl SyncKey for BackendGroup {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(
            &self.meta.external_id,
            &scope.parent_id,
            [&self.listener_ext_id, &self.rule_ext_id],
        )
    }
}

impl SyncKey for RemoteBackendGroup {
    fn sync_key(&self, scope: &Scope) -> String {
        global_or_composite(
            &self.meta.global_id,
            &scope.parent_id,
            [&self.listener_id, &self.rule_id],
        )
    }
}

/// Group a listener or rule forwards to, among the groups of its load balancer.
///
/// Groups without a provider id are matched on the listener/rule they were
/// synthesised for.
pub(crate) fn resolve_group<'a>(
    groups: &'a [BackendGroup],
    group_ext_id: &str,
    listener_ext_id: &str,
    rule_ext_id: &str,
) -> Option<&'a BackendGroup> {
    if group_ext_id.is_empty() {
        groups.iter().find(|g| {
            g.meta.external_id.is_empty()
                && !listener_ext_id.is_empty()
                && g.listener_ext_id == listener_ext_id
                && g.rule_ext_id == rule_ext_id
        })
    } else {
        groups.iter().find(|g| g.meta.external_id == group_ext_id)
    }
}

pub struct BackendGroupKind {
    loadbalancers: Arc<dyn LocalStore<Loadbalancer>>,
    listeners: Arc<dyn LocalStore<Listener>>,
    rules: Arc<dyn LocalStore<ListenerRule>>,
    backends: Arc<dyn LocalStore<Backend>>,
    services: SyncServices,
}

impl BackendGroupKind {
    pub fn new(
        loadbalancers: Arc<dyn LocalStore<Loadbalancer>>,
        listeners: Arc<dyn LocalStore<Listener>>,
        rules: Arc<dyn LocalStore<ListenerRule>>,
        backends: Arc<dyn LocalStore<Backend>>,
        services: SyncServices,
    ) -> Self {
        Self {
            loadbalancers,
            listeners,
            rules,
            backends,
            services,
        }
    }
}

impl ResourceKind for BackendGroupKind {
    type Local = BackendGroup;
    type Remote = RemoteBackendGroup;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for BackendGroupKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteBackendGroup) -> Result<BackendGroup> {
        let mut group = BackendGroup {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            group_type: String::new(),
            is_default: false,
            listener_ext_id: remote.listener_id.clone(),
            rule_ext_id: remote.rule_id.clone(),
        };
        self.map_fields(&mut group, remote);
        Ok(group)
    }

    fn map_fields(&self, local: &mut BackendGroup, remote: &RemoteBackendGroup) {
        local.group_type = remote.group_type.clone();
        local.is_default = remote.is_default;
    }

    /// The default group is recorded on its load balancer.
    async fn after_sync(
        &self,
        ctx: &SyncContext,
        local: &BackendGroup,
        _remote: &RemoteBackendGroup,
    ) -> Result<bool> {
        if !local.is_default {
            return Ok(false);
        }

        let lb = self.loadbalancers.fetch_by_id(&local.meta.parent_id).await?;
        if lb.backend_group_id == local.id() {
            return Ok(false);
        }

        let group_id = local.id().to_string();
        let changed = self
            .services
            .update_record(
                ctx,
                super::KEYWORD,
                self.loadbalancers.as_ref(),
                &lb,
                Box::new(move |lb: &mut Loadbalancer| lb.backend_group_id = group_id),
            )
            .await?;
        tracing::debug!(loadbalancer = %lb.id(), group = %local.id(), "Default backend group changed");
        Ok(changed)
    }
}

#[async_trait]
impl Deletable for BackendGroupKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &BackendGroup) -> Result<()> {
        let lb = match self.loadbalancers.fetch_by_id(&local.meta.parent_id).await {
            Ok(lb) => Some(lb),
            Err(SyncError::NotFound(_)) => None,
            Err(err) => return Err(err),
        };
        // only the load balancer says which group is its default
        if lb.is_some_and(|lb| lb.backend_group_id == local.id()) {
            return Err(SyncError::ConstraintViolation(format!(
                "backend group {} is the default group of its load balancer",
                local.meta.name
            )));
        }

        for listener in self.listeners.query(&Scope::containing(&local.meta)).await? {
            if listener.backend_group_id == local.id() {
                return Err(SyncError::ConstraintViolation(format!(
                    "backend group {} is used by listener {}",
                    local.meta.name, listener.meta.name
                )));
            }
            let rules = self.rules.query(&Scope::child_of(&listener.meta)).await?;
            if let Some(rule) = rules.iter().find(|r| r.backend_group_id == local.id()) {
                return Err(SyncError::ConstraintViolation(format!(
                    "backend group {} is used by rule {}",
                    local.meta.name, rule.meta.name
                )));
            }
        }
        Ok(())
    }

    async fn purge_children(&self, _ctx: &SyncContext, local: &BackendGroup) -> Result<()> {
        for backend in self.backends.query(&Scope::child_of(&local.meta)).await? {
            self.backends.delete(&backend).await?;
        }
        Ok(())
    }
}
