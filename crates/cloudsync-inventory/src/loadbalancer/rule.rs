//! Listener forwarding rules

use super::backend::RemoteBackend;
use super::backend_group::{BackendGroup, resolve_group};
use super::listener::Listener;
use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, Record, RemoteMeta, ResourceKind, ResourceMeta, Result,
    Scope, SyncContext, SyncServices,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "loadbalancerlistenerrule";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerRule {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub backend_group_ext_id: String,
    #[serde(default)]
    pub backend_group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteListenerRule {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub backend_group_id: String,
    #[serde(default)]
    pub backends: Vec<RemoteBackend>,
}

impl_record!(ListenerRule);
impl_remote_record!(RemoteListenerRule);
impl_external_key!(ListenerRule, RemoteListenerRule);

pub struct ListenerRuleKind {
    rules: Arc<dyn LocalStore<ListenerRule>>,
    listeners: Arc<dyn LocalStore<Listener>>,
    backend_groups: Arc<dyn LocalStore<BackendGroup>>,
    services: SyncServices,
}

impl ListenerRuleKind {
    pub fn new(
        rules: Arc<dyn LocalStore<ListenerRule>>,
        listeners: Arc<dyn LocalStore<Listener>>,
        backend_groups: Arc<dyn LocalStore<BackendGroup>>,
        services: SyncServices,
    ) -> Self {
        Self {
            rules,
            listeners,
            backend_groups,
            services,
        }
    }
}

impl ResourceKind for ListenerRuleKind {
    type Local = ListenerRule;
    type Remote = RemoteListenerRule;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for ListenerRuleKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteListenerRule) -> Result<ListenerRule> {
        let mut rule = ListenerRule {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            domain: String::new(),
            path: String::new(),
            backend_group_ext_id: String::new(),
            backend_group_id: String::new(),
        };
        self.map_fields(&mut rule, remote);
        Ok(rule)
    }

    fn map_fields(&self, local: &mut ListenerRule, remote: &RemoteListenerRule) {
        local.domain = remote.domain.clone();
        local.path = remote.path.clone();
        local.backend_group_ext_id = remote.backend_group_id.clone();
    }

    async fn after_sync(
        &self,
        ctx: &SyncContext,
        local: &ListenerRule,
        _remote: &RemoteListenerRule,
    ) -> Result<bool> {
        let listener = self.listeners.fetch_by_id(&local.meta.parent_id).await?;
        let groups = self
            .backend_groups
            .query(&Scope::containing(&listener.meta))
            .await?;
        let wanted = resolve_group(
            &groups,
            &local.backend_group_ext_id,
            listener.external_id(),
            local.external_id(),
        )
        .map(|g| g.id().to_string())
        .unwrap_or_default();

        if local.backend_group_id == wanted {
            return Ok(false);
        }
        self.services
            .update_record(
                ctx,
                KEYWORD,
                self.rules.as_ref(),
                local,
                Box::new(move |r: &mut ListenerRule| r.backend_group_id = wanted),
            )
            .await
    }
}

impl Deletable for ListenerRuleKind {}
