//! Load balancers and their listener / backend group trees
//!
//! ```text
//! loadbalancer
//!  ├── loadbalancerbackendgroup ── loadbalancerbackend
//!  └── loadbalancerlistener ────── loadbalancerlistenerrule
//! ```
//!
//! Backend groups are synchronised before listeners so that listeners and
//! rules can resolve the group they forward to.

pub mod backend;
pub mod backend_group;
pub mod listener;
pub mod rule;
pub mod vendor;

use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use async_trait::async_trait;
use backend::Backend;
use backend_group::{BackendGroup, RemoteBackendGroup};
use cloudsync::{
    Deletable, FieldMapper, LocalStore, Record, RemoteMeta, ResourceKind, ResourceMeta, Result,
    Scope, SyncContext, TaskRequest,
};
use listener::{Listener, RemoteListener};
use rule::ListenerRule;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "loadbalancer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loadbalancer {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub network_type: String,
    /// Local id of the default backend group
    #[serde(default)]
    pub backend_group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteLoadbalancer {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub network_type: String,
    /// Provider id of the default backend group
    #[serde(default)]
    pub backend_group_id: String,
    #[serde(default)]
    pub listeners: Vec<RemoteListener>,
    /// Every backend group the provider reports for this load balancer
    #[serde(default)]
    pub backend_groups: Vec<RemoteBackendGroup>,
}

impl_record!(Loadbalancer);
impl_remote_record!(RemoteLoadbalancer);
impl_external_key!(Loadbalancer, RemoteLoadbalancer);

/// Child stores purged together with a vanished load balancer
#[derive(Clone)]
pub struct LoadbalancerChildren {
    pub listeners: Arc<dyn LocalStore<Listener>>,
    pub rules: Arc<dyn LocalStore<ListenerRule>>,
    pub backend_groups: Arc<dyn LocalStore<BackendGroup>>,
    pub backends: Arc<dyn LocalStore<Backend>>,
}

pub struct LoadbalancerKind {
    children: LoadbalancerChildren,
}

impl LoadbalancerKind {
    pub fn new(children: LoadbalancerChildren) -> Self {
        Self { children }
    }
}

impl ResourceKind for LoadbalancerKind {
    type Local = Loadbalancer;
    type Remote = RemoteLoadbalancer;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for LoadbalancerKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteLoadbalancer) -> Result<Loadbalancer> {
        let mut lb = Loadbalancer {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            address: String::new(),
            network_type: String::new(),
            backend_group_id: String::new(),
        };
        self.map_fields(&mut lb, remote);
        Ok(lb)
    }

    fn map_fields(&self, local: &mut Loadbalancer, remote: &RemoteLoadbalancer) {
        local.address = remote.address.clone();
        local.network_type = remote.network_type.clone();
        if remote.backend_group_id.is_empty() {
            local.backend_group_id.clear();
        }
    }

    fn follow_up(&self, local: &Loadbalancer, created: bool) -> Option<TaskRequest> {
        created.then(|| {
            TaskRequest::new("LoadbalancerSyncstatusTask", KEYWORD, local.id())
                .with_params(serde_json::json!({ "address": local.address }))
        })
    }
}

#[async_trait]
impl Deletable for LoadbalancerKind {
    /// Listeners, rules, backend groups and backends go with their load balancer.
    async fn purge_children(&self, _ctx: &SyncContext, local: &Loadbalancer) -> Result<()> {
        let scope = Scope::child_of(&local.meta);

        for listener in self.children.listeners.query(&scope).await? {
            let rule_scope = Scope::child_of(&listener.meta);
            for rule in self.children.rules.query(&rule_scope).await? {
                self.children.rules.delete(&rule).await?;
            }
            self.children.listeners.delete(&listener).await?;
        }

        for group in self.children.backend_groups.query(&scope).await? {
            let backend_scope = Scope::child_of(&group.meta);
            for backend in self.children.backends.query(&backend_scope).await? {
                self.children.backends.delete(&backend).await?;
            }
            self.children.backend_groups.delete(&group).await?;
        }

        tracing::debug!(id = %local.id(), "Purged load balancer children");
        Ok(())
    }
}
