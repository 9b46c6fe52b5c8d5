//! Load balancer listeners

use super::backend::RemoteBackend;
use super::backend_group::{BackendGroup, resolve_group};
use super::rule::RemoteListenerRule;
use crate::macros::{impl_external_key, impl_record, impl_remote_record};
use async_trait::async_trait;
use cloudsync::{
    Deletable, FieldMapper, LocalStore, Record, RemoteMeta, ResourceKind, ResourceMeta, Result,
    Scope, SyncContext, SyncServices,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const KEYWORD: &str = "loadbalancerlistener";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub port: u16,
    /// Provider id of the backend group traffic is forwarded to
    #[serde(default)]
    pub backend_group_ext_id: String,
    /// Local id of that backend group, empty while unresolved
    #[serde(default)]
    pub backend_group_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteListener {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub backend_group_id: String,
    #[serde(default)]
    pub rules: Vec<RemoteListenerRule>,
    /// Backends attached to the listener itself (no backend group on the provider side)
    #[serde(default)]
    pub backends: Vec<RemoteBackend>,
}

impl_record!(Listener);
impl_remote_record!(RemoteListener);
impl_external_key!(Listener, RemoteListener);

pub struct ListenerKind {
    listeners: Arc<dyn LocalStore<Listener>>,
    backend_groups: Arc<dyn LocalStore<BackendGroup>>,
    services: SyncServices,
}

impl ListenerKind {
    pub fn new(
        listeners: Arc<dyn LocalStore<Listener>>,
        backend_groups: Arc<dyn LocalStore<BackendGroup>>,
        services: SyncServices,
    ) -> Self {
        Self {
            listeners,
            backend_groups,
            services,
        }
    }
}

impl ResourceKind for ListenerKind {
    type Local = Listener;
    type Remote = RemoteListener;

    fn keyword(&self) -> &'static str {
        KEYWORD
    }
}

#[async_trait]
impl FieldMapper for ListenerKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteListener) -> Result<Listener> {
        let mut listener = Listener {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            protocol: String::new(),
            port: 0,
            backend_group_ext_id: String::new(),
            backend_group_id: String::new(),
        };
        self.map_fields(&mut listener, remote);
        Ok(listener)
    }

    fn map_fields(&self, local: &mut Listener, remote: &RemoteListener) {
        local.protocol = remote.protocol.clone();
        local.port = remote.port;
        local.backend_group_ext_id = remote.backend_group_id.clone();
    }

    /// Point the listener at the local backend group it forwards to.
    async fn after_sync(
        &self,
        ctx: &SyncContext,
        local: &Listener,
        _remote: &RemoteListener,
    ) -> Result<bool> {
        // listener and its groups share the load balancer as parent
        let groups = self
            .backend_groups
            .query(&Scope::containing(&local.meta))
            .await?;
        let wanted = resolve_group(&groups, &local.backend_group_ext_id, local.external_id(), "")
            .map(|g| g.id().to_string())
            .unwrap_or_default();

        if local.backend_group_id == wanted {
            return Ok(false);
        }
        self.services
            .update_record(
                ctx,
                KEYWORD,
                self.listeners.as_ref(),
                local,
                Box::new(move |l: &mut Listener| l.backend_group_id = wanted),
            )
            .await
    }
}

impl Deletable for ListenerKind {}
