//! Fixtures shared by the engine's unit tests

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::event::RecordingEventSink;
use crate::key::SyncKey;
use crate::kind::{Deletable, FieldMapper, ResourceKind};
use crate::model::{Record, RemoteMeta, RemoteRecord, ResourceMeta};
use crate::scope::Scope;
use crate::services::{SyncOptions, SyncServices};
use crate::task::TaskRequest;
use crate::vendor::Vendor;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    #[serde(flatten)]
    pub meta: ResourceMeta,
    pub size: u32,
}

impl Record for Widget {
    fn meta(&self) -> &ResourceMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut ResourceMeta {
        &mut self.meta
    }
}

impl SyncKey for Widget {
    fn sync_key(&self, _scope: &Scope) -> String {
        self.meta.external_id.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteWidget {
    #[serde(flatten)]
    pub meta: RemoteMeta,
    pub size: u32,
    #[serde(default)]
    pub parts: Vec<RemoteWidget>,
}

impl RemoteRecord for RemoteWidget {
    fn remote_meta(&self) -> &RemoteMeta {
        &self.meta
    }
}

impl SyncKey for RemoteWidget {
    fn sync_key(&self, _scope: &Scope) -> String {
        self.meta.global_id.clone()
    }
}

pub fn remote(ext_id: &str, name: &str) -> RemoteWidget {
    RemoteWidget {
        meta: RemoteMeta::new(ext_id, name).with_status("ready"),
        size: 1,
        parts: Vec::new(),
    }
}

pub fn local(scope: &Scope, id: &str, ext_id: &str, name: &str) -> Widget {
    let mut meta = ResourceMeta::discovered(scope, &RemoteMeta::new(ext_id, name).with_status("ready"));
    meta.id = id.to_string();
    meta.name = name.to_string();
    Widget { meta, size: 1 }
}

pub fn scope() -> Scope {
    Scope::new("acc", "region-1", Vendor::Generic)
}

/// Widget kind whose delete constraints and hooks are driven by the test
#[derive(Debug, Default)]
pub struct WidgetKind {
    pub keyword: &'static str,
    /// Local ids whose deletion is blocked by dependents
    pub pinned: Mutex<HashSet<String>>,
    /// Local ids purged before deletion
    pub purged: Mutex<Vec<String>>,
    pub follow_up: bool,
}

impl WidgetKind {
    pub fn new(keyword: &'static str) -> Self {
        Self {
            keyword,
            ..Default::default()
        }
    }

    pub fn pin(&self, id: &str) {
        self.pinned.lock().insert(id.to_string());
    }

    pub fn unpin(&self, id: &str) {
        self.pinned.lock().remove(id);
    }
}

impl ResourceKind for WidgetKind {
    type Local = Widget;
    type Remote = RemoteWidget;

    fn keyword(&self) -> &'static str {
        self.keyword
    }
}

#[async_trait]
impl FieldMapper for WidgetKind {
    fn new_local(&self, scope: &Scope, remote: &RemoteWidget) -> Result<Widget> {
        Ok(Widget {
            meta: ResourceMeta::discovered(scope, &remote.meta),
            size: remote.size,
        })
    }

    fn map_fields(&self, local: &mut Widget, remote: &RemoteWidget) {
        local.size = remote.size;
    }

    fn follow_up(&self, local: &Widget, created: bool) -> Option<TaskRequest> {
        (self.follow_up && created).then(|| TaskRequest::new("WidgetSyncTask", self.keyword, local.id()))
    }
}

#[async_trait]
impl Deletable for WidgetKind {
    async fn validate_delete(&self, _ctx: &SyncContext, local: &Widget) -> Result<()> {
        if self.pinned.lock().contains(local.id()) {
            return Err(SyncError::ConstraintViolation(format!(
                "widget {} has dependents",
                local.id()
            )));
        }
        Ok(())
    }

    async fn purge_children(&self, _ctx: &SyncContext, local: &Widget) -> Result<()> {
        self.purged.lock().push(local.id().to_string());
        Ok(())
    }
}

pub fn services(events: Arc<RecordingEventSink>) -> SyncServices {
    SyncServices::new(SyncOptions::default()).with_events(events)
}
