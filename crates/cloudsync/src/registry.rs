//! Resource kind registry

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::kind::{Deletable, FieldMapper};
use crate::orchestrator::SyncOrchestrator;
use crate::remote::RemoteLister;
use crate::result::SyncResult;
use crate::scope::Scope;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// On-demand resync of one scope of a resource kind
#[async_trait]
pub trait ScopeSync: Send + Sync {
    fn keyword(&self) -> &'static str;

    async fn resync(&self, ctx: &SyncContext, scope: &Scope) -> SyncResult;
}

/// An orchestrator together with the lister of its remote collection
pub struct RegisteredSync<K: FieldMapper + Deletable> {
    orchestrator: Arc<SyncOrchestrator<K>>,
    lister: Arc<dyn RemoteLister<K::Remote>>,
    parent_keyword: Option<&'static str>,
}

impl<K: FieldMapper + Deletable> RegisteredSync<K> {
    pub fn new(orchestrator: Arc<SyncOrchestrator<K>>, lister: Arc<dyn RemoteLister<K::Remote>>) -> Self {
        Self {
            orchestrator,
            lister,
            parent_keyword: None,
        }
    }

    /// Child kind normally reached through a cascade from `keyword`.
    ///
    /// A direct resync then takes the parent's object lock first, the same
    /// lock the cascade runs under.
    pub fn under_parent(mut self, keyword: &'static str) -> Self {
        self.parent_keyword = Some(keyword);
        self
    }
}

#[async_trait]
impl<K: FieldMapper + Deletable> ScopeSync for RegisteredSync<K> {
    fn keyword(&self) -> &'static str {
        self.orchestrator.keyword()
    }

    async fn resync(&self, ctx: &SyncContext, scope: &Scope) -> SyncResult {
        let _parent_lock = match self.parent_keyword {
            Some(parent) => {
                let locks = &self.orchestrator.services().locks;
                match locks.lock_object(ctx, parent, &scope.parent_id).await {
                    Ok(guard) => Some(guard),
                    Err(err) => return SyncResult::failed(err),
                }
            }
            None => None,
        };

        self.orchestrator.refresh(ctx, scope, self.lister.as_ref()).await
    }
}

/// Resource kinds by keyword, built once at startup and passed around
#[derive(Default)]
pub struct SyncRegistry {
    entries: BTreeMap<&'static str, Arc<dyn ScopeSync>>,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sync: Arc<dyn ScopeSync>) -> Result<()> {
        let keyword = sync.keyword();
        if self.entries.contains_key(keyword) {
            return Err(SyncError::DuplicateEntry(format!("keyword {}", keyword)));
        }
        self.entries.insert(keyword, sync);
        Ok(())
    }

    pub fn get(&self, keyword: &str) -> Option<Arc<dyn ScopeSync>> {
        self.entries.get(keyword).cloned()
    }

    pub fn keywords(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub async fn resync(&self, ctx: &SyncContext, keyword: &str, scope: &Scope) -> Result<SyncResult> {
        let sync = self
            .get(keyword)
            .ok_or_else(|| SyncError::NotFound(format!("resource keyword {}", keyword)))?;
        Ok(sync.resync(ctx, scope).await)
    }
}

impl std::fmt::Debug for SyncRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRegistry")
            .field("keywords", &self.keywords())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordingEventSink;
    use crate::lock::{LockManager, MemoryLockManager};
    use crate::remote::StaticLister;
    use crate::store::MemoryStore;
    use crate::testing::*;
    use std::time::Duration;

    fn registered(keyword: &'static str, remotes: Vec<RemoteWidget>) -> RegisteredSync<WidgetKind> {
        let orchestrator = SyncOrchestrator::new(
            Arc::new(WidgetKind::new(keyword)),
            Arc::new(MemoryStore::new()),
            services(Arc::new(RecordingEventSink::new())),
        );
        RegisteredSync::new(Arc::new(orchestrator), Arc::new(StaticLister::new(remotes)))
    }

    #[tokio::test]
    async fn test_register_and_resync() {
        let mut registry = SyncRegistry::new();
        registry
            .register(Arc::new(registered("widget", vec![remote("x1", "a")])))
            .unwrap();
        registry.register(Arc::new(registered("part", vec![]))).unwrap();

        assert_eq!(registry.keywords(), vec!["part", "widget"]);

        let ctx = SyncContext::new("test");
        let result = registry.resync(&ctx, "widget", &scope()).await.unwrap();
        assert_eq!(result.added, 1);
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_keywords() {
        let mut registry = SyncRegistry::new();
        registry.register(Arc::new(registered("widget", vec![]))).unwrap();
        assert!(matches!(
            registry.register(Arc::new(registered("widget", vec![]))),
            Err(SyncError::DuplicateEntry(_))
        ));

        let ctx = SyncContext::new("test");
        assert!(matches!(
            registry.resync(&ctx, "nope", &scope()).await,
            Err(SyncError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_child_resync_waits_for_parent_lock() {
        let locks = Arc::new(MemoryLockManager::new().with_timeout(Duration::from_millis(50)));
        let services = services(Arc::new(RecordingEventSink::new())).with_locks(locks.clone());
        let orchestrator = SyncOrchestrator::new(
            Arc::new(WidgetKind::new("part")),
            Arc::new(MemoryStore::new()),
            services,
        );
        let sync = RegisteredSync::new(Arc::new(orchestrator), Arc::new(StaticLister::new(vec![])))
            .under_parent("widget");

        let ctx = SyncContext::new("test");
        let _held = locks
            .lock_object(&ctx.fork(), "widget", "region-1")
            .await
            .unwrap();

        let result = sync.resync(&ctx, &scope()).await;
        assert!(matches!(result.first_error(), Some(SyncError::Lock(_))));
    }
}
