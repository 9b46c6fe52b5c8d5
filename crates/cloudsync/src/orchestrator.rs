//! Sync orchestrator
//!
//! Drives one reconciliation pass for a resource kind:
//!
//! 1. take the scope lock and load the local set
//! 2. partition local and remote records with [`compare_sets`]
//! 3. delete (or flag) removed records, update matched ones, create added ones
//! 4. cascade into child kinds, one parent at a time under its object lock
//!
//! Item failures are counted in the [`SyncResult`] and never stop the pass.

use crate::cascade::Cascade;
use crate::compare::compare_sets;
use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use crate::kind::{Deletable, FieldMapper};
use crate::model::{Owner, Record, RemoteRecord};
use crate::remote::RemoteLister;
use crate::result::SyncResult;
use crate::scope::Scope;
use crate::services::SyncServices;
use crate::store::LocalStore;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

type Pair<K> = (<K as crate::kind::ResourceKind>::Local, <K as crate::kind::ResourceKind>::Remote);

/// Result of a pass before cascading, with the records that may cascade
pub struct SyncOutcome<K: FieldMapper> {
    pub result: SyncResult,
    /// Created or updated records with their remote counterparts
    pub synced: Vec<Pair<K>>,
}

impl<K: FieldMapper> SyncOutcome<K> {
    fn failed(err: SyncError) -> Self {
        Self {
            result: SyncResult::failed(err),
            synced: Vec::new(),
        }
    }
}

pub struct SyncOrchestrator<K: FieldMapper + Deletable> {
    kind: Arc<K>,
    store: Arc<dyn LocalStore<K::Local>>,
    services: SyncServices,
    children: Vec<Arc<dyn Cascade<K>>>,
}

impl<K: FieldMapper + Deletable> SyncOrchestrator<K> {
    pub fn new(kind: Arc<K>, store: Arc<dyn LocalStore<K::Local>>, services: SyncServices) -> Self {
        Self {
            kind,
            store,
            services,
            children: Vec::new(),
        }
    }

    /// Cascade into `child` after each created or updated record.
    ///
    /// Children run in registration order.
    pub fn with_child(mut self, child: Arc<dyn Cascade<K>>) -> Self {
        self.children.push(child);
        self
    }

    pub fn keyword(&self) -> &'static str {
        self.kind.keyword()
    }

    pub fn kind(&self) -> &Arc<K> {
        &self.kind
    }

    pub fn store(&self) -> &Arc<dyn LocalStore<K::Local>> {
        &self.store
    }

    pub fn services(&self) -> &SyncServices {
        &self.services
    }

    pub fn child_keywords(&self) -> Vec<&'static str> {
        self.children.iter().map(|c| c.child_keyword()).collect()
    }

    /// Reconcile `scope` against `remotes`, then cascade.
    pub async fn sync(&self, ctx: &SyncContext, scope: &Scope, remotes: Vec<K::Remote>) -> SyncResult {
        let outcome = self.sync_pass(ctx, scope, remotes).await;
        let mut result = outcome.result;
        result.merge(self.cascade(ctx, &outcome.synced).await);
        result
    }

    /// List remote state through `lister`, then [`sync`](Self::sync).
    ///
    /// A listing failure aborts the pass for this scope only.
    pub async fn refresh(
        &self,
        ctx: &SyncContext,
        scope: &Scope,
        lister: &dyn RemoteLister<K::Remote>,
    ) -> SyncResult {
        let keyword = self.keyword();
        let started = Instant::now();
        let listed = lister.list(scope).await;
        ctx.record_request_cost(keyword, started.elapsed());

        match listed {
            Ok(remotes) => self.sync(ctx, scope, remotes).await,
            Err(err) => {
                let err = match err {
                    err @ SyncError::ListingFailure { .. } => err,
                    other => SyncError::listing(scope.key(), other),
                };
                tracing::error!(keyword, scope = %scope.key(), error = %err, "Remote listing failed");
                let result = SyncResult::failed(err);
                ctx.record(keyword, result.clone());
                result
            }
        }
    }

    /// One pass without cascading; the result is recorded in `ctx`.
    pub async fn sync_pass(
        &self,
        ctx: &SyncContext,
        scope: &Scope,
        remotes: Vec<K::Remote>,
    ) -> SyncOutcome<K> {
        let keyword = self.keyword();
        let span = tracing::info_span!("sync", keyword, scope = %scope.key());

        async move {
            let started = Instant::now();
            let outcome = self.reconcile(ctx, scope, remotes).await;
            ctx.record_store_cost(keyword, started.elapsed());
            ctx.record(keyword, outcome.result.clone());

            if outcome.result.is_failed() {
                tracing::error!(result = %outcome.result, "Sync pass failed");
            } else if outcome.result.is_error() {
                tracing::warn!(result = %outcome.result, "Sync pass finished with errors");
            } else {
                tracing::info!(result = %outcome.result, "Sync pass finished");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn reconcile(
        &self,
        ctx: &SyncContext,
        scope: &Scope,
        remotes: Vec<K::Remote>,
    ) -> SyncOutcome<K> {
        let keyword = self.keyword();

        let _scope_lock = match self
            .services
            .locks
            .lock_raw_object(ctx, keyword, &scope.key())
            .await
        {
            Ok(guard) => guard,
            Err(err) => return SyncOutcome::failed(err),
        };

        let locals = match self.store.query(scope).await {
            Ok(locals) => locals,
            Err(err) => return SyncOutcome::failed(err),
        };

        if let Some(busy) = locals
            .iter()
            .find(|l| self.services.tasks.is_in_task(keyword, l.id()))
        {
            return SyncOutcome::failed(SyncError::InTask {
                keyword: keyword.to_string(),
                id: busy.id().to_string(),
            });
        }

        let partition = compare_sets(scope, locals, remotes);
        tracing::debug!(
            removed = partition.removed.len(),
            matched = partition.matched.len(),
            added = partition.added.len(),
            conflicts = partition.conflicts.len(),
            "Compared local and remote sets"
        );

        let mut result = SyncResult::new();
        let mut synced = Vec::new();

        for conflict in &partition.conflicts {
            let err = SyncError::DuplicateKey {
                key: conflict.key.clone(),
                count: conflict.remotes.len(),
            };
            tracing::warn!(error = %err, "Provider reported a duplicate key");
            for _ in &conflict.remotes {
                if conflict.locals.is_empty() {
                    result.add_error(err.clone());
                } else {
                    result.update_error(err.clone());
                }
            }
        }

        for local in &partition.removed {
            self.remove_one(ctx, local, &mut result).await;
        }

        if self.services.options.xor {
            tracing::debug!(skipped = partition.matched.len(), "Xor pass, matched records left as is");
        } else {
            for (local, remote) in partition.matched {
                match self.update_one(ctx, scope, &local, &remote).await {
                    Ok((updated, changed)) => {
                        let linked = match self.kind.after_sync(ctx, &updated, &remote).await {
                            Ok(linked) => linked,
                            Err(err) => {
                                tracing::warn!(id = %updated.id(), error = %err, "Post-update hook failed");
                                result.update_error(err);
                                false
                            }
                        };
                        // one count per record and pass
                        if changed || linked {
                            result.update();
                        }
                        synced.push((updated, remote));
                    }
                    Err(err) => {
                        tracing::warn!(id = %local.id(), error = %err, "Update failed");
                        result.update_error(err);
                    }
                }
            }
        }

        for remote in partition.added {
            match self.create_one(ctx, scope, &remote).await {
                Ok(created) => {
                    result.add();
                    if let Err(err) = self.kind.after_sync(ctx, &created, &remote).await {
                        tracing::warn!(id = %created.id(), error = %err, "Post-create hook failed");
                        result.update_error(err);
                    }
                    synced.push((created, remote));
                }
                Err(err) => {
                    tracing::warn!(external_id = %remote.global_id(), name = %remote.name(), error = %err, "Create failed");
                    result.add_error(err);
                }
            }
        }

        SyncOutcome { result, synced }
    }

    async fn remove_one(&self, ctx: &SyncContext, local: &K::Local, result: &mut SyncResult) {
        let keyword = self.keyword();
        let _lock = match self.services.locks.lock_object(ctx, keyword, local.id()).await {
            Ok(guard) => guard,
            Err(err) => {
                result.delete_error(err);
                return;
            }
        };

        match self.kind.validate_delete(ctx, local).await {
            Ok(()) => match self.delete_one(ctx, local).await {
                Ok(()) => {
                    self.services.events.deleted(keyword, local.meta());
                    result.delete();
                }
                Err(SyncError::NotFound(_)) => {
                    tracing::debug!(id = %local.id(), "Already deleted");
                }
                Err(err) => {
                    tracing::warn!(id = %local.id(), error = %err, "Delete failed");
                    result.delete_error(err);
                }
            },
            Err(SyncError::ConstraintViolation(reason)) => {
                self.flag_one(local, &reason, result).await;
            }
            Err(err) => {
                tracing::warn!(id = %local.id(), error = %err, "Delete check failed");
                result.delete_error(err);
            }
        }
    }

    async fn delete_one(&self, ctx: &SyncContext, local: &K::Local) -> Result<()> {
        self.kind.purge_children(ctx, local).await?;
        self.store.delete(local).await
    }

    /// Mark a record that cannot be deleted yet; counted on transition only
    async fn flag_one(&self, local: &K::Local, reason: &str, result: &mut SyncResult) {
        let status = self.services.options.unknown_status.clone();
        if local.status() == status {
            return;
        }

        let updated = self
            .store
            .update_with_lock(
                local,
                Box::new(move |record: &mut K::Local| record.meta_mut().status = status),
            )
            .await;

        match updated {
            Ok((record, diff)) if !diff.is_empty() => {
                self.services.events.flagged(self.keyword(), record.meta(), reason);
                result.flag();
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(id = %local.id(), error = %err, "Flagging failed");
                result.delete_error(err);
            }
        }
    }

    async fn update_one(
        &self,
        ctx: &SyncContext,
        scope: &Scope,
        local: &K::Local,
        remote: &K::Remote,
    ) -> Result<(K::Local, bool)> {
        let keyword = self.keyword();
        let _lock = self.services.locks.lock_object(ctx, keyword, local.id()).await?;

        let owner = match local.meta().owner {
            Some(_) => None,
            None => self.resolve_owner(scope, remote)?,
        };

        let mut owned = local.meta().clone();
        if owner.is_some() {
            owned.owner = owner.clone();
        }
        let owner_key = owned.owner_key();

        let rename = self.services.options.enable_sync_name
            && !remote.name().is_empty()
            && !is_generated_from(local.name(), remote.name());
        let (_class_lock, name) = if rename {
            let guard = self.services.locks.lock_class(ctx, keyword, &owner_key).await?;
            let name = self.generate_name(&owner_key, remote.name()).await?;
            (Some(guard), Some(name))
        } else {
            (None, None)
        };

        let kind = &self.kind;
        let (updated, diff) = self
            .store
            .update_with_lock(
                local,
                Box::new(move |record: &mut K::Local| {
                    let meta = record.meta_mut();
                    if !remote.status().is_empty() {
                        meta.status = remote.status().to_string();
                    }
                    if let Some(owner) = owner {
                        meta.owner = Some(owner);
                    }
                    if let Some(name) = name {
                        meta.name = name;
                    }
                    kind.map_fields(record, remote);
                }),
            )
            .await?;

        let changed = !diff.is_empty();
        if changed {
            self.services.events.updated(keyword, updated.meta(), &diff);
            self.trigger_follow_up(&updated, false);
        }
        Ok((updated, changed))
    }

    async fn create_one(
        &self,
        ctx: &SyncContext,
        scope: &Scope,
        remote: &K::Remote,
    ) -> Result<K::Local> {
        let keyword = self.keyword();
        let mut local = self.kind.new_local(scope, remote)?;
        local.meta_mut().owner = self
            .resolve_owner(scope, remote)?
            .or_else(|| scope.owner.clone());
        let owner_key = local.meta().owner_key();

        {
            let _class_lock = self.services.locks.lock_class(ctx, keyword, &owner_key).await?;
            let name = self.generate_name(&owner_key, remote.name()).await?;
            local.meta_mut().name = name;

            match self.store.insert(&local).await {
                Ok(()) => {}
                Err(SyncError::DuplicateEntry(reason)) => {
                    let retry = format!("{}-{}", local.name(), random_suffix());
                    tracing::debug!(%reason, name = %retry, "Insert collided, retrying with a new name");
                    local.meta_mut().name = retry;
                    self.store.insert(&local).await?;
                }
                Err(err) => return Err(err),
            }
        }

        self.services.events.created(keyword, local.meta());
        self.trigger_follow_up(&local, true);
        Ok(local)
    }

    fn resolve_owner(&self, scope: &Scope, remote: &K::Remote) -> Result<Option<Owner>> {
        self.services
            .projects
            .resolve_owner(scope, remote.remote_meta())
    }

    /// First free name of `base`, `base-1`, `base-2`, ... for the owner.
    ///
    /// Must run under the class lock of `owner_key`.
    async fn generate_name(&self, owner_key: &str, base: &str) -> Result<String> {
        let base = if base.is_empty() { self.keyword() } else { base };
        if !self.store.name_exists(owner_key, base).await? {
            return Ok(base.to_string());
        }

        let mut n = 1usize;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.store.name_exists(owner_key, &candidate).await? {
                return Ok(candidate);
            }
            n += 1;
        }
    }

    fn trigger_follow_up(&self, local: &K::Local, created: bool) {
        if let Some(request) = self.kind.follow_up(local, created) {
            let name = request.name.clone();
            if let Err(err) = self.services.tasks.trigger(request) {
                tracing::warn!(task = %name, id = %local.id(), error = %err, "Failed to enqueue follow-up task");
            }
        }
    }

    async fn cascade(&self, ctx: &SyncContext, synced: &[Pair<K>]) -> SyncResult {
        let mut result = SyncResult::new();
        if self.children.is_empty() {
            return result;
        }

        let keyword = self.keyword();
        for (local, remote) in synced {
            let _lock = match self.services.locks.lock_object(ctx, keyword, local.id()).await {
                Ok(guard) => guard,
                Err(err) => {
                    result.error(err);
                    continue;
                }
            };

            // The parent may have been removed since the pass released its records
            let parent = match self.store.fetch_by_id(local.id()).await {
                Ok(parent) => parent,
                Err(SyncError::NotFound(_)) => {
                    tracing::debug!(keyword, id = %local.id(), "Parent gone, skipping cascade");
                    continue;
                }
                Err(err) => {
                    result.error(err);
                    continue;
                }
            };

            for child in &self.children {
                result.merge(child.cascade(ctx, &parent, remote).await);
            }
        }
        result
    }
}

/// Whether `name` is `base` or an alternate generated from it (`base-N`)
fn is_generated_from(name: &str, base: &str) -> bool {
    match name.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

fn random_suffix() -> String {
    uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{RecordingEventSink, SyncEvent};
    use crate::lock::MemoryLockManager;
    use crate::model::Owner;
    use crate::project::ProjectMapper;
    use crate::remote::StaticLister;
    use crate::services::SyncOptions;
    use crate::store::MemoryStore;
    use crate::task::QueuedTasks;
    use crate::testing::*;

    struct Fixture {
        kind: Arc<WidgetKind>,
        store: Arc<MemoryStore<Widget>>,
        events: Arc<RecordingEventSink>,
        orchestrator: SyncOrchestrator<WidgetKind>,
    }

    fn fixture_with(services: SyncServices, locals: Vec<Widget>) -> Fixture {
        let kind = Arc::new(WidgetKind::new("widget"));
        let store = Arc::new(MemoryStore::load(locals).unwrap());
        let events = Arc::new(RecordingEventSink::new());
        let services = services.with_events(events.clone());
        let orchestrator = SyncOrchestrator::new(kind.clone(), store.clone(), services);
        Fixture {
            kind,
            store,
            events,
            orchestrator,
        }
    }

    fn fixture(locals: Vec<Widget>) -> Fixture {
        fixture_with(SyncServices::default(), locals)
    }

    fn example_locals() -> Vec<Widget> {
        vec![
            local(&scope(), "A", "x1", "alpha"),
            local(&scope(), "B", "x2", "beta"),
        ]
    }

    fn example_remotes() -> Vec<RemoteWidget> {
        vec![remote("x2", "renamed"), remote("x3", "new")]
    }

    #[tokio::test]
    async fn test_example_scenario() {
        let f = fixture(example_locals());
        let ctx = SyncContext::new("test");

        let result = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert_eq!((result.deleted, result.updated, result.added), (1, 1, 1));
        assert!(!result.is_error());

        let records = f.store.snapshot();
        assert_eq!(records.len(), 2);
        assert!(f.store.fetch_by_id("A").await.is_err());
        assert_eq!(f.store.fetch_by_id("B").await.unwrap().name(), "renamed");

        let created = f.store.fetch_by_external_id("acc", "x3").await.unwrap();
        assert_eq!(created.name(), "new");
        assert_eq!(created.meta.parent_id, "region-1");
        assert_eq!(created.status(), "ready");
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let f = fixture(example_locals());
        let ctx = SyncContext::new("test");

        f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        let after_first = f.store.snapshot();

        let second = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert!(second.is_noop(), "second pass: {}", second);
        assert_eq!(f.store.snapshot(), after_first);
    }

    #[tokio::test]
    async fn test_constrained_record_is_flagged_then_deleted() {
        let f = fixture(example_locals());
        f.kind.pin("A");
        let ctx = SyncContext::new("test");

        let first = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert_eq!(first.deleted, 0);
        assert_eq!(first.flagged, 1);
        assert_eq!(f.store.fetch_by_id("A").await.unwrap().status(), "unknown");

        // still blocked: no new transition
        let second = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert!(second.is_noop());

        f.kind.unpin("A");
        let third = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert_eq!(third.deleted, 1);
        assert!(f.store.fetch_by_id("A").await.is_err());
        assert_eq!(*f.kind.purged.lock(), vec!["A".to_string()]);

        let flagged = f
            .events
            .events()
            .into_iter()
            .filter(|e| matches!(e, SyncEvent::Flagged { .. }))
            .count();
        assert_eq!(flagged, 1);
    }

    #[tokio::test]
    async fn test_flagged_record_recovers_when_it_reappears() {
        let f = fixture(example_locals());
        f.kind.pin("A");
        let ctx = SyncContext::new("test");

        f.orchestrator.sync(&ctx, &scope(), vec![remote("x2", "beta")]).await;
        assert_eq!(f.store.fetch_by_id("A").await.unwrap().status(), "unknown");

        let result = f
            .orchestrator
            .sync(&ctx, &scope(), vec![remote("x1", "alpha"), remote("x2", "beta")])
            .await;
        assert_eq!(result.updated, 1);
        assert_eq!(f.store.fetch_by_id("A").await.unwrap().status(), "ready");
    }

    #[tokio::test]
    async fn test_insert_failure_is_isolated() {
        let f = fixture(example_locals());
        f.store
            .inject_insert_error("x3", SyncError::Transient("connection reset".into()), 1);
        let ctx = SyncContext::new("test");

        let remotes = vec![remote("x2", "renamed"), remote("x3", "new"), remote("x4", "other")];
        let result = f.orchestrator.sync(&ctx, &scope(), remotes).await;

        assert_eq!(result.add_errors, 1);
        assert_eq!(result.added, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(result.deleted, 1);
        assert!(result.is_error());
        assert!(!result.is_failed());
    }

    #[tokio::test]
    async fn test_duplicate_entry_retries_once_with_new_name() {
        let f = fixture(vec![]);
        f.store
            .inject_insert_error("x3", SyncError::DuplicateEntry("name new".into()), 1);
        let ctx = SyncContext::new("test");

        let result = f.orchestrator.sync(&ctx, &scope(), vec![remote("x3", "new")]).await;
        assert_eq!(result.added, 1);
        assert!(!result.is_error());

        let created = f.store.fetch_by_external_id("acc", "x3").await.unwrap();
        assert!(created.name().starts_with("new-"));
    }

    #[tokio::test]
    async fn test_persistent_duplicate_entry_is_add_error() {
        let f = fixture(vec![]);
        f.store
            .inject_insert_error("x3", SyncError::DuplicateEntry("name new".into()), 2);
        let ctx = SyncContext::new("test");

        let result = f.orchestrator.sync(&ctx, &scope(), vec![remote("x3", "new")]).await;
        assert_eq!(result.added, 0);
        assert_eq!(result.add_errors, 1);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_remote_key_is_reported() {
        let f = fixture(example_locals());
        let ctx = SyncContext::new("test");

        let remotes = vec![remote("x1", "a"), remote("x1", "b"), remote("x2", "beta")];
        let result = f.orchestrator.sync(&ctx, &scope(), remotes).await;

        assert_eq!(result.update_errors, 2);
        assert!(matches!(
            result.errors()[0],
            SyncError::DuplicateKey { count: 2, .. }
        ));
        // the conflicted local is kept as is
        assert_eq!(f.store.fetch_by_id("A").await.unwrap().name(), "alpha");
        assert_eq!(result.deleted, 0);
    }

    #[tokio::test]
    async fn test_name_generation_avoids_collisions() {
        let f = fixture(vec![local(&scope(), "A", "x1", "web")]);
        let ctx = SyncContext::new("test");

        let remotes = vec![remote("x1", "web"), remote("x2", "web"), remote("x3", "web")];
        let result = f.orchestrator.sync(&ctx, &scope(), remotes).await;
        assert_eq!(result.added, 2);

        let mut names: Vec<_> = f.store.snapshot().iter().map(|w| w.name().to_string()).collect();
        names.sort();
        assert_eq!(names, vec!["web", "web-1", "web-2"]);

        // alternates are stable across passes
        let remotes = vec![remote("x1", "web"), remote("x2", "web"), remote("x3", "web")];
        assert!(f.orchestrator.sync(&ctx, &scope(), remotes).await.is_noop());
    }

    #[tokio::test]
    async fn test_rename_disabled() {
        let services = SyncServices::new(SyncOptions {
            enable_sync_name: false,
            ..Default::default()
        });
        let f = fixture_with(services, example_locals());
        let ctx = SyncContext::new("test");

        f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert_eq!(f.store.fetch_by_id("B").await.unwrap().name(), "beta");
    }

    #[tokio::test]
    async fn test_xor_pass_skips_matched() {
        let services = SyncServices::new(SyncOptions {
            xor: true,
            ..Default::default()
        });
        let f = fixture_with(services, example_locals());
        let ctx = SyncContext::new("test");

        let mut changed = remote("x2", "renamed");
        changed.size = 9;
        let result = f.orchestrator.sync(&ctx, &scope(), vec![changed, remote("x3", "new")]).await;
        assert_eq!((result.deleted, result.updated, result.added), (1, 0, 1));
        assert_eq!(f.store.fetch_by_id("B").await.unwrap().size, 1);
    }

    #[tokio::test]
    async fn test_busy_record_aborts_pass() {
        let (tasks, _receiver) = QueuedTasks::new();
        tasks.mark_busy("widget", "B");
        let services = SyncServices::default().with_tasks(Arc::new(tasks));
        let f = fixture_with(services, example_locals());
        let ctx = SyncContext::new("test");

        let before = f.store.snapshot();
        let result = f.orchestrator.sync(&ctx, &scope(), example_remotes()).await;
        assert!(result.is_failed());
        assert!(matches!(result.first_error(), Some(SyncError::InTask { .. })));
        assert_eq!(f.store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts_pass() {
        let f = fixture(example_locals());
        let ctx = SyncContext::new("test");

        let lister = |_: &Scope| -> Result<Vec<RemoteWidget>> {
            Err(SyncError::Transient("timeout".into()))
        };
        let result = f.orchestrator.refresh(&ctx, &scope(), &lister).await;

        assert!(result.is_failed());
        assert!(matches!(
            result.first_error(),
            Some(SyncError::ListingFailure { .. })
        ));
        assert_eq!(f.store.len(), 2);
        assert!(ctx.results().get("widget").unwrap().result.is_failed());
    }

    #[tokio::test]
    async fn test_refresh_records_costs() {
        let f = fixture(example_locals());
        let ctx = SyncContext::new("test");

        let lister = StaticLister::new(example_remotes());
        let result = f.orchestrator.refresh(&ctx, &scope(), &lister).await;
        assert_eq!(result.added, 1);

        let results = ctx.results();
        let stats = results.get("widget").unwrap();
        assert_eq!(stats.passes, 1);
        assert_eq!(stats.result.added, 1);
    }

    #[tokio::test]
    async fn test_owner_propagation() {
        let projects = ProjectMapper::new()
            .with_external_project("ext-p", Owner::new("d1", "mapped"));
        let services = SyncServices::default().with_projects(Arc::new(projects));
        let f = fixture_with(services, example_locals());
        let scope = scope().with_owner(Owner::new("d1", "fallback"));
        let ctx = SyncContext::new("test");

        let mut mapped = remote("x3", "mapped-one");
        mapped.meta = mapped.meta.with_project("ext-p");
        let remotes = vec![remote("x2", "beta"), mapped, remote("x4", "plain")];
        f.orchestrator.sync(&ctx, &scope, remotes).await;

        let owner_of = |ext: &str| {
            f.store
                .find(|w| w.external_id() == ext)
                .and_then(|w| w.meta.owner)
                .map(|o| o.project_id)
        };
        assert_eq!(owner_of("x3").as_deref(), Some("mapped"));
        assert_eq!(owner_of("x4").as_deref(), Some("fallback"));
        // matched records without an owner get one from the mapping or stay unowned
        assert_eq!(owner_of("x2"), None);
    }

    #[tokio::test]
    async fn test_follow_up_task_on_create() {
        let (tasks, mut receiver) = QueuedTasks::new();
        let services = SyncServices::default().with_tasks(Arc::new(tasks));
        let mut f = fixture_with(services.clone(), vec![]);
        let kind = Arc::new(WidgetKind {
            follow_up: true,
            ..WidgetKind::new("widget")
        });
        f.orchestrator = SyncOrchestrator::new(kind, f.store.clone(), services);
        let ctx = SyncContext::new("test");

        f.orchestrator.sync(&ctx, &scope(), vec![remote("x3", "new")]).await;
        let request = receiver.try_recv().unwrap();
        assert_eq!(request.name, "WidgetSyncTask");
        assert!(receiver.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_passes_do_not_duplicate() {
        let locks = Arc::new(MemoryLockManager::new());
        let services = SyncServices::default().with_locks(locks);
        let f = Arc::new(fixture_with(services, vec![]));
        let ctx = SyncContext::new("test");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let f = Arc::clone(&f);
            let ctx = ctx.fork();
            handles.push(tokio::spawn(async move {
                f.orchestrator
                    .sync(&ctx, &scope(), vec![remote("x1", "web"), remote("x2", "web")])
                    .await
            }));
        }

        let mut added = 0;
        for handle in handles {
            let result = handle.await.unwrap();
            assert!(!result.is_error(), "{}", result);
            added += result.added;
        }
        assert_eq!(added, 2);
        assert_eq!(f.store.len(), 2);
    }

    #[test]
    fn test_is_generated_from() {
        assert!(is_generated_from("web", "web"));
        assert!(is_generated_from("web-12", "web"));
        assert!(!is_generated_from("web-", "web"));
        assert!(!is_generated_from("web-a", "web"));
        assert!(!is_generated_from("webapp", "web"));
        assert!(!is_generated_from("other", "web"));
    }
}
