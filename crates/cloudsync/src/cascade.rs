//! Parent/child cascades

use crate::context::SyncContext;
use crate::error::SyncError;
use crate::kind::{Deletable, FieldMapper, ResourceKind};
use crate::model::Record;
use crate::orchestrator::SyncOrchestrator;
use crate::remote::ChildLister;
use crate::result::SyncResult;
use crate::scope::Scope;
use crate::vendor::VendorTable;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// A child collection synchronised after its parent.
///
/// Called by the parent orchestrator while it holds the parent's object lock.
#[async_trait]
pub trait Cascade<P: ResourceKind>: Send + Sync {
    fn child_keyword(&self) -> &'static str;

    async fn cascade(&self, ctx: &SyncContext, parent: &P::Local, remote: &P::Remote) -> SyncResult;
}

type Lister<P, C> =
    Arc<dyn ChildLister<<P as ResourceKind>::Remote, <C as ResourceKind>::Remote>>;

/// Cascade into the child orchestrator, listing children from the parent's
/// remote handle through a per-vendor strategy.
pub struct ChildSync<P: ResourceKind, C: FieldMapper + Deletable> {
    orchestrator: Arc<SyncOrchestrator<C>>,
    listers: VendorTable<Lister<P, C>>,
}

impl<P: ResourceKind, C: FieldMapper + Deletable> ChildSync<P, C> {
    /// Same child listing for every vendor
    pub fn new(orchestrator: Arc<SyncOrchestrator<C>>, lister: Lister<P, C>) -> Self {
        Self::per_vendor(orchestrator, VendorTable::uniform(lister))
    }

    pub fn per_vendor(orchestrator: Arc<SyncOrchestrator<C>>, listers: VendorTable<Lister<P, C>>) -> Self {
        Self {
            orchestrator,
            listers,
        }
    }

    pub fn orchestrator(&self) -> &Arc<SyncOrchestrator<C>> {
        &self.orchestrator
    }
}

#[async_trait]
impl<P, C> Cascade<P> for ChildSync<P, C>
where
    P: ResourceKind,
    C: FieldMapper + Deletable,
{
    fn child_keyword(&self) -> &'static str {
        self.orchestrator.keyword()
    }

    async fn cascade(&self, ctx: &SyncContext, parent: &P::Local, remote: &P::Remote) -> SyncResult {
        let keyword = self.child_keyword();
        let scope = Scope::child_of(parent.meta());
        let lister = self.listers.resolve(scope.vendor);

        let started = Instant::now();
        let listed = lister.list_children(remote).await;
        ctx.record_request_cost(keyword, started.elapsed());

        match listed {
            Ok(children) => self.orchestrator.sync(ctx, &scope, children).await,
            Err(err) => {
                let err = SyncError::listing(scope.key(), err);
                tracing::error!(keyword, scope = %scope.key(), error = %err, "Child listing failed");
                let result = SyncResult::failed(err);
                ctx.record(keyword, result.clone());
                result
            }
        }
    }
}
