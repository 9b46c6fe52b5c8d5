//! Remote provider adapter contracts

use crate::error::Result;
use crate::scope::Scope;
use async_trait::async_trait;

/// Lists the remote resources of one kind for a scope.
///
/// Implemented by vendor clients. A failure aborts the whole pass for that
/// scope only.
#[async_trait]
pub trait RemoteLister<R>: Send + Sync {
    async fn list(&self, scope: &Scope) -> Result<Vec<R>>;
}

#[async_trait]
impl<R, F> RemoteLister<R> for F
where
    R: Send + 'static,
    F: Fn(&Scope) -> Result<Vec<R>> + Send + Sync,
{
    async fn list(&self, scope: &Scope) -> Result<Vec<R>> {
        self(scope)
    }
}

/// Fixed remote listing, the same for every scope
#[derive(Debug, Clone, Default)]
pub struct StaticLister<R> {
    remotes: Vec<R>,
}

impl<R> StaticLister<R> {
    pub fn new(remotes: Vec<R>) -> Self {
        Self { remotes }
    }
}

#[async_trait]
impl<R> RemoteLister<R> for StaticLister<R>
where
    R: Clone + Send + Sync + 'static,
{
    async fn list(&self, _scope: &Scope) -> Result<Vec<R>> {
        Ok(self.remotes.clone())
    }
}

/// Fetches the next cascade level from a remote parent handle.
#[async_trait]
pub trait ChildLister<P, C>: Send + Sync {
    async fn list_children(&self, parent: &P) -> Result<Vec<C>>;
}

#[async_trait]
impl<P, C, F> ChildLister<P, C> for F
where
    P: Sync + 'static,
    C: Send + 'static,
    F: Fn(&P) -> Result<Vec<C>> + Send + Sync,
{
    async fn list_children(&self, parent: &P) -> Result<Vec<C>> {
        self(parent)
    }
}
