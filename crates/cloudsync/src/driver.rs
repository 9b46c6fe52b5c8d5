//! Concurrent scope driver

use crate::context::SyncContext;
use crate::registry::SyncRegistry;
use crate::result::SyncResult;
use crate::scope::Scope;
use futures_util::StreamExt;
use futures_util::stream;
use std::sync::Arc;

/// One keyword/scope pass to run
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeJob {
    pub keyword: String,
    pub scope: Scope,
}

impl ScopeJob {
    pub fn new(keyword: impl Into<String>, scope: Scope) -> Self {
        Self {
            keyword: keyword.into(),
            scope,
        }
    }
}

/// Runs independent scopes concurrently, at most `max_concurrent` at a time.
///
/// Each job gets its own lock holder; results land in the shared recorder
/// of the context.
#[derive(Debug, Clone)]
pub struct ScopeDriver {
    registry: Arc<SyncRegistry>,
    max_concurrent: usize,
}

impl ScopeDriver {
    pub fn new(registry: Arc<SyncRegistry>, max_concurrent: usize) -> Self {
        Self {
            registry,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Results in completion order
    pub async fn run(&self, ctx: &SyncContext, jobs: Vec<ScopeJob>) -> Vec<(ScopeJob, SyncResult)> {
        tracing::info!(jobs = jobs.len(), max_concurrent = self.max_concurrent, "Running scope jobs");

        stream::iter(jobs)
            .map(|job| {
                let ctx = ctx.fork();
                let registry = Arc::clone(&self.registry);
                async move {
                    let result = match registry.resync(&ctx, &job.keyword, &job.scope).await {
                        Ok(result) => result,
                        Err(err) => {
                            tracing::error!(keyword = %job.keyword, scope = %job.scope, error = %err, "Scope job rejected");
                            SyncResult::failed(err)
                        }
                    };
                    (job, result)
                }
            })
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await
    }
}
