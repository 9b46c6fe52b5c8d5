//! Per-pass execution context

use crate::result::{SyncResult, SyncResultSet};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identity and shared recorder of one sync run.
///
/// `holder` identifies the lock owner: locks are reentrant for the same
/// holder only. Concurrent passes must run with distinct holders, obtained
/// with [`SyncContext::fork`], while still reporting into the same
/// [`SyncResultSet`].
#[derive(Debug, Clone)]
pub struct SyncContext {
    holder: Uuid,
    user: String,
    recorder: Arc<Mutex<SyncResultSet>>,
}

impl SyncContext {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            holder: Uuid::new_v4(),
            user: user.into(),
            recorder: Arc::new(Mutex::new(SyncResultSet::new())),
        }
    }

    /// Same user and recorder, fresh lock holder
    pub fn fork(&self) -> Self {
        Self {
            holder: Uuid::new_v4(),
            user: self.user.clone(),
            recorder: Arc::clone(&self.recorder),
        }
    }

    pub fn holder(&self) -> Uuid {
        self.holder
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn record(&self, keyword: &str, result: SyncResult) {
        self.recorder.lock().add(keyword, result);
    }

    pub fn record_request_cost(&self, keyword: &str, cost: Duration) {
        self.recorder.lock().add_request_cost(keyword, cost);
    }

    pub fn record_store_cost(&self, keyword: &str, cost: Duration) {
        self.recorder.lock().add_store_cost(keyword, cost);
    }

    /// Snapshot of everything recorded so far
    pub fn results(&self) -> SyncResultSet {
        self.recorder.lock().clone()
    }
}

impl Default for SyncContext {
    fn default() -> Self {
        Self::new("system")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_shares_recorder_with_new_holder() {
        let ctx = SyncContext::new("scheduler");
        let forked = ctx.fork();
        assert_ne!(ctx.holder(), forked.holder());
        assert_eq!(forked.user(), "scheduler");

        let mut result = SyncResult::new();
        result.add();
        forked.record("zone", result);
        ctx.record_store_cost("zone", Duration::from_millis(3));

        let set = ctx.results();
        let zone = set.get("zone").unwrap();
        assert_eq!(zone.result.added, 1);
        assert_eq!(zone.store_cost, Duration::from_millis(3));
    }
}
