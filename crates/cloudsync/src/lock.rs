//! Lock manager contract and in-memory implementation
//!
//! Three lock families are used by the orchestrator:
//!
//! - **class** locks serialise name generation and insertion for all records
//!   of a keyword sharing an owner key
//! - **object** locks serialise mutation of a single record
//! - **raw** locks serialise whole passes over a scope
//!
//! All of them are reentrant for the same lock holder (see
//! [`SyncContext::holder`]) and are released when the returned
//! [`LockGuard`] is dropped, including during unwinding.

use crate::context::SyncContext;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

#[async_trait]
pub trait LockManager: Send + Sync {
    async fn lock_class(&self, ctx: &SyncContext, manager: &str, key: &str) -> Result<LockGuard>;

    async fn lock_object(&self, ctx: &SyncContext, keyword: &str, id: &str) -> Result<LockGuard>;

    async fn lock_raw_object(
        &self,
        ctx: &SyncContext,
        namespace: &str,
        key: &str,
    ) -> Result<LockGuard>;
}

/// RAII guard for an acquired lock
pub struct LockGuard {
    key: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl LockGuard {
    pub fn new(key: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            key: key.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release the lock before the end of the scope
    pub fn release(mut self) {
        self.unlock();
    }

    fn unlock(&mut self) {
        if let Some(release) = self.release.take() {
            release();
            tracing::debug!(key = %self.key, "Released lock");
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.unlock();
    }
}

impl std::fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGuard")
            .field("key", &self.key)
            .field("held", &self.release.is_some())
            .finish()
    }
}

#[derive(Debug, Default)]
struct SlotState {
    holder: Option<Uuid>,
    depth: usize,
}

#[derive(Debug, Default)]
struct LockSlot {
    state: Mutex<SlotState>,
    notify: Notify,
}

impl LockSlot {
    fn try_acquire(&self, holder: Uuid) -> bool {
        let mut state = self.state.lock();
        match state.holder {
            None => {
                state.holder = Some(holder);
                state.depth = 1;
                true
            }
            Some(current) if current == holder => {
                state.depth += 1;
                true
            }
            Some(_) => false,
        }
    }

    fn release(&self) {
        let mut state = self.state.lock();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.holder = None;
            drop(state);
            self.notify.notify_waiters();
        }
    }
}

type SlotMap = Arc<Mutex<HashMap<String, Arc<LockSlot>>>>;

/// Process-local lock manager.
///
/// Waiters are woken on release; with a timeout configured, acquisition
/// fails with [`SyncError::Lock`] instead of waiting forever. A key's slot
/// is dropped once nobody holds or waits on it.
#[derive(Debug, Default)]
pub struct MemoryLockManager {
    slots: SlotMap,
    timeout: Option<Duration>,
}

impl MemoryLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn slot(&self, key: &str) -> Arc<LockSlot> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.to_string()).or_default())
    }

    /// Whether anyone currently holds `key`
    pub fn is_locked(&self, key: &str) -> bool {
        self.slots
            .lock()
            .get(key)
            .is_some_and(|slot| slot.state.lock().holder.is_some())
    }

    async fn wait_for(slot: &LockSlot, holder: Uuid) {
        loop {
            let mut notified = std::pin::pin!(slot.notify.notified());
            // Register before checking so a release in between is not missed
            notified.as_mut().enable();
            if slot.try_acquire(holder) {
                return;
            }
            notified.await;
        }
    }

    /// Remove `slot` from the map if only the map and the caller still reference it
    fn evict_idle(slots: &Mutex<HashMap<String, Arc<LockSlot>>>, key: &str, slot: &Arc<LockSlot>) {
        let mut slots = slots.lock();
        let idle = Arc::strong_count(slot) == 2
            && slot.state.lock().holder.is_none()
            && slots.get(key).is_some_and(|s| Arc::ptr_eq(s, slot));
        if idle {
            slots.remove(key);
        }
    }

    async fn acquire(&self, holder: Uuid, key: String) -> Result<LockGuard> {
        let slot = self.slot(&key);
        let acquired = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, Self::wait_for(&slot, holder))
                .await
                .is_ok(),
            None => {
                Self::wait_for(&slot, holder).await;
                true
            }
        };
        if !acquired {
            Self::evict_idle(&self.slots, &key, &slot);
            return Err(SyncError::Lock(format!("timed out waiting for {}", key)));
        }

        tracing::debug!(key = %key, holder = %holder, "Acquired lock");
        let slots = Arc::clone(&self.slots);
        let slot_key = key.clone();
        Ok(LockGuard::new(key, move || {
            slot.release();
            Self::evict_idle(&slots, &slot_key, &slot);
        }))
    }
}

#[async_trait]
impl LockManager for MemoryLockManager {
    async fn lock_class(&self, ctx: &SyncContext, manager: &str, key: &str) -> Result<LockGuard> {
        self.acquire(ctx.holder(), format!("class:{}:{}", manager, key))
            .await
    }

    async fn lock_object(&self, ctx: &SyncContext, keyword: &str, id: &str) -> Result<LockGuard> {
        self.acquire(ctx.holder(), format!("object:{}:{}", keyword, id))
            .await
    }

    async fn lock_raw_object(
        &self,
        ctx: &SyncContext,
        namespace: &str,
        key: &str,
    ) -> Result<LockGuard> {
        self.acquire(ctx.holder(), format!("raw:{}:{}", namespace, key))
            .await
    }
}
