//! Local store contract and in-memory implementation

use crate::error::{Result, SyncError};
use crate::model::Record;
use crate::scope::Scope;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One changed field of an update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// Changed fields of one update; empty when nothing changed
pub type RecordDiff = Vec<FieldChange>;

/// Mutation applied to a fresh copy of a record under the store's lock
pub type Mutator<'a, T> = Box<dyn FnOnce(&mut T) + Send + 'a>;

/// Persistence primitives the orchestrator depends on.
///
/// The engine never issues queries beyond these.
#[async_trait]
pub trait LocalStore<T: Record>: Send + Sync {
    /// Records belonging to `scope`, in a stable order
    async fn query(&self, scope: &Scope) -> Result<Vec<T>>;

    async fn insert(&self, record: &T) -> Result<()>;

    /// Apply `mutator` to the stored copy of `record` and persist it.
    ///
    /// Returns the stored record and the changed fields. Nothing is written
    /// when the diff is empty.
    async fn update_with_lock<'a>(
        &'a self,
        record: &'a T,
        mutator: Mutator<'a, T>,
    ) -> Result<(T, RecordDiff)>;

    async fn delete(&self, record: &T) -> Result<()>;

    async fn fetch_by_external_id(&self, manager_id: &str, external_id: &str) -> Result<T>;

    async fn fetch_by_id(&self, id: &str) -> Result<T>;

    /// Whether `name` is taken by a record with this owner key
    async fn name_exists(&self, owner_key: &str, name: &str) -> Result<bool>;
}

/// Field-level diff of two records, ignoring the bookkeeping `updated_at`.
pub fn diff_records<T: Record>(old: &T, new: &T) -> Result<RecordDiff> {
    let old = serde_json::to_value(old)?;
    let new = serde_json::to_value(new)?;

    let (Some(old), Some(new)) = (old.as_object(), new.as_object()) else {
        return Ok(Vec::new());
    };

    let mut changes = Vec::new();
    for (field, new_value) in new {
        if field == "updated_at" {
            continue;
        }
        let old_value = old.get(field).cloned().unwrap_or(serde_json::Value::Null);
        if &old_value != new_value {
            changes.push(FieldChange {
                field: field.clone(),
                old: old_value,
                new: new_value.clone(),
            });
        }
    }
    for (field, old_value) in old {
        if field != "updated_at" && !new.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                old: old_value.clone(),
                new: serde_json::Value::Null,
            });
        }
    }
    Ok(changes)
}

#[derive(Debug, Clone, Copy)]
enum Op {
    Insert,
    Update,
    Delete,
}

#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
struct Faults {
    insert: BTreeMap<String, (SyncError, usize)>,
    update: BTreeMap<String, (SyncError, usize)>,
    delete: BTreeMap<String, (SyncError, usize)>,
}

#[cfg(any(test, feature = "test-utils"))]
fn take_fault(
    faults: &mut BTreeMap<String, (SyncError, usize)>,
    keys: [&str; 2],
) -> Option<SyncError> {
    for key in keys {
        if let Some((err, remaining)) = faults.get_mut(key) {
            let err = err.clone();
            *remaining -= 1;
            if *remaining == 0 {
                faults.remove(key);
            }
            return Some(err);
        }
    }
    None
}

/// In-memory store keyed by local id.
///
/// Enforces the uniqueness the orchestrator relies on: local ids, external
/// ids per provider account, and names per owner.
#[derive(Debug)]
pub struct MemoryStore<T> {
    records: RwLock<BTreeMap<String, T>>,
    #[cfg(any(test, feature = "test-utils"))]
    faults: parking_lot::Mutex<Faults>,
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            #[cfg(any(test, feature = "test-utils"))]
            faults: parking_lot::Mutex::new(Faults::default()),
        }
    }
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding `records`, rejecting duplicates
    pub fn load(records: impl IntoIterator<Item = T>) -> Result<Self> {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                Self::check_unique(&map, &record)?;
                map.insert(record.id().to_string(), record);
            }
        }
        Ok(store)
    }

    /// All records ordered by local id
    pub fn snapshot(&self) -> Vec<T> {
        self.records.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Records whose parent is `parent_id`, whatever the provider account
    pub fn children_of(&self, parent_id: &str) -> Vec<T> {
        self.records
            .read()
            .values()
            .filter(|r| r.meta().parent_id == parent_id)
            .cloned()
            .collect()
    }

    /// First record matching `predicate`
    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.records.read().values().find(|r| predicate(r)).cloned()
    }

    fn check_unique(map: &BTreeMap<String, T>, record: &T) -> Result<()> {
        let meta = record.meta();
        for existing in map.values() {
            if existing.id() == meta.id {
                continue;
            }
            let other = existing.meta();
            if !meta.external_id.is_empty()
                && other.external_id == meta.external_id
                && other.manager_id == meta.manager_id
            {
                return Err(SyncError::DuplicateEntry(format!(
                    "external id {} in {}",
                    meta.external_id, meta.manager_id
                )));
            }
            if !meta.name.is_empty()
                && other.name == meta.name
                && other.owner_key() == meta.owner_key()
            {
                return Err(SyncError::DuplicateEntry(format!(
                    "name {} in {}",
                    meta.name,
                    meta.owner_key()
                )));
            }
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl<T: Record> MemoryStore<T> {
    /// Fail the next `times` inserts of the record with this external id or local id
    pub fn inject_insert_error(&self, key: impl Into<String>, err: SyncError, times: usize) {
        if times > 0 {
            self.faults.lock().insert.insert(key.into(), (err, times));
        }
    }

    pub fn inject_update_error(&self, key: impl Into<String>, err: SyncError, times: usize) {
        if times > 0 {
            self.faults.lock().update.insert(key.into(), (err, times));
        }
    }

    pub fn inject_delete_error(&self, key: impl Into<String>, err: SyncError, times: usize) {
        if times > 0 {
            self.faults.lock().delete.insert(key.into(), (err, times));
        }
    }
}

impl<T: Record> MemoryStore<T> {
    #[cfg(any(test, feature = "test-utils"))]
    fn fault(&self, op: Op, record: &T) -> Result<()> {
        let mut faults = self.faults.lock();
        let table = match op {
            Op::Insert => &mut faults.insert,
            Op::Update => &mut faults.update,
            Op::Delete => &mut faults.delete,
        };
        match take_fault(table, [record.external_id(), record.id()]) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[cfg(not(any(test, feature = "test-utils")))]
    fn fault(&self, _op: Op, _record: &T) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl<T: Record> LocalStore<T> for MemoryStore<T> {
    async fn query(&self, scope: &Scope) -> Result<Vec<T>> {
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| scope.contains(r.meta()))
            .cloned()
            .collect())
    }

    async fn insert(&self, record: &T) -> Result<()> {
        self.fault(Op::Insert, record)?;

        let mut map = self.records.write();
        if map.contains_key(record.id()) {
            return Err(SyncError::DuplicateEntry(format!("id {}", record.id())));
        }
        Self::check_unique(&map, record)?;
        map.insert(record.id().to_string(), record.clone());
        Ok(())
    }

    async fn update_with_lock<'a>(
        &'a self,
        record: &'a T,
        mutator: Mutator<'a, T>,
    ) -> Result<(T, RecordDiff)> {
        self.fault(Op::Update, record)?;

        let mut map = self.records.write();
        let current = map
            .get(record.id())
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("record {}", record.id())))?;

        let mut updated = current.clone();
        mutator(&mut updated);
        // Identity is immutable
        updated.meta_mut().id = current.id().to_string();

        let diff = diff_records(&current, &updated)?;
        if diff.is_empty() {
            return Ok((current, diff));
        }

        Self::check_unique(&map, &updated)?;
        updated.meta_mut().updated_at = Utc::now();
        map.insert(updated.id().to_string(), updated.clone());
        Ok((updated, diff))
    }

    async fn delete(&self, record: &T) -> Result<()> {
        self.fault(Op::Delete, record)?;

        match self.records.write().remove(record.id()) {
            Some(_) => Ok(()),
            None => Err(SyncError::NotFound(format!("record {}", record.id()))),
        }
    }

    async fn fetch_by_external_id(&self, manager_id: &str, external_id: &str) -> Result<T> {
        self.find(|r| r.meta().manager_id == manager_id && r.external_id() == external_id)
            .ok_or_else(|| SyncError::NotFound(format!("external id {}", external_id)))
    }

    async fn fetch_by_id(&self, id: &str) -> Result<T> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SyncError::NotFound(format!("record {}", id)))
    }

    async fn name_exists(&self, owner_key: &str, name: &str) -> Result<bool> {
        Ok(self
            .records
            .read()
            .values()
            .any(|r| r.name() == name && r.meta().owner_key() == owner_key))
    }
}
