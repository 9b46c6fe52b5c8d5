//! Set comparator
//!
//! Partitions a local and a remote collection into removed (local only),
//! matched (present on both sides) and added (remote only) records.

use crate::key::SyncKey;
use crate::scope::Scope;
use std::collections::HashMap;

/// Remote records sharing one identity key.
///
/// The provider reported the key more than once, so neither side can be
/// matched safely. The locals carrying the key are held back as well and
/// are neither updated nor deleted by the pass.
#[derive(Debug)]
pub struct KeyConflict<L, R> {
    pub key: String,
    pub locals: Vec<L>,
    pub remotes: Vec<R>,
}

/// Result of [`compare_sets`].
#[derive(Debug)]
pub struct Partition<L, R> {
    pub removed: Vec<L>,
    pub matched: Vec<(L, R)>,
    pub added: Vec<R>,
    pub conflicts: Vec<KeyConflict<L, R>>,
}

impl<L, R> Partition<L, R> {
    fn new() -> Self {
        Self {
            removed: Vec::new(),
            matched: Vec::new(),
            added: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    /// True when both sides already agree on membership.
    pub fn is_balanced(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.conflicts.is_empty()
    }
}

struct Slot<L, R> {
    key: String,
    remotes: Vec<R>,
    locals: Vec<L>,
    claimed: bool,
}

impl<L, R> Slot<L, R> {
    fn new(key: String, remote: R) -> Self {
        Self {
            key,
            remotes: vec![remote],
            locals: Vec::new(),
            claimed: false,
        }
    }
}

/// Compute the three-way diff of `locals` against `remotes`.
///
/// Runs in O(n+m). `matched` follows the order of `locals`; `added` and
/// `conflicts` follow the order of `remotes`. A second local carrying an
/// already matched key is treated as stale and lands in `removed`.
pub fn compare_sets<L, R>(scope: &Scope, locals: Vec<L>, remotes: Vec<R>) -> Partition<L, R>
where
    L: SyncKey,
    R: SyncKey,
{
    let mut slots: Vec<Slot<L, R>> = Vec::with_capacity(remotes.len());
    let mut index: HashMap<String, usize> = HashMap::with_capacity(remotes.len());

    for remote in remotes {
        let key = remote.sync_key(scope);
        if key.is_empty() {
            slots.push(Slot::new(key, remote));
            continue;
        }
        match index.get(&key).copied() {
            Some(i) => slots[i].remotes.push(remote),
            None => {
                index.insert(key.clone(), slots.len());
                slots.push(Slot::new(key, remote));
            }
        }
    }

    let mut partition = Partition::new();

    for local in locals {
        let key = local.sync_key(scope);
        let found = if key.is_empty() {
            None
        } else {
            index.get(&key).copied()
        };

        let Some(i) = found else {
            partition.removed.push(local);
            continue;
        };

        let slot = &mut slots[i];
        if slot.remotes.len() > 1 {
            slot.locals.push(local);
        } else if !slot.claimed {
            slot.claimed = true;
            match slot.remotes.pop() {
                Some(remote) => partition.matched.push((local, remote)),
                None => partition.removed.push(local),
            }
        } else {
            partition.removed.push(local);
        }
    }

    for slot in slots {
        if slot.remotes.len() > 1 {
            partition.conflicts.push(KeyConflict {
                key: slot.key,
                locals: slot.locals,
                remotes: slot.remotes,
            });
        } else {
            partition.added.extend(slot.remotes);
        }
    }

    partition
}
