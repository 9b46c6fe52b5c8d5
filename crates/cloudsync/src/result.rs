//! Sync result aggregation

use crate::error::SyncError;
use std::collections::BTreeMap;
use std::time::Duration;

/// Outcome counters of one orchestrator pass.
///
/// Item failures are counted and kept; they never stop the rest of the
/// pass. Whole-pass failures (listing the local or remote set, a busy scope)
/// are kept separately. Results of cascaded children are folded in with
/// [`SyncResult::merge`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResult {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Removed records marked out-of-sync instead of deleted
    pub flagged: usize,
    pub add_errors: usize,
    pub update_errors: usize,
    pub delete_errors: usize,
    errors: Vec<SyncError>,
    failures: Vec<SyncError>,
}

impl SyncResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// A result carrying only a whole-pass failure
    pub fn failed(err: SyncError) -> Self {
        let mut result = Self::new();
        result.error(err);
        result
    }

    pub fn add(&mut self) {
        self.added += 1;
    }

    pub fn update(&mut self) {
        self.updated += 1;
    }

    pub fn delete(&mut self) {
        self.deleted += 1;
    }

    pub fn flag(&mut self) {
        self.flagged += 1;
    }

    pub fn add_error(&mut self, err: SyncError) {
        self.add_errors += 1;
        self.errors.push(err);
    }

    pub fn update_error(&mut self, err: SyncError) {
        self.update_errors += 1;
        self.errors.push(err);
    }

    pub fn delete_error(&mut self, err: SyncError) {
        self.delete_errors += 1;
        self.errors.push(err);
    }

    /// Record a whole-pass failure
    pub fn error(&mut self, err: SyncError) {
        self.failures.push(err);
    }

    pub fn is_error(&self) -> bool {
        !self.failures.is_empty() || !self.errors.is_empty()
    }

    /// Whether the pass itself (or a merged child pass) aborted
    pub fn is_failed(&self) -> bool {
        !self.failures.is_empty()
    }

    /// True when nothing changed and nothing failed
    pub fn is_noop(&self) -> bool {
        self.added == 0 && self.updated == 0 && self.deleted == 0 && self.flagged == 0 && !self.is_error()
    }

    pub fn errors(&self) -> &[SyncError] {
        &self.errors
    }

    pub fn failures(&self) -> &[SyncError] {
        &self.failures
    }

    /// Representative error, whole-pass failures first
    pub fn first_error(&self) -> Option<&SyncError> {
        self.failures.first().or_else(|| self.errors.first())
    }

    /// Fold a child pass into this one
    pub fn merge(&mut self, other: SyncResult) {
        self.added += other.added;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.flagged += other.flagged;
        self.add_errors += other.add_errors;
        self.update_errors += other.update_errors;
        self.delete_errors += other.delete_errors;
        self.errors.extend(other.errors);
        self.failures.extend(other.failures);
    }

    pub fn summary(&self) -> SyncSummary {
        SyncSummary {
            removed: self.deleted,
            remove_failed: self.delete_errors,
            flagged: self.flagged,
            updated: self.updated,
            update_failed: self.update_errors,
            added: self.added,
            add_failed: self.add_errors,
        }
    }

    /// Human readable summary, with a representative error when any occurred
    pub fn result(&self) -> String {
        match self.first_error() {
            Some(err) => format!("{}; error: {}", self.summary(), err),
            None => self.summary().to_string(),
        }
    }
}

impl std::fmt::Display for SyncResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.result())
    }
}

/// Counters of a [`SyncResult`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSummary {
    pub removed: usize,
    pub remove_failed: usize,
    pub flagged: usize,
    pub updated: usize,
    pub update_failed: usize,
    pub added: usize,
    pub add_failed: usize,
}

impl std::fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "removed {} failed {} flagged {} updated {} failed {} added {} failed {}",
            self.removed,
            self.remove_failed,
            self.flagged,
            self.updated,
            self.update_failed,
            self.added,
            self.add_failed
        )
    }
}

/// Per-keyword statistics inside a [`SyncResultSet`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordStats {
    pub result: SyncResult,
    /// Number of passes folded in
    pub passes: usize,
    /// Time spent listing remote state
    pub request_cost: Duration,
    /// Time spent reconciling against the local store
    pub store_cost: Duration,
}

/// Results of every pass of a provider-wide sync, grouped by resource keyword.
///
/// Unlike the cascaded [`SyncResult`] returned to callers, each pass is
/// recorded here only under its own keyword.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncResultSet {
    stats: BTreeMap<String, KeywordStats>,
}

impl SyncResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, keyword: &str, result: SyncResult) {
        let entry = self.stats.entry(keyword.to_string()).or_default();
        entry.result.merge(result);
        entry.passes += 1;
    }

    pub fn add_request_cost(&mut self, keyword: &str, cost: Duration) {
        self.stats.entry(keyword.to_string()).or_default().request_cost += cost;
    }

    pub fn add_store_cost(&mut self, keyword: &str, cost: Duration) {
        self.stats.entry(keyword.to_string()).or_default().store_cost += cost;
    }

    pub fn get(&self, keyword: &str) -> Option<&KeywordStats> {
        self.stats.get(keyword)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeywordStats)> {
        self.stats.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn is_error(&self) -> bool {
        self.stats.values().any(|s| s.result.is_error())
    }

    /// All keywords folded into one result
    pub fn total(&self) -> SyncResult {
        let mut total = SyncResult::new();
        for stats in self.stats.values() {
            total.merge(stats.result.clone());
        }
        total
    }
}

impl std::fmt::Display for SyncResultSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (keyword, stats) in &self.stats {
            writeln!(
                f,
                "{}: {} (passes {}, request {}ms, store {}ms)",
                keyword,
                stats.result,
                stats.passes,
                stats.request_cost.as_millis(),
                stats.store_cost.as_millis()
            )?;
        }
        Ok(())
    }
}
