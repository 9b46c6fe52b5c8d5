//! Sync error types

use thiserror::Error;

/// Errors raised while reconciling local inventory against provider state.
///
/// Item-level errors are collected into a [`SyncResult`](crate::SyncResult)
/// and never abort the rest of a pass; only listing the local or remote set
/// (or a busy scope) fails a pass as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// The provider could not enumerate resources for a scope.
    #[error("Listing failed for {scope}: {message}")]
    ListingFailure { scope: String, message: String },

    /// A referenced local or remote counterpart is missing.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Delete blocked by live dependents.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Name or key collision on insert.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The provider reported several records with the same identity key.
    #[error("Duplicate remote key {key} ({count} records)")]
    DuplicateKey { key: String, count: usize },

    /// Network or timeout failure talking to the vendor API.
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// A local record of the scope is held by a running provisioning task.
    #[error("{keyword} {id} is in task")]
    InTask { keyword: String, id: String },

    #[error("Lock acquisition failed: {0}")]
    Lock(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl SyncError {
    pub fn listing(scope: impl Into<String>, source: impl std::fmt::Display) -> Self {
        SyncError::ListingFailure {
            scope: scope.into(),
            message: source.to_string(),
        }
    }

    /// Whether the next scheduled pass may succeed without intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SyncError::Transient(_) | SyncError::ListingFailure { .. } | SyncError::InTask { .. }
        )
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Json(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
