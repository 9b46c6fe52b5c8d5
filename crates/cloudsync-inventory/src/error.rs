//! Inventory error types

use cloudsync::SyncError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("Unknown provider account: {0}")]
    UnknownAccount(String),
}

pub type Result<T> = std::result::Result<T, InventoryError>;
