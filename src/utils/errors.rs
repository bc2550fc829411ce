//! Custom error types for the backup tool.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::SaveOutcome;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("backup file already exists: {}", .0.display())]
    Collision(PathBuf),

    #[error("checksum mismatch after copy: {}", .0.display())]
    Integrity(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("store error: {0}")]
    Store(#[from] redis::RedisError),

    #[error("background save did not complete: {0}")]
    Save(SaveOutcome),
}

pub type Result<T> = std::result::Result<T, BackupError>;
