//! Store Error Types

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Unknown mode: {0} (expected 'aux' or 'main')")]
    UnknownMode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Document store connection failed: {0}")]
    Connection(String),

    #[error("Relational pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Relational error: {0}")]
    Relational(#[from] rusqlite::Error),

    #[error("Document store error: {0}")]
    Document(#[from] mongodb::error::Error),

    #[error("Batch insert failed, rolled back: {0}")]
    BatchFailure(String),

    #[error("Predicate translation failed: {0}")]
    Translation(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
