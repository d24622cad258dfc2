//! Crate error types

use thiserror::Error;

use crate::store::StoreError;

/// Errors returned by server setup and the serve loop
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for server operations
pub type Result<T> = std::result::Result<T, Error>;
