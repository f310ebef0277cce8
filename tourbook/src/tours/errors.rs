//! Tour error types.

use thiserror::Error;

use super::models::TourId;
use crate::db::StoreError;

/// Tour errors
#[derive(Debug, Error)]
pub enum TourError {
    /// Persistence error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Draft violates a construction invariant
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Another tour already uses this name
    #[error("A tour with this name already exists")]
    NameTaken,

    /// Tour not found (or hidden by the read scope)
    #[error("Tour {0} not found")]
    TourNotFound(TourId),
}

impl TourError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            TourError::Store(_) => "Internal server error".to_string(),
            TourError::TourNotFound(_) => "Tour not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for tour operations
pub type TourResult<T> = Result<T, TourError>;
