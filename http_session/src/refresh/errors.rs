use thiserror::Error;

use crate::storage::StoreError;
use crate::utils::UtilError;

#[derive(Debug, Error, Clone)]
pub enum RefreshError {
    /// No record for the selector, or the raw token does not parse
    #[error("Unknown refresh token")]
    Unknown,

    /// Selector known but validator mismatch: a rotated-out token was replayed
    #[error("Refresh token reuse detected")]
    Stolen,

    #[error("Refresh token expired")]
    Expired,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}

impl RefreshError {
    /// Infrastructure failures, as opposed to a rejected token.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RefreshError::Store(StoreError::Unavailable(_)))
    }
}
