use thiserror::Error;

use crate::refresh::RefreshError;
use crate::storage::StoreError;
use crate::utils::UtilError;

/// Why an encoded session token could not be turned back into a payload.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Wrong structure, or content that does not parse after a valid signature
    #[error("Malformed session token")]
    Malformed,

    /// MAC mismatch: the token was tampered with or signed with another key
    #[error("Session token signature mismatch")]
    BadSignature,

    /// Valid signature, but the expiry timestamp has passed
    #[error("Session token expired")]
    Expired,
}

impl DecodeError {
    /// Only expiry may lead to a refresh attempt; tampering never does.
    pub fn allows_refresh(&self) -> bool {
        matches!(self, DecodeError::Expired)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CsrfError {
    #[error("CSRF token missing")]
    Missing,

    #[error("CSRF token mismatch")]
    Mismatch,
}

#[derive(Debug, Error, Clone)]
pub enum SessionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Header error: {0}")]
    Header(String),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("CSRF error: {0}")]
    Csrf(#[from] CsrfError),

    #[error("Refresh token error: {0}")]
    Refresh(#[from] RefreshError),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Error from utils operations
    #[error("Utils error: {0}")]
    Utils(#[from] UtilError),
}
