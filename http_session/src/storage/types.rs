use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A refresh token as persisted by a [`RefreshTokenStore`](super::RefreshTokenStore).
///
/// Only the hash of the validator is kept; the raw validator exists solely in the
/// token handed to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshTokenRecord {
    /// Lookup key, not secret
    pub selector: String,
    /// base64url(SHA-256(validator))
    pub validator_hash: String,
    /// base64url of the serialized session payload
    pub session_payload: String,
    /// Fingerprint of the payload, groups every token issued for one session
    pub session_key: String,
    pub expires_at: DateTime<Utc>,
    /// Incremented on every rotation
    pub sequence_no: u64,
}

impl RefreshTokenRecord {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
