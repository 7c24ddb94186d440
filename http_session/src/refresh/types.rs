use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::utils::{UtilError, base64url_encode, gen_random_string};

/// Random bytes in the non-secret lookup half of a refresh token
const SELECTOR_BYTES: usize = 16;
/// Random bytes in the secret half of a refresh token
const VALIDATOR_BYTES: usize = 32;

/// The opaque `selector:validator` value handed to the client.
///
/// Only the selector may be logged. The validator leaves the server exactly once,
/// inside this value; the store keeps its hash.
#[derive(Clone, PartialEq, Eq)]
pub struct RawRefreshToken {
    selector: String,
    validator: String,
}

impl std::fmt::Debug for RawRefreshToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRefreshToken")
            .field("selector", &self.selector)
            .field("validator", &"<redacted>")
            .finish()
    }
}

impl RawRefreshToken {
    pub(crate) fn generate() -> Result<Self, UtilError> {
        Ok(Self {
            selector: gen_random_string(SELECTOR_BYTES)?,
            validator: gen_random_string(VALIDATOR_BYTES)?,
        })
    }

    /// Same selector, fresh validator.
    pub(crate) fn rotated(&self) -> Result<Self, UtilError> {
        Ok(Self {
            selector: self.selector.clone(),
            validator: gen_random_string(VALIDATOR_BYTES)?,
        })
    }

    /// Parse a client-supplied `selector:validator` value.
    pub fn parse(raw: &str) -> Option<Self> {
        let (selector, validator) = raw.split_once(':')?;
        if selector.is_empty() || validator.is_empty() || validator.contains(':') {
            return None;
        }
        Some(Self {
            selector: selector.to_string(),
            validator: validator.to_string(),
        })
    }

    pub fn selector(&self) -> &str {
        &self.selector
    }

    /// The wire form sent to the client.
    pub fn to_raw_string(&self) -> String {
        format!("{}:{}", self.selector, self.validator)
    }

    pub(crate) fn validator_hash(&self) -> String {
        hash_b64(self.validator.as_bytes())
    }

    /// Constant-time check of this token's validator against a stored hash.
    pub(crate) fn matches_hash(&self, stored_hash: &str) -> bool {
        self.validator_hash()
            .as_bytes()
            .ct_eq(stored_hash.as_bytes())
            .into()
    }
}

/// Fingerprint grouping every refresh token issued for equal payload bytes.
pub(crate) fn session_key(payload_bytes: &[u8]) -> String {
    hash_b64(payload_bytes)
}

fn hash_b64(input: &[u8]) -> String {
    base64url_encode(&Sha256::digest(input))
}
