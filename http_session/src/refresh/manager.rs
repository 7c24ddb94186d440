//! Refresh token lifecycle: issue, redeem with mandatory rotation, revoke
//!
//! A replayed (rotated-out) token is treated as theft and revokes its chain.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

use crate::session::SessionPayload;
use crate::storage::{RefreshTokenRecord, RefreshTokenStore, StoreError};
use crate::utils::{base64url_decode, base64url_encode};

use super::errors::RefreshError;
use super::types::{RawRefreshToken, session_key};

/// Attempts at finding an unused selector before giving up
const MAX_CREATE_ATTEMPTS: usize = 3;

#[derive(Clone)]
pub struct RefreshTokenManager {
    store: Arc<dyn RefreshTokenStore>,
    max_age: u64,
}

impl std::fmt::Debug for RefreshTokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshTokenManager")
            .field("max_age", &self.max_age)
            .finish_non_exhaustive()
    }
}

impl RefreshTokenManager {
    /// `max_age` is the refresh token lifetime in seconds.
    pub fn new(store: Arc<dyn RefreshTokenStore>, max_age: u64) -> Self {
        Self { store, max_age }
    }

    pub fn store(&self) -> &Arc<dyn RefreshTokenStore> {
        &self.store
    }

    fn expires_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        i64::try_from(self.max_age)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Start a new refresh token chain for `payload`.
    pub async fn issue<T: SessionPayload>(
        &self,
        payload: &T,
    ) -> Result<RawRefreshToken, RefreshError> {
        let bytes = payload
            .to_bytes()
            .map_err(|e| RefreshError::Serialization(e.to_string()))?;
        let session_payload = base64url_encode(&bytes);
        let session_key = session_key(&bytes);
        let expires_at = self.expires_at();

        for attempt in 1..=MAX_CREATE_ATTEMPTS {
            let token = RawRefreshToken::generate()?;
            let record = RefreshTokenRecord {
                selector: token.selector().to_string(),
                validator_hash: token.validator_hash(),
                session_payload: session_payload.clone(),
                session_key: session_key.clone(),
                expires_at,
                sequence_no: 0,
            };

            match self.store.create(record).await {
                Ok(()) => {
                    tracing::debug!("Issued refresh token: selector={}", token.selector());
                    return Ok(token);
                }
                Err(StoreError::Conflict) => {
                    tracing::warn!(
                        "Refresh token selector collision (attempt {}/{})",
                        attempt,
                        MAX_CREATE_ATTEMPTS
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to store refresh token: {}", e);
                    return Err(e.into());
                }
            }
        }

        tracing::error!(
            "Failed to find an unused refresh token selector after {} attempts",
            MAX_CREATE_ATTEMPTS
        );
        Err(RefreshError::Store(StoreError::Conflict))
    }

    /// Exchange a raw refresh token for its session payload and a rotated token.
    ///
    /// The presented token is never valid again after this call, whatever the
    /// outcome.
    pub async fn redeem<T: SessionPayload>(
        &self,
        raw: &str,
    ) -> Result<(T, RawRefreshToken), RefreshError> {
        let Some(presented) = RawRefreshToken::parse(raw) else {
            tracing::debug!("Refresh token does not parse");
            return Err(RefreshError::Unknown);
        };
        let selector = presented.selector();

        let Some(mut record) = self.store.get(selector).await? else {
            tracing::debug!("No refresh token record: selector={}", selector);
            return Err(RefreshError::Unknown);
        };

        if record.is_expired_at(Utc::now()) {
            tracing::debug!("Refresh token expired: selector={}", selector);
            self.store.delete(selector).await?;
            return Err(RefreshError::Expired);
        }

        if !presented.matches_hash(&record.validator_hash) {
            tracing::warn!(
                "Refresh token reuse detected, revoking chain: selector={}",
                selector
            );
            self.store.delete(selector).await?;
            return Err(RefreshError::Stolen);
        }

        let payload = decode_payload::<T>(&record)?;

        let mut retried = false;
        loop {
            let next = presented.rotated()?;
            let result = self
                .store
                .compare_and_rotate(
                    selector,
                    record.sequence_no,
                    next.validator_hash(),
                    self.expires_at(),
                )
                .await;

            match result {
                Ok(()) => {
                    tracing::debug!(
                        "Rotated refresh token: selector={}, sequence_no={}",
                        selector,
                        record.sequence_no + 1
                    );
                    return Ok((payload, next));
                }
                Err(StoreError::Conflict) if !retried => {
                    retried = true;
                    // A concurrent redemption may have rotated the record already
                    match self.store.get(selector).await? {
                        Some(current)
                            if presented.matches_hash(&current.validator_hash)
                                && !current.is_expired_at(Utc::now()) =>
                        {
                            record = current;
                        }
                        _ => {
                            tracing::debug!(
                                "Lost concurrent refresh token redemption: selector={}",
                                selector
                            );
                            return Err(RefreshError::Unknown);
                        }
                    }
                }
                Err(StoreError::Conflict) => {
                    tracing::debug!(
                        "Refresh token rotation still conflicting: selector={}",
                        selector
                    );
                    return Err(RefreshError::Unknown);
                }
                Err(e) => {
                    tracing::error!("Failed to rotate refresh token: {}", e);
                    return Err(e.into());
                }
            }
        }
    }

    /// Delete one chain, given either the raw token or just its selector.
    pub async fn revoke(&self, raw_or_selector: &str) -> Result<(), RefreshError> {
        let selector = match raw_or_selector.split_once(':') {
            Some((selector, _)) => selector,
            None => raw_or_selector,
        };
        if selector.is_empty() {
            return Ok(());
        }
        self.store.delete(selector).await?;
        tracing::debug!("Revoked refresh token: selector={}", selector);
        Ok(())
    }

    /// Delete the chain of a raw token the client presented, if the token is
    /// currently valid.
    ///
    /// Returns whether a chain was deleted. A selector alone, or one paired with
    /// a validator that does not match, deletes nothing.
    pub async fn revoke_presented(&self, raw: &str) -> Result<bool, RefreshError> {
        let Some(presented) = RawRefreshToken::parse(raw) else {
            return Ok(false);
        };
        let selector = presented.selector();
        let Some(record) = self.store.get(selector).await? else {
            return Ok(false);
        };
        if !presented.matches_hash(&record.validator_hash) {
            tracing::warn!(
                "Presented refresh token does not match, not revoking: selector={}",
                selector
            );
            return Ok(false);
        }
        self.store.delete(selector).await?;
        tracing::debug!("Revoked presented refresh token: selector={}", selector);
        Ok(true)
    }

    /// Delete every chain issued for a payload equal to `payload`.
    pub async fn revoke_all<T: SessionPayload>(&self, payload: &T) -> Result<usize, RefreshError> {
        let bytes = payload
            .to_bytes()
            .map_err(|e| RefreshError::Serialization(e.to_string()))?;
        let removed = self.store.delete_all_for_session(&session_key(&bytes)).await?;
        tracing::debug!("Revoked {} refresh tokens for session", removed);
        Ok(removed)
    }

    /// Drop every expired record from the store.
    pub async fn purge_expired(&self) -> Result<usize, RefreshError> {
        Ok(self.store.purge_expired(Utc::now()).await?)
    }
}

fn decode_payload<T: SessionPayload>(record: &RefreshTokenRecord) -> Result<T, RefreshError> {
    let bytes = base64url_decode(&record.session_payload)?;
    T::from_bytes(&bytes).map_err(|e| {
        tracing::error!(
            "Stored session payload cannot be deserialized: selector={}, error={}",
            record.selector,
            e
        );
        RefreshError::Serialization(e.to_string())
    })
}
