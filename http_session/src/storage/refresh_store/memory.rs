use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::storage::errors::StoreError;
use crate::storage::types::RefreshTokenRecord;

use super::types::{InMemoryRefreshTokenStore, RefreshTokenStore};

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory refresh token store");
        Self {
            entry: Mutex::new(HashMap::new()),
        }
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.entry.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entry.lock().await.is_empty()
    }
}

impl Default for InMemoryRefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn init(&self) -> Result<(), StoreError> {
        Ok(()) // Nothing to initialize for in-memory store
    }

    async fn create(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        let mut entry = self.entry.lock().await;
        if entry.contains_key(&record.selector) {
            return Err(StoreError::Conflict);
        }
        tracing::debug!("Storing refresh token record: selector={}", record.selector);
        entry.insert(record.selector.clone(), record);
        Ok(())
    }

    async fn get(&self, selector: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(self.entry.lock().await.get(selector).cloned())
    }

    async fn compare_and_rotate(
        &self,
        selector: &str,
        expected_sequence: u64,
        new_validator_hash: String,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        // Check and update happen under one lock acquisition
        let mut entry = self.entry.lock().await;
        match entry.get_mut(selector) {
            Some(record) if record.sequence_no == expected_sequence => {
                record.validator_hash = new_validator_hash;
                record.expires_at = new_expires_at;
                record.sequence_no += 1;
                tracing::debug!(
                    "Rotated refresh token record: selector={}, sequence_no={}",
                    selector,
                    record.sequence_no
                );
                Ok(())
            }
            _ => Err(StoreError::Conflict),
        }
    }

    async fn delete(&self, selector: &str) -> Result<(), StoreError> {
        if self.entry.lock().await.remove(selector).is_some() {
            tracing::debug!("Removed refresh token record: selector={}", selector);
        }
        Ok(())
    }

    async fn delete_all_for_session(&self, session_key: &str) -> Result<usize, StoreError> {
        let mut entry = self.entry.lock().await;
        let before = entry.len();
        entry.retain(|_, record| record.session_key != session_key);
        let removed = before - entry.len();
        tracing::debug!("Removed {} refresh token records for session", removed);
        Ok(removed)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut entry = self.entry.lock().await;
        let before = entry.len();
        entry.retain(|_, record| !record.is_expired_at(now));
        let removed = before - entry.len();
        if removed > 0 {
            tracing::info!("Purged {} expired refresh token records", removed);
        }
        Ok(removed)
    }
}
