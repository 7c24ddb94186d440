use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::storage::errors::StoreError;
use crate::storage::types::RefreshTokenRecord;

/// In-memory refresh token store, for single-node deployments and tests.
pub struct InMemoryRefreshTokenStore {
    pub(super) entry: Mutex<HashMap<String, RefreshTokenRecord>>,
}

/// Durable storage for refresh token records, keyed by selector.
///
/// Implementations may do network I/O. `compare_and_rotate` must be atomic per
/// selector: of two concurrent calls with the same `expected_sequence`, at most one
/// may succeed.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Initialize the store. This is called when the store is created.
    async fn init(&self) -> Result<(), StoreError>;

    /// Insert a new record. Fails with `Conflict` if the selector is taken.
    async fn create(&self, record: RefreshTokenRecord) -> Result<(), StoreError>;

    /// Look up a record by selector.
    async fn get(&self, selector: &str) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Replace the validator hash and expiry and bump the sequence number, only if
    /// the stored sequence number still equals `expected_sequence`.
    ///
    /// Returns `Conflict` if the record changed or disappeared in the meantime.
    async fn compare_and_rotate(
        &self,
        selector: &str,
        expected_sequence: u64,
        new_validator_hash: String,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Remove a record. Removing a missing record is not an error.
    async fn delete(&self, selector: &str) -> Result<(), StoreError>;

    /// Remove every record issued for the given session key, returning how many.
    async fn delete_all_for_session(&self, session_key: &str) -> Result<usize, StoreError>;

    /// Remove every record expired at `now`, returning how many.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;
}
