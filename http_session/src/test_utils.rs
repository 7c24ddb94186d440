//! Test utilities module for shared test initialization and helpers

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::header::{COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE};
use std::sync::{Arc, Once};

use crate::config::SessionConfig;
use crate::storage::{InMemoryRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore, StoreError};

pub(crate) const TEST_SECRET: &str =
    "c05ll3lesrinf39t7mc5h6un6r0c69lgfno69dsak3vabeqamouq4328cuaekros401ajdpkh60rrtpd8ro24rbuqmgtnd1ebag6ljnb65i8a55d482ok7o0nch0bfbe";

/// Initialize tracing once so failing tests show the library's logs
pub(crate) fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub(crate) fn test_config() -> SessionConfig {
    init_test_tracing();
    SessionConfig::new(TEST_SECRET)
}

pub(crate) fn test_store() -> Arc<InMemoryRefreshTokenStore> {
    Arc::new(InMemoryRefreshTokenStore::new())
}

/// Build a request header map with a `Cookie` header made of the given pairs
pub(crate) fn request_with_cookies(cookies: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if cookies.is_empty() {
        return headers;
    }
    let cookie_str = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");
    headers.insert(COOKIE, HeaderValue::from_str(&cookie_str).unwrap());
    headers
}

/// Add a plain header to a request header map
pub(crate) fn with_header(mut headers: HeaderMap, name: &str, value: &str) -> HeaderMap {
    headers.insert(
        HeaderName::from_bytes(name.as_bytes()).unwrap(),
        HeaderValue::from_str(value).unwrap(),
    );
    headers
}

/// Find the `Set-Cookie` header for `name` in a response header map
pub(crate) fn find_set_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with(&format!("{name}=")))
        .map(|c| c.to_string())
}

/// A refresh token store whose backend is down
pub(crate) struct UnavailableStore;

fn down() -> StoreError {
    StoreError::Unavailable("connection refused".to_string())
}

#[async_trait]
impl RefreshTokenStore for UnavailableStore {
    async fn init(&self) -> Result<(), StoreError> {
        Err(down())
    }

    async fn create(&self, _record: RefreshTokenRecord) -> Result<(), StoreError> {
        Err(down())
    }

    async fn get(&self, _selector: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Err(down())
    }

    async fn compare_and_rotate(
        &self,
        _selector: &str,
        _expected_sequence: u64,
        _new_validator_hash: String,
        _new_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        Err(down())
    }

    async fn delete(&self, _selector: &str) -> Result<(), StoreError> {
        Err(down())
    }

    async fn delete_all_for_session(&self, _session_key: &str) -> Result<usize, StoreError> {
        Err(down())
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<usize, StoreError> {
        Err(down())
    }
}
