use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::{HeaderMap, Method};
use http_session::{
    InMemoryRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore, SessionConfig, SessionError,
    SessionManager, StoreError, TransportDirectives,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::mock_browser::MockBrowser;

pub const TEST_SECRET: &str =
    "c05ll3lesrinf39t7mc5h6un6r0c69lgfno69dsak3vabeqamouq4328cuaekros401ajdpkh60rrtpd8ro24rbuqmgtnd1ebag6ljnb65i8a55d482ok7o0nch0bfbe";

pub fn test_config() -> SessionConfig {
    SessionConfig::new(TEST_SECRET)
}

/// How a request to the test application was turned down
#[derive(Debug)]
pub enum AppError {
    /// CSRF check failed
    Forbidden,
    /// A session was required and there was none
    Unauthorized,
    Internal(SessionError),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Csrf(_) => AppError::Forbidden,
            e => AppError::Internal(e),
        }
    }
}

/// In-memory store that can be switched into an outage
#[derive(Default)]
pub struct OutageStore {
    inner: InMemoryRefreshTokenStore,
    down: AtomicBool,
}

impl OutageStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RefreshTokenStore for OutageStore {
    async fn init(&self) -> Result<(), StoreError> {
        self.check()
    }

    async fn create(&self, record: RefreshTokenRecord) -> Result<(), StoreError> {
        self.check()?;
        self.inner.create(record).await
    }

    async fn get(&self, selector: &str) -> Result<Option<RefreshTokenRecord>, StoreError> {
        self.check()?;
        self.inner.get(selector).await
    }

    async fn compare_and_rotate(
        &self,
        selector: &str,
        expected_sequence: u64,
        new_validator_hash: String,
        new_expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check()?;
        self.inner
            .compare_and_rotate(selector, expected_sequence, new_validator_hash, new_expires_at)
            .await
    }

    async fn delete(&self, selector: &str) -> Result<(), StoreError> {
        self.check()?;
        self.inner.delete(selector).await
    }

    async fn delete_all_for_session(&self, session_key: &str) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.delete_all_for_session(session_key).await
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        self.check()?;
        self.inner.purge_expired(now).await
    }
}

/// The login / logout / current_login application, minus the HTTP server
///
/// Each method runs one request from `browser` through the session manager the
/// way a web framework adapter would, and hands the response headers back to the
/// browser.
pub struct TestApp {
    pub manager: SessionManager<String>,
}

impl TestApp {
    pub fn one_off(config: SessionConfig) -> Self {
        Self {
            manager: SessionManager::one_off(config).unwrap(),
        }
    }

    pub fn refreshable(config: SessionConfig, store: Arc<dyn RefreshTokenStore>) -> Self {
        Self {
            manager: SessionManager::refreshable(config, store).unwrap(),
        }
    }

    fn respond(&self, browser: &mut MockBrowser, directives: &TransportDirectives) {
        let response = self.manager.response_headers(directives).unwrap();
        browser.receive(&response);
    }

    /// GET of a page: issues a CSRF token on first visit
    pub fn visit(&self, browser: &mut MockBrowser) -> Result<(), AppError> {
        let request = browser.request_headers();
        let directives = self.manager.csrf_protection(&Method::GET, &request)?;
        self.respond(browser, &directives);
        Ok(())
    }

    /// POST /api/do_login
    pub async fn login(&self, browser: &mut MockBrowser, username: &str) -> Result<(), AppError> {
        let request = browser.request_headers_with_csrf();
        self.login_with(browser, &request, username).await
    }

    pub async fn login_with(
        &self,
        browser: &mut MockBrowser,
        request: &HeaderMap,
        username: &str,
    ) -> Result<(), AppError> {
        let csrf = self.manager.csrf_protection(&Method::POST, request)?;
        let login = self
            .manager
            .set_session(request, &username.to_string())
            .await?;
        self.respond(browser, &csrf.merge(login));
        Ok(())
    }

    /// POST /api/do_logout
    pub async fn logout(&self, browser: &mut MockBrowser) -> Result<(), AppError> {
        let request = browser.request_headers_with_csrf();
        self.logout_with(browser, &request).await
    }

    pub async fn logout_with(
        &self,
        browser: &mut MockBrowser,
        request: &HeaderMap,
    ) -> Result<(), AppError> {
        let csrf = self.manager.csrf_protection(&Method::POST, request)?;
        let (_session, _) = match self.manager.required_session(request).await {
            Ok(active) => active,
            Err(rejection) => {
                self.respond(browser, &csrf.merge(rejection.directives));
                return Err(AppError::Unauthorized);
            }
        };
        let logout = self.manager.invalidate_session(request).await;
        self.respond(browser, &csrf.merge(logout));
        Ok(())
    }

    /// GET /api/current_login
    pub async fn current_login(&self, browser: &mut MockBrowser) -> Result<String, AppError> {
        let request = browser.request_headers();
        let csrf = self.manager.csrf_protection(&Method::GET, &request)?;
        match self.manager.required_session(&request).await {
            Ok((session, directives)) => {
                self.respond(browser, &csrf.merge(directives));
                Ok(session)
            }
            Err(rejection) => {
                self.respond(browser, &csrf.merge(rejection.directives));
                Err(AppError::Unauthorized)
            }
        }
    }

    /// A session token for `username` that expired ten seconds ago
    pub fn expired_session_token(&self, username: &str) -> String {
        self.manager
            .codec()
            .encode(&username.to_string(), Some(Utc::now().timestamp() - 10))
            .unwrap()
    }
}
