/// Refresh Token Integration Tests
///
/// Session renewal through refresh tokens, end to end:
/// - An expired session renewed with a rotated refresh token
/// - Replay of a rotated-out refresh token revoking the chain
/// - Concurrent renewals with the same refresh token
/// - Failing closed while the refresh token store is down
use crate::common::{AppError, MockBrowser, OutageStore, TestApp, test_config};
use http_session::{InMemoryRefreshTokenStore, RefreshTokenStore};
use std::sync::Arc;

async fn logged_in() -> (TestApp, Arc<InMemoryRefreshTokenStore>, MockBrowser) {
    let store = Arc::new(InMemoryRefreshTokenStore::new());
    let app = TestApp::refreshable(test_config(), store.clone());
    let mut browser = MockBrowser::new(&test_config());
    app.visit(&mut browser).unwrap();
    app.login(&mut browser, "alice").await.unwrap();
    (app, store, browser)
}

fn selector(raw: &str) -> &str {
    raw.split_once(':').unwrap().0
}

#[tokio::test]
async fn test_expired_session_renewed_by_refresh_token() {
    // Given a logged-in browser whose session token has expired
    let (app, store, mut browser) = logged_in().await;
    let old_refresh = browser.refresh().unwrap().to_string();
    let old_csrf = browser.csrf().unwrap().to_string();
    let expired = app.expired_session_token("alice");
    browser.set_session(&expired);

    // When requesting the current login
    let user = app.current_login(&mut browser).await.unwrap();

    // Then the request succeeds with a renewed session and a rotated refresh token
    assert_eq!(user, "alice");
    assert_ne!(browser.session().unwrap(), expired);
    assert_ne!(browser.refresh().unwrap(), old_refresh);
    assert_eq!(browser.csrf().unwrap(), old_csrf);

    let record = store.get(selector(&old_refresh)).await.unwrap().unwrap();
    assert_eq!(record.sequence_no, 1);

    // And the renewed session token is used directly afterwards
    assert_eq!(app.current_login(&mut browser).await.unwrap(), "alice");
    let record = store.get(selector(&old_refresh)).await.unwrap().unwrap();
    assert_eq!(record.sequence_no, 1);
}

#[tokio::test]
async fn test_replayed_refresh_token_revokes_chain() {
    // Given an attacker holding a copy of the victim's refresh token
    let (app, store, mut victim) = logged_in().await;
    let mut attacker = MockBrowser::new(&test_config());
    attacker.set_refresh(victim.refresh().unwrap());

    // When the victim renews first
    victim.set_session(&app.expired_session_token("alice"));
    assert_eq!(app.current_login(&mut victim).await.unwrap(), "alice");

    // Then the attacker's stale copy is rejected and the chain revoked
    assert!(matches!(
        app.current_login(&mut attacker).await,
        Err(AppError::Unauthorized)
    ));
    assert!(attacker.refresh().is_none());
    assert!(store.is_empty().await);

    // And the victim has to log in again once the session token expires
    victim.set_session(&app.expired_session_token("alice"));
    assert!(matches!(
        app.current_login(&mut victim).await,
        Err(AppError::Unauthorized)
    ));
}

#[tokio::test]
async fn test_concurrent_renewals_single_winner() {
    // Given two tabs sharing an expired session and the same refresh token
    let (app, _store, mut first) = logged_in().await;
    first.set_session(&app.expired_session_token("alice"));
    let mut second = first.clone();

    // When both renew at the same time
    let (a, b) = tokio::join!(app.current_login(&mut first), app.current_login(&mut second));

    // Then exactly one renewal succeeds
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
}

#[tokio::test]
async fn test_one_off_session_ends_at_expiry() {
    let app = TestApp::one_off(test_config());
    let mut browser = MockBrowser::new(&test_config());
    app.visit(&mut browser).unwrap();
    app.login(&mut browser, "alice").await.unwrap();
    assert!(browser.refresh().is_none());

    browser.set_session(&app.expired_session_token("alice"));

    assert!(matches!(
        app.current_login(&mut browser).await,
        Err(AppError::Unauthorized)
    ));
    assert!(browser.session().is_none());
}

#[tokio::test]
async fn test_store_outage_fails_closed() {
    // Given a logged-in browser with an expired session
    let store = Arc::new(OutageStore::default());
    let app = TestApp::refreshable(test_config(), store.clone());
    let mut browser = MockBrowser::new(&test_config());
    app.visit(&mut browser).unwrap();
    app.login(&mut browser, "alice").await.unwrap();
    browser.set_session(&app.expired_session_token("alice"));

    // When the store is down
    store.set_down(true);

    // Then the request is unauthenticated, but the refresh token is kept
    assert!(matches!(
        app.current_login(&mut browser).await,
        Err(AppError::Unauthorized)
    ));
    assert!(browser.refresh().is_some());

    // And once the store is back the session renews
    store.set_down(false);
    browser.set_session(&app.expired_session_token("alice"));
    assert_eq!(app.current_login(&mut browser).await.unwrap(), "alice");
}

#[tokio::test]
async fn test_login_fails_while_store_is_down() {
    let store = Arc::new(OutageStore::default());
    let app = TestApp::refreshable(test_config(), store.clone());
    let mut browser = MockBrowser::new(&test_config());
    app.visit(&mut browser).unwrap();

    store.set_down(true);
    let result = app.login(&mut browser, "alice").await;

    assert!(matches!(result, Err(AppError::Internal(_))));
    assert!(browser.session().is_none());
}
