//! Per-request session decisions
//!
//! [`SessionManager`] ties the codec, the transport, the CSRF guard and the
//! refresh token manager together. Every operation returns the
//! [`TransportDirectives`] the response has to carry; nothing here touches a
//! response directly.

use chrono::Utc;
use http::{HeaderMap, HeaderName, Method};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::SessionConfig;
use crate::refresh::{RefreshError, RefreshTokenManager};
use crate::session::errors::SessionError;
use crate::session::types::{
    CsrfToken, ExtractedTokens, Resolution, SessionPayload, SessionResult, SlotAction,
    TransportDirectives, Unauthenticated,
};
use crate::storage::RefreshTokenStore;

use super::codec::TokenCodec;
use super::csrf::{ensure_csrf_token, is_state_changing, new_csrf_token, verify_csrf_token};
use super::transport::{SessionTransport, parse_header_name};

pub struct SessionManager<T> {
    config: SessionConfig,
    codec: TokenCodec,
    transport: SessionTransport,
    csrf_submitted: HeaderName,
    refresh: Option<RefreshTokenManager>,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            codec: self.codec.clone(),
            transport: self.transport.clone(),
            csrf_submitted: self.csrf_submitted.clone(),
            refresh: self.refresh.clone(),
            _payload: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("refreshable", &self.refresh.is_some())
            .finish_non_exhaustive()
    }
}

impl<T: SessionPayload> SessionManager<T> {
    /// Sessions that end when the session token expires.
    pub fn one_off(config: SessionConfig) -> Result<Self, SessionError> {
        Self::build(config, None)
    }

    /// Sessions that outlive their session token through rotating refresh tokens
    /// kept in `store`.
    pub fn refreshable(
        config: SessionConfig,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, SessionError> {
        let refresh = RefreshTokenManager::new(store, config.refresh_token_max_age);
        Self::build(config, Some(refresh))
    }

    fn build(
        config: SessionConfig,
        refresh: Option<RefreshTokenManager>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        let codec = TokenCodec::new(&config);
        let transport = SessionTransport::new(&config)?;
        let csrf_submitted = parse_header_name(&config.csrf_submitted_name)?;

        tracing::info!(
            "Session manager configured: transport={:?}, encrypted={}, refreshable={}",
            config.transport,
            config.encrypt_data,
            refresh.is_some()
        );

        Ok(Self {
            config,
            codec,
            transport,
            csrf_submitted,
            refresh,
            _payload: PhantomData,
        })
    }

    /// Initialize the refresh token store, if any.
    pub async fn init(&self) -> Result<(), SessionError> {
        if let Some(refresh) = &self.refresh {
            refresh.store().init().await?;
        }
        Ok(())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn refresh_tokens(&self) -> Option<&RefreshTokenManager> {
        self.refresh.as_ref()
    }

    pub fn is_refreshable(&self) -> bool {
        self.refresh.is_some()
    }

    pub fn extract(&self, headers: &HeaderMap) -> ExtractedTokens {
        self.transport.extract(headers)
    }

    fn session_expires_at(&self) -> Option<i64> {
        self.config.session_max_age.map(|max_age| {
            Utc::now()
                .timestamp()
                .saturating_add(i64::try_from(max_age).unwrap_or(i64::MAX))
        })
    }

    fn encode(&self, payload: &T) -> Result<String, SessionError> {
        self.codec.encode(payload, self.session_expires_at())
    }

    /// Decide whether the request carries a session, falling back to the refresh
    /// token when the session token is absent or expired.
    pub async fn resolve(&self, headers: &HeaderMap) -> Resolution<T> {
        let tokens = self.transport.extract(headers);
        let mut directives = TransportDirectives::default();

        let expired = match tokens.session.as_deref() {
            Some(raw) => match self.codec.decode::<T>(raw) {
                Ok(session) => {
                    return Resolution {
                        result: SessionResult::Decoded(session),
                        directives,
                    };
                }
                Err(e) if e.allows_refresh() => true,
                Err(e) => {
                    // Tampering never falls through to the refresh token
                    tracing::warn!("Rejecting session token: {}", e);
                    directives.session = SlotAction::Clear;
                    return Resolution {
                        result: SessionResult::Corrupt(e),
                        directives,
                    };
                }
            },
            None => false,
        };

        let (Some(refresh), Some(raw_refresh)) = (&self.refresh, tokens.refresh.as_deref()) else {
            let result = if expired {
                directives.session = SlotAction::Clear;
                SessionResult::Expired
            } else {
                SessionResult::NoSession
            };
            return Resolution { result, directives };
        };

        match refresh.redeem::<T>(raw_refresh).await {
            Ok((session, next)) => {
                directives.refresh = SlotAction::Set(next.to_raw_string());
                match self.encode(&session) {
                    Ok(token) => {
                        tracing::debug!("Session renewed from refresh token");
                        directives.session = SlotAction::Set(token);
                        Resolution {
                            result: SessionResult::CreatedFromToken(session),
                            directives,
                        }
                    }
                    Err(e) => {
                        tracing::error!("Failed to encode renewed session token: {}", e);
                        Resolution {
                            result: SessionResult::RefreshFailed(
                                RefreshError::Serialization(e.to_string()),
                            ),
                            directives,
                        }
                    }
                }
            }
            Err(e) if e.is_unavailable() => {
                tracing::error!("Refresh token store unavailable, failing closed: {}", e);
                Resolution {
                    result: SessionResult::StoreUnavailable,
                    directives,
                }
            }
            Err(e) => {
                tracing::debug!("Refresh token rejected: {}", e);
                directives.refresh = SlotAction::Clear;
                if expired {
                    directives.session = SlotAction::Clear;
                }
                Resolution {
                    result: SessionResult::RefreshFailed(e),
                    directives,
                }
            }
        }
    }

    /// The session if there is one.
    pub async fn optional_session(&self, headers: &HeaderMap) -> (Option<T>, TransportDirectives) {
        self.resolve(headers).await.into_outcome().into_parts()
    }

    /// The session, or a rejection carrying the directives for the error response.
    pub async fn required_session(
        &self,
        headers: &HeaderMap,
    ) -> Result<(T, TransportDirectives), Unauthenticated> {
        match self.optional_session(headers).await {
            (Some(session), directives) => Ok((session, directives)),
            (None, directives) => Err(Unauthenticated { directives }),
        }
    }

    /// Log in: set a new session for `payload`.
    ///
    /// Issues a new refresh token chain when refreshable, revoking the one the
    /// request presented, and always rotates the CSRF token.
    pub async fn set_session(
        &self,
        request: &HeaderMap,
        payload: &T,
    ) -> Result<TransportDirectives, SessionError> {
        let mut directives = TransportDirectives {
            session: SlotAction::Set(self.encode(payload)?),
            ..Default::default()
        };

        if let Some(refresh) = &self.refresh {
            if let Some(previous) = self.transport.extract(request).refresh {
                if let Err(e) = refresh.revoke_presented(&previous).await {
                    tracing::warn!("Failed to revoke previous refresh token: {}", e);
                }
            }
            let token = refresh.issue(payload).await?;
            directives.refresh = SlotAction::Set(token.to_raw_string());
        }

        directives.csrf = SlotAction::Set(new_csrf_token()?.as_str().to_string());
        tracing::debug!("Session set");
        Ok(directives)
    }

    /// Re-issue the session token of an active session with a fresh expiry.
    pub fn touch_session(&self, payload: &T) -> Result<TransportDirectives, SessionError> {
        Ok(TransportDirectives {
            session: SlotAction::Set(self.encode(payload)?),
            ..Default::default()
        })
    }

    /// Log out: revoke the presented refresh token and clear every slot.
    ///
    /// Only a currently valid refresh token is revoked; a bare or forged selector
    /// leaves the chain it names alone.
    ///
    /// A store failure during revocation is logged; the client side is cleared
    /// regardless.
    pub async fn invalidate_session(&self, request: &HeaderMap) -> TransportDirectives {
        if let (Some(refresh), Some(raw)) = (&self.refresh, self.transport.extract(request).refresh)
        {
            if let Err(e) = refresh.revoke_presented(&raw).await {
                tracing::error!("Failed to revoke refresh token on logout: {}", e);
            }
        }
        tracing::debug!("Session invalidated");
        TransportDirectives::clear_all()
    }

    /// Double-submit CSRF check for one request.
    ///
    /// State-changing methods must echo the token held by the transport on the
    /// submitted-token header. Safe methods pass and get a token issued if the
    /// transport holds none.
    pub fn csrf_protection(
        &self,
        method: &Method,
        headers: &HeaderMap,
    ) -> Result<TransportDirectives, SessionError> {
        let stored = self.transport.extract(headers).csrf;

        if is_state_changing(method) {
            let submitted = headers
                .get(&self.csrf_submitted)
                .and_then(|v| v.to_str().ok());
            verify_csrf_token(submitted, stored.as_deref()).inspect_err(|e| {
                tracing::warn!("CSRF check failed for {} request: {}", method, e);
            })?;
            return Ok(TransportDirectives::default());
        }

        let had_token = stored.is_some();
        let token = ensure_csrf_token(stored.map(CsrfToken::new))?;
        if had_token {
            Ok(TransportDirectives::default())
        } else {
            Ok(TransportDirectives {
                csrf: SlotAction::Set(token.as_str().to_string()),
                ..Default::default()
            })
        }
    }

    /// Rotate the CSRF token.
    pub fn set_new_csrf_token(&self) -> Result<TransportDirectives, SessionError> {
        Ok(TransportDirectives {
            csrf: SlotAction::Set(new_csrf_token()?.as_str().to_string()),
            ..Default::default()
        })
    }

    /// Write `directives` into response headers.
    pub fn apply(
        &self,
        headers: &mut HeaderMap,
        directives: &TransportDirectives,
    ) -> Result<(), SessionError> {
        self.transport.apply(headers, directives)
    }

    /// Fresh response headers carrying `directives`.
    pub fn response_headers(
        &self,
        directives: &TransportDirectives,
    ) -> Result<HeaderMap, SessionError> {
        let mut headers = HeaderMap::new();
        self.apply(&mut headers, directives)?;
        Ok(headers)
    }
}
