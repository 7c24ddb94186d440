//! http_session - Stateless signed sessions, CSRF protection and rotating refresh tokens
//!
//! The crate is framework-agnostic: it reads request `http::HeaderMap`s and
//! produces [`TransportDirectives`] that an adapter writes into responses.
//!
//! - [`TokenCodec`] signs (and optionally encrypts) session payloads
//! - [`SessionTransport`] moves values over cookies or custom headers
//! - the CSRF functions implement the double-submit pattern
//! - [`RefreshTokenManager`] runs the selector/validator refresh token lifecycle on
//!   top of a pluggable [`RefreshTokenStore`]
//! - [`SessionManager`] combines all of the above per request

mod config;
mod refresh;
mod session;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{
    CookieConfig, HeaderConfig, MIN_SERVER_SECRET_LEN, SameSite, SessionConfig, TransportKind,
};

pub use refresh::{RawRefreshToken, RefreshError, RefreshTokenManager};

pub use session::{
    CookieTransport, CsrfError, CsrfToken, DecodeError, ExtractedTokens, HeaderTransport,
    Resolution, SessionError, SessionManager, SessionOutcome, SessionPayload, SessionResult,
    SessionTransport, SlotAction, TokenCodec, TransportDirectives, Unauthenticated,
    ensure_csrf_token, is_state_changing, new_csrf_token, verify_csrf_token,
};

pub use storage::{InMemoryRefreshTokenStore, RefreshTokenRecord, RefreshTokenStore, StoreError};

pub use utils::{UtilError, gen_random_string};
