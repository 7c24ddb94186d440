//! Double-submit CSRF protection
//!
//! The CSRF token is an independent random secret. It is never derived from, nor
//! embedded in, the session token.

use http::Method;
use subtle::ConstantTimeEq;

use crate::session::errors::{CsrfError, SessionError};
use crate::session::types::CsrfToken;
use crate::utils::gen_random_string;

/// Random bytes per CSRF token (256 bits)
const CSRF_TOKEN_BYTES: usize = 32;

/// Whether requests with this method must echo the CSRF token.
pub fn is_state_changing(method: &Method) -> bool {
    method == Method::POST
        || method == Method::PUT
        || method == Method::DELETE
        || method == Method::PATCH
}

pub fn new_csrf_token() -> Result<CsrfToken, SessionError> {
    Ok(CsrfToken::new(gen_random_string(CSRF_TOKEN_BYTES)?))
}

/// Return the current token, or issue a new one when there is none.
pub fn ensure_csrf_token(current: Option<CsrfToken>) -> Result<CsrfToken, SessionError> {
    match current {
        Some(token) if !token.as_str().is_empty() => Ok(token),
        _ => new_csrf_token(),
    }
}

/// Compare the token echoed on the request header with the one held by the transport.
///
/// Both must be present and non-empty, and equal under constant-time comparison.
pub fn verify_csrf_token(submitted: Option<&str>, stored: Option<&str>) -> Result<(), CsrfError> {
    let submitted = submitted.filter(|s| !s.is_empty());
    let stored = stored.filter(|s| !s.is_empty());

    let (Some(submitted), Some(stored)) = (submitted, stored) else {
        tracing::debug!("No CSRF token found");
        return Err(CsrfError::Missing);
    };

    if submitted.as_bytes().ct_eq(stored.as_bytes()).into() {
        Ok(())
    } else {
        tracing::debug!("CSRF token mismatch");
        Err(CsrfError::Mismatch)
    }
}
