use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::header::{HeaderMap, SET_COOKIE};
use ring::rand::SecureRandom;
use thiserror::Error;

use crate::config::{CookieConfig, SameSite};

#[derive(Debug, Error, Clone)]
pub enum UtilError {
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Cookie error: {0}")]
    Cookie(String),

    #[error("Invalid format: {0}")]
    Format(String),
}

pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, UtilError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(input)
        .map_err(|_| UtilError::Format("Failed to decode base64url".to_string()))?;
    Ok(decoded)
}

pub(crate) fn base64url_encode(input: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(input)
}

pub(crate) fn gen_random_bytes(len: usize) -> Result<Vec<u8>, UtilError> {
    let rng = ring::rand::SystemRandom::new();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| UtilError::Crypto("Failed to generate random bytes".to_string()))?;
    Ok(bytes)
}

/// Generate `len` random bytes and return them base64url encoded.
pub fn gen_random_string(len: usize) -> Result<String, UtilError> {
    let bytes = gen_random_bytes(len)?;
    Ok(base64url_encode(&bytes))
}

/// Append a `Set-Cookie` header carrying `value` with the attributes of `config`.
pub(crate) fn header_set_cookie<'a>(
    headers: &'a mut HeaderMap,
    config: &CookieConfig,
    value: &str,
) -> Result<&'a HeaderMap, UtilError> {
    let mut cookie = format!("{}={}; Path={}", config.name, value, config.path);
    if let Some(domain) = &config.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    if let Some(max_age) = config.max_age {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    push_flags(&mut cookie, config);

    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}

/// Append a `Set-Cookie` header that makes the browser drop the cookie.
pub(crate) fn header_remove_cookie<'a>(
    headers: &'a mut HeaderMap,
    config: &CookieConfig,
) -> Result<&'a HeaderMap, UtilError> {
    let mut cookie = format!(
        "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
        config.name, config.path
    );
    if let Some(domain) = &config.domain {
        cookie.push_str(&format!("; Domain={domain}"));
    }
    push_flags(&mut cookie, config);

    headers.append(
        SET_COOKIE,
        cookie
            .parse()
            .map_err(|_| UtilError::Cookie("Failed to parse cookie".to_string()))?,
    );
    Ok(headers)
}

fn push_flags(cookie: &mut String, config: &CookieConfig) {
    match config.same_site {
        SameSite::Strict => cookie.push_str("; SameSite=Strict"),
        SameSite::Lax => cookie.push_str("; SameSite=Lax"),
        SameSite::None => cookie.push_str("; SameSite=None"),
    }
    if config.secure {
        cookie.push_str("; Secure");
    }
    if config.http_only {
        cookie.push_str("; HttpOnly");
    }
}
