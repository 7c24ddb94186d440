//! Where the session, CSRF and refresh values travel between server and client
//!
//! Both variants expose the same three slots. A slot that is missing or empty on
//! the request is `None`, never an error.

use headers::{Cookie, HeaderMapExt};
use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::config::{CookieConfig, HeaderConfig, SessionConfig, TransportKind};
use crate::session::errors::SessionError;
use crate::session::types::{ExtractedTokens, SlotAction, TransportDirectives};
use crate::utils::{header_remove_cookie, header_set_cookie};

#[derive(Debug, Clone)]
pub enum SessionTransport {
    Cookie(CookieTransport),
    Header(HeaderTransport),
}

#[derive(Debug, Clone)]
pub struct CookieTransport {
    session: CookieConfig,
    csrf: CookieConfig,
    refresh: CookieConfig,
}

#[derive(Debug, Clone)]
pub struct HeaderTransport {
    session: HeaderSlot,
    csrf: HeaderSlot,
    refresh: HeaderSlot,
}

#[derive(Debug, Clone)]
struct HeaderSlot {
    send: HeaderName,
    get: HeaderName,
}

impl HeaderSlot {
    fn new(config: &HeaderConfig) -> Result<Self, SessionError> {
        Ok(Self {
            send: parse_header_name(&config.send_to_client_name)?,
            get: parse_header_name(&config.get_from_client_name)?,
        })
    }
}

pub(crate) fn parse_header_name(name: &str) -> Result<HeaderName, SessionError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| SessionError::Config(format!("Invalid header name: {name}")))
}

impl SessionTransport {
    /// Build the transport variant selected by `config`.
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        match config.transport {
            TransportKind::Cookie => Ok(SessionTransport::Cookie(CookieTransport {
                session: config.session_cookie.clone(),
                csrf: config.csrf_cookie.clone(),
                refresh: config.refresh_cookie.clone(),
            })),
            TransportKind::Header => Ok(SessionTransport::Header(HeaderTransport {
                session: HeaderSlot::new(&config.session_header)?,
                csrf: HeaderSlot::new(&config.csrf_header)?,
                refresh: HeaderSlot::new(&config.refresh_header)?,
            })),
        }
    }

    pub fn extract(&self, headers: &HeaderMap) -> ExtractedTokens {
        match self {
            SessionTransport::Cookie(transport) => transport.extract(headers),
            SessionTransport::Header(transport) => transport.extract(headers),
        }
    }

    /// Write `directives` into response `headers`. `Keep` slots are left alone.
    pub fn apply(
        &self,
        headers: &mut HeaderMap,
        directives: &TransportDirectives,
    ) -> Result<(), SessionError> {
        match self {
            SessionTransport::Cookie(transport) => transport.apply(headers, directives),
            SessionTransport::Header(transport) => transport.apply(headers, directives),
        }
    }
}

impl CookieTransport {
    fn extract(&self, headers: &HeaderMap) -> ExtractedTokens {
        let Some(cookies) = headers.typed_get::<Cookie>() else {
            return ExtractedTokens::default();
        };
        let get = |config: &CookieConfig| {
            cookies
                .get(&config.name)
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };
        ExtractedTokens {
            session: get(&self.session),
            csrf: get(&self.csrf),
            refresh: get(&self.refresh),
        }
    }

    fn apply(
        &self,
        headers: &mut HeaderMap,
        directives: &TransportDirectives,
    ) -> Result<(), SessionError> {
        for (config, action) in [
            (&self.session, &directives.session),
            (&self.csrf, &directives.csrf),
            (&self.refresh, &directives.refresh),
        ] {
            match action {
                SlotAction::Keep => {}
                SlotAction::Set(value) => {
                    header_set_cookie(headers, config, value)?;
                }
                SlotAction::Clear => {
                    header_remove_cookie(headers, config)?;
                }
            }
        }
        Ok(())
    }
}

impl HeaderTransport {
    fn extract(&self, headers: &HeaderMap) -> ExtractedTokens {
        let get = |slot: &HeaderSlot| {
            headers
                .get(&slot.get)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| v.to_string())
        };
        ExtractedTokens {
            session: get(&self.session),
            csrf: get(&self.csrf),
            refresh: get(&self.refresh),
        }
    }

    fn apply(
        &self,
        headers: &mut HeaderMap,
        directives: &TransportDirectives,
    ) -> Result<(), SessionError> {
        for (slot, action) in [
            (&self.session, &directives.session),
            (&self.csrf, &directives.csrf),
            (&self.refresh, &directives.refresh),
        ] {
            let value = match action {
                SlotAction::Keep => continue,
                SlotAction::Set(value) => HeaderValue::from_str(value)
                    .map_err(|_| SessionError::Header("Invalid header value".to_string()))?,
                // An empty value tells the client to drop what it holds
                SlotAction::Clear => HeaderValue::from_static(""),
            };
            headers.insert(slot.send.clone(), value);
        }
        Ok(())
    }
}
