//! http_session_axum - Axum integration for http_session
//!
//! Wires a [`SessionManager`] into an Axum router:
//!
//! - [`session_middleware`] / [`csrf_session_middleware`] resolve the session of each
//!   request (renewing it from a refresh token when needed) and write session
//!   changes into the response
//! - [`RequiredSession`] and [`OptionalSession`] extract the session in handlers
//! - [`SessionUpdate`] lets handlers return login, logout or CSRF rotation results

mod error;
mod middleware;
mod session;

pub use error::SessionRejection;
pub use middleware::{csrf_session_middleware, session_middleware};
pub use session::{OptionalSession, RequiredSession, SessionUpdate};

// Re-export what applications need from the core crate
pub use http_session::{
    InMemoryRefreshTokenStore, RefreshTokenStore, SessionConfig, SessionError, SessionManager,
    SessionPayload, TransportDirectives, TransportKind,
};
