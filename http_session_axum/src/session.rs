use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use http::request::Parts;
use http_session::{SessionPayload, TransportDirectives};
use std::convert::Infallible;

use super::error::SessionRejection;

/// What the session middleware resolved for the current request.
#[derive(Clone)]
pub(crate) struct ResolvedSession<T>(pub(crate) Option<T>);

/// The session of the current request, available as an Axum extractor
///
/// Requires one of the session middlewares on the route. Extraction fails with
/// `401 Unauthorized` when the request has no valid session and no refresh token
/// that could renew it. Use [`OptionalSession`] (or `Option<RequiredSession<T>>`)
/// for routes where a session is optional.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use http_session::{SessionConfig, SessionManager};
/// use http_session_axum::{RequiredSession, session_middleware};
/// use std::sync::Arc;
///
/// async fn whoami(RequiredSession(username): RequiredSession<String>) -> String {
///     username
/// }
///
/// # fn app(config: SessionConfig) -> Router {
/// let manager = Arc::new(SessionManager::<String>::one_off(config).unwrap());
/// Router::new()
///     .route("/whoami", get(whoami))
///     .layer(middleware::from_fn_with_state(
///         manager,
///         session_middleware::<String>,
///     ))
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RequiredSession<T>(pub T);

/// The session of the current request if there is one
#[derive(Clone, Debug)]
pub struct OptionalSession<T>(pub Option<T>);

fn resolved<T: SessionPayload>(parts: &Parts) -> Result<Option<T>, SessionRejection> {
    match parts.extensions.get::<ResolvedSession<T>>() {
        Some(ResolvedSession(session)) => Ok(session.clone()),
        None => {
            tracing::error!("Session extractor used on a route without session middleware");
            Err(SessionRejection::Internal)
        }
    }
}

impl<S, T> FromRequestParts<S> for RequiredSession<T>
where
    S: Send + Sync,
    T: SessionPayload,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match resolved::<T>(parts)? {
            Some(session) => Ok(RequiredSession(session)),
            None => {
                tracing::debug!("No session for {} {}", parts.method, parts.uri.path());
                Err(SessionRejection::Unauthorized)
            }
        }
    }
}

impl<S, T> OptionalFromRequestParts<S> for RequiredSession<T>
where
    S: Send + Sync,
    T: SessionPayload,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(resolved::<T>(parts)?.map(RequiredSession))
    }
}

impl<S, T> FromRequestParts<S> for OptionalSession<T>
where
    S: Send + Sync,
    T: SessionPayload,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolved::<T>(parts).map(OptionalSession)
    }
}

/// Session changes a handler wants written into its response
///
/// Return it alongside the response body, e.g. `(SessionUpdate(directives), "ok")`.
/// The session middleware merges it with its own directives and writes the
/// result through the configured transport.
#[derive(Clone, Debug, Default)]
pub struct SessionUpdate(pub TransportDirectives);

impl IntoResponseParts for SessionUpdate {
    type Error = Infallible;

    fn into_response_parts(self, mut res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        res.extensions_mut().insert(self);
        Ok(res)
    }
}

impl IntoResponse for SessionUpdate {
    fn into_response(self) -> Response {
        (self, ()).into_response()
    }
}
