use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_session::{SessionManager, SessionPayload, TransportDirectives};
use std::sync::Arc;

use super::error::SessionRejection;
use super::session::{ResolvedSession, SessionUpdate};

/// Resolve the session of every request and write session changes into responses.
///
/// Makes [`RequiredSession`](crate::RequiredSession) and
/// [`OptionalSession`](crate::OptionalSession) available to handlers. Directives from the
/// resolution (renewal, clearing a bad token) and any [`SessionUpdate`] the
/// handler returns are merged and written once, after the handler ran.
///
/// Install with `axum::middleware::from_fn_with_state(manager, session_middleware::<T>)`.
pub async fn session_middleware<T: SessionPayload>(
    State(manager): State<Arc<SessionManager<T>>>,
    req: Request,
    next: Next,
) -> Response {
    run(&manager, false, req, next).await
}

/// Like [`session_middleware`], with double-submit CSRF protection in front.
///
/// State-changing requests that do not echo the CSRF token are answered with
/// `403 Forbidden` before the session is looked at. Safe requests get a CSRF
/// token issued when the client holds none.
pub async fn csrf_session_middleware<T: SessionPayload>(
    State(manager): State<Arc<SessionManager<T>>>,
    req: Request,
    next: Next,
) -> Response {
    run(&manager, true, req, next).await
}

async fn run<T: SessionPayload>(
    manager: &SessionManager<T>,
    check_csrf: bool,
    mut req: Request,
    next: Next,
) -> Response {
    let csrf = if check_csrf {
        match manager.csrf_protection(req.method(), req.headers()) {
            Ok(directives) => directives,
            Err(e) => return SessionRejection::from(e).into_response(),
        }
    } else {
        TransportDirectives::default()
    };

    let resolution = manager.resolve(req.headers()).await;
    tracing::debug!(
        "Session for {} {}: {}",
        req.method(),
        req.uri().path(),
        resolution.result.label()
    );
    let (session, resolved) = resolution.into_outcome().into_parts();
    req.extensions_mut().insert(ResolvedSession(session));

    let mut response = next.run(req).await;

    let mut directives = csrf.merge(resolved);
    if let Some(SessionUpdate(update)) = response.extensions_mut().remove::<SessionUpdate>() {
        directives = directives.merge(update);
    }
    if directives.is_empty() {
        return response;
    }

    match manager.apply(response.headers_mut(), &directives) {
        Ok(()) => response,
        Err(e) => SessionRejection::from(e).into_response(),
    }
}
