use axum::response::{IntoResponse, Response};
use http::StatusCode;
use http_session::SessionError;

/// Why a request was turned away.
///
/// The response body never says which check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRejection {
    /// No valid session
    Unauthorized,
    /// CSRF check failed
    Forbidden,
    /// Session layer missing or misconfigured, or the session could not be written
    Internal,
}

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        match self {
            SessionRejection::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
            }
            SessionRejection::Forbidden => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
            SessionRejection::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}

impl From<SessionError> for SessionRejection {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Csrf(e) => {
                tracing::debug!("CSRF rejection: {}", e);
                SessionRejection::Forbidden
            }
            e => {
                tracing::error!("Session error: {}", e);
                SessionRejection::Internal
            }
        }
    }
}
