use serde::{Serialize, de::DeserializeOwned};

use crate::refresh::RefreshError;
use crate::session::errors::{DecodeError, SessionError};

/// Application-defined session data.
///
/// The core never looks inside a payload; it only needs to turn it into bytes and
/// back. Every serde type that is cheap enough to clone gets this for free.
pub trait SessionPayload: Clone + Send + Sync + 'static {
    fn to_bytes(&self) -> Result<Vec<u8>, SessionError>;
    fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError>;
}

impl<T> SessionPayload for T
where
    T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static,
{
    fn to_bytes(&self) -> Result<Vec<u8>, SessionError> {
        serde_json::to_vec(self).map_err(|e| SessionError::Serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, SessionError> {
        serde_json::from_slice(bytes).map_err(|e| SessionError::Serialization(e.to_string()))
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    pub fn new(token: String) -> Self {
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CsrfToken(..)")
    }
}

/// Raw values read from an incoming request, one per transport slot.
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ExtractedTokens {
    pub session: Option<String>,
    pub csrf: Option<String>,
    pub refresh: Option<String>,
}

impl std::fmt::Debug for ExtractedTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractedTokens")
            .field("session", &self.session.is_some())
            .field("csrf", &self.csrf.is_some())
            .field("refresh", &self.refresh.is_some())
            .finish()
    }
}

/// What the response should do with one transport slot.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum SlotAction {
    #[default]
    Keep,
    Set(String),
    Clear,
}

impl SlotAction {
    pub fn is_keep(&self) -> bool {
        matches!(self, SlotAction::Keep)
    }
}

/// Per-slot instructions for the transport when writing a response.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TransportDirectives {
    pub session: SlotAction,
    pub csrf: SlotAction,
    pub refresh: SlotAction,
}

impl TransportDirectives {
    /// Directives that clear every slot.
    pub fn clear_all() -> Self {
        Self {
            session: SlotAction::Clear,
            csrf: SlotAction::Clear,
            refresh: SlotAction::Clear,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.session.is_keep() && self.csrf.is_keep() && self.refresh.is_keep()
    }

    /// Overlay `other` on `self`; slots `other` leaves alone keep their action.
    pub fn merge(mut self, other: TransportDirectives) -> Self {
        if !other.session.is_keep() {
            self.session = other.session;
        }
        if !other.csrf.is_keep() {
            self.csrf = other.csrf;
        }
        if !other.refresh.is_keep() {
            self.refresh = other.refresh;
        }
        self
    }
}

/// Detailed result of looking up the session of a request.
#[derive(Debug, Clone)]
pub enum SessionResult<T> {
    /// The session token was valid
    Decoded(T),
    /// The session token was absent or expired and a refresh token renewed it
    CreatedFromToken(T),
    /// Neither a session token nor a refresh token was presented
    NoSession,
    /// The session token expired and no refresh was possible
    Expired,
    /// The session token failed its integrity checks
    Corrupt(DecodeError),
    /// A refresh token was presented but rejected
    RefreshFailed(RefreshError),
    /// The refresh token store could not be consulted; treated as no session
    StoreUnavailable,
}

impl<T> SessionResult<T> {
    /// Short name of the variant, safe to log.
    pub fn label(&self) -> &'static str {
        match self {
            SessionResult::Decoded(_) => "decoded",
            SessionResult::CreatedFromToken(_) => "created_from_token",
            SessionResult::NoSession => "no_session",
            SessionResult::Expired => "expired",
            SessionResult::Corrupt(_) => "corrupt",
            SessionResult::RefreshFailed(_) => "refresh_failed",
            SessionResult::StoreUnavailable => "store_unavailable",
        }
    }

    pub fn session(&self) -> Option<&T> {
        match self {
            SessionResult::Decoded(session) | SessionResult::CreatedFromToken(session) => {
                Some(session)
            }
            _ => None,
        }
    }

    pub fn into_session(self) -> Option<T> {
        match self {
            SessionResult::Decoded(session) | SessionResult::CreatedFromToken(session) => {
                Some(session)
            }
            _ => None,
        }
    }
}

/// Outcome of session resolution, plus what the response has to carry.
#[derive(Debug, Clone)]
pub enum SessionOutcome<T> {
    Active {
        session: T,
        directives: TransportDirectives,
    },
    Unauthenticated {
        directives: TransportDirectives,
    },
}

impl<T> SessionOutcome<T> {
    pub fn session(&self) -> Option<&T> {
        match self {
            SessionOutcome::Active { session, .. } => Some(session),
            SessionOutcome::Unauthenticated { .. } => None,
        }
    }

    pub fn directives(&self) -> &TransportDirectives {
        match self {
            SessionOutcome::Active { directives, .. }
            | SessionOutcome::Unauthenticated { directives } => directives,
        }
    }

    pub fn into_parts(self) -> (Option<T>, TransportDirectives) {
        match self {
            SessionOutcome::Active {
                session,
                directives,
            } => (Some(session), directives),
            SessionOutcome::Unauthenticated { directives } => (None, directives),
        }
    }
}

/// A request required a session and had none.
///
/// Carries what the rejection response still has to do to the transport, e.g.
/// clearing a corrupt session slot.
#[derive(Debug, Clone, Default)]
pub struct Unauthenticated {
    pub directives: TransportDirectives,
}

/// Full resolution of a request's session.
#[derive(Debug, Clone)]
pub struct Resolution<T> {
    pub result: SessionResult<T>,
    pub directives: TransportDirectives,
}

impl<T> Resolution<T> {
    pub fn is_active(&self) -> bool {
        self.result.session().is_some()
    }

    pub fn into_outcome(self) -> SessionOutcome<T> {
        let directives = self.directives;
        match self.result.into_session() {
            Some(session) => SessionOutcome::Active {
                session,
                directives,
            },
            None => SessionOutcome::Unauthenticated { directives },
        }
    }
}
