mod errors;
mod main;
mod types;

pub use errors::{CsrfError, DecodeError, SessionError};
pub use main::{
    CookieTransport, HeaderTransport, SessionManager, SessionTransport, TokenCodec,
    ensure_csrf_token, is_state_changing, new_csrf_token, verify_csrf_token,
};
pub use types::{
    CsrfToken, ExtractedTokens, Resolution, SessionOutcome, SessionPayload, SessionResult,
    SlotAction, TransportDirectives, Unauthenticated,
};
