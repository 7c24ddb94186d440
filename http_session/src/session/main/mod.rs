mod codec;
mod csrf;
mod directives;
mod transport;

pub use codec::TokenCodec;
pub use csrf::{ensure_csrf_token, is_state_changing, new_csrf_token, verify_csrf_token};
pub use directives::SessionManager;
pub use transport::{CookieTransport, HeaderTransport, SessionTransport};
