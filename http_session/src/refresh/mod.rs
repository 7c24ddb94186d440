mod errors;
mod manager;
mod types;

pub use errors::RefreshError;
pub use manager::RefreshTokenManager;
pub use types::RawRefreshToken;
