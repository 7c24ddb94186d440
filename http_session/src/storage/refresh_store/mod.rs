mod memory;
mod types;

pub use types::{InMemoryRefreshTokenStore, RefreshTokenStore};
