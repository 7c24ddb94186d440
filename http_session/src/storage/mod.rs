mod errors;
mod refresh_store;
mod types;

pub use errors::StoreError;
pub use refresh_store::{InMemoryRefreshTokenStore, RefreshTokenStore};
pub use types::RefreshTokenRecord;
