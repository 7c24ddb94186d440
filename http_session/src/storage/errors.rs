use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing store could not be reached or failed the operation
    #[error("Refresh token store unavailable: {0}")]
    Unavailable(String),

    /// A conditional write lost against a concurrent one
    #[error("Concurrent modification of refresh token record")]
    Conflict,
}
