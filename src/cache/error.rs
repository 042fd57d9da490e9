use thiserror::Error;

/// Errors returned by cache operations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CacheError {
    /// The key was empty.
    #[error("invalid key")]
    InvalidKey,
}
