use thiserror::Error;

use crate::store::StoreError;

/// Error type for lock and presence operations.
///
/// A denied `acquire` is not an error; it is `Ok(false)`.
#[derive(Debug, Error)]
pub enum LockError {
    /// Malformed input, rejected before any store call.
    #[error("invalid lock input: {0}")]
    InvalidInput(&'static str),

    /// The shared store failed; surfaced unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LockError>;
