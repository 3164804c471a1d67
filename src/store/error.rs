use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for store operations.
///
/// Components never retry on these; they surface unchanged to the caller.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached, or the connection dropped mid-call.
    #[error("store connection failed: {0}")]
    Connection(#[source] BoxError),

    /// The store answered with an error.
    #[error("store command failed: {0}")]
    Command(#[source] BoxError),

    /// The key holds a value of another type than the operation expects.
    #[error("wrong type for key {key}: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("in-memory store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// True when retrying later might succeed.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Connection(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Connection(Box::new(err))
        } else {
            StoreError::Command(Box::new(err))
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
