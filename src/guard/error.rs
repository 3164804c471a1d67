use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum GuardError {
    /// The contributor has neither an external uid, a user id nor an ip.
    #[error("contributor has no identity to stamp")]
    AnonymousContributor,

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, GuardError>;
