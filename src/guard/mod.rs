//! Guard - remembers which tasks were served to which contributor.
//!
//! When a task is handed out it is stamped for the contributor; a later
//! submission can check the stamp to confirm the task was actually
//! requested. Stamps expire on their own.

mod contributions;
mod error;

pub use contributions::{Contributor, ContributionsGuard, GuardSettings, DEFAULT_STAMP_KEY_PREFIX};
pub use error::{GuardError, Result};
