//! Lock - store-backed slot limiting and presence tracking.
//!
//! Both structures are one hash per resource mapping a holder to the
//! absolute time its entry expires. Expired entries are reaped lazily on
//! the next counting read; the hash itself carries an expiration so an
//! abandoned resource never lingers.
//!
//! ## Example
//!
//! ```ignore
//! use slot_gate::{InMemoryStore, LockSettings, ResourceLockManager, SystemClock};
//!
//! let locks = ResourceLockManager::new(InMemoryStore::new(), Arc::new(SystemClock), LockSettings::default());
//! if locks.acquire("task:7", "user:42", 2).await? {
//!     // serve the task
//!     locks.release("task:7", "user:42").await?;
//! } else {
//!     // offer another task
//! }
//! ```

mod error;
mod manager;
mod registry;
pub(crate) mod table;

pub use error::{LockError, Result};
pub use manager::{LockSettings, ResourceLockManager};
pub use registry::{ActiveHolderRegistry, DEFAULT_ACTIVE_KEY_PREFIX};
