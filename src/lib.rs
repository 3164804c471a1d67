//! slot_gate - distributed concurrency gate over a shared key-value store.
//!
//! Request handlers running in any number of processes coordinate through
//! the store alone:
//!
//! - [`ResourceLockManager`]: at most N concurrent holders per resource,
//!   released by expiry.
//! - [`ActiveHolderRegistry`]: who is currently active on a resource.
//! - [`ContributionsGuard`]: which tasks were served to which contributor.
//! - [`RateLimiter`]: fixed-window request counting, with an axum
//!   middleware behind the `http` feature.
//!
//! Every component takes its store and clock at construction; nothing
//! reaches for a global connection.

pub mod clock;
pub mod config;
mod gate;
pub mod guard;
pub mod lock;
pub mod ratelimit;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, ConfigError};
pub use gate::Gate;
#[cfg(feature = "http")]
pub use gate::rate_limit_gate;
pub use guard::{Contributor, ContributionsGuard, GuardError, GuardSettings};
pub use lock::{ActiveHolderRegistry, LockError, LockSettings, ResourceLockManager};
pub use ratelimit::{
    window_id, ErrorEnvelope, RateLimit, RateLimitError, RateLimitPolicy, RateLimitSettings,
    RateLimiter,
};
#[cfg(feature = "http")]
pub use ratelimit::{rate_limited, GatePolicy, Identity, IpScope, RateLimitGate};
#[cfg(feature = "redis")]
pub use store::RedisStore;
pub use store::{InMemoryStore, Store, StoreError};
