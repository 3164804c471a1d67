//! Config - recognized options and their environment variables.
//!
//! | Variable | Default |
//! |---|---|
//! | `SLOT_GATE_REDIS_URL` | unset (rate limiting bypassed) |
//! | `SLOT_GATE_LOCK_DURATION` | 600 |
//! | `SLOT_GATE_RELEASE_GRACE` | 5 |
//! | `SLOT_GATE_RATE_LIMIT` | 300 |
//! | `SLOT_GATE_RATE_PERIOD` | 900 |
//! | `SLOT_GATE_RATE_EXPIRATION_WINDOW` | 10 |
//! | `SLOT_GATE_ADMIN_RATE_MULTIPLIER` | 1 |
//! | `SLOT_GATE_RATE_LIMIT_BY_USER_ID` | false |
//! | `SLOT_GATE_RATE_LIMIT_HEADERS` | true |
//! | `SLOT_GATE_ACTIVE_HOLDER_TTL` | 7200 |
//! | `SLOT_GATE_STAMP_TTL` | 3600 |
//!
//! Durations are whole seconds.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::guard::{GuardSettings, DEFAULT_STAMP_KEY_PREFIX};
use crate::lock::{LockSettings, DEFAULT_ACTIVE_KEY_PREFIX};
use crate::ratelimit::{RateLimitPolicy, RateLimitSettings, DEFAULT_KEY_PREFIX};

const ENV_PREFIX: &str = "SLOT_GATE_";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Store endpoint. `None` disables rate limiting entirely.
    pub redis_url: Option<String>,
    pub lock_duration_secs: u64,
    pub release_grace_secs: u64,
    pub rate_limit: u64,
    pub rate_period_secs: u64,
    pub rate_expiration_window_secs: u64,
    pub admin_rate_multiplier: u64,
    pub rate_limit_by_user_id: bool,
    pub rate_limit_headers: bool,
    pub active_holder_ttl_secs: u64,
    pub stamp_ttl_secs: u64,
    pub rate_limit_key_prefix: String,
    pub active_key_prefix: String,
    pub stamp_key_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        let rate = RateLimitPolicy::default();
        Self {
            redis_url: None,
            lock_duration_secs: 600,
            release_grace_secs: 5,
            rate_limit: rate.limit,
            rate_period_secs: rate.period.as_secs(),
            rate_expiration_window_secs: 10,
            admin_rate_multiplier: 1,
            rate_limit_by_user_id: false,
            rate_limit_headers: true,
            active_holder_ttl_secs: 2 * 60 * 60,
            stamp_ttl_secs: 60 * 60,
            rate_limit_key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            active_key_prefix: DEFAULT_ACTIVE_KEY_PREFIX.to_string(),
            stamp_key_prefix: DEFAULT_STAMP_KEY_PREFIX.to_string(),
        }
    }
}

impl Config {
    /// Load from `SLOT_GATE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve full variable names.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let loader = Loader { lookup: &lookup };

        let redis_url = loader
            .raw("REDIS_URL")
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        if redis_url.is_none() {
            warn!("{ENV_PREFIX}REDIS_URL not set, rate limiting will be bypassed");
        }

        let config = Self {
            redis_url,
            lock_duration_secs: loader.load("LOCK_DURATION", defaults.lock_duration_secs)?,
            release_grace_secs: loader.load("RELEASE_GRACE", defaults.release_grace_secs)?,
            rate_limit: loader.load("RATE_LIMIT", defaults.rate_limit)?,
            rate_period_secs: loader.load("RATE_PERIOD", defaults.rate_period_secs)?,
            rate_expiration_window_secs: loader
                .load("RATE_EXPIRATION_WINDOW", defaults.rate_expiration_window_secs)?,
            admin_rate_multiplier: loader
                .load("ADMIN_RATE_MULTIPLIER", defaults.admin_rate_multiplier)?,
            rate_limit_by_user_id: loader
                .load("RATE_LIMIT_BY_USER_ID", defaults.rate_limit_by_user_id)?,
            rate_limit_headers: loader.load("RATE_LIMIT_HEADERS", defaults.rate_limit_headers)?,
            active_holder_ttl_secs: loader
                .load("ACTIVE_HOLDER_TTL", defaults.active_holder_ttl_secs)?,
            stamp_ttl_secs: loader.load("STAMP_TTL", defaults.stamp_ttl_secs)?,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components can't work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("LOCK_DURATION", self.lock_duration_secs),
            ("RATE_PERIOD", self.rate_period_secs),
            ("ACTIVE_HOLDER_TTL", self.active_holder_ttl_secs),
            ("STAMP_TTL", self.stamp_ttl_secs),
            ("ADMIN_RATE_MULTIPLIER", self.admin_rate_multiplier),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    key: format!("{ENV_PREFIX}{key}"),
                    value: value.to_string(),
                    reason: "must be at least 1".into(),
                });
            }
        }
        Ok(())
    }

    pub fn lock_settings(&self) -> LockSettings {
        LockSettings {
            duration: Duration::from_secs(self.lock_duration_secs),
            release_grace: Duration::from_secs(self.release_grace_secs),
        }
    }

    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        RateLimitSettings {
            key_prefix: self.rate_limit_key_prefix.clone(),
            expiration_window: Duration::from_secs(self.rate_expiration_window_secs),
        }
    }

    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy {
            limit: self.rate_limit,
            period: Duration::from_secs(self.rate_period_secs),
        }
    }

    #[cfg(feature = "http")]
    pub fn gate_policy(&self) -> crate::ratelimit::GatePolicy {
        let rate = self.rate_limit_policy();
        crate::ratelimit::GatePolicy {
            limit: rate.limit,
            period: rate.period,
            admin_multiplier: self.admin_rate_multiplier,
            by_user_id: self.rate_limit_by_user_id,
            send_x_headers: self.rate_limit_headers,
            ip_scope: None,
        }
    }

    pub fn guard_settings(&self) -> GuardSettings {
        GuardSettings {
            key_prefix: self.stamp_key_prefix.clone(),
            stamp_ttl: Duration::from_secs(self.stamp_ttl_secs),
        }
    }

    pub fn active_holder_ttl(&self) -> Duration {
        Duration::from_secs(self.active_holder_ttl_secs)
    }
}

struct Loader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Loader<'_> {
    fn raw(&self, key: &str) -> Option<String> {
        (self.lookup)(&format!("{ENV_PREFIX}{key}"))
    }

    fn load<T: FromStr + Display>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T::Err: Display,
    {
        match self.raw(key) {
            None => {
                info!("{ENV_PREFIX}{key} not set, using default: {default}");
                Ok(default)
            }
            Some(value) => value.trim().parse().map_err(|e: T::Err| {
                warn!("Invalid {ENV_PREFIX}{key} value: {e}");
                ConfigError::Invalid {
                    key: format!("{ENV_PREFIX}{key}"),
                    reason: e.to_string(),
                    value,
                }
            }),
        }
    }
}
