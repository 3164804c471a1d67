//! HTTP enforcement for the rate limiter.
//!
//! Requires the `http` feature. Wraps an axum router so every matched route
//! is counted before its handler runs.
//!
//! ## Example
//!
//! ```ignore
//! use slot_gate::ratelimit::{rate_limited, GatePolicy, RateLimitGate};
//!
//! let gate = RateLimitGate::new(limiter, GatePolicy::default());
//! let app = rate_limited(Router::new().route("/api/task", get(list_tasks)), gate);
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{error, info, warn};

use super::{ErrorEnvelope, RateLimit, RateLimitError, RateLimitPolicy, RateLimiter};
use crate::store::Store;

pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

const FALLBACK_CLIENT: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Who is calling, as established by an upstream authentication layer.
///
/// Insert it into the request extensions; requests without one are scoped
/// by peer address and never get the admin multiplier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub admin: bool,
}

/// Turns a client address into the string used in counter keys.
pub type IpScope = fn(&IpAddr) -> String;

/// Per-gate enforcement rules.
#[derive(Debug, Clone, Copy)]
pub struct GatePolicy {
    pub limit: u64,
    pub period: Duration,
    /// Admins get `limit * admin_multiplier`.
    pub admin_multiplier: u64,
    /// Scope authenticated requests by user id instead of peer address.
    pub by_user_id: bool,
    pub send_x_headers: bool,
    /// Applied to the client address before it lands in a counter key, so
    /// raw addresses need not be stored. `None` keeps the address as is.
    pub ip_scope: Option<IpScope>,
}

impl Default for GatePolicy {
    fn default() -> Self {
        let policy = RateLimitPolicy::default();
        Self {
            limit: policy.limit,
            period: policy.period,
            admin_multiplier: 1,
            by_user_id: false,
            send_x_headers: true,
            ip_scope: None,
        }
    }
}

impl GatePolicy {
    fn for_identity(&self, identity: Option<&Identity>) -> RateLimitPolicy {
        let admin = identity.is_some_and(|i| i.admin);
        let limit = if admin {
            self.limit.saturating_mul(self.admin_multiplier)
        } else {
            self.limit
        };
        RateLimitPolicy {
            limit,
            period: self.period,
        }
    }

    fn client_scope(
        &self,
        identity: Option<&Identity>,
        peer: Option<&ConnectInfo<SocketAddr>>,
    ) -> String {
        if self.by_user_id {
            if let Some(user_id) = identity.and_then(|i| i.user_id.as_deref()) {
                return user_id.to_string();
            }
        }
        let ip = peer.map_or(FALLBACK_CLIENT, |ConnectInfo(addr)| addr.ip());
        match self.ip_scope {
            Some(scope) => scope(&ip),
            None => ip.to_string(),
        }
    }
}

/// Middleware state: a limiter, or nothing when rate limiting is off.
pub struct RateLimitGate<S> {
    limiter: Option<Arc<RateLimiter<S>>>,
    policy: GatePolicy,
}

impl<S> Clone for RateLimitGate<S> {
    fn clone(&self) -> Self {
        Self {
            limiter: self.limiter.clone(),
            policy: self.policy,
        }
    }
}

impl<S: Store + 'static> RateLimitGate<S> {
    pub fn new(limiter: RateLimiter<S>, policy: GatePolicy) -> Self {
        Self::shared(Arc::new(limiter), policy)
    }

    /// A gate over a limiter that is also used elsewhere.
    pub fn shared(limiter: Arc<RateLimiter<S>>, policy: GatePolicy) -> Self {
        if policy.period.as_secs() == 0 {
            warn!(
                period_ms = policy.period.as_millis() as u64,
                "rate limit period under one second, every request will fail"
            );
        }
        info!(
            limit = policy.limit,
            period_secs = policy.period.as_secs(),
            "rate limiting enabled"
        );
        Self {
            limiter: Some(limiter),
            policy,
        }
    }

    /// A gate that lets every request through. Used when no store is configured.
    pub fn disabled(policy: GatePolicy) -> Self {
        warn!("rate limiting disabled: no store configured, all requests pass through");
        Self {
            limiter: None,
            policy,
        }
    }

    pub fn from_option(limiter: Option<RateLimiter<S>>, policy: GatePolicy) -> Self {
        match limiter {
            Some(limiter) => Self::new(limiter, policy),
            None => Self::disabled(policy),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }
}

/// Apply the gate to every route of `router`.
pub fn rate_limited<S: Store + 'static>(router: Router, gate: RateLimitGate<S>) -> Router {
    router.route_layer(middleware::from_fn_with_state(gate, enforce_rate_limit::<S>))
}

/// Count the request, then either short-circuit with 429 or run the handler.
pub async fn enforce_rate_limit<S: Store + 'static>(
    State(gate): State<RateLimitGate<S>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(limiter) = gate.limiter.as_deref() else {
        return next.run(request).await;
    };

    let target = request.uri().path().to_string();
    let action = request.method().as_str().to_string();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| target.clone());
    let (client, policy) = {
        let extensions = request.extensions();
        let identity = extensions.get::<Identity>();
        let peer = extensions.get::<ConnectInfo<SocketAddr>>();
        (
            gate.policy.client_scope(identity, peer),
            gate.policy.for_identity(identity),
        )
    };

    let (mut response, rate) = match limiter.enforce(&client, &endpoint, policy).await {
        Ok(rate) => (next.run(request).await, rate),
        Err(RateLimitError::TooManyRequests(rate)) => {
            warn!(%endpoint, %client, limit = rate.limit, "rate limit exceeded");
            let err = RateLimitError::TooManyRequests(rate);
            let envelope =
                ErrorEnvelope::failed(429, target, &action, err.exception_cls(), err.to_string());
            (envelope.into_response(), rate)
        }
        Err(err) => {
            error!(%endpoint, %client, error = %err, "rate limit check failed");
            let envelope =
                ErrorEnvelope::failed(500, target, &action, err.exception_cls(), err.to_string());
            return envelope.into_response();
        }
    };

    if gate.policy.send_x_headers {
        attach_headers(&mut response, &rate);
    }
    response
}

fn attach_headers(response: &mut Response, rate: &RateLimit) {
    let headers = response.headers_mut();
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(rate.remaining));
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(rate.limit));
    headers.insert(X_RATELIMIT_RESET, HeaderValue::from(rate.reset));
}
