//! HTTP enforcement: starts an axum server and exercises it with reqwest.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use slot_gate::{
    rate_limit_gate, rate_limited, Config, ErrorEnvelope, GatePolicy, Identity, InMemoryStore,
    RateLimitGate, RateLimitSettings, RateLimiter, Store,
};

use crate::support::{fixture, fixture_with, Fixture};

async fn list_tasks(State(hits): State<Arc<AtomicUsize>>) -> &'static str {
    hits.fetch_add(1, Ordering::SeqCst);
    "[]"
}

/// Stand-in for an authentication layer: `x-user` / `x-admin` headers.
async fn identify(mut request: Request, next: Next) -> Response {
    let user_id = request
        .headers()
        .get("x-user")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    if user_id.is_some() {
        let admin = request.headers().contains_key("x-admin");
        request
            .extensions_mut()
            .insert(Identity { user_id, admin });
    }
    next.run(request).await
}

fn app(gate: RateLimitGate<InMemoryStore>, hits: Arc<AtomicUsize>) -> Router {
    let routes = Router::new()
        .route("/api/task", get(list_tasks))
        .with_state(hits);
    rate_limited(routes, gate).layer(middleware::from_fn(identify))
}

/// Bind to port 0 and return the base URL.
async fn start_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{addr}")
}

fn config(limit: u64) -> Config {
    Config {
        rate_limit: limit,
        rate_period_secs: 60,
        ..Config::default()
    }
}

async fn serve(config: &Config) -> (Fixture, String, Arc<AtomicUsize>) {
    let f = fixture_with(config.clone());
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_server(app(f.gate.rate_limit_gate(config), hits.clone())).await;
    (f, base, hits)
}

fn header(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .map(|v| v.to_str().unwrap().to_string())
}

#[tokio::test]
async fn allowed_requests_carry_rate_headers() {
    let config = config(3);
    let (_f, base, hits) = serve(&config).await;
    let client = reqwest::Client::new();

    let resp = client.get(format!("{base}/api/task")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "X-RateLimit-Remaining").as_deref(), Some("2"));
    assert_eq!(header(&resp, "X-RateLimit-Limit").as_deref(), Some("3"));
    // START is not on a minute boundary: the window ends at the next one.
    assert_eq!(header(&resp, "X-RateLimit-Reset").as_deref(), Some("1700000040"));
    assert_eq!(resp.text().await.unwrap(), "[]");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn exhausted_window_returns_429_envelope() {
    let config = config(2);
    let (_f, base, hits) = serve(&config).await;
    let client = reqwest::Client::new();

    let first = client.get(format!("{base}/api/task")).send().await.unwrap();
    assert_eq!(first.status(), 200);

    let resp = client.get(format!("{base}/api/task")).send().await.unwrap();
    assert_eq!(resp.status(), 429);
    assert_eq!(header(&resp, "X-RateLimit-Remaining").as_deref(), Some("0"));

    let body: ErrorEnvelope = resp.json().await.unwrap();
    assert_eq!(body.status, "failed");
    assert_eq!(body.status_code, 429);
    assert_eq!(body.target, "/api/task");
    assert_eq!(body.action, "GET");
    assert_eq!(body.exception_cls, "TooManyRequests");
    assert!(!body.exception_msg.is_empty());

    // The handler never ran for the rejected request.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn window_rollover_lets_requests_through_again() {
    let config = config(2);
    let (f, base, hits) = serve(&config).await;
    let client = reqwest::Client::new();

    assert_eq!(client.get(format!("{base}/api/task")).send().await.unwrap().status(), 200);
    assert_eq!(client.get(format!("{base}/api/task")).send().await.unwrap().status(), 429);

    f.clock.advance(std::time::Duration::from_secs(60));
    let resp = client.get(format!("{base}/api/task")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "X-RateLimit-Reset").as_deref(), Some("1700000100"));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn users_are_scoped_separately_when_configured() {
    let config = Config {
        rate_limit_by_user_id: true,
        ..config(2)
    };
    let (_f, base, _hits) = serve(&config).await;
    let client = reqwest::Client::new();

    for user in ["alice", "bob"] {
        let resp = client
            .get(format!("{base}/api/task"))
            .header("x-user", user)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(header(&resp, "X-RateLimit-Remaining").as_deref(), Some("1"));
    }
}

#[tokio::test]
async fn admins_get_a_larger_budget() {
    let config = Config {
        admin_rate_multiplier: 3,
        ..config(2)
    };
    let (_f, base, _hits) = serve(&config).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{base}/api/task"))
        .header("x-user", "root")
        .header("x-admin", "1")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(header(&resp, "X-RateLimit-Limit").as_deref(), Some("6"));
    assert_eq!(header(&resp, "X-RateLimit-Remaining").as_deref(), Some("5"));
}

#[tokio::test]
async fn headers_can_be_switched_off() {
    let config = Config {
        rate_limit_headers: false,
        ..config(5)
    };
    let (_f, base, _hits) = serve(&config).await;

    let resp = reqwest::get(format!("{base}/api/task")).await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(header(&resp, "X-RateLimit-Remaining").is_none());
}

#[tokio::test]
async fn no_store_means_no_throttling() {
    let config = Config {
        rate_limit: 1,
        ..Config::default()
    };
    let gate = rate_limit_gate::<InMemoryStore>(None, &config);
    assert!(!gate.is_enabled());

    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_server(app(gate, hits.clone())).await;
    let client = reqwest::Client::new();

    for _ in 0..5 {
        let resp = client.get(format!("{base}/api/task")).send().await.unwrap();
        assert_eq!(resp.status(), 200);
        assert!(header(&resp, "X-RateLimit-Remaining").is_none());
    }
    assert_eq!(hits.load(Ordering::SeqCst), 5);
}

#[tokio::test]
async fn store_failure_returns_500_envelope() {
    let config = config(5);
    let (f, base, hits) = serve(&config).await;
    // A hash where the counter lives makes the increment fail.
    f.store
        .hset("rate-limit//api/task/127.0.0.1/1700000040", "f", "v")
        .await
        .unwrap();

    let resp = reqwest::get(format!("{base}/api/task")).await.unwrap();
    assert_eq!(resp.status(), 500);
    assert!(header(&resp, "X-RateLimit-Remaining").is_none());

    let body: ErrorEnvelope = resp.json().await.unwrap();
    assert_eq!(body.status_code, 500);
    assert_eq!(body.target, "/api/task");
    assert_eq!(body.exception_cls, "StoreError");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sub_second_period_is_reported_as_invalid_period() {
    let f = fixture();
    let limiter = RateLimiter::new(
        f.store.clone(),
        Arc::new(f.clock.clone()),
        RateLimitSettings::default(),
    );
    let policy = GatePolicy {
        period: std::time::Duration::from_millis(500),
        ..GatePolicy::default()
    };
    let hits = Arc::new(AtomicUsize::new(0));
    let base = start_server(app(RateLimitGate::new(limiter, policy), hits.clone())).await;

    let resp = reqwest::get(format!("{base}/api/task")).await.unwrap();
    assert_eq!(resp.status(), 500);
    let body: ErrorEnvelope = resp.json().await.unwrap();
    assert_eq!(body.exception_cls, "InvalidPeriod");
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(f.store.is_empty());
}
