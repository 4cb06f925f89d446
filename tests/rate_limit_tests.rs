mod common;

use axum::http::{StatusCode, header};
use common::{build_app, request, send};
use serde_json::json;

fn from_client(uri: &str, ip: &str) -> axum::http::Request<axum::body::Body> {
    let mut req = request("GET", uri, None, None);
    req.headers_mut()
        .insert("x-forwarded-for", ip.parse().expect("header value"));
    req
}

#[tokio::test]
async fn clients_over_quota_get_429_with_retry_after() {
    let t = build_app("rate-limit", |cfg| {
        cfg.rate_limit.enabled = true;
        cfg.rate_limit.limit = "2/minute".to_string();
    })
    .await;

    for _ in 0..2 {
        let (status, _, _) = send(&t.app, from_client("/health", "203.0.113.9")).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, headers, body) = send(&t.app, from_client("/health", "203.0.113.9")).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body, json!({ "message": "Rate limit exceeded" }));
    let retry_after: u64 = headers
        .get(header::RETRY_AFTER)
        .expect("retry-after header")
        .to_str()
        .expect("utf-8")
        .parse()
        .expect("seconds");
    assert!((1..=60).contains(&retry_after), "{retry_after}");

    // The quota is tracked per client.
    let (status, _, _) = send(&t.app, from_client("/health", "198.51.100.4")).await;
    assert_eq!(status, StatusCode::OK);

    t.cleanup().await;
}

#[tokio::test]
async fn disabled_limiter_lets_everything_through() {
    let t = build_app("rate-limit-off", |cfg| {
        cfg.rate_limit.limit = "1/minute".to_string();
    })
    .await;

    for _ in 0..5 {
        let (status, _, _) = send(&t.app, from_client("/health", "203.0.113.9")).await;
        assert_eq!(status, StatusCode::OK);
    }

    t.cleanup().await;
}
