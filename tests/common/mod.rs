#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use keystone::config::{Config, Environment};
use keystone::db::{DbActorHandle, NewUser};
use keystone::server::{AppState, app_router};
use serde_json::Value;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

pub fn unique_sqlite_path(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX_EPOCH")
        .as_nanos();

    let mut temp_path = std::env::temp_dir();
    temp_path.push(format!(
        "keystone-{prefix}-{}-{}.sqlite",
        std::process::id(),
        nanos
    ));
    temp_path
}

pub fn test_config(database_url: String) -> Config {
    let mut cfg = Config::for_environment(Environment::Testing);
    cfg.basic.database_url = database_url;
    cfg.basic.insecure_cookie = true;
    cfg.rate_limit.enabled = false;
    cfg
}

pub struct TestApp {
    pub app: Router,
    pub db: DbActorHandle,
    pub state: AppState,
    pub path: PathBuf,
}

impl TestApp {
    pub async fn cleanup(self) {
        let _ = tokio::fs::remove_file(&self.path).await;
    }
}

pub async fn build_app(prefix: &str, tweak: impl FnOnce(&mut Config)) -> TestApp {
    let path = unique_sqlite_path(prefix);
    let mut cfg = test_config(format!("sqlite:{}", path.display()));
    tweak(&mut cfg);

    let db = keystone::db::spawn(&cfg.basic.database_url)
        .await
        .expect("db actor spawns");
    let state = AppState::new(cfg, db.clone()).expect("state builds");
    let app = app_router(state.clone());
    TestApp {
        app,
        db,
        state,
        path,
    }
}

pub fn request(method: &str, uri: &str, body: Option<&Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("failed to build request"),
        None => builder.body(Body::empty()).expect("failed to build request"),
    }
}

/// Send a request and decode the JSON body (`Value::Null` when empty).
pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let headers = resp.headers().clone();
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body was not JSON")
    };
    (status, headers, body)
}

pub async fn seed_user(db: &DbActorHandle, email: &str, password: &str, roles: &[&str]) -> i64 {
    db.create_user(NewUser {
        email: email.to_string(),
        hashed_password: Some(keystone::auth::hash_password(password).expect("hash")),
        roles: roles.iter().map(ToString::to_string).collect(),
    })
    .await
    .expect("seed user")
    .user
    .id
}

pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let body = serde_json::json!({ "username": email, "password": password });
    let (status, _, body) = send(app, request("POST", "/api/v1/login", Some(&body), None)).await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["access_token"]
        .as_str()
        .expect("access_token in login response")
        .to_string()
}

pub fn cookie_header_from_set_cookie_headers(headers: &HeaderMap) -> String {
    let mut pairs: Vec<String> = Vec::new();
    for v in headers.get_all(header::SET_COOKIE) {
        let s = v.to_str().expect("set-cookie header was not valid utf-8");
        let first = s.split(';').next().unwrap_or("");
        let mut parts = first.splitn(2, '=');
        let name = parts.next().unwrap_or("");
        let value = parts.next().unwrap_or("");
        if !name.trim().is_empty() && !value.is_empty() {
            pairs.push(format!("{}={}", name.trim(), value));
        }
    }
    pairs.join("; ")
}

pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
