mod common;

use axum::http::{StatusCode, header};
use common::{build_app, error_code, login, request, seed_user, send};
use serde_json::json;

#[tokio::test]
async fn public_endpoints_respond_without_credentials() {
    let t = build_app("auth-public", |_| {}).await;

    let (status, headers, body) = send(&t.app, request("GET", "/", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "API is running" }));
    assert!(headers.contains_key("x-request-id"));

    let (status, _, body) = send(&t.app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (status, _, body) = send(&t.app, request("GET", "/config", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["app_name"], "REST API Boilerplate");
    assert_eq!(body["environment"], "testing");
    let text = body.to_string();
    assert!(!text.contains("secret"), "config leaked a secret: {text}");
    assert!(!text.contains("database_url"));

    let (status, _, body) = send(&t.app, request("GET", "/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    t.cleanup().await;
}

#[tokio::test]
async fn login_issues_token_and_rejects_bad_credentials() {
    let t = build_app("auth-login", |_| {}).await;
    seed_user(&t.db, "john@example.com", "secret", &["user"]).await;
    t.db.upsert_oauth_user("oauth-only@example.com")
        .await
        .expect("oauth user");

    let body = json!({ "username": "John@Example.com", "password": "secret" });
    let (status, _, body) = send(&t.app, request("POST", "/api/v1/login", Some(&body), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "bearer");
    let token = body["access_token"].as_str().expect("token").to_string();

    let claims = t.state.jwt.decode(&token).expect("token verifies");
    assert_eq!(claims.sub, "john@example.com");
    assert_eq!(claims.roles, vec!["user".to_string()]);

    for (username, password) in [
        ("john@example.com", "wrong"),
        ("nobody@example.com", "secret"),
        ("oauth-only@example.com", ""),
        ("not-an-email", "secret"),
    ] {
        let body = json!({ "username": username, "password": password });
        let (status, _, body) =
            send(&t.app, request("POST", "/api/v1/login", Some(&body), None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{username}");
        assert_eq!(body["error"]["message"], "Incorrect username or password");
    }

    t.cleanup().await;
}

#[tokio::test]
async fn bearer_tokens_gate_protected_routes() {
    let t = build_app("auth-bearer", |_| {}).await;
    seed_user(&t.db, "user@example.com", "pw", &["user"]).await;
    seed_user(&t.db, "admin@example.com", "pw", &["user", "admin"]).await;

    // No header, or a non-bearer scheme: 401.
    let (status, _, body) = send(&t.app, request("GET", "/api/v1/users/me", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(error_code(&body), "UNAUTHORIZED");

    let req = axum::http::Request::builder()
        .uri("/api/v1/users/me")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwdw==")
        .body(axum::body::Body::empty())
        .expect("failed to build request");
    let (status, _, _) = send(&t.app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Garbage token: 403.
    let (status, _, body) = send(
        &t.app,
        request("GET", "/api/v1/users/me", None, Some("garbage")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Invalid token");

    let user_token = login(&t.app, "user@example.com", "pw").await;
    let (status, _, body) = send(
        &t.app,
        request("GET", "/api/v1/users/me", None, Some(&user_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "user@example.com");
    assert!(body.get("hashed_password").is_none());

    // Expired token: 403.
    let mut claims = t.state.jwt.claims_for(1, "user@example.com", &[]);
    claims.iat -= 7200;
    claims.exp = claims.iat + 60;
    let expired = t.state.jwt.encode(&claims).expect("encode");
    let (status, _, _) = send(
        &t.app,
        request("GET", "/api/v1/users/me", None, Some(&expired)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Role checks.
    let (status, _, body) = send(
        &t.app,
        request("GET", "/api/v1/admin-dashboard", None, Some(&user_token)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["message"], "Admin access required");

    let admin_token = login(&t.app, "admin@example.com", "pw").await;
    let (status, _, body) = send(
        &t.app,
        request("GET", "/api/v1/admin-dashboard", None, Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "admin_data": "secret_admin_data" }));

    t.cleanup().await;
}

#[tokio::test]
async fn registration_and_user_management() {
    let t = build_app("auth-users", |_| {}).await;
    seed_user(&t.db, "admin@example.com", "pw", &["user", "admin"]).await;

    let body = json!({ "email": " New@Example.com ", "password": "pw1" });
    let (status, _, created) = send(&t.app, request("POST", "/api/v1/users", Some(&body), None)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["email"], "new@example.com");
    assert_eq!(created["roles"], json!(["user"]));
    let new_id = created["id"].as_i64().expect("id");

    let (status, _, body) = send(&t.app, request("POST", "/api/v1/users", Some(&body), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_code(&body), "CONFLICT");

    let bad = json!({ "email": "no-at-sign", "password": "pw" });
    let (status, _, _) = send(&t.app, request("POST", "/api/v1/users", Some(&bad), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user_token = login(&t.app, "new@example.com", "pw1").await;
    let admin_token = login(&t.app, "admin@example.com", "pw").await;

    // Listing is admin-only.
    let (status, _, _) = send(&t.app, request("GET", "/api/v1/users", None, Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, list) = send(&t.app, request("GET", "/api/v1/users", None, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(2));

    // Users may read and update themselves but nobody else.
    let own = format!("/api/v1/users/{new_id}");
    let (status, _, _) = send(&t.app, request("GET", &own, None, Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, _) = send(&t.app, request("GET", "/api/v1/users/1", None, Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let patch = json!({ "password": "pw2" });
    let (status, _, _) = send(&t.app, request("PUT", &own, Some(&patch), Some(&user_token))).await;
    assert_eq!(status, StatusCode::OK);
    login(&t.app, "new@example.com", "pw2").await;

    // Role management.
    let roles = format!("/api/v1/users/{new_id}/roles");
    let assign = json!({ "role": "admin" });
    let (status, _, _) = send(&t.app, request("POST", &roles, Some(&assign), Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, body) = send(&t.app, request("POST", &roles, Some(&assign), Some(&admin_token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!(["admin", "user"]));

    let (status, _, body) = send(
        &t.app,
        request("DELETE", &format!("{roles}/admin"), None, Some(&admin_token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["roles"], json!(["user"]));

    // Deletion is admin-only.
    let (status, _, _) = send(&t.app, request("DELETE", &own, None, Some(&user_token))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&t.app, request("DELETE", &own, None, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&t.app, request("GET", &own, None, Some(&admin_token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    t.cleanup().await;
}
