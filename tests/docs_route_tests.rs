mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use common::{build_app, error_code, request, send};
use tower::ServiceExt;

async fn fetch_text(app: &axum::Router, uri: &str) -> (StatusCode, Option<String>, String) {
    let req = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("failed to build request");
    let resp = app.clone().oneshot(req).await.expect("request failed");
    let status = resp.status();
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    (
        status,
        content_type,
        String::from_utf8_lossy(&bytes).into_owned(),
    )
}

#[tokio::test]
async fn openapi_document_is_served() {
    let t = build_app("docs-openapi", |_| {}).await;

    let (status, _, doc) = send(&t.app, request("GET", "/openapi.json", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["info"]["title"], t.state.config.basic.app_name.as_str());
    for path in ["/api/v1/login", "/api/v1/users", "/api/v1/oauth/{provider}/login"] {
        assert!(doc["paths"].get(path).is_some(), "{path} missing");
    }
    assert_eq!(
        doc["components"]["securitySchemes"]["jwt"]["scheme"],
        "bearer"
    );

    t.cleanup().await;
}

#[tokio::test]
async fn swagger_and_redoc_pages_render() {
    let t = build_app("docs-pages", |_| {}).await;

    let (status, content_type, body) = fetch_text(&t.app, "/redoc").await;
    assert_eq!(status, StatusCode::OK);
    assert!(content_type.is_some_and(|ct| ct.starts_with("text/html")));
    assert!(body.contains("/api/v1/login"));

    let (status, _, body) = fetch_text(&t.app, "/swagger/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.to_ascii_lowercase().contains("swagger"));

    t.cleanup().await;
}

#[tokio::test]
async fn docs_follow_configured_paths() {
    let t = build_app("docs-custom", |cfg| {
        cfg.docs.redoc_url = "/reference".to_string();
        cfg.docs.openapi_url = "/api-docs/openapi.json".to_string();
    })
    .await;

    let (status, _, _) = fetch_text(&t.app, "/reference").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _, doc) =
        send(&t.app, request("GET", "/api-docs/openapi.json", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["paths"].get("/api/v1/items").is_some());

    let (status, _, body) = send(&t.app, request("GET", "/redoc", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "NOT_FOUND");

    t.cleanup().await;
}

#[tokio::test]
async fn disabled_docs_are_not_mounted() {
    let t = build_app("docs-off", |cfg| cfg.docs.enabled = false).await;

    for uri in ["/openapi.json", "/redoc", "/swagger/"] {
        let (status, _, body) = send(&t.app, request("GET", uri, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(error_code(&body), "NOT_FOUND");
    }

    t.cleanup().await;
}
