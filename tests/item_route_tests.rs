mod common;

use axum::http::StatusCode;
use common::{build_app, login, request, seed_user, send};
use serde_json::json;

#[tokio::test]
async fn items_are_owned_and_guarded() {
    let t = build_app("items", |_| {}).await;
    seed_user(&t.db, "ann@example.com", "pw", &["user"]).await;
    seed_user(&t.db, "ben@example.com", "pw", &["user"]).await;
    seed_user(&t.db, "root@example.com", "pw", &["user", "admin"]).await;

    let ann = login(&t.app, "ann@example.com", "pw").await;
    let ben = login(&t.app, "ben@example.com", "pw").await;
    let root = login(&t.app, "root@example.com", "pw").await;

    // Anonymous callers cannot touch items.
    let (status, _, _) = send(&t.app, request("GET", "/api/v1/items", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _, item) = send(
        &t.app,
        request("POST", "/api/v1/items", Some(&json!({ "name": "lamp" })), Some(&ann)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(item["name"], "lamp");
    let item_uri = format!("/api/v1/items/{}", item["id"]);

    let (status, _, _) = send(
        &t.app,
        request("POST", "/api/v1/items", Some(&json!({ "name": "  " })), Some(&ann)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(
        &t.app,
        request("POST", "/api/v1/items", Some(&json!({ "name": "desk" })), Some(&ben)),
    )
    .await;

    // Listing is scoped to the caller unless they are an admin.
    let (_, _, ann_items) = send(&t.app, request("GET", "/api/v1/items", None, Some(&ann))).await;
    assert_eq!(ann_items.as_array().map(Vec::len), Some(1));
    let (_, _, all_items) = send(&t.app, request("GET", "/api/v1/items", None, Some(&root))).await;
    assert_eq!(all_items.as_array().map(Vec::len), Some(2));

    // Someone else's item is off limits.
    let (status, _, _) = send(&t.app, request("GET", &item_uri, None, Some(&ben))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(
        &t.app,
        request("PUT", &item_uri, Some(&json!({ "name": "stolen" })), Some(&ben)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _, _) = send(&t.app, request("DELETE", &item_uri, None, Some(&ben))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner and admins may change it.
    let (status, _, body) = send(
        &t.app,
        request("PUT", &item_uri, Some(&json!({ "name": "floor lamp" })), Some(&ann)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "floor lamp");

    let (status, _, _) = send(&t.app, request("GET", &item_uri, None, Some(&root))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(&t.app, request("DELETE", &item_uri, None, Some(&root))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _, _) = send(&t.app, request("GET", &item_uri, None, Some(&ann))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Owned items show up on the owner's profile.
    let (_, _, me) = send(&t.app, request("GET", "/api/v1/users/me", None, Some(&ben))).await;
    assert_eq!(me["items"][0]["name"], "desk");

    t.cleanup().await;
}
