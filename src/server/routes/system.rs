use crate::server::router::AppState;
use axum::{Json, Router, extract::State, routing::get};
use keystone_schema::MessageResponse;
use serde_json::{Value, json};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/config", get(public_config))
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service banner", body = MessageResponse)),
    tag = "system"
)]
pub async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("API is running"))
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "`{\"status\":\"ok\"}`")),
    tag = "system"
)]
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Non-secret settings only.
#[utoipa::path(
    get,
    path = "/config",
    responses((status = 200, description = "App name, version, environment and debug flag")),
    tag = "system"
)]
pub async fn public_config(State(state): State<AppState>) -> Json<Value> {
    let basic = &state.config.basic;
    Json(json!({
        "app_name": basic.app_name,
        "version": basic.version,
        "environment": basic.environment.as_str(),
        "debug": basic.debug,
    }))
}
