use crate::error::ApiErrorBody;
use crate::server::guards::SessionUser;
use crate::server::router::AppState;
use crate::session::SESSION_COOKIE;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar};
use keystone_schema::SessionInfo;
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/session/me", get(session_me))
        .route("/logout", post(logout))
}

/// GET /api/v1/session/me
#[utoipa::path(
    get,
    path = "/api/v1/session/me",
    responses(
        (status = 200, body = SessionInfo),
        (status = 401, description = "No live login session", body = ApiErrorBody),
    ),
    security(("session" = [])),
    tag = "session"
)]
pub async fn session_me(user: SessionUser) -> Json<SessionInfo> {
    Json(user.session.into())
}

/// POST /api/v1/logout
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses(
        (status = 204, description = "Session ended and cookie cleared"),
        (status = 401, description = "No active session", body = ApiErrorBody),
    ),
    security(("session" = [])),
    tag = "session"
)]
pub async fn logout(
    State(state): State<AppState>,
    user: SessionUser,
    jar: PrivateCookieJar,
) -> (PrivateCookieJar, StatusCode) {
    state.sessions.remove(&user.session_id).await;
    info!(user_id = user.session.user_id, "logged out");
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        StatusCode::NO_CONTENT,
    )
}
