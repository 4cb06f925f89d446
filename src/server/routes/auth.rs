use super::normalize_email;
use crate::auth::verify_password;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::guards::{Admin, AuthUser, RequireRole};
use crate::server::router::AppState;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use keystone_schema::{LoginRequest, TokenResponse, UserModel};
use serde_json::{Value, json};
use tracing::info;

const BAD_CREDENTIALS: &str = "Incorrect username or password";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/users/me", get(read_users_me))
        .route("/admin-dashboard", get(admin_dashboard))
}

/// POST /api/v1/login
///
/// Exchanges email + password for a bearer access token.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, body = TokenResponse),
        (status = 401, description = "Incorrect username or password", body = ApiErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let Ok(email) = normalize_email(&body.username) else {
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    };

    let record = match state.db.get_user_by_email(&email).await {
        Ok(record) => record,
        Err(ApiError::DatabaseError(sqlx::Error::RowNotFound)) => {
            return Err(ApiError::unauthorized(BAD_CREDENTIALS));
        }
        Err(e) => return Err(e),
    };

    let verified = record
        .user
        .hashed_password
        .as_deref()
        .is_some_and(|hash| verify_password(&body.password, hash));
    if !verified {
        return Err(ApiError::unauthorized(BAD_CREDENTIALS));
    }

    let token = state
        .jwt
        .issue(record.user.id, &record.user.email, &record.roles)?;
    info!(user_id = record.user.id, "password login");
    Ok(Json(TokenResponse::bearer(token)))
}

/// GET /api/v1/users/me
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, body = UserModel),
        (status = 401, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "auth"
)]
pub async fn read_users_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserModel>, ApiError> {
    let record = state.db.get_user(user.id()).await?;
    Ok(Json(record.into()))
}

/// GET /api/v1/admin-dashboard
#[utoipa::path(
    get,
    path = "/api/v1/admin-dashboard",
    responses(
        (status = 200, description = "Admin-only payload"),
        (status = 401, body = ApiErrorBody),
        (status = 403, description = "Caller lacks the admin role", body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "auth"
)]
pub async fn admin_dashboard(_admin: RequireRole<Admin>) -> Json<Value> {
    Json(json!({ "admin_data": "secret_admin_data" }))
}
