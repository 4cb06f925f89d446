use super::{normalize_email, require_non_empty};
use crate::auth::hash_password;
use crate::db::schema::DEFAULT_ROLE;
use crate::db::{NewUser, UserPatch};
use crate::error::{ApiError, ApiErrorBody};
use crate::server::guards::{Admin, AuthUser, RequireRole};
use crate::server::router::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
};
use keystone_schema::{RoleAssign, UserCreate, UserModel, UserUpdate};
use tracing::info;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/roles", post(assign_role))
        .route("/users/{id}/roles/{role}", delete(revoke_role))
}

/// POST /api/v1/users
///
/// Open registration. New accounts get the default role.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = UserCreate,
    responses(
        (status = 201, body = UserModel),
        (status = 400, body = ApiErrorBody),
        (status = 409, description = "Email already registered", body = ApiErrorBody),
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<UserCreate>,
) -> Result<(StatusCode, Json<UserModel>), ApiError> {
    let email = normalize_email(&body.email)?;
    require_non_empty(&body.password, "password")?;

    let record = state
        .db
        .create_user(NewUser {
            email,
            hashed_password: Some(hash_password(&body.password)?),
            roles: vec![DEFAULT_ROLE.to_string()],
        })
        .await?;

    info!(user_id = record.user.id, "user registered");
    Ok((StatusCode::CREATED, Json(record.into())))
}

#[utoipa::path(
    get,
    path = "/api/v1/users",
    responses(
        (status = 200, body = Vec<UserModel>),
        (status = 403, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: RequireRole<Admin>,
) -> Result<Json<Vec<UserModel>>, ApiError> {
    let users = state.db.list_users().await?;
    Ok(Json(users.into_iter().map(UserModel::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 200, body = UserModel),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<UserModel>, ApiError> {
    user.ensure_owner_or_admin(id)?;
    let record = state.db.get_user(id).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    request_body = UserUpdate,
    responses(
        (status = 200, body = UserModel),
        (status = 403, body = ApiErrorBody),
        (status = 409, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<UserUpdate>,
) -> Result<Json<UserModel>, ApiError> {
    user.ensure_owner_or_admin(id)?;

    let email = body.email.as_deref().map(normalize_email).transpose()?;
    let hashed_password = match body.password.as_deref() {
        Some(password) => {
            require_non_empty(password, "password")?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let record = state
        .db
        .update_user(UserPatch {
            id,
            email,
            hashed_password,
        })
        .await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}",
    params(("id" = i64, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: RequireRole<Admin>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.db.delete_user(id).await?;
    info!(user_id = id, by = admin.user.id(), "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/roles",
    params(("id" = i64, Path, description = "User id")),
    request_body = RoleAssign,
    responses(
        (status = 200, body = UserModel),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn assign_role(
    State(state): State<AppState>,
    _admin: RequireRole<Admin>,
    Path(id): Path<i64>,
    Json(body): Json<RoleAssign>,
) -> Result<Json<UserModel>, ApiError> {
    require_non_empty(&body.role, "role")?;
    let record = state.db.assign_role(id, body.role.trim()).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/roles/{role}",
    params(("id" = i64, Path, description = "User id"), ("role" = String, Path, description = "Role name")),
    responses(
        (status = 200, body = UserModel),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "users"
)]
pub async fn revoke_role(
    State(state): State<AppState>,
    _admin: RequireRole<Admin>,
    Path((id, role)): Path<(i64, String)>,
) -> Result<Json<UserModel>, ApiError> {
    let record = state.db.revoke_role(id, &role).await?;
    Ok(Json(record.into()))
}
