use super::require_non_empty;
use crate::db::NewItem;
use crate::error::{ApiError, ApiErrorBody};
use crate::server::guards::AuthUser;
use crate::server::router::AppState;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use keystone_schema::{ItemCreate, ItemModel, ItemUpdate};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
}

#[utoipa::path(
    post,
    path = "/api/v1/items",
    request_body = ItemCreate,
    responses(
        (status = 201, body = ItemModel),
        (status = 400, body = ApiErrorBody),
        (status = 401, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<ItemCreate>,
) -> Result<(StatusCode, Json<ItemModel>), ApiError> {
    require_non_empty(&body.name, "name")?;
    let item = state
        .db
        .create_item(NewItem {
            owner_id: user.id(),
            name: body.name.trim().to_string(),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Admins see every item; everyone else sees their own.
#[utoipa::path(
    get,
    path = "/api/v1/items",
    responses(
        (status = 200, body = Vec<ItemModel>),
        (status = 401, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "items"
)]
pub async fn list_items(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ItemModel>>, ApiError> {
    let owner = (!user.is_admin()).then(|| user.id());
    let items = state.db.list_items(owner).await?;
    Ok(Json(items.into_iter().map(ItemModel::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 200, body = ItemModel),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ItemModel>, ApiError> {
    let item = state.db.get_item(id).await?;
    user.ensure_owner_or_admin(item.owner_id)?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    put,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    request_body = ItemUpdate,
    responses(
        (status = 200, body = ItemModel),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(body): Json<ItemUpdate>,
) -> Result<Json<ItemModel>, ApiError> {
    require_non_empty(&body.name, "name")?;
    let item = state.db.get_item(id).await?;
    user.ensure_owner_or_admin(item.owner_id)?;

    let item = state.db.update_item(id, body.name.trim()).await?;
    Ok(Json(item.into()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/items/{id}",
    params(("id" = i64, Path, description = "Item id")),
    responses(
        (status = 204, description = "Item deleted"),
        (status = 403, body = ApiErrorBody),
        (status = 404, body = ApiErrorBody),
    ),
    security(("jwt" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let item = state.db.get_item(id).await?;
    user.ensure_owner_or_admin(item.owner_id)?;

    state.db.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
