/// Permission endpoints (administrator or moderator)

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::JsonBody,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use taskboard_shared::models::permission::{CreatePermission, Permission, UpdatePermission};
use tracing::info;
use validator::Validate;

pub async fn index(State(state): State<AppState>) -> ApiResult<Json<Vec<Permission>>> {
    Ok(Json(state.gateway.list_permissions().await?))
}

pub async fn show(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Json<Permission>> {
    let permission = state
        .gateway
        .find_permission(id)
        .await?
        .ok_or_else(|| permission_not_found(id))?;

    Ok(Json(permission))
}

pub async fn store(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreatePermission>,
) -> ApiResult<Json<Permission>> {
    req.validate()?;

    let permission = state.gateway.create_permission(req).await?;

    info!(permission_id = permission.id, slug = %permission.slug, "Permission created");
    Ok(Json(permission))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdatePermission>,
) -> ApiResult<Json<Permission>> {
    req.validate()?;

    let permission = state
        .gateway
        .update_permission(id, req)
        .await?
        .ok_or_else(|| permission_not_found(id))?;

    Ok(Json(permission))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if !state.gateway.delete_permission(id).await? {
        return Err(permission_not_found(id));
    }

    info!(permission_id = id, "Permission deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn permission_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Permission {} not found", id))
}
