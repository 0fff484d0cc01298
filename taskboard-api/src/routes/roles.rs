/// Role endpoints (administrator or moderator)
///
/// - `GET /roles` - All roles with their permissions
/// - `POST /roles` - Create, optionally attaching `permissions` ids
/// - `GET /roles/:id` - One role with its permissions
/// - `PUT /roles/:id` - Partial update; a `permissions` array replaces the set
/// - `DELETE /roles/:id` - Delete

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::JsonBody,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use taskboard_shared::{
    models::role::{CreateRole, Role, RoleWithPermissions, UpdateRole},
    store::AccessStore,
};
use tracing::info;
use validator::Validate;

/// Create request: role fields plus optional permission ids
#[derive(Debug, Deserialize)]
pub struct CreateRoleRequest {
    #[serde(flatten)]
    pub role: CreateRole,

    #[serde(default)]
    pub permissions: Option<Vec<i64>>,
}

/// Update request: role fields plus an optional replacement permission set
#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    #[serde(flatten)]
    pub role: UpdateRole,

    #[serde(default)]
    pub permissions: Option<Vec<i64>>,
}

pub async fn index(State(state): State<AppState>) -> ApiResult<Json<Vec<RoleWithPermissions>>> {
    let roles = state.gateway.list_roles().await?;

    let mut loaded = Vec::with_capacity(roles.len());
    for role in roles {
        loaded.push(with_permissions(state.gateway.as_ref(), role).await?);
    }

    Ok(Json(loaded))
}

pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<RoleWithPermissions>> {
    let role = state
        .gateway
        .find_role(id)
        .await?
        .ok_or_else(|| role_not_found(id))?;

    Ok(Json(with_permissions(state.gateway.as_ref(), role).await?))
}

pub async fn store(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<CreateRoleRequest>,
) -> ApiResult<Json<RoleWithPermissions>> {
    req.role.validate()?;
    ensure_permissions_exist(&state, req.permissions.as_deref()).await?;

    let role = state.gateway.create_role(req.role).await?;

    if let Some(permission_ids) = &req.permissions {
        state
            .gateway
            .sync_role_permissions(role.id, permission_ids)
            .await?;
    }

    info!(role_id = role.id, slug = %role.slug, "Role created");
    Ok(Json(with_permissions(state.gateway.as_ref(), role).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateRoleRequest>,
) -> ApiResult<Json<RoleWithPermissions>> {
    req.role.validate()?;
    ensure_permissions_exist(&state, req.permissions.as_deref()).await?;

    let role = state
        .gateway
        .update_role(id, req.role)
        .await?
        .ok_or_else(|| role_not_found(id))?;

    if let Some(permission_ids) = &req.permissions {
        state
            .gateway
            .sync_role_permissions(role.id, permission_ids)
            .await?;
    }

    Ok(Json(with_permissions(state.gateway.as_ref(), role).await?))
}

/// Rejects unknown permission ids before anything is written
async fn ensure_permissions_exist(state: &AppState, ids: Option<&[i64]>) -> ApiResult<()> {
    let mut unknown = Vec::new();
    for &id in ids.unwrap_or_default() {
        if state.gateway.find_permission(id).await?.is_none() {
            unknown.push(id.to_string());
        }
    }

    if unknown.is_empty() {
        return Ok(());
    }

    Err(ApiError::ValidationError(vec![ValidationErrorDetail {
        field: "permissions".to_string(),
        message: format!("Unknown permission ids: {}", unknown.join(", ")),
    }]))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if !state.gateway.delete_role(id).await? {
        return Err(role_not_found(id));
    }

    info!(role_id = id, "Role deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn with_permissions<S>(store: &S, role: Role) -> ApiResult<RoleWithPermissions>
where
    S: AccessStore + ?Sized,
{
    let permissions = store.role_permissions(role.id).await?;
    Ok(RoleWithPermissions { role, permissions })
}

fn role_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Role {} not found", id))
}
