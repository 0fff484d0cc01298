/// Project endpoints
///
/// - `GET /projects?page=` - Paginated list with owners
/// - `POST /projects` - Create, owned by the caller
/// - `GET /projects/:id` - Detail with owner and the tasks the caller may see
/// - `PUT /projects/:id` - Partial update of `title` / `description`
/// - `DELETE /projects/:id` - Delete with its tasks

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::JsonBody,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::Principal,
    models::{
        pagination::{Page, PageRequest, DEFAULT_PER_PAGE},
        project::{CreateProject, Project, ProjectDetail, ProjectWithOwner, UpdateProject},
    },
    services::visibility::list_visible_tasks,
};
use tracing::info;
use validator::Validate;

/// `?page=` query string
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
}

/// Update request; absent fields are left as they are
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Title must not be empty"))]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: Option<String>,
}

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<ProjectWithOwner>>> {
    let page = state
        .gateway
        .list_projects(PageRequest::new(query.page, DEFAULT_PER_PAGE))
        .await?;

    Ok(Json(page))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    JsonBody(req): JsonBody<CreateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .gateway
        .create_project(CreateProject {
            user_id: principal.user_id,
            title: req.title,
            description: req.description,
        })
        .await?;

    info!(project_id = project.id, user_id = principal.user_id, "Project created");
    Ok(Json(project))
}

/// Project detail; private tasks are omitted unless the caller holds
/// `read_private_task`
pub async fn show(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<i64>,
) -> ApiResult<Json<ProjectDetail>> {
    let project = state
        .gateway
        .find_project(id)
        .await?
        .ok_or_else(|| project_not_found(id))?;

    let user = state.gateway.find_user(project.user_id).await?;
    let tasks = list_visible_tasks(state.gateway.as_ref(), &principal.grants, id).await?;

    Ok(Json(ProjectDetail {
        project,
        user,
        tasks,
    }))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    JsonBody(req): JsonBody<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let changes = UpdateProject {
        title: req.title,
        description: req.description,
    };

    let project = state
        .gateway
        .update_project(id, changes)
        .await?
        .ok_or_else(|| project_not_found(id))?;

    Ok(Json(project))
}

pub async fn destroy(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<StatusCode> {
    if !state.gateway.delete_project(id).await? {
        return Err(project_not_found(id));
    }

    info!(project_id = id, "Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) fn project_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Project {} not found", id))
}
