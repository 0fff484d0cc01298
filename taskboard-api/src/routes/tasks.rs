/// Task endpoints, nested under a project
///
/// - `GET /projects/:project_id/tasks` - Tasks the caller may see, with assignees
/// - `POST /projects/:project_id/tasks` - Create
/// - `GET /projects/:project_id/tasks/:id` - Single read with the private-task check
/// - `PUT /projects/:project_id/tasks/:id` - Partial update
/// - `DELETE /projects/:project_id/tasks/:id` - Delete
///
/// Callers without `read_private_task` only ever see `public` tasks in
/// listings; reading a private task directly answers 400.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::JsonBody,
    routes::projects::project_not_found,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::Principal,
    models::task::{CreateTask, Task, TaskWithAssignee, UpdateTask, Visibility},
    services::visibility::{list_visible_tasks, read_task},
};
use tracing::info;
use validator::Validate;

/// Create request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    /// Assignee
    #[serde(default)]
    pub user_id: Option<i64>,

    #[serde(default)]
    pub file_id: Option<i64>,

    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default, rename = "type")]
    pub visibility: Visibility,
}

pub async fn index(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
) -> ApiResult<Json<Vec<TaskWithAssignee>>> {
    let tasks = list_visible_tasks(state.gateway.as_ref(), &principal.grants, project_id).await?;

    Ok(Json(tasks))
}

pub async fn store(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(project_id): Path<i64>,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    if state.gateway.find_project(project_id).await?.is_none() {
        return Err(project_not_found(project_id));
    }

    let task = state
        .gateway
        .create_task(CreateTask {
            project_id,
            user_id: req.user_id,
            file_id: req.file_id,
            title: req.title,
            description: req.description,
            due_date: req.due_date,
            visibility: req.visibility,
        })
        .await?;

    info!(
        task_id = task.id,
        project_id,
        created_by = principal.user_id,
        visibility = %task.visibility,
        "Task created"
    );
    Ok(Json(task))
}

pub async fn show(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path((project_id, id)): Path<(i64, i64)>,
) -> ApiResult<Json<Task>> {
    let task = read_task(state.gateway.as_ref(), &principal.grants, project_id, id).await?;

    Ok(Json(task))
}

pub async fn update(
    State(state): State<AppState>,
    Path((project_id, id)): Path<(i64, i64)>,
    JsonBody(changes): JsonBody<UpdateTask>,
) -> ApiResult<Json<Task>> {
    if changes.title.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "title".to_string(),
            message: "Title must not be empty".to_string(),
        }]));
    }

    let task = state
        .gateway
        .update_task(project_id, id, changes)
        .await?
        .ok_or_else(|| task_not_found(id))?;

    Ok(Json(task))
}

pub async fn destroy(
    State(state): State<AppState>,
    Path((project_id, id)): Path<(i64, i64)>,
) -> ApiResult<StatusCode> {
    if !state.gateway.delete_task(project_id, id).await? {
        return Err(task_not_found(id));
    }

    info!(task_id = id, project_id, "Task deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn task_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Task {} not found", id))
}
