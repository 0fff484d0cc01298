/// Project model
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a project deletes its tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::task::TaskWithAssignee;
use crate::models::user::User;

/// Project owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Project {
    pub id: i64,

    /// Owner
    pub user_id: i64,

    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub user_id: i64,
    pub title: String,
    pub description: String,
}

/// Partial project update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProject {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UpdateProject {
    /// Merges supplied fields into a project
    pub fn apply(self, project: &mut Project) {
        if let Some(title) = self.title {
            project.title = title;
        }
        if let Some(description) = self.description {
            project.description = description;
        }
    }
}

/// Project with its owner loaded
#[derive(Debug, Clone, Serialize)]
pub struct ProjectWithOwner {
    #[serde(flatten)]
    pub project: Project,

    pub user: Option<User>,
}

/// Project with owner and tasks loaded
#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,

    pub user: Option<User>,
    pub tasks: Vec<TaskWithAssignee>,
}
