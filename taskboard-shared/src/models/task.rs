/// Task model
///
/// Tasks belong to a project and may be assigned to a user and reference an
/// uploaded file. Each task carries a visibility; `private` tasks are only
/// readable by principals holding `read_private_task`.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     project_id BIGINT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
///     user_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     file_id BIGINT REFERENCES files(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     due_date TIMESTAMPTZ,
///     type VARCHAR(16) NOT NULL DEFAULT 'public' CHECK (type IN ('public', 'private')),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::double_option;
use crate::models::user::User;

/// Task visibility, stored in the `type` column
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Readable by anyone passing the read guard
    #[default]
    Public,

    /// Readable only with `read_private_task`
    Private,
}

impl Visibility {
    /// Converts visibility to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            other => Err(format!("Invalid task visibility: {}", other)),
        }
    }
}

impl TryFrom<String> for Visibility {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task within a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,

    /// Assignee
    pub user_id: Option<i64>,

    /// Attached file
    pub file_id: Option<i64>,

    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,

    #[serde(rename = "type")]
    #[sqlx(rename = "type", try_from = "String")]
    pub visibility: Visibility,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub project_id: i64,
    pub user_id: Option<i64>,
    pub file_id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub visibility: Visibility,
}

/// Partial task update
///
/// Nullable columns use `Some(None)` to clear; an explicit JSON `null` in a
/// request body deserializes that way.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTask {
    #[serde(default, deserialize_with = "double_option")]
    pub user_id: Option<Option<i64>>,

    #[serde(default, deserialize_with = "double_option")]
    pub file_id: Option<Option<i64>>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, rename = "type")]
    pub visibility: Option<Visibility>,
}

impl UpdateTask {
    /// Merges supplied fields into a task
    pub fn apply(self, task: &mut Task) {
        if let Some(user_id) = self.user_id {
            task.user_id = user_id;
        }
        if let Some(file_id) = self.file_id {
            task.file_id = file_id;
        }
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(visibility) = self.visibility {
            task.visibility = visibility;
        }
    }
}

/// Predicate applied when listing a project's tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Restrict to one visibility; `None` matches every task
    pub visibility: Option<Visibility>,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        self.visibility.map_or(true, |v| task.visibility == v)
    }
}

/// Task with its assignee loaded
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAssignee {
    #[serde(flatten)]
    pub task: Task,

    pub user: Option<User>,
}
