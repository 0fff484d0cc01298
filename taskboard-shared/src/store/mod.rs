/// Persistence gateway
///
/// Handlers and services never touch SQL directly; they go through these
/// ports, grouped by aggregate and combined into [`Gateway`].
///
/// # Implementations
///
/// - [`postgres::PgStore`]: sqlx over a `PgPool`, the production backend
/// - [`memory::MemoryStore`]: in-process maps behind a `RwLock`, available
///   with the `memory-store` feature and in this crate's own tests
///
/// # Errors
///
/// Unique and foreign-key violations surface as [`StoreError::Conflict`];
/// any other database failure is [`StoreError::Database`]. "Not found" on a
/// lookup is `Ok(None)` / `Ok(false)`, left to the caller to interpret.

use async_trait::async_trait;

use crate::auth::authorization::Grants;
use crate::models::address::{Address, NewAddress};
use crate::models::file::{CreateFile, File};
use crate::models::pagination::{Page, PageRequest};
use crate::models::permission::{CreatePermission, Permission, UpdatePermission};
use crate::models::project::{CreateProject, Project, ProjectWithOwner, UpdateProject};
use crate::models::role::{CreateRole, Role, UpdateRole};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskWithAssignee, UpdateTask};
use crate::models::user::{CreateUser, User, UserWrite};

#[cfg(any(test, feature = "memory-store"))]
pub mod memory;
pub mod postgres;

/// Error type for persistence operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique or foreign-key constraint violated
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// Any other storage failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() || db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Conflict(constraint);
            }
        }

        StoreError::Database(err)
    }
}

/// Result alias for gateway calls
pub type StoreResult<T> = Result<T, StoreError>;

/// Users and their addresses
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user and all its addresses atomically
    ///
    /// Either the user and every address persist, or nothing does.
    async fn create_user_with_addresses(
        &self,
        user: CreateUser,
        addresses: Vec<NewAddress>,
    ) -> StoreResult<User>;

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>>;

    /// Applies a partial update; columns absent from the write are untouched
    async fn update_user(&self, id: i64, changes: UserWrite) -> StoreResult<Option<User>>;

    async fn list_addresses(&self, user_id: i64) -> StoreResult<Vec<Address>>;
}

/// Roles, permissions and their assignments
#[async_trait]
pub trait AccessStore: Send + Sync {
    /// Links roles to a user; fails with `Conflict` on an unknown role id
    async fn attach_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()>;

    /// Links permissions to a user; fails with `Conflict` on an unknown id
    async fn attach_permissions(&self, user_id: i64, permission_ids: &[i64]) -> StoreResult<()>;

    async fn user_roles(&self, user_id: i64) -> StoreResult<Vec<Role>>;

    /// Permissions granted directly to the user
    async fn user_permissions(&self, user_id: i64) -> StoreResult<Vec<Permission>>;

    /// Role slugs plus effective permission slugs (direct and via roles)
    async fn grants(&self, user_id: i64) -> StoreResult<Grants>;

    async fn list_roles(&self) -> StoreResult<Vec<Role>>;
    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>>;
    async fn create_role(&self, role: CreateRole) -> StoreResult<Role>;
    async fn update_role(&self, id: i64, changes: UpdateRole) -> StoreResult<Option<Role>>;
    async fn delete_role(&self, id: i64) -> StoreResult<bool>;

    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>>;

    /// Replaces the role's permission set
    async fn sync_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> StoreResult<()>;

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>>;
    async fn find_permission(&self, id: i64) -> StoreResult<Option<Permission>>;
    async fn create_permission(&self, permission: CreatePermission) -> StoreResult<Permission>;
    async fn update_permission(
        &self,
        id: i64,
        changes: UpdatePermission,
    ) -> StoreResult<Option<Permission>>;
    async fn delete_permission(&self, id: i64) -> StoreResult<bool>;
}

/// Projects
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// One page of projects, ordered by id, each with its owner
    async fn list_projects(&self, page: PageRequest) -> StoreResult<Page<ProjectWithOwner>>;

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>>;
    async fn create_project(&self, project: CreateProject) -> StoreResult<Project>;
    async fn update_project(&self, id: i64, changes: UpdateProject) -> StoreResult<Option<Project>>;

    /// Deletes the project and, by cascade, its tasks
    async fn delete_project(&self, id: i64) -> StoreResult<bool>;
}

/// Tasks, always addressed within their project
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Tasks of a project matching the filter, ordered by id, with assignees
    async fn list_tasks(
        &self,
        project_id: i64,
        filter: TaskFilter,
    ) -> StoreResult<Vec<TaskWithAssignee>>;

    async fn find_task(&self, project_id: i64, id: i64) -> StoreResult<Option<Task>>;
    async fn create_task(&self, task: CreateTask) -> StoreResult<Task>;
    async fn update_task(
        &self,
        project_id: i64,
        id: i64,
        changes: UpdateTask,
    ) -> StoreResult<Option<Task>>;
    async fn delete_task(&self, project_id: i64, id: i64) -> StoreResult<bool>;
}

/// Uploaded file metadata
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn create_file(&self, file: CreateFile) -> StoreResult<File>;
    async fn find_file(&self, id: i64) -> StoreResult<Option<File>>;
}

/// Every port a request handler may need
#[async_trait]
pub trait Gateway: UserStore + AccessStore + ProjectStore + TaskStore + FileStore {
    /// Checks backend connectivity
    async fn ping(&self) -> StoreResult<()>;
}
