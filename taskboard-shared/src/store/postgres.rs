/// PostgreSQL gateway
///
/// Runtime-checked sqlx queries over a shared `PgPool`. Partial updates are
/// assembled with `QueryBuilder` so only supplied columns are written.
/// Relations (owners, assignees) are loaded with a second `= ANY($1)` query
/// rather than joins, keeping every row type a plain `FromRow` struct.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::{postgres::PgStore, ProjectStore};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
/// let store = PgStore::new(pool);
///
/// let project = store.find_project(1).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tracing::debug;

use super::{
    AccessStore, FileStore, Gateway, ProjectStore, StoreResult, TaskStore, UserStore,
};
use crate::auth::authorization::Grants;
use crate::db::pool::health_check;
use crate::models::address::{Address, NewAddress};
use crate::models::file::{CreateFile, File};
use crate::models::pagination::{Page, PageRequest};
use crate::models::permission::{CreatePermission, Permission, UpdatePermission};
use crate::models::project::{CreateProject, Project, ProjectWithOwner, UpdateProject};
use crate::models::role::{CreateRole, Role, UpdateRole};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskWithAssignee, UpdateTask};
use crate::models::user::{CreateUser, User, UserWrite};

const USER_COLUMNS: &str =
    "id, username, email, password, token, token_created_at, created_at, updated_at";
const ADDRESS_COLUMNS: &str =
    "id, user_id, street, number, district, city, state, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, user_id, title, description, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, project_id, user_id, file_id, title, description, due_date, type, created_at, updated_at";
const ACL_COLUMNS: &str = "id, slug, name, description, created_at, updated_at";
const FILE_COLUMNS: &str = "id, file, name, type, subtype, created_at, updated_at";

/// sqlx-backed gateway
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn users_by_id(&self, mut ids: Vec<i64>) -> StoreResult<HashMap<i64, User>> {
        ids.sort_unstable();
        ids.dedup();

        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let sql = format!("SELECT {} FROM users WHERE id = ANY($1)", USER_COLUMNS);
        let users: Vec<User> = sqlx::query_as(&sql).bind(ids).fetch_all(&self.pool).await?;

        Ok(users.into_iter().map(|u| (u.id, u)).collect())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user_with_addresses(
        &self,
        user: CreateUser,
        addresses: Vec<NewAddress>,
    ) -> StoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO users (username, email, password) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );
        let created: User = sqlx::query_as(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&mut *tx)
            .await?;

        for address in &addresses {
            sqlx::query(
                "INSERT INTO user_addresses (user_id, street, number, district, city, state)
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(created.id)
            .bind(&address.street)
            .bind(address.number)
            .bind(&address.district)
            .bind(&address.city)
            .bind(&address.state)
            .execute(&mut *tx)
            .await?;
        }

        // Dropping `tx` on an early return rolls everything back
        tx.commit().await?;

        debug!(user_id = created.id, addresses = addresses.len(), "User committed");
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(email).fetch_optional(&self.pool).await?)
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE token = $1", USER_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(token).fetch_optional(&self.pool).await?)
    }

    async fn update_user(&self, id: i64, changes: UserWrite) -> StoreResult<Option<User>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

        if let Some(username) = changes.username {
            query.push(", username = ").push_bind(username);
        }
        if let Some(email) = changes.email {
            query.push(", email = ").push_bind(email);
        }
        if let Some(hash) = changes.password_hash {
            query.push(", password = ").push_bind(hash);
        }
        if let Some(token) = changes.token {
            query.push(", token = ").push_bind(token);
        }
        if let Some(created_at) = changes.token_created_at {
            query.push(", token_created_at = ").push_bind(created_at);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING ").push(USER_COLUMNS);

        Ok(query.build_query_as::<User>().fetch_optional(&self.pool).await?)
    }

    async fn list_addresses(&self, user_id: i64) -> StoreResult<Vec<Address>> {
        let sql = format!(
            "SELECT {} FROM user_addresses WHERE user_id = $1 ORDER BY id",
            ADDRESS_COLUMNS
        );
        Ok(sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }
}

#[async_trait]
impl AccessStore for PgStore {
    async fn attach_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()> {
        if role_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO role_user (role_id, user_id)
             SELECT UNNEST($1::BIGINT[]), $2
             ON CONFLICT DO NOTHING",
        )
        .bind(role_ids.to_vec())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn attach_permissions(&self, user_id: i64, permission_ids: &[i64]) -> StoreResult<()> {
        if permission_ids.is_empty() {
            return Ok(());
        }

        sqlx::query(
            "INSERT INTO permission_user (permission_id, user_id)
             SELECT UNNEST($1::BIGINT[]), $2
             ON CONFLICT DO NOTHING",
        )
        .bind(permission_ids.to_vec())
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn user_roles(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        Ok(sqlx::query_as(
            "SELECT r.id, r.slug, r.name, r.description, r.created_at, r.updated_at
             FROM roles r
             JOIN role_user ru ON ru.role_id = r.id
             WHERE ru.user_id = $1
             ORDER BY r.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn user_permissions(&self, user_id: i64) -> StoreResult<Vec<Permission>> {
        Ok(sqlx::query_as(
            "SELECT p.id, p.slug, p.name, p.description, p.created_at, p.updated_at
             FROM permissions p
             JOIN permission_user pu ON pu.permission_id = p.id
             WHERE pu.user_id = $1
             ORDER BY p.id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn grants(&self, user_id: i64) -> StoreResult<Grants> {
        let roles: Vec<String> = sqlx::query_scalar(
            "SELECT r.slug FROM roles r
             JOIN role_user ru ON ru.role_id = r.id
             WHERE ru.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let permissions: Vec<String> = sqlx::query_scalar(
            "SELECT p.slug FROM permissions p
             JOIN permission_user pu ON pu.permission_id = p.id
             WHERE pu.user_id = $1
             UNION
             SELECT p.slug FROM permissions p
             JOIN permission_role pr ON pr.permission_id = p.id
             JOIN role_user ru ON ru.role_id = pr.role_id
             WHERE ru.user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Grants::new(roles, permissions))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        let sql = format!("SELECT {} FROM roles ORDER BY id", ACL_COLUMNS);
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>> {
        let sql = format!("SELECT {} FROM roles WHERE id = $1", ACL_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_role(&self, role: CreateRole) -> StoreResult<Role> {
        let sql = format!(
            "INSERT INTO roles (slug, name, description) VALUES ($1, $2, $3) RETURNING {}",
            ACL_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(role.slug)
            .bind(role.name)
            .bind(role.description)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_role(&self, id: i64, changes: UpdateRole) -> StoreResult<Option<Role>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE roles SET updated_at = NOW()");

        if let Some(slug) = changes.slug {
            query.push(", slug = ").push_bind(slug);
        }
        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING ").push(ACL_COLUMNS);

        Ok(query.build_query_as::<Role>().fetch_optional(&self.pool).await?)
    }

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        Ok(sqlx::query_as(
            "SELECT p.id, p.slug, p.name, p.description, p.created_at, p.updated_at
             FROM permissions p
             JOIN permission_role pr ON pr.permission_id = p.id
             WHERE pr.role_id = $1
             ORDER BY p.id",
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn sync_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM permission_role WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;

        if !permission_ids.is_empty() {
            sqlx::query(
                "INSERT INTO permission_role (permission_id, role_id)
                 SELECT UNNEST($1::BIGINT[]), $2
                 ON CONFLICT DO NOTHING",
            )
            .bind(permission_ids.to_vec())
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        let sql = format!("SELECT {} FROM permissions ORDER BY id", ACL_COLUMNS);
        Ok(sqlx::query_as(&sql).fetch_all(&self.pool).await?)
    }

    async fn find_permission(&self, id: i64) -> StoreResult<Option<Permission>> {
        let sql = format!("SELECT {} FROM permissions WHERE id = $1", ACL_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_permission(&self, permission: CreatePermission) -> StoreResult<Permission> {
        let sql = format!(
            "INSERT INTO permissions (slug, name, description) VALUES ($1, $2, $3) RETURNING {}",
            ACL_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(permission.slug)
            .bind(permission.name)
            .bind(permission.description)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_permission(
        &self,
        id: i64,
        changes: UpdatePermission,
    ) -> StoreResult<Option<Permission>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE permissions SET updated_at = NOW()");

        if let Some(slug) = changes.slug {
            query.push(", slug = ").push_bind(slug);
        }
        if let Some(name) = changes.name {
            query.push(", name = ").push_bind(name);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING ").push(ACL_COLUMNS);

        Ok(query.build_query_as::<Permission>().fetch_optional(&self.pool).await?)
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectStore for PgStore {
    async fn list_projects(&self, page: PageRequest) -> StoreResult<Page<ProjectWithOwner>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
            .fetch_one(&self.pool)
            .await?;

        let sql = format!(
            "SELECT {} FROM projects ORDER BY id LIMIT $1 OFFSET $2",
            PROJECT_COLUMNS
        );
        let projects: Vec<Project> = sqlx::query_as(&sql)
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        let owners = self
            .users_by_id(projects.iter().map(|p| p.user_id).collect())
            .await?;

        let data = projects
            .into_iter()
            .map(|project| ProjectWithOwner {
                user: owners.get(&project.user_id).cloned(),
                project,
            })
            .collect();

        Ok(Page::new(page, total, data))
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        let sql = format!("SELECT {} FROM projects WHERE id = $1", PROJECT_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_project(&self, project: CreateProject) -> StoreResult<Project> {
        let sql = format!(
            "INSERT INTO projects (user_id, title, description) VALUES ($1, $2, $3) RETURNING {}",
            PROJECT_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(project.user_id)
            .bind(project.title)
            .bind(project.description)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_project(&self, id: i64, changes: UpdateProject) -> StoreResult<Option<Project>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");

        if let Some(title) = changes.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" RETURNING ").push(PROJECT_COLUMNS);

        Ok(query.build_query_as::<Project>().fetch_optional(&self.pool).await?)
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn list_tasks(
        &self,
        project_id: i64,
        filter: TaskFilter,
    ) -> StoreResult<Vec<TaskWithAssignee>> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT ");
        query.push(TASK_COLUMNS);
        query.push(" FROM tasks WHERE project_id = ").push_bind(project_id);

        if let Some(visibility) = filter.visibility {
            query.push(" AND type = ").push_bind(visibility.as_str());
        }

        query.push(" ORDER BY id");

        let tasks: Vec<Task> = query.build_query_as().fetch_all(&self.pool).await?;

        let assignees = self
            .users_by_id(tasks.iter().filter_map(|t| t.user_id).collect())
            .await?;

        Ok(tasks
            .into_iter()
            .map(|task| TaskWithAssignee {
                user: task.user_id.and_then(|id| assignees.get(&id).cloned()),
                task,
            })
            .collect())
    }

    async fn find_task(&self, project_id: i64, id: i64) -> StoreResult<Option<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks WHERE id = $1 AND project_id = $2",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(id)
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn create_task(&self, task: CreateTask) -> StoreResult<Task> {
        let sql = format!(
            "INSERT INTO tasks (project_id, user_id, file_id, title, description, due_date, type)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(task.project_id)
            .bind(task.user_id)
            .bind(task.file_id)
            .bind(task.title)
            .bind(task.description)
            .bind(task.due_date)
            .bind(task.visibility.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_task(
        &self,
        project_id: i64,
        id: i64,
        changes: UpdateTask,
    ) -> StoreResult<Option<Task>> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");

        if let Some(user_id) = changes.user_id {
            query.push(", user_id = ").push_bind(user_id);
        }
        if let Some(file_id) = changes.file_id {
            query.push(", file_id = ").push_bind(file_id);
        }
        if let Some(title) = changes.title {
            query.push(", title = ").push_bind(title);
        }
        if let Some(description) = changes.description {
            query.push(", description = ").push_bind(description);
        }
        if let Some(due_date) = changes.due_date {
            query.push(", due_date = ").push_bind(due_date);
        }
        if let Some(visibility) = changes.visibility {
            query.push(", type = ").push_bind(visibility.as_str());
        }

        query.push(" WHERE id = ").push_bind(id);
        query.push(" AND project_id = ").push_bind(project_id);
        query.push(" RETURNING ").push(TASK_COLUMNS);

        Ok(query.build_query_as::<Task>().fetch_optional(&self.pool).await?)
    }

    async fn delete_task(&self, project_id: i64, id: i64) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND project_id = $2")
            .bind(id)
            .bind(project_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FileStore for PgStore {
    async fn create_file(&self, file: CreateFile) -> StoreResult<File> {
        let sql = format!(
            "INSERT INTO files (file, name, type, subtype) VALUES ($1, $2, $3, $4) RETURNING {}",
            FILE_COLUMNS
        );
        Ok(sqlx::query_as(&sql)
            .bind(file.file)
            .bind(file.name)
            .bind(file.mime_type)
            .bind(file.subtype)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_file(&self, id: i64) -> StoreResult<Option<File>> {
        let sql = format!("SELECT {} FROM files WHERE id = $1", FILE_COLUMNS);
        Ok(sqlx::query_as(&sql).bind(id).fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl Gateway for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
