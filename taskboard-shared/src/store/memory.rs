/// In-memory gateway
///
/// Keeps every table in ordered maps behind a single `tokio::sync::RwLock`
/// and enforces the same unique and foreign-key constraints as the SQL
/// schema, reporting violations as [`StoreError::Conflict`]. Multi-row
/// writes stage their changes on a copy of the tables and swap it in only
/// on success, so a failure leaves nothing behind.
///
/// Address inserts can be made to fail on demand to exercise rollback.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;

use super::{
    AccessStore, FileStore, Gateway, ProjectStore, StoreError, StoreResult, TaskStore, UserStore,
};
use crate::auth::authorization::Grants;
use crate::models::address::{Address, NewAddress};
use crate::models::file::{CreateFile, File};
use crate::models::pagination::{Page, PageRequest};
use crate::models::permission::{CreatePermission, Permission, UpdatePermission};
use crate::models::project::{CreateProject, Project, ProjectWithOwner, UpdateProject};
use crate::models::role::{CreateRole, Role, UpdateRole};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskWithAssignee, UpdateTask};
use crate::models::user::{CreateUser, User, UserWrite};

#[derive(Debug, Clone, Default)]
struct Tables {
    sequences: HashMap<&'static str, i64>,
    users: BTreeMap<i64, User>,
    addresses: BTreeMap<i64, Address>,
    projects: BTreeMap<i64, Project>,
    tasks: BTreeMap<i64, Task>,
    roles: BTreeMap<i64, Role>,
    permissions: BTreeMap<i64, Permission>,
    files: BTreeMap<i64, File>,

    /// (role_id, user_id)
    role_user: BTreeSet<(i64, i64)>,
    /// (permission_id, user_id)
    permission_user: BTreeSet<(i64, i64)>,
    /// (permission_id, role_id)
    permission_role: BTreeSet<(i64, i64)>,
}

impl Tables {
    fn next_id(&mut self, table: &'static str) -> i64 {
        let seq = self.sequences.entry(table).or_insert(0);
        *seq += 1;
        *seq
    }

    fn check_user_unique(&self, id: Option<i64>, username: &str, email: &str) -> StoreResult<()> {
        for user in self.users.values().filter(|u| Some(u.id) != id) {
            if user.username == username {
                return Err(conflict("users_username_key"));
            }
            if user.email == email {
                return Err(conflict("users_email_key"));
            }
        }
        Ok(())
    }

    fn check_task_refs(&self, user_id: Option<i64>, file_id: Option<i64>) -> StoreResult<()> {
        if let Some(user_id) = user_id {
            if !self.users.contains_key(&user_id) {
                return Err(conflict("tasks_user_id_fkey"));
            }
        }
        if let Some(file_id) = file_id {
            if !self.files.contains_key(&file_id) {
                return Err(conflict("tasks_file_id_fkey"));
            }
        }
        Ok(())
    }
}

fn conflict(constraint: &str) -> StoreError {
    StoreError::Conflict(constraint.to_string())
}

fn check_acl_unique<'a>(
    mut existing: impl Iterator<Item = (i64, &'a str, &'a str)>,
    id: Option<i64>,
    slug: &str,
    name: &str,
    table: &str,
) -> StoreResult<()> {
    match existing.find(|(other, s, n)| Some(*other) != id && (*s == slug || *n == name)) {
        Some((_, s, _)) if s == slug => Err(conflict(&format!("{}_slug_key", table))),
        Some(_) => Err(conflict(&format!("{}_name_key", table))),
        None => Ok(()),
    }
}

/// Gateway over in-process tables
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_address_inserts: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent address insert fail with a database error
    pub fn fail_address_inserts(&self, fail: bool) {
        self.fail_address_inserts.store(fail, Ordering::SeqCst);
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.tables.read().await.users.len()
    }

    /// Number of stored addresses
    pub async fn address_count(&self) -> usize {
        self.tables.read().await.addresses.len()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user_with_addresses(
        &self,
        user: CreateUser,
        addresses: Vec<NewAddress>,
    ) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();

        staged.check_user_unique(None, &user.username, &user.email)?;

        let now = Utc::now();
        let id = staged.next_id("users");
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password_hash,
            token: None,
            token_created_at: None,
            created_at: now,
            updated_at: now,
        };
        staged.users.insert(id, created.clone());

        for address in addresses {
            if self.fail_address_inserts.load(Ordering::SeqCst) {
                return Err(StoreError::Database(sqlx::Error::Protocol(
                    "address insert failed".to_string(),
                )));
            }

            let address_id = staged.next_id("user_addresses");
            staged.addresses.insert(
                address_id,
                Address {
                    id: address_id,
                    user_id: id,
                    street: address.street,
                    number: address.number,
                    district: address.district,
                    city: address.city,
                    state: address.state,
                    created_at: now,
                    updated_at: now,
                },
            );
        }

        *tables = staged;
        Ok(created)
    }

    async fn find_user(&self, id: i64) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_token(&self, token: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.token.as_deref() == Some(token))
            .cloned())
    }

    async fn update_user(&self, id: i64, changes: UserWrite) -> StoreResult<Option<User>> {
        let mut tables = self.tables.write().await;

        let Some(mut user) = tables.users.get(&id).cloned() else {
            return Ok(None);
        };

        changes.apply(&mut user);
        tables.check_user_unique(Some(id), &user.username, &user.email)?;
        user.updated_at = Utc::now();

        tables.users.insert(id, user.clone());
        Ok(Some(user))
    }

    async fn list_addresses(&self, user_id: i64) -> StoreResult<Vec<Address>> {
        let tables = self.tables.read().await;
        Ok(tables
            .addresses
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AccessStore for MemoryStore {
    async fn attach_roles(&self, user_id: i64, role_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(conflict("role_user_user_id_fkey"));
        }
        if role_ids.iter().any(|id| !tables.roles.contains_key(id)) {
            return Err(conflict("role_user_role_id_fkey"));
        }

        tables
            .role_user
            .extend(role_ids.iter().map(|role_id| (*role_id, user_id)));
        Ok(())
    }

    async fn attach_permissions(&self, user_id: i64, permission_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&user_id) {
            return Err(conflict("permission_user_user_id_fkey"));
        }
        if permission_ids
            .iter()
            .any(|id| !tables.permissions.contains_key(id))
        {
            return Err(conflict("permission_user_permission_id_fkey"));
        }

        tables
            .permission_user
            .extend(permission_ids.iter().map(|permission_id| (*permission_id, user_id)));
        Ok(())
    }

    async fn user_roles(&self, user_id: i64) -> StoreResult<Vec<Role>> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .values()
            .filter(|r| tables.role_user.contains(&(r.id, user_id)))
            .cloned()
            .collect())
    }

    async fn user_permissions(&self, user_id: i64) -> StoreResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| tables.permission_user.contains(&(p.id, user_id)))
            .cloned()
            .collect())
    }

    async fn grants(&self, user_id: i64) -> StoreResult<Grants> {
        let tables = self.tables.read().await;

        let role_ids: BTreeSet<i64> = tables
            .role_user
            .iter()
            .filter(|(_, uid)| *uid == user_id)
            .map(|(rid, _)| *rid)
            .collect();

        let roles = role_ids
            .iter()
            .filter_map(|id| tables.roles.get(id))
            .map(|r| r.slug.clone());

        let permissions = tables
            .permissions
            .values()
            .filter(|p| {
                tables.permission_user.contains(&(p.id, user_id))
                    || role_ids
                        .iter()
                        .any(|rid| tables.permission_role.contains(&(p.id, *rid)))
            })
            .map(|p| p.slug.clone());

        Ok(Grants::new(roles, permissions))
    }

    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        Ok(self.tables.read().await.roles.values().cloned().collect())
    }

    async fn find_role(&self, id: i64) -> StoreResult<Option<Role>> {
        Ok(self.tables.read().await.roles.get(&id).cloned())
    }

    async fn create_role(&self, role: CreateRole) -> StoreResult<Role> {
        let mut tables = self.tables.write().await;

        check_acl_unique(
            tables.roles.values().map(|r| (r.id, r.slug.as_str(), r.name.as_str())),
            None,
            &role.slug,
            &role.name,
            "roles",
        )?;

        let now = Utc::now();
        let id = tables.next_id("roles");
        let created = Role {
            id,
            slug: role.slug,
            name: role.name,
            description: role.description,
            created_at: now,
            updated_at: now,
        };

        tables.roles.insert(id, created.clone());
        Ok(created)
    }

    async fn update_role(&self, id: i64, changes: UpdateRole) -> StoreResult<Option<Role>> {
        let mut tables = self.tables.write().await;

        let Some(mut role) = tables.roles.get(&id).cloned() else {
            return Ok(None);
        };

        changes.apply(&mut role);
        check_acl_unique(
            tables.roles.values().map(|r| (r.id, r.slug.as_str(), r.name.as_str())),
            Some(id),
            &role.slug,
            &role.name,
            "roles",
        )?;
        role.updated_at = Utc::now();

        tables.roles.insert(id, role.clone());
        Ok(Some(role))
    }

    async fn delete_role(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.roles.remove(&id).is_none() {
            return Ok(false);
        }

        tables.role_user.retain(|(rid, _)| *rid != id);
        tables.permission_role.retain(|(_, rid)| *rid != id);
        Ok(true)
    }

    async fn role_permissions(&self, role_id: i64) -> StoreResult<Vec<Permission>> {
        let tables = self.tables.read().await;
        Ok(tables
            .permissions
            .values()
            .filter(|p| tables.permission_role.contains(&(p.id, role_id)))
            .cloned()
            .collect())
    }

    async fn sync_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;

        if !tables.roles.contains_key(&role_id) {
            return Err(conflict("permission_role_role_id_fkey"));
        }
        if permission_ids
            .iter()
            .any(|id| !tables.permissions.contains_key(id))
        {
            return Err(conflict("permission_role_permission_id_fkey"));
        }

        tables.permission_role.retain(|(_, rid)| *rid != role_id);
        tables
            .permission_role
            .extend(permission_ids.iter().map(|pid| (*pid, role_id)));
        Ok(())
    }

    async fn list_permissions(&self) -> StoreResult<Vec<Permission>> {
        Ok(self.tables.read().await.permissions.values().cloned().collect())
    }

    async fn find_permission(&self, id: i64) -> StoreResult<Option<Permission>> {
        Ok(self.tables.read().await.permissions.get(&id).cloned())
    }

    async fn create_permission(&self, permission: CreatePermission) -> StoreResult<Permission> {
        let mut tables = self.tables.write().await;

        check_acl_unique(
            tables
                .permissions
                .values()
                .map(|p| (p.id, p.slug.as_str(), p.name.as_str())),
            None,
            &permission.slug,
            &permission.name,
            "permissions",
        )?;

        let now = Utc::now();
        let id = tables.next_id("permissions");
        let created = Permission {
            id,
            slug: permission.slug,
            name: permission.name,
            description: permission.description,
            created_at: now,
            updated_at: now,
        };

        tables.permissions.insert(id, created.clone());
        Ok(created)
    }

    async fn update_permission(
        &self,
        id: i64,
        changes: UpdatePermission,
    ) -> StoreResult<Option<Permission>> {
        let mut tables = self.tables.write().await;

        let Some(mut permission) = tables.permissions.get(&id).cloned() else {
            return Ok(None);
        };

        changes.apply(&mut permission);
        check_acl_unique(
            tables
                .permissions
                .values()
                .map(|p| (p.id, p.slug.as_str(), p.name.as_str())),
            Some(id),
            &permission.slug,
            &permission.name,
            "permissions",
        )?;
        permission.updated_at = Utc::now();

        tables.permissions.insert(id, permission.clone());
        Ok(Some(permission))
    }

    async fn delete_permission(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.permissions.remove(&id).is_none() {
            return Ok(false);
        }

        tables.permission_user.retain(|(pid, _)| *pid != id);
        tables.permission_role.retain(|(pid, _)| *pid != id);
        Ok(true)
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn list_projects(&self, page: PageRequest) -> StoreResult<Page<ProjectWithOwner>> {
        let tables = self.tables.read().await;

        let data = tables
            .projects
            .values()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.per_page).unwrap_or(usize::MAX))
            .map(|project| ProjectWithOwner {
                user: tables.users.get(&project.user_id).cloned(),
                project: project.clone(),
            })
            .collect();

        Ok(Page::new(page, tables.projects.len() as i64, data))
    }

    async fn find_project(&self, id: i64) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&id).cloned())
    }

    async fn create_project(&self, project: CreateProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&project.user_id) {
            return Err(conflict("projects_user_id_fkey"));
        }

        let now = Utc::now();
        let id = tables.next_id("projects");
        let created = Project {
            id,
            user_id: project.user_id,
            title: project.title,
            description: project.description,
            created_at: now,
            updated_at: now,
        };

        tables.projects.insert(id, created.clone());
        Ok(created)
    }

    async fn update_project(&self, id: i64, changes: UpdateProject) -> StoreResult<Option<Project>> {
        let mut tables = self.tables.write().await;

        let Some(project) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };

        changes.apply(project);
        project.updated_at = Utc::now();
        Ok(Some(project.clone()))
    }

    async fn delete_project(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if tables.projects.remove(&id).is_none() {
            return Ok(false);
        }

        tables.tasks.retain(|_, task| task.project_id != id);
        Ok(true)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(
        &self,
        project_id: i64,
        filter: TaskFilter,
    ) -> StoreResult<Vec<TaskWithAssignee>> {
        let tables = self.tables.read().await;

        Ok(tables
            .tasks
            .values()
            .filter(|task| task.project_id == project_id && filter.matches(task))
            .map(|task| TaskWithAssignee {
                user: task.user_id.and_then(|id| tables.users.get(&id).cloned()),
                task: task.clone(),
            })
            .collect())
    }

    async fn find_task(&self, project_id: i64, id: i64) -> StoreResult<Option<Task>> {
        let tables = self.tables.read().await;
        Ok(tables
            .tasks
            .get(&id)
            .filter(|task| task.project_id == project_id)
            .cloned())
    }

    async fn create_task(&self, task: CreateTask) -> StoreResult<Task> {
        let mut tables = self.tables.write().await;

        if !tables.projects.contains_key(&task.project_id) {
            return Err(conflict("tasks_project_id_fkey"));
        }
        tables.check_task_refs(task.user_id, task.file_id)?;

        let now = Utc::now();
        let id = tables.next_id("tasks");
        let created = Task {
            id,
            project_id: task.project_id,
            user_id: task.user_id,
            file_id: task.file_id,
            title: task.title,
            description: task.description,
            due_date: task.due_date,
            visibility: task.visibility,
            created_at: now,
            updated_at: now,
        };

        tables.tasks.insert(id, created.clone());
        Ok(created)
    }

    async fn update_task(
        &self,
        project_id: i64,
        id: i64,
        changes: UpdateTask,
    ) -> StoreResult<Option<Task>> {
        let mut tables = self.tables.write().await;

        let Some(mut task) = tables
            .tasks
            .get(&id)
            .filter(|task| task.project_id == project_id)
            .cloned()
        else {
            return Ok(None);
        };

        changes.apply(&mut task);
        tables.check_task_refs(task.user_id, task.file_id)?;
        task.updated_at = Utc::now();

        tables.tasks.insert(id, task.clone());
        Ok(Some(task))
    }

    async fn delete_task(&self, project_id: i64, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        let owned = tables
            .tasks
            .get(&id)
            .is_some_and(|task| task.project_id == project_id);

        if owned {
            tables.tasks.remove(&id);
        }
        Ok(owned)
    }
}

#[async_trait]
impl FileStore for MemoryStore {
    async fn create_file(&self, file: CreateFile) -> StoreResult<File> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let id = tables.next_id("files");
        let created = File {
            id,
            file: file.file,
            name: file.name,
            mime_type: file.mime_type,
            subtype: file.subtype,
            created_at: now,
            updated_at: now,
        };

        tables.files.insert(id, created.clone());
        Ok(created)
    }

    async fn find_file(&self, id: i64) -> StoreResult<Option<File>> {
        Ok(self.tables.read().await.files.get(&id).cloned())
    }
}

#[async_trait]
impl Gateway for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::Visibility;

    fn new_user(name: &str) -> CreateUser {
        CreateUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "$argon2id$v=19$fake".to_string(),
        }
    }

    fn address() -> NewAddress {
        NewAddress {
            street: "Rua A".to_string(),
            number: 1,
            district: None,
            city: "Recife".to_string(),
            state: "PE".to_string(),
        }
    }

    fn acl(slug: &str) -> CreateRole {
        CreateRole {
            slug: slug.to_string(),
            name: slug.to_uppercase(),
            description: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_with_addresses() {
        let store = MemoryStore::new();
        let user = store
            .create_user_with_addresses(new_user("ana"), vec![address(), address()])
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(store.list_addresses(user.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_address_failure_rolls_back_user() {
        let store = MemoryStore::new();
        store.fail_address_inserts(true);

        let result = store
            .create_user_with_addresses(new_user("ana"), vec![address()])
            .await;

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.user_count().await, 0);
        assert_eq!(store.address_count().await, 0);
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let store = MemoryStore::new();
        store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();

        let mut dup = new_user("bia");
        dup.email = "ana@example.com".to_string();

        assert!(matches!(
            store.create_user_with_addresses(dup, vec![]).await,
            Err(StoreError::Conflict(c)) if c == "users_email_key"
        ));
    }

    #[tokio::test]
    async fn test_attach_unknown_role_conflicts() {
        let store = MemoryStore::new();
        let user = store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();

        assert!(matches!(
            store.attach_roles(user.id, &[42]).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.user_roles(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grants_include_role_permissions() {
        let store = MemoryStore::new();
        let user = store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();

        let role = store.create_role(acl("moderator")).await.unwrap();
        let read = store
            .create_permission(CreatePermission {
                slug: "read_task".to_string(),
                name: "Read task".to_string(),
                description: None,
            })
            .await
            .unwrap();

        store.sync_role_permissions(role.id, &[read.id]).await.unwrap();
        store.attach_roles(user.id, &[role.id]).await.unwrap();

        let grants = store.grants(user.id).await.unwrap();
        assert!(grants.roles.contains("moderator"));
        assert!(grants.permissions.contains("read_task"));
        assert!(store.user_permissions(user.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_project_cascades_tasks() {
        let store = MemoryStore::new();
        let user = store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();
        let project = store
            .create_project(CreateProject {
                user_id: user.id,
                title: "p".to_string(),
                description: "d".to_string(),
            })
            .await
            .unwrap();

        let task = store
            .create_task(CreateTask {
                project_id: project.id,
                user_id: Some(user.id),
                file_id: None,
                title: "t".to_string(),
                description: None,
                due_date: None,
                visibility: Visibility::Private,
            })
            .await
            .unwrap();

        assert!(store.delete_project(project.id).await.unwrap());
        assert!(store.find_task(project.id, task.id).await.unwrap().is_none());
        assert!(!store.delete_project(project.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_task_lookup_is_project_scoped() {
        let store = MemoryStore::new();
        let user = store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();

        let mut projects = Vec::new();
        for title in ["a", "b"] {
            projects.push(
                store
                    .create_project(CreateProject {
                        user_id: user.id,
                        title: title.to_string(),
                        description: "d".to_string(),
                    })
                    .await
                    .unwrap(),
            );
        }

        let task = store
            .create_task(CreateTask {
                project_id: projects[0].id,
                user_id: None,
                file_id: None,
                title: "t".to_string(),
                description: None,
                due_date: None,
                visibility: Visibility::Public,
            })
            .await
            .unwrap();

        assert!(store.find_task(projects[1].id, task.id).await.unwrap().is_none());
        assert!(!store.delete_task(projects[1].id, task.id).await.unwrap());
        assert!(store.find_task(projects[0].id, task.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_list_projects_paginates() {
        let store = MemoryStore::new();
        let user = store.create_user_with_addresses(new_user("ana"), vec![]).await.unwrap();

        for i in 0..25 {
            store
                .create_project(CreateProject {
                    user_id: user.id,
                    title: format!("p{}", i),
                    description: "d".to_string(),
                })
                .await
                .unwrap();
        }

        let page = store.list_projects(PageRequest::new(Some(2), 20)).await.unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.last_page, 2);
        assert_eq!(page.data.len(), 5);
        assert_eq!(page.data[0].user.as_ref().map(|u| u.id), Some(user.id));
    }
}
