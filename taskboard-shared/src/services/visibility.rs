/// Task visibility rules
///
/// Private tasks are hidden from list results and refused on single reads
/// unless the principal holds `read_private_task`. Holding a task as its
/// assignee grants nothing extra.

use tracing::debug;

use crate::auth::authorization::{has_capability, require_capability, AuthzError, Capability, Grants};
use crate::models::task::{Task, TaskFilter, TaskWithAssignee, Visibility};
use crate::store::{StoreError, TaskStore};

/// Error type for single-task reads
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Task {id} not found in project {project_id}")]
    NotFound { project_id: i64, id: i64 },

    /// Task is private and the principal may not see it
    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Predicate for listing tasks on behalf of a principal
///
/// No predicate with `read_private_task`, public tasks only otherwise.
pub fn visible_filter(grants: &Grants) -> TaskFilter {
    if has_capability(grants, Capability::ReadPrivateTask) {
        TaskFilter::default()
    } else {
        TaskFilter {
            visibility: Some(Visibility::Public),
        }
    }
}

/// Lists the project's tasks the principal may see
pub async fn list_visible_tasks<S>(
    store: &S,
    grants: &Grants,
    project_id: i64,
) -> Result<Vec<TaskWithAssignee>, StoreError>
where
    S: TaskStore + ?Sized,
{
    store.list_tasks(project_id, visible_filter(grants)).await
}

/// Reads one task, enforcing visibility
pub async fn read_task<S>(
    store: &S,
    grants: &Grants,
    project_id: i64,
    id: i64,
) -> Result<Task, ReadError>
where
    S: TaskStore + ?Sized,
{
    let task = store
        .find_task(project_id, id)
        .await?
        .ok_or(ReadError::NotFound { project_id, id })?;

    if task.visibility == Visibility::Private {
        require_capability(grants, Capability::ReadPrivateTask).map_err(|e| {
            debug!(task_id = id, "Private task read refused");
            e
        })?;
    }

    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::project::CreateProject;
    use crate::models::task::CreateTask;
    use crate::models::user::NewUser;
    use crate::auth::password::{Argon2Hasher, HashCost};
    use crate::store::memory::MemoryStore;
    use crate::store::{ProjectStore, UserStore};

    struct Fixture {
        store: MemoryStore,
        project_id: i64,
        public_id: i64,
        private_id: i64,
    }

    async fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let hasher = Argon2Hasher::with_cost(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        });

        let row = NewUser {
            username: "owner".to_string(),
            email: "owner@x.com".to_string(),
            password: "p".to_string(),
        }
        .prepare(&hasher)
        .unwrap();
        let owner = store.create_user_with_addresses(row, vec![]).await.unwrap();

        let project = store
            .create_project(CreateProject {
                user_id: owner.id,
                title: "p".to_string(),
                description: "d".to_string(),
            })
            .await
            .unwrap();

        let mut ids = Vec::new();
        for visibility in [Visibility::Public, Visibility::Private] {
            let task = store
                .create_task(CreateTask {
                    project_id: project.id,
                    user_id: Some(owner.id),
                    file_id: None,
                    title: visibility.to_string(),
                    description: None,
                    due_date: None,
                    visibility,
                })
                .await
                .unwrap();
            ids.push(task.id);
        }

        Fixture {
            store,
            project_id: project.id,
            public_id: ids[0],
            private_id: ids[1],
        }
    }

    fn reader() -> Grants {
        Grants::new(Vec::<String>::new(), ["read_task"])
    }

    fn private_reader() -> Grants {
        Grants::new(Vec::<String>::new(), ["read_private_task"])
    }

    #[test]
    fn test_visible_filter() {
        assert_eq!(visible_filter(&reader()).visibility, Some(Visibility::Public));
        assert_eq!(visible_filter(&private_reader()).visibility, None);
        assert_eq!(visible_filter(&Grants::default()).visibility, Some(Visibility::Public));
    }

    #[tokio::test]
    async fn test_list_hides_private_tasks() {
        let f = fixture().await;

        let tasks = list_visible_tasks(&f.store, &reader(), f.project_id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert!(tasks.iter().all(|t| t.task.visibility == Visibility::Public));

        let tasks = list_visible_tasks(&f.store, &private_reader(), f.project_id)
            .await
            .unwrap();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.user.is_some()));
    }

    #[tokio::test]
    async fn test_read_public_task() {
        let f = fixture().await;
        let task = read_task(&f.store, &Grants::default(), f.project_id, f.public_id)
            .await
            .unwrap();
        assert_eq!(task.id, f.public_id);
    }

    #[tokio::test]
    async fn test_read_private_task_requires_capability() {
        let f = fixture().await;

        assert!(matches!(
            read_task(&f.store, &reader(), f.project_id, f.private_id).await,
            Err(ReadError::Denied(AuthzError::MissingCapability(Capability::ReadPrivateTask)))
        ));

        let task = read_task(&f.store, &private_reader(), f.project_id, f.private_id)
            .await
            .unwrap();
        assert_eq!(task.visibility, Visibility::Private);
    }

    #[tokio::test]
    async fn test_read_missing_task() {
        let f = fixture().await;
        assert!(matches!(
            read_task(&f.store, &private_reader(), f.project_id, 999).await,
            Err(ReadError::NotFound { id: 999, .. })
        ));
    }
}
