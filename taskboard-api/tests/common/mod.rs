//! Common test utilities for integration tests
//!
//! Builds the full router over a [`MemoryStore`] with a cheap hasher and a
//! throwaway uploads directory, and seeds the access-control fixtures:
//!
//! - permissions `read_task` and `read_private_task`
//! - roles `administrator` (granted `read_private_task`) and `moderator`
//! - users `admin`, `reader` (`read_task`), `insider` (`read_private_task`)
//!   and `nobody` (no grants), each with a signed token

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims};
use taskboard_shared::auth::password::{Argon2Hasher, HashCost};
use taskboard_shared::models::permission::CreatePermission;
use taskboard_shared::models::project::{CreateProject, Project};
use taskboard_shared::models::role::CreateRole;
use taskboard_shared::models::task::{CreateTask, Task, Visibility};
use taskboard_shared::models::user::{NewUser, User};
use taskboard_shared::store::memory::MemoryStore;
use taskboard_shared::store::{AccessStore, ProjectStore, TaskStore, UserStore};
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Seeded user with its bearer token
pub struct Actor {
    pub user: User,
    pub token: String,
}

/// Test context containing the app and direct store access
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub hasher: Arc<Argon2Hasher>,
    pub config: Config,
    pub admin: Actor,
    pub reader: Actor,
    pub insider: Actor,
    pub nobody: Actor,
}

pub fn test_hasher() -> Argon2Hasher {
    Argon2Hasher::with_cost(HashCost {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
}

impl TestContext {
    pub async fn new() -> Self {
        let uploads = std::env::temp_dir().join(format!("taskboard-api-{}", uuid::Uuid::new_v4()));
        let uploads = uploads.to_string_lossy().to_string();

        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgresql://unused/taskboard".to_string()),
            "JWT_SECRET" => Some(JWT_SECRET.to_string()),
            "UPLOADS_DIR" => Some(uploads.clone()),
            _ => None,
        })
        .unwrap();

        let store = Arc::new(MemoryStore::new());
        let hasher = Arc::new(test_hasher());

        let read_task = store
            .create_permission(CreatePermission {
                slug: "read_task".to_string(),
                name: "Read tasks".to_string(),
                description: None,
            })
            .await
            .unwrap();
        let read_private_task = store
            .create_permission(CreatePermission {
                slug: "read_private_task".to_string(),
                name: "Read private tasks".to_string(),
                description: None,
            })
            .await
            .unwrap();

        let administrator = store
            .create_role(CreateRole {
                slug: "administrator".to_string(),
                name: "Administrator".to_string(),
                description: None,
            })
            .await
            .unwrap();
        store
            .create_role(CreateRole {
                slug: "moderator".to_string(),
                name: "Moderator".to_string(),
                description: None,
            })
            .await
            .unwrap();
        store
            .sync_role_permissions(administrator.id, &[read_private_task.id])
            .await
            .unwrap();

        let admin = seed_actor(&store, &hasher, "admin").await;
        store.attach_roles(admin.user.id, &[administrator.id]).await.unwrap();

        let reader = seed_actor(&store, &hasher, "reader").await;
        store.attach_permissions(reader.user.id, &[read_task.id]).await.unwrap();

        let insider = seed_actor(&store, &hasher, "insider").await;
        store
            .attach_permissions(insider.user.id, &[read_private_task.id])
            .await
            .unwrap();

        let nobody = seed_actor(&store, &hasher, "nobody").await;

        let state = AppState::new(store.clone(), hasher.clone(), config.clone());
        let app = build_router(state);

        Self {
            app,
            store,
            hasher,
            config,
            admin,
            reader,
            insider,
            nobody,
        }
    }

    /// Sends a JSON request and returns the status and parsed body
    ///
    /// An empty body parses as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };

        (status, body)
    }

    pub async fn create_project(&self, title: &str) -> Project {
        self.store
            .create_project(CreateProject {
                user_id: self.admin.user.id,
                title: title.to_string(),
                description: format!("{} description", title),
            })
            .await
            .unwrap()
    }

    pub async fn create_task(
        &self,
        project_id: i64,
        title: &str,
        visibility: Visibility,
        assignee: Option<i64>,
    ) -> Task {
        self.store
            .create_task(CreateTask {
                project_id,
                user_id: assignee,
                file_id: None,
                title: title.to_string(),
                description: None,
                due_date: None,
                visibility,
            })
            .await
            .unwrap()
    }

    pub async fn cleanup(&self) {
        let _ = tokio::fs::remove_dir_all(&self.config.storage.uploads_dir).await;
    }
}

async fn seed_actor(store: &MemoryStore, hasher: &Argon2Hasher, name: &str) -> Actor {
    let row = NewUser {
        username: name.to_string(),
        email: format!("{}@example.com", name),
        password: "secret".to_string(),
    }
    .prepare(hasher)
    .unwrap();

    let user = store.create_user_with_addresses(row, vec![]).await.unwrap();
    let token = create_token(&Claims::new(user.id), JWT_SECRET).unwrap();

    Actor { user, token }
}
