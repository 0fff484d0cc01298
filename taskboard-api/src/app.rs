/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskboard_api::{app::AppState, config::Config};
/// use taskboard_shared::auth::password::Argon2Hasher;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::store::postgres::PgStore;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = create_pool(DatabaseConfig {
///     url: config.database.url.clone(),
///     ..Default::default()
/// })
/// .await?;
/// let state = AppState::new(
///     Arc::new(PgStore::new(pool)),
///     Arc::new(Argon2Hasher::default()),
///     config,
/// );
/// let app = taskboard_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use taskboard_shared::{
    auth::{
        authorization::Guard,
        middleware::{authenticate, AuthContext, Principal},
        password::CredentialHasher,
    },
    storage::{FileStorage, MAX_UPLOAD_BYTES},
    store::Gateway,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, Level};

/// Room left for multipart boundaries and headers around the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every collaborator sits behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Persistence gateway
    pub gateway: Arc<dyn Gateway>,

    /// Credential hasher used at every password write and login
    pub hasher: Arc<dyn CredentialHasher>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Upload storage
    pub storage: FileStorage,
}

impl AppState {
    /// Creates new application state
    pub fn new(gateway: Arc<dyn Gateway>, hasher: Arc<dyn CredentialHasher>, config: Config) -> Self {
        let storage = FileStorage::new(config.storage.uploads_dir.clone());

        Self {
            gateway,
            hasher,
            config: Arc::new(config),
            storage,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health                               public
/// ├── POST   /users                                public
/// ├── POST   /sessions                             public
/// ├── POST   /passwords, PUT /passwords            public
/// ├── GET    /files/:id                            public
/// ├── POST   /files                                administrator || moderator
/// ├── GET    /projects, /projects/:id              read_task || read_private_task
/// ├── GET    /projects/:id/tasks[/:task_id]        read_task || read_private_task
/// ├── POST   /projects, /projects/:id/tasks        administrator || moderator
/// ├── PUT    /projects/:id[/tasks/:task_id]        administrator || moderator
/// ├── DELETE /projects/:id[/tasks/:task_id]        administrator || moderator
/// └── *      /roles[/:id], /permissions[/:id]      administrator || moderator
/// ```
///
/// # Middleware Stack
///
/// Applied in order (outermost first):
/// 1. Security headers
/// 2. CORS (tower-http CorsLayer)
/// 3. Logging (tower-http TraceLayer)
/// 4. Authentication, then the route guard (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/users", post(routes::users::store))
        .route("/sessions", post(routes::sessions::store))
        .route(
            "/passwords",
            post(routes::passwords::store).put(routes::passwords::update),
        )
        .route("/files/:id", get(routes::files::show));

    let read_routes = Router::new()
        .route("/projects", get(routes::projects::index))
        .route("/projects/:project_id", get(routes::projects::show))
        .route("/projects/:project_id/tasks", get(routes::tasks::index))
        .route("/projects/:project_id/tasks/:id", get(routes::tasks::show));

    let manage_routes = Router::new()
        .route(
            "/files",
            post(routes::files::store)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/projects", post(routes::projects::store))
        .route(
            "/projects/:project_id",
            axum::routing::put(routes::projects::update).delete(routes::projects::destroy),
        )
        .route("/projects/:project_id/tasks", post(routes::tasks::store))
        .route(
            "/projects/:project_id/tasks/:id",
            axum::routing::put(routes::tasks::update).delete(routes::tasks::destroy),
        )
        .route(
            "/roles",
            get(routes::roles::index).post(routes::roles::store),
        )
        .route(
            "/roles/:id",
            get(routes::roles::show)
                .put(routes::roles::update)
                .delete(routes::roles::destroy),
        )
        .route(
            "/permissions",
            get(routes::permissions::index).post(routes::permissions::store),
        )
        .route(
            "/permissions/:id",
            get(routes::permissions::show)
                .put(routes::permissions::update)
                .delete(routes::permissions::destroy),
        );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    Router::new()
        .merge(public_routes)
        .merge(guarded(read_routes, &state, Guard::READ))
        .merge(guarded(manage_routes, &state, Guard::MANAGE))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// Wraps routes in authentication followed by `guard`
///
/// Route layers only run for matched routes, so unknown paths still 404
/// instead of 401.
fn guarded(routes: Router<AppState>, state: &AppState, guard: Guard) -> Router<AppState> {
    routes
        .route_layer(from_fn_with_state((state.clone(), guard), authorize_layer))
        .route_layer(from_fn_with_state(state.clone(), jwt_auth_layer))
}

/// JWT authentication middleware layer
///
/// Extracts and validates JWT token from Authorization header,
/// then injects AuthContext into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret())?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Route guard layer
///
/// Loads the authenticated user's grants once, evaluates the guard and
/// hands handlers a [`Principal`].
async fn authorize_layer(
    State((state, guard)): State<(AppState, Guard)>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = req
        .extensions()
        .get::<AuthContext>()
        .copied()
        .ok_or_else(|| ApiError::Unauthorized("Missing credentials".to_string()))?;

    let grants = state.gateway.grants(auth.user_id).await?;

    if let Err(err) = guard.check(&grants) {
        debug!(user_id = auth.user_id, guard = %guard, "Route guard denied request");
        return Err(err.into());
    }

    req.extensions_mut().insert(Principal {
        user_id: auth.user_id,
        grants,
    });

    Ok(next.run(req).await)
}
