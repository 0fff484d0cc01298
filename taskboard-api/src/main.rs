//! # Taskboard API Server
//!
//! REST API for projects and tasks with role- and permission-based access
//! control.
//!
//! ## Startup
//!
//! 1. Load configuration from the environment (and `.env`)
//! 2. Create the PostgreSQL pool and apply pending migrations
//! 3. Wire the gateway, hasher and upload storage into `AppState`
//! 4. Serve until Ctrl-C, then drain connections and close the pool
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p taskboard-api
//! ```

use std::sync::Arc;
use taskboard_api::{
    app::{build_router, AppState},
    config::Config,
};
use taskboard_shared::{
    auth::password::Argon2Hasher,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::postgres::PgStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskboard_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Taskboard API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;
    run_migrations(&pool).await?;

    let bind_address = config.bind_address();
    let state = AppState::new(
        Arc::new(PgStore::new(pool.clone())),
        Arc::new(Argon2Hasher::default()),
        config,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    close_pool(pool).await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, draining connections...");
}
