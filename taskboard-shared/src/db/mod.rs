/// Database layer
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: embedded migration runner
///
/// Queries live in [`crate::store::postgres`].

pub mod migrations;
pub mod pool;
