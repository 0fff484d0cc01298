/// Configuration management for the API server
///
/// This module loads configuration from environment variables and provides
/// a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3333)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS when `true` (default: false)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing (required, at least 32 characters)
/// - `JWT_EXPIRATION_HOURS`: Session lifetime (default: 24)
/// - `UPLOADS_DIR`: Directory for uploaded files (default: tmp/uploads)
/// - `PASSWORD_RESET_TTL_HOURS`: Reset token lifetime (default: 48)
/// - `RUST_LOG`: Log filter (default: taskboard_api=debug,tower_http=debug)
///
/// A `.env` file in the working directory is loaded first if present.
///
/// # Example
///
/// ```no_run
/// use taskboard_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
    pub password_reset: PasswordResetConfig,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` means permissive
    pub cors_origins: Vec<String>,

    /// Production mode (adds HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Session token lifetime in hours
    pub expiration_hours: i64,
}

/// Upload storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uploads_dir: PathBuf,
}

/// Password reset configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetConfig {
    /// Hours a reset token stays valid
    pub token_ttl_hours: i64,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let cors_origins = var("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            api: ApiConfig {
                host: var("API_HOST", "0.0.0.0"),
                port: parse_var("API_PORT", &var("API_PORT", "3333"))?,
                cors_origins,
                production: parse_var("PRODUCTION", &var("PRODUCTION", "false"))?,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", &var("DATABASE_MAX_CONNECTIONS", "10"))?,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expiration_hours: parse_var("JWT_EXPIRATION_HOURS", &var("JWT_EXPIRATION_HOURS", "24"))?,
            },
            storage: StorageConfig {
                uploads_dir: PathBuf::from(var("UPLOADS_DIR", "tmp/uploads")),
            },
            password_reset: PasswordResetConfig {
                token_ttl_hours: parse_var("PASSWORD_RESET_TTL_HOURS", &var("PASSWORD_RESET_TTL_HOURS", "48"))?,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Session token lifetime
    pub fn session_ttl(&self) -> Duration {
        Duration::hours(self.jwt.expiration_hours)
    }

    /// Password reset token lifetime
    pub fn reset_token_ttl(&self) -> Duration {
        Duration::hours(self.password_reset.token_ttl_hours)
    }
}

fn parse_var<T>(key: &str, value: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:3333");
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.session_ttl(), Duration::hours(24));
        assert_eq!(config.reset_token_ttl(), Duration::hours(48));
        assert_eq!(config.storage.uploads_dir, PathBuf::from("tmp/uploads"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://localhost/test"),
            ("JWT_SECRET", SECRET),
            ("API_HOST", "127.0.0.1"),
            ("API_PORT", "8080"),
            ("CORS_ORIGINS", "https://a.example, https://b.example"),
            ("PRODUCTION", "true"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.api.cors_origins.len(), 2);
        assert_eq!(config.api.cors_origins[1], "https://b.example");
        assert!(config.api.production);
    }

    #[test]
    fn test_missing_required() {
        assert!(Config::from_lookup(lookup(&[("JWT_SECRET", SECRET)])).is_err());
        assert!(Config::from_lookup(lookup(&[("DATABASE_URL", "postgresql://x")])).is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://x"),
            ("JWT_SECRET", "short"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("32 characters"));
    }

    #[test]
    fn test_invalid_port() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgresql://x"),
            ("JWT_SECRET", SECRET),
            ("API_PORT", "not-a-port"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("API_PORT"));
    }
}
