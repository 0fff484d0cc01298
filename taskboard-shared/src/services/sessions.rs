/// Session login
///
/// Exchanges an email and password for a signed access token.

use chrono::Duration;
use tracing::debug;

use crate::auth::jwt::{create_token, Claims, JwtError};
use crate::auth::password::{CredentialHasher, PasswordError};
use crate::store::{StoreError, UserStore};

/// Error type for login
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Unknown email or wrong password; deliberately indistinguishable
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issued access token
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub token: String,
}

/// Verifies credentials and signs a token valid for `ttl`
pub async fn create_session<S>(
    store: &S,
    hasher: &dyn CredentialHasher,
    jwt_secret: &str,
    ttl: Duration,
    email: &str,
    password: &str,
) -> Result<Session, SessionError>
where
    S: UserStore + ?Sized,
{
    let Some(user) = store.find_user_by_email(email).await? else {
        debug!("Login attempt for unknown email");
        return Err(SessionError::InvalidCredentials);
    };

    if !hasher.verify(password, &user.password)? {
        debug!(user_id = user.id, "Login attempt with wrong password");
        return Err(SessionError::InvalidCredentials);
    }

    let token = create_token(&Claims::with_expiration(user.id, ttl), jwt_secret)?;

    Ok(Session {
        user_id: user.id,
        token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_token;
    use crate::auth::password::{Argon2Hasher, HashCost};
    use crate::models::user::NewUser;
    use crate::store::memory::MemoryStore;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    async fn setup() -> (MemoryStore, Argon2Hasher) {
        let store = MemoryStore::new();
        let hasher = Argon2Hasher::with_cost(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        });

        let row = NewUser {
            username: "ana".to_string(),
            email: "ana@x.com".to_string(),
            password: "secret".to_string(),
        }
        .prepare(&hasher)
        .unwrap();
        store.create_user_with_addresses(row, vec![]).await.unwrap();

        (store, hasher)
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let (store, hasher) = setup().await;

        let session = create_session(&store, &hasher, SECRET, Duration::hours(1), "ana@x.com", "secret")
            .await
            .unwrap();

        let claims = validate_token(&session.token, SECRET).unwrap();
        assert_eq!(claims.sub, session.user_id);
    }

    #[tokio::test]
    async fn test_login_rejects_bad_credentials() {
        let (store, hasher) = setup().await;

        for (email, password) in [("ana@x.com", "wrong"), ("nobody@x.com", "secret")] {
            assert!(matches!(
                create_session(&store, &hasher, SECRET, Duration::hours(1), email, password).await,
                Err(SessionError::InvalidCredentials)
            ));
        }
    }
}
