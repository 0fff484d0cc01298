/// Password reset flow
///
/// 1. [`request_reset`] stores a fresh token and its issue time on the user
/// 2. The caller delivers `{redirect_url}?token={token}` out of band
/// 3. [`reset_password`] checks the token age, sets the new password and
///    clears the token
///
/// Both writes go through [`UserChanges`], so only the second one touches
/// the stored hash.

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::auth::password::{CredentialHasher, PasswordError};
use crate::auth::reset_token::{generate_reset_token, is_expired};
use crate::models::user::UserChanges;
use crate::store::{StoreError, UserStore};

/// Error type for password resets
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("No user with that email")]
    UnknownEmail,

    #[error("Unknown reset token")]
    UnknownToken,

    #[error("Reset token expired")]
    Expired,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Issues a reset token for the user with `email` and returns it
pub async fn request_reset<S>(
    store: &S,
    hasher: &dyn CredentialHasher,
    email: &str,
    now: DateTime<Utc>,
) -> Result<String, ResetError>
where
    S: UserStore + ?Sized,
{
    let user = store
        .find_user_by_email(email)
        .await?
        .ok_or(ResetError::UnknownEmail)?;

    let token = generate_reset_token();
    let changes = UserChanges {
        token: Some(Some(token.clone())),
        token_created_at: Some(Some(now)),
        ..Default::default()
    }
    .prepare(hasher)?;

    store.update_user(user.id, changes).await?;

    info!(user_id = user.id, "Password reset requested");
    Ok(token)
}

/// Replaces the password of the user holding `token`
pub async fn reset_password<S>(
    store: &S,
    hasher: &dyn CredentialHasher,
    token: &str,
    password: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<(), ResetError>
where
    S: UserStore + ?Sized,
{
    let user = store
        .find_user_by_token(token)
        .await?
        .ok_or(ResetError::UnknownToken)?;

    // A token without an issue time is treated as expired
    let issued = user.token_created_at.ok_or(ResetError::Expired)?;
    if is_expired(issued, ttl, now) {
        return Err(ResetError::Expired);
    }

    let changes = UserChanges {
        password: Some(password.to_string()),
        token: Some(None),
        token_created_at: Some(None),
        ..Default::default()
    }
    .prepare(hasher)?;

    store.update_user(user.id, changes).await?;

    info!(user_id = user.id, "Password reset completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{Argon2Hasher, HashCost};
    use crate::models::user::NewUser;
    use crate::store::memory::MemoryStore;

    fn hasher() -> Argon2Hasher {
        Argon2Hasher::with_cost(HashCost {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
    }

    async fn store_with_user(hasher: &Argon2Hasher) -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let row = NewUser {
            username: "ana".to_string(),
            email: "ana@x.com".to_string(),
            password: "old".to_string(),
        }
        .prepare(hasher)
        .unwrap();
        let user = store.create_user_with_addresses(row, vec![]).await.unwrap();
        (store, user.id)
    }

    #[tokio::test]
    async fn test_request_keeps_password_hash() {
        let hasher = hasher();
        let (store, id) = store_with_user(&hasher).await;
        let before = store.find_user(id).await.unwrap().unwrap().password;

        let token = request_reset(&store, &hasher, "ana@x.com", Utc::now()).await.unwrap();

        let user = store.find_user(id).await.unwrap().unwrap();
        assert_eq!(user.token.as_deref(), Some(token.as_str()));
        assert!(user.token_created_at.is_some());
        assert_eq!(user.password, before);
    }

    #[tokio::test]
    async fn test_request_unknown_email() {
        let hasher = hasher();
        let (store, _) = store_with_user(&hasher).await;

        assert!(matches!(
            request_reset(&store, &hasher, "nobody@x.com", Utc::now()).await,
            Err(ResetError::UnknownEmail)
        ));
    }

    #[tokio::test]
    async fn test_reset_sets_password_and_clears_token() {
        let hasher = hasher();
        let (store, id) = store_with_user(&hasher).await;
        let now = Utc::now();

        let token = request_reset(&store, &hasher, "ana@x.com", now).await.unwrap();
        reset_password(&store, &hasher, &token, "new", Duration::hours(48), now + Duration::hours(1))
            .await
            .unwrap();

        let user = store.find_user(id).await.unwrap().unwrap();
        assert!(hasher.verify("new", &user.password).unwrap());
        assert!(user.token.is_none());
        assert!(user.token_created_at.is_none());
    }

    #[tokio::test]
    async fn test_reset_rejects_expired_token() {
        let hasher = hasher();
        let (store, id) = store_with_user(&hasher).await;
        let issued = Utc::now() - Duration::days(3);

        let token = request_reset(&store, &hasher, "ana@x.com", issued).await.unwrap();

        assert!(matches!(
            reset_password(&store, &hasher, &token, "new", Duration::hours(48), Utc::now()).await,
            Err(ResetError::Expired)
        ));
        assert!(hasher
            .verify("old", &store.find_user(id).await.unwrap().unwrap().password)
            .unwrap());
    }

    #[tokio::test]
    async fn test_reset_unknown_token() {
        let hasher = hasher();
        let (store, _) = store_with_user(&hasher).await;

        assert!(matches!(
            reset_password(&store, &hasher, "nope", "new", Duration::hours(48), Utc::now()).await,
            Err(ResetError::UnknownToken)
        ));
    }
}
