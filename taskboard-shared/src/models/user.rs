/// User model and write-boundary types
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     username VARCHAR(80) NOT NULL UNIQUE,
///     email VARCHAR(254) NOT NULL UNIQUE,
///     password VARCHAR(255) NOT NULL,
///     token VARCHAR(255),
///     token_created_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Write boundary
///
/// Plaintext credentials only ever live in [`NewUser`] and [`UserChanges`].
/// Stores accept the lowered forms, [`CreateUser`] and [`UserWrite`], which
/// can only be built through `prepare` with a [`CredentialHasher`]. A write
/// whose change set has no password leaves the stored hash untouched.
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{Argon2Hasher, HashCost};
/// use taskboard_shared::models::user::UserChanges;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::with_cost(HashCost { memory_kib: 1024, iterations: 1, parallelism: 1 });
///
/// let write = UserChanges {
///     email: Some("new@example.com".to_string()),
///     ..Default::default()
/// }
/// .prepare(&hasher)?;
///
/// assert!(!write.changes_password());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::password::{CredentialHasher, PasswordError};
use crate::models::permission::AssignedPermission;
use crate::models::role::AssignedRole;

/// User account
///
/// `password` holds the Argon2id PHC string, never plaintext.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,

    /// Argon2id hash
    pub password: String,

    /// Pending password-reset token
    pub token: Option<String>,

    /// When `token` was issued
    pub token_created_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Plaintext input for a new user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewUser {
    /// Hashes the password and lowers the input into an insertable row
    pub fn prepare(self, hasher: &dyn CredentialHasher) -> Result<CreateUser, PasswordError> {
        Ok(CreateUser {
            password_hash: hasher.hash(&self.password)?,
            username: self.username,
            email: self.email,
        })
    }
}

/// Insertable user row, password already hashed
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password_hash: String,
}

impl CreateUser {
    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

/// Plaintext partial update for a user
///
/// All fields are optional. Only non-None fields will be updated; use
/// `Some(None)` to clear the reset token.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,

    /// New plaintext password
    pub password: Option<String>,

    pub token: Option<Option<String>>,
    pub token_created_at: Option<Option<DateTime<Utc>>>,
}

impl UserChanges {
    /// Lowers the change set into a [`UserWrite`]
    ///
    /// The hasher runs only when `password` is part of the change set.
    pub fn prepare(self, hasher: &dyn CredentialHasher) -> Result<UserWrite, PasswordError> {
        let password_hash = match self.password {
            Some(plaintext) => Some(hasher.hash(&plaintext)?),
            None => None,
        };

        Ok(UserWrite {
            username: self.username,
            email: self.email,
            password_hash,
            token: self.token,
            token_created_at: self.token_created_at,
        })
    }
}

/// Partial user update ready for persistence
#[derive(Debug, Clone, Default)]
pub struct UserWrite {
    pub(crate) username: Option<String>,
    pub(crate) email: Option<String>,
    pub(crate) password_hash: Option<String>,
    pub(crate) token: Option<Option<String>>,
    pub(crate) token_created_at: Option<Option<DateTime<Utc>>>,
}

impl UserWrite {
    /// Whether this write replaces the stored hash
    pub fn changes_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Applies the change set onto a loaded user
    pub fn apply(self, user: &mut User) {
        if let Some(username) = self.username {
            user.username = username;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(hash) = self.password_hash {
            user.password = hash;
        }
        if let Some(token) = self.token {
            user.token = token;
        }
        if let Some(created_at) = self.token_created_at {
            user.token_created_at = created_at;
        }
    }
}

/// User with its roles and permissions loaded
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,

    pub roles: Vec<AssignedRole>,
    pub permissions: Vec<AssignedPermission>,
}
