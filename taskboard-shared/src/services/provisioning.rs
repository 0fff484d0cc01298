/// User provisioning workflow
///
/// Turns a registration request into a persisted user:
///
/// 1. Validate the request (nothing is written on failure)
/// 2. Hash the password at the write boundary
/// 3. Insert the user and all its addresses in one transaction
/// 4. After commit, attach roles, then permissions
/// 5. Reload and return the user with its roles and permissions
///
/// Step 4 runs outside the transaction. If it fails the user stays
/// persisted and [`ProvisionError::Enrichment`] carries its id.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::password::Argon2Hasher;
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
/// use taskboard_shared::services::provisioning::{provision_user, ProvisionUser};
/// use taskboard_shared::store::postgres::PgStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgStore::new(create_pool(DatabaseConfig::default()).await?);
/// let hasher = Argon2Hasher::default();
///
/// let request: ProvisionUser = serde_json::from_value(serde_json::json!({
///     "username": "u",
///     "email": "u@x.com",
///     "password": "p"
/// }))?;
///
/// let profile = provision_user(&store, &hasher, request).await?;
/// assert!(profile.roles.is_empty());
/// # Ok(())
/// # }
/// ```

use serde::Deserialize;
use tracing::{info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::auth::password::{CredentialHasher, PasswordError};
use crate::models::address::NewAddress;
use crate::models::permission::AssignedPermission;
use crate::models::role::AssignedRole;
use crate::models::user::{NewUser, User, UserProfile};
use crate::store::{AccessStore, Gateway, StoreError, StoreResult};

/// Error type for provisioning
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// Request failed validation; nothing was written
    #[error("Validation failed: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error(transparent)]
    Password(#[from] PasswordError),

    /// User and addresses were not persisted
    #[error(transparent)]
    Store(#[from] StoreError),

    /// User was committed but role/permission attachment failed
    #[error("User {user_id} created but access grants could not be attached: {source}")]
    Enrichment { user_id: i64, source: StoreError },
}

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProvisionUser {
    #[validate(length(min = 1, max = 80, message = "Username is required"))]
    pub username: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    /// Must equal `password` when present
    #[serde(default)]
    pub password_confirmation: Option<String>,

    #[serde(default)]
    pub addresses: Option<Vec<NewAddress>>,

    /// Role ids to attach
    #[serde(default)]
    pub roles: Option<Vec<i64>>,

    /// Permission ids to attach directly
    #[serde(default)]
    pub permissions: Option<Vec<i64>>,
}

impl ProvisionUser {
    /// Runs field validation plus the cross-field and nested checks
    pub fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Some(confirmation) = &self.password_confirmation {
            if confirmation != &self.password {
                let mut error = ValidationError::new("must_match");
                error.message = Some("Password confirmation does not match".into());
                errors.add("password_confirmation", error);
            }
        }

        for address in self.addresses.iter().flatten() {
            if let Err(address_errors) = address.validate() {
                for field_errors in address_errors.field_errors().into_values() {
                    for error in field_errors {
                        errors.add("addresses", error.clone());
                    }
                }
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Provisions a user; see the module docs for the step sequence
pub async fn provision_user<G>(
    gateway: &G,
    hasher: &dyn CredentialHasher,
    request: ProvisionUser,
) -> Result<UserProfile, ProvisionError>
where
    G: Gateway + ?Sized,
{
    request.check()?;

    let ProvisionUser {
        username,
        email,
        password,
        addresses,
        roles,
        permissions,
        ..
    } = request;

    let row = NewUser {
        username,
        email,
        password,
    }
    .prepare(hasher)?;

    let user = gateway
        .create_user_with_addresses(row, addresses.unwrap_or_default())
        .await?;

    info!(user_id = user.id, "User provisioned");

    if let Err(source) = attach_grants(gateway, user.id, roles, permissions).await {
        warn!(user_id = user.id, error = %source, "Failed to attach user grants");
        return Err(ProvisionError::Enrichment {
            user_id: user.id,
            source,
        });
    }

    Ok(load_profile(gateway, user).await?)
}

async fn attach_grants<G>(
    gateway: &G,
    user_id: i64,
    roles: Option<Vec<i64>>,
    permissions: Option<Vec<i64>>,
) -> StoreResult<()>
where
    G: AccessStore + ?Sized,
{
    if let Some(roles) = roles {
        gateway.attach_roles(user_id, &roles).await?;
    }

    if let Some(permissions) = permissions {
        gateway.attach_permissions(user_id, &permissions).await?;
    }

    Ok(())
}

/// Loads a user's roles and direct permissions
pub async fn load_profile<G>(gateway: &G, user: User) -> StoreResult<UserProfile>
where
    G: AccessStore + ?Sized,
{
    let roles = gateway
        .user_roles(user.id)
        .await?
        .into_iter()
        .map(|role| AssignedRole::new(role, user.id))
        .collect();

    let permissions = gateway
        .user_permissions(user.id)
        .await?
        .into_iter()
        .map(|permission| AssignedPermission::new(permission, user.id))
        .collect();

    Ok(UserProfile {
        user,
        roles,
        permissions,
    })
}
