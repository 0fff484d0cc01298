/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id credential hashing behind the `CredentialHasher` trait
/// - [`jwt`]: Session token generation and validation
/// - [`middleware`]: Bearer-token authentication and the request principal
/// - [`authorization`]: Capability/role oracle and route guards
/// - [`reset_token`]: Password-reset token generation and expiry
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{Argon2Hasher, CredentialHasher};
/// use taskboard_shared::auth::jwt::{create_token, Claims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash("user_password")?;
/// assert!(hasher.verify("user_password", &hash)?);
///
/// let token = create_token(&Claims::new(1), "secret-key")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod reset_token;
