/// Credential hashing using Argon2id
///
/// This module provides the one-way, salted hashing applied to user passwords
/// before they are persisted, and the verification used by session login.
///
/// Hashing is exposed through the [`CredentialHasher`] trait so services and
/// route handlers receive the hasher as an explicit dependency. The production
/// implementation is [`Argon2Hasher`].
///
/// # Security
///
/// - **Algorithm**: Argon2id (hybrid of Argon2i and Argon2d)
/// - **Memory**: 64 MB (65536 KB)
/// - **Iterations**: 3 passes
/// - **Parallelism**: 4 lanes
/// - **Output**: 32-byte hash
/// - **Salt**: 16 random bytes from the OS RNG, unique per hash
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{Argon2Hasher, CredentialHasher};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = Argon2Hasher::default();
/// let hash = hasher.hash("super_secret_password_123")?;
///
/// assert!(hasher.verify("super_secret_password_123", &hash)?);
/// assert!(!hasher.verify("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// One-way credential hashing
///
/// Implementations must produce a self-describing hash (salt and parameters
/// embedded) so that [`CredentialHasher::verify`] needs nothing but the
/// stored value.
pub trait CredentialHasher: Send + Sync {
    /// Hashes a plaintext secret for storage
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError>;

    /// Verifies a plaintext secret against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch; errors are reserved for malformed hashes.
    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Argon2id implementation of [`CredentialHasher`]
///
/// # Example
///
/// ```
/// use taskboard_shared::auth::password::{Argon2Hasher, CredentialHasher, HashCost};
///
/// // Cheap parameters, suitable for tests only
/// let hasher = Argon2Hasher::with_cost(HashCost { memory_kib: 1024, iterations: 1, parallelism: 1 });
/// let hash = hasher.hash("p").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    cost: HashCost,
}

impl Argon2Hasher {
    /// Creates a hasher with explicit cost parameters
    pub fn with_cost(cost: HashCost) -> Self {
        Self { cost }
    }

    /// Returns the configured cost parameters
    pub fn cost(&self) -> HashCost {
        self.cost
    }

    fn params(&self) -> Result<Params, PasswordError> {
        ParamsBuilder::new()
            .m_cost(self.cost.memory_kib)
            .t_cost(self.cost.iterations)
            .p_cost(self.cost.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))
    }
}

impl CredentialHasher for Argon2Hasher {
    /// Hashes a password into PHC string format
    ///
    /// Example output:
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, Version::V0x13, self.params()?);

        let password_hash = argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
            return Err(PasswordError::InvalidHash(
                "Hash is missing its salt or output".to_string(),
            ));
        }

        // Parameters are read back from the PHC string
        match Argon2::default().verify_password(plaintext.as_bytes(), &parsed_hash) {
            Ok(_) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}
