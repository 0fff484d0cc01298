/// Password-reset tokens
///
/// A reset token is 10 random bytes, hex-encoded (20 characters). It is stored
/// on the user row together with its creation time and expires after a
/// configurable window (2 days by default).
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskboard_shared::auth::reset_token::{generate_reset_token, is_expired};
///
/// let token = generate_reset_token();
/// assert_eq!(token.len(), 20);
///
/// let issued = Utc::now() - Duration::hours(1);
/// assert!(!is_expired(issued, Duration::days(2), Utc::now()));
/// ```

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;

/// Number of random bytes in a token
const TOKEN_BYTES: usize = 10;

/// Default validity window
pub const DEFAULT_TTL_HOURS: i64 = 48;

/// Generates a new reset token
///
/// Uses `rand::thread_rng()` for cryptographic randomness.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Checks whether a token issued at `created_at` is past its window at `now`
pub fn is_expired(created_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    created_at + ttl < now
}
