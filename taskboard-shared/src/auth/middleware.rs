/// Request authentication primitives
///
/// Validates the `Authorization: Bearer <token>` header into an
/// [`AuthContext`]. The API's authentication layer inserts the context into
/// request extensions; route guards further down the stack resolve it into a
/// [`Principal`] carrying the user's grants.
///
/// # Example
///
/// ```
/// use axum::http::{header, HeaderMap, HeaderValue};
/// use taskboard_shared::auth::jwt::{create_token, Claims};
/// use taskboard_shared::auth::middleware::authenticate;
///
/// let secret = "your-jwt-secret";
/// let token = create_token(&Claims::new(1), secret).unwrap();
///
/// let mut headers = HeaderMap::new();
/// headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", token)).unwrap());
///
/// assert_eq!(authenticate(&headers, secret).unwrap().user_id, 1);
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::authorization::Grants;
use super::jwt::{validate_token, JwtError};

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: i64,
}

impl AuthContext {
    /// Creates auth context from a validated token subject
    pub fn from_jwt(user_id: i64) -> Self {
        Self { user_id }
    }
}

/// Authenticated principal with its resolved grants
///
/// Inserted by the authorization guard after it loads the user's roles and
/// permissions, so handlers never query them twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// Authenticated user ID
    pub user_id: i64,

    /// Roles and effective permissions
    pub grants: Grants,
}

/// Error type for authentication middleware
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    /// Missing authorization header
    MissingCredentials,

    /// Invalid authorization header format
    InvalidFormat(String),

    /// Token validation failed
    InvalidToken(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::MissingCredentials => {
                (StatusCode::UNAUTHORIZED, "Missing credentials").into_response()
            }
            AuthError::InvalidFormat(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            AuthError::InvalidToken(msg) => (StatusCode::UNAUTHORIZED, msg).into_response(),
        }
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Validates request credentials and builds the auth context
pub fn authenticate(headers: &HeaderMap, secret: &str) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = validate_token(token, secret).map_err(|e| match e {
        JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
        JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
        _ => AuthError::InvalidToken(format!("Invalid token: {}", e)),
    })?;

    Ok(AuthContext::from_jwt(claims.sub))
}
