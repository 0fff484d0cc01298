/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`; the `From` conversions below
/// translate every shared-crate error into the right status code.
///
/// # Response format
///
/// ```json
/// { "error": "not_found", "message": "Project 7 not found" }
/// ```
///
/// The one exception is [`ApiError::ReadDenied`], which keeps the fixed body
/// clients already match on:
///
/// ```json
/// { "message": { "error": "Você não tem permissão de leitura" } }
/// ```

use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskboard_shared::auth::authorization::AuthzError;
use taskboard_shared::auth::jwt::JwtError;
use taskboard_shared::auth::middleware::AuthError;
use taskboard_shared::auth::password::PasswordError;
use taskboard_shared::services::password_reset::ResetError;
use taskboard_shared::services::provisioning::ProvisionError;
use taskboard_shared::services::sessions::SessionError;
use taskboard_shared::services::visibility::ReadError;
use taskboard_shared::storage::StorageError;
use taskboard_shared::store::StoreError;
use validator::ValidationErrors;

/// Message returned when a private task read is refused
pub const READ_DENIED_MESSAGE: &str = "Você não tem permissão de leitura";

/// Message returned when a password reset token is too old
pub const RESET_EXPIRED_MESSAGE: &str = "O token de recuperação está expirado";

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - unique or foreign-key violation
    Conflict(String),

    /// Payload too large (413)
    PayloadTooLarge(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Private task read without `read_private_task` (400, fixed body)
    ReadDenied,

    /// Internal server error (500)
    InternalError(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::ReadDenied => write!(f, "Read denied: {}", READ_DENIED_MESSAGE),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::ReadDenied => {
                let body = Json(serde_json::json!({
                    "message": { "error": READ_DENIED_MESSAGE }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::PayloadTooLarge(msg) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", msg, None)
            }
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value ({})", e.code)),
                })
            })
            .collect();

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(constraint) => {
                ApiError::Conflict(format!("Constraint violation: {}", constraint))
            }
            StoreError::Database(err) => ApiError::InternalError(format!("Database error: {}", err)),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::Invalid(errors) => errors.into(),
            ProvisionError::Password(err) => err.into(),
            ProvisionError::Store(err) => err.into(),
            ProvisionError::Enrichment { user_id, source } => match source {
                StoreError::Conflict(constraint) => ApiError::Conflict(format!(
                    "User {} was created but grants could not be attached: {}",
                    user_id, constraint
                )),
                other => ApiError::InternalError(format!(
                    "User {} was created but grants could not be attached: {}",
                    user_id, other
                )),
            },
        }
    }
}

impl From<ReadError> for ApiError {
    fn from(err: ReadError) -> Self {
        match err {
            ReadError::NotFound { id, .. } => ApiError::NotFound(format!("Task {} not found", id)),
            ReadError::Denied(_) => ApiError::ReadDenied,
            ReadError::Store(err) => err.into(),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            SessionError::Password(err) => err.into(),
            SessionError::Token(err) => ApiError::InternalError(format!("Token creation failed: {}", err)),
            SessionError::Store(err) => err.into(),
        }
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::UnknownEmail | ResetError::UnknownToken => ApiError::NotFound(err.to_string()),
            ResetError::Expired => ApiError::Unauthorized(RESET_EXPIRED_MESSAGE.to_string()),
            ResetError::Password(err) => err.into(),
            ResetError::Store(err) => err.into(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::TooLarge { .. } => ApiError::PayloadTooLarge(err.to_string()),
            StorageError::InvalidKey(_) => ApiError::NotFound("File not found".to_string()),
            StorageError::Io(err) if err.kind() == std::io::ErrorKind::NotFound => {
                ApiError::NotFound("File not found".to_string())
            }
            StorageError::Io(err) => ApiError::InternalError(format!("Storage error: {}", err)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let message = err.body_text();
                let field = message
                    .split("missing field `")
                    .nth(1)
                    .and_then(|rest| rest.split('`').next())
                    .unwrap_or("body")
                    .to_string();

                ApiError::ValidationError(vec![ValidationErrorDetail { field, message }])
            }
            other => ApiError::BadRequest(format!("Invalid JSON body: {}", other.body_text())),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Invalid multipart body: {}", err))
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::Unauthorized("Missing credentials".to_string()),
            AuthError::InvalidFormat(msg) => ApiError::Unauthorized(msg),
            AuthError::InvalidToken(msg) => ApiError::Unauthorized(msg),
        }
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied(guard) => ApiError::Forbidden(format!("Requires {}", guard)),
            AuthzError::MissingCapability(capability) => {
                ApiError::Forbidden(format!("Missing capability: {}", capability))
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::InternalError(format!("Password operation failed: {}", err))
    }
}

impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => {
                ApiError::Unauthorized("Invalid token issuer".to_string())
            }
            _ => ApiError::Unauthorized(format!("Invalid token: {}", err)),
        }
    }
}
