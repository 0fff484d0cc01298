/// Password reset endpoints
///
/// - `POST /passwords` - Issue a reset token for an email
/// - `PUT /passwords` - Redeem a token and set a new password
///
/// The reset link is written to the log at info level; there is no mail
/// transport.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::JsonBody,
};
use axum::{extract::State, http::StatusCode};
use chrono::Utc;
use serde::Deserialize;
use taskboard_shared::services::password_reset::{request_reset, reset_password};
use tracing::{debug, info};
use validator::Validate;

/// Reset request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    /// Front-end page that receives `?token=`
    #[validate(length(min = 1, message = "Redirect url is required"))]
    pub redirect_url: String,
}

/// Reset redemption
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1, message = "Token is required"))]
    pub token: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    pub password_confirmation: String,
}

/// Issues a reset token
///
/// # Errors
///
/// - `404 Not Found`: No user with that email
/// - `422 Unprocessable Entity`: Validation failed
pub async fn store(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ForgotPasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    let token = request_reset(
        state.gateway.as_ref(),
        state.hasher.as_ref(),
        &req.email,
        Utc::now(),
    )
    .await?;

    info!("Password reset link issued");
    debug!(
        link = %format!("{}?token={}", req.redirect_url, token),
        "Password reset link"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Redeems a reset token
///
/// # Errors
///
/// - `401 Unauthorized`: Token older than the configured lifetime
/// - `404 Not Found`: Unknown token
/// - `422 Unprocessable Entity`: Validation failed or confirmation mismatch
pub async fn update(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    if req.password != req.password_confirmation {
        return Err(ApiError::ValidationError(vec![ValidationErrorDetail {
            field: "password_confirmation".to_string(),
            message: "Password confirmation does not match".to_string(),
        }]));
    }

    reset_password(
        state.gateway.as_ref(),
        state.hasher.as_ref(),
        &req.token,
        &req.password,
        state.config.reset_token_ttl(),
        Utc::now(),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}
