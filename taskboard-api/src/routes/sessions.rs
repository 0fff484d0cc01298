/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /sessions
/// Content-Type: application/json
///
/// { "email": "ana@example.com", "password": "secret" }
/// ```
///
/// # Response
///
/// ```json
/// { "type": "bearer", "token": "eyJ...", "refreshToken": null }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email or wrong password (same message for both)
/// - `422 Unprocessable Entity`: Validation failed

use crate::{app::AppState, error::ApiResult, extract::JsonBody};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use taskboard_shared::services::sessions::create_session;
use tracing::info;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct SessionRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Always `bearer`
    #[serde(rename = "type")]
    pub token_type: String,

    pub token: String,

    /// Refresh tokens are not issued
    pub refresh_token: Option<String>,
}

/// Verifies credentials and issues an access token
pub async fn store(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SessionRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let session = create_session(
        state.gateway.as_ref(),
        state.hasher.as_ref(),
        state.jwt_secret(),
        state.config.session_ttl(),
        &req.email,
        &req.password,
    )
    .await?;

    info!(user_id = session.user_id, "Session created");

    Ok(Json(SessionResponse {
        token_type: "bearer".to_string(),
        token: session.token,
        refresh_token: None,
    }))
}
