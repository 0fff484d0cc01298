/// Registration endpoint
///
/// # Endpoint
///
/// ```text
/// POST /users
/// Content-Type: application/json
///
/// {
///   "username": "ana",
///   "email": "ana@example.com",
///   "password": "secret",
///   "password_confirmation": "secret",
///   "addresses": [{ "street": "Rua A", "number": 10, "city": "Recife", "state": "PE" }],
///   "roles": [1],
///   "permissions": [2]
/// }
/// ```
///
/// # Response
///
/// The stored user (password as its hash) with `roles` and `permissions`
/// arrays, each entry carrying a `pivot`.
///
/// # Errors
///
/// - `422 Unprocessable Entity`: Validation failed
/// - `409 Conflict`: Email or username taken, or an unknown role/permission id
///   (in the latter case the user itself was created)
/// - `500 Internal Server Error`: Server error

use crate::{app::AppState, error::ApiResult, extract::JsonBody};
use axum::{extract::State, Json};
use taskboard_shared::{
    models::user::UserProfile,
    services::provisioning::{provision_user, ProvisionUser},
};

/// Provisions a user with addresses and access grants
pub async fn store(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<ProvisionUser>,
) -> ApiResult<Json<UserProfile>> {
    let profile = provision_user(state.gateway.as_ref(), state.hasher.as_ref(), req).await?;

    Ok(Json(profile))
}
