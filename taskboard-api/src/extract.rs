/// Request extractors
///
/// [`JsonBody`] is `axum::Json` with its rejection routed through
/// [`ApiError`], so malformed or incomplete bodies get the usual error
/// envelope instead of axum's plain-text response.

use crate::error::ApiError;
use axum::extract::FromRequest;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);
