/// Domain models
///
/// Plain data types mirroring the database rows, the input types accepted by
/// the persistence gateway, and the hydrated shapes returned by the API.
///
/// # Models
///
/// - `user`: accounts and the password write boundary
/// - `address`: user postal addresses
/// - `project`: projects owned by a user
/// - `task`: project tasks and their visibility
/// - `role` / `permission`: access control entities
/// - `file`: uploaded file metadata
/// - `pagination`: offset pages for list endpoints

use serde::{Deserialize, Deserializer};

pub mod address;
pub mod file;
pub mod pagination;
pub mod permission;
pub mod project;
pub mod role;
pub mod task;
pub mod user;

/// Deserializes a field present in the body (even as `null`) into `Some`
///
/// Combine with `#[serde(default)]` so an absent field stays `None`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
