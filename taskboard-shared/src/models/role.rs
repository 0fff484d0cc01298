/// Role model
///
/// Roles group permissions and are assigned to users through `role_user`.
/// The API checks the `administrator` and `moderator` slugs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::permission::Permission;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Role {
    pub id: i64,

    /// Unique machine name
    pub slug: String,

    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a role
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRole {
    #[validate(length(min = 1, max = 255, message = "Slug is required"))]
    pub slug: String,

    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Partial role update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRole {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Slug must not be empty"))]
    pub slug: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl UpdateRole {
    pub fn apply(self, role: &mut Role) {
        if let Some(slug) = self.slug {
            role.slug = slug;
        }
        if let Some(name) = self.name {
            role.name = name;
        }
        if let Some(description) = self.description {
            role.description = Some(description);
        }
    }
}

/// Role with its permissions loaded
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,

    pub permissions: Vec<Permission>,
}

/// `role_user` pivot row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RolePivot {
    pub role_id: i64,
    pub user_id: i64,
}

/// Role as seen through a user, with its pivot
#[derive(Debug, Clone, Serialize)]
pub struct AssignedRole {
    #[serde(flatten)]
    pub role: Role,

    pub pivot: RolePivot,
}

impl AssignedRole {
    pub fn new(role: Role, user_id: i64) -> Self {
        let pivot = RolePivot {
            role_id: role.id,
            user_id,
        };
        Self { role, pivot }
    }
}
