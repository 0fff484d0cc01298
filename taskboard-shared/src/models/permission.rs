/// Permission model
///
/// Permissions are granted to users directly (`permission_user`) or through
/// a role (`permission_role`). The API checks the `read_task` and
/// `read_private_task` slugs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Permission {
    pub id: i64,

    /// Unique machine name
    pub slug: String,

    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a permission
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermission {
    #[validate(length(min = 1, max = 255, message = "Slug is required"))]
    pub slug: String,

    #[validate(length(min = 1, max = 255, message = "Name is required"))]
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,
}

/// Partial permission update
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePermission {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Slug must not be empty"))]
    pub slug: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,
}

impl UpdatePermission {
    pub fn apply(self, permission: &mut Permission) {
        if let Some(slug) = self.slug {
            permission.slug = slug;
        }
        if let Some(name) = self.name {
            permission.name = name;
        }
        if let Some(description) = self.description {
            permission.description = Some(description);
        }
    }
}

/// `permission_user` pivot row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionPivot {
    pub permission_id: i64,
    pub user_id: i64,
}

/// Permission granted directly to a user, with its pivot
#[derive(Debug, Clone, Serialize)]
pub struct AssignedPermission {
    #[serde(flatten)]
    pub permission: Permission,

    pub pivot: PermissionPivot,
}

impl AssignedPermission {
    pub fn new(permission: Permission, user_id: i64) -> Self {
        let pivot = PermissionPivot {
            permission_id: permission.id,
            user_id,
        };
        Self { permission, pivot }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigned_permission_carries_pivot() {
        let now = Utc::now();
        let permission = Permission {
            id: 5,
            slug: "read_task".to_string(),
            name: "Read task".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };

        let json = serde_json::to_value(AssignedPermission::new(permission, 2)).unwrap();
        assert_eq!(json["slug"], "read_task");
        assert_eq!(json["pivot"]["permission_id"], 5);
        assert_eq!(json["pivot"]["user_id"], 2);
    }
}
