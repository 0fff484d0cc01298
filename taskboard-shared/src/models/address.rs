/// User address model
///
/// Addresses are only ever created as part of user provisioning, inside the
/// same transaction as their user.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE user_addresses (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     street VARCHAR(255) NOT NULL,
///     number INTEGER NOT NULL,
///     district VARCHAR(255),
///     city VARCHAR(255) NOT NULL,
///     state VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Postal address belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub street: String,
    pub number: i32,
    pub district: Option<String>,
    pub city: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new address
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewAddress {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,

    #[validate(range(min = 0, message = "Number must not be negative"))]
    pub number: i32,

    #[serde(default)]
    pub district: Option<String>,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_district_is_optional() {
        let address: NewAddress = serde_json::from_value(serde_json::json!({
            "street": "Rua A",
            "number": 10,
            "city": "Recife",
            "state": "PE"
        }))
        .unwrap();

        assert!(address.district.is_none());
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_blank_city_is_rejected() {
        let address = NewAddress {
            street: "Rua A".to_string(),
            number: 10,
            district: None,
            city: String::new(),
            state: "PE".to_string(),
        };

        let errors = address.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("city"));
    }
}
