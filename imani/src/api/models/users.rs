//! API request/response models for users.

use crate::db::models::users::UserDBResponse;
use crate::types::UserId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserCreate {
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
}

/// Partial update. Absent fields are left unchanged; `email` and `name` set to `null` count as
/// absent, while `age: null` clears the age.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UserUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    #[schema(value_type = Option<i32>)]
    pub age: Option<Option<i32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
}

impl From<UserDBResponse> for UserResponse {
    fn from(db: UserDBResponse) -> Self {
        Self {
            id: db.id,
            email: db.email,
            name: db.name,
            age: db.age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_distinguishes_null_age_from_absent_age() {
        let absent: UserUpdate = serde_json::from_value(json!({ "name": "Ada" })).unwrap();
        assert_eq!(absent.age, None);
        assert_eq!(absent.name.as_deref(), Some("Ada"));

        let cleared: UserUpdate = serde_json::from_value(json!({ "age": null })).unwrap();
        assert_eq!(cleared.age, Some(None));

        let set: UserUpdate = serde_json::from_value(json!({ "age": 40, "email": null })).unwrap();
        assert_eq!(set.age, Some(Some(40)));
        assert_eq!(set.email, None);
    }
}
