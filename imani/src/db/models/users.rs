//! Database models for users.

use crate::api::models::users::{UserCreate, UserUpdate};
use crate::types::UserId;

/// Database request for creating a new user
#[derive(Debug, Clone)]
pub struct UserCreateDBRequest {
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
}

impl From<UserCreate> for UserCreateDBRequest {
    fn from(api: UserCreate) -> Self {
        Self {
            email: api.email,
            name: api.name,
            age: api.age,
        }
    }
}

/// Database request for updating a user.
///
/// `None` leaves a column untouched. For `age`, `Some(None)` clears the column.
#[derive(Debug, Clone, Default)]
pub struct UserUpdateDBRequest {
    pub email: Option<String>,
    pub name: Option<String>,
    pub age: Option<Option<i32>>,
}

impl From<UserUpdate> for UserUpdateDBRequest {
    fn from(update: UserUpdate) -> Self {
        Self {
            email: update.email,
            name: update.name,
            age: update.age,
        }
    }
}

/// Database response for a user
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct UserDBResponse {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub age: Option<i32>,
}
