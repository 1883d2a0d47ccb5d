//! User registration DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::Role;
use crate::domain::user::UserAccount;

/// Request body for `POST /users`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    /// Display name.
    pub name: String,
    /// Role; defaults to `customer`.
    #[serde(default = "default_role")]
    pub role: Role,
}

const fn default_role() -> Role {
    Role::Customer
}

/// A registered user.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    /// User id.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<UserAccount> for UserDto {
    fn from(user: UserAccount) -> Self {
        Self {
            id: user.id.get(),
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Response body for `POST /users` (201 Created).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    /// The new user.
    pub user: UserDto,
    /// Token presented in the WebSocket `auth` message.
    pub session_token: String,
}
