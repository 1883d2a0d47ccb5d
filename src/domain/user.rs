//! Registered users and their roles.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use utoipa::ToSchema;

use super::UserId;
use crate::error::GatewayError;

/// Role of a user. Staff and owners may scan codes and manage catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Diner.
    Customer,
    /// Floor or counter staff.
    Staff,
    /// Restaurant owner.
    Owner,
}

impl Role {
    /// Returns `true` for staff and owners.
    #[must_use]
    pub const fn is_staff(self) -> bool {
        matches!(self, Self::Staff | Self::Owner)
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// User id.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Role.
    pub role: Role,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

/// In-memory user directory.
#[derive(Debug)]
pub struct UserDirectory {
    users: RwLock<HashMap<UserId, UserAccount>>,
    next_id: AtomicI64,
}

impl UserDirectory {
    /// Creates an empty directory. Ids start at 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Registers a new user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a blank name.
    pub async fn register(&self, name: &str, role: Role) -> Result<UserAccount, GatewayError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GatewayError::InvalidRequest("name must not be empty".to_string()));
        }
        let id = UserId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let account = UserAccount {
            id,
            name: name.to_string(),
            role,
            created_at: Utc::now(),
        };
        self.users.write().await.insert(id, account.clone());
        tracing::info!(user_id = %id, ?role, "user registered");
        Ok(account)
    }

    /// Looks up a user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] for an unknown id.
    pub async fn get(&self, id: UserId) -> Result<UserAccount, GatewayError> {
        self.users
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(GatewayError::UserNotFound(id.get()))
    }

    /// Ensures the user exists and holds a staff or owner role.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthorized`] for unknown users and
    /// customers alike, so callers learn nothing about which ids exist.
    pub async fn require_staff(&self, id: UserId) -> Result<UserAccount, GatewayError> {
        match self.users.read().await.get(&id) {
            Some(user) if user.role.is_staff() => Ok(user.clone()),
            _ => Err(GatewayError::Unauthorized),
        }
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::new()
    }
}
