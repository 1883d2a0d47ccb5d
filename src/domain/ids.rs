//! Type-safe identifiers.
//!
//! [`EntryId`] wraps a UUID v4 so queue entry identifiers cannot be
//! confused with redemption tokens. Users, restaurants, rewards and deals
//! use sequential integer ids, each wrapped in its own newtype.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a queue entry.
///
/// Generated once at join time and immutable thereafter. Used as the key
/// in the queue registry's entry index and in `queue_updated` payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(uuid::Uuid);

impl EntryId {
    /// Creates a new random `EntryId` (UUID v4).
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Creates an `EntryId` from an existing [`uuid::Uuid`].
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner [`uuid::Uuid`].
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<uuid::Uuid> for EntryId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }
}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Returns the raw integer id.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

numeric_id!(
    /// Identifier of a registered user (customer, staff or owner).
    UserId
);
numeric_id!(
    /// Identifier of a restaurant. Restaurants live in the external catalog.
    RestaurantId
);
numeric_id!(
    /// Identifier of a loyalty reward in the catalog.
    RewardId
);
numeric_id!(
    /// Identifier of a lightning deal.
    DealId
);
