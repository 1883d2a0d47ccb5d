//! Named realtime channels.
//!
//! Wire names follow `scope:{id}:topic`, e.g. `user:7:queue` or
//! `restaurant:2:reservations`. The global deal feed is `deals`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{RestaurantId, UserId};
use crate::error::GatewayError;

/// A logical topic clients subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    /// A customer's own queue entries.
    UserQueue(UserId),
    /// A customer's order status updates.
    UserOrders(UserId),
    /// A customer's reservation updates.
    UserReservations(UserId),
    /// A customer's points and redemptions.
    UserRewards(UserId),
    /// A restaurant's whole waitlist.
    RestaurantQueue(RestaurantId),
    /// A restaurant's reservation book.
    RestaurantReservations(RestaurantId),
    /// Lightning deal availability.
    Deals,
}

impl Channel {
    /// User a `user:*` channel belongs to.
    #[must_use]
    pub const fn owner(&self) -> Option<UserId> {
        match self {
            Self::UserQueue(id)
            | Self::UserOrders(id)
            | Self::UserReservations(id)
            | Self::UserRewards(id) => Some(*id),
            Self::RestaurantQueue(_) | Self::RestaurantReservations(_) | Self::Deals => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserQueue(id) => write!(f, "user:{id}:queue"),
            Self::UserOrders(id) => write!(f, "user:{id}:orders"),
            Self::UserReservations(id) => write!(f, "user:{id}:reservations"),
            Self::UserRewards(id) => write!(f, "user:{id}:rewards"),
            Self::RestaurantQueue(id) => write!(f, "restaurant:{id}:queue"),
            Self::RestaurantReservations(id) => write!(f, "restaurant:{id}:reservations"),
            Self::Deals => f.write_str("deals"),
        }
    }
}

impl FromStr for Channel {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "deals" {
            return Ok(Self::Deals);
        }
        let invalid = || GatewayError::InvalidRequest(format!("unknown channel: {s}"));
        let mut parts = s.split(':');
        let (Some(scope), Some(id), Some(topic), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };
        let id: i64 = id.parse().map_err(|_| invalid())?;
        match (scope, topic) {
            ("user", "queue") => Ok(Self::UserQueue(UserId(id))),
            ("user", "orders") => Ok(Self::UserOrders(UserId(id))),
            ("user", "reservations") => Ok(Self::UserReservations(UserId(id))),
            ("user", "rewards") => Ok(Self::UserRewards(UserId(id))),
            ("restaurant", "queue") => Ok(Self::RestaurantQueue(RestaurantId(id))),
            ("restaurant", "reservations") => Ok(Self::RestaurantReservations(RestaurantId(id))),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for Channel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Channel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
