//! WebSocket message types: envelope, client commands and server replies.
//!
//! Every frame in both directions is a JSON [`WsEnvelope`]:
//!
//! ```json
//! { "type": "subscribe", "payload": {}, "channel": "user:7:queue", "timestamp": "..." }
//! ```
//!
//! Inbound envelopes are narrowed into a typed [`ClientMessage`]; unknown
//! types are rejected rather than passed through.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Channel, DomainEvent, UserId};
use crate::error::GatewayError;

/// Top-level WebSocket message envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsEnvelope {
    /// Message type discriminator.
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Channel the message concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// ISO-8601 send time. Filled in on receipt when a client omits it.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl WsEnvelope {
    /// Builds an envelope stamped with the current time.
    #[must_use]
    pub fn new(msg_type: &str, payload: serde_json::Value, channel: Option<String>) -> Self {
        Self {
            msg_type: msg_type.to_string(),
            payload,
            channel,
            timestamp: Utc::now(),
        }
    }

    /// Serializes to a JSON text frame.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::warn!(error = %e, msg_type = %self.msg_type, "envelope serialization failed");
            String::new()
        })
    }
}

/// Commands a client can send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Authenticate the connection.
    Auth {
        /// Claimed user.
        user_id: UserId,
        /// Session token issued at registration.
        token: String,
    },
    /// Start receiving events on channels.
    Subscribe(Vec<Channel>),
    /// Stop receiving events on channels.
    Unsubscribe(Vec<Channel>),
    /// Keepalive probe.
    Ping,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthPayload {
    user_id: UserId,
    token: String,
}

#[derive(Deserialize, Default)]
struct ChannelsPayload {
    #[serde(default)]
    channels: Vec<Channel>,
}

impl ClientMessage {
    /// Narrows an inbound envelope into a typed command.
    ///
    /// Subscribe and unsubscribe accept a single `channel` field, a
    /// `payload.channels` list, or both.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for unknown types, bad
    /// payloads, unknown channel names or an empty channel set.
    pub fn from_envelope(envelope: &WsEnvelope) -> Result<Self, GatewayError> {
        match envelope.msg_type.as_str() {
            "auth" => {
                let payload: AuthPayload = serde_json::from_value(envelope.payload.clone())
                    .map_err(|e| GatewayError::InvalidRequest(format!("bad auth payload: {e}")))?;
                Ok(Self::Auth {
                    user_id: payload.user_id,
                    token: payload.token,
                })
            }
            "subscribe" => Ok(Self::Subscribe(channels_of(envelope)?)),
            "unsubscribe" => Ok(Self::Unsubscribe(channels_of(envelope)?)),
            "ping" => Ok(Self::Ping),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown message type: {other}"
            ))),
        }
    }
}

fn channels_of(envelope: &WsEnvelope) -> Result<Vec<Channel>, GatewayError> {
    let mut channels = if envelope.payload.is_null() {
        Vec::new()
    } else {
        serde_json::from_value::<ChannelsPayload>(envelope.payload.clone())
            .map_err(|e| GatewayError::InvalidRequest(format!("bad channel list: {e}")))?
            .channels
    };
    if let Some(name) = &envelope.channel {
        channels.push(name.parse()?);
    }
    if channels.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "no channel given".to_string(),
        ));
    }
    Ok(channels)
}

/// Messages the server sends.
#[derive(Debug)]
pub enum ServerMessage {
    /// Authentication accepted.
    Authenticated {
        /// Authenticated user.
        user_id: UserId,
    },
    /// Subscription confirmed.
    Subscribed(Channel),
    /// Unsubscription confirmed.
    Unsubscribed(Channel),
    /// Keepalive reply.
    Pong,
    /// A command failed. The connection stays open.
    Error(GatewayError),
    /// A domain event delivered on one subscribed channel.
    Event {
        /// Channel it was delivered on.
        channel: Channel,
        /// The event.
        event: DomainEvent,
    },
}

impl ServerMessage {
    /// Converts to the wire envelope.
    #[must_use]
    pub fn into_envelope(self) -> WsEnvelope {
        match self {
            Self::Authenticated { user_id } => WsEnvelope::new(
                "authenticated",
                serde_json::json!({ "userId": user_id }),
                None,
            ),
            Self::Subscribed(channel) => {
                WsEnvelope::new("subscribed", serde_json::Value::Null, Some(channel.to_string()))
            }
            Self::Unsubscribed(channel) => WsEnvelope::new(
                "unsubscribed",
                serde_json::Value::Null,
                Some(channel.to_string()),
            ),
            Self::Pong => WsEnvelope::new("pong", serde_json::Value::Null, None),
            Self::Error(err) => WsEnvelope::new(
                "error",
                serde_json::json!({
                    "code": err.error_code(),
                    "reason": err.reason(),
                    "message": err.to_string(),
                }),
                None,
            ),
            Self::Event { channel, event } => WsEnvelope::new(
                event.event_type_str(),
                event.payload(),
                Some(channel.to_string()),
            ),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::RestaurantId;

    fn envelope(json: serde_json::Value) -> WsEnvelope {
        let Ok(env) = serde_json::from_value(json) else {
            panic!("envelope did not parse");
        };
        env
    }

    #[test]
    fn missing_timestamp_defaults() {
        let env = envelope(serde_json::json!({ "type": "ping" }));
        assert_eq!(ClientMessage::from_envelope(&env).ok(), Some(ClientMessage::Ping));
    }

    #[test]
    fn subscribe_merges_channel_field_and_list() {
        let env = envelope(serde_json::json!({
            "type": "subscribe",
            "channel": "deals",
            "payload": { "channels": ["restaurant:4:queue"] },
        }));
        assert_eq!(
            ClientMessage::from_envelope(&env).ok(),
            Some(ClientMessage::Subscribe(vec![
                Channel::RestaurantQueue(RestaurantId(4)),
                Channel::Deals
            ]))
        );
    }

    #[test]
    fn auth_reads_camel_case_payload() {
        let env = envelope(serde_json::json!({
            "type": "auth",
            "payload": { "userId": 7, "token": "abc" },
        }));
        assert_eq!(
            ClientMessage::from_envelope(&env).ok(),
            Some(ClientMessage::Auth {
                user_id: UserId(7),
                token: "abc".to_string()
            })
        );
    }

    #[test]
    fn unknown_type_and_bad_channel_are_rejected() {
        for json in [
            serde_json::json!({ "type": "order" }),
            serde_json::json!({ "type": "subscribe" }),
            serde_json::json!({ "type": "subscribe", "channel": "user:x:queue" }),
            serde_json::json!({ "type": "auth", "payload": { "userId": "seven" } }),
        ] {
            assert!(ClientMessage::from_envelope(&envelope(json)).is_err());
        }
    }

    #[test]
    fn error_reply_carries_reason() {
        let env = ServerMessage::Error(GatewayError::Unauthorized).into_envelope();
        assert_eq!(env.msg_type, "error");
        assert_eq!(
            env.payload.get("reason").and_then(|v| v.as_str()),
            Some("unauthorized")
        );
    }
}
