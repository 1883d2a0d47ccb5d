//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::messages::{ClientMessage, ServerMessage, WsEnvelope};
use super::subscription::{Principal, SubscriptionManager};
use crate::crypto::Signer;
use crate::domain::{DomainEvent, UserDirectory};
use crate::error::GatewayError;

/// Shared dependencies of every connection.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    /// Directory used to resolve the authenticating user's role.
    pub users: Arc<UserDirectory>,
    /// Verifies session tokens.
    pub signer: Arc<Signer>,
    /// Inbound silence after which the server closes the socket.
    pub idle_timeout: Duration,
}

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards events on subscribed channels from the
///   [`broadcast::Receiver`] to the client.
/// - Closes the socket after `idle_timeout` without inbound traffic.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<DomainEvent>,
    ctx: ConnectionContext,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();
    let idle = tokio::time::sleep(ctx.idle_timeout);
    tokio::pin!(idle);

    loop {
        tokio::select! {
            // Incoming message from client
            msg = ws_rx.next() => {
                idle.as_mut().reset(Instant::now() + ctx.idle_timeout);
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        for reply in handle_text_message(&text, &mut subs, &ctx).await {
                            if ws_tx.send(Message::text(reply.into_envelope().to_json())).await.is_err() {
                                tracing::warn!("ws send failed, closing connection");
                                return;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "ws receive error");
                        break;
                    }
                    _ => {}
                }
            }
            // Event from EventBus
            event = event_rx.recv() => {
                match event {
                    Ok(event) => {
                        for channel in subs.matching(&event) {
                            let msg = ServerMessage::Event { channel, event: event.clone() };
                            if ws_tx.send(Message::text(msg.into_envelope().to_json())).await.is_err() {
                                tracing::warn!(%channel, "ws send failed, closing connection");
                                return;
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            () = &mut idle => {
                tracing::info!(
                    user_id = ?subs.principal().map(|p| p.user_id),
                    "closing idle ws connection"
                );
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(subscriptions = subs.count(), "ws connection closed");
}

/// Handles a text frame from the client, returning the replies to send.
///
/// Malformed frames are logged and answered with an `error` message; they
/// never close the connection.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    ctx: &ConnectionContext,
) -> Vec<ServerMessage> {
    let command = serde_json::from_str::<WsEnvelope>(text)
        .map_err(|e| GatewayError::InvalidRequest(format!("malformed JSON: {e}")))
        .and_then(|envelope| ClientMessage::from_envelope(&envelope));
    let command = match command {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(error = %e, "dropping malformed ws message");
            return vec![ServerMessage::Error(e)];
        }
    };

    match command {
        ClientMessage::Auth { user_id, token } => {
            if !ctx.signer.verify_session(user_id.get(), &token) {
                tracing::warn!(%user_id, "ws auth rejected");
                return vec![ServerMessage::Error(GatewayError::Unauthorized)];
            }
            match ctx.users.get(user_id).await {
                Ok(user) => {
                    subs.authenticate(Principal {
                        user_id,
                        role: user.role,
                    });
                    tracing::debug!(%user_id, "ws authenticated");
                    vec![ServerMessage::Authenticated { user_id }]
                }
                Err(e) => vec![ServerMessage::Error(e)],
            }
        }
        ClientMessage::Subscribe(channels) => channels
            .into_iter()
            .map(|channel| match subs.subscribe(channel) {
                Ok(()) => ServerMessage::Subscribed(channel),
                Err(e) => {
                    tracing::debug!(%channel, error = %e, "subscription refused");
                    ServerMessage::Error(e)
                }
            })
            .collect(),
        ClientMessage::Unsubscribe(channels) => channels
            .into_iter()
            .map(|channel| {
                subs.unsubscribe(channel);
                ServerMessage::Unsubscribed(channel)
            })
            .collect(),
        ClientMessage::Ping => vec![ServerMessage::Pong],
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Channel, Role, UserId};

    async fn context() -> (ConnectionContext, UserId) {
        let users = Arc::new(UserDirectory::new());
        let Ok(user) = users.register("Robin", Role::Customer).await else {
            panic!("register failed");
        };
        let Ok(signer) = Signer::new("ws-test") else {
            panic!("signer rejected key");
        };
        let ctx = ConnectionContext {
            users,
            signer: Arc::new(signer),
            idle_timeout: Duration::from_secs(30),
        };
        (ctx, user.id)
    }

    fn types(replies: Vec<ServerMessage>) -> Vec<String> {
        replies
            .into_iter()
            .map(|r| r.into_envelope().msg_type)
            .collect()
    }

    #[tokio::test]
    async fn auth_then_subscribe() {
        let (ctx, user) = context().await;
        let mut subs = SubscriptionManager::new();

        let before = handle_text_message(
            r#"{"type":"subscribe","channel":"deals"}"#,
            &mut subs,
            &ctx,
        )
        .await;
        assert_eq!(types(before), vec!["error"]);

        let token = ctx.signer.session_token(user.get());
        let auth = format!(
            r#"{{"type":"auth","payload":{{"userId":{user},"token":"{token}"}}}}"#
        );
        assert_eq!(
            types(handle_text_message(&auth, &mut subs, &ctx).await),
            vec!["authenticated"]
        );

        let after = handle_text_message(
            &format!(r#"{{"type":"subscribe","payload":{{"channels":["deals","user:{user}:queue"]}}}}"#),
            &mut subs,
            &ctx,
        )
        .await;
        assert_eq!(types(after), vec!["subscribed", "subscribed"]);
        assert_eq!(subs.count(), 2);
        assert!(subs.authorize(Channel::UserQueue(user)).is_ok());
    }

    #[tokio::test]
    async fn bad_token_is_rejected() {
        let (ctx, user) = context().await;
        let mut subs = SubscriptionManager::new();
        let auth = format!(r#"{{"type":"auth","payload":{{"userId":{user},"token":"00"}}}}"#);
        assert_eq!(
            types(handle_text_message(&auth, &mut subs, &ctx).await),
            vec!["error"]
        );
        assert!(subs.principal().is_none());
    }

    #[tokio::test]
    async fn malformed_frames_get_error_reply() {
        let (ctx, _) = context().await;
        let mut subs = SubscriptionManager::new();
        for frame in ["not json", r#"{"type":"dance"}"#, r#"{"payload":{}}"#] {
            assert_eq!(
                types(handle_text_message(frame, &mut subs, &ctx).await),
                vec!["error"]
            );
        }
        assert_eq!(
            types(handle_text_message(r#"{"type":"ping"}"#, &mut subs, &ctx).await),
            vec!["pong"]
        );
    }
}
