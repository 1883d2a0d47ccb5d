//! Reconnecting WebSocket client for the realtime channel API.
//!
//! [`RealtimeClient::connect`] spawns a driver task that owns the socket.
//! The handle talks to it over channels: commands go in through an
//! unbounded mpsc, events come out through another, and the lifecycle is
//! published on a `watch` so callers can await a state.
//!
//! The driver keeps the set of held channels. After every successful
//! (re)connect it sends `auth` and then one `subscribe` for the whole set,
//! and only reports [`ConnectionState::Connected`] once the server has
//! answered each channel. Events published while the socket was down are
//! not replayed.

use std::collections::BTreeSet;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::error::ClientError;
use super::policy::ClientConfig;
use super::state::ConnectionState;
use crate::domain::Channel;
use crate::ws::WsEnvelope;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug)]
enum Command {
    Subscribe(Channel),
    Unsubscribe(Channel),
    Disconnect,
}

/// Handle to a running realtime connection.
///
/// Dropping the handle closes the socket normally.
#[derive(Debug)]
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<Command>,
    events: mpsc::UnboundedReceiver<WsEnvelope>,
    state: watch::Receiver<ConnectionState>,
    task: JoinHandle<()>,
}

impl RealtimeClient {
    /// Starts connecting in the background. Must be called inside a Tokio
    /// runtime.
    #[must_use]
    pub fn connect(config: ClientConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let driver = Driver {
            channels: config.channels.iter().copied().collect(),
            config,
            commands: commands_rx,
            events: events_tx,
            state: state_tx,
        };
        let task = tokio::spawn(driver.run());

        Self {
            commands: commands_tx,
            events: events_rx,
            state: state_rx,
            task,
        }
    }

    /// Adds `channel` to the held set. Sent immediately when connected,
    /// otherwise on the next successful connect.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NetworkError`] once the driver has stopped.
    pub fn subscribe(&self, channel: Channel) -> Result<(), ClientError> {
        self.command(Command::Subscribe(channel))
    }

    /// Removes `channel` from the held set.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NetworkError`] once the driver has stopped.
    pub fn unsubscribe(&self, channel: Channel) -> Result<(), ClientError> {
        self.command(Command::Unsubscribe(channel))
    }

    /// Closes the socket with a normal close code and stops retrying.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NetworkError`] if the driver had already
    /// stopped in a state other than `Disconnected`.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        // A stopped driver has nothing left to close.
        let _ = self.commands.send(Command::Disconnect);
        match self.wait_for_state(ConnectionState::is_final).await? {
            ConnectionState::Disconnected => Ok(()),
            other => Err(ClientError::NetworkError(format!(
                "client stopped while {other}"
            ))),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver notified on every state change.
    #[must_use]
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Waits until the state satisfies `predicate` and returns it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::NetworkError`] if the driver stops without
    /// ever reaching a matching state.
    pub async fn wait_for_state(
        &self,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> Result<ConnectionState, ClientError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(predicate)
            .await
            .map_err(|_| ClientError::NetworkError("client task stopped".to_string()))?;
        Ok(*state)
    }

    /// Next event or error envelope from the server. Control replies
    /// (`authenticated`, `subscribed`, `pong` and so on) are consumed by
    /// the driver. Returns `None` once the driver has stopped and every
    /// buffered event was read.
    pub async fn next_event(&mut self) -> Option<WsEnvelope> {
        self.events.recv().await
    }

    /// Returns `true` once the driver task has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    fn command(&self, command: Command) -> Result<(), ClientError> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::NetworkError("client task stopped".to_string()))
    }
}

enum SessionEnd {
    Closed,
    Lost(ClientError),
}

struct Driver {
    config: ClientConfig,
    channels: BTreeSet<Channel>,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<WsEnvelope>,
    state: watch::Sender<ConnectionState>,
}

impl Driver {
    async fn run(mut self) {
        let policy = self.config.reconnect;
        let mut attempt: u32 = 0;
        self.set_state(ConnectionState::Connecting);

        loop {
            let opened = match tokio::time::timeout(self.config.connect_timeout, self.open()).await
            {
                Ok(result) => result,
                Err(_) => Err(ClientError::NetworkError(format!(
                    "connect timed out after {:?}",
                    self.config.connect_timeout
                ))),
            };

            match opened {
                Ok(ws) => {
                    attempt = 0;
                    self.set_state(ConnectionState::Connected);
                    tracing::info!(
                        url = %self.config.url,
                        channels = self.channels.len(),
                        "realtime client connected"
                    );
                    match self.session(ws).await {
                        SessionEnd::Closed => {
                            tracing::info!(url = %self.config.url, "realtime client closed");
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                        SessionEnd::Lost(err) => {
                            tracing::warn!(error = %err, "realtime connection lost");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, attempt, "realtime connect failed");
                }
            }

            attempt = attempt.saturating_add(1);
            if policy.exhausted(attempt) {
                tracing::error!(
                    max_attempts = policy.max_attempts,
                    "realtime client giving up"
                );
                self.set_state(ConnectionState::Failed);
                return;
            }

            self.set_state(ConnectionState::Reconnecting { attempt });
            let delay = policy.delay_for(attempt);
            tracing::info!(attempt, ?delay, "realtime client reconnecting");
            if !self.backoff(delay).await {
                self.set_state(ConnectionState::Disconnected);
                return;
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    /// Sleeps for `delay` while still accepting commands. Returns `false`
    /// if a disconnect arrived.
    async fn backoff(&mut self, delay: Duration) -> bool {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);
        loop {
            tokio::select! {
                () = &mut sleep => return true,
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Subscribe(channel)) => {
                        self.channels.insert(channel);
                    }
                    Some(Command::Unsubscribe(channel)) => {
                        self.channels.remove(&channel);
                    }
                    Some(Command::Disconnect) | None => return false,
                },
            }
        }
    }

    /// Connects, authenticates and re-subscribes every held channel.
    async fn open(&self) -> Result<WsStream, ClientError> {
        let (mut ws, _response) = tokio_tungstenite::connect_async(self.config.url.as_str()).await?;

        let auth = WsEnvelope::new(
            "auth",
            serde_json::json!({ "userId": self.config.user_id, "token": self.config.token }),
            None,
        );
        send_envelope(&mut ws, &auth).await?;
        let reply = next_envelope(&mut ws).await?;
        match reply.msg_type.as_str() {
            "authenticated" => {}
            "error" => {
                return Err(ClientError::Protocol(format!(
                    "auth rejected: {}",
                    reply.payload
                )));
            }
            other => {
                return Err(ClientError::Protocol(format!(
                    "expected authenticated, got {other}"
                )));
            }
        }

        if self.channels.is_empty() {
            return Ok(ws);
        }

        let channels: Vec<String> = self.channels.iter().map(ToString::to_string).collect();
        let subscribe = WsEnvelope::new(
            "subscribe",
            serde_json::json!({ "channels": channels }),
            None,
        );
        send_envelope(&mut ws, &subscribe).await?;

        // One reply per channel, in order. Events on channels already
        // confirmed can interleave.
        let mut pending = self.channels.len();
        while pending > 0 {
            let envelope = next_envelope(&mut ws).await?;
            match envelope.msg_type.as_str() {
                "subscribed" => pending -= 1,
                "error" => {
                    tracing::warn!(payload = %envelope.payload, "resubscribe rejected");
                    pending -= 1;
                }
                _ => self.deliver(envelope),
            }
        }
        Ok(ws)
    }

    async fn session(&mut self, ws: WsStream) -> SessionEnd {
        let (mut sink, mut stream) = ws.split();

        let mut ping = tokio::time::interval(self.config.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ping.tick().await;

        let pong_deadline = tokio::time::sleep(self.config.pong_timeout);
        tokio::pin!(pong_deadline);
        let mut awaiting_pong = false;

        loop {
            tokio::select! {
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<WsEnvelope>(&text) {
                            Ok(envelope) if envelope.msg_type == "pong" => awaiting_pong = false,
                            Ok(envelope) => self.on_envelope(envelope),
                            Err(e) => tracing::warn!(error = %e, "malformed server frame"),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if frame.as_ref().is_some_and(|f| f.code == CloseCode::Normal) {
                            return SessionEnd::Closed;
                        }
                        return SessionEnd::Lost(ClientError::ConnectionLost(format!(
                            "server closed the socket: {frame:?}"
                        )));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return SessionEnd::Lost(e.into()),
                    None => {
                        return SessionEnd::Lost(ClientError::ConnectionLost(
                            "stream ended".to_string(),
                        ));
                    }
                },
                _ = ping.tick() => {
                    if !awaiting_pong {
                        let envelope = WsEnvelope::new("ping", serde_json::Value::Null, None);
                        if let Err(err) = send_envelope(&mut sink, &envelope).await {
                            return SessionEnd::Lost(err);
                        }
                        awaiting_pong = true;
                        pong_deadline
                            .as_mut()
                            .reset(Instant::now() + self.config.pong_timeout);
                    }
                }
                () = &mut pong_deadline, if awaiting_pong => {
                    return SessionEnd::Lost(ClientError::ConnectionLost(format!(
                        "no pong within {:?}",
                        self.config.pong_timeout
                    )));
                }
                cmd = self.commands.recv() => {
                    let envelope = match cmd {
                        Some(Command::Subscribe(channel)) => self
                            .channels
                            .insert(channel)
                            .then(|| channel_envelope("subscribe", channel)),
                        Some(Command::Unsubscribe(channel)) => self
                            .channels
                            .remove(&channel)
                            .then(|| channel_envelope("unsubscribe", channel)),
                        Some(Command::Disconnect) | None => {
                            let frame = CloseFrame {
                                code: CloseCode::Normal,
                                reason: Utf8Bytes::from_static("client disconnect"),
                            };
                            let _ = sink.send(Message::Close(Some(frame))).await;
                            let _ = sink.close().await;
                            return SessionEnd::Closed;
                        }
                    };
                    if let Some(envelope) = envelope {
                        if let Err(err) = send_envelope(&mut sink, &envelope).await {
                            return SessionEnd::Lost(err);
                        }
                    }
                }
            }
        }
    }

    fn on_envelope(&self, envelope: WsEnvelope) {
        match envelope.msg_type.as_str() {
            "authenticated" | "subscribed" | "unsubscribed" => {
                tracing::debug!(msg_type = %envelope.msg_type, channel = ?envelope.channel, "ack");
            }
            "error" => {
                tracing::warn!(payload = %envelope.payload, "server reported an error");
                self.deliver(envelope);
            }
            _ => self.deliver(envelope),
        }
    }

    fn deliver(&self, envelope: WsEnvelope) {
        // The handle may already be gone.
        let _ = self.events.send(envelope);
    }
}

fn channel_envelope(msg_type: &str, channel: Channel) -> WsEnvelope {
    WsEnvelope::new(msg_type, serde_json::Value::Null, Some(channel.to_string()))
}

async fn send_envelope<S>(sink: &mut S, envelope: &WsEnvelope) -> Result<(), ClientError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    sink.send(Message::text(envelope.to_json()))
        .await
        .map_err(ClientError::from)
}

async fn next_envelope(ws: &mut WsStream) -> Result<WsEnvelope, ClientError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text)
                    .map_err(|e| ClientError::Protocol(format!("malformed frame: {e}")));
            }
            Some(Ok(Message::Close(_))) | None => {
                return Err(ClientError::ConnectionLost(
                    "closed during handshake".to_string(),
                ));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
        }
    }
}
