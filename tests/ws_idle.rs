//! Server-side idle timeout: silent sockets are closed, pinging ones are
//! kept open.

#![allow(clippy::expect_used, clippy::panic)]

mod common;

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::time::{Instant, timeout};
use tokio_tungstenite::tungstenite::Message;

use common::TestServer;

const IDLE: Duration = Duration::from_millis(300);

async fn idle_server() -> TestServer {
    TestServer::start_with(|state| state.ws_idle_timeout = IDLE).await
}

#[tokio::test]
async fn silent_connection_is_closed() {
    let server = idle_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("connect");

    let started = Instant::now();
    let frame = timeout(Duration::from_secs(3), ws.next())
        .await
        .expect("server never closed the idle socket");
    assert!(
        matches!(frame, Some(Ok(Message::Close(_)))),
        "expected a close frame, got {frame:?}"
    );
    assert!(started.elapsed() >= IDLE - Duration::from_millis(50));
}

#[tokio::test]
async fn pinging_connection_outlives_the_timeout() {
    let server = idle_server().await;
    let (mut ws, _) = tokio_tungstenite::connect_async(server.ws_url())
        .await
        .expect("connect");

    // Three timeouts' worth of traffic at a third of the interval.
    for _ in 0..9 {
        tokio::time::sleep(IDLE / 3).await;
        ws.send(Message::text(r#"{"type":"ping"}"#))
            .await
            .expect("send ping");
        let reply = timeout(Duration::from_secs(1), ws.next())
            .await
            .expect("no reply to ping");
        let text = match reply {
            Some(Ok(Message::Text(text))) => text,
            other => panic!("connection dropped while active: {other:?}"),
        };
        assert!(text.as_str().contains("\"pong\""), "unexpected reply {}", text.as_str());
    }

    let frame = timeout(Duration::from_secs(3), ws.next())
        .await
        .expect("server never closed after pings stopped");
    assert!(matches!(frame, Some(Ok(Message::Close(_)))));
}
