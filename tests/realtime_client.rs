//! Realtime client against a live server: resubscription after an
//! outage, no replay of missed events, and manual disconnect.

#![allow(clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::time::Duration;

use serde_json::json;

use common::{Proxy, TestServer};
use diner_gateway::client::{ClientConfig, ConnectionState, RealtimeClient, ReconnectPolicy};
use diner_gateway::domain::{Channel, UserId};
use diner_gateway::ws::WsEnvelope;

const WAIT: Duration = Duration::from_secs(5);

async fn wait_until(client: &RealtimeClient, want: fn(&ConnectionState) -> bool) {
    let reached = tokio::time::timeout(WAIT, client.wait_for_state(want)).await;
    assert!(matches!(reached, Ok(Ok(_))), "state never reached, now {}", client.state());
}

async fn next(client: &mut RealtimeClient) -> WsEnvelope {
    let Ok(Some(envelope)) = tokio::time::timeout(WAIT, client.next_event()).await else {
        panic!("no event received");
    };
    envelope
}

async fn order_update(server: &TestServer, user: i64, order_id: i64) {
    let (status, body) = server
        .patch(
            &format!("/api/orders/{order_id}"),
            json!({ "userId": user, "restaurantId": 1, "status": "ready" }),
        )
        .await;
    assert_eq!(status, 200, "order update: {body}");
}

async fn reservation_update(server: &TestServer, user: i64, reservation_id: i64) {
    let (status, body) = server
        .patch(
            &format!("/api/reservations/{reservation_id}"),
            json!({ "userId": user, "restaurantId": 1, "status": "confirmed" }),
        )
        .await;
    assert_eq!(status, 200, "reservation update: {body}");
}

#[tokio::test]
async fn resubscribes_after_an_outage_without_replay() {
    let server = TestServer::start().await;
    let proxy = Proxy::start(server.addr).await;
    let (user, token) = server.create_user("Rita", "customer").await;

    let mut config = ClientConfig::new(proxy.ws_url(), UserId(user), token).with_channels([
        Channel::UserOrders(UserId(user)),
        Channel::UserReservations(UserId(user)),
    ]);
    config.reconnect = ReconnectPolicy {
        max_attempts: 50,
        base_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(100),
    };
    let mut client = RealtimeClient::connect(config);
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    order_update(&server, user, 1).await;
    let before = next(&mut client).await;
    assert_eq!(before.msg_type, "order_updated");
    assert_eq!(before.payload["orderId"], 1);

    proxy.sever();
    wait_until(&client, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;

    // Published while the client is offline.
    order_update(&server, user, 2).await;

    proxy.restore();
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    order_update(&server, user, 3).await;
    reservation_update(&server, user, 40).await;

    let after = next(&mut client).await;
    assert_eq!(after.msg_type, "order_updated");
    assert_eq!(after.payload["orderId"], 3, "missed event was replayed");
    assert_eq!(after.channel.as_deref(), Some(format!("user:{user}:orders").as_str()));

    let reservation = next(&mut client).await;
    assert_eq!(reservation.msg_type, "reservation_updated");
    assert_eq!(reservation.payload["reservationId"], 40);
}

#[tokio::test]
async fn channels_added_while_connected_are_held_across_reconnects() {
    let server = TestServer::start().await;
    let proxy = Proxy::start(server.addr).await;
    let (user, token) = server.create_user("Omar", "customer").await;

    let mut config = ClientConfig::new(proxy.ws_url(), UserId(user), token);
    config.reconnect.base_delay = Duration::from_millis(20);
    config.reconnect.max_attempts = 50;
    let mut client = RealtimeClient::connect(config);
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    client
        .subscribe(Channel::UserOrders(UserId(user)))
        .expect("subscribe");

    proxy.sever();
    wait_until(&client, |s| matches!(s, ConnectionState::Reconnecting { .. })).await;
    proxy.restore();
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    order_update(&server, user, 9).await;
    let event = next(&mut client).await;
    assert_eq!(event.payload["orderId"], 9);
}

#[tokio::test]
async fn foreign_user_channels_are_refused() {
    let server = TestServer::start().await;
    let (me, token) = server.create_user("Ivy", "customer").await;
    let (other, _) = server.create_user("Jon", "customer").await;

    let config = ClientConfig::new(server.ws_url(), UserId(me), token)
        .with_channels([Channel::UserOrders(UserId(other))]);
    let mut client = RealtimeClient::connect(config);
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    order_update(&server, other, 5).await;
    let outcome = tokio::time::timeout(Duration::from_millis(300), client.next_event()).await;
    assert!(outcome.is_err(), "received another user's event");
}

#[tokio::test]
async fn manual_disconnect_does_not_reconnect() {
    let server = TestServer::start().await;
    let (user, token) = server.create_user("Kai", "customer").await;

    let client = RealtimeClient::connect(ClientConfig::new(server.ws_url(), UserId(user), token));
    wait_until(&client, |s| *s == ConnectionState::Connected).await;

    assert!(client.disconnect().await.is_ok());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(client.is_finished());
    assert!(client.subscribe(Channel::Deals).is_err());
}

#[tokio::test]
async fn bad_token_exhausts_the_retry_budget() {
    let server = TestServer::start().await;
    let (user, _) = server.create_user("Lou", "customer").await;

    let mut config = ClientConfig::new(server.ws_url(), UserId(user), "forged");
    config.reconnect = ReconnectPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(10),
    };
    let client = RealtimeClient::connect(config);
    wait_until(&client, |s| *s == ConnectionState::Failed).await;
}
