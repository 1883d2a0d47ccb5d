//! Shared harness for the HTTP and WebSocket integration tests.
//!
//! Each test gets its own in-memory server on an ephemeral port.

#![allow(dead_code, clippy::expect_used, clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;

use diner_gateway::app_state::AppState;
use diner_gateway::config::GatewayConfig;

/// A running gateway plus an HTTP client pointed at it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    http: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Starts a server after letting the caller adjust the freshly built
    /// state, for settings finer than the config exposes.
    pub async fn start_with(adjust: impl FnOnce(&mut AppState)) -> Self {
        let config = GatewayConfig::default();
        let mut state = AppState::from_config(&config).expect("app state");
        adjust(&mut state);
        let app = diner_gateway::build_app(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            http: reqwest::Client::new(),
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub async fn get(&self, path: &str) -> (u16, Value) {
        let resp = self.http.get(self.url(path)).send().await.expect("GET");
        Self::read(resp).await
    }

    pub async fn post(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("POST");
        Self::read(resp).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .http
            .patch(self.url(path))
            .json(&body)
            .send()
            .await
            .expect("PATCH");
        Self::read(resp).await
    }

    async fn read(resp: reqwest::Response) -> (u16, Value) {
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Registers a user and returns `(id, session token)`.
    pub async fn create_user(&self, name: &str, role: &str) -> (i64, String) {
        let (status, body) = self
            .post("/api/users", json!({ "name": name, "role": role }))
            .await;
        assert_eq!(status, 201, "create user: {body}");
        let id = body["user"]["id"].as_i64().expect("user id");
        let token = body["sessionToken"].as_str().expect("token").to_string();
        (id, token)
    }

    pub async fn award(&self, user_id: i64, staff_id: i64, points: u64) {
        let (status, body) = self
            .post(
                &format!("/api/loyalty/{user_id}/award"),
                json!({ "points": points, "staffUserId": staff_id }),
            )
            .await;
        assert_eq!(status, 200, "award: {body}");
    }

    pub async fn points(&self, user_id: i64) -> u64 {
        let (status, body) = self.get(&format!("/api/loyalty/{user_id}")).await;
        assert_eq!(status, 200, "loyalty: {body}");
        body["points"].as_u64().expect("points")
    }

    /// Creates a deal that is live for the next hour.
    pub async fn create_live_deal(&self, staff_id: i64, total: u32) -> i64 {
        let now = Utc::now();
        let (status, body) = self
            .post(
                "/api/lightning-deals",
                json!({
                    "staffUserId": staff_id,
                    "title": "Half-price ramen",
                    "originalPriceCents": 1600,
                    "dealPriceCents": 800,
                    "totalAvailable": total,
                    "startTime": now - Duration::minutes(1),
                    "endTime": now + Duration::hours(1),
                }),
            )
            .await;
        assert_eq!(status, 201, "create deal: {body}");
        body["id"].as_i64().expect("deal id")
    }

    pub async fn issue(&self, body: Value) -> String {
        let (status, resp) = self.post("/api/redemption-codes", body).await;
        assert_eq!(status, 201, "issue code: {resp}");
        resp["qrCodeValue"].as_str().expect("code").to_string()
    }

    pub async fn scan(&self, code: &str, staff_id: i64) -> (u16, Value) {
        self.post(
            "/api/scan-qr",
            json!({ "qrCodeValue": code, "staffUserId": staff_id }),
        )
        .await
    }
}

/// Reason string of an error response body.
pub fn reason(body: &Value) -> &str {
    body["error"]["reason"].as_str().unwrap_or_default()
}

/// TCP relay that can drop every live connection and refuse new ones,
/// simulating a network outage between a client and the server.
pub struct Proxy {
    pub addr: SocketAddr,
    online: Arc<AtomicBool>,
    kill: broadcast::Sender<()>,
}

impl Proxy {
    pub async fn start(upstream: SocketAddr) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind proxy");
        let addr = listener.local_addr().expect("proxy addr");
        let online = Arc::new(AtomicBool::new(true));
        let (kill, _) = broadcast::channel(4);

        let accept_online = Arc::clone(&online);
        let accept_kill = kill.clone();
        tokio::spawn(async move {
            while let Ok((mut inbound, _)) = listener.accept().await {
                if !accept_online.load(Ordering::SeqCst) {
                    drop(inbound);
                    continue;
                }
                let mut killed = accept_kill.subscribe();
                tokio::spawn(async move {
                    let Ok(mut outbound) = TcpStream::connect(upstream).await else {
                        return;
                    };
                    tokio::select! {
                        _ = tokio::io::copy_bidirectional(&mut inbound, &mut outbound) => {}
                        _ = killed.recv() => {}
                    }
                });
            }
        });

        Self { addr, online, kill }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Drops every relayed connection and refuses new ones.
    pub fn sever(&self) {
        self.online.store(false, Ordering::SeqCst);
        let _ = self.kill.send(());
    }

    pub fn restore(&self) {
        self.online.store(true, Ordering::SeqCst);
    }
}
