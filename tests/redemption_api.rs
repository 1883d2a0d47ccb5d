//! Redemption guarantees over HTTP: single use, deal capacity under
//! concurrent scans, and point balances that never go negative.

#![allow(clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

mod common;

use std::sync::Arc;

use serde_json::json;

use common::{TestServer, reason};

#[tokio::test]
async fn two_simultaneous_claims_on_the_last_unit() {
    let server = TestServer::start().await;
    let (staff, _) = server.create_user("Sam", "staff").await;
    let (a, _) = server.create_user("Ava", "customer").await;
    let (b, _) = server.create_user("Bo", "customer").await;
    let deal = server.create_live_deal(staff, 1).await;

    let code_a = server
        .issue(json!({ "userId": a, "type": "lightning", "dealId": deal }))
        .await;
    let code_b = server
        .issue(json!({ "userId": b, "type": "lightning", "dealId": deal }))
        .await;

    let (first, second) = tokio::join!(server.scan(&code_a, staff), server.scan(&code_b, staff));
    let mut statuses = [first.0, second.0];
    statuses.sort_unstable();
    assert_eq!(statuses, [200, 409]);

    let loser = if first.0 == 409 { &first.1 } else { &second.1 };
    assert_eq!(reason(loser), "sold_out");

    let (_, deals) = server.get("/api/lightning-deals").await;
    assert_eq!(deals[0]["claimed"], 1);
    assert_eq!(deals[0]["remaining"], 0);
}

#[tokio::test]
async fn concurrent_claims_never_exceed_capacity() {
    const CAPACITY: u32 = 3;
    const CLAIMS: usize = 8;

    let server = Arc::new(TestServer::start().await);
    let (staff, _) = server.create_user("Sam", "staff").await;
    let deal = server.create_live_deal(staff, CAPACITY).await;

    let mut codes = Vec::with_capacity(CLAIMS);
    for i in 0..CLAIMS {
        let (customer, _) = server.create_user(&format!("guest-{i}"), "customer").await;
        codes.push(
            server
                .issue(json!({ "userId": customer, "type": "lightning", "dealId": deal }))
                .await,
        );
    }

    let handles: Vec<_> = codes
        .into_iter()
        .map(|code| {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.scan(&code, staff).await })
        })
        .collect();

    let mut succeeded = 0;
    let mut sold_out = 0;
    for handle in handles {
        let (status, body) = handle.await.expect("scan task");
        match status {
            200 => succeeded += 1,
            409 if reason(&body) == "sold_out" => sold_out += 1,
            other => panic!("unexpected scan result {other}: {body}"),
        }
    }
    assert_eq!(succeeded, CAPACITY as usize);
    assert_eq!(sold_out, CLAIMS - CAPACITY as usize);

    let (_, deals) = server.get("/api/lightning-deals").await;
    assert_eq!(deals[0]["claimed"], CAPACITY);
}

#[tokio::test]
async fn a_code_redeems_exactly_once() {
    let server = Arc::new(TestServer::start().await);
    let (staff, _) = server.create_user("Sam", "staff").await;
    let (customer, _) = server.create_user("Cy", "customer").await;
    server.award(customer, staff, 100).await;

    let (status, reward) = server
        .post(
            "/api/rewards",
            json!({ "staffUserId": staff, "name": "Free dessert", "pointsRequired": 10 }),
        )
        .await;
    assert_eq!(status, 201);
    let code = server
        .issue(json!({ "userId": customer, "type": "loyalty", "rewardId": reward["id"] }))
        .await;

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let server = Arc::clone(&server);
            let code = code.clone();
            tokio::spawn(async move { server.scan(&code, staff).await })
        })
        .collect();
    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("scan task"));
    }

    let successes = results.iter().filter(|(status, _)| *status == 200).count();
    assert_eq!(successes, 1);
    assert!(
        results
            .iter()
            .filter(|(status, _)| *status != 200)
            .all(|(status, body)| *status == 409 && reason(body) == "already_redeemed")
    );
    assert_eq!(server.points(customer).await, 90);

    let (status, body) = server.scan(&code, staff).await;
    assert_eq!(status, 409);
    assert_eq!(reason(&body), "already_redeemed");
    assert_eq!(server.points(customer).await, 90);
}

#[tokio::test]
async fn unaffordable_rewards_leave_the_balance_alone() {
    let server = TestServer::start().await;
    let (staff, _) = server.create_user("Sam", "staff").await;
    let (customer, _) = server.create_user("Di", "customer").await;
    server.award(customer, staff, 5).await;

    let (_, reward) = server
        .post(
            "/api/rewards",
            json!({ "staffUserId": staff, "name": "Appetizer", "pointsRequired": 10 }),
        )
        .await;
    let code = server
        .issue(json!({ "userId": customer, "type": "loyalty", "rewardId": reward["id"] }))
        .await;

    let (status, body) = server.scan(&code, staff).await;
    assert_eq!(status, 422);
    assert_eq!(reason(&body), "insufficient_points");
    assert_eq!(server.points(customer).await, 5);

    server.award(customer, staff, 10).await;
    let retry = server
        .issue(json!({ "userId": customer, "type": "loyalty", "rewardId": reward["id"] }))
        .await;
    let (status, body) = server.scan(&retry, staff).await;
    assert_eq!(status, 200, "scan: {body}");
    assert_eq!(body["redemption"]["details"]["pointsDeducted"], 10);
    assert_eq!(server.points(customer).await, 5);
}

#[tokio::test]
async fn customers_cannot_scan_and_tampered_codes_are_rejected() {
    let server = TestServer::start().await;
    let (staff, _) = server.create_user("Sam", "staff").await;
    let (customer, _) = server.create_user("Eve", "customer").await;
    let deal = server.create_live_deal(staff, 5).await;
    let code = server
        .issue(json!({ "userId": customer, "type": "lightning", "dealId": deal }))
        .await;

    let (status, body) = server.scan(&code, customer).await;
    assert_eq!(status, 403);
    assert_eq!(reason(&body), "unauthorized");

    let mut tampered = code.clone();
    tampered.push('0');
    let (status, body) = server.scan(&tampered, staff).await;
    assert_eq!(status, 400);
    assert_eq!(reason(&body), "invalid_code");

    let (status, _) = server.scan(&code, staff).await;
    assert_eq!(status, 200);
}
