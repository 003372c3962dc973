//! Earning flow integration tests: repairs, gifts, market purchases,
//! referrals.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

// ============================================================================
// Repairs
// ============================================================================

#[tokio::test]
async fn repair_credits_base_and_tier_bonus() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b1").await;
    let shop_id = harness.register_shop("Shop A").await;

    let response = harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "customer": customer,
            "shop_id": shop_id,
            "repair_amount_cents": 15_000
        }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["base_reward"], 25);
    assert_eq!(body["tier_bonus"], 10);
    assert_eq!(body["total_credited"], 35);
    assert_eq!(body["old_tier"], "bronze");
    assert_eq!(body["already_recorded"], false);

    assert_eq!(harness.earned_balance(&customer).await, 35);

    // The shop becomes the home shop.
    let balance: serde_json::Value = harness
        .server
        .get(&format!("/v1/customers/{customer}/earned-balance"))
        .await
        .json();
    assert_eq!(balance["home_shop_id"], shop_id);
}

#[tokio::test]
async fn repair_replay_is_idempotent() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b2").await;
    let shop_id = harness.register_shop("Shop A").await;

    let request = json!({
        "customer": customer,
        "shop_id": shop_id,
        "repair_amount_cents": 15_000,
        "transaction_id": "01ARZ3NDEKTSV4RRFFQ69G5FAV"
    });

    harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&request)
        .await
        .assert_status_ok();

    let replay = harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&request)
        .await;
    replay.assert_status_ok();
    let body: serde_json::Value = replay.json();
    assert_eq!(body["already_recorded"], true);

    // Only one credit landed.
    assert_eq!(harness.earned_balance(&customer).await, 35);
}

#[tokio::test]
async fn repair_below_minimum_rejected() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b3").await;
    let shop_id = harness.register_shop("Shop A").await;

    let response = harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "customer": customer,
            "shop_id": shop_id,
            "repair_amount_cents": 4_999
        }))
        .await;
    response.assert_status_bad_request();
}

#[tokio::test]
async fn daily_cap_returns_limit_exceeded() {
    let harness = TestHarness::new(); // default caps: 50/day
    let customer = harness.register_customer("b4").await;
    let shop_id = harness.register_shop("Shop A").await;

    // First major repair: 35 of 50.
    harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "customer": customer,
            "shop_id": shop_id,
            "repair_amount_cents": 15_000
        }))
        .await
        .assert_status_ok();

    // Second major repair does not fit.
    let response = harness
        .server
        .post("/v1/earnings/repair")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "customer": customer,
            "shop_id": shop_id,
            "repair_amount_cents": 15_000
        }))
        .await;
    response.assert_status(StatusCode::PAYMENT_REQUIRED);

    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "limit_exceeded");
    assert_eq!(body["error"]["details"]["remaining"], 15);

    // Balance unchanged by the denied credit.
    assert_eq!(harness.earned_balance(&customer).await, 35);
}

// ============================================================================
// Gifts & Market Purchases
// ============================================================================

#[tokio::test]
async fn gift_raises_total_but_not_earned() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b5").await;

    harness
        .server
        .post("/v1/earnings/gift")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "to": customer, "amount": 50 }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = harness
        .server
        .get(&format!("/v1/customers/{customer}/earned-balance"))
        .await
        .json();
    assert_eq!(body["earned_balance"], 0);
    assert_eq!(body["total_balance"], 50);
    assert_eq!(body["market_balance"], 50);
    assert!(body["home_shop_id"].is_null());
}

#[tokio::test]
async fn market_purchase_recorded() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b6").await;

    harness
        .server
        .post("/v1/earnings/market")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "customer": customer, "amount": 200 }))
        .await
        .assert_status_ok();

    let body: serde_json::Value = harness
        .server
        .get(&format!("/v1/customers/{customer}/earned-balance"))
        .await
        .json();
    assert_eq!(body["earned_balance"], 0);
    assert_eq!(body["market_balance"], 200);
    // Market credits still drive lifetime earnings and tier.
    assert_eq!(body["lifetime_earnings"], 200);
    assert_eq!(body["tier"], "silver");
}

#[tokio::test]
async fn gift_with_non_positive_amount_rejected() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("b7").await;

    let response = harness
        .server
        .post("/v1/earnings/gift")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "to": customer, "amount": 0 }))
        .await;
    response.assert_status_bad_request();
}

// ============================================================================
// Referrals
// ============================================================================

#[tokio::test]
async fn referral_credits_both_sides() {
    let harness = TestHarness::new();
    let referrer = harness.register_customer("b8").await;
    let referee = harness.register_customer("b9").await;

    let response = harness
        .server
        .post("/v1/referrals/complete")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "referrer": referrer, "referee": referee }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["referrer_tokens"], 25);
    assert_eq!(body["referee_tokens"], 10);

    assert_eq!(harness.earned_balance(&referrer).await, 25);
    assert_eq!(harness.earned_balance(&referee).await, 10);
}

#[tokio::test]
async fn referral_with_unknown_referee_fails_whole() {
    let harness = TestHarness::new();
    let referrer = harness.register_customer("ba").await;

    let response = harness
        .server
        .post("/v1/referrals/complete")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "referrer": referrer,
            "referee": TestHarness::address("fe")
        }))
        .await;
    response.assert_status_not_found();

    // The referrer was not partially credited.
    assert_eq!(harness.earned_balance(&referrer).await, 0);
}

#[tokio::test]
async fn self_referral_rejected() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("bb").await;

    let response = harness
        .server
        .post("/v1/referrals/complete")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({ "referrer": customer, "referee": customer }))
        .await;
    response.assert_status_bad_request();
}
