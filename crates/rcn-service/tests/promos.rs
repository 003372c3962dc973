//! Promo code integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

async fn create_promo(harness: &TestHarness, shop_id: &str, code: &str) {
    let response = harness
        .server
        .post("/v1/promos")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": code,
            "bonus_kind": "percentage",
            "bonus_value": 50,
            "max_bonus": 10,
            "start_date": "2020-01-01T00:00:00Z",
            "end_date": "2099-01-01T00:00:00Z",
            "total_usage_limit": 5,
            "per_customer_limit": 1
        }))
        .await;
    response.assert_status_ok();
}

#[tokio::test]
async fn create_validate_and_use_promo() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("e1").await;
    let shop_id = harness.register_shop("Promo Shop").await;
    create_promo(&harness, &shop_id, "launch10").await;

    // Validate previews the bonus without using the code.
    let validate: serde_json::Value = harness
        .server
        .post("/v1/promos/validate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "LAUNCH10",
            "customer": customer,
            "base_reward": 10
        }))
        .await
        .json();
    assert_eq!(validate["valid"], true);
    assert_eq!(validate["bonus"], 5); // 50% of 10
    assert_eq!(validate["times_used"], 0);

    // Use credits the bonus.
    let used: serde_json::Value = harness
        .server
        .post("/v1/promos/use")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "launch10",
            "customer": customer,
            "base_reward": 10
        }))
        .await
        .json();
    assert_eq!(used["bonus"], 5);
    assert_eq!(used["total_reward"], 15);
    assert_eq!(used["times_used"], 1);

    assert_eq!(harness.earned_balance(&customer).await, 5);
}

#[tokio::test]
async fn percentage_bonus_respects_max_bonus() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("e2").await;
    let shop_id = harness.register_shop("Promo Shop").await;
    create_promo(&harness, &shop_id, "BIG").await;

    let used: serde_json::Value = harness
        .server
        .post("/v1/promos/use")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "BIG",
            "customer": customer,
            "base_reward": 40 // 50% = 20, capped at 10
        }))
        .await
        .json();
    assert_eq!(used["bonus"], 10);
}

#[tokio::test]
async fn per_customer_limit_blocks_second_use() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("e3").await;
    let shop_id = harness.register_shop("Promo Shop").await;
    create_promo(&harness, &shop_id, "ONCE").await;

    harness
        .server
        .post("/v1/promos/use")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "ONCE",
            "customer": customer,
            "base_reward": 10
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/promos/use")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "ONCE",
            "customer": customer,
            "base_reward": 10
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    // Counter still reflects exactly one use.
    let validate = harness
        .server
        .post("/v1/promos/validate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "ONCE",
            "customer": TestHarness::address("e4"),
            "base_reward": 10
        }))
        .await;
    // A different customer can still validate; times_used is 1.
    let body: serde_json::Value = validate.json();
    assert_eq!(body["times_used"], 1);
}

#[tokio::test]
async fn duplicate_code_per_shop_conflicts() {
    let harness = TestHarness::new();
    let shop_id = harness.register_shop("Promo Shop").await;
    create_promo(&harness, &shop_id, "DUP").await;

    let response = harness
        .server
        .post("/v1/promos")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "dup", // case-insensitive duplicate
            "bonus_kind": "fixed",
            "bonus_value": 5,
            "start_date": "2020-01-01T00:00:00Z",
            "end_date": "2099-01-01T00:00:00Z"
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_code_not_found() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("e5").await;
    let shop_id = harness.register_shop("Promo Shop").await;

    let response = harness
        .server
        .post("/v1/promos/use")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "GHOST",
            "customer": customer,
            "base_reward": 10
        }))
        .await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn promo_outside_window_rejected() {
    let harness = TestHarness::new();
    let customer = harness.register_customer("e6").await;
    let shop_id = harness.register_shop("Promo Shop").await;

    harness
        .server
        .post("/v1/promos")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "PAST",
            "bonus_kind": "fixed",
            "bonus_value": 5,
            "start_date": "2020-01-01T00:00:00Z",
            "end_date": "2020-02-01T00:00:00Z"
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .post("/v1/promos/validate")
        .add_header("x-api-key", harness.service_api_key.clone())
        .json(&json!({
            "shop_id": shop_id,
            "code": "PAST",
            "customer": customer,
            "base_reward": 10
        }))
        .await;
    response.assert_status_bad_request();
}
