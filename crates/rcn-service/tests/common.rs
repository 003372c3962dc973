//! Common test utilities for rcn-service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::Duration;
use serde_json::json;
use tempfile::TempDir;

use rcn_core::EarningCaps;
use rcn_service::{create_router, AppState, ServiceConfig};
use rcn_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with default caps and TTL.
    pub fn new() -> Self {
        Self::build(EarningCaps::default(), 300)
    }

    /// Harness with caps high enough to build balances in one day.
    pub fn roomy() -> Self {
        Self::build(
            EarningCaps {
                daily: 10_000,
                monthly: 100_000,
            },
            300,
        )
    }

    /// Harness whose sessions expire immediately.
    pub fn instant_expiry() -> Self {
        Self::build(
            EarningCaps {
                daily: 10_000,
                monthly: 100_000,
            },
            0,
        )
    }

    fn build(caps: EarningCaps, session_ttl_seconds: i64) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open_with(
            temp_dir.path(),
            caps,
            Duration::seconds(session_ttl_seconds),
        )
        .expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            minter_api_url: None,
            minter_api_key: None,
            daily_earn_cap: caps.daily,
            monthly_earn_cap: caps.monthly,
            session_ttl_seconds,
            sweep_interval_seconds: 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        };

        let state = AppState::new(Arc::new(store), config);
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            _temp_dir: temp_dir,
            service_api_key,
        }
    }

    /// Bearer header authenticating the given customer wallet.
    pub fn customer_auth_header(address: &str) -> String {
        format!("Bearer wallet:{address}")
    }

    /// A deterministic test wallet address ending in `suffix` (two hex chars).
    pub fn address(suffix: &str) -> String {
        format!("0x00000000000000000000000000000000000000{suffix}")
    }

    /// Register a customer and return their address.
    pub async fn register_customer(&self, suffix: &str) -> String {
        let address = Self::address(suffix);
        self.server
            .post("/v1/customers")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&json!({ "address": address }))
            .await
            .assert_status_ok();
        address
    }

    /// Register a verified shop and return its id.
    pub async fn register_shop(&self, name: &str) -> String {
        let response = self
            .server
            .post("/v1/shops")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&json!({
                "name": name,
                "wallet_address": "0x9999999999999999999999999999999999999999",
                "verified": true
            }))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["id"].as_str().unwrap().to_string()
    }

    /// Credit one minor repair (10 base + 10 bronze bonus = 20 RCN).
    pub async fn minor_repair(&self, customer: &str, shop_id: &str) {
        self.server
            .post("/v1/earnings/repair")
            .add_header("x-api-key", self.service_api_key.clone())
            .json(&json!({
                "customer": customer,
                "shop_id": shop_id,
                "repair_amount_cents": 5_000
            }))
            .await
            .assert_status_ok();
    }

    /// Earn an exact balance at a shop via minor repairs (20 RCN each).
    pub async fn earn(&self, customer: &str, shop_id: &str, batches: usize) {
        for _ in 0..batches {
            self.minor_repair(customer, shop_id).await;
        }
    }

    /// Fetch the customer's earned balance.
    pub async fn earned_balance(&self, customer: &str) -> i64 {
        let response = self
            .server
            .get(&format!("/v1/customers/{customer}/earned-balance"))
            .await;
        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        body["earned_balance"].as_i64().unwrap()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
