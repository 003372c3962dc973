//! HTTP minter client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use rcn_core::Address;

use super::{MintReceipt, Minter, MinterError};

/// HTTP client for the token minter API.
#[derive(Debug, Clone)]
pub struct HttpMinter {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct MintRequest<'a> {
    address: &'a str,
    amount: i64,
}

#[derive(Debug, Deserialize)]
struct BalanceResponse {
    balance: i64,
}

#[derive(Debug, Deserialize)]
struct MinterErrorResponse {
    error: String,
}

impl HttpMinter {
    /// Create a new minter client.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built (should not happen with
    /// default settings).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    /// Handle API response and convert errors.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, MinterError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let error_body: Result<MinterErrorResponse, _> = response.json().await;
        match error_body {
            Ok(body) => Err(MinterError::Api {
                status: status.as_u16(),
                error: body.error,
            }),
            Err(_) => Err(MinterError::Api {
                status: status.as_u16(),
                error: format!("HTTP {status}"),
            }),
        }
    }
}

#[async_trait]
impl Minter for HttpMinter {
    async fn mint(&self, address: &Address, amount: i64) -> Result<MintReceipt, MinterError> {
        let url = format!("{}/api/v1/mint", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&MintRequest {
                address: address.as_str(),
                amount,
            })
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn balance_of(&self, address: &Address) -> Result<i64, MinterError> {
        let url = format!("{}/api/v1/balance/{}", self.base_url, address);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        Self::handle_response::<BalanceResponse>(response)
            .await
            .map(|r| r.balance)
    }
}
