//! Service configuration.

use serde::Deserialize;
use std::path::Path;

use rcn_core::{DAILY_EARN_CAP, DEFAULT_SESSION_TTL_SECONDS, MONTHLY_EARN_CAP};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/rcn-ledger").
    pub data_dir: String,

    /// Service API key for service-to-service auth.
    pub service_api_key: Option<String>,

    /// Token minter API URL (optional).
    pub minter_api_url: Option<String>,

    /// Token minter API key (optional).
    pub minter_api_key: Option<String>,

    /// Daily earning cap in RCN.
    pub daily_earn_cap: i64,

    /// Monthly earning cap in RCN.
    pub monthly_earn_cap: i64,

    /// Redemption session time-to-live in seconds.
    pub session_ttl_seconds: i64,

    /// How often the expiry sweep runs, in seconds.
    pub sweep_interval_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Minter secrets file structure.
#[derive(Debug, Deserialize)]
struct MinterSecrets {
    api_url: String,
    api_key: String,
}

impl ServiceConfig {
    /// Load configuration from environment variables and secrets files.
    #[must_use]
    pub fn from_env() -> Self {
        // Try to load minter secrets from file first, then fall back to env vars
        let (minter_api_url, minter_api_key) = load_minter_secrets();

        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/rcn-ledger".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            minter_api_url,
            minter_api_key,
            daily_earn_cap: std::env::var("DAILY_EARN_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DAILY_EARN_CAP),
            monthly_earn_cap: std::env::var("MONTHLY_EARN_CAP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(MONTHLY_EARN_CAP),
            session_ttl_seconds: std::env::var("SESSION_TTL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECONDS),
            sweep_interval_seconds: std::env::var("SWEEP_INTERVAL_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

/// Load minter secrets from file or environment.
fn load_minter_secrets() -> (Option<String>, Option<String>) {
    let secret_paths = [
        ".secrets/minter.json",
        "rcn-ledger/.secrets/minter.json",
        "../.secrets/minter.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<MinterSecrets>(path) {
            tracing::info!(path = %path, "Loaded minter secrets from file");
            return (Some(secrets.api_url), Some(secrets.api_key));
        }
    }

    tracing::debug!("Minter secrets file not found, using environment variables");
    (
        std::env::var("MINTER_API_URL").ok(),
        std::env::var("MINTER_API_KEY").ok(),
    )
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/rcn-ledger".into(),
            service_api_key: None,
            minter_api_url: None,
            minter_api_key: None,
            daily_earn_cap: DAILY_EARN_CAP,
            monthly_earn_cap: MONTHLY_EARN_CAP,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            sweep_interval_seconds: 60,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
