//! HTTP API service for the RCN loyalty ledger.
//!
//! This crate wires the storage engine into an Axum HTTP surface: customer
//! and shop registration, earning endpoints, redemption verification, the
//! redemption session flow, and promo codes. A background task sweeps
//! expired sessions, and an optional minter client forwards committed
//! credits to the settlement layer.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod minter;
pub mod routes;
pub mod state;
pub mod sweeper;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
