//! HTTP request handlers.

pub mod customers;
pub mod earnings;
pub mod health;
pub mod promos;
pub mod redemption;
pub mod referrals;
pub mod sessions;
pub mod shops;
