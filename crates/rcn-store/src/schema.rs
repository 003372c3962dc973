//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Customer records, keyed by wallet address (42 bytes).
    pub const CUSTOMERS: &str = "customers";

    /// Shop records, keyed by `shop_id` (UUID, 16 bytes).
    pub const SHOPS: &str = "shops";

    /// Provenance entries, keyed by `transaction_id` (ULID, 16 bytes).
    /// The key doubles as the credit idempotency check.
    pub const SOURCES: &str = "sources";

    /// Index: sources by customer, keyed by `address || transaction_id`.
    /// Value is empty (index only); ULID ordering gives commit order.
    pub const SOURCES_BY_CUSTOMER: &str = "sources_by_customer";

    /// Redemption sessions, keyed by `session_id` (UUID, 16 bytes).
    pub const SESSIONS: &str = "sessions";

    /// Index: latest session per (customer, shop) pair, keyed by
    /// `address || shop_id`, value `session_id`. Backs the one-pending-
    /// session-per-pair rule.
    pub const SESSIONS_BY_PAIR: &str = "sessions_by_pair";

    /// Promo codes, keyed by `promo_id` (UUID, 16 bytes).
    pub const PROMOS: &str = "promos";

    /// Index: promo id by `shop_id || code`, enforcing per-shop uniqueness.
    pub const PROMOS_BY_SHOP_CODE: &str = "promos_by_shop_code";

    /// Promo use rows, keyed by `promo_id || address || ulid`.
    pub const PROMO_USES: &str = "promo_uses";

    /// Audit-trail transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by customer, keyed by `address || transaction_id`.
    pub const TRANSACTIONS_BY_CUSTOMER: &str = "transactions_by_customer";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::CUSTOMERS,
        cf::SHOPS,
        cf::SOURCES,
        cf::SOURCES_BY_CUSTOMER,
        cf::SESSIONS,
        cf::SESSIONS_BY_PAIR,
        cf::PROMOS,
        cf::PROMOS_BY_SHOP_CODE,
        cf::PROMO_USES,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_CUSTOMER,
    ]
}
