//! Key encoding utilities for `RocksDB`.
//!
//! Addresses encode to a fixed 42 bytes (canonical `0x` + 40 hex), UUIDs
//! and ULIDs to 16, so every composite key has a fixed layout and prefix
//! scans never collide across customers.

use rcn_core::{Address, PromoId, SessionId, ShopId, TransactionId};

/// Create a customer key from a wallet address.
#[must_use]
pub fn customer_key(address: &Address) -> Vec<u8> {
    address.as_bytes().to_vec()
}

/// Create a shop key from a shop ID.
#[must_use]
pub fn shop_key(shop_id: &ShopId) -> Vec<u8> {
    shop_id.as_bytes().to_vec()
}

/// Create a source entry key from its transaction ID.
#[must_use]
pub fn source_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a customer-source index key.
///
/// Format: `address (42 bytes) || transaction_id (16 bytes)`. ULIDs are
/// time-ordered, so a prefix scan yields the customer's entries in commit
/// order — which the home-shop tie-break relies on.
#[must_use]
pub fn customer_source_key(address: &Address, transaction_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(58);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&transaction_id.to_bytes());
    key
}

/// Create a prefix for iterating all source entries of a customer.
#[must_use]
pub fn customer_prefix(address: &Address) -> Vec<u8> {
    address.as_bytes().to_vec()
}

/// Extract the transaction ID from a customer-scoped index key.
///
/// # Panics
///
/// Panics if the key is not at least 58 bytes.
#[must_use]
pub fn extract_transaction_id(key: &[u8]) -> TransactionId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[42..58]);
    TransactionId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Create a session key from a session ID.
#[must_use]
pub fn session_key(session_id: &SessionId) -> Vec<u8> {
    session_id.as_bytes().to_vec()
}

/// Create the (customer, shop) pair key for the pending-session index.
///
/// Format: `address (42 bytes) || shop_id (16 bytes)`.
#[must_use]
pub fn session_pair_key(address: &Address, shop_id: &ShopId) -> Vec<u8> {
    let mut key = Vec::with_capacity(58);
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(shop_id.as_bytes());
    key
}

/// Create a promo key from a promo ID.
#[must_use]
pub fn promo_key(promo_id: &PromoId) -> Vec<u8> {
    promo_id.as_bytes().to_vec()
}

/// Create the per-shop code uniqueness key.
///
/// Format: `shop_id (16 bytes) || code (uppercased UTF-8)`.
#[must_use]
pub fn promo_code_key(shop_id: &ShopId, code: &str) -> Vec<u8> {
    let code = code.trim().to_ascii_uppercase();
    let mut key = Vec::with_capacity(16 + code.len());
    key.extend_from_slice(shop_id.as_bytes());
    key.extend_from_slice(code.as_bytes());
    key
}

/// Create a promo use row key.
///
/// Format: `promo_id (16) || address (42) || use ulid (16)`.
#[must_use]
pub fn promo_use_key(promo_id: &PromoId, address: &Address, use_id: &TransactionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(74);
    key.extend_from_slice(promo_id.as_bytes());
    key.extend_from_slice(address.as_bytes());
    key.extend_from_slice(&use_id.to_bytes());
    key
}

/// Prefix for counting one customer's uses of a promo code.
#[must_use]
pub fn promo_customer_prefix(promo_id: &PromoId, address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(58);
    key.extend_from_slice(promo_id.as_bytes());
    key.extend_from_slice(address.as_bytes());
    key
}

/// Prefix for iterating every use of a promo code.
#[must_use]
pub fn promo_prefix(promo_id: &PromoId) -> Vec<u8> {
    promo_id.as_bytes().to_vec()
}

/// Create a transaction key from a transaction ID.
#[must_use]
pub fn transaction_key(transaction_id: &TransactionId) -> Vec<u8> {
    transaction_id.to_bytes().to_vec()
}

/// Create a customer-transaction index key.
///
/// Format: `address (42 bytes) || transaction_id (16 bytes)`.
#[must_use]
pub fn customer_transaction_key(address: &Address, transaction_id: &TransactionId) -> Vec<u8> {
    customer_source_key(address, transaction_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::new("0xaabbccddeeff00112233445566778899aabbccdd").unwrap()
    }

    #[test]
    fn customer_key_is_fixed_width() {
        assert_eq!(customer_key(&addr()).len(), 42);
    }

    #[test]
    fn customer_source_key_layout() {
        let tx_id = TransactionId::generate();
        let key = customer_source_key(&addr(), &tx_id);
        assert_eq!(key.len(), 58);
        assert_eq!(&key[..42], addr().as_bytes());
        assert_eq!(&key[42..], tx_id.to_bytes());
    }

    #[test]
    fn extract_transaction_id_roundtrip() {
        let tx_id = TransactionId::generate();
        let key = customer_source_key(&addr(), &tx_id);
        assert_eq!(extract_transaction_id(&key), tx_id);
    }

    #[test]
    fn session_pair_key_layout() {
        let shop = ShopId::generate();
        let key = session_pair_key(&addr(), &shop);
        assert_eq!(key.len(), 58);
        assert_eq!(&key[42..], shop.as_bytes());
    }

    #[test]
    fn promo_code_key_normalizes_case() {
        let shop = ShopId::generate();
        assert_eq!(
            promo_code_key(&shop, "summer50"),
            promo_code_key(&shop, " SUMMER50 ")
        );
    }

    #[test]
    fn promo_use_key_layout() {
        let promo = PromoId::generate();
        let use_id = TransactionId::generate();
        let key = promo_use_key(&promo, &addr(), &use_id);
        assert_eq!(key.len(), 74);
        assert!(key.starts_with(&promo_customer_prefix(&promo, &addr())));
    }
}
