//! Key encoding utilities for `RocksDB`.
//!
//! Primary records are keyed by raw id bytes (16 bytes for UUIDs and
//! ULIDs, UTF-8 for provider ids). Index entries are keyed by
//! `owner_id (16) || entity_id (16)`; since ULIDs are time-ordered, a
//! prefix scan over an owner yields entities in chronological order.

use stowage_core::{OrderId, ProductId, RentalId, SpaceId, UserId};

/// Primary key for a profile.
#[must_use]
pub fn profile_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Primary key for a space.
#[must_use]
pub fn space_key(space_id: &SpaceId) -> Vec<u8> {
    space_id.as_bytes().to_vec()
}

/// Primary key for a rental.
#[must_use]
pub fn rental_key(rental_id: RentalId) -> Vec<u8> {
    rental_id.to_bytes().to_vec()
}

/// Primary key for a product.
#[must_use]
pub fn product_key(product_id: &ProductId) -> Vec<u8> {
    product_id.as_bytes().to_vec()
}

/// Primary key for an order.
#[must_use]
pub fn order_key(order_id: OrderId) -> Vec<u8> {
    order_id.to_bytes().to_vec()
}

/// Composite index key: `owner (16) || entity (16)`.
#[must_use]
pub fn owned_key(owner: &[u8; 16], entity: &[u8; 16]) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(owner);
    key.extend_from_slice(entity);
    key
}

/// Prefix for scanning all entities of one owner.
#[must_use]
pub fn owner_prefix(owner: &[u8; 16]) -> Vec<u8> {
    owner.to_vec()
}

/// Extract the entity id half of a composite index key.
///
/// # Panics
///
/// Panics if the key is shorter than 32 bytes.
#[must_use]
pub fn extract_entity_bytes(key: &[u8]) -> [u8; 16] {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..32]);
    bytes
}

/// Key for string-identified records (transactions, payouts, events,
/// session/name/account indexes).
#[must_use]
pub fn str_key(id: &str) -> Vec<u8> {
    id.as_bytes().to_vec()
}
