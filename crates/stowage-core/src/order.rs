//! Order types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::{OrderId, OrderNumber, ProductId, SpaceId, UserId};

/// A confirmed product purchase awaiting collection at the storage space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order id (time-ordered).
    pub id: OrderId,

    /// Human-readable reference derived from the id.
    pub order_number: OrderNumber,

    /// The space the goods are collected from.
    pub storage_id: SpaceId,

    /// The purchased product.
    pub product_id: ProductId,

    /// Units purchased.
    pub quantity: i64,

    /// Total paid, in cents.
    pub total_price_cents: i64,

    /// Collection status.
    pub status: OrderStatus,

    /// The buyer.
    pub buyer_id: UserId,

    /// Checkout session that paid for this order. Unique: at most one
    /// order per provider session.
    pub session_id: String,

    /// When the order was created.
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create an order for a confirmed purchase.
    ///
    /// The total is computed here from the unit price; callers never pass
    /// a precomputed total.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity or unit price is not positive.
    pub fn new(
        storage_id: SpaceId,
        product_id: ProductId,
        quantity: i64,
        unit_price_cents: i64,
        buyer_id: UserId,
        session_id: impl Into<String>,
    ) -> Result<Self> {
        if quantity <= 0 {
            return Err(DomainError::NonPositiveAmount(quantity));
        }
        if unit_price_cents <= 0 {
            return Err(DomainError::NonPositiveAmount(unit_price_cents));
        }

        let id = OrderId::generate();
        Ok(Self {
            id,
            order_number: OrderNumber::for_order(id),
            storage_id,
            product_id,
            quantity,
            total_price_cents: unit_price_cents * quantity,
            status: OrderStatus::ToCollect,
            buyer_id,
            session_id: session_id.into(),
            created_at: Utc::now(),
        })
    }
}

/// Collection status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Waiting for the buyer to collect the goods.
    ToCollect,

    /// Goods handed over.
    Collected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_total_is_unit_price_times_quantity() {
        let order = Order::new(
            SpaceId::generate(),
            ProductId::generate(),
            4,
            2500,
            UserId::generate(),
            "cs_test_123",
        )
        .unwrap();

        assert_eq!(order.total_price_cents, 10_000);
        assert_eq!(order.status, OrderStatus::ToCollect);
        assert_eq!(order.order_number, OrderNumber::for_order(order.id));
    }

    #[test]
    fn zero_quantity_rejected() {
        let err = Order::new(
            SpaceId::generate(),
            ProductId::generate(),
            0,
            2500,
            UserId::generate(),
            "cs_test_123",
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::NonPositiveAmount(0)));
    }
}
