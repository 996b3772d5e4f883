//! Product types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, Result};
use crate::{ProductId, RentalId};

/// A product listed for sale by a supplier out of rented storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product id.
    pub id: ProductId,

    /// The rental whose surface stocks this product.
    pub rental_id: RentalId,

    /// Product name, unique across all products.
    pub name: String,

    /// Brand label.
    pub brand: String,

    /// Free-text description.
    pub description: String,

    /// Unit price in cents.
    pub price_cents: i64,

    /// Units currently in stock. Never negative.
    pub stock_quantity: i64,

    /// When the product was created.
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product listing.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is not positive or the initial stock
    /// is negative.
    pub fn new(
        rental_id: RentalId,
        name: impl Into<String>,
        brand: impl Into<String>,
        description: impl Into<String>,
        price_cents: i64,
        stock_quantity: i64,
    ) -> Result<Self> {
        if price_cents <= 0 {
            return Err(DomainError::NonPositiveAmount(price_cents));
        }
        if stock_quantity < 0 {
            return Err(DomainError::NonPositiveAmount(stock_quantity));
        }

        let now = Utc::now();
        Ok(Self {
            id: ProductId::generate(),
            rental_id,
            name: name.into(),
            brand: brand.into(),
            description: description.into(),
            price_cents,
            stock_quantity,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check whether `quantity` units are in stock.
    #[must_use]
    pub fn has_stock(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }

    /// Deduct `quantity` units from stock.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientStock` if fewer than `quantity` units remain,
    /// or `NonPositiveAmount` for a zero/negative quantity. On error the
    /// product is left untouched.
    pub fn deduct_stock(&mut self, quantity: i64) -> Result<()> {
        if quantity <= 0 {
            return Err(DomainError::NonPositiveAmount(quantity));
        }
        if self.stock_quantity < quantity {
            return Err(DomainError::InsufficientStock {
                stock: self.stock_quantity,
                requested: quantity,
            });
        }

        self.stock_quantity -= quantity;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64) -> Product {
        Product::new(
            RentalId::generate(),
            "Parquet chêne",
            "BoisPro",
            "Lames de parquet massif",
            2500,
            stock,
        )
        .unwrap()
    }

    #[test]
    fn deduct_stock_decrements() {
        let mut p = product(10);
        p.deduct_stock(3).unwrap();
        assert_eq!(p.stock_quantity, 7);
    }

    #[test]
    fn deduct_stock_never_goes_negative() {
        let mut p = product(2);
        let err = p.deduct_stock(3).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                stock: 2,
                requested: 3
            }
        ));
        assert_eq!(p.stock_quantity, 2);
    }

    #[test]
    fn zero_quantity_rejected() {
        let mut p = product(5);
        assert!(p.deduct_stock(0).is_err());
    }
}
