use thiserror::Error;

use crate::db_types::{Cents, StockItem};

/// Behaviour for tracking the available quantity of each product.
///
/// Implementations **must** perform [`reserve`](StockRepository::reserve) as a single atomic check-and-decrement. A
/// read of the current level followed by a separate write will oversell when two orders race for the last units.
#[allow(async_fn_in_trait)]
pub trait StockRepository {
    /// Fetches every stock item, ordered by name.
    async fn fetch_stock(&self) -> Result<Vec<StockItem>, StockError>;

    /// Fetches the stock items with the given ids. Ids that do not exist are simply absent from the result.
    async fn fetch_stock_by_ids(&self, ids: &[i64]) -> Result<Vec<StockItem>, StockError>;

    /// Atomically removes `quantity` units of `product` from the available stock.
    ///
    /// Fails with [`StockError::InsufficientStock`] and leaves the stock untouched if fewer than `quantity` units are
    /// available.
    async fn reserve(&self, product: &str, quantity: i64) -> Result<StockItem, StockError>;

    /// Returns `quantity` units of `product` to the available stock.
    async fn release(&self, product: &str, quantity: i64) -> Result<StockItem, StockError>;

    /// Sets the unit price of `product`, creating the product with zero stock if it does not exist yet.
    async fn set_unit_price(&self, product: &str, unit_price: Cents) -> Result<StockItem, StockError>;
}

#[derive(Debug, Clone, Error)]
pub enum StockError {
    #[error("Stock database error: {0}")]
    DatabaseError(String),
    #[error("Insufficient stock of {product} to reserve {requested} units")]
    InsufficientStock { product: String, requested: i64 },
    #[error("Product {0} is not in the stock table")]
    ProductNotFound(String),
    #[error("Invalid stock quantity: {0}")]
    InvalidQuantity(i64),
}

impl From<sqlx::Error> for StockError {
    fn from(e: sqlx::Error) -> Self {
        StockError::DatabaseError(e.to_string())
    }
}
