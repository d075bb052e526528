use std::{future::Future, time::Duration};

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db::traits::{StockError, StockRepository},
    db_types::{Cents, StockItem},
    dlv_api::errors::OrderFlowError,
};

const DEFAULT_RELEASE_ATTEMPTS: u32 = 3;
const DEFAULT_RELEASE_BACKOFF: Duration = Duration::from_millis(50);

/// A quantity of a single product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLine {
    pub product: String,
    pub quantity: i64,
}

impl StockLine {
    pub fn new<S: Into<String>>(product: S, quantity: i64) -> Self {
        Self { product: product.into(), quantity }
    }
}

/// Reserves and releases stock on behalf of orders.
///
/// Every reservation is delegated to [`StockRepository::reserve`], which is a single conditional decrement, so two
/// orders racing for the last units can never both succeed.
pub struct StockLedger<B> {
    db: B,
    release_attempts: u32,
    release_backoff: Duration,
}

impl<B> StockLedger<B> {
    pub fn new(db: B) -> Self {
        Self { db, release_attempts: DEFAULT_RELEASE_ATTEMPTS, release_backoff: DEFAULT_RELEASE_BACKOFF }
    }

    pub fn with_release_policy(mut self, attempts: u32, backoff: Duration) -> Self {
        self.release_attempts = attempts.max(1);
        self.release_backoff = backoff;
        self
    }
}

impl<B> StockLedger<B>
where B: StockRepository
{
    pub async fn reserve(&self, product: &str, quantity: i64) -> Result<StockItem, OrderFlowError> {
        let item = self.db.reserve(product, quantity).await?;
        Ok(item)
    }

    pub async fn release(&self, product: &str, quantity: i64) -> Result<StockItem, OrderFlowError> {
        let item = self.db.release(product, quantity).await?;
        Ok(item)
    }

    /// Reserves every line in turn. If any reservation fails, the ones already made are released again before the
    /// error is returned, so the stock is left as it was.
    ///
    /// If that release cannot be completed, the reservation error is replaced by
    /// [`OrderFlowError::ConcurrencyConflict`], since some units are still held.
    pub async fn reserve_all(&self, lines: &[StockLine]) -> Result<Vec<StockItem>, OrderFlowError> {
        let mut reserved = Vec::with_capacity(lines.len());
        for (i, line) in lines.iter().enumerate() {
            match self.db.reserve(&line.product, line.quantity).await {
                Ok(item) => reserved.push(item),
                Err(e) => {
                    debug!("📦️ Could not reserve {} x {}: {e}. Rolling back {i} reservations", line.quantity, line.product);
                    return Err(self.compensate(&lines[..i], e.into()).await);
                },
            }
        }
        Ok(reserved)
    }

    /// Releases `lines` after `cause` aborted the operation that reserved them, and returns the error the caller should
    /// see: `cause` itself, or a [`OrderFlowError::ConcurrencyConflict`] if the stock could not be returned.
    pub async fn compensate(&self, lines: &[StockLine], cause: OrderFlowError) -> OrderFlowError {
        match self.release_all(lines).await {
            Ok(()) => cause,
            Err(release_err) => {
                error!("📦️ Stock compensation failed after '{cause}'. {release_err}");
                OrderFlowError::compensation_failed(release_err, &cause)
            },
        }
    }

    /// Returns every line to the stock. Transient failures are retried a few times with a short pause. A line that
    /// still cannot be released is reported as a [`OrderFlowError::ConcurrencyConflict`] once every other line has
    /// been attempted.
    pub async fn release_all(&self, lines: &[StockLine]) -> Result<(), OrderFlowError> {
        let mut failed = Vec::new();
        for line in lines {
            if let Err(e) = self.release_with_retry(line).await {
                error!("📦️ Giving up on releasing {} x {}. {e}", line.quantity, line.product);
                failed.push(line.product.clone());
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(OrderFlowError::ConcurrencyConflict(format!("could not release stock of {}", failed.join(", "))))
        }
    }

    /// Returns `lines` to the stock and then runs `commit`. The stock only stays released if `commit` succeeds: when a
    /// line cannot be released, or `commit` fails, every unit already returned is reserved again before the error is
    /// returned. If that reservation fails too, the error becomes a [`OrderFlowError::ConcurrencyConflict`].
    pub async fn release_and_commit<T, F, Fut>(&self, lines: &[StockLine], commit: F) -> Result<T, OrderFlowError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, OrderFlowError>>,
    {
        let mut released = Vec::with_capacity(lines.len());
        let mut failed = Vec::new();
        for line in lines {
            match self.release_with_retry(line).await {
                Ok(_) => released.push(line.clone()),
                Err(e) => {
                    error!("📦️ Giving up on releasing {} x {}. {e}", line.quantity, line.product);
                    failed.push(line.product.clone());
                },
            }
        }
        let result = if failed.is_empty() {
            commit().await
        } else {
            Err(OrderFlowError::ConcurrencyConflict(format!("could not release stock of {}", failed.join(", "))))
        };
        match result {
            Ok(value) => Ok(value),
            Err(cause) => {
                debug!("📦️ '{cause}'. Taking back {} released lines", released.len());
                match self.reserve_all(&released).await {
                    Ok(_) => Err(cause),
                    Err(reserve_err) => {
                        error!("📦️ Could not take back released stock after '{cause}'. {reserve_err}");
                        Err(OrderFlowError::compensation_failed(reserve_err, &cause))
                    },
                }
            },
        }
    }

    async fn release_with_retry(&self, line: &StockLine) -> Result<StockItem, StockError> {
        let mut attempt = 1;
        loop {
            match self.db.release(&line.product, line.quantity).await {
                Ok(item) => return Ok(item),
                Err(StockError::DatabaseError(e)) if attempt < self.release_attempts => {
                    warn!(
                        "📦️ Release of {} x {} failed (attempt {attempt}/{}). {e}",
                        line.quantity, line.product, self.release_attempts
                    );
                    tokio::time::sleep(self.release_backoff * attempt).await;
                    attempt += 1;
                },
                Err(e) => return Err(e),
            }
        }
    }

    /// Adds newly delivered units to the stock.
    pub async fn restock(&self, product: &str, quantity: i64) -> Result<StockItem, OrderFlowError> {
        if quantity <= 0 {
            return Err(OrderFlowError::ValidationError(format!("restock quantity must be positive, got {quantity}")));
        }
        let item = self.db.release(product, quantity).await?;
        info!("📦️ Restocked {quantity} x {product}. {} available", item.quantity);
        Ok(item)
    }

    pub async fn set_unit_price(&self, product: &str, unit_price: Cents) -> Result<StockItem, OrderFlowError> {
        if unit_price.is_negative() {
            return Err(OrderFlowError::ValidationError(format!("unit price cannot be negative: {unit_price}")));
        }
        let item = self.db.set_unit_price(product, unit_price).await?;
        info!("📦️ Unit price of {product} is now {unit_price}");
        Ok(item)
    }

    pub async fn stock_levels(&self) -> Result<Vec<StockItem>, OrderFlowError> {
        let items = self.db.fetch_stock().await?;
        Ok(items)
    }
}
