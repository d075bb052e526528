use crate::db::traits::{AddonRepository, OrderRepository, StockRepository, TransactionRepository, UserRepository};

/// This trait defines the highest level of behaviour for backends supporting the delivery engine.
#[allow(async_fn_in_trait)]
pub trait DeliveryDatabase:
    Clone + StockRepository + AddonRepository + UserRepository + OrderRepository + TransactionRepository
{
    /// The URL of the database
    fn url(&self) -> &str;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), crate::db::traits::RepositoryError> {
        Ok(())
    }
}
