use crate::{db::traits::RepositoryError, db_types::Transaction};

/// Read access to the order ledger. Ledger entries are only ever written together with the order balance they
/// produce, via [`OrderRepository::update_balance`](crate::OrderRepository::update_balance).
#[allow(async_fn_in_trait)]
pub trait TransactionRepository {
    /// All transactions for the order, oldest first.
    async fn fetch_transactions_for_order(&self, order_id: i64) -> Result<Vec<Transaction>, RepositoryError>;
}
