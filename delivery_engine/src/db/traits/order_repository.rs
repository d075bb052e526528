use chrono::{DateTime, Utc};

use crate::{
    db::traits::{AccrualCandidate, FullOrder, RepositoryError},
    db_types::{BalanceUpdate, NewOrder, Order, OrderStatusType, Transaction},
};

/// Persistence contract for orders and their balance.
#[allow(async_fn_in_trait)]
pub trait OrderRepository {
    /// Stores the order, its line items, its addons and (if present) the carried-debt ledger entry in a single atomic
    /// transaction. Either everything is written, or nothing is.
    async fn insert_order(&self, order: NewOrder) -> Result<FullOrder, RepositoryError>;

    async fn fetch_order(&self, order_id: i64) -> Result<Option<Order>, RepositoryError>;

    /// Fetches the order together with its items, addons and ledger history.
    async fn fetch_full_order(&self, order_id: i64) -> Result<Option<FullOrder>, RepositoryError>;

    /// Appends the ledger entry in `update` and moves the order's balance and payment state to match, as one atomic
    /// unit.
    ///
    /// The write only happens if the order's version still equals `update.expected_version`. Otherwise
    /// [`RepositoryError::StaleOrder`] is returned and nothing changes.
    async fn update_balance(&self, update: BalanceUpdate) -> Result<(Order, Transaction), RepositoryError>;

    /// Sets the order status, provided the order is still at `expected_version`.
    async fn update_order_status(
        &self,
        order_id: i64,
        expected_version: i64,
        status: OrderStatusType,
    ) -> Result<Order, RepositoryError>;

    /// Orders created in `[since, until]`, oldest first.
    async fn fetch_orders_by_date_range(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Order>, RepositoryError>;

    /// All orders placed by the user, oldest first.
    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, RepositoryError>;

    /// Orders that would be moved to `Overdue` by [`mark_overdue_orders`](Self::mark_overdue_orders) for the same
    /// cutoff.
    async fn fetch_overdue_candidates(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, RepositoryError>;

    /// In one bulk statement, moves every `Pending` order created before `created_before` to `Overdue`.
    ///
    /// Returns the number of orders affected.
    async fn mark_overdue_orders(&self, created_before: DateTime<Utc>) -> Result<u64, RepositoryError>;

    /// Fetches up to `limit` orders with an id greater than `after_id` that can accrue interest: the order contains a
    /// gas item, interest is allowed, it is not cancelled or paid, and it still has a balance. Results are ordered by
    /// id so that callers can page through the table.
    async fn fetch_accrual_candidates(
        &self,
        after_id: i64,
        limit: i64,
    ) -> Result<Vec<AccrualCandidate>, RepositoryError>;
}
