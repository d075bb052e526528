//! The payment ledger.
//!
//! Every change to an order's outstanding balance goes through here. Each change appends a [`Transaction`] recording
//! the balance before and after, and moves the order's `total` and payment state to match, as a single atomic write.
//! The write is guarded by the order's version, so a payment that raced with another write to the same order fails
//! with [`OrderFlowError::ConcurrencyConflict`] instead of being applied against a stale balance.
use std::fmt::Debug;

use log::*;

use crate::{
    db::traits::DeliveryDatabase,
    db_types::{BalanceUpdate, Cents, NewTransaction, Order, PaymentState, Transaction},
    dlv_api::{
        errors::OrderFlowError,
        payment_objects::{LedgerEntry, OrderLedger, PaymentRequest},
    },
    events::{EventProducers, OrderModifiedEvent, PaymentReceivedEvent},
};

pub struct PaymentLedgerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentLedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentLedgerApi")
    }
}

impl<B> PaymentLedgerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> PaymentLedgerApi<B>
where B: DeliveryDatabase
{
    /// Records a payment against an order.
    ///
    /// ## Failure modes
    /// * The amount is zero or negative: [`OrderFlowError::ValidationError`]. The database is not touched.
    /// * The order does not exist: [`OrderFlowError::OrderNotFound`].
    /// * The order is already paid: [`OrderFlowError::OrderAlreadyPaid`].
    /// * The amount is more than the outstanding balance: [`OrderFlowError::PaymentExceedsBalance`].
    /// * Another write to the order got there first: [`OrderFlowError::ConcurrencyConflict`]. Nothing was written, and
    ///   the whole call can be retried.
    ///
    /// On success the order is `Paid` if the balance reached zero, and `PartiallyPaid` otherwise.
    pub async fn pay(&self, request: PaymentRequest) -> Result<LedgerEntry, OrderFlowError> {
        let PaymentRequest { order_id, amount, method, notes } = request;
        if !amount.is_positive() {
            return Err(OrderFlowError::ValidationError(format!("payment amount must be positive, got {amount}")));
        }
        let order = self.fetch_order(order_id).await?;
        if order.is_paid() {
            return Err(OrderFlowError::OrderAlreadyPaid(order_id));
        }
        if amount > order.total {
            return Err(OrderFlowError::PaymentExceedsBalance { order_id, amount, balance: order.total });
        }
        let transaction = NewTransaction::payment(order.total, amount, method).with_notes(notes);
        let new_payment_state = PaymentState::after_payment(transaction.new_value);
        let update = BalanceUpdate { order_id, expected_version: order.version, transaction, new_payment_state };
        let (order, transaction) = self.db.update_balance(update).await?;
        info!("💰️ {amount} paid by {method} on order #{order_id}. Balance is {} ({})", order.total, order.payment_state);
        self.producers.publish_payment_received(PaymentReceivedEvent::new(order.clone(), transaction.clone()));
        Ok(LedgerEntry { order, transaction })
    }

    /// Adds `amount` to the balance of an unpaid order. A negative amount is a discount.
    ///
    /// The balance cannot go below zero. If the adjustment brings it to exactly zero, the order is marked as paid.
    pub async fn adjust_balance<S: Into<String>>(
        &self,
        order_id: i64,
        amount: Cents,
        notes: Option<S>,
    ) -> Result<LedgerEntry, OrderFlowError> {
        if amount.is_zero() {
            return Err(OrderFlowError::ValidationError("an adjustment cannot be zero".into()));
        }
        let order = self.fetch_order(order_id).await?;
        if order.is_paid() {
            return Err(OrderFlowError::OrderAlreadyPaid(order_id));
        }
        let transaction = NewTransaction::adjustment(order.total, amount)
            .ok_or_else(|| {
                OrderFlowError::ValidationError(format!("an adjustment of {amount} on order {order_id} is out of range"))
            })?
            .with_notes(notes);
        if transaction.new_value.is_negative() {
            return Err(OrderFlowError::ValidationError(format!(
                "an adjustment of {amount} would leave order {order_id} with a negative balance"
            )));
        }
        let new_payment_state = if transaction.new_value.is_zero() { PaymentState::Paid } else { order.payment_state };
        let update = BalanceUpdate { order_id, expected_version: order.version, transaction, new_payment_state };
        let (updated, transaction) = self.db.update_balance(update).await?;
        info!("💰️ Balance of order #{order_id} adjusted by {amount} to {}", updated.total);
        self.producers.publish_order_modified(OrderModifiedEvent::new(order, updated.clone()));
        Ok(LedgerEntry { order: updated, transaction })
    }

    /// The order together with its full transaction history.
    pub async fn ledger(&self, order_id: i64) -> Result<OrderLedger, OrderFlowError> {
        let order = self.fetch_order(order_id).await?;
        let transactions = self.transactions(order_id).await?;
        Ok(OrderLedger { order, transactions })
    }

    pub async fn transactions(&self, order_id: i64) -> Result<Vec<Transaction>, OrderFlowError> {
        let transactions = self.db.fetch_transactions_for_order(order_id).await?;
        Ok(transactions)
    }

    async fn fetch_order(&self, order_id: i64) -> Result<Order, OrderFlowError> {
        self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))
    }
}
