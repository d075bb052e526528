use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::db_types::{Cents, Order, OrderAddon, OrderItem, Transaction};

/// An order together with its line items, addons and ledger history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub addons: Vec<OrderAddon>,
    pub transactions: Vec<Transaction>,
}

impl FullOrder {
    pub fn items_total(&self) -> Cents {
        self.items.iter().map(|i| i.total_value).sum()
    }

    pub fn addons_total(&self) -> Cents {
        self.addons.iter().map(|a| a.total_value).sum()
    }

    pub fn has_gas(&self) -> bool {
        self.items.iter().any(|i| i.product == crate::db_types::GAS)
    }

    /// The balance the order should have according to its ledger: the `new_value` of the latest transaction, or the
    /// priced total if no transaction has been recorded.
    pub fn ledger_balance(&self) -> Cents {
        self.transactions.last().map(|t| t.new_value).unwrap_or_else(|| self.items_total() + self.addons_total())
    }
}

/// An order that is eligible for interest, along with the interest the accrual job has already added to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualCandidate {
    pub order: Order,
    pub accrued_interest: Cents,
}

#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("We have an internal database engine (configuration/uptime etc.) error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("Order {0} was modified by another process. Reload it and try again.")]
    StaleOrder(i64),
    #[error("The update would leave order {0} with a negative balance")]
    NegativeBalance(i64),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::DatabaseError(e.to_string())
    }
}
