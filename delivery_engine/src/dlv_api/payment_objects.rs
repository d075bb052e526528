use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Order, PaymentMethod, Transaction, TransactionType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub order_id: i64,
    pub amount: Cents,
    pub method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

impl PaymentRequest {
    pub fn new(order_id: i64, amount: Cents, method: PaymentMethod) -> Self {
        Self { order_id, amount, method, notes: None }
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: S) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The result of a write to the ledger: the ledger entry and the order as it stands afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub order: Order,
    pub transaction: Transaction,
}

/// An order and its full transaction history, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLedger {
    pub order: Order,
    pub transactions: Vec<Transaction>,
}

impl OrderLedger {
    pub fn total_paid(&self) -> Cents {
        self.transactions.iter().filter(|t| t.tx_type == TransactionType::Payment).map(|t| t.amount).sum()
    }

    /// True if every entry starts where the previous one ended, and the order balance matches the last entry.
    pub fn is_consistent(&self) -> bool {
        let chained = self.transactions.windows(2).all(|w| w[0].new_value == w[1].old_value);
        let last_matches = self.transactions.last().map(|t| t.new_value == self.order.total).unwrap_or(true);
        chained && last_matches
    }
}
