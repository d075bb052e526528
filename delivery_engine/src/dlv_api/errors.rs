use thiserror::Error;

use crate::{
    db::traits::{RepositoryError, StockError},
    db_types::{Cents, OrderStatusType, GAS, WATER},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderFlowError {
    #[error("Invalid request: {0}")]
    ValidationError(String),
    #[error("The requested user {0} does not exist")]
    UserNotFound(i64),
    #[error("User {0} does not have a delivery address on file")]
    UserHasNoAddress(i64),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(i64),
    #[error("These stock items do not exist: {0:?}")]
    StockItemsNotFound(Vec<i64>),
    #[error("These addons do not exist: {0:?}")]
    AddonNotFound(Vec<i64>),
    #[error("Insufficient stock of {}", .0.join(", "))]
    InsufficientStock(Vec<String>),
    #[error("Order {0} has already been paid")]
    OrderAlreadyPaid(i64),
    #[error("A payment of {amount} exceeds the outstanding balance of {balance} on order {order_id}")]
    PaymentExceedsBalance { order_id: i64, amount: Cents, balance: Cents },
    #[error("Concurrent modification: {0}. Reload and try again.")]
    ConcurrencyConflict(String),
    #[error("The requested order change would result in a no-op.")]
    OrderModificationNoOp,
    #[error("Cannot change the status of an order from {from} to {to}")]
    StatusChangeForbidden { from: OrderStatusType, to: OrderStatusType },
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl OrderFlowError {
    /// True if the error was caused by the request itself, rather than by infrastructure or contention.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::DatabaseError(_) | Self::ConcurrencyConflict(_))
    }

    /// The error returned when stock held for a failed request could not be given back. The units are still reserved,
    /// so this takes precedence over `cause`, which is kept in the message.
    pub fn compensation_failed(release_err: OrderFlowError, cause: &OrderFlowError) -> Self {
        let detail = match release_err {
            Self::ConcurrencyConflict(s) => s,
            other => other.to_string(),
        };
        Self::ConcurrencyConflict(format!("{detail} after the request failed ({cause})"))
    }

    /// A message suitable for showing to the customer.
    pub fn user_message(&self) -> String {
        match self {
            Self::InsufficientStock(products) => {
                let names = products.iter().map(|p| product_label(p)).collect::<Vec<_>>().join(" e ");
                format!("estoque insuficiente de {names}")
            },
            Self::UserHasNoAddress(_) => "cadastre um endereço antes de fazer um pedido".to_string(),
            Self::OrderAlreadyPaid(_) => "este pedido já foi pago".to_string(),
            Self::PaymentExceedsBalance { balance, .. } => format!("o pagamento excede o saldo devedor de {balance}"),
            Self::DatabaseError(_) => "erro interno, tente novamente mais tarde".to_string(),
            other => other.to_string(),
        }
    }
}

fn product_label(product: &str) -> &str {
    match product {
        GAS => "gás",
        WATER => "água",
        other => other,
    }
}

impl From<RepositoryError> for OrderFlowError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::DatabaseError(s) => Self::DatabaseError(s),
            RepositoryError::OrderNotFound(id) => Self::OrderNotFound(id),
            RepositoryError::UserNotFound(id) => Self::UserNotFound(id),
            RepositoryError::StaleOrder(id) => Self::ConcurrencyConflict(format!("order {id} changed underneath us")),
            RepositoryError::NegativeBalance(id) => {
                Self::ValidationError(format!("the update would leave order {id} with a negative balance"))
            },
        }
    }
}

impl From<StockError> for OrderFlowError {
    fn from(e: StockError) -> Self {
        match e {
            StockError::DatabaseError(s) => Self::DatabaseError(s),
            StockError::InsufficientStock { product, .. } => Self::InsufficientStock(vec![product]),
            StockError::ProductNotFound(name) => Self::ValidationError(format!("unknown product {name}")),
            StockError::InvalidQuantity(q) => Self::ValidationError(format!("invalid quantity {q}")),
        }
    }
}
