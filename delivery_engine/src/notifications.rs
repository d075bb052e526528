//! The outbound notification boundary.
//!
//! The engine never delivers notifications itself. It describes them, and a [`NotificationGateway`] implementation
//! hands them to whatever push or messaging service is in use. Delivery is best effort: a failure is reported to the
//! caller, but never affects the order or payment that triggered it.
use std::{future::Future, pin::Pin};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    db::traits::FullOrder,
    db_types::{Order, OrderStatusType, Transaction},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every device registered to the user
    User(i64),
    /// Specific device tokens
    Tokens(Vec<String>),
    /// Every administrator
    Admins,
}

impl Recipient {
    /// True for a token set with no tokens in it. Users and administrators are resolved by the gateway.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Tokens(tokens) if tokens.iter().all(|t| t.trim().is_empty()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub recipient: Recipient,
    pub title: String,
    pub body: String,
    /// Extra payload for the receiving app
    pub data: Value,
}

impl Notification {
    pub fn new<T: Into<String>, S: Into<String>>(recipient: Recipient, title: T, body: S) -> Self {
        Self { recipient, title: title.into(), body: body.into(), data: Value::Null }
    }

    /// Sends the same message to a different recipient, e.g. to the device tokens of a single session.
    pub fn with_recipient(mut self, recipient: Recipient) -> Self {
        self.recipient = recipient;
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Tells the administrators that a new order needs to be delivered.
    pub fn order_created(order: &FullOrder) -> Self {
        let products = order.items.iter().map(|i| format!("{} x {}", i.quantity, i.product)).collect::<Vec<_>>();
        let o = &order.order;
        let body = format!("Pedido #{}: {} para {}. Total {}", o.id, products.join(", "), o.address, o.total);
        Self::new(Recipient::Admins, "Novo pedido", body).with_data(json!({ "order_id": o.id }))
    }

    /// Tells the customer about a change to their order's status.
    pub fn status_changed(order: &Order) -> Self {
        let body = match order.status {
            OrderStatusType::Started => "Seu pedido foi recebido",
            OrderStatusType::Pending => "Seu pedido está a caminho",
            OrderStatusType::Concluded => "Seu pedido foi entregue",
            OrderStatusType::Cancelled => "Seu pedido foi cancelado",
        };
        Self::new(Recipient::User(order.user_id), format!("Pedido #{}", order.id), body)
            .with_data(json!({ "order_id": order.id, "status": order.status.to_string() }))
    }

    /// Confirms a payment to the customer.
    pub fn payment_received(order: &Order, transaction: &Transaction) -> Self {
        let body = if order.is_paid() {
            format!("Recebemos seu pagamento de {}. Pedido quitado!", transaction.amount)
        } else {
            format!("Recebemos seu pagamento de {}. Saldo restante: {}", transaction.amount, order.total)
        };
        Self::new(Recipient::User(order.user_id), format!("Pagamento do pedido #{}", order.id), body)
            .with_data(json!({ "order_id": order.id, "transaction_id": transaction.id }))
    }

    /// Warns the customer that interest was added to an unpaid order.
    pub fn interest_accrued(order: &Order, transaction: &Transaction) -> Self {
        Self::new(
            Recipient::User(order.user_id),
            format!("Pedido #{} em atraso", order.id),
            format!("Foram adicionados {} de juros. Saldo atual: {}", transaction.amount, order.total),
        )
        .with_data(json!({ "order_id": order.id, "transaction_id": transaction.id }))
    }
}

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("The notification could not be delivered: {0}")]
    DeliveryFailed(String),
    #[error("The recipient has no registered devices")]
    NoRecipients,
}

pub type NotifyFuture = Pin<Box<dyn Future<Output = Result<(), NotificationError>> + Send>>;

/// Hands notifications to an external delivery service.
///
/// The returned future must not borrow from the gateway, so that it can be driven from an event handler task.
pub trait NotificationGateway: Send + Sync {
    fn notify(&self, notification: Notification) -> NotifyFuture;
}
