use serde::{Deserialize, Serialize};

use crate::{
    db::traits::FullOrder,
    db_types::{Cents, Order, Transaction},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCreatedEvent {
    pub order: FullOrder,
}

impl OrderCreatedEvent {
    pub fn new(order: FullOrder) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModifiedEvent {
    pub old_order: Order,
    pub new_order: Order,
}

impl OrderModifiedEvent {
    pub fn new(old_order: Order, new_order: Order) -> Self {
        Self { old_order, new_order }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReceivedEvent {
    pub order: Order,
    pub transaction: Transaction,
}

impl PaymentReceivedEvent {
    pub fn new(order: Order, transaction: Transaction) -> Self {
        Self { order, transaction }
    }

    pub fn amount(&self) -> Cents {
        self.transaction.amount
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterestAccruedEvent {
    pub order: Order,
    pub transaction: Transaction,
}

impl InterestAccruedEvent {
    pub fn new(order: Order, transaction: Transaction) -> Self {
        Self { order, transaction }
    }
}
