use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Cents, OrderStatusType, PaymentState},
    dlv_api::errors::OrderFlowError,
};

/// The largest quantity a single order line may ask for.
pub const MAX_ITEM_QUANTITY: i64 = 1_000;
/// The largest debt that can be carried over into a new order.
pub const MAX_CARRIED_DEBT: Cents = Cents::from_units(1_000_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub stock_id: i64,
    pub quantity: i64,
    /// Legacy flag. When set, the `"<product> bottle"` addon is attached to the order, if such an addon exists.
    #[serde(default)]
    pub with_bottle: bool,
}

/// A request to place a new order.
///
/// `status` and `payment_state` are overrides that only the admin path honours. Customers submitting either of them
/// get a validation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub user_id: i64,
    pub items: Vec<OrderItemRequest>,
    #[serde(default)]
    pub addon_ids: Vec<i64>,
    /// The delivery address. The user's primary address is used if this is omitted.
    #[serde(default)]
    pub address_id: Option<i64>,
    #[serde(default)]
    pub status: Option<OrderStatusType>,
    #[serde(default)]
    pub payment_state: Option<PaymentState>,
    /// Debt carried over from a previous order. A positive amount marks the new order as overdue.
    #[serde(default)]
    pub overdue_amount: Option<Cents>,
    #[serde(default)]
    pub overdue_description: Option<String>,
    #[serde(default = "default_interest_allowed")]
    pub interest_allowed: bool,
}

fn default_interest_allowed() -> bool {
    true
}

impl NewOrderRequest {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            items: Vec::new(),
            addon_ids: Vec::new(),
            address_id: None,
            status: None,
            payment_state: None,
            overdue_amount: None,
            overdue_description: None,
            interest_allowed: true,
        }
    }

    pub fn with_item(mut self, stock_id: i64, quantity: i64) -> Self {
        self.items.push(OrderItemRequest { stock_id, quantity, with_bottle: false });
        self
    }

    pub fn with_bottled_item(mut self, stock_id: i64, quantity: i64) -> Self {
        self.items.push(OrderItemRequest { stock_id, quantity, with_bottle: true });
        self
    }

    pub fn with_addon(mut self, addon_id: i64) -> Self {
        self.addon_ids.push(addon_id);
        self
    }

    pub fn with_address(mut self, address_id: i64) -> Self {
        self.address_id = Some(address_id);
        self
    }

    pub fn with_overdue_amount<S: Into<String>>(mut self, amount: Cents, description: S) -> Self {
        self.overdue_amount = Some(amount);
        self.overdue_description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_payment_state(mut self, state: PaymentState) -> Self {
        self.payment_state = Some(state);
        self
    }

    pub fn without_interest(mut self) -> Self {
        self.interest_allowed = false;
        self
    }

    pub fn has_overrides(&self) -> bool {
        self.status.is_some() || self.payment_state.is_some()
    }

    /// Checks the shape of the request. This does not touch the database.
    pub fn validate(&self) -> Result<(), OrderFlowError> {
        if self.items.is_empty() {
            return Err(OrderFlowError::ValidationError("an order needs at least one item".into()));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity <= 0) {
            return Err(OrderFlowError::ValidationError(format!(
                "quantity for stock item {} must be positive, got {}",
                item.stock_id, item.quantity
            )));
        }
        if let Some(item) = self.items.iter().find(|i| i.quantity > MAX_ITEM_QUANTITY) {
            return Err(OrderFlowError::ValidationError(format!(
                "quantity for stock item {} cannot exceed {MAX_ITEM_QUANTITY}, got {}",
                item.stock_id, item.quantity
            )));
        }
        match self.overdue_amount {
            Some(a) if a.is_negative() => {
                Err(OrderFlowError::ValidationError("the overdue amount cannot be negative".into()))
            },
            Some(a) if a > MAX_CARRIED_DEBT => {
                Err(OrderFlowError::ValidationError(format!("the overdue amount cannot exceed {MAX_CARRIED_DEBT}")))
            },
            _ => Ok(()),
        }
    }

    /// The total quantity requested per stock id. A product listed on several lines is summed.
    pub fn quantities(&self) -> BTreeMap<i64, i64> {
        self.items.iter().fold(BTreeMap::new(), |mut acc, item| {
            let total = acc.entry(item.stock_id).or_insert(0);
            *total = total.saturating_add(item.quantity);
            acc
        })
    }
}
