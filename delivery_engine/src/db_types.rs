use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use dlv_common::Cents;
use log::error;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

pub const GAS: &str = "gas";
pub const WATER: &str = "water";

#[derive(Debug, Clone, Error)]
#[error("Invalid conversion: {0}")]
pub struct ConversionError(String);

/// Implements `Display`, `FromStr` and a lenient `From<String>` for unit enums stored as text columns. The text
/// representation is the variant name, which matches what `sqlx::Type` writes to the database.
macro_rules! text_enum {
    ($type:ident, $default:ident, [$($variant:ident),+]) => {
        impl Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($type::$variant => write!(f, stringify!($variant)),)+
                }
            }
        }

        impl FromStr for $type {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(Self::$variant),)+
                    s => Err(ConversionError(format!("Invalid {}: {s}", stringify!($type)))),
                }
            }
        }

        impl From<String> for $type {
            fn from(value: String) -> Self {
                value.parse().unwrap_or_else(|_| {
                    error!(
                        "Invalid {}: {value}. But this conversion cannot fail. Defaulting to {}",
                        stringify!($type),
                        stringify!($default)
                    );
                    Self::$default
                })
            }
        }
    };
}

//--------------------------------------        Role         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum Role {
    User,
    Admin,
}

text_enum!(Role, User, [User, Admin]);

//--------------------------------------        User         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Address {
    pub id: i64,
    pub user_id: i64,
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub reference: Option<String>,
    pub is_primary: bool,
}

impl Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {} - {}, {}", self.street, self.number, self.district, self.city)?;
        if let Some(reference) = &self.reference {
            write!(f, " ({reference})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
}

impl NewUser {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), phone: None, role: Role::User }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAddress {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub reference: Option<String>,
    pub is_primary: bool,
}

//--------------------------------------      StockItem      ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    /// The unique product key, e.g. "gas" or "water"
    pub name: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub updated_at: DateTime<Utc>,
}

impl StockItem {
    pub fn is_gas(&self) -> bool {
        self.name == GAS
    }
}

//--------------------------------------        Addon        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Addon {
    pub id: i64,
    pub name: String,
    pub price: Cents,
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order is being assembled and has not been dispatched for delivery yet.
    Started,
    /// The order is awaiting delivery.
    Pending,
    /// The order has been delivered.
    Concluded,
    /// The order was cancelled by the customer or an admin.
    Cancelled,
}

text_enum!(OrderStatusType, Pending, [Started, Pending, Concluded, Cancelled]);

//--------------------------------------    PaymentState     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentState {
    /// No payment has been received yet.
    Pending,
    /// Some, but not all, of the balance has been paid.
    PartiallyPaid,
    /// The balance is zero. This state is terminal.
    Paid,
    /// The order has been unpaid for longer than the allowed window.
    Overdue,
}

text_enum!(PaymentState, Pending, [Pending, PartiallyPaid, Paid, Overdue]);

impl PaymentState {
    /// The payment state of an order after a payment leaves `balance` outstanding.
    pub fn after_payment(balance: Cents) -> Self {
        if balance.is_zero() {
            PaymentState::Paid
        } else {
            PaymentState::PartiallyPaid
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    /// Snapshot of the delivery address at the time the order was placed
    pub address: String,
    pub status: OrderStatusType,
    pub payment_state: PaymentState,
    /// The outstanding balance of the order. This starts out as the order price and is moved by ledger transactions.
    pub total: Cents,
    pub interest_allowed: bool,
    /// Incremented on every write to the balance, payment state or status. Used for optimistic locking.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn is_paid(&self) -> bool {
        self.payment_state == PaymentState::Paid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub stock_id: i64,
    pub product: String,
    pub quantity: i64,
    pub unit_value: Cents,
    pub total_value: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderAddon {
    pub id: i64,
    pub order_id: i64,
    pub addon_id: i64,
    pub name: String,
    pub quantity: i64,
    pub unit_value: Cents,
    pub total_value: Cents,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
/// A fully priced order, ready to be written to the database in a single atomic transaction.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: i64,
    pub address: String,
    pub status: OrderStatusType,
    pub payment_state: PaymentState,
    /// The priced total, including any carried-over debt
    pub total: Cents,
    pub interest_allowed: bool,
    pub items: Vec<NewOrderItem>,
    pub addons: Vec<NewOrderAddon>,
    /// An opening ledger entry recording debt carried forward from a previous order
    pub carried_debt: Option<NewTransaction>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub stock_id: i64,
    pub product: String,
    pub quantity: i64,
    pub unit_value: Cents,
    pub total_value: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderAddon {
    pub addon_id: i64,
    pub name: String,
    pub unit_value: Cents,
    pub total_value: Cents,
}

//--------------------------------------     Transaction     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum TransactionType {
    Payment,
    Interest,
    Adjustment,
}

text_enum!(TransactionType, Adjustment, [Payment, Interest, Adjustment]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Pix,
    Card,
    Transfer,
}

text_enum!(PaymentMethod, Cash, [Cash, Pix, Card, Transfer]);

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub order_id: i64,
    pub tx_type: TransactionType,
    pub amount: Cents,
    /// The order balance before this transaction
    pub old_value: Cents,
    /// The order balance after this transaction
    pub new_value: Cents,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    /// True if the interest accrual job wrote this entry
    pub accrued: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub tx_type: TransactionType,
    pub amount: Cents,
    pub old_value: Cents,
    pub new_value: Cents,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    pub accrued: bool,
}

impl NewTransaction {
    pub fn payment(old_value: Cents, amount: Cents, method: PaymentMethod) -> Self {
        Self {
            tx_type: TransactionType::Payment,
            amount,
            old_value,
            new_value: old_value - amount,
            payment_method: Some(method),
            notes: None,
            accrued: false,
        }
    }

    /// An interest charge on top of `old_value`. `None` if the new balance would overflow.
    pub fn interest(old_value: Cents, amount: Cents) -> Option<Self> {
        let new_value = old_value.checked_add(amount)?;
        Some(Self {
            tx_type: TransactionType::Interest,
            amount,
            old_value,
            new_value,
            payment_method: None,
            notes: None,
            accrued: false,
        })
    }

    /// A manual correction of the balance. A negative `amount` is a discount. `None` if the new balance would overflow.
    pub fn adjustment(old_value: Cents, amount: Cents) -> Option<Self> {
        Self::interest(old_value, amount).map(|tx| Self { tx_type: TransactionType::Adjustment, ..tx })
    }

    pub fn with_notes<S: Into<String>>(mut self, notes: Option<S>) -> Self {
        self.notes = notes.map(Into::into);
        self
    }

    pub fn as_accrual(mut self) -> Self {
        self.accrued = true;
        self
    }
}

//--------------------------------------    BalanceUpdate    ---------------------------------------------------------
/// A ledger entry together with the order state it produces. Backends apply this atomically, and only if the order is
/// still at `expected_version`.
#[derive(Debug, Clone)]
pub struct BalanceUpdate {
    pub order_id: i64,
    pub expected_version: i64,
    pub transaction: NewTransaction,
    pub new_payment_state: PaymentState,
}
