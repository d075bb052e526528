//! Delivery Engine
//!
//! The delivery engine is the core of a gas and water home-delivery backend. It places orders against finite stock,
//! keeps a ledger of partial payments against each order's balance, and runs the daily jobs that add late-payment
//! interest and flag overdue orders.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@db`]). SQLite is the supported backend. You should never need to access
//!    the database directly. Instead, use the public API provided by the engine. The exception is the data types used
//!    in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@dlv_api`]). This provides order placement, status management, the payment ledger,
//!    stock management and the scheduled jobs. Backends implement the traits in [`mod@db`] to serve these APIs.
//!
//! The engine also publishes events when orders are created or modified, payments arrive and interest is accrued.
//! Hooks can subscribe to these events (see [`mod@events`]) to send notifications through a
//! [`NotificationGateway`](notifications::NotificationGateway) without ever blocking or failing the operation that
//! produced them.
mod db;

pub mod db_types;
pub mod dlv_api;
pub mod events;
pub mod notifications;

#[cfg(feature = "sqlite")]
pub use db::sqlite::SqliteDatabase;
pub use db::traits::{
    AccrualCandidate,
    AddonRepository,
    DeliveryDatabase,
    FullOrder,
    OrderRepository,
    RepositoryError,
    StockError,
    StockRepository,
    TransactionRepository,
    UserRepository,
};
pub use dlv_api::{
    accrual_jobs::{interest_for_age, AccrualJobsApi, AccrualOptions, AccrualRunResult},
    errors::OrderFlowError,
    order_flow_api::OrderFlowApi,
    order_objects::{NewOrderRequest, OrderItemRequest},
    payment_ledger::PaymentLedgerApi,
    payment_objects::{LedgerEntry, OrderLedger, PaymentRequest},
    pricing::{PriceBreakdown, PricingCalculator},
    stock_ledger::{StockLedger, StockLine},
};
