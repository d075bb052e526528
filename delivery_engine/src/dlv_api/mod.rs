//! # Delivery engine public API
//!
//! The `dlv_api` module exposes the programmatic API of the delivery engine. Each API is a thin struct wrapping a
//! database backend, so that clients can pick the functionality they need.
//!
//! * [`order_flow_api`] places orders (reserving stock and pricing them) and manages their delivery status.
//! * [`payment_ledger`] records payments and balance adjustments against orders.
//! * [`accrual_jobs`] holds the scheduled interest accrual and overdue transition jobs.
//! * [`stock_ledger`] reserves, releases and replenishes stock.
//! * [`pricing`] is the pure order pricing calculation.
//!
//! # API usage
//!
//! An API instance is created by supplying a backend that implements [`DeliveryDatabase`](crate::DeliveryDatabase),
//! along with the event producers that should be notified of changes.
//!
//! ```rust,ignore
//! use delivery_engine::{events::EventProducers, PaymentLedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/delivery_store.db", 5).await?;
//! let api = PaymentLedgerApi::new(db, EventProducers::default());
//! let ledger = api.ledger(order_id).await?;
//! ```
pub mod accrual_jobs;
pub mod errors;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_ledger;
pub mod payment_objects;
pub mod pricing;
pub mod stock_ledger;
