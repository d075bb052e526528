//! #  Database management and control.
//!
//! This module defines the interface contracts of the delivery engine database *backends*. The engine's public APIs
//! never touch a database driver directly; they are generic over these traits, and a backend (currently
//! [`SqliteDatabase`](crate::SqliteDatabase)) implements them.
//!
//! ## Traits
//! * [`StockRepository`] tracks available stock and performs atomic reservations and releases.
//! * [`AddonRepository`] resolves the fixed-price extras that can be attached to an order.
//! * [`UserRepository`] provides customer records and their delivery addresses.
//! * [`OrderRepository`] persists orders with their line items, and applies balance updates atomically.
//! * [`TransactionRepository`] reads the append-only payment ledger.
//! * [`DeliveryDatabase`] is the umbrella trait a backend must implement to serve the whole engine.
mod addon_repository;
mod data_objects;
mod delivery_database;
mod order_repository;
mod stock_repository;
mod transaction_repository;
mod user_repository;

pub use addon_repository::AddonRepository;
pub use data_objects::{AccrualCandidate, FullOrder, RepositoryError};
pub use delivery_database::DeliveryDatabase;
pub use order_repository::OrderRepository;
pub use stock_repository::{StockError, StockRepository};
pub use transaction_repository::TransactionRepository;
pub use user_repository::UserRepository;
