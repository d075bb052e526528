//! # Delivery server
//!
//! The long-running process behind the delivery backend. It owns the database pool, runs the scheduled
//! interest-accrual and overdue jobs, and turns engine events into customer and administrator notifications.
//!
//! Configuration is read from `DLV_` environment variables (a `.env` file is honoured). Run the binary with any
//! argument to print the list of variables and their current values.
pub mod cli;
pub mod config;
pub mod errors;
pub mod notifications;
pub mod server;
pub mod workers;
