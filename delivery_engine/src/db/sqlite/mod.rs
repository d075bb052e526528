//! SQLite backend for the delivery engine.
//!
//! [`SqliteDatabase`] implements every repository trait in [`crate::db::traits`]. The low-level queries live in
//! [`db`], as free functions over a `&mut SqliteConnection`.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
