mod cents;

pub mod helpers;
pub mod op;

pub use cents::{Cents, CentsConversionError, CURRENCY_SYMBOL};
