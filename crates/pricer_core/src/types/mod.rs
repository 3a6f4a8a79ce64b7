//! Core time and financial value types.
//!
//! This module provides:
//! - `time`: `Date`, `DayCountConvention` and `Tenor`
//! - `currency`: ISO 4217 currency codes
//! - `error`: `DateError` and `CurrencyError`

pub mod currency;
pub mod error;
pub mod time;

pub use currency::Currency;
pub use error::{CurrencyError, DateError};
pub use time::{Date, DayCountConvention, Tenor};
