//! Error types for the foundation value types.
//!
//! - `DateError`: date construction, parsing, shifting and day count lookup
//! - `CurrencyError`: currency code parsing

use thiserror::Error;

/// Date-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::DateError;
///
/// let err = DateError::InvalidDate { year: 2024, month: 2, day: 30 };
/// assert_eq!(format!("{}", err), "Invalid date: 2024-2-30");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    /// Invalid date components (e.g., February 30th).
    #[error("Invalid date: {year}-{month}-{day}")]
    InvalidDate {
        /// Year component
        year: i32,
        /// Month component (1-12)
        month: u32,
        /// Day component (1-31)
        day: u32,
    },

    /// Failed to parse a date or tenor string.
    #[error("Date parse error: {0}")]
    ParseError(String),

    /// Shifting a date left the representable calendar range.
    #[error("Date {date} shifted by {shift} is out of range")]
    OutOfRange {
        /// The date being shifted
        date: String,
        /// The requested shift, e.g. `-3M`
        shift: String,
    },

    /// Unknown day count convention name.
    #[error("Unknown day count convention: {0}")]
    UnknownDayCount(String),
}

/// Currency-related errors.
///
/// # Examples
/// ```
/// use pricer_core::types::CurrencyError;
///
/// let err = CurrencyError::UnknownCurrency("XYZ".to_string());
/// assert_eq!(format!("{}", err), "Unknown currency: XYZ");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CurrencyError {
    /// Unknown currency code.
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
}
