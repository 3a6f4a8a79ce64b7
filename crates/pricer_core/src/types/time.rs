//! Dates, day count conventions and tenors.
//!
//! This module provides:
//! - `Date`: Type-safe date wrapper around chrono::NaiveDate
//! - `DayCountConvention`: Year fraction and day count conventions used by
//!   the script built-ins `dcf` and `days`
//! - `Tenor`: Calendar periods such as `3M` or `1Y` used by rate indices
//!
//! # Examples
//!
//! ```
//! use pricer_core::types::time::{Date, DayCountConvention};
//!
//! let start = Date::from_ymd(2024, 1, 1).unwrap();
//! let end = Date::from_ymd(2024, 7, 1).unwrap();
//!
//! let yf = DayCountConvention::ActualActual365.year_fraction_dates(start, end);
//! assert!((yf - 0.4986).abs() < 0.001);
//! ```

use chrono::{Datelike, Days, Months, NaiveDate};
use std::fmt;
use std::ops::Sub;
use std::str::FromStr;

use super::error::DateError;

/// Type-safe date wrapper around chrono::NaiveDate.
///
/// Scripts compare, order and subtract dates; the wrapper keeps those
/// operations total and gives ISO 8601 parsing and formatting.
///
/// # Examples
///
/// ```
/// use pricer_core::types::time::Date;
///
/// let date = Date::from_ymd(2024, 6, 15).unwrap();
/// let parsed: Date = "2024-06-15".parse().unwrap();
/// assert_eq!(date, parsed);
///
/// let start = Date::from_ymd(2024, 1, 1).unwrap();
/// let end = Date::from_ymd(2024, 1, 11).unwrap();
/// assert_eq!(end - start, 10);
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Date(NaiveDate);

impl Date {
    /// Creates a Date from year, month, and day components.
    ///
    /// # Errors
    /// `DateError::InvalidDate` when the components do not name a calendar day.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::types::time::Date;
    ///
    /// assert!(Date::from_ymd(2024, 2, 29).is_ok());
    /// assert!(Date::from_ymd(2024, 2, 30).is_err());
    /// ```
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Result<Self, DateError> {
        NaiveDate::from_ymd_opt(year, month, day)
            .map(Date)
            .ok_or(DateError::InvalidDate { year, month, day })
    }

    /// Parses a date in ISO 8601 format (YYYY-MM-DD).
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::types::time::Date;
    ///
    /// let date = Date::parse("2024-06-15").unwrap();
    /// assert_eq!(date.year(), 2024);
    /// assert!(Date::parse("not-a-date").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, DateError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Date)
            .map_err(|e| DateError::ParseError(format!("'{}': {}", s, e)))
    }

    /// Returns the underlying NaiveDate.
    #[inline]
    pub fn into_inner(self) -> NaiveDate {
        self.0
    }

    /// Returns the year component.
    #[inline]
    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// Returns the month component (1-12).
    #[inline]
    pub fn month(&self) -> u32 {
        self.0.month()
    }

    /// Returns the day-of-month component (1-31).
    #[inline]
    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Shifts the date by a signed number of calendar days.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::types::time::Date;
    ///
    /// let d = Date::from_ymd(2024, 1, 30).unwrap();
    /// assert_eq!(d.add_days(3).unwrap(), Date::from_ymd(2024, 2, 2).unwrap());
    /// assert_eq!(d.add_days(-30).unwrap(), Date::from_ymd(2023, 12, 31).unwrap());
    /// ```
    pub fn add_days(self, days: i64) -> Result<Self, DateError> {
        let shifted = if days >= 0 {
            self.0.checked_add_days(Days::new(days.unsigned_abs()))
        } else {
            self.0.checked_sub_days(Days::new(days.unsigned_abs()))
        };
        shifted.map(Date).ok_or(DateError::OutOfRange {
            date: self.to_string(),
            shift: format!("{}D", days),
        })
    }

    /// Shifts the date by a signed number of months, clamping to month end.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricer_core::types::time::Date;
    ///
    /// let d = Date::from_ymd(2024, 1, 31).unwrap();
    /// assert_eq!(d.add_months(1).unwrap(), Date::from_ymd(2024, 2, 29).unwrap());
    /// ```
    pub fn add_months(self, months: i32) -> Result<Self, DateError> {
        let shifted = if months >= 0 {
            self.0.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            self.0.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Date).ok_or(DateError::OutOfRange {
            date: self.to_string(),
            shift: format!("{}M", months),
        })
    }
}

impl Sub for Date {
    type Output = i64;

    /// Returns the signed number of calendar days from `other` to `self`.
    fn sub(self, other: Self) -> i64 {
        (self.0 - other.0).num_days()
    }
}

impl FromStr for Date {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, DateError> {
        Date::parse(s)
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// Day Count Convention (year fraction convention).
///
/// # Variants
/// - `ActualActual365`: Actual days / 365
/// - `ActualActual360`: Actual days / 360
/// - `Thirty360`: 30/360 US bond basis
///
/// # Examples
///
/// ```
/// use pricer_core::types::time::{Date, DayCountConvention};
///
/// let start = Date::from_ymd(2024, 1, 1).unwrap();
/// let end = Date::from_ymd(2024, 7, 1).unwrap();
///
/// let dc: DayCountConvention = "A360".parse().unwrap();
/// assert_eq!(dc.day_count(start, end), 182);
/// assert!((dc.year_fraction_dates(start, end) - 182.0 / 360.0).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayCountConvention {
    /// Actual/365 Fixed.
    ActualActual365,
    /// Actual/360.
    ActualActual360,
    /// 30/360 US bond basis.
    Thirty360,
}

impl DayCountConvention {
    /// Returns the standard convention name.
    pub fn name(&self) -> &'static str {
        match self {
            DayCountConvention::ActualActual365 => "ACT/365",
            DayCountConvention::ActualActual360 => "ACT/360",
            DayCountConvention::Thirty360 => "30/360",
        }
    }

    /// Number of days between two dates under this convention.
    ///
    /// Negative when `start > end`.
    pub fn day_count(&self, start: Date, end: Date) -> i64 {
        match self {
            DayCountConvention::ActualActual365 | DayCountConvention::ActualActual360 => {
                end - start
            }
            DayCountConvention::Thirty360 => {
                if start <= end {
                    thirty_360_days(start.into_inner(), end.into_inner())
                } else {
                    -thirty_360_days(end.into_inner(), start.into_inner())
                }
            }
        }
    }

    /// Year fraction between two dates; negative when `start > end`.
    pub fn year_fraction_dates(&self, start: Date, end: Date) -> f64 {
        let days = self.day_count(start, end) as f64;
        match self {
            DayCountConvention::ActualActual365 => days / 365.0,
            DayCountConvention::ActualActual360 | DayCountConvention::Thirty360 => days / 360.0,
        }
    }
}

fn thirty_360_days(start: NaiveDate, end: NaiveDate) -> i64 {
    let d1 = if start.day() == 31 { 30 } else { start.day() };
    let d2 = if end.day() == 31 && d1 == 30 {
        30
    } else {
        end.day()
    };
    360 * i64::from(end.year() - start.year())
        + 30 * (i64::from(end.month()) - i64::from(start.month()))
        + (i64::from(d2) - i64::from(d1))
}

impl FromStr for DayCountConvention {
    type Err = DateError;

    /// Parses a convention name (case-insensitive).
    ///
    /// Accepted aliases: `ACT/365`, `A365`, `Actual/365`, `ACT/360`, `A360`,
    /// `Actual/360`, `30/360`, `Thirty360`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace(['/', ' '], "").as_str() {
            "ACT365" | "ACTUAL365" | "A365" | "ACT365F" | "A365F" => {
                Ok(DayCountConvention::ActualActual365)
            }
            "ACT360" | "ACTUAL360" | "A360" => Ok(DayCountConvention::ActualActual360),
            "30360" | "THIRTY360" => Ok(DayCountConvention::Thirty360),
            _ => Err(DateError::UnknownDayCount(s.to_string())),
        }
    }
}

impl fmt::Display for DayCountConvention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::DayCountConvention;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;

    impl Serialize for DayCountConvention {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.serialize_str(self.name())
        }
    }

    impl<'de> Deserialize<'de> for DayCountConvention {
        fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
        where
            D: Deserializer<'de>,
        {
            let s = String::deserialize(deserializer)?;
            DayCountConvention::from_str(&s).map_err(de::Error::custom)
        }
    }
}

/// Calendar period with a unit, e.g. `6M` or `1Y`.
///
/// # Examples
///
/// ```
/// use pricer_core::types::time::{Date, Tenor};
///
/// let tenor: Tenor = "3M".parse().unwrap();
/// let start = Date::from_ymd(2024, 1, 15).unwrap();
/// assert_eq!(tenor.advance(start).unwrap(), Date::from_ymd(2024, 4, 15).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tenor {
    /// Calendar days.
    Days(i32),
    /// Weeks of seven days.
    Weeks(i32),
    /// Calendar months.
    Months(i32),
    /// Calendar years.
    Years(i32),
}

impl Tenor {
    /// Returns `date` moved forward by this period.
    pub fn advance(&self, date: Date) -> Result<Date, DateError> {
        match *self {
            Tenor::Days(n) => date.add_days(i64::from(n)),
            Tenor::Weeks(n) => date.add_days(7 * i64::from(n)),
            Tenor::Months(n) => date.add_months(n),
            Tenor::Years(n) => date.add_months(12 * n),
        }
    }
}

impl FromStr for Tenor {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || DateError::ParseError(format!("invalid tenor '{}'", s));
        let (digits, unit) = s.split_at(s.len().saturating_sub(1));
        let n: i32 = digits.parse().map_err(|_| invalid())?;
        match unit.to_ascii_uppercase().as_str() {
            "D" => Ok(Tenor::Days(n)),
            "W" => Ok(Tenor::Weeks(n)),
            "M" => Ok(Tenor::Months(n)),
            "Y" => Ok(Tenor::Years(n)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Tenor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tenor::Days(n) => write!(f, "{}D", n),
            Tenor::Weeks(n) => write!(f, "{}W", n),
            Tenor::Months(n) => write!(f, "{}M", n),
            Tenor::Years(n) => write!(f, "{}Y", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> Date {
        Date::from_ymd(y, m, day).unwrap()
    }

    #[test]
    fn test_date_ordering_and_difference() {
        assert!(d(2024, 1, 1) < d(2024, 1, 2));
        assert_eq!(d(2025, 1, 1) - d(2024, 1, 1), 366);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(Date::parse("2024/01/01"), Err(DateError::ParseError(_))));
    }

    #[test]
    fn test_display_round_trip() {
        let date = d(2024, 3, 9);
        assert_eq!(date.to_string(), "2024-03-09");
        assert_eq!(date.to_string().parse::<Date>().unwrap(), date);
    }

    #[test]
    fn test_thirty_360_month_ends() {
        let dc = DayCountConvention::Thirty360;
        assert_eq!(dc.day_count(d(2024, 1, 31), d(2024, 3, 31)), 60);
        assert_eq!(dc.day_count(d(2024, 3, 31), d(2024, 1, 31)), -60);
        assert!((dc.year_fraction_dates(d(2024, 1, 1), d(2025, 1, 1)) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn test_act365_negative() {
        let dc = DayCountConvention::ActualActual365;
        let yf = dc.year_fraction_dates(d(2025, 1, 1), d(2024, 1, 1));
        assert!((yf + 366.0 / 365.0).abs() < 1e-15);
    }

    #[test]
    fn test_day_count_parse_aliases() {
        assert_eq!(
            "Actual/365".parse::<DayCountConvention>().unwrap(),
            DayCountConvention::ActualActual365
        );
        assert_eq!(
            "act/360".parse::<DayCountConvention>().unwrap(),
            DayCountConvention::ActualActual360
        );
        assert!("BUS/252".parse::<DayCountConvention>().is_err());
    }

    #[test]
    fn test_tenor_parse_and_advance() {
        assert_eq!("6M".parse::<Tenor>().unwrap(), Tenor::Months(6));
        assert_eq!("1y".parse::<Tenor>().unwrap(), Tenor::Years(1));
        assert!("M".parse::<Tenor>().is_err());
        assert!("3Q".parse::<Tenor>().is_err());
        assert_eq!(Tenor::Weeks(2).advance(d(2024, 1, 1)).unwrap(), d(2024, 1, 15));
        assert_eq!(Tenor::Years(1).advance(d(2024, 2, 29)).unwrap(), d(2025, 2, 28));
    }
}
