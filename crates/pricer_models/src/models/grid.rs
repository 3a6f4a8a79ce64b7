//! Simulation grid shared by the path-based backends.

use pricer_core::types::Date;

use crate::error::ModelError;
use crate::market::Market;

/// Future simulation dates with their ACT/365 times from the reference date.
///
/// Step `k` of a simulation moves the state from `dates[k - 1]` (today for
/// `k = 0`) to `dates[k]`.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationGrid {
    reference_date: Date,
    dates: Vec<Date>,
    times: Vec<f64>,
}

impl SimulationGrid {
    /// Keeps the dates strictly after the market's reference date.
    pub fn new(market: &Market, dates: &[Date]) -> Self {
        let today = market.reference_date();
        let mut dates: Vec<Date> = dates.iter().copied().filter(|d| *d > today).collect();
        dates.sort();
        dates.dedup();
        let times = dates.iter().map(|d| market.time(*d)).collect();
        Self {
            reference_date: today,
            dates,
            times,
        }
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    /// Whether the grid has no future dates.
    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Grid dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Time of step `k`.
    pub fn time(&self, k: usize) -> f64 {
        self.times[k]
    }

    /// Start date and length in years of step `k`.
    pub fn step(&self, k: usize) -> (Date, f64) {
        if k == 0 {
            (self.reference_date, self.times[0])
        } else {
            (self.dates[k - 1], self.times[k] - self.times[k - 1])
        }
    }

    /// Step index of a future date.
    ///
    /// # Errors
    ///
    /// `ModelNotReady` if `date` is not a grid date.
    pub fn position(&self, date: Date) -> Result<usize, ModelError> {
        self.dates
            .binary_search(&date)
            .map_err(|_| ModelError::not_ready(date, "date is not on the simulation grid"))
    }
}
