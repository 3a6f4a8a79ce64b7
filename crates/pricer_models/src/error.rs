//! Error types for the numerical models.

use pricer_core::market_data::MarketDataError;
use pricer_core::math::RegressionError;
use pricer_core::types::{Date, DateError};
use pricer_core::vectorized::VectorError;
use thiserror::Error;

/// Errors raised while building or querying a model.
///
/// # Examples
///
/// ```
/// use pricer_models::ModelError;
///
/// let err = ModelError::MissingMarketData("fixing EQ-SPX on 2024-01-02".to_string());
/// assert_eq!(err.to_string(), "Missing market data: fixing EQ-SPX on 2024-01-02");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A curve, index, spot or historical fixing is not available.
    #[error("Missing market data: {0}")]
    MissingMarketData(String),

    /// The model cannot answer the request at this point, e.g. a date off
    /// the simulation grid or a regression not trained yet.
    #[error("Model not ready: {reason} (date {date})")]
    ModelNotReady {
        /// Date the request referred to
        date: Date,
        /// What is missing
        reason: String,
    },

    /// Fewer paths than basis functions in a regression.
    #[error("Insufficient samples for regression: {samples} paths, {required} required")]
    InsufficientSamples {
        /// Paths available for the fit
        samples: usize,
        /// Number of basis functions
        required: usize,
    },

    /// A model or configuration parameter is out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Description of the problem
        reason: String,
    },

    /// Size or backend mismatch between values.
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// Invalid curve input.
    #[error(transparent)]
    MarketData(#[from] MarketDataError),

    /// Date arithmetic failed.
    #[error(transparent)]
    Date(#[from] DateError),

    /// Regression failure other than a too small sample.
    #[error("Regression failed: {0}")]
    Regression(RegressionError),

    /// Configuration text could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<RegressionError> for ModelError {
    fn from(err: RegressionError) -> Self {
        match err {
            RegressionError::InsufficientSamples { samples, required } => {
                ModelError::InsufficientSamples { samples, required }
            }
            other => ModelError::Regression(other),
        }
    }
}

impl ModelError {
    /// Shorthand for [`ModelError::ModelNotReady`].
    pub fn not_ready(date: Date, reason: impl Into<String>) -> Self {
        ModelError::ModelNotReady {
            date,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`ModelError::InvalidParameter`].
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}
