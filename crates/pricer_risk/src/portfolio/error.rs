//! Portfolio error types.

use pricer_models::ModelError;
use pricer_script::ScriptError;
use thiserror::Error;

/// Errors raised while assembling or pricing a portfolio.
#[derive(Debug, Error)]
pub enum PortfolioError {
    /// Duplicate trade ID encountered.
    #[error("Duplicate trade ID: {0}")]
    DuplicateTrade(String),

    /// Empty portfolio (no trades).
    #[error("Portfolio is empty")]
    EmptyPortfolio,

    /// The library has no script for the trade's product type.
    #[error("No script for product '{product}' (trade {trade})")]
    UnknownProduct {
        /// Trade ID
        trade: String,
        /// Product type
        product: String,
    },

    /// Model construction failed.
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Date analysis or evaluation of the script failed.
    #[error("Script error: {0}")]
    Script(#[from] ScriptError),

    /// Malformed portfolio description.
    #[error("Portfolio configuration error: {0}")]
    Config(String),
}
