//! # Pricer Risk (L4: Application)
//!
//! Portfolio pricing on top of the payoff language.
//!
//! This crate provides:
//! - [`portfolio`]: trades (ID, product type, trade data) and portfolios
//! - [`PortfolioPricer`]: per-trade model construction, evaluation and
//!   reduction, spread over the rayon pool
//! - [`parallel`]: the threshold that decides when to go parallel
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pricer_risk (L4)             │
//! │  portfolio/  - Trade, Portfolio         │
//! │  pricing     - PortfolioPricer          │
//! │  parallel/   - Rayon utilities          │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │           pricer_script (L3)            │
//! │  ScriptLibrary, evaluate                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! A worker owns its model and context for the duration of one trade, so
//! recording models never cross threads. A failing trade is reported in
//! its [`TradeOutcome`] and logged; the rest of the portfolio is priced
//! regardless.

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod parallel;
pub mod portfolio;
pub mod pricing;

pub use portfolio::{Portfolio, PortfolioError, Trade, TradeId};
pub use pricing::{
    CashflowSummary, PortfolioPricer, PortfolioValuation, TradeOutcome, TradeValuation,
};
