//! # Pricer Models (L2: Models and Market Data)
//!
//! Market data, Monte Carlo configuration and the numerical models a payoff
//! script is evaluated against.
//!
//! This crate provides:
//! - [`market::Market`]: curves, indices, correlations and fixings as of one
//!   reference date
//! - [`config::McParams`]: path counts, seeds, regression order and grid
//! - [`paths::NormalDraws`]: correlated normal draws shared by all backends
//! - [`regression::RegressionCache`]: conditional expectation fits per path
//!   set generation
//! - [`models`]: the [`models::Model`] interface and its backends
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use pricer_core::market_data::CurveEnum;
//! use pricer_core::types::{Currency, Date};
//! use pricer_models::config::McParams;
//! use pricer_models::market::Market;
//! use pricer_models::models::{Model, ModelKind, PaymentConvention, ScriptModel};
//!
//! let today = Date::from_ymd(2024, 1, 2).unwrap();
//! let pay = Date::from_ymd(2025, 1, 2).unwrap();
//! let market = Market::builder(today, Currency::EUR)
//!     .discount_curve(Currency::EUR, CurveEnum::flat(0.0))
//!     .build()
//!     .unwrap();
//! let params = McParams::builder().samples(10).build().unwrap();
//! let mut model = ScriptModel::build(ModelKind::BlackScholes, Arc::new(market), params).unwrap();
//!
//! let amount = model.constant(100.0);
//! let pv = model
//!     .pay(&amount, pay, pay, Currency::EUR, PaymentConvention::Deterministic)
//!     .unwrap();
//! assert_eq!(pv.expectation().unwrap(), 100.0);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod paths;
pub mod regression;

pub use error::ModelError;
