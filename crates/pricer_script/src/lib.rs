//! # Pricer Script (L3: Payoff Language)
//!
//! A small language in which trade payoffs are written as data and
//! evaluated against any [`pricer_models::models::Model`]:
//!
//! ```text
//! NUMBER Payoff;
//! Payoff = max(Underlying(Expiry) - Strike, 0);
//! Option = LOGPAY(Notional * Payoff, Expiry, Settlement, PayCcy);
//! ```
//!
//! This crate provides:
//! - [`lexer`] and [`parse`]: script text to an [`ast`] with source locations
//! - [`Context`] and [`TradeData`]: scoped variables and trade constants
//! - [`ScriptEngine`], [`evaluate`] and [`Stepper`]: the interpreter
//! - [`ScriptLibrary`]: scripts parsed once per product type
//! - [`collect_simulation_dates`]: the simulation grid a script needs
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use pricer_core::market_data::CurveEnum;
//! use pricer_core::types::{Currency, Date};
//! use pricer_models::config::McParams;
//! use pricer_models::market::Market;
//! use pricer_models::models::{ModelKind, ScriptModel};
//! use pricer_script::{collect_simulation_dates, evaluate, Script, TradeData};
//!
//! let today = Date::from_ymd(2024, 1, 2).unwrap();
//! let expiry = Date::from_ymd(2025, 1, 2).unwrap();
//! let market = Market::builder(today, Currency::USD)
//!     .discount_curve(Currency::USD, CurveEnum::flat(0.03))
//!     .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
//!     .build()
//!     .unwrap();
//!
//! let trade = TradeData::new()
//!     .index("Underlying", "EQ-SPX")
//!     .event("Expiry", expiry)
//!     .number("Strike", 100.0)
//!     .currency("PayCcy", Currency::USD);
//! let script = Script::parse(
//!     "Option = LOGPAY(max(Underlying(Expiry) - Strike, 0), Expiry, Expiry, PayCcy);",
//! )
//! .unwrap();
//!
//! let dates = collect_simulation_dates(&script, &trade.to_context(1), today, Currency::USD).unwrap();
//! let params = McParams::builder().samples(2_000).simulation_dates(dates).build().unwrap();
//! let mut model = ScriptModel::build(ModelKind::BlackScholes, Arc::new(market), params).unwrap();
//!
//! let mut ctx = trade.to_context(2_000);
//! let npv = evaluate(&script, &mut ctx, &mut model).unwrap().npv().unwrap();
//! assert!(npv > 5.0 && npv < 15.0);
//! ```

#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod analysis;
pub mod ast;
pub mod context;
pub mod engine;
pub mod error;
pub mod lexer;
pub mod library;
mod parser;
pub mod script;
pub mod value;

pub use analysis::collect_simulation_dates;
pub use context::{Context, ScopeGuard, TradeData, TradeValue};
pub use engine::{
    evaluate, CashflowRecord, EngineState, EvaluationResult, ScriptEngine, Stepper,
};
pub use error::ScriptError;
pub use library::{ScriptLibrary, ScriptLibraryBuilder};
pub use script::{parse, Script, ScriptBuilder, ScriptSource};
pub use value::Value;
