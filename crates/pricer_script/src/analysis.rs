//! Simulation date analysis.
//!
//! Before a Monte Carlo model can be built, its simulation grid has to cover
//! every future date on which the script needs simulated state. The dates
//! are found by running the script against a recording model whose
//! stochastic answers are two-path placeholders, one tiny and one huge, so
//! every path-dependent comparison splits the paths and both branches of
//! every conditional execute.

use std::collections::BTreeSet;

use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{PathVector, RandomVariable};
use pricer_models::models::{Model, RegressionRequest};
use pricer_models::ModelError;
use tracing::debug;

use crate::context::Context;
use crate::engine::Interpreter;
use crate::error::ScriptError;
use crate::script::Script;

const LANES: usize = 2;

struct DateCollector {
    today: Date,
    base: Currency,
    dates: BTreeSet<Date>,
}

impl DateCollector {
    fn record(&mut self, date: Date) -> RandomVariable {
        if date > self.today {
            self.dates.insert(date);
        }
        PathVector::from_paths(vec![1e-6, 1e6]).into()
    }
}

impl Model for DateCollector {
    fn size(&self) -> usize {
        LANES
    }

    fn reference_date(&self) -> Date {
        self.today
    }

    fn base_currency(&self) -> Currency {
        self.base
    }

    fn fixing(
        &mut self,
        _index: &str,
        obs: Date,
        _fwd: Option<Date>,
    ) -> Result<RandomVariable, ModelError> {
        Ok(self.record(obs))
    }

    fn discount(
        &mut self,
        obs: Date,
        pay: Date,
        _ccy: Currency,
    ) -> Result<RandomVariable, ModelError> {
        if obs == pay {
            return Ok(self.constant(1.0));
        }
        Ok(self.record(obs))
    }

    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError> {
        Ok(self.record(date))
    }

    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        if ccy == self.base {
            return Ok(self.constant(1.0));
        }
        Ok(self.record(date))
    }

    fn deterministic_discount(
        &mut self,
        _ccy: Currency,
        _pay: Date,
    ) -> Result<RandomVariable, ModelError> {
        Ok(self.constant(1.0))
    }

    fn fx_spot_today(&mut self, _ccy: Currency) -> Result<RandomVariable, ModelError> {
        Ok(self.constant(1.0))
    }

    fn npv(
        &mut self,
        amount: &RandomVariable,
        obs: Date,
        _request: &RegressionRequest<'_>,
    ) -> Result<RandomVariable, ModelError> {
        self.record(obs);
        Ok(amount.clone())
    }

    fn historical_fixing_known(&self, _index: &str, date: Date) -> bool {
        date <= self.today
    }
}

/// Future dates on which `script` needs simulated model state: index
/// observation dates, payment observation dates and regression dates.
///
/// `REQUIRE` statements are not checked, since the placeholder values carry
/// no meaning.
///
/// # Errors
///
/// Any error the script raises independently of model values, e.g. an
/// undefined identifier or invalid loop bounds.
///
/// # Examples
///
/// ```
/// use pricer_core::types::{Currency, Date};
/// use pricer_script::{collect_simulation_dates, Script, TradeData};
///
/// let today = Date::from_ymd(2024, 1, 2).unwrap();
/// let expiry = Date::from_ymd(2025, 1, 2).unwrap();
/// let ctx = TradeData::new()
///     .index("Underlying", "EQ-SPX")
///     .event("Expiry", expiry)
///     .to_context(1);
/// let script = Script::parse("Option = max(Underlying(Expiry) - 100, 0);").unwrap();
///
/// let dates = collect_simulation_dates(&script, &ctx, today, Currency::USD).unwrap();
/// assert_eq!(dates, vec![expiry]);
/// ```
pub fn collect_simulation_dates(
    script: &Script,
    context: &Context,
    reference_date: Date,
    base_currency: Currency,
) -> Result<Vec<Date>, ScriptError> {
    let mut collector = DateCollector {
        today: reference_date,
        base: base_currency,
        dates: BTreeSet::new(),
    };
    let mut ctx = context.resized(LANES)?;
    Interpreter::new(&mut collector, false).run(script, &mut ctx)?;
    debug!(dates = collector.dates.len(), "simulation dates collected");
    Ok(collector.dates.into_iter().collect())
}
