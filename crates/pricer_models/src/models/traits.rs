//! The model interface consumed by the script engine.
//!
//! Every backend answers the same questions (index fixings, discount bonds,
//! numeraire, FX conversion and conditional expectations) with
//! [`RandomVariable`] values: path vectors for the eager Monte Carlo models,
//! graph nodes for the recording model. Payments are valued through the
//! provided [`Model::pay`] on top of those primitives, barrier hit
//! probabilities through [`Model::barrier_probability`].

use pricer_core::graph::{BinaryFn, UnaryFn};
use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{Comparison, Filter, RandomVariable};

use crate::error::ModelError;
use crate::regression::RegressionSlot;

/// How a payment is valued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaymentConvention {
    /// Deterministic amounts are discounted on today's curve and converted
    /// at today's FX spot; path-dependent amounts fall back to
    /// [`PaymentConvention::NumeraireRelative`].
    Deterministic,
    /// `amount * P(e, pay) * FX(e) / N(e)` with `e = max(obs, today)`.
    NumeraireRelative,
}

/// Path set a Monte Carlo model currently exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PathSet {
    /// Paths used to fit regressions
    Training,
    /// Paths used for valuation
    #[default]
    Pricing,
}

/// Inputs of a conditional expectation besides amount and date.
#[derive(Debug, Clone, Copy)]
pub struct RegressionRequest<'a> {
    /// Cache slot of the regression
    pub slot: RegressionSlot,
    /// Paths entering the fit; all paths when `None`
    pub filter: Option<&'a Filter>,
    /// Regressors added to the model state
    pub regressors: &'a [RandomVariable],
}

impl<'a> RegressionRequest<'a> {
    /// Request without filter or additional regressors.
    pub fn new(slot: RegressionSlot) -> Self {
        Self {
            slot,
            filter: None,
            regressors: &[],
        }
    }
}

/// Numerical model behind a script evaluation.
///
/// Dates before the reference date refer to the past: index values come
/// from historical fixings and payments are worth nothing. Dates after it
/// must lie on the model's simulation grid wherever simulated state is
/// needed.
pub trait Model {
    /// Number of paths carried by every value (1 for graph models).
    fn size(&self) -> usize;

    /// Valuation date.
    fn reference_date(&self) -> Date;

    /// Currency all results are expressed in.
    fn base_currency(&self) -> Currency;

    /// Deterministic value of the model's size.
    fn constant(&self, value: f64) -> RandomVariable {
        RandomVariable::constant(self.size(), value)
    }

    /// Value of `index` observed at `obs`, optionally projected to `fwd`.
    fn fixing(
        &mut self,
        index: &str,
        obs: Date,
        fwd: Option<Date>,
    ) -> Result<RandomVariable, ModelError>;

    /// Discount bond `P(obs, pay)` in `ccy`; exactly one when `obs == pay`.
    fn discount(&mut self, obs: Date, pay: Date, ccy: Currency)
        -> Result<RandomVariable, ModelError>;

    /// Numeraire at `date`.
    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError>;

    /// Units of base currency per unit of `ccy` at `date`.
    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError>;

    /// Today's discount factor to `pay` in `ccy`.
    fn deterministic_discount(
        &mut self,
        ccy: Currency,
        pay: Date,
    ) -> Result<RandomVariable, ModelError>;

    /// Today's FX spot converting `ccy` into the base currency.
    fn fx_spot_today(&mut self, ccy: Currency) -> Result<RandomVariable, ModelError>;

    /// Conditional expectation of `amount` given the information at `obs`.
    fn npv(
        &mut self,
        amount: &RandomVariable,
        obs: Date,
        request: &RegressionRequest<'_>,
    ) -> Result<RandomVariable, ModelError>;

    /// Whether the model simulates a separate training path set.
    fn has_training_paths(&self) -> bool {
        false
    }

    /// Path set currently exposed.
    fn path_set(&self) -> PathSet {
        PathSet::Pricing
    }

    /// Switches the exposed path set.
    fn select_path_set(&mut self, set: PathSet) -> Result<(), ModelError> {
        match set {
            PathSet::Pricing => Ok(()),
            PathSet::Training => Err(ModelError::not_ready(
                self.reference_date(),
                "model has no training path set",
            )),
        }
    }

    /// Counter identifying the simulated path sets; changes on resimulation.
    fn path_set_generation(&self) -> u64 {
        0
    }

    /// Whether a historical fixing of `index` on `date` is known.
    fn historical_fixing_known(&self, index: &str, date: Date) -> bool;

    /// Variance of `ln index` accumulated over `[from, to]`; zero for
    /// indices the model keeps deterministic.
    fn index_variance(
        &mut self,
        _index: &str,
        _from: Date,
        _to: Date,
    ) -> Result<RandomVariable, ModelError> {
        Ok(self.constant(0.0))
    }

    /// Probability that `index` is at or above (`above`) or at or below the
    /// barrier at some time in `[from, to]`; zero when `from > to`.
    ///
    /// Known fixings before the reference date count as hits. The future
    /// part is checked at both end points `v1`, `v2` and bridged on the
    /// remaining paths with the Brownian bridge crossing probability
    /// `exp(-2 ln(v1 / B) ln(v2 / B) / variance)`.
    fn barrier_probability(
        &mut self,
        index: &str,
        from: Date,
        to: Date,
        barrier: &RandomVariable,
        above: bool,
    ) -> Result<RandomVariable, ModelError> {
        if from > to {
            return Ok(self.constant(0.0));
        }
        let today = self.reference_date();
        let cmp = if above { Comparison::Ge } else { Comparison::Le };

        let mut hit = Filter::constant(self.size(), false);
        let mut day = from;
        while day < today.min(to) {
            if self.historical_fixing_known(index, day) {
                let fixing = self.fixing(index, day, None)?;
                hit = hit.or(&fixing.compare(barrier, cmp)?)?;
            }
            day = day.add_days(1)?;
        }
        if to < today {
            return Ok(hit.to_indicator());
        }

        let start = from.max(today);
        let v1 = self.fixing(index, start, None)?;
        let v2 = self.fixing(index, to, None)?;
        hit = hit
            .or(&v1.compare(barrier, cmp)?)?
            .or(&v2.compare(barrier, cmp)?)?;
        let indicator = hit.to_indicator();

        let variance = self.index_variance(index, start, to)?;
        if variance
            .deterministic_value()
            .is_some_and(|v| v <= f64::EPSILON)
        {
            return Ok(indicator);
        }
        let level = barrier.binary(BinaryFn::Max, &self.constant(1e-14))?;
        let log_moneyness = |v: &RandomVariable| v.div(&level)?.unary(UnaryFn::Log);
        let crossing = log_moneyness(&v1)?
            .mul(&log_moneyness(&v2)?)?
            .mul(&self.constant(-2.0))?
            .div(&variance)?
            .unary(UnaryFn::Exp)?;
        let bridged = RandomVariable::select(&hit, &self.constant(0.0), &crossing)?;
        Ok(indicator.add(&bridged)?)
    }

    /// Value of a payment of `amount` in `ccy` on `pay`, observed at `obs`,
    /// expressed in numeraire units of the base currency.
    fn pay(
        &mut self,
        amount: &RandomVariable,
        obs: Date,
        pay: Date,
        ccy: Currency,
        convention: PaymentConvention,
    ) -> Result<RandomVariable, ModelError> {
        let today = self.reference_date();
        if pay < today {
            return Ok(self.constant(0.0));
        }
        if convention == PaymentConvention::Deterministic && amount.is_deterministic() {
            let df = self.deterministic_discount(ccy, pay)?;
            let fx = self.fx_spot_today(ccy)?;
            return Ok(amount.mul(&df)?.mul(&fx)?);
        }
        let effective = obs.max(today);
        let fx = self.fx_to_base(ccy, effective)?;
        let numeraire = self.numeraire(effective)?;
        let deflated = if effective == pay {
            amount.mul(&fx)?
        } else {
            let bond = self.discount(effective, pay, ccy)?;
            amount.mul(&bond)?.mul(&fx)?
        };
        Ok(deflated.div(&numeraire)?)
    }
}
