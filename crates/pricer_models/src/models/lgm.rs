//! One-factor Linear Gauss Markov short-rate model.
//!
//! The LGM state `x` is a driftless Gaussian process under the LGM measure
//! with variance `zeta(t)`. With constant reversion `a` and volatility
//! `sigma` (the Hull-White parametrisation):
//!
//! ```text
//! H(t)    = (1 - exp(-a t)) / a
//! zeta(t) = sigma^2 (exp(2 a t) - 1) / (2 a)
//! N(t, x) = exp(H(t) x + H(t)^2 zeta(t) / 2) / P(0, t)
//! P(t, T, x) = P(0, T) / P(0, t) * exp(-(H(T) - H(t)) x - (H(T)^2 - H(t)^2) zeta(t) / 2)
//! ```
//!
//! The state is simulated exactly on the grid. Only the base currency curve
//! is stochastic; other currencies discount deterministically, and equity and
//! FX fixings are today's forwards.

use std::sync::Arc;

use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{PathVector, RandomVariable};
use tracing::debug;

use super::black_scholes::{eager, eager_mask};
use super::grid::SimulationGrid;
use super::traits::{Model, PathSet, RegressionRequest};
use crate::config::McParams;
use crate::error::ModelError;
use crate::market::{IndexKind, Market};
use crate::paths::{CorrelationMatrix, NormalDraws};
use crate::regression::{FitPolicy, RegressionCache, RegressionKey};

/// Reversion below which the small-`a` limits of `H` and `zeta` are used.
const REVERSION_CUTOFF: f64 = 1e-8;

/// LGM parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct LgmParams {
    /// Mean reversion speed `a`
    pub reversion: f64,
    /// Short-rate volatility `sigma`
    pub volatility: f64,
}

impl LgmParams {
    /// Validated parameters.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a negative volatility or non-finite input.
    pub fn new(reversion: f64, volatility: f64) -> Result<Self, ModelError> {
        if !reversion.is_finite() {
            return Err(ModelError::invalid("reversion", format!("{reversion}")));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ModelError::invalid("volatility", format!("{volatility}")));
        }
        Ok(Self {
            reversion,
            volatility,
        })
    }

    /// `H(t)`.
    pub fn h(&self, t: f64) -> f64 {
        let a = self.reversion;
        if a.abs() < REVERSION_CUTOFF {
            t
        } else {
            (1.0 - (-a * t).exp()) / a
        }
    }

    /// `zeta(t)`, the variance of the state at `t`.
    pub fn zeta(&self, t: f64) -> f64 {
        let a = self.reversion;
        let s2 = self.volatility * self.volatility;
        if a.abs() < REVERSION_CUTOFF {
            s2 * t
        } else {
            s2 * ((2.0 * a * t).exp() - 1.0) / (2.0 * a)
        }
    }
}

/// Eager LGM Monte Carlo model.
#[derive(Debug, Clone)]
pub struct LgmModel {
    market: Arc<Market>,
    params: McParams,
    lgm: LgmParams,
    grid: SimulationGrid,
    pricing: Vec<PathVector>,
    training: Option<Vec<PathVector>>,
    active: PathSet,
    generation: u64,
    cache: RegressionCache,
}

impl LgmModel {
    /// Simulates the state on the grid for the pricing (and training) sets.
    pub fn new(market: Arc<Market>, params: McParams, lgm: LgmParams) -> Result<Self, ModelError> {
        params.validate()?;
        LgmParams::new(lgm.reversion, lgm.volatility)?;
        let grid = SimulationGrid::new(&market, params.simulation_dates());
        let pricing = simulate_state(&lgm, &grid, params.samples(), params.seed())?;
        let training = match (params.training_samples(), params.training_seed()) {
            (Some(n), Some(seed)) => Some(simulate_state(&lgm, &grid, n, seed)?),
            _ => None,
        };
        Ok(Self {
            market,
            params,
            lgm,
            grid,
            pricing,
            training,
            active: PathSet::Pricing,
            generation: 0,
            cache: RegressionCache::new(),
        })
    }

    /// Market the model was built on.
    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Model parameters.
    pub fn lgm(&self) -> &LgmParams {
        &self.lgm
    }

    /// Resimulates the pricing state with a new seed.
    pub fn regenerate(&mut self, seed: u64) -> Result<(), ModelError> {
        self.pricing = simulate_state(&self.lgm, &self.grid, self.params.samples(), seed)?;
        self.generation += 1;
        Ok(())
    }

    fn samples(&self) -> usize {
        match (self.active, &self.training) {
            (PathSet::Training, Some(_)) => self.params.training_samples().unwrap_or(0),
            _ => self.params.samples(),
        }
    }

    /// State `x` at a date; zero on or before today.
    fn state(&self, date: Date) -> Result<PathVector, ModelError> {
        if date <= self.reference_date() {
            return Ok(PathVector::deterministic(self.samples(), 0.0));
        }
        let step = self.grid.position(date)?;
        let states = match (self.active, &self.training) {
            (PathSet::Training, Some(training)) => training,
            _ => &self.pricing,
        };
        Ok(states[step].clone())
    }

    /// Model discount bond `P(t, T)` in the base currency.
    fn bond(&self, obs: Date, pay: Date) -> Result<PathVector, ModelError> {
        let base = self.base_currency();
        let t = self.market.time(obs).max(0.0);
        let big_t = self.market.time(pay).max(0.0);
        let ratio =
            self.market.discount_factor(base, pay)? / self.market.discount_factor(base, obs)?;
        let (ht, hbig) = (self.lgm.h(t), self.lgm.h(big_t));
        let zeta = self.lgm.zeta(t);
        let convexity = 0.5 * (hbig * hbig - ht * ht) * zeta;
        Ok(self
            .state(obs)?
            .map(|x| ratio * (-(hbig - ht) * x - convexity).exp()))
    }
}

fn simulate_state(
    lgm: &LgmParams,
    grid: &SimulationGrid,
    samples: usize,
    seed: u64,
) -> Result<Vec<PathVector>, ModelError> {
    let factor = CorrelationMatrix::identity(1).cholesky()?;
    let draws = NormalDraws::generate(grid.len(), &factor, samples, seed);
    let mut x = vec![0.0; samples];
    let mut previous_zeta = 0.0;
    let mut states = Vec::with_capacity(grid.len());
    for k in 0..grid.len() {
        let zeta = lgm.zeta(grid.time(k));
        let scale = (zeta - previous_zeta).max(0.0).sqrt();
        for (xp, z) in x.iter_mut().zip(draws.slice(k, 0)) {
            *xp += scale * z;
        }
        states.push(PathVector::from_paths(x.clone()));
        previous_zeta = zeta;
    }
    debug!(samples, seed, steps = grid.len(), "simulated LGM state");
    Ok(states)
}

impl Model for LgmModel {
    fn size(&self) -> usize {
        self.samples()
    }

    fn reference_date(&self) -> Date {
        self.market.reference_date()
    }

    fn base_currency(&self) -> Currency {
        self.market.base_currency()
    }

    fn fixing(
        &mut self,
        index: &str,
        obs: Date,
        fwd: Option<Date>,
    ) -> Result<RandomVariable, ModelError> {
        let today = self.reference_date();
        if obs < today {
            return Ok(self.constant(self.market.historical_fixing(index, obs)?));
        }
        if obs == today && fwd.is_none() {
            if let Some(v) = self.market.fixing(index, obs) {
                return Ok(self.constant(v));
            }
        }
        match self.market.index(index)? {
            IndexKind::Rate(ir) if ir.currency == self.base_currency() => {
                let start = fwd.unwrap_or(obs).max(obs);
                let end = ir.tenor.advance(start)?;
                let accrual = ir.day_count.year_fraction_dates(start, end);
                let p_start = self.bond(obs, start)?;
                let p_end = self.bond(obs, end)?;
                Ok(RandomVariable::Paths(
                    p_start.zip_map(&p_end, |a, b| (a / b - 1.0) / accrual)?,
                ))
            }
            IndexKind::Rate(_) => {
                let start = fwd.unwrap_or(obs).max(obs);
                Ok(self.constant(self.market.rate_forward(index, start)?))
            }
            IndexKind::Equity(_) | IndexKind::Fx(_) => {
                let target = fwd.unwrap_or(obs).max(obs);
                Ok(self.constant(self.market.forward(index, target)?))
            }
        }
    }

    fn discount(
        &mut self,
        obs: Date,
        pay: Date,
        ccy: Currency,
    ) -> Result<RandomVariable, ModelError> {
        let effective = obs.max(self.reference_date());
        if effective == pay {
            return Ok(self.constant(1.0));
        }
        if pay < effective {
            return Err(ModelError::invalid(
                "pay",
                format!("pay date {pay} before observation date {effective}"),
            ));
        }
        if ccy == self.base_currency() {
            return Ok(RandomVariable::Paths(self.bond(effective, pay)?));
        }
        let ratio = self.market.discount_factor(ccy, pay)?
            / self.market.discount_factor(ccy, effective)?;
        Ok(self.constant(ratio))
    }

    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError> {
        let effective = date.max(self.reference_date());
        let t = self.market.time(effective);
        let df = self.market.discount_factor(self.base_currency(), effective)?;
        let (h, zeta) = (self.lgm.h(t), self.lgm.zeta(t));
        let x = self.state(effective)?;
        Ok(RandomVariable::Paths(
            x.map(|x| (h * x + 0.5 * h * h * zeta).exp() / df),
        ))
    }

    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        let base = self.base_currency();
        let spot = self.market.fx_spot_to_base(ccy)?;
        if ccy == base || date <= self.reference_date() {
            return Ok(self.constant(spot));
        }
        let carry = self.market.discount_factor(ccy, date)? / self.market.discount_factor(base, date)?;
        Ok(self.constant(spot * carry))
    }

    fn deterministic_discount(
        &mut self,
        ccy: Currency,
        pay: Date,
    ) -> Result<RandomVariable, ModelError> {
        Ok(self.constant(self.market.discount_factor(ccy, pay)?))
    }

    fn fx_spot_today(&mut self, ccy: Currency) -> Result<RandomVariable, ModelError> {
        Ok(self.constant(self.market.fx_spot_to_base(ccy)?))
    }

    fn npv(
        &mut self,
        amount: &RandomVariable,
        obs: Date,
        request: &RegressionRequest<'_>,
    ) -> Result<RandomVariable, ModelError> {
        if amount.is_deterministic() {
            return Ok(amount.clone());
        }
        let values = eager(amount)?;
        if obs <= self.reference_date() {
            return Ok(self.constant(values.expectation()));
        }
        let mut regressors = vec![self.state(obs)?];
        for r in request.regressors {
            regressors.push(eager(r)?.clone());
        }
        let mask = eager_mask(request.filter)?;
        let policy = match (self.training.is_some(), self.active) {
            (false, _) => FitPolicy::Transient,
            (true, PathSet::Pricing) => FitPolicy::Reuse,
            (true, PathSet::Training) => FitPolicy::Fit,
        };
        self.cache.sync(self.generation);
        let fitted = self.cache.conditional_expectation(
            RegressionKey {
                obs,
                slot: request.slot,
            },
            policy,
            values,
            &regressors,
            mask.as_ref(),
            self.params.regression_order(),
        )?;
        Ok(RandomVariable::Paths(fitted))
    }

    fn has_training_paths(&self) -> bool {
        self.training.is_some()
    }

    fn path_set(&self) -> PathSet {
        self.active
    }

    fn select_path_set(&mut self, set: PathSet) -> Result<(), ModelError> {
        if set == PathSet::Training && self.training.is_none() {
            return Err(ModelError::not_ready(
                self.reference_date(),
                "model has no training path set",
            ));
        }
        self.active = set;
        Ok(())
    }

    fn path_set_generation(&self) -> u64 {
        self.generation
    }

    fn historical_fixing_known(&self, index: &str, date: Date) -> bool {
        date <= self.reference_date() && self.market.fixing(index, date).is_some()
    }
}
