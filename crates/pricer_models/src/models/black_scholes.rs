//! Multi-asset Black-Scholes Monte Carlo model.
//!
//! Every equity and FX index follows a correlated lognormal diffusion with
//! flat volatility around its deterministic forward:
//!
//! ```text
//! S(t_k) = S(t_{k-1}) * C(t_{k-1}, t_k) * exp((q_adj - sigma^2/2) dt + sigma sqrt(dt) W_k)
//! ```
//!
//! where `C` is the carry implied by the income and funding curves and
//! `q_adj = -rho(S, X) sigma_S sigma_X` is the quanto adjustment of an equity
//! quoted outside the base currency (`X` converts its currency into base).
//! Rates are deterministic, so the numeraire is `N(t) = 1 / P_base(0, t)` and
//! discount bonds are ratios of today's discount factors.

use std::sync::Arc;

use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{Filter, PathVector, RandomVariable, VectorError};
use tracing::debug;

use super::grid::SimulationGrid;
use super::traits::{Model, PathSet, RegressionRequest};
use crate::config::McParams;
use crate::error::ModelError;
use crate::market::{IndexKind, Market};
use crate::paths::{CholeskyFactor, CorrelationMatrix, NormalDraws};
use crate::regression::{FitPolicy, RegressionCache, RegressionKey};

/// Quanto link of one diffused index to the FX factor converting its
/// currency into base.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct QuantoLink {
    /// Factor index of the FX diffusion
    pub fx_factor: usize,
    /// Correlation between the index and base-per-currency FX
    pub rho: f64,
}

/// Factor layout shared by the eager and recording diffusions.
#[derive(Debug, Clone)]
pub(crate) struct Diffusion {
    pub indices: Vec<String>,
    pub volatilities: Vec<f64>,
    pub quanto: Vec<Option<QuantoLink>>,
    pub cholesky: CholeskyFactor,
}

impl Diffusion {
    pub fn new(market: &Market) -> Result<Self, ModelError> {
        let indices = market.diffused_indices();
        let volatilities = indices
            .iter()
            .map(|name| market.spot_and_volatility(name).map(|(_, vol)| vol))
            .collect::<Result<Vec<_>, _>>()?;
        let base = market.base_currency();
        let mut quanto = Vec::with_capacity(indices.len());
        for name in &indices {
            let link = match market.index(name)? {
                IndexKind::Equity(eq) if eq.currency != base => {
                    let (fx_name, inverted) = market.fx_pair(eq.currency, base).ok_or_else(|| {
                        ModelError::MissingMarketData(format!("FX rate {}/{base}", eq.currency))
                    })?;
                    let fx_factor = indices
                        .iter()
                        .position(|n| n == fx_name)
                        .ok_or_else(|| ModelError::MissingMarketData(format!("FX index {fx_name}")))?;
                    let rho = market.correlation(name, fx_name);
                    Some(QuantoLink {
                        fx_factor,
                        rho: if inverted { -rho } else { rho },
                    })
                }
                _ => None,
            };
            quanto.push(link);
        }
        let cholesky = CorrelationMatrix::from_market(market, &indices)?.cholesky()?;
        Ok(Self {
            indices,
            volatilities,
            quanto,
            cholesky,
        })
    }

    pub fn factors(&self) -> usize {
        self.indices.len()
    }

    pub fn factor(&self, name: &str) -> Option<usize> {
        self.indices.iter().position(|n| n == name)
    }

    /// Drift adjustment per unit time of factor `i`.
    pub fn quanto_adjustment(&self, i: usize) -> f64 {
        self.quanto[i].map_or(0.0, |link| {
            -link.rho * self.volatilities[i] * self.volatilities[link.fx_factor]
        })
    }
}

/// Simulated index values, `values[k * factors + i]` for step `k`, index `i`.
#[derive(Debug, Clone)]
struct SimulatedPaths {
    samples: usize,
    factors: usize,
    values: Vec<PathVector>,
}

impl SimulatedPaths {
    fn simulate(
        market: &Market,
        grid: &SimulationGrid,
        diffusion: &Diffusion,
        samples: usize,
        seed: u64,
    ) -> Result<Self, ModelError> {
        let factors = diffusion.factors();
        let draws = NormalDraws::generate(grid.len(), &diffusion.cholesky, samples, seed);
        let mut values = vec![PathVector::deterministic(samples, 0.0); grid.len() * factors];

        for (i, name) in diffusion.indices.iter().enumerate() {
            let (spot, vol) = market.spot_and_volatility(name)?;
            let drift_rate = diffusion.quanto_adjustment(i) - 0.5 * vol * vol;
            let mut level = vec![spot; samples];
            for k in 0..grid.len() {
                let (start, dt) = grid.step(k);
                let carry = market.carry(name, start, grid.dates()[k])?;
                let drift = drift_rate * dt;
                let diffusion_scale = vol * dt.sqrt();
                for (s, z) in level.iter_mut().zip(draws.slice(k, i)) {
                    *s *= carry * (drift + diffusion_scale * z).exp();
                }
                values[k * factors + i] = PathVector::from_paths(level.clone());
            }
        }
        debug!(
            samples,
            seed,
            steps = grid.len(),
            factors,
            "simulated Black-Scholes paths"
        );
        Ok(Self {
            samples,
            factors,
            values,
        })
    }

    fn value(&self, step: usize, factor: usize) -> &PathVector {
        &self.values[step * self.factors + factor]
    }
}

/// Eager Black-Scholes Monte Carlo model.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pricer_core::market_data::CurveEnum;
/// use pricer_core::types::{Currency, Date};
/// use pricer_models::config::McParams;
/// use pricer_models::market::Market;
/// use pricer_models::models::{BlackScholesModel, Model};
///
/// let today = Date::from_ymd(2024, 1, 2).unwrap();
/// let expiry = Date::from_ymd(2025, 1, 2).unwrap();
/// let market = Market::builder(today, Currency::USD)
///     .discount_curve(Currency::USD, CurveEnum::flat(0.02))
///     .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
///     .build()
///     .unwrap();
/// let params = McParams::builder()
///     .samples(1000)
///     .simulation_dates(vec![expiry])
///     .build()
///     .unwrap();
///
/// let mut model = BlackScholesModel::new(Arc::new(market), params).unwrap();
/// let spot = model.fixing("EQ-SPX", expiry, None).unwrap();
/// assert_eq!(spot.size(), 1000);
/// ```
#[derive(Debug, Clone)]
pub struct BlackScholesModel {
    market: Arc<Market>,
    params: McParams,
    grid: SimulationGrid,
    diffusion: Diffusion,
    pricing: SimulatedPaths,
    training: Option<SimulatedPaths>,
    active: PathSet,
    generation: u64,
    cache: RegressionCache,
}

impl BlackScholesModel {
    /// Simulates the pricing (and training, if configured) path sets.
    pub fn new(market: Arc<Market>, params: McParams) -> Result<Self, ModelError> {
        params.validate()?;
        let grid = SimulationGrid::new(&market, params.simulation_dates());
        let diffusion = Diffusion::new(&market)?;
        let pricing =
            SimulatedPaths::simulate(&market, &grid, &diffusion, params.samples(), params.seed())?;
        let training = match (params.training_samples(), params.training_seed()) {
            (Some(n), Some(seed)) => Some(SimulatedPaths::simulate(
                &market, &grid, &diffusion, n, seed,
            )?),
            _ => None,
        };
        Ok(Self {
            market,
            params,
            grid,
            diffusion,
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

    /// Monte Carlo parameters.
    pub fn params(&self) -> &McParams {
        &self.params
    }

    /// Simulation grid.
    pub fn grid(&self) -> &SimulationGrid {
        &self.grid
    }

    /// Resimulates the pricing paths with a new seed; stored regressions are
    /// invalidated.
    pub fn regenerate(&mut self, seed: u64) -> Result<(), ModelError> {
        self.pricing = SimulatedPaths::simulate(
            &self.market,
            &self.grid,
            &self.diffusion,
            self.params.samples(),
            seed,
        )?;
        self.generation += 1;
        Ok(())
    }

    fn paths(&self) -> &SimulatedPaths {
        match (self.active, &self.training) {
            (PathSet::Training, Some(training)) => training,
            _ => &self.pricing,
        }
    }

    fn simulated(&self, index: &str, date: Date) -> Result<RandomVariable, ModelError> {
        let factor = self
            .diffusion
            .factor(index)
            .ok_or_else(|| ModelError::MissingMarketData(format!("diffused index {index}")))?;
        let step = self.grid.position(date)?;
        Ok(RandomVariable::Paths(self.paths().value(step, factor).clone()))
    }

    fn state(&self, date: Date) -> Result<Vec<PathVector>, ModelError> {
        let step = self.grid.position(date)?;
        let paths = self.paths();
        Ok((0..self.diffusion.factors())
            .map(|i| paths.value(step, i).clone())
            .collect())
    }
}

/// Path vectors behind eager values; graph nodes are a backend mismatch.
pub(crate) fn eager(value: &RandomVariable) -> Result<&PathVector, ModelError> {
    value
        .as_paths()
        .ok_or(ModelError::Vector(VectorError::MixedBackends))
}

/// Fitting mask of an eager filter; `None` when every path is selected.
pub(crate) fn eager_mask(
    filter: Option<&Filter>,
) -> Result<Option<pricer_core::vectorized::BoolVector>, ModelError> {
    match filter {
        None => Ok(None),
        Some(f) if f.deterministic_value() == Some(true) => Ok(None),
        Some(f) => f
            .as_paths()
            .cloned()
            .map(Some)
            .ok_or(ModelError::Vector(VectorError::MixedBackends)),
    }
}

impl Model for BlackScholesModel {
    fn size(&self) -> usize {
        self.paths().samples
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
        match self.market.index(index)? {
            IndexKind::Rate(_) => {
                if let (true, None, Some(v)) = (obs == today, fwd, self.market.fixing(index, obs)) {
                    return Ok(self.constant(v));
                }
                let start = fwd.unwrap_or(obs).max(obs);
                Ok(self.constant(self.market.rate_forward(index, start)?))
            }
            IndexKind::Equity(_) | IndexKind::Fx(_) => {
                let value = if obs == today {
                    let (spot, _) = self.market.spot_and_volatility(index)?;
                    self.constant(self.market.fixing(index, obs).unwrap_or(spot))
                } else {
                    self.simulated(index, obs)?
                };
                match fwd {
                    Some(fwd) if fwd > obs => {
                        let carry = self.constant(self.market.carry(index, obs, fwd)?);
                        Ok(value.mul(&carry)?)
                    }
                    _ => Ok(value),
                }
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
        let ratio = self.market.discount_factor(ccy, pay)?
            / self.market.discount_factor(ccy, effective)?;
        Ok(self.constant(ratio))
    }

    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError> {
        let df = self.market.discount_factor(self.base_currency(), date)?;
        Ok(self.constant(1.0 / df))
    }

    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        let today = self.reference_date();
        if ccy == self.base_currency() || date <= today {
            return Ok(self.constant(self.market.fx_spot_to_base(ccy)?));
        }
        let (name, inverted) = self.market.fx_pair(ccy, self.base_currency()).ok_or_else(|| {
            ModelError::MissingMarketData(format!("FX rate {ccy}/{}", self.base_currency()))
        })?;
        let fx = self.simulated(name, date)?;
        if inverted {
            Ok(self.constant(1.0).div(&fx)?)
        } else {
            Ok(fx)
        }
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
        let mut regressors = self.state(obs)?;
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
        let key = RegressionKey {
            obs,
            slot: request.slot,
        };
        let fitted = self.cache.conditional_expectation(
            key,
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

    fn index_variance(
        &mut self,
        index: &str,
        from: Date,
        to: Date,
    ) -> Result<RandomVariable, ModelError> {
        let Some(factor) = self.diffusion.factor(index) else {
            self.market.index(index)?;
            return Ok(self.constant(0.0));
        };
        let vol = self.diffusion.volatilities[factor];
        let dt = (self.market.time(to) - self.market.time(from)).max(0.0);
        Ok(self.constant(vol * vol * dt))
    }
}
