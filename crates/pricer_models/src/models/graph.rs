//! Recording model: builds a computation graph instead of computing values.
//!
//! `GraphModel` follows the same diffusion as [`BlackScholesModel`], but
//! every value it returns is a node of a [`ComputationGraph`]. Market data
//! enter as named input nodes:
//!
//! | Input | Value |
//! |-------|-------|
//! | `spot:NAME` | spot of a diffused index |
//! | `vol:NAME` | volatility of a diffused index |
//! | `df:CCY:DATE` | today's discount factor to `DATE` |
//! | `div:NAME:DATE` | dividend discount factor of an equity |
//!
//! Random draws are variate nodes keyed by step and factor, filled in by
//! [`GraphModel::variates`] when the graph is executed. Because the draws
//! come from the same generator as the eager model, executing the graph with
//! the eager model's seed reproduces its paths.
//!
//! [`BlackScholesModel`]: super::BlackScholesModel
//! [`ComputationGraph`]: pricer_core::graph::ComputationGraph

use std::collections::HashMap;
use std::sync::Arc;

use pricer_core::graph::{GraphHandle, NodeId, NodeType, UnaryFn, VariateKey};
use pricer_core::market_data::YieldCurve;
use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{RandomVariable, VectorError};

use super::black_scholes::Diffusion;
use super::grid::SimulationGrid;
use super::traits::{Model, RegressionRequest};
use crate::config::McParams;
use crate::error::ModelError;
use crate::market::{IndexKind, Market};
use crate::paths::NormalDraws;

/// Model recording into a computation graph.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pricer_core::graph::GraphExecutor;
/// use pricer_core::market_data::CurveEnum;
/// use pricer_core::types::{Currency, Date};
/// use pricer_models::config::McParams;
/// use pricer_models::market::Market;
/// use pricer_models::models::{GraphModel, Model};
///
/// let today = Date::from_ymd(2024, 1, 2).unwrap();
/// let expiry = Date::from_ymd(2025, 1, 2).unwrap();
/// let market = Market::builder(today, Currency::USD)
///     .discount_curve(Currency::USD, CurveEnum::flat(0.0))
///     .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
///     .build()
///     .unwrap();
/// let params = McParams::builder().samples(1).simulation_dates(vec![expiry]).build().unwrap();
///
/// let mut model = GraphModel::new(Arc::new(market), params).unwrap();
/// let spot = model.fixing("EQ-SPX", expiry, None).unwrap();
/// let node = spot.as_node().unwrap().id();
///
/// let graph = model.graph().borrow();
/// let forward = GraphExecutor::new(&graph).forward(&model.variates(10_000, 1)).unwrap();
/// let sensitivities = GraphExecutor::new(&graph).backward(&forward, node).unwrap();
/// assert!((sensitivities.get("spot:EQ-SPX").unwrap() - 1.0).abs() < 0.05);
/// ```
#[derive(Debug, Clone)]
pub struct GraphModel {
    market: Arc<Market>,
    params: McParams,
    grid: SimulationGrid,
    diffusion: Diffusion,
    graph: GraphHandle,
    levels: HashMap<(usize, usize), RandomVariable>,
}

impl GraphModel {
    /// Model recording into a fresh graph.
    pub fn new(market: Arc<Market>, params: McParams) -> Result<Self, ModelError> {
        Self::with_graph(market, params, GraphHandle::new())
    }

    /// Model recording into an existing graph.
    pub fn with_graph(
        market: Arc<Market>,
        params: McParams,
        graph: GraphHandle,
    ) -> Result<Self, ModelError> {
        params.validate()?;
        let grid = SimulationGrid::new(&market, params.simulation_dates());
        let diffusion = Diffusion::new(&market)?;
        Ok(Self {
            market,
            params,
            grid,
            diffusion,
            graph,
            levels: HashMap::new(),
        })
    }

    /// Graph the model records into.
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// Simulation grid.
    pub fn grid(&self) -> &SimulationGrid {
        &self.grid
    }

    /// Market the model was built on.
    pub fn market(&self) -> &Market {
        &self.market
    }

    /// Random draws for executing the graph on `paths` paths.
    pub fn variates(&self, paths: usize, seed: u64) -> NormalDraws {
        NormalDraws::generate(self.grid.len(), &self.diffusion.cholesky, paths, seed)
    }

    /// Declares a named output of the recorded graph.
    pub fn declare_output(&self, name: &str, value: &RandomVariable) -> Result<NodeId, ModelError> {
        let node = value.to_node(&self.graph)?;
        self.graph
            .borrow_mut()
            .declare_output(name, node.id())
            .map_err(VectorError::from)?;
        Ok(node.id())
    }

    fn input(&self, name: String, value: f64) -> RandomVariable {
        let id = self.graph.borrow_mut().input(&name, value);
        RandomVariable::Node(self.graph.node(id))
    }

    fn df(&self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        if date <= self.reference_date() {
            return Ok(self.constant(1.0));
        }
        let value = self.market.discount_factor(ccy, date)?;
        Ok(self.input(format!("df:{ccy}:{date}"), value))
    }

    fn spot(&self, name: &str) -> Result<RandomVariable, ModelError> {
        let (spot, _) = self.market.spot_and_volatility(name)?;
        Ok(self.input(format!("spot:{name}"), spot))
    }

    /// Income over funding discount factor of a diffused index at `date`.
    fn carry_factor(&self, name: &str, date: Date) -> Result<RandomVariable, ModelError> {
        let (income, funding) = match self.market.index(name)? {
            IndexKind::Equity(eq) => {
                let income = if date <= self.reference_date() {
                    self.constant(1.0)
                } else {
                    let t = self.market.time(date);
                    let value = eq.dividend.discount_factor(t)?;
                    self.input(format!("div:{name}:{date}"), value)
                };
                (income, self.df(eq.currency, date)?)
            }
            IndexKind::Fx(fx) => (self.df(fx.foreign, date)?, self.df(fx.domestic, date)?),
            IndexKind::Rate(_) => {
                return Err(ModelError::invalid(
                    "index",
                    format!("{name} is not a diffused index"),
                ))
            }
        };
        Ok(income.div(&funding)?)
    }

    /// Index level at grid step `step`, recording missing steps first.
    fn level(&mut self, factor: usize, step: usize) -> Result<RandomVariable, ModelError> {
        if let Some(level) = self.levels.get(&(factor, step)) {
            return Ok(level.clone());
        }
        let name = self.diffusion.indices[factor].clone();
        let previous = if step == 0 {
            self.spot(&name)?
        } else {
            self.level(factor, step - 1)?
        };
        let (start, dt) = self.grid.step(step);
        let carry = self
            .carry_factor(&name, self.grid.dates()[step])?
            .div(&self.carry_factor(&name, start)?)?;

        let (_, vol_value) = self.market.spot_and_volatility(&name)?;
        let vol = self.input(format!("vol:{name}"), vol_value);
        let mut drift_rate = vol.mul(&vol)?.mul(&self.constant(-0.5))?;
        if let Some(link) = self.diffusion.quanto[factor] {
            let fx_name = &self.diffusion.indices[link.fx_factor];
            let (_, fx_vol_value) = self.market.spot_and_volatility(fx_name)?;
            let fx_vol = self.input(format!("vol:{fx_name}"), fx_vol_value);
            let adjustment = vol.mul(&fx_vol)?.mul(&self.constant(-link.rho))?;
            drift_rate = adjustment.add(&drift_rate)?;
        }
        let z = {
            let id = self.graph.borrow_mut().variate(VariateKey { step, factor });
            RandomVariable::Node(self.graph.node(id))
        };
        let exponent = drift_rate
            .mul(&self.constant(dt))?
            .add(&vol.mul(&self.constant(dt.sqrt()))?.mul(&z)?)?;
        let level = previous
            .mul(&carry)?
            .mul(&exponent.unary(UnaryFn::Exp)?)?;
        self.levels.insert((factor, step), level.clone());
        Ok(level)
    }

    fn simulated(&mut self, index: &str, date: Date) -> Result<RandomVariable, ModelError> {
        let factor = self
            .diffusion
            .factor(index)
            .ok_or_else(|| ModelError::MissingMarketData(format!("diffused index {index}")))?;
        let step = self.grid.position(date)?;
        self.level(factor, step)
    }

    fn fx_spot_node(&self, ccy: Currency) -> Result<RandomVariable, ModelError> {
        let base = self.base_currency();
        if ccy == base {
            return Ok(self.constant(1.0));
        }
        let (name, inverted) = self.market.fx_pair(ccy, base).ok_or_else(|| {
            ModelError::MissingMarketData(format!("FX rate {ccy}/{base}"))
        })?;
        let spot = self.spot(name)?;
        if inverted {
            Ok(self.constant(1.0).div(&spot)?)
        } else {
            Ok(spot)
        }
    }
}

impl Model for GraphModel {
    fn size(&self) -> usize {
        1
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
            IndexKind::Rate(ir) => {
                let start = fwd.unwrap_or(obs).max(obs);
                let end = ir.tenor.advance(start)?;
                let accrual = ir.day_count.year_fraction_dates(start, end);
                let ccy = ir.currency;
                let growth = self.df(ccy, start)?.div(&self.df(ccy, end)?)?;
                Ok(growth
                    .sub(&self.constant(1.0))?
                    .div(&self.constant(accrual))?)
            }
            IndexKind::Equity(_) | IndexKind::Fx(_) => {
                let value = if obs == today {
                    self.spot(index)?
                } else {
                    self.simulated(index, obs)?
                };
                match fwd {
                    Some(fwd) if fwd > obs => {
                        let carry = self
                            .carry_factor(index, fwd)?
                            .div(&self.carry_factor(index, obs)?)?;
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
        Ok(self.df(ccy, pay)?.div(&self.df(ccy, effective)?)?)
    }

    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError> {
        let df = self.df(self.base_currency(), date)?;
        Ok(self.constant(1.0).div(&df)?)
    }

    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        let base = self.base_currency();
        if ccy == base || date <= self.reference_date() {
            return self.fx_spot_node(ccy);
        }
        let (name, inverted) = self.market.fx_pair(ccy, base).ok_or_else(|| {
            ModelError::MissingMarketData(format!("FX rate {ccy}/{base}"))
        })?;
        let name = name.to_string();
        let fx = self.simulated(&name, date)?;
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
        self.df(ccy, pay)
    }

    fn fx_spot_today(&mut self, ccy: Currency) -> Result<RandomVariable, ModelError> {
        self.fx_spot_node(ccy)
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
        let amount_node = amount.to_node(&self.graph)?;
        if obs <= self.reference_date() {
            let node = self
                .graph
                .record(NodeType::Expectation, &[amount_node.id()])
                .map_err(VectorError::from)?;
            return Ok(RandomVariable::Node(node));
        }

        let mut args = vec![amount_node.id()];
        let masked = match request.filter {
            Some(f) if f.deterministic_value() != Some(true) => {
                args.push(f.to_node(&self.graph)?.id());
                true
            }
            _ => false,
        };
        let step = self.grid.position(obs)?;
        for factor in 0..self.diffusion.factors() {
            args.push(self.level(factor, step)?.to_node(&self.graph)?.id());
        }
        for r in request.regressors {
            args.push(r.to_node(&self.graph)?.id());
        }
        let node = self
            .graph
            .record(
                NodeType::ConditionalExpectation {
                    order: self.params.regression_order(),
                    masked,
                },
                &args,
            )
            .map_err(VectorError::from)?;
        Ok(RandomVariable::Node(node))
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
        let dt = (self.market.time(to) - self.market.time(from)).max(0.0);
        if self.diffusion.factor(index).is_none() {
            self.market.index(index)?;
            return Ok(self.constant(0.0));
        }
        let (_, vol_value) = self.market.spot_and_volatility(index)?;
        if vol_value == 0.0 || dt == 0.0 {
            return Ok(self.constant(0.0));
        }
        let vol = self.input(format!("vol:{index}"), vol_value);
        Ok(vol.mul(&vol)?.mul(&self.constant(dt))?)
    }
}
