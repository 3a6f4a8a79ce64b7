//! Static dispatch over the model backends.

use std::sync::Arc;

use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::RandomVariable;

use super::black_scholes::BlackScholesModel;
use super::graph::GraphModel;
use super::lgm::{LgmModel, LgmParams};
use super::traits::{Model, PathSet, RegressionRequest};
use crate::config::McParams;
use crate::error::ModelError;
use crate::market::Market;

/// Model selection, as read from configuration.
///
/// ```toml
/// [model]
/// type = "lgm"
/// reversion = 0.03
/// volatility = 0.01
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "kebab-case"))]
pub enum ModelKind {
    /// Multi-asset Black-Scholes on Monte Carlo paths
    #[default]
    BlackScholes,
    /// One-factor LGM on Monte Carlo paths
    Lgm(LgmParams),
    /// Black-Scholes recorded into a computation graph
    Graph,
}

/// Enum wrapping every model backend.
#[derive(Debug, Clone)]
pub enum ScriptModel {
    /// Eager Black-Scholes
    BlackScholes(BlackScholesModel),
    /// Eager LGM
    Lgm(LgmModel),
    /// Recording Black-Scholes
    Graph(GraphModel),
}

impl ScriptModel {
    /// Builds the backend selected by `kind`.
    pub fn build(kind: ModelKind, market: Arc<Market>, params: McParams) -> Result<Self, ModelError> {
        Ok(match kind {
            ModelKind::BlackScholes => Self::BlackScholes(BlackScholesModel::new(market, params)?),
            ModelKind::Lgm(lgm) => {
                let lgm = LgmParams::new(lgm.reversion, lgm.volatility)?;
                Self::Lgm(LgmModel::new(market, params, lgm)?)
            }
            ModelKind::Graph => Self::Graph(GraphModel::new(market, params)?),
        })
    }

    /// Resimulates the eager path sets; recording models have nothing to do.
    pub fn regenerate(&mut self, seed: u64) -> Result<(), ModelError> {
        match self {
            Self::BlackScholes(m) => m.regenerate(seed),
            Self::Lgm(m) => m.regenerate(seed),
            Self::Graph(_) => Ok(()),
        }
    }

    /// Recording model, if this is one.
    pub fn as_graph(&self) -> Option<&GraphModel> {
        match self {
            Self::Graph(m) => Some(m),
            _ => None,
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $m:ident => $e:expr) => {
        match $self {
            ScriptModel::BlackScholes($m) => $e,
            ScriptModel::Lgm($m) => $e,
            ScriptModel::Graph($m) => $e,
        }
    };
}

impl Model for ScriptModel {
    fn size(&self) -> usize {
        dispatch!(self, m => m.size())
    }

    fn reference_date(&self) -> Date {
        dispatch!(self, m => m.reference_date())
    }

    fn base_currency(&self) -> Currency {
        dispatch!(self, m => m.base_currency())
    }

    fn fixing(
        &mut self,
        index: &str,
        obs: Date,
        fwd: Option<Date>,
    ) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.fixing(index, obs, fwd))
    }

    fn discount(
        &mut self,
        obs: Date,
        pay: Date,
        ccy: Currency,
    ) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.discount(obs, pay, ccy))
    }

    fn numeraire(&mut self, date: Date) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.numeraire(date))
    }

    fn fx_to_base(&mut self, ccy: Currency, date: Date) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.fx_to_base(ccy, date))
    }

    fn deterministic_discount(
        &mut self,
        ccy: Currency,
        pay: Date,
    ) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.deterministic_discount(ccy, pay))
    }

    fn fx_spot_today(&mut self, ccy: Currency) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.fx_spot_today(ccy))
    }

    fn npv(
        &mut self,
        amount: &RandomVariable,
        obs: Date,
        request: &RegressionRequest<'_>,
    ) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.npv(amount, obs, request))
    }

    fn has_training_paths(&self) -> bool {
        dispatch!(self, m => m.has_training_paths())
    }

    fn path_set(&self) -> PathSet {
        dispatch!(self, m => m.path_set())
    }

    fn select_path_set(&mut self, set: PathSet) -> Result<(), ModelError> {
        dispatch!(self, m => m.select_path_set(set))
    }

    fn path_set_generation(&self) -> u64 {
        dispatch!(self, m => m.path_set_generation())
    }

    fn historical_fixing_known(&self, index: &str, date: Date) -> bool {
        dispatch!(self, m => m.historical_fixing_known(index, date))
    }

    fn index_variance(
        &mut self,
        index: &str,
        from: Date,
        to: Date,
    ) -> Result<RandomVariable, ModelError> {
        dispatch!(self, m => m.index_variance(index, from, to))
    }
}
