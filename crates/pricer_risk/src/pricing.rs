//! Parallel portfolio pricing.
//!
//! Every trade is priced independently: its script is looked up in the
//! shared [`ScriptLibrary`], a model is built from the shared [`Market`]
//! and [`McParams`], the trade data is bound into a fresh context and the
//! script is evaluated. A failing trade produces an error entry and never
//! stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use pricer_core::graph::GraphExecutor;
use pricer_core::types::{Currency, Date};
use pricer_core::vectorized::{RandomVariable, VectorError};
use pricer_models::config::McParams;
use pricer_models::market::Market;
use pricer_models::models::{GraphModel, Model, ModelKind, ScriptModel};
use pricer_models::ModelError;
use pricer_script::{collect_simulation_dates, evaluate, ScriptLibrary};
use tracing::{debug, info, warn};

use crate::parallel::ParallelConfig;
use crate::portfolio::{Portfolio, PortfolioError, Trade, TradeId};

/// Expected value of one logged cashflow.
#[derive(Debug, Clone, PartialEq)]
pub struct CashflowSummary {
    /// Leg number, if given
    pub leg: Option<i64>,
    /// Cashflow type label, if given
    pub kind: Option<String>,
    /// Observation date
    pub obs: Date,
    /// Payment date
    pub pay: Date,
    /// Payment currency
    pub currency: Currency,
    /// Expected undiscounted amount
    pub amount: f64,
    /// Present value in base currency
    pub value: f64,
}

/// Reduced outcome of one successfully priced trade.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeValuation {
    /// Present value in base currency
    pub npv: f64,
    /// Expectations of the script's additional results
    pub additional_results: BTreeMap<String, f64>,
    /// Logged cashflows
    pub cashflows: Vec<CashflowSummary>,
}

/// Per-trade entry of a [`PortfolioValuation`].
#[derive(Debug)]
pub struct TradeOutcome {
    /// Trade ID
    pub id: TradeId,
    /// Valuation, or the error that stopped it
    pub result: Result<TradeValuation, PortfolioError>,
}

/// Outcomes of every trade, in portfolio order.
#[derive(Debug)]
pub struct PortfolioValuation {
    outcomes: Vec<TradeOutcome>,
}

impl PortfolioValuation {
    /// All outcomes.
    pub fn outcomes(&self) -> &[TradeOutcome] {
        &self.outcomes
    }

    /// Outcome of one trade.
    pub fn get(&self, id: &str) -> Option<&TradeOutcome> {
        self.outcomes.iter().find(|o| o.id.as_str() == id)
    }

    /// Sum of the successfully priced NPVs.
    pub fn total_npv(&self) -> f64 {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .map(|v| v.npv)
            .sum()
    }

    /// Trades that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&TradeId, &PortfolioError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (&o.id, e)))
    }

    /// Number of failed trades.
    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }
}

/// Prices portfolios of scripted trades.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use pricer_core::market_data::CurveEnum;
/// use pricer_core::types::{Currency, Date};
/// use pricer_models::config::McParams;
/// use pricer_models::market::Market;
/// use pricer_risk::portfolio::{Portfolio, Trade};
/// use pricer_risk::PortfolioPricer;
/// use pricer_script::{ScriptLibrary, ScriptSource, TradeData};
///
/// let today = Date::from_ymd(2024, 1, 2).unwrap();
/// let market = Market::builder(today, Currency::USD)
///     .discount_curve(Currency::USD, CurveEnum::flat(0.0))
///     .build()
///     .unwrap();
/// let library = ScriptLibrary::builder()
///     .add("Fixed", ScriptSource::new("Option = PAY(Amount, Pay, Pay, Ccy);"))
///     .build()
///     .unwrap();
/// let params = McParams::builder().samples(16).build().unwrap();
///
/// let trade = Trade::new(
///     "T1",
///     "Fixed",
///     TradeData::new()
///         .number("Amount", 250.0)
///         .event("Pay", Date::from_ymd(2025, 1, 2).unwrap())
///         .currency("Ccy", Currency::USD),
/// );
/// let portfolio = Portfolio::builder().add_trade(trade).build().unwrap();
///
/// let pricer = PortfolioPricer::new(Arc::new(market), Arc::new(library), params);
/// let valuation = pricer.price(&portfolio);
/// assert!((valuation.total_npv() - 250.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct PortfolioPricer {
    market: Arc<Market>,
    library: Arc<ScriptLibrary>,
    params: McParams,
    kind: ModelKind,
    parallel: ParallelConfig,
}

impl PortfolioPricer {
    /// Pricer using Black-Scholes and the default parallel configuration.
    ///
    /// When `params` has no simulation dates, each trade's grid is derived
    /// from its script.
    pub fn new(market: Arc<Market>, library: Arc<ScriptLibrary>, params: McParams) -> Self {
        Self {
            market,
            library,
            params,
            kind: ModelKind::default(),
            parallel: ParallelConfig::default(),
        }
    }

    /// Selects the model backend.
    pub fn with_model(mut self, kind: ModelKind) -> Self {
        self.kind = kind;
        self
    }

    /// Overrides the parallel configuration.
    pub fn with_parallel_config(mut self, parallel: ParallelConfig) -> Self {
        self.parallel = parallel;
        self
    }

    /// Prices every trade of `portfolio`.
    pub fn price(&self, portfolio: &Portfolio) -> PortfolioValuation {
        info!(
            trades = portfolio.len(),
            parallel = self.parallel.should_parallelize(portfolio.len()),
            "pricing portfolio"
        );
        let outcomes = self.parallel.map(portfolio.trades(), |trade| TradeOutcome {
            id: trade.id.clone(),
            result: self.price_trade(trade).map_err(|err| {
                warn!(trade = %trade.id, product = %trade.product, error = %err, "trade failed");
                err
            }),
        });
        let valuation = PortfolioValuation { outcomes };
        info!(
            total_npv = valuation.total_npv(),
            failures = valuation.failure_count(),
            "portfolio priced"
        );
        valuation
    }

    /// Prices one trade.
    ///
    /// # Errors
    ///
    /// `UnknownProduct` when the library has no script for the trade;
    /// otherwise any model or script error of the evaluation.
    pub fn price_trade(&self, trade: &Trade) -> Result<TradeValuation, PortfolioError> {
        let script = self
            .library
            .get(&trade.product)
            .ok_or_else(|| PortfolioError::UnknownProduct {
                trade: trade.id.to_string(),
                product: trade.product.clone(),
            })?;

        let params = if self.params.simulation_dates().is_empty() {
            let dates = collect_simulation_dates(
                &script,
                &trade.data.to_context(1),
                self.market.reference_date(),
                self.market.base_currency(),
            )?;
            self.params.with_simulation_dates(dates)
        } else {
            self.params.clone()
        };

        let mut model = ScriptModel::build(self.kind, Arc::clone(&self.market), params.clone())?;
        let mut context = trade.data.to_context(model.size());
        let result = evaluate(&script, &mut context, &mut model)?;

        let mut values: Vec<&RandomVariable> = vec![&result.value];
        values.extend(result.additional_results.values());
        for cf in &result.cashflows {
            values.push(&cf.amount);
            values.push(&cf.value);
        }
        let means = match model.as_graph() {
            Some(graph) => graph_expectations(graph, &params, &values)?,
            None => values
                .iter()
                .map(|v| v.expectation())
                .collect::<Result<Vec<_>, _>>()
                .map_err(ModelError::from)?,
        };

        let extra = result.additional_results.len();
        let additional_results = result
            .additional_results
            .keys()
            .cloned()
            .zip(means[1..=extra].iter().copied())
            .collect();
        let cashflows = result
            .cashflows
            .iter()
            .zip(means[1 + extra..].chunks_exact(2))
            .map(|(cf, pair)| CashflowSummary {
                leg: cf.leg,
                kind: cf.kind.clone(),
                obs: cf.obs,
                pay: cf.pay,
                currency: cf.currency,
                amount: pair[0],
                value: pair[1],
            })
            .collect();

        debug!(trade = %trade.id, npv = means[0], "trade priced");
        Ok(TradeValuation {
            npv: means[0],
            additional_results,
            cashflows,
        })
    }
}

/// Executes the recorded graph on the configured paths and averages the
/// given values.
fn graph_expectations(
    graph: &GraphModel,
    params: &McParams,
    values: &[&RandomVariable],
) -> Result<Vec<f64>, ModelError> {
    let ids = values
        .iter()
        .enumerate()
        .map(|(i, v)| graph.declare_output(&format!("output:{i}"), v))
        .collect::<Result<Vec<_>, _>>()?;
    let g = graph.graph().borrow();
    let forward = GraphExecutor::new(&g)
        .forward(&graph.variates(params.samples(), params.seed()))
        .map_err(VectorError::from)?;
    ids.into_iter()
        .map(|id| {
            forward
                .expectation(id)
                .map_err(|e| ModelError::from(VectorError::from(e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pricer_core::market_data::CurveEnum;
    use pricer_script::{ScriptError, ScriptSource, TradeData};

    fn date(y: i32, m: u32, d: u32) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn market() -> Arc<Market> {
        Arc::new(
            Market::builder(date(2024, 1, 2), Currency::USD)
                .discount_curve(Currency::USD, CurveEnum::flat(0.02))
                .build()
                .unwrap(),
        )
    }

    fn library() -> Arc<ScriptLibrary> {
        Arc::new(
            ScriptLibrary::builder()
                .add(
                    "Fixed",
                    ScriptSource::new("Option = LOGPAY(Amount, Pay, Pay, Ccy);")
                        .with_result("doubled", "2 * Amount"),
                )
                .add("Broken", ScriptSource::new("Option = Missing;"))
                .build()
                .unwrap(),
        )
    }

    fn fixed(id: &str, product: &str, amount: f64) -> Trade {
        Trade::new(
            id,
            product,
            TradeData::new()
                .number("Amount", amount)
                .event("Pay", date(2025, 1, 2))
                .currency("Ccy", Currency::USD),
        )
    }

    fn pricer() -> PortfolioPricer {
        let params = McParams::builder().samples(8).build().unwrap();
        PortfolioPricer::new(market(), library(), params)
    }

    #[test]
    fn test_single_trade_reduces_everything() {
        let valuation = pricer().price_trade(&fixed("T1", "Fixed", 100.0)).unwrap();
        let df = market().discount_factor(Currency::USD, date(2025, 1, 2)).unwrap();
        assert_relative_eq!(valuation.npv, 100.0 * df, max_relative = 1e-12);
        assert_eq!(valuation.additional_results["doubled"], 200.0);
        assert_eq!(valuation.cashflows.len(), 1);
        assert_eq!(valuation.cashflows[0].amount, 100.0);
        assert_relative_eq!(valuation.cashflows[0].value, 100.0 * df, max_relative = 1e-12);
    }

    #[test]
    fn test_failures_are_isolated() {
        let portfolio = Portfolio::builder()
            .add_trade(fixed("T1", "Fixed", 100.0))
            .add_trade(fixed("T2", "Broken", 100.0))
            .add_trade(fixed("T3", "Swap", 100.0))
            .add_trade(fixed("T4", "Fixed", 50.0))
            .build()
            .unwrap();
        let valuation = pricer()
            .with_parallel_config(ParallelConfig::new(1))
            .price(&portfolio);

        assert_eq!(valuation.outcomes().len(), 4);
        assert_eq!(valuation.failure_count(), 2);
        assert!(matches!(
            valuation.get("T2").unwrap().result,
            Err(PortfolioError::Script(ref e)) if matches!(e.root(), ScriptError::UndefinedIdentifier(_))
        ));
        assert!(matches!(
            valuation.get("T3").unwrap().result,
            Err(PortfolioError::UnknownProduct { .. })
        ));
        let df = market().discount_factor(Currency::USD, date(2025, 1, 2)).unwrap();
        assert_relative_eq!(valuation.total_npv(), 150.0 * df, max_relative = 1e-12);
    }

    #[test]
    fn test_graph_backend_matches_eager() {
        let trade = fixed("T1", "Fixed", 100.0);
        let eager = pricer().price_trade(&trade).unwrap();
        let graph = pricer()
            .with_model(ModelKind::Graph)
            .price_trade(&trade)
            .unwrap();
        assert_relative_eq!(graph.npv, eager.npv, max_relative = 1e-12);
        assert_relative_eq!(
            graph.additional_results["doubled"],
            eager.additional_results["doubled"],
            max_relative = 1e-12
        );
    }
}
