//! Run command implementation
//!
//! Evaluates the configured script as a one-trade portfolio.

use std::sync::Arc;

use anyhow::Result;
use pricer_risk::parallel::ParallelConfig;
use pricer_risk::{PortfolioPricer, Trade};
use pricer_script::ScriptLibrary;
use tracing::info;

use super::{print_valuation, valuation_json};
use crate::config::{RunConfig, SCRIPT_PRODUCT};
use crate::OutputFormat;

/// Run the run command
pub fn run(config: &RunConfig, samples: Option<usize>, format: OutputFormat) -> Result<()> {
    let market = config.market()?;
    let script = config.script()?;
    let dates = config.simulation_dates(&script, &market)?;
    let params = config.params(samples)?.with_simulation_dates(dates);
    info!(samples = params.samples(), model = ?config.model, "evaluating script");

    let library = ScriptLibrary::builder()
        .add(SCRIPT_PRODUCT, config.script.clone().unwrap_or_default())
        .build()?;
    let pricer = PortfolioPricer::new(market, Arc::new(library), params)
        .with_model(config.model)
        .with_parallel_config(ParallelConfig::sequential());
    let trade = Trade::new("script", SCRIPT_PRODUCT, config.trade.clone());
    let valuation = pricer.price_trade(&trade)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&valuation_json(&valuation))?),
        OutputFormat::Table => print_valuation(&valuation),
    }
    Ok(())
}
