//! Price command implementation
//!
//! Prices a portfolio of scripted trades against the configured market.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use pricer_risk::{Portfolio, PortfolioPricer};
use pricer_script::ScriptLibrary;
use serde_json::json;
use tracing::info;

use super::valuation_json;
use crate::config::RunConfig;
use crate::OutputFormat;

fn read(path: &str) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))
}

/// Run the price command
pub fn run(
    config: &RunConfig,
    portfolio_path: &str,
    library_path: &str,
    format: OutputFormat,
) -> Result<()> {
    let library = ScriptLibrary::from_toml_str(&read(library_path)?)
        .with_context(|| format!("invalid script library {library_path}"))?;
    let portfolio = Portfolio::from_toml_str(&read(portfolio_path)?)
        .with_context(|| format!("invalid portfolio {portfolio_path}"))?;
    info!(scripts = library.len(), trades = portfolio.len(), "inputs loaded");

    let pricer = PortfolioPricer::new(config.market()?, Arc::new(library), config.params(None)?)
        .with_model(config.model);
    let valuation = pricer.price(&portfolio);

    match format {
        OutputFormat::Json => {
            let trades: Vec<_> = valuation
                .outcomes()
                .iter()
                .map(|o| match &o.result {
                    Ok(v) => json!({ "id": o.id.as_str(), "valuation": valuation_json(v) }),
                    Err(e) => json!({ "id": o.id.as_str(), "error": e.to_string() }),
                })
                .collect();
            let doc = json!({ "total_npv": valuation.total_npv(), "trades": trades });
            println!("{}", serde_json::to_string_pretty(&doc)?);
        }
        OutputFormat::Table => {
            println!("\n┌────────────┬──────────────────┬──────────────────────────────────┐");
            println!("│ {:<10} │ {:>16} │ {:<32} │", "Trade ID", "NPV", "Status");
            println!("├────────────┼──────────────────┼──────────────────────────────────┤");
            for outcome in valuation.outcomes() {
                match &outcome.result {
                    Ok(v) => {
                        println!("│ {:<10} │ {:>16.6} │ {:<32} │", outcome.id.as_str(), v.npv, "ok")
                    }
                    Err(e) => {
                        let msg: String = e.to_string().chars().take(32).collect();
                        println!("│ {:<10} │ {:>16} │ {:<32} │", outcome.id.as_str(), "-", msg);
                    }
                }
            }
            println!("├────────────┼──────────────────┼──────────────────────────────────┤");
            println!("│ {:<10} │ {:>16.6} │ {:<32} │", "Total", valuation.total_npv(), "");
            println!("└────────────┴──────────────────┴──────────────────────────────────┘");
        }
    }
    Ok(())
}
