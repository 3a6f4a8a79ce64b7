//! Step command implementation
//!
//! Executes the script one top-level statement at a time and prints the
//! context after each.

use anyhow::{bail, Result};
use pricer_models::models::{Model, ModelKind, ScriptModel};
use pricer_script::Stepper;

use crate::config::RunConfig;

/// Run the step command
pub fn run(config: &RunConfig, samples: Option<usize>) -> Result<()> {
    if config.model == ModelKind::Graph {
        bail!("stepping needs an eager model; the graph backend yields no path values");
    }
    let market = config.market()?;
    let script = config.script()?;
    let dates = config.simulation_dates(&script, &market)?;
    let params = config.params(samples)?.with_simulation_dates(dates);

    let mut model = ScriptModel::build(config.model, market, params)?;
    let mut context = config.trade.to_context(model.size());
    let source: Vec<&str> = script.source().lines().collect();

    let mut stepper = Stepper::new(&script, &mut context, &mut model);
    while let Some(location) = stepper.step()? {
        let line = source.get(location.line - 1).map_or("", |l| l.trim());
        println!("── {location}: {line}");
        print!("{}", stepper.context());
    }

    let result = stepper.finish()?;
    println!("── NPV = {:.6}", result.npv()?);
    for (name, value) in &result.additional_results {
        println!("   {name} = {:.6}", value.expectation()?);
    }
    Ok(())
}
