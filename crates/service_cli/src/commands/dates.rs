//! Dates command implementation
//!
//! Lists the simulation grid the configured script requires.

use anyhow::Result;
use pricer_script::collect_simulation_dates;

use crate::config::RunConfig;

/// Run the dates command
pub fn run(config: &RunConfig) -> Result<()> {
    let market = config.market()?;
    let script = config.script()?;
    let dates = collect_simulation_dates(
        &script,
        &config.trade.to_context(1),
        market.reference_date(),
        market.base_currency(),
    )?;
    if dates.is_empty() {
        println!("(no future dates)");
    }
    for date in dates {
        println!("{date}");
    }
    Ok(())
}
