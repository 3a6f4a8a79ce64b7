//! CLI command implementations
//!
//! Each submodule implements a specific CLI command.

pub mod dates;
pub mod price;
pub mod run;
pub mod step;

use pricer_risk::TradeValuation;
use serde_json::{json, Value};

/// JSON form of a trade valuation.
pub(crate) fn valuation_json(valuation: &TradeValuation) -> Value {
    let cashflows: Vec<Value> = valuation
        .cashflows
        .iter()
        .map(|cf| {
            json!({
                "leg": cf.leg,
                "type": cf.kind,
                "obs": cf.obs.to_string(),
                "pay": cf.pay.to_string(),
                "currency": cf.currency.to_string(),
                "amount": cf.amount,
                "value": cf.value,
            })
        })
        .collect();
    json!({
        "npv": valuation.npv,
        "additional_results": valuation.additional_results,
        "cashflows": cashflows,
    })
}

/// Prints a trade valuation as tables.
pub(crate) fn print_valuation(valuation: &TradeValuation) {
    println!("\n┌──────────────────────┬──────────────────┐");
    println!("│ {:<20} │ {:>16.6} │", "NPV", valuation.npv);
    for (name, value) in &valuation.additional_results {
        println!("│ {:<20} │ {:>16.6} │", name, value);
    }
    println!("└──────────────────────┴──────────────────┘");

    if valuation.cashflows.is_empty() {
        return;
    }
    println!("\n┌─────┬────────────┬────────────┬────────────┬─────┬──────────────┬──────────────┐");
    println!(
        "│ {:>3} │ {:<10} │ {:<10} │ {:<10} │ {:<3} │ {:>12} │ {:>12} │",
        "Leg", "Type", "Obs", "Pay", "Ccy", "Amount", "PV"
    );
    println!("├─────┼────────────┼────────────┼────────────┼─────┼──────────────┼──────────────┤");
    for cf in &valuation.cashflows {
        let leg = cf.leg.map(|l| l.to_string()).unwrap_or_default();
        println!(
            "│ {:>3} │ {:<10} │ {:<10} │ {:<10} │ {:<3} │ {:>12.4} │ {:>12.4} │",
            leg,
            cf.kind.as_deref().unwrap_or(""),
            cf.obs.to_string(),
            cf.pay.to_string(),
            cf.currency.to_string(),
            cf.amount,
            cf.value
        );
    }
    println!("└─────┴────────────┴────────────┴────────────┴─────┴──────────────┴──────────────┘");
}
