//! Run configuration.
//!
//! ```toml
//! [market]
//! reference_date = "2024-01-02"
//! base_currency = "USD"
//! discount = { USD = { flat = 0.03 } }
//! equity = [{ name = "EQ-SPX", currency = "USD", spot = 100.0, volatility = 0.2 }]
//!
//! [mc]
//! samples = 10000
//! seed = 42
//!
//! [model]
//! type = "black-scholes"
//!
//! [script]
//! code = "Option = LOGPAY(max(Underlying(Expiry) - Strike, 0), Expiry, Expiry, PayCcy);"
//!
//! [trade]
//! Strike = 100.0
//! Expiry = { event = "2025-01-02" }
//! Underlying = { index = "EQ-SPX" }
//! PayCcy = { currency = "USD" }
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use pricer_core::types::Date;
use pricer_models::config::{McConfig, McParams};
use pricer_models::market::{Market, MarketConfig};
use pricer_models::models::ModelKind;
use pricer_script::{collect_simulation_dates, Script, ScriptSource, TradeData};
use serde::Deserialize;
use tracing::info;

/// Product name under which the configured script is registered.
pub const SCRIPT_PRODUCT: &str = "Script";

/// Contents of the configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Market description
    pub market: MarketConfig,
    /// Monte Carlo parameters
    #[serde(default)]
    pub mc: McConfig,
    /// Model backend
    #[serde(default)]
    pub model: ModelKind,
    /// Script for `run`, `step` and `dates`
    pub script: Option<ScriptSource>,
    /// Trade constants for the script
    #[serde(default)]
    pub trade: TradeData,
}

impl RunConfig {
    /// Reads and parses the file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read configuration {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("invalid configuration {}", path.display()))
    }

    /// Parses configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builds the market.
    pub fn market(&self) -> Result<Arc<Market>> {
        Ok(Arc::new(self.market.build()?))
    }

    /// Parses the configured script.
    pub fn script(&self) -> Result<Script> {
        let source = self
            .script
            .as_ref()
            .context("configuration has no [script] table")?;
        Ok(source.to_script(Some(SCRIPT_PRODUCT))?)
    }

    /// Monte Carlo parameters with an optional path count override.
    pub fn params(&self, samples: Option<usize>) -> Result<McParams> {
        let mut mc = self.mc.clone();
        if let Some(n) = samples {
            mc.samples = n;
        }
        Ok(mc.to_params()?)
    }

    /// Simulation dates: the configured grid, or the dates the script needs.
    pub fn simulation_dates(&self, script: &Script, market: &Market) -> Result<Vec<Date>> {
        if !self.mc.simulation_dates.is_empty() {
            return Ok(self.mc.simulation_dates.clone());
        }
        let dates = collect_simulation_dates(
            script,
            &self.trade.to_context(1),
            market.reference_date(),
            market.base_currency(),
        )?;
        info!(dates = dates.len(), "simulation grid derived from script");
        Ok(dates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
        [market]
        reference_date = "2024-01-02"
        base_currency = "USD"
        discount = { USD = { flat = 0.03 } }
        equity = [{ name = "EQ-SPX", currency = "USD", spot = 100.0, volatility = 0.2 }]

        [mc]
        samples = 500

        [model]
        type = "lgm"
        reversion = 0.03
        volatility = 0.01

        [script]
        code = "Option = PAY(Strike, Expiry, Expiry, PayCcy);"

        [trade]
        Strike = 100.0
        Expiry = { event = "2025-01-02" }
        PayCcy = { currency = "USD" }
    "#;

    #[test]
    fn test_config_loads_every_section() {
        let config = RunConfig::from_toml_str(CONFIG).unwrap();
        assert!(matches!(config.model, ModelKind::Lgm(_)));
        assert_eq!(config.params(None).unwrap().samples(), 500);
        assert_eq!(config.params(Some(64)).unwrap().samples(), 64);

        let market = config.market().unwrap();
        let script = config.script().unwrap();
        let dates = config.simulation_dates(&script, &market).unwrap();
        assert_eq!(dates, vec![Date::from_ymd(2025, 1, 2).unwrap()]);
    }

    #[test]
    fn test_missing_script_is_reported() {
        let config = RunConfig::from_toml_str(
            r#"
            [market]
            reference_date = "2024-01-02"
            base_currency = "USD"
            "#,
        )
        .unwrap();
        assert_eq!(config.model, ModelKind::BlackScholes);
        let err = config.script().unwrap_err();
        assert!(err.to_string().contains("[script]"));
    }
}
