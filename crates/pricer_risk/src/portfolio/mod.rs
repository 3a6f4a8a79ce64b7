//! Trades and portfolios.
//!
//! A [`Trade`] is an identifier, a product type naming a script in the
//! [`pricer_script::ScriptLibrary`], and the [`TradeData`] that script reads.
//!
//! ```toml
//! [[trade]]
//! id = "T1"
//! product = "EuropeanOption"
//!
//! [trade.data]
//! Strike = 100.0
//! Expiry = { event = "2025-01-02" }
//! Underlying = { index = "EQ-SPX" }
//! PayCcy = { currency = "USD" }
//! ```

mod error;
mod ids;

use std::collections::HashSet;

use pricer_script::TradeData;

pub use error::PortfolioError;
pub use ids::TradeId;

/// A scripted trade.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct Trade {
    /// Trade ID
    pub id: TradeId,
    /// Product type, the script library key
    pub product: String,
    /// Constants bound into the script's context
    #[cfg_attr(feature = "serde", serde(default))]
    pub data: TradeData,
}

impl Trade {
    /// Creates a trade.
    pub fn new(id: impl Into<TradeId>, product: impl Into<String>, data: TradeData) -> Self {
        Self {
            id: id.into(),
            product: product.into(),
            data,
        }
    }
}

/// Collection of trades with unique IDs.
#[derive(Debug, Clone)]
pub struct Portfolio {
    trades: Vec<Trade>,
}

impl Portfolio {
    /// Builder collecting trades.
    pub fn builder() -> PortfolioBuilder {
        PortfolioBuilder::default()
    }

    /// Trades in insertion order.
    #[inline]
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// Number of trades.
    #[inline]
    pub fn len(&self) -> usize {
        self.trades.len()
    }

    /// Whether the portfolio has no trades.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Loads `[[trade]]` tables from TOML text.
    #[cfg(feature = "serde")]
    pub fn from_toml_str(text: &str) -> Result<Self, PortfolioError> {
        #[derive(serde::Deserialize)]
        struct File {
            #[serde(default)]
            trade: Vec<Trade>,
        }

        let file: File =
            toml::from_str(text).map_err(|e| PortfolioError::Config(e.to_string()))?;
        file.trade
            .into_iter()
            .fold(Self::builder(), PortfolioBuilder::add_trade)
            .build()
    }
}

/// Builder for [`Portfolio`].
#[derive(Debug, Clone, Default)]
pub struct PortfolioBuilder {
    trades: Vec<Trade>,
}

impl PortfolioBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trade.
    pub fn add_trade(mut self, trade: Trade) -> Self {
        self.trades.push(trade);
        self
    }

    /// Validates and builds the portfolio.
    ///
    /// # Errors
    ///
    /// `EmptyPortfolio` without trades, `DuplicateTrade` when an ID repeats.
    pub fn build(self) -> Result<Portfolio, PortfolioError> {
        if self.trades.is_empty() {
            return Err(PortfolioError::EmptyPortfolio);
        }
        let mut seen = HashSet::with_capacity(self.trades.len());
        for trade in &self.trades {
            if !seen.insert(trade.id.as_str()) {
                return Err(PortfolioError::DuplicateTrade(trade.id.to_string()));
            }
        }
        Ok(Portfolio {
            trades: self.trades,
        })
    }
}
