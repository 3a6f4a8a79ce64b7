//! Market data container shared by all model backends.
//!
//! A [`Market`] holds everything a model needs as of one reference date:
//! discount curves per currency, equity and FX indices with spot and flat
//! volatility, interest rate index definitions, pairwise correlations between
//! diffused indices and historical fixings. It is immutable once built and is
//! shared read-only between models through `Arc`.
//!
//! Dates are converted to model time with ACT/365 from the reference date.
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::CurveEnum;
//! use pricer_core::types::{Currency, Date};
//! use pricer_models::market::Market;
//!
//! let today = Date::from_ymd(2024, 1, 2).unwrap();
//! let market = Market::builder(today, Currency::USD)
//!     .discount_curve(Currency::USD, CurveEnum::flat(0.03))
//!     .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
//!     .build()
//!     .unwrap();
//!
//! let in_one_year = Date::from_ymd(2025, 1, 1).unwrap();
//! let forward = market.forward("EQ-SPX", in_one_year).unwrap();
//! assert!(forward > 100.0);
//! ```

use std::collections::BTreeMap;

use pricer_core::market_data::{CurveEnum, YieldCurve};
use pricer_core::types::{Currency, Date, DayCountConvention, Tenor};

use crate::error::ModelError;

/// Equity index: spot, currency, flat volatility and dividend curve.
#[derive(Debug, Clone, PartialEq)]
pub struct EquityIndex {
    /// Currency the index is quoted in
    pub currency: Currency,
    /// Spot level on the reference date
    pub spot: f64,
    /// Flat lognormal volatility
    pub volatility: f64,
    /// Dividend yield curve
    pub dividend: CurveEnum<f64>,
}

/// FX index quoting units of `domestic` per unit of `foreign`.
#[derive(Debug, Clone, PartialEq)]
pub struct FxIndex {
    /// Foreign (base) currency of the pair
    pub foreign: Currency,
    /// Domestic (quote) currency of the pair
    pub domestic: Currency,
    /// Spot rate on the reference date
    pub spot: f64,
    /// Flat lognormal volatility
    pub volatility: f64,
}

/// Interest rate index: a simply compounded rate over one tenor.
#[derive(Debug, Clone, PartialEq)]
pub struct RateIndex {
    /// Currency whose discount curve projects the index
    pub currency: Currency,
    /// Accrual period
    pub tenor: Tenor,
    /// Accrual day count
    pub day_count: DayCountConvention,
}

/// Borrowed view of one index definition.
#[derive(Debug, Clone, Copy)]
pub enum IndexKind<'a> {
    /// Equity index
    Equity(&'a EquityIndex),
    /// FX index
    Fx(&'a FxIndex),
    /// Interest rate index
    Rate(&'a RateIndex),
}

/// Immutable market snapshot.
#[derive(Debug, Clone)]
pub struct Market {
    reference_date: Date,
    base_currency: Currency,
    discount: BTreeMap<Currency, CurveEnum<f64>>,
    equities: BTreeMap<String, EquityIndex>,
    fx: BTreeMap<String, FxIndex>,
    rates: BTreeMap<String, RateIndex>,
    correlations: BTreeMap<(String, String), f64>,
    fixings: BTreeMap<(String, Date), f64>,
}

impl Market {
    /// Starts building a market as of `reference_date`.
    pub fn builder(reference_date: Date, base_currency: Currency) -> MarketBuilder {
        MarketBuilder {
            market: Market {
                reference_date,
                base_currency,
                discount: BTreeMap::new(),
                equities: BTreeMap::new(),
                fx: BTreeMap::new(),
                rates: BTreeMap::new(),
                correlations: BTreeMap::new(),
                fixings: BTreeMap::new(),
            },
        }
    }

    /// Valuation date.
    #[inline]
    pub fn reference_date(&self) -> Date {
        self.reference_date
    }

    /// Currency all values are expressed in.
    #[inline]
    pub fn base_currency(&self) -> Currency {
        self.base_currency
    }

    /// ACT/365 year fraction from the reference date; negative for past dates.
    #[inline]
    pub fn time(&self, date: Date) -> f64 {
        DayCountConvention::ActualActual365.year_fraction_dates(self.reference_date, date)
    }

    /// Discount curve of one currency.
    pub fn discount_curve(&self, ccy: Currency) -> Result<&CurveEnum<f64>, ModelError> {
        self.discount
            .get(&ccy)
            .ok_or_else(|| ModelError::MissingMarketData(format!("discount curve {ccy}")))
    }

    /// Today's discount factor to `date`; dates on or before today give 1.
    pub fn discount_factor(&self, ccy: Currency, date: Date) -> Result<f64, ModelError> {
        let t = self.time(date).max(0.0);
        Ok(self.discount_curve(ccy)?.discount_factor(t)?)
    }

    /// Looks up an index definition by name.
    pub fn index(&self, name: &str) -> Result<IndexKind<'_>, ModelError> {
        if let Some(eq) = self.equities.get(name) {
            return Ok(IndexKind::Equity(eq));
        }
        if let Some(fx) = self.fx.get(name) {
            return Ok(IndexKind::Fx(fx));
        }
        if let Some(ir) = self.rates.get(name) {
            return Ok(IndexKind::Rate(ir));
        }
        Err(ModelError::MissingMarketData(format!("index {name}")))
    }

    /// Names of the indices driven by a lognormal diffusion, equities first,
    /// each group in name order.
    pub fn diffused_indices(&self) -> Vec<String> {
        self.equities.keys().chain(self.fx.keys()).cloned().collect()
    }

    /// Currency an index value is quoted in.
    pub fn index_currency(&self, name: &str) -> Result<Currency, ModelError> {
        Ok(match self.index(name)? {
            IndexKind::Equity(eq) => eq.currency,
            IndexKind::Fx(fx) => fx.domestic,
            IndexKind::Rate(ir) => ir.currency,
        })
    }

    /// Spot and volatility of a diffused index.
    pub fn spot_and_volatility(&self, name: &str) -> Result<(f64, f64), ModelError> {
        match self.index(name)? {
            IndexKind::Equity(eq) => Ok((eq.spot, eq.volatility)),
            IndexKind::Fx(fx) => Ok((fx.spot, fx.volatility)),
            IndexKind::Rate(_) => Err(ModelError::invalid(
                "index",
                format!("{name} is an interest rate index"),
            )),
        }
    }

    /// Deterministic growth factor of a diffused index from `from` to `to`:
    /// the ratio of income to funding discount factors.
    pub fn carry(&self, name: &str, from: Date, to: Date) -> Result<f64, ModelError> {
        let (income, funding) = self.carry_curves(name)?;
        let t1 = self.time(from).max(0.0);
        let t2 = self.time(to).max(0.0);
        Ok(income.forward_discount(t1, t2)? / funding.forward_discount(t1, t2)?)
    }

    /// Today's forward of a diffused index to `date`.
    pub fn forward(&self, name: &str, date: Date) -> Result<f64, ModelError> {
        let (spot, _) = self.spot_and_volatility(name)?;
        Ok(spot * self.carry(name, self.reference_date, date)?)
    }

    fn carry_curves(&self, name: &str) -> Result<(&CurveEnum<f64>, &CurveEnum<f64>), ModelError> {
        match self.index(name)? {
            IndexKind::Equity(eq) => Ok((&eq.dividend, self.discount_curve(eq.currency)?)),
            IndexKind::Fx(fx) => Ok((
                self.discount_curve(fx.foreign)?,
                self.discount_curve(fx.domestic)?,
            )),
            IndexKind::Rate(_) => Err(ModelError::invalid(
                "index",
                format!("{name} is not a diffused index"),
            )),
        }
    }

    /// Rate index fixing projected from today's curve.
    pub fn rate_forward(&self, name: &str, start: Date) -> Result<f64, ModelError> {
        let index = self.rate_index(name)?;
        let end = index.tenor.advance(start)?;
        let accrual = index.day_count.year_fraction_dates(start, end);
        let p_start = self.discount_factor(index.currency, start)?;
        let p_end = self.discount_factor(index.currency, end)?;
        Ok((p_start / p_end - 1.0) / accrual)
    }

    /// Rate index definition.
    pub fn rate_index(&self, name: &str) -> Result<&RateIndex, ModelError> {
        self.rates
            .get(name)
            .ok_or_else(|| ModelError::MissingMarketData(format!("rate index {name}")))
    }

    /// FX index converting `ccy` into `target`: the index name and whether
    /// its quote must be inverted.
    pub fn fx_pair(&self, ccy: Currency, target: Currency) -> Option<(&str, bool)> {
        self.fx.iter().find_map(|(name, fx)| {
            if fx.foreign == ccy && fx.domestic == target {
                Some((name.as_str(), false))
            } else if fx.foreign == target && fx.domestic == ccy {
                Some((name.as_str(), true))
            } else {
                None
            }
        })
    }

    /// Today's FX rate converting `ccy` into the base currency.
    pub fn fx_spot_to_base(&self, ccy: Currency) -> Result<f64, ModelError> {
        if ccy == self.base_currency {
            return Ok(1.0);
        }
        let (name, inverted) = self.fx_pair(ccy, self.base_currency).ok_or_else(|| {
            ModelError::MissingMarketData(format!("FX rate {ccy}/{}", self.base_currency))
        })?;
        let (spot, _) = self.spot_and_volatility(name)?;
        Ok(if inverted { 1.0 / spot } else { spot })
    }

    /// Correlation between two diffused indices; zero when not given.
    pub fn correlation(&self, first: &str, second: &str) -> f64 {
        if first == second {
            return 1.0;
        }
        self.correlations
            .get(&(first.to_string(), second.to_string()))
            .or_else(|| self.correlations.get(&(second.to_string(), first.to_string())))
            .copied()
            .unwrap_or(0.0)
    }

    /// Historical fixing of an index, if recorded.
    pub fn fixing(&self, index: &str, date: Date) -> Option<f64> {
        self.fixings.get(&(index.to_string(), date)).copied()
    }

    /// Historical fixing of an index.
    ///
    /// # Errors
    ///
    /// `MissingMarketData` if no fixing is recorded for `date`.
    pub fn historical_fixing(&self, index: &str, date: Date) -> Result<f64, ModelError> {
        self.fixing(index, date)
            .ok_or_else(|| ModelError::MissingMarketData(format!("fixing {index} on {date}")))
    }
}

/// Builder for [`Market`].
#[derive(Debug, Clone)]
pub struct MarketBuilder {
    market: Market,
}

impl MarketBuilder {
    /// Adds the discount curve of one currency.
    pub fn discount_curve(mut self, ccy: Currency, curve: CurveEnum<f64>) -> Self {
        self.market.discount.insert(ccy, curve);
        self
    }

    /// Adds an equity index without dividends.
    pub fn equity(self, name: &str, currency: Currency, spot: f64, volatility: f64) -> Self {
        self.equity_with_dividends(name, currency, spot, volatility, CurveEnum::flat(0.0))
    }

    /// Adds an equity index with a dividend yield curve.
    pub fn equity_with_dividends(
        mut self,
        name: &str,
        currency: Currency,
        spot: f64,
        volatility: f64,
        dividend: CurveEnum<f64>,
    ) -> Self {
        self.market.equities.insert(
            name.to_string(),
            EquityIndex {
                currency,
                spot,
                volatility,
                dividend,
            },
        );
        self
    }

    /// Adds an FX index quoting `domestic` per unit of `foreign`.
    pub fn fx(
        mut self,
        name: &str,
        foreign: Currency,
        domestic: Currency,
        spot: f64,
        volatility: f64,
    ) -> Self {
        self.market.fx.insert(
            name.to_string(),
            FxIndex {
                foreign,
                domestic,
                spot,
                volatility,
            },
        );
        self
    }

    /// Adds an interest rate index.
    pub fn rate_index(
        mut self,
        name: &str,
        currency: Currency,
        tenor: Tenor,
        day_count: DayCountConvention,
    ) -> Self {
        self.market.rates.insert(
            name.to_string(),
            RateIndex {
                currency,
                tenor,
                day_count,
            },
        );
        self
    }

    /// Sets the correlation between two diffused indices.
    pub fn correlation(mut self, first: &str, second: &str, value: f64) -> Self {
        self.market
            .correlations
            .insert((first.to_string(), second.to_string()), value);
        self
    }

    /// Records a historical fixing.
    pub fn fixing(mut self, index: &str, date: Date, value: f64) -> Self {
        self.market.fixings.insert((index.to_string(), date), value);
        self
    }

    /// Validates and returns the market.
    ///
    /// # Errors
    ///
    /// - `MissingMarketData` if the base currency has no discount curve
    /// - `InvalidParameter` for non-positive spots, negative volatilities or
    ///   correlations outside [-1, 1]
    pub fn build(self) -> Result<Market, ModelError> {
        let market = self.market;
        market.discount_curve(market.base_currency)?;
        for name in market.diffused_indices() {
            let (spot, vol) = market.spot_and_volatility(&name)?;
            if spot.is_nan() || spot <= 0.0 {
                return Err(ModelError::invalid("spot", format!("{name}: {spot}")));
            }
            if vol < 0.0 {
                return Err(ModelError::invalid("volatility", format!("{name}: {vol}")));
            }
            market.discount_curve(market.index_currency(&name)?)?;
        }
        for ((a, b), rho) in &market.correlations {
            if !(-1.0..=1.0).contains(rho) {
                return Err(ModelError::invalid("correlation", format!("{a}/{b}: {rho}")));
            }
        }
        Ok(market)
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[cfg(feature = "serde")]
pub use config::MarketConfig;

#[cfg(feature = "serde")]
mod config {
    use std::collections::BTreeMap;
    use std::str::FromStr;

    use pricer_core::market_data::CurveSpec;
    use pricer_core::types::{Currency, Date, DayCountConvention, Tenor};
    use serde::Deserialize;

    use super::Market;
    use crate::error::ModelError;

    /// TOML description of a [`Market`].
    ///
    /// ```toml
    /// reference_date = "2024-01-02"
    /// base_currency = "USD"
    ///
    /// [discount]
    /// USD = { flat = 0.03 }
    ///
    /// [[equity]]
    /// name = "EQ-SPX"
    /// currency = "USD"
    /// spot = 100.0
    /// volatility = 0.2
    /// ```
    #[derive(Debug, Clone, Deserialize)]
    pub struct MarketConfig {
        /// Valuation date, `YYYY-MM-DD`
        pub reference_date: Date,
        /// Base currency code
        pub base_currency: String,
        /// Discount curves keyed by currency code
        #[serde(default)]
        pub discount: BTreeMap<String, CurveSpec>,
        /// Equity indices
        #[serde(default)]
        pub equity: Vec<EquityConfig>,
        /// FX indices
        #[serde(default)]
        pub fx: Vec<FxConfig>,
        /// Interest rate indices
        #[serde(default)]
        pub rate_index: Vec<RateIndexConfig>,
        /// Pairwise correlations
        #[serde(default)]
        pub correlation: Vec<CorrelationConfig>,
        /// Historical fixings
        #[serde(default)]
        pub fixing: Vec<FixingConfig>,
    }

    /// Equity index entry.
    #[derive(Debug, Clone, Deserialize)]
    pub struct EquityConfig {
        /// Index name
        pub name: String,
        /// Currency code
        pub currency: String,
        /// Spot level
        pub spot: f64,
        /// Flat volatility
        pub volatility: f64,
        /// Dividend curve, zero when omitted
        pub dividend: Option<CurveSpec>,
    }

    /// FX index entry.
    #[derive(Debug, Clone, Deserialize)]
    pub struct FxConfig {
        /// Index name
        pub name: String,
        /// Foreign currency code
        pub foreign: String,
        /// Domestic currency code
        pub domestic: String,
        /// Spot rate
        pub spot: f64,
        /// Flat volatility
        pub volatility: f64,
    }

    /// Interest rate index entry.
    #[derive(Debug, Clone, Deserialize)]
    pub struct RateIndexConfig {
        /// Index name
        pub name: String,
        /// Currency code
        pub currency: String,
        /// Tenor such as `6M`
        pub tenor: String,
        /// Day count name such as `A360`
        #[serde(default = "default_day_count")]
        pub day_count: String,
    }

    fn default_day_count() -> String {
        DayCountConvention::ActualActual360.name().to_string()
    }

    /// Correlation entry.
    #[derive(Debug, Clone, Deserialize)]
    pub struct CorrelationConfig {
        /// First index name
        pub first: String,
        /// Second index name
        pub second: String,
        /// Correlation in [-1, 1]
        pub value: f64,
    }

    /// Historical fixing entry.
    #[derive(Debug, Clone, Deserialize)]
    pub struct FixingConfig {
        /// Index name
        pub index: String,
        /// Fixing date
        pub date: Date,
        /// Fixing value
        pub value: f64,
    }

    fn currency(code: &str) -> Result<Currency, ModelError> {
        Currency::from_str(code).map_err(|e| ModelError::Config(e.to_string()))
    }

    impl MarketConfig {
        /// Parses a market description from TOML text.
        pub fn from_toml_str(text: &str) -> Result<Self, ModelError> {
            toml::from_str(text).map_err(|e| ModelError::Config(e.to_string()))
        }

        /// Builds the described market.
        pub fn build(&self) -> Result<Market, ModelError> {
            let mut builder = Market::builder(self.reference_date, currency(&self.base_currency)?);
            for (code, spec) in &self.discount {
                builder = builder.discount_curve(currency(code)?, spec.build()?);
            }
            for eq in &self.equity {
                let dividend = match &eq.dividend {
                    Some(spec) => spec.build()?,
                    None => pricer_core::market_data::CurveEnum::flat(0.0),
                };
                builder = builder.equity_with_dividends(
                    &eq.name,
                    currency(&eq.currency)?,
                    eq.spot,
                    eq.volatility,
                    dividend,
                );
            }
            for fx in &self.fx {
                builder = builder.fx(
                    &fx.name,
                    currency(&fx.foreign)?,
                    currency(&fx.domestic)?,
                    fx.spot,
                    fx.volatility,
                );
            }
            for ir in &self.rate_index {
                let tenor =
                    Tenor::from_str(&ir.tenor).map_err(|e| ModelError::Config(e.to_string()))?;
                let day_count = DayCountConvention::from_str(&ir.day_count)?;
                builder = builder.rate_index(&ir.name, currency(&ir.currency)?, tenor, day_count);
            }
            for c in &self.correlation {
                builder = builder.correlation(&c.first, &c.second, c.value);
            }
            for f in &self.fixing {
                builder = builder.fixing(&f.index, f.date, f.value);
            }
            builder.build()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn today() -> Date {
        Date::from_ymd(2024, 1, 2).unwrap()
    }

    fn market() -> Market {
        Market::builder(today(), Currency::USD)
            .discount_curve(Currency::USD, CurveEnum::flat(0.03))
            .discount_curve(Currency::EUR, CurveEnum::flat(0.01))
            .equity_with_dividends("EQ-SPX", Currency::USD, 100.0, 0.2, CurveEnum::flat(0.01))
            .fx("FX-ECB-EUR-USD", Currency::EUR, Currency::USD, 1.1, 0.1)
            .rate_index(
                "IR-USD-LIBOR-6M",
                Currency::USD,
                Tenor::Months(6),
                DayCountConvention::ActualActual360,
            )
            .correlation("EQ-SPX", "FX-ECB-EUR-USD", 0.3)
            .fixing("EQ-SPX", Date::from_ymd(2023, 12, 29).unwrap(), 98.5)
            .build()
            .unwrap()
    }

    #[test]
    fn test_equity_forward_uses_dividend_and_funding() {
        let m = market();
        let date = today().add_days(365).unwrap();
        assert_relative_eq!(
            m.forward("EQ-SPX", date).unwrap(),
            100.0 * (0.02_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_fx_forward_is_covered_interest_parity() {
        let m = market();
        let date = today().add_days(730).unwrap();
        assert_relative_eq!(
            m.forward("FX-ECB-EUR-USD", date).unwrap(),
            1.1 * (0.04_f64).exp(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_fx_pair_lookup_and_inversion() {
        let m = market();
        assert_eq!(m.fx_pair(Currency::EUR, Currency::USD), Some(("FX-ECB-EUR-USD", false)));
        assert_eq!(m.fx_pair(Currency::USD, Currency::EUR), Some(("FX-ECB-EUR-USD", true)));
        assert_eq!(m.fx_pair(Currency::GBP, Currency::USD), None);
        assert_eq!(m.fx_spot_to_base(Currency::USD).unwrap(), 1.0);
        assert_relative_eq!(m.fx_spot_to_base(Currency::EUR).unwrap(), 1.1);
        assert!(matches!(
            m.fx_spot_to_base(Currency::GBP),
            Err(ModelError::MissingMarketData(_))
        ));
    }

    #[test]
    fn test_correlation_is_symmetric_with_unit_diagonal() {
        let m = market();
        assert_eq!(m.correlation("FX-ECB-EUR-USD", "EQ-SPX"), 0.3);
        assert_eq!(m.correlation("EQ-SPX", "EQ-SPX"), 1.0);
        assert_eq!(m.correlation("EQ-SPX", "EQ-OTHER"), 0.0);
    }

    #[test]
    fn test_rate_forward_from_flat_curve() {
        let m = market();
        let start = Date::from_ymd(2025, 1, 2).unwrap();
        let end = Date::from_ymd(2025, 7, 2).unwrap();
        let tau = DayCountConvention::ActualActual360.year_fraction_dates(start, end);
        let growth = (0.03 * (end - start) as f64 / 365.0).exp();
        assert_relative_eq!(
            m.rate_forward("IR-USD-LIBOR-6M", start).unwrap(),
            (growth - 1.0) / tau,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_unknown_index_and_fixings() {
        let m = market();
        assert!(matches!(m.index("EQ-NONE"), Err(ModelError::MissingMarketData(_))));
        assert_eq!(m.fixing("EQ-SPX", Date::from_ymd(2023, 12, 29).unwrap()), Some(98.5));
        assert_eq!(m.fixing("EQ-SPX", Date::from_ymd(2023, 12, 28).unwrap()), None);
        assert_eq!(m.diffused_indices(), vec!["EQ-SPX", "FX-ECB-EUR-USD"]);
    }

    #[test]
    fn test_build_rejects_bad_inputs() {
        let missing_base = Market::builder(today(), Currency::USD).build();
        assert!(matches!(missing_base, Err(ModelError::MissingMarketData(_))));

        let bad_spot = Market::builder(today(), Currency::USD)
            .discount_curve(Currency::USD, CurveEnum::flat(0.0))
            .equity("EQ-X", Currency::USD, 0.0, 0.2)
            .build();
        assert!(matches!(bad_spot, Err(ModelError::InvalidParameter { name: "spot", .. })));

        let bad_rho = Market::builder(today(), Currency::USD)
            .discount_curve(Currency::USD, CurveEnum::flat(0.0))
            .correlation("A", "B", 1.5)
            .build();
        assert!(matches!(
            bad_rho,
            Err(ModelError::InvalidParameter {
                name: "correlation",
                ..
            })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_market_config_from_toml() {
        let text = r#"
            reference_date = "2024-01-02"
            base_currency = "USD"

            [discount]
            USD = { flat = 0.03 }
            EUR = { times = [1.0, 5.0], zero_rates = [0.01, 0.015] }

            [[equity]]
            name = "EQ-SPX"
            currency = "USD"
            spot = 100.0
            volatility = 0.2

            [[fx]]
            name = "FX-ECB-EUR-USD"
            foreign = "EUR"
            domestic = "USD"
            spot = 1.1
            volatility = 0.1

            [[rate_index]]
            name = "IR-USD-LIBOR-3M"
            currency = "USD"
            tenor = "3M"

            [[correlation]]
            first = "EQ-SPX"
            second = "FX-ECB-EUR-USD"
            value = -0.2

            [[fixing]]
            index = "EQ-SPX"
            date = "2023-12-29"
            value = 99.0
        "#;
        let market = MarketConfig::from_toml_str(text).unwrap().build().unwrap();
        assert_eq!(market.reference_date(), today());
        assert_eq!(market.base_currency(), Currency::USD);
        assert_eq!(market.correlation("FX-ECB-EUR-USD", "EQ-SPX"), -0.2);
        assert_eq!(market.fixing("EQ-SPX", Date::from_ymd(2023, 12, 29).unwrap()), Some(99.0));
        assert_eq!(
            market.rate_index("IR-USD-LIBOR-3M").unwrap().day_count,
            DayCountConvention::ActualActual360
        );
    }
}
