//! Portfolio pricing against Black-Scholes and LGM models.

use std::sync::Arc;

use approx::assert_relative_eq;
use pricer_core::market_data::CurveEnum;
use pricer_core::types::{Currency, Date};
use pricer_models::config::McParams;
use pricer_models::market::Market;
use pricer_models::models::{LgmParams, ModelKind};
use pricer_risk::parallel::ParallelConfig;
use pricer_risk::{Portfolio, PortfolioError, PortfolioPricer, Trade};
use pricer_script::{ScriptLibrary, TradeData};

const LIBRARY: &str = r#"
[[script]]
name = "EuropeanOption"
code = """
NUMBER Payoff;
Payoff = max(PutCall * (Underlying(Expiry) - Strike), 0);
Option = LOGPAY(Notional * Payoff, Expiry, Expiry, PayCcy);
"""

[[script]]
name = "Forward"
code = "Value = PAY(Notional * (Underlying(Expiry) - Strike), Expiry, Expiry, PayCcy);"
npv = "Value"
results = { notional = "Notional" }
"#;

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

fn today() -> Date {
    date(2024, 1, 2)
}

fn expiry() -> Date {
    date(2025, 1, 2)
}

fn market() -> Arc<Market> {
    Arc::new(
        Market::builder(today(), Currency::USD)
            .discount_curve(Currency::USD, CurveEnum::flat(0.03))
            .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
            .build()
            .unwrap(),
    )
}

fn library() -> Arc<ScriptLibrary> {
    Arc::new(ScriptLibrary::from_toml_str(LIBRARY).unwrap())
}

fn data(strike: f64) -> TradeData {
    TradeData::new()
        .index("Underlying", "EQ-SPX")
        .event("Expiry", expiry())
        .number("Strike", strike)
        .number("Notional", 10.0)
        .currency("PayCcy", Currency::USD)
}

fn option(id: &str, strike: f64, put_call: f64) -> Trade {
    Trade::new(id, "EuropeanOption", data(strike).number("PutCall", put_call))
}

fn pricer(samples: usize) -> PortfolioPricer {
    let params = McParams::builder().samples(samples).seed(7).build().unwrap();
    PortfolioPricer::new(market(), library(), params)
}

#[test]
fn test_put_call_parity_on_shared_paths() {
    let portfolio = Portfolio::builder()
        .add_trade(option("CALL", 105.0, 1.0))
        .add_trade(option("PUT", 105.0, -1.0))
        .add_trade(Trade::new("FWD", "Forward", data(105.0)))
        .build()
        .unwrap();
    let valuation = pricer(4_000).price(&portfolio);
    assert_eq!(valuation.failure_count(), 0);

    let npv = |id: &str| valuation.get(id).unwrap().result.as_ref().unwrap().npv;
    assert_relative_eq!(npv("CALL") - npv("PUT"), npv("FWD"), epsilon = 1e-9);

    let fwd = valuation.get("FWD").unwrap().result.as_ref().unwrap();
    assert_eq!(fwd.additional_results["notional"], 10.0);
    let m = market();
    let expected = 10.0
        * (m.forward("EQ-SPX", expiry()).unwrap() - 105.0)
        * m.discount_factor(Currency::USD, expiry()).unwrap();
    assert_relative_eq!(npv("FWD"), expected, max_relative = 0.05);
}

#[test]
fn test_parallel_and_sequential_agree() {
    let mut builder = Portfolio::builder();
    for i in 0..8 {
        builder = builder.add_trade(option(&format!("T{i}"), 90.0 + 2.5 * i as f64, 1.0));
    }
    let portfolio = builder.build().unwrap();

    let parallel = pricer(500)
        .with_parallel_config(ParallelConfig::new(1))
        .price(&portfolio);
    let sequential = pricer(500)
        .with_parallel_config(ParallelConfig::sequential())
        .price(&portfolio);

    for (a, b) in parallel.outcomes().iter().zip(sequential.outcomes()) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.result.as_ref().unwrap(), b.result.as_ref().unwrap());
    }
    // Higher strikes are worth less.
    let npvs: Vec<f64> = parallel
        .outcomes()
        .iter()
        .map(|o| o.result.as_ref().unwrap().npv)
        .collect();
    assert!(npvs.windows(2).all(|w| w[0] > w[1]));
}

#[test]
fn test_missing_market_data_is_isolated() {
    let orphan = Trade::new(
        "ORPHAN",
        "Forward",
        data(100.0).index("Underlying", "EQ-UNKNOWN"),
    );
    let portfolio = Portfolio::builder()
        .add_trade(orphan)
        .add_trade(option("CALL", 100.0, 1.0))
        .build()
        .unwrap();
    let valuation = pricer(200).price(&portfolio);

    assert_eq!(valuation.failure_count(), 1);
    let (id, err) = valuation.failures().next().unwrap();
    assert_eq!(id.as_str(), "ORPHAN");
    assert!(matches!(err, PortfolioError::Model(_) | PortfolioError::Script(_)));
    assert!(valuation.get("CALL").unwrap().result.is_ok());
}

#[test]
fn test_lgm_prices_deterministic_payment() {
    let library = Arc::new(
        ScriptLibrary::from_toml_str(
            r#"
            [[script]]
            name = "ZeroBond"
            code = "Option = PAY(Notional, Expiry, Expiry, PayCcy);"
            "#,
        )
        .unwrap(),
    );
    let params = McParams::builder().samples(2_000).build().unwrap();
    let pricer = PortfolioPricer::new(market(), library, params)
        .with_model(ModelKind::Lgm(LgmParams::new(0.03, 0.01).unwrap()));
    let trade = Trade::new("ZCB", "ZeroBond", data(0.0));

    let valuation = pricer.price_trade(&trade).unwrap();
    let df = market().discount_factor(Currency::USD, expiry()).unwrap();
    assert_relative_eq!(valuation.npv, 10.0 * df, max_relative = 0.02);
}

#[test]
fn test_portfolio_from_toml_prices() {
    let portfolio = Portfolio::from_toml_str(
        r#"
        [[trade]]
        id = "C1"
        product = "EuropeanOption"

        [trade.data]
        PutCall = 1.0
        Strike = 100.0
        Notional = 1.0
        Expiry = { event = "2025-01-02" }
        Underlying = { index = "EQ-SPX" }
        PayCcy = { currency = "USD" }
        "#,
    )
    .unwrap();
    let valuation = pricer(2_000).price(&portfolio);
    let npv = valuation.total_npv();
    assert!(npv > 6.0 && npv < 12.0, "npv = {npv}");
}
