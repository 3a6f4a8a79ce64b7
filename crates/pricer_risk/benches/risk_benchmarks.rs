//! Criterion benchmarks for portfolio pricing.
//!
//! Compares sequential and rayon-parallel pricing of portfolios of
//! European options of varying size.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pricer_core::market_data::CurveEnum;
use pricer_core::types::{Currency, Date};
use pricer_models::config::McParams;
use pricer_models::market::Market;
use pricer_risk::parallel::ParallelConfig;
use pricer_risk::{Portfolio, PortfolioPricer, Trade};
use pricer_script::{ScriptLibrary, ScriptSource, TradeData};

fn pricer() -> PortfolioPricer {
    let today = Date::from_ymd(2024, 1, 2).unwrap();
    let market = Market::builder(today, Currency::USD)
        .discount_curve(Currency::USD, CurveEnum::flat(0.03))
        .equity("EQ-SPX", Currency::USD, 100.0, 0.2)
        .build()
        .unwrap();
    let library = ScriptLibrary::builder()
        .add(
            "EuropeanOption",
            ScriptSource::new(
                "Option = LOGPAY(max(Underlying(Expiry) - Strike, 0), Expiry, Expiry, PayCcy);",
            ),
        )
        .build()
        .unwrap();
    let params = McParams::builder().samples(2_000).build().unwrap();
    PortfolioPricer::new(Arc::new(market), Arc::new(library), params)
}

fn portfolio(n_trades: usize) -> Portfolio {
    (0..n_trades)
        .fold(Portfolio::builder(), |builder, i| {
            let data = TradeData::new()
                .index("Underlying", "EQ-SPX")
                .event("Expiry", Date::from_ymd(2025 + (i % 5) as i32, 1, 2).unwrap())
                .number("Strike", 80.0 + (i % 40) as f64)
                .currency("PayCcy", Currency::USD);
            builder.add_trade(Trade::new(format!("T{i}").as_str(), "EuropeanOption", data))
        })
        .build()
        .unwrap()
}

/// Benchmark sequential against parallel portfolio pricing.
fn bench_portfolio_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("portfolio_pricing");
    group.sample_size(10);

    for n_trades in [16, 128] {
        let portfolio = portfolio(n_trades);

        let sequential = pricer().with_parallel_config(ParallelConfig::sequential());
        group.bench_with_input(
            BenchmarkId::new("sequential", n_trades),
            &portfolio,
            |b, portfolio| b.iter(|| sequential.price(black_box(portfolio))),
        );

        let parallel = pricer().with_parallel_config(ParallelConfig::new(1));
        group.bench_with_input(
            BenchmarkId::new("parallel", n_trades),
            &portfolio,
            |b, portfolio| b.iter(|| parallel.price(black_box(portfolio))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_portfolio_pricing);
criterion_main!(benches);
