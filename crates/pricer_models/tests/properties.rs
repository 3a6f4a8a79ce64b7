//! Properties of Monte Carlo parameters and the Black-Scholes backend.

use std::sync::Arc;

use pricer_core::market_data::CurveEnum;
use pricer_core::types::{Currency, Date};
use pricer_models::config::McParams;
use pricer_models::market::Market;
use pricer_models::models::{BlackScholesModel, Model};
use proptest::prelude::*;

fn date_from_offset(days: i64) -> Date {
    Date::from_ymd(2024, 1, 2).unwrap().add_days(days).unwrap()
}

proptest! {
    #[test]
    fn simulation_grid_is_sorted_and_unique(offsets in prop::collection::vec(1i64..2_000, 0..20)) {
        let dates: Vec<Date> = offsets.iter().map(|d| date_from_offset(*d)).collect();
        let params = McParams::builder().samples(1).simulation_dates(dates.clone()).build().unwrap();
        let grid = params.simulation_dates();
        prop_assert!(grid.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(dates.iter().all(|d| grid.contains(d)));
    }

    #[test]
    fn zero_volatility_fixings_equal_the_forward(
        spot in 1.0f64..500.0,
        rate in -0.02f64..0.08,
        days in 1i64..1_500,
    ) {
        let today = date_from_offset(0);
        let obs = date_from_offset(days);
        let market = Arc::new(
            Market::builder(today, Currency::USD)
                .discount_curve(Currency::USD, CurveEnum::flat(rate))
                .equity("EQ-X", Currency::USD, spot, 0.0)
                .build()
                .unwrap(),
        );
        let params = McParams::builder().samples(8).simulation_dates(vec![obs]).build().unwrap();
        let mut model = BlackScholesModel::new(Arc::clone(&market), params).unwrap();

        let fixing = model.fixing("EQ-X", obs, None).unwrap();
        let forward = market.forward("EQ-X", obs).unwrap();
        let lanes = fixing.as_paths().unwrap();
        for p in 0..8 {
            prop_assert!((lanes.at(p) - forward).abs() <= 1e-10 * forward);
        }
    }
}
