//! Algebraic properties of vectorised path values.

use pricer_core::vectorized::{Comparison, PathVector, RandomVariable};
use proptest::prelude::*;

fn lanes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1e3f64..1e3, 1..32)
}

proptest! {
    #[test]
    fn expectation_is_affine(xs in lanes(), a in -10.0f64..10.0, b in -10.0f64..10.0) {
        let n = xs.len();
        let x: RandomVariable = PathVector::from_paths(xs).into();
        let y = x
            .mul(&RandomVariable::constant(n, a))
            .unwrap()
            .add(&RandomVariable::constant(n, b))
            .unwrap();
        let lhs = y.expectation().unwrap();
        let rhs = a * x.expectation().unwrap() + b;
        prop_assert!((lhs - rhs).abs() <= 1e-9 * (1.0 + rhs.abs()));
    }

    #[test]
    fn complementary_selects_partition_lanes(xs in lanes(), k in -1e3f64..1e3) {
        let n = xs.len();
        let x: RandomVariable = PathVector::from_paths(xs.clone()).into();
        let one = RandomVariable::constant(n, 1.0);
        let zero = RandomVariable::constant(n, 0.0);
        let above = x.compare(&RandomVariable::constant(n, k), Comparison::Gt).unwrap();
        let below = above.not().unwrap();

        let hits = RandomVariable::select(&above, &one, &zero)
            .unwrap()
            .add(&RandomVariable::select(&below, &one, &zero).unwrap())
            .unwrap();
        prop_assert_eq!(hits.expectation().unwrap(), 1.0);

        let count = xs.iter().filter(|v| **v > k).count() as f64;
        let share = above.to_indicator().expectation().unwrap();
        prop_assert!((share - count / n as f64).abs() < 1e-12);
    }
}
