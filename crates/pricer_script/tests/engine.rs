//! End-to-end evaluation of scripts against the model backends.

use std::sync::Arc;

use approx::assert_relative_eq;
use pricer_core::graph::GraphExecutor;
use pricer_core::market_data::CurveEnum;
use pricer_core::math::black_formula;
use pricer_core::types::{Currency, Date, DayCountConvention, Tenor};
use pricer_core::vectorized::RandomVariable;
use pricer_models::config::McParams;
use pricer_models::market::Market;
use pricer_models::models::{
    BlackScholesModel, GraphModel, LgmParams, Model, ModelKind, ScriptModel,
};
use pricer_models::ModelError;
use pricer_script::{
    evaluate, EngineState, Script, ScriptEngine, ScriptError, Stepper, TradeData, Value,
};

fn date(y: i32, m: u32, d: u32) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

fn today() -> Date {
    date(2024, 1, 2)
}

fn mid() -> Date {
    date(2024, 7, 1)
}

fn expiry() -> Date {
    date(2025, 1, 2)
}

fn late() -> Date {
    date(2025, 7, 1)
}

fn market(vol: f64) -> Arc<Market> {
    Arc::new(
        Market::builder(today(), Currency::USD)
            .discount_curve(Currency::USD, CurveEnum::flat(0.03))
            .discount_curve(Currency::EUR, CurveEnum::flat(0.01))
            .equity("EQ-SPX", Currency::USD, 100.0, vol)
            .fx("FX-ECB-EUR-USD", Currency::EUR, Currency::USD, 1.1, 0.1)
            .correlation("EQ-SPX", "FX-ECB-EUR-USD", 0.3)
            .fixing("EQ-SPX", date(2023, 12, 1), 95.0)
            .build()
            .unwrap(),
    )
}

fn params(samples: usize) -> McParams {
    McParams::builder()
        .samples(samples)
        .seed(17)
        .simulation_dates(vec![mid(), expiry(), late()])
        .build()
        .unwrap()
}

fn black_scholes(vol: f64, samples: usize) -> BlackScholesModel {
    BlackScholesModel::new(market(vol), params(samples)).unwrap()
}

fn trade() -> TradeData {
    TradeData::new()
        .index("Underlying", "EQ-SPX")
        .index("Fx", "FX-ECB-EUR-USD")
        .event("Expiry", expiry())
        .event("Mid", mid())
        .event("Past", date(2023, 12, 1))
        .events("Dates", vec![mid(), expiry(), late()])
        .number("Strike", 100.0)
        .currency("PayCcy", Currency::USD)
        .currency("ForCcy", Currency::EUR)
        .day_counter("Basis", DayCountConvention::ActualActual360)
}

fn run(source: &str, model: &mut impl Model) -> Result<pricer_script::EvaluationResult, ScriptError> {
    let script = Script::parse(source)?;
    let mut ctx = trade().to_context(model.size());
    evaluate(&script, &mut ctx, model)
}

fn lanes(value: &RandomVariable) -> Vec<f64> {
    value.as_paths().unwrap().values().into_owned()
}

// ============================================================================
// Backend agreement
// ============================================================================

#[test]
fn test_graph_backend_reproduces_diffusion() {
    let source = r#"
        NUMBER payoff;
        payoff = max(Underlying(Expiry) - Strike, 0) + 0.5 * ln(Underlying(Mid)) * Fx(Expiry);
        Option = LOGPAY(payoff, Expiry, Expiry, PayCcy) + PAY(10, Mid, Dates[3], ForCcy);
    "#;
    let eager = run(source, &mut black_scholes(0.2, 64)).unwrap();

    let mut graph = GraphModel::new(market(0.2), params(64)).unwrap();
    let recorded = run(source, &mut graph).unwrap();
    let id = graph.declare_output("Option", &recorded.value).unwrap();

    let g = graph.graph().borrow();
    let forward = GraphExecutor::new(&g)
        .forward(&graph.variates(64, 17))
        .unwrap();
    let actual = forward.value(id).unwrap();
    for (p, expected) in lanes(&eager.value).into_iter().enumerate() {
        assert_relative_eq!(actual.at(p), expected, max_relative = 1e-10);
    }
}

#[test]
fn test_graph_backend_records_sensitivities() {
    let mut graph = GraphModel::new(market(0.2), params(1)).unwrap();
    let result = run("Option = PAY(1000, Expiry, Expiry, PayCcy);", &mut graph).unwrap();
    let id = graph.declare_output("Option", &result.value).unwrap();

    let g = graph.graph().borrow();
    let executor = GraphExecutor::new(&g);
    let forward = executor.forward(&graph.variates(1, 1)).unwrap();
    let sens = executor.backward(&forward, id).unwrap();
    let df = market(0.2).discount_factor(Currency::USD, expiry()).unwrap();
    assert_relative_eq!(sens.value, 1000.0 * df, epsilon = 1e-9);
    assert_relative_eq!(
        sens.get(&format!("df:USD:{}", expiry())).unwrap(),
        1000.0,
        epsilon = 1e-9
    );
}

// ============================================================================
// Payments
// ============================================================================

#[test]
fn test_pay_on_observation_date_deflates_by_numeraire_only() {
    let script = Script::builder("Option = PAY(Underlying(Expiry), Expiry, Expiry, PayCcy);")
        .additional_result("s", "Underlying(Expiry)")
        .additional_result("bond", "DISCOUNT(Expiry, Expiry, PayCcy)")
        .build()
        .unwrap();
    let mut model = black_scholes(0.2, 16);
    let mut ctx = trade().to_context(16);
    let result = evaluate(&script, &mut ctx, &mut model).unwrap();

    let df = market(0.2).discount_factor(Currency::USD, expiry()).unwrap();
    let s = lanes(&result.additional_results["s"]);
    for (value, s) in lanes(&result.value).into_iter().zip(s) {
        assert_relative_eq!(value, s * df, max_relative = 1e-12);
    }
    assert_eq!(result.additional_results["bond"].deterministic_value(), Some(1.0));
}

#[test]
fn test_zero_volatility_call_is_discounted_intrinsic_forward() {
    let mut model = black_scholes(0.0, 8);
    let result = run(
        "Option = LOGPAY(max(Underlying(Expiry) - 90, 0), Expiry, Expiry, PayCcy);",
        &mut model,
    )
    .unwrap();

    let m = market(0.0);
    let forward = m.forward("EQ-SPX", expiry()).unwrap();
    let df = m.discount_factor(Currency::USD, expiry()).unwrap();
    assert_relative_eq!(
        result.npv().unwrap(),
        (forward - 90.0).max(0.0) * df,
        max_relative = 1e-10
    );
}

#[test]
fn test_past_payments_are_worthless_and_logged() {
    let mut model = black_scholes(0.2, 4);
    let result = run(
        r#"Option = LOGPAY(5, Past, Past, PayCcy) + LOGPAY(2, Expiry, Expiry, PayCcy, 1, "interest");"#,
        &mut model,
    )
    .unwrap();
    assert_eq!(result.cashflows.len(), 2);
    assert_eq!(result.cashflows[0].value.deterministic_value(), Some(0.0));
    assert_eq!(result.cashflows[0].leg, None);
    assert_eq!(result.cashflows[1].leg, Some(1));
    assert_eq!(result.cashflows[1].kind.as_deref(), Some("interest"));
    assert_eq!(result.cashflows[1].pay, expiry());
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_two_path_if_blends_lane_by_lane() {
    let mut reference = black_scholes(0.2, 2);
    let s = lanes(&reference.fixing("EQ-SPX", expiry(), None).unwrap());
    assert_ne!(s[0], s[1]);
    let threshold = 0.5 * (s[0] + s[1]);

    let trade = trade().number("Threshold", threshold);
    let script = Script::parse(
        r#"
        NUMBER x;
        IF Underlying(Expiry) > Threshold THEN
            x = 1;
            Option = LOGPAY(1, Expiry, Expiry, PayCcy);
        ELSE
            x = 2;
        END;
        Option = Option + x;
        "#,
    )
    .unwrap();
    let mut model = black_scholes(0.2, 2);
    let mut ctx = trade.to_context(2);
    let result = evaluate(&script, &mut ctx, &mut model).unwrap();

    let x = lanes(ctx.get("x").unwrap().as_number().unwrap());
    let logged = lanes(&result.cashflows[0].value);
    let df = market(0.2).discount_factor(Currency::USD, expiry()).unwrap();
    for p in 0..2 {
        if s[p] > threshold {
            assert_eq!(x[p], 1.0);
            assert_relative_eq!(logged[p], df, max_relative = 1e-12);
        } else {
            assert_eq!(x[p], 2.0);
            assert_eq!(logged[p], 0.0);
        }
    }
}

#[test]
fn test_deterministic_condition_takes_one_branch() {
    let mut model = black_scholes(0.2, 4);
    let result = run(
        r#"
        IF Expiry > Mid AND Strike == 100 THEN
            Option = 1;
        ELSE
            Option = Missing;
        END;
        "#,
        &mut model,
    )
    .unwrap();
    assert_eq!(result.value.deterministic_value(), Some(1.0));
}

#[test]
fn test_for_loop_equals_unrolled_statements() {
    let looped = run(
        r#"
        NUMBER s;
        FOR i IN (1, SIZE(Dates), 1) DO
            s = s + Underlying(Dates[i]);
        END;
        Option = s;
        "#,
        &mut black_scholes(0.2, 32),
    )
    .unwrap();
    let unrolled = run(
        "Option = Underlying(Dates[1]) + Underlying(Dates[2]) + Underlying(Dates[3]);",
        &mut black_scholes(0.2, 32),
    )
    .unwrap();
    assert_eq!(looped.value, unrolled.value);

    let backwards = run(
        r#"
        NUMBER s;
        FOR i IN (SIZE(Dates), 1, -1) DO
            s = s + Underlying(Dates[i]);
        END;
        Option = s;
        "#,
        &mut black_scholes(0.2, 32),
    )
    .unwrap();
    for (a, b) in lanes(&looped.value).into_iter().zip(lanes(&backwards.value)) {
        assert_relative_eq!(a, b, max_relative = 1e-12);
    }
}

#[test]
fn test_not_applies_to_whole_comparison() {
    let negated = run(
        r#"
        IF NOT Underlying(Expiry) > Strike THEN
            Option = 1;
        END;
        "#,
        &mut black_scholes(0.2, 64),
    )
    .unwrap();
    let direct = run(
        r#"
        IF Underlying(Expiry) <= Strike THEN
            Option = 1;
        END;
        "#,
        &mut black_scholes(0.2, 64),
    )
    .unwrap();
    assert_eq!(lanes(&negated.value), lanes(&direct.value));
    assert!(lanes(&negated.value).contains(&1.0));
    assert!(lanes(&negated.value).contains(&0.0));
}

#[test]
fn test_require_checks_active_paths_only() {
    let mut model = black_scholes(0.2, 64);
    let ok = run(
        r#"
        IF Underlying(Expiry) > Strike THEN
            REQUIRE Underlying(Expiry) > Strike;
            Option = 1;
        END;
        "#,
        &mut model,
    );
    assert!(ok.is_ok());

    let err = run("REQUIRE Underlying(Expiry) > 1e9;", &mut black_scholes(0.2, 64)).unwrap_err();
    assert!(matches!(err.root(), ScriptError::RequireFailed(_)));
}

// ============================================================================
// Arrays and barriers
// ============================================================================

#[test]
fn test_sort_and_permute_work_path_by_path() {
    let script = Script::parse(
        r#"
        NUMBER x[3], y[3], p[3], z[3];
        x[1] = Underlying(Expiry);
        x[2] = Strike;
        x[3] = Underlying(Mid);
        SORT(x, y, p);
        PERMUTE(x, z, p);
        "#,
    )
    .unwrap();
    let mut ctx = trade().to_context(32);
    evaluate(&script, &mut ctx, &mut black_scholes(0.2, 32)).unwrap();

    let element = |name: &str, i: i64| lanes(ctx.get_element(name, i).unwrap().as_number().unwrap());
    for path in 0..32 {
        let mut x: Vec<f64> = (1..=3).map(|i| element("x", i)[path]).collect();
        let y: Vec<f64> = (1..=3).map(|i| element("y", i)[path]).collect();
        let z: Vec<f64> = (1..=3).map(|i| element("z", i)[path]).collect();
        let p: Vec<f64> = (1..=3).map(|i| element("p", i)[path]).collect();
        for (c, position) in p.iter().enumerate() {
            assert_eq!(x[*position as usize - 1], y[c]);
        }
        x.sort_by(f64::total_cmp);
        assert_eq!(x, y);
        assert_eq!(z, y);
    }
}

#[test]
fn test_sort_leaves_inactive_paths_alone() {
    let script = Script::parse(
        r#"
        NUMBER a[2];
        a[1] = 2;
        a[2] = 1;
        IF Underlying(Expiry) > Strike THEN
            SORT(a);
        END;
        "#,
    )
    .unwrap();
    let mut model = black_scholes(0.2, 64);
    let s = lanes(&model.fixing("EQ-SPX", expiry(), None).unwrap());
    let mut ctx = trade().to_context(64);
    evaluate(&script, &mut ctx, &mut model).unwrap();

    let first = lanes(ctx.get_element("a", 1).unwrap().as_number().unwrap());
    for (value, s) in first.into_iter().zip(s) {
        assert_eq!(value, if s > 100.0 { 1.0 } else { 2.0 });
    }
}

#[test]
fn test_permute_and_sort_errors() {
    let err = run(
        "NUMBER x[2], p[2]; p[1] = 3; p[2] = 1; PERMUTE(x, p);",
        &mut black_scholes(0.2, 4),
    )
    .unwrap_err();
    assert!(matches!(
        err.root(),
        ScriptError::IndexOutOfRange { index: 3, size: 2, .. }
    ));

    let err = run("NUMBER x[2], y[3]; SORT(x, y);", &mut black_scholes(0.2, 4)).unwrap_err();
    assert!(matches!(err.root(), ScriptError::TypeMismatch { .. }), "{err}");

    let err = run("SORT(Dates);", &mut black_scholes(0.2, 4)).unwrap_err();
    assert!(matches!(err.root(), ScriptError::TypeMismatch { .. }), "{err}");

    let mut graph = GraphModel::new(market(0.2), params(1)).unwrap();
    let err = run("NUMBER x[2]; x[1] = Underlying(Expiry); SORT(x);", &mut graph).unwrap_err();
    assert!(matches!(err.root(), ScriptError::TypeMismatch { .. }), "{err}");
}

#[test]
fn test_barrier_probabilities() {
    let script = Script::parse(
        r#"
        NUMBER far, near, reversed, past;
        far = ABOVEPROB(Underlying, Mid, Expiry, 1e9);
        near = BELOWPROB(Underlying, Mid, Expiry, 90);
        reversed = ABOVEPROB(Underlying, Expiry, Mid, 0);
        past = BELOWPROB(Underlying, Past, Expiry, 96);
        "#,
    )
    .unwrap();
    let mut ctx = trade().to_context(256);
    evaluate(&script, &mut ctx, &mut black_scholes(0.2, 256)).unwrap();

    let mean = |name: &str| ctx.get(name).unwrap().as_number().unwrap().expectation().unwrap();
    assert!(mean("far") < 1e-6, "{}", mean("far"));
    assert!(mean("near") > 0.0 && mean("near") < 1.0, "{}", mean("near"));
    assert_eq!(mean("reversed"), 0.0);
    // 95 was fixed below the barrier before today
    assert!(lanes(ctx.get("past").unwrap().as_number().unwrap())
        .iter()
        .all(|p| *p == 1.0));

    let err = run("Option = ABOVEPROB(Strike, Mid, Expiry, 1);", &mut black_scholes(0.2, 4))
        .unwrap_err();
    assert!(matches!(err.root(), ScriptError::BuiltinArgumentError { .. }));
}

// ============================================================================
// Regression
// ============================================================================

const CONTINUATION: &str = r#"
    NUMBER continuation;
    continuation = NPV(LOGPAY(Underlying(Expiry), Expiry, Expiry, PayCcy), Mid);
    Option = NPVMEM(continuation, Mid, 7, Underlying(Mid) > Strike);
"#;

#[test]
fn test_regression_is_idempotent_on_re_evaluation() {
    let script = Script::parse(CONTINUATION).unwrap();
    let mut model = black_scholes(0.2, 1_000);
    let first = evaluate(&script, &mut trade().to_context(1_000), &mut model).unwrap();
    let second = evaluate(&script, &mut trade().to_context(1_000), &mut model).unwrap();
    assert_eq!(first.value, second.value);
    assert!(!first.value.is_deterministic());
}

#[test]
fn test_training_pass_fits_before_pricing() {
    let params = McParams::builder()
        .samples(500)
        .seed(3)
        .training(2_000, 11)
        .simulation_dates(vec![mid(), expiry(), late()])
        .build()
        .unwrap();
    let mut model = ScriptModel::build(ModelKind::BlackScholes, market(0.2), params).unwrap();
    let script = Script::parse(CONTINUATION).unwrap();

    let first = evaluate(&script, &mut trade().to_context(500), &mut model).unwrap();
    assert_eq!(first.value.size(), 500);
    assert_eq!(model.size(), 500);

    let second = evaluate(&script, &mut trade().to_context(500), &mut model).unwrap();
    assert_eq!(first.value, second.value);

    // continuation value of a martingale payoff is close to the deflated spot
    let df = market(0.2).discount_factor(Currency::USD, expiry()).unwrap();
    let npv = evaluate(
        &Script::parse("Option = NPV(LOGPAY(Underlying(Expiry), Expiry, Expiry, PayCcy), Mid);")
            .unwrap(),
        &mut trade().to_context(500),
        &mut model,
    )
    .unwrap()
    .npv()
    .unwrap();
    let forward = market(0.2).forward("EQ-SPX", expiry()).unwrap();
    assert_relative_eq!(npv, forward * df, max_relative = 0.05);
}

// ============================================================================
// Built-ins
// ============================================================================

#[test]
fn test_date_and_calendar_builtins() {
    let script = Script::builder("Option = days(Basis, Expiry, Dates[3]);")
        .additional_result("dcf", "dcf(Basis, Mid, Expiry)")
        .additional_result("eq", "DATEINDEX(Expiry, Dates, EQ)")
        .additional_result("missing", "DATEINDEX(Past, Dates, EQ)")
        .additional_result("geq", "DATEINDEX(Expiry, Dates, GEQ)")
        .additional_result("gt", "DATEINDEX(Expiry, Dates, GT)")
        .additional_result("known", "HISTFIXING(Underlying, Past)")
        .additional_result("unknown", "HISTFIXING(Underlying, Mid)")
        .build()
        .unwrap();
    let mut model = black_scholes(0.2, 4);
    let result = evaluate(&script, &mut trade().to_context(4), &mut model).unwrap();
    let get = |name: &str| result.additional_results[name].deterministic_value().unwrap();

    assert_eq!(result.value.deterministic_value(), Some(180.0));
    assert_relative_eq!(get("dcf"), 185.0 / 360.0, epsilon = 1e-14);
    assert_eq!(get("eq"), 2.0);
    assert_eq!(get("missing"), 0.0);
    assert_eq!(get("geq"), 2.0);
    assert_eq!(get("gt"), 3.0);
    assert_eq!(get("known"), 1.0);
    assert_eq!(get("unknown"), 0.0);
}

#[test]
fn test_black_builtin_matches_formula() {
    let mut model = black_scholes(0.2, 4);
    let result = run("Option = black(-1, Mid, Expiry, Strike, 105, 0.25);", &mut model).unwrap();
    let t = DayCountConvention::ActualActual365.year_fraction_dates(mid(), expiry());
    let expected = black_formula(-1.0, 100.0, 105.0, 0.25 * t.sqrt());
    assert_relative_eq!(result.value.deterministic_value().unwrap(), expected, epsilon = 1e-12);
}

#[test]
fn test_past_fixing_is_historical() {
    let mut model = black_scholes(0.2, 4);
    let result = run("Option = Underlying(Past);", &mut model).unwrap();
    assert_eq!(result.value.deterministic_value(), Some(95.0));
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_missing_market_data() {
    let script = Script::parse("\nOption = Underlying(Expiry);").unwrap();
    let trade = TradeData::new()
        .index("Underlying", "EQ-NONE")
        .event("Expiry", expiry());
    let err = evaluate(&script, &mut trade.to_context(4), &mut black_scholes(0.2, 4)).unwrap_err();
    assert!(matches!(
        err.root(),
        ScriptError::Model(ModelError::MissingMarketData(_))
    ));
    assert_eq!(err.location().unwrap().line, 2);
}

#[test]
fn test_runtime_errors() {
    let cases: [(&str, fn(&ScriptError) -> bool); 7] = [
        ("Strike = 1;", |e| matches!(e, ScriptError::ConstantAssignment(_))),
        ("Option = Dates[4];", |e| {
            matches!(e, ScriptError::IndexOutOfRange { index: 4, size: 3, .. })
        }),
        ("Option = Nowhere;", |e| matches!(e, ScriptError::UndefinedIdentifier(_))),
        ("FOR i IN (1, 3, 0) DO END;", |e| matches!(e, ScriptError::InvalidLoopBounds(_))),
        ("FOR i IN (1, Underlying(Expiry), 1) DO END;", |e| {
            matches!(e, ScriptError::InvalidLoopBounds(_))
        }),
        ("Option = dcf(PayCcy, Mid, Expiry);", |e| {
            matches!(e, ScriptError::BuiltinArgumentError { .. })
        }),
        (
            "NUMBER d; IF Underlying(Expiry) > Strike THEN d = Expiry; END;",
            |e| matches!(e, ScriptError::TypeMismatch { .. }),
        ),
    ];
    for (source, check) in cases {
        let err = run(source, &mut black_scholes(0.2, 4)).unwrap_err();
        assert!(check(err.root()), "{source}: {err}");
        assert!(err.location().is_some(), "{source}");
    }
}

#[test]
fn test_oversized_arrays_and_loop_bounds_are_rejected() {
    let err = run("NUMBER a[1e18];", &mut black_scholes(0.2, 4)).unwrap_err();
    assert!(matches!(err.root(), ScriptError::TypeMismatch { .. }), "{err}");

    let err = run(
        "NUMBER s; FOR i IN (9223372036854775807, 9223372036854775807, 1) DO s = s + 1; END;",
        &mut black_scholes(0.2, 4),
    )
    .unwrap_err();
    assert!(matches!(err.root(), ScriptError::InvalidLoopBounds(_)), "{err}");

    let err = run("Option = Dates[1e300];", &mut black_scholes(0.2, 4)).unwrap_err();
    assert!(matches!(err.root(), ScriptError::TypeMismatch { .. }), "{err}");

    // Bounds at the edge of exact integers still run and stop.
    let result = run(
        r#"
        NUMBER s;
        FOR i IN (9007199254740990, 9007199254740992, 1) DO
            s = s + 1;
        END;
        Option = s;
        "#,
        &mut black_scholes(0.2, 4),
    )
    .unwrap();
    assert_eq!(result.value.deterministic_value(), Some(3.0));
}

#[test]
fn test_engine_runs_once() {
    let script = Script::parse("Option = 1;").unwrap();
    let mut ctx = trade().to_context(4);
    let mut model = black_scholes(0.2, 4);
    let mut engine = ScriptEngine::new(&script, &mut ctx, &mut model);
    assert_eq!(engine.state(), EngineState::Ready);
    engine.run().unwrap();
    assert_eq!(engine.state(), EngineState::Completed);
    assert!(matches!(engine.run(), Err(ScriptError::InvalidState(_))));

    let failing = Script::parse("Option = Nowhere;").unwrap();
    let mut ctx = trade().to_context(4);
    let mut engine = ScriptEngine::new(&failing, &mut ctx, &mut model);
    assert!(engine.run().is_err());
    assert_eq!(engine.state(), EngineState::Failed);
}

// ============================================================================
// Stepper and LGM
// ============================================================================

#[test]
fn test_stepper_runs_one_statement_at_a_time() {
    let script = Script::parse("NUMBER a;\na = 2;\nOption = a * Strike;").unwrap();
    let mut ctx = trade().to_context(4);
    let mut model = black_scholes(0.2, 4);
    let mut stepper = Stepper::new(&script, &mut ctx, &mut model);

    assert_eq!(stepper.step().unwrap().map(|l| l.line), Some(1));
    assert_eq!(stepper.step().unwrap().map(|l| l.line), Some(2));
    assert_eq!(
        stepper.context().get("a").unwrap(),
        &Value::Number(RandomVariable::constant(4, 2.0))
    );
    assert!(!stepper.is_done());
    let result = stepper.finish().unwrap();
    assert_eq!(result.value.deterministic_value(), Some(200.0));
}

#[test]
fn test_lgm_zero_volatility_reproduces_curve() {
    let t1 = date(2025, 1, 2);
    let t2 = date(2025, 7, 2);
    let market = Arc::new(
        Market::builder(today(), Currency::EUR)
            .discount_curve(Currency::EUR, CurveEnum::flat(0.02))
            .rate_index(
                "IR-EUR-EURIBOR-6M",
                Currency::EUR,
                Tenor::Months(6),
                DayCountConvention::ActualActual360,
            )
            .build()
            .unwrap(),
    );
    let params = McParams::builder()
        .samples(8)
        .simulation_dates(vec![t1, date(2026, 1, 2)])
        .build()
        .unwrap();
    let kind = ModelKind::Lgm(LgmParams::new(0.03, 0.0).unwrap());
    let mut model = ScriptModel::build(kind, market.clone(), params).unwrap();

    let trade = TradeData::new()
        .index("Rate", "IR-EUR-EURIBOR-6M")
        .event("Fix", t1)
        .event("Pay", t2)
        .currency("Ccy", Currency::EUR);
    let script = Script::parse("Option = LOGPAY(0.5 * Rate(Fix), Fix, Pay, Ccy);").unwrap();
    let result = evaluate(&script, &mut trade.to_context(8), &mut model).unwrap();

    let forward = market.rate_forward("IR-EUR-EURIBOR-6M", t1).unwrap();
    let df = market.discount_factor(Currency::EUR, t2).unwrap();
    assert_relative_eq!(result.npv().unwrap(), 0.5 * forward * df, max_relative = 1e-10);
}
