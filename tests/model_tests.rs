//! End-to-End Model Tests
//!
//! Full programs through the lex → parse → evaluate pipeline, checking
//! the behavior users see: operator precedence, unit reconciliation,
//! distribution sampling, user functions, and multi-statement models.
//!
//! Sampling tests pin the seed and use tolerances wide enough for the
//! Monte Carlo noise at 20k particles.

use fermi::eval::Evaluator;
use fermi::{evaluate_with, lexer, parser, Quantity};

const SAMPLES: usize = 20_000;
const SEED: u64 = 42;

/// Helper to evaluate source and return the last value
fn eval(source: &str) -> Quantity {
    evaluate_with(source, SAMPLES, SEED).expect("evaluation failed")
}

/// Helper to check the result is a scalar with the expected value
fn assert_scalar(source: &str, expected: f64) {
    let q = eval(source);
    match q.scalar_value() {
        Some(v) => assert!(
            (v - expected).abs() < 1e-9,
            "{source}: expected {expected}, got {v}"
        ),
        None => panic!("{source}: expected a scalar, got a distribution"),
    }
}

/// Helper to check a distribution's mean within tolerance
fn assert_mean(source: &str, expected: f64, tolerance: f64) {
    let q = eval(source);
    let mean = q.mean();
    assert!(
        (mean - expected).abs() < tolerance,
        "{source}: expected mean near {expected}, got {mean}"
    );
}

// ============================================================================
// Arithmetic and Precedence
// ============================================================================

/// Multiplication binds tighter than addition
#[test]
fn test_precedence() {
    assert_scalar("2 + 3 * 4", 14.0);
    assert_scalar("(2 + 3) * 4", 20.0);
}

/// Power is right associative: 2 ^ 3 ^ 2 = 2 ^ 9
#[test]
fn test_power_right_associative() {
    assert_scalar("2 ^ 3 ^ 2", 512.0);
}

/// Division chains left to right
#[test]
fn test_division_left_associative() {
    assert_scalar("100 / 5 / 2", 10.0);
}

#[test]
fn test_unary_minus() {
    assert_scalar("-3 + 5", 2.0);
}

// ============================================================================
// Units
// ============================================================================

/// Addition converts the right side into the left side's unit; prefixed
/// literals are stored in base symbols, so 1 km arrives as 1000 m.
#[test]
fn test_addition_reconciles_units() {
    let q = eval("1 km + 200 meters");
    assert_eq!(q.scalar_value(), Some(1200.0));
    assert_eq!(q.unit_label(), "m");
}

/// `in` converts; the target keeps its prefix for display
#[test]
fn test_conversion() {
    let q = eval("5000 meters in km");
    assert_eq!(q.scalar_value(), Some(5.0));
    assert_eq!(q.unit_label(), "km");
}

/// Compound conversion: 100 km over 2 h is 13.89 m/s
#[test]
fn test_compound_conversion() {
    let q = eval("100 km / 2 h in m / s");
    let v = q.scalar_value().expect("scalar");
    assert!((v - 50000.0 / 3600.0).abs() < 1e-9, "got {v}");
    assert_eq!(q.unit_label(), "m/s");
}

/// Same-dimension division cancels to a plain number
#[test]
fn test_ratio_is_dimensionless() {
    let q = eval("10 km / 5 km");
    assert_eq!(q.scalar_value(), Some(2.0));
    assert!(q.unit().is_dimensionless());
}

/// Squaring a length gives an area
#[test]
fn test_power_multiplies_dimension() {
    let q = eval("(3 meters) ^ 2");
    assert_eq!(q.scalar_value(), Some(9.0));
    assert_eq!(q.unit_label(), "m^2");
}

#[test]
fn test_incompatible_units_fail() {
    assert!(evaluate_with("1 km + 1 h", 100, SEED).is_err());
    assert!(evaluate_with("5 km in seconds", 100, SEED).is_err());
}

/// `%` is a display scale, not a dimension: it folds into the value
#[test]
fn test_percent_folds_into_value() {
    assert_scalar("200 * 15%", 30.0);
}

// ============================================================================
// Ranges and Uncertainty
// ============================================================================

/// A positive range samples a lognormal with the bounds as its 90%
/// interval, so the median sits at the geometric mean.
#[test]
fn test_range_median_at_geometric_mean() {
    let q = eval("100 to 1000");
    let median = q.median();
    assert!(
        (290.0..345.0).contains(&median),
        "expected median near 316, got {median}"
    );
}

/// Roughly 90% of the mass lies between the stated bounds
#[test]
fn test_range_mass_within_bounds() {
    let q = eval("100 to 1000");
    let inside = q
        .values()
        .iter()
        .filter(|v| (100.0..=1000.0).contains(*v))
        .count();
    let fraction = inside as f64 / q.sample_count() as f64;
    assert!(
        (0.85..0.95).contains(&fraction),
        "expected ~0.9 inside the bounds, got {fraction}"
    );
}

/// Trailing zeros encode uncertainty: ~1200 is uniform over 1150..1250
#[test]
fn test_sig_fig_uncertainty() {
    let q = eval("~1200");
    assert!(q
        .values()
        .iter()
        .all(|v| (1149.99..1250.01).contains(v)));
    assert_mean("~1200", 1200.0, 1.5);
}

/// 100 +- 10 is a normal with that mean and standard deviation
#[test]
fn test_plus_minus() {
    let q = eval("100 +- 10");
    assert!((q.mean() - 100.0).abs() < 0.5, "mean {}", q.mean());
    assert!((q.std() - 10.0).abs() < 0.5, "std {}", q.std());
}

/// A binding holds one sampled particle vector, so reusing it is fully
/// correlated: x - x is exactly zero everywhere.
#[test]
fn test_binding_reuse_is_correlated() {
    let q = eval("x = 1 to 9\nx - x");
    assert_eq!(q.mean(), 0.0);
    assert_eq!(q.std(), 0.0);
}

/// Scalars broadcast over distributions
#[test]
fn test_scalar_broadcast() {
    let q = eval("(1 to 9) * 0 + 5");
    assert_eq!(q.mean(), 5.0);
    assert_eq!(q.std(), 0.0);
}

// ============================================================================
// Functions, Let, and Conditionals
// ============================================================================

#[test]
fn test_user_function() {
    assert_scalar("double(x) = x * 2\ndouble(21)", 42.0);
}

/// User functions carry units through their body
#[test]
fn test_function_with_units() {
    let q = eval("area(r) = r ^ 2\narea(3 meters)");
    assert_eq!(q.scalar_value(), Some(9.0));
    assert_eq!(q.unit_label(), "m^2");
}

#[test]
fn test_let_expression() {
    assert_scalar("let x = 5 in x * 2", 10.0);
}

#[test]
fn test_if_then_else() {
    assert_scalar("if 1 < 2 then 10 else 20", 10.0);
    assert_scalar("if 1 > 2 then 10 else 20", 20.0);
}

/// normal(lo, hi) reads the bounds as a 90% interval
#[test]
fn test_normal_builtin() {
    let q = eval("normal(90, 110)");
    assert!((q.mean() - 100.0).abs() < 0.25, "mean {}", q.mean());
    // sd = 10 / 1.6449 = 6.08
    assert!((q.std() - 6.08).abs() < 0.25, "std {}", q.std());
}

/// Summary builtins reduce distributions to scalars
#[test]
fn test_percentile_builtins() {
    let q = eval("p50(100 to 10000)");
    let v = q.scalar_value().expect("scalar");
    // geometric mean of the bounds = 1000
    assert!((850.0..1150.0).contains(&v), "p50 {v}");
}

/// Forecast scoring is reachable from the language
#[test]
fn test_crps_builtin() {
    let q = eval("crps(100 to 200, 150)");
    let v = q.scalar_value().expect("scalar");
    assert!(v >= 0.0, "crps {v}");
}

// ============================================================================
// Multi-Statement Models
// ============================================================================

#[test]
fn test_statements_feed_later_statements() {
    assert_scalar("a = 10\nb = 20\na + b", 30.0);
}

/// The classic piano tuner estimate: a chain of ranges stays positive
/// and lands in a plausible band.
#[test]
fn test_piano_tuner_model() {
    let source = r#"
population = 2_500_000 to 3_500_000
people_per_household = 2 to 3
pianos_per_household = 0.02 to 0.1
tunings_per_year = 0.5 to 2
tunings_per_tuner = 500 to 1500

households = population / people_per_household
pianos = households * pianos_per_household
pianos * tunings_per_year / tunings_per_tuner
"#;
    let q = eval(source);
    assert!(q.values().iter().all(|v| *v > 0.0));
    let median = q.median();
    assert!(
        (20.0..200.0).contains(&median),
        "expected a few dozen tuners, got median {median}"
    );
}

/// Units flow through a whole model: distance over speed is a time
#[test]
fn test_travel_time_model() {
    let source = r#"
distance = 300 to 500 km
speed = 60 to 100 km / h
distance / speed in h
"#;
    let q = eval(source);
    assert_eq!(q.unit_label(), "h");
    let median = q.median();
    assert!(
        (4.4..5.7).contains(&median),
        "expected ~5 hours, got median {median}"
    );
}

/// Ranges with a trailing unit convert like any quantity
#[test]
fn test_range_conversion() {
    let q = eval("1 to 2 km in meters");
    assert_eq!(q.unit_label(), "m");
    let median = q.median();
    assert!(
        (1330.0..1500.0).contains(&median),
        "expected median near 1414, got {median}"
    );
}

/// Tick units definable and usable in one model
#[test]
fn test_custom_unit_model() {
    let q = eval("1 'server = 450 W\n12 'server in kW");
    let v = q.scalar_value().expect("scalar");
    assert!((v - 5.4).abs() < 1e-9, "got {v}");
    assert_eq!(q.unit_label(), "kW");
}

/// A failing statement is reported but later statements still run
#[test]
fn test_statement_recovery() {
    let tokens = lexer::lex("x = 10\nx + 1 km\ny = x * 2\ny").expect("lex");
    let program = parser::parse(&tokens).expect("parse");
    let mut evaluator = Evaluator::with_settings(100, SEED);
    let results = evaluator.eval_program(&program);

    assert_eq!(results.len(), 4);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());
    let last = results[3].as_ref().expect("y is bound");
    assert_eq!(last.quantity().and_then(Quantity::scalar_value), Some(20.0));
}

/// Same seed, same answer
#[test]
fn test_reproducibility() {
    let a = eval("(10 to 90) + normal(5, 10)");
    let b = eval("(10 to 90) + normal(5, 10)");
    assert_eq!(a.mean(), b.mean());
    assert_eq!(a.std(), b.std());
}
