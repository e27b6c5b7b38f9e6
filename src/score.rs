//! Probabilistic forecast scoring
//!
//! The continuous ranked probability score over particle sets:
//! `CRPS = E|X - y| - 1/2 E|X - X'|`. The second term (the Gini mean
//! difference) is the expensive one; sorting reduces it to a single
//! weighted pass, `(2/n^2) * sum_i (2i - n + 1) * sorted_i`, so the whole
//! score runs in O(n log n) instead of the naive O(n^2) pairwise sweep.

use crate::diagnostics::EvalError;
use crate::quantity::Quantity;
use crate::units::Unit;

/// CRPS of a forecast distribution against an observation.
///
/// The observation is converted into the forecast's unit first; when it
/// is itself a distribution the first term averages over its particles.
/// Lower is better; the score is zero only when the forecast is a point
/// mass on the observation. The result is a scalar in the forecast's
/// unit.
pub fn crps(forecast: &Quantity, observation: &Quantity) -> Result<Quantity, EvalError> {
    let observed = aligned(forecast, observation, "crps")?;
    let value = crps_particles(forecast.values(), &observed);
    Ok(Quantity::scalar(value, forecast.unit().clone()))
}

/// CRPS in log space: both sides are transformed with `ln` before
/// scoring, so the score measures multiplicative (order-of-magnitude)
/// error. Requires strictly positive particles; the result is
/// dimensionless.
pub fn logcrps(forecast: &Quantity, observation: &Quantity) -> Result<Quantity, EvalError> {
    transformed_crps(forecast, observation, "logcrps", f64::ln)
}

/// CRPS in decibels: particles are transformed with `10 * log10` before
/// scoring. Requires strictly positive particles; dimensionless result.
pub fn dbcrps(forecast: &Quantity, observation: &Quantity) -> Result<Quantity, EvalError> {
    transformed_crps(forecast, observation, "dbcrps", |v| 10.0 * v.log10())
}

fn transformed_crps(
    forecast: &Quantity,
    observation: &Quantity,
    op: &str,
    transform: impl Fn(f64) -> f64,
) -> Result<Quantity, EvalError> {
    let observed = aligned(forecast, observation, op)?;
    if forecast.values().iter().chain(&observed).any(|&v| v <= 0.0) {
        return Err(EvalError::NonPositiveValue {
            context: op.to_string(),
        });
    }
    let fx: Vec<f64> = forecast.values().iter().map(|&v| transform(v)).collect();
    let oy: Vec<f64> = observed.iter().map(|&v| transform(v)).collect();
    Ok(Quantity::scalar(
        crps_particles(&fx, &oy),
        Unit::dimensionless(),
    ))
}

/// Observation particles expressed in the forecast's unit.
fn aligned(
    forecast: &Quantity,
    observation: &Quantity,
    op: &str,
) -> Result<Vec<f64>, EvalError> {
    let factor = observation
        .unit()
        .factor_to(forecast.unit())
        .ok_or_else(|| {
            EvalError::incompatible_units(op, forecast.unit_label(), observation.unit_label())
        })?;
    Ok(observation.values().iter().map(|&v| v * factor).collect())
}

fn crps_particles(forecast: &[f64], observed: &[f64]) -> f64 {
    let n = forecast.len() as f64;
    // E|X - y|, averaged over observation particles
    let spread: f64 = observed
        .iter()
        .map(|&y| forecast.iter().map(|&x| (x - y).abs()).sum::<f64>() / n)
        .sum::<f64>()
        / observed.len() as f64;
    spread - 0.5 * gini_mean_difference(forecast)
}

/// `E|X - X'|` over all particle pairs, via the sorted reformulation.
fn gini_mean_difference(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, &v)| (2.0 * i as f64 - (n as f64 - 1.0)) * v)
        .sum();
    2.0 * weighted / (n as f64 * n as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::{Family, Rng};

    fn dimensionless(values: Vec<f64>) -> Quantity {
        Quantity::from_particles(values, Unit::dimensionless())
    }

    #[test]
    fn test_crps_exact_small_case() {
        // E|X - 4| = 2.6, E|X - X'| = 3.2, so CRPS = 2.6 - 1.6 = 1.0
        let forecast = dimensionless(vec![1.0, 3.0, 5.0, 7.0, 9.0]);
        let obs = Quantity::dimensionless(4.0);
        let score = crps(&forecast, &obs).expect("dimensionless");
        assert!((score.reduce() - 1.0).abs() < 1e-12);
        assert!(score.is_scalar());
    }

    #[test]
    fn test_crps_zero_at_matching_point_mass() {
        let forecast = dimensionless(vec![5.0, 5.0, 5.0]);
        let obs = Quantity::dimensionless(5.0);
        let score = crps(&forecast, &obs).expect("dimensionless");
        assert_eq!(score.reduce(), 0.0);
    }

    #[test]
    fn test_crps_non_negative() {
        let forecast = dimensionless(vec![2.0, -1.0, 7.5, 0.25, 3.0, 3.0]);
        for y in [-10.0, -1.0, 0.0, 2.5, 3.0, 100.0] {
            let score = crps(&forecast, &Quantity::dimensionless(y)).expect("dimensionless");
            assert!(score.reduce() >= -1e-12, "crps({}) = {}", y, score.reduce());
        }
    }

    #[test]
    fn test_crps_distribution_observation_averages() {
        // spread 1.5, gini 1.0 -> 1.5 - 0.5 = 1.0
        let forecast = dimensionless(vec![1.0, 3.0]);
        let obs = dimensionless(vec![2.0, 4.0]);
        let score = crps(&forecast, &obs).expect("dimensionless");
        assert!((score.reduce() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_crps_sharpness_ordering() {
        let mut rng = Rng::new(11);
        let narrow = Family::normal(0.0, 1.0)
            .expect("valid")
            .sample(20_000, Unit::dimensionless(), &mut rng);
        let wide = Family::normal(0.0, 5.0)
            .expect("valid")
            .sample(20_000, Unit::dimensionless(), &mut rng);

        // At the shared mean the sharp forecast wins
        let at_mean = Quantity::dimensionless(0.0);
        let narrow_score = crps(&narrow, &at_mean).expect("ok").reduce();
        let wide_score = crps(&wide, &at_mean).expect("ok").reduce();
        assert!(narrow_score < wide_score);

        // Deep in the tail the wide forecast wins
        let tail = Quantity::dimensionless(12.0);
        let narrow_score = crps(&narrow, &tail).expect("ok").reduce();
        let wide_score = crps(&wide, &tail).expect("ok").reduce();
        assert!(wide_score < narrow_score);
    }

    #[test]
    fn test_crps_converts_observation_unit() {
        let forecast = Quantity::from_particles(
            vec![900.0, 1000.0, 1100.0],
            Quantity::new(1.0, "m").expect("m").unit().clone(),
        );
        let obs = Quantity::new(1.0, "km").expect("km");
        let score = crps(&forecast, &obs).expect("compatible");
        assert_eq!(score.unit().to_string(), "m");
        // same as scoring against 1000 m
        let direct = crps(&forecast, &Quantity::new(1000.0, "m").expect("m")).expect("ok");
        assert!((score.reduce() - direct.reduce()).abs() < 1e-9);
    }

    #[test]
    fn test_crps_rejects_incompatible_units() {
        let forecast = Quantity::new(10.0, "m").expect("m");
        let obs = Quantity::new(10.0, "s").expect("s");
        assert!(matches!(
            crps(&forecast, &obs),
            Err(EvalError::IncompatibleUnits { .. })
        ));
    }

    #[test]
    fn test_logcrps_is_scale_invariant_and_dimensionless() {
        let forecast = dimensionless(vec![1.0, 10.0, 100.0]);
        let obs = Quantity::dimensionless(10.0);
        let a = logcrps(&forecast, &obs).expect("positive").reduce();

        let scaled = dimensionless(vec![7.0, 70.0, 700.0]);
        let obs_scaled = Quantity::dimensionless(70.0);
        let b = logcrps(&scaled, &obs_scaled).expect("positive").reduce();
        assert!((a - b).abs() < 1e-12);

        let score = logcrps(&forecast, &obs).expect("positive");
        assert!(score.unit().is_dimensionless());
    }

    #[test]
    fn test_log_scores_require_positive_particles() {
        let forecast = dimensionless(vec![1.0, -2.0, 3.0]);
        let obs = Quantity::dimensionless(1.0);
        assert!(matches!(
            logcrps(&forecast, &obs),
            Err(EvalError::NonPositiveValue { .. })
        ));
        assert!(matches!(
            dbcrps(&forecast, &obs),
            Err(EvalError::NonPositiveValue { .. })
        ));

        let ok_forecast = dimensionless(vec![1.0, 2.0, 3.0]);
        let bad_obs = Quantity::dimensionless(0.0);
        assert!(matches!(
            logcrps(&ok_forecast, &bad_obs),
            Err(EvalError::NonPositiveValue { .. })
        ));
    }

    #[test]
    fn test_dbcrps_scales_logcrps() {
        // 10 * log10(x) = (10 / ln 10) * ln(x), and CRPS is positively
        // homogeneous, so the two scores differ by exactly that factor.
        let forecast = dimensionless(vec![2.0, 4.0, 8.0, 16.0]);
        let obs = Quantity::dimensionless(5.0);
        let log_score = logcrps(&forecast, &obs).expect("positive").reduce();
        let db_score = dbcrps(&forecast, &obs).expect("positive").reduce();
        assert!((db_score - log_score * 10.0 / std::f64::consts::LN_10).abs() < 1e-9);
    }

    #[test]
    fn test_gini_agrees_with_pairwise_sweep() {
        let values: [f64; 8] = [3.0, -1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
        let n = values.len() as f64;
        let mut pairwise = 0.0;
        for &a in &values {
            for &b in &values {
                pairwise += (a - b).abs();
            }
        }
        pairwise /= n * n;
        assert!((gini_mean_difference(&values) - pairwise).abs() < 1e-12);
    }
}
