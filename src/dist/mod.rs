//! Parametric distribution families and their samplers
//!
//! Every family validates its parameters at construction and rejects
//! out-of-domain values with `InvalidParameter` before any sampling
//! happens. Sampling draws independent particles from an explicit [`Rng`]
//! owned by the evaluation session; nothing here touches global state.

pub mod rng;

pub use rng::Rng;

use crate::diagnostics::EvalError;
use crate::quantity::Quantity;
use crate::units::Unit;

/// Particles drawn per distribution unless the caller overrides it.
pub const DEFAULT_SAMPLES: usize = 20_000;

/// A validated parametric distribution.
///
/// Interval-based constructors (`lognormal_interval`, `normal_interval`)
/// take a central credible interval and a confidence level and solve for
/// the family's natural parameters via the normal quantile.
#[derive(Debug, Clone, PartialEq)]
pub enum Family {
    Lognormal { mu: f64, sigma: f64 },
    Normal { mean: f64, sd: f64 },
    Uniform { lo: f64, hi: f64 },
    Beta { alpha: f64, beta: f64 },
    Gamma { shape: f64, scale: f64 },
    Poisson { lambda: f64 },
    Exponential { rate: f64 },
    Binomial { trials: u64, p: f64 },
    Weighted { values: Vec<f64>, cumulative: Vec<f64> },
}

impl Family {
    /// Lognormal from a symmetric-in-log-space interval `[lo, hi]`
    /// covering probability mass `confidence` (0.9 means `lo` and `hi`
    /// are the 5th and 95th percentiles).
    pub fn lognormal_interval(lo: f64, hi: f64, confidence: f64) -> Result<Family, EvalError> {
        if !(lo > 0.0 && hi > lo) {
            return Err(EvalError::invalid_parameter(format!(
                "lognormal bounds must satisfy 0 < low < high, got {} and {}",
                lo, hi
            )));
        }
        let z = confidence_z(confidence)?;
        let mu = 0.5 * (lo.ln() + hi.ln());
        let sigma = (hi.ln() - lo.ln()) / (2.0 * z);
        Ok(Family::Lognormal { mu, sigma })
    }

    /// Normal from a central interval `[lo, hi]` covering `confidence`.
    pub fn normal_interval(lo: f64, hi: f64, confidence: f64) -> Result<Family, EvalError> {
        if !(hi > lo) {
            return Err(EvalError::invalid_parameter(format!(
                "normal bounds must satisfy low < high, got {} and {}",
                lo, hi
            )));
        }
        let z = confidence_z(confidence)?;
        Ok(Family::Normal {
            mean: 0.5 * (lo + hi),
            sd: (hi - lo) / (2.0 * z),
        })
    }

    /// Normal from mean and standard deviation (the `a +- b` form).
    pub fn normal(mean: f64, sd: f64) -> Result<Family, EvalError> {
        if !(sd >= 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "standard deviation must be non-negative, got {}",
                sd
            )));
        }
        Ok(Family::Normal { mean, sd })
    }

    pub fn uniform(lo: f64, hi: f64) -> Result<Family, EvalError> {
        if !(hi > lo) {
            return Err(EvalError::invalid_parameter(format!(
                "uniform bounds must satisfy low < high, got {} and {}",
                lo, hi
            )));
        }
        Ok(Family::Uniform { lo, hi })
    }

    pub fn beta(alpha: f64, beta: f64) -> Result<Family, EvalError> {
        if !(alpha > 0.0 && beta > 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "beta shape parameters must be positive, got {} and {}",
                alpha, beta
            )));
        }
        Ok(Family::Beta { alpha, beta })
    }

    /// Laplace-smoothed success-rate estimate: `outof(s, t)` is
    /// beta(s + 1, t - s + 1).
    pub fn out_of(successes: f64, total: f64) -> Result<Family, EvalError> {
        if !(successes >= 0.0 && total >= successes) {
            return Err(EvalError::invalid_parameter(format!(
                "outof needs 0 <= successes <= total, got {} of {}",
                successes, total
            )));
        }
        Family::beta(successes + 1.0, total - successes + 1.0)
    }

    pub fn gamma(shape: f64, scale: f64) -> Result<Family, EvalError> {
        if !(shape > 0.0 && scale > 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "gamma shape and scale must be positive, got {} and {}",
                shape, scale
            )));
        }
        Ok(Family::Gamma { shape, scale })
    }

    pub fn poisson(lambda: f64) -> Result<Family, EvalError> {
        if !(lambda > 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "poisson rate must be positive, got {}",
                lambda
            )));
        }
        Ok(Family::Poisson { lambda })
    }

    pub fn exponential(rate: f64) -> Result<Family, EvalError> {
        if !(rate > 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "exponential rate must be positive, got {}",
                rate
            )));
        }
        Ok(Family::Exponential { rate })
    }

    /// Exponential parameterized by its mean instead of its rate.
    pub fn exponential_mean(mean: f64) -> Result<Family, EvalError> {
        if !(mean > 0.0) {
            return Err(EvalError::invalid_parameter(format!(
                "exponential mean must be positive, got {}",
                mean
            )));
        }
        Ok(Family::Exponential { rate: 1.0 / mean })
    }

    pub fn binomial(trials: f64, p: f64) -> Result<Family, EvalError> {
        if !(trials > 0.0 && trials.fract() == 0.0 && trials.is_finite()) {
            return Err(EvalError::invalid_parameter(format!(
                "binomial trial count must be a positive integer, got {}",
                trials
            )));
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(EvalError::invalid_parameter(format!(
                "binomial probability must lie in [0, 1], got {}",
                p
            )));
        }
        Ok(Family::Binomial {
            trials: trials as u64,
            p,
        })
    }

    /// Discrete distribution over `values` with the given relative
    /// weights. Draws use cumulative weights plus binary search.
    pub fn weighted(values: Vec<f64>, weights: &[f64]) -> Result<Family, EvalError> {
        if values.is_empty() || values.len() != weights.len() {
            return Err(EvalError::invalid_parameter(format!(
                "weighted needs matching non-empty value/weight lists, got {} values and {} weights",
                values.len(),
                weights.len()
            )));
        }
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for &w in weights {
            if !(w >= 0.0) {
                return Err(EvalError::invalid_parameter(format!(
                    "weights must be non-negative, got {}",
                    w
                )));
            }
            total += w;
            cumulative.push(total);
        }
        if !(total > 0.0) {
            return Err(EvalError::invalid_parameter(
                "weights must not all be zero",
            ));
        }
        Ok(Family::Weighted { values, cumulative })
    }

    /// Draw `n` independent particles carrying `unit`.
    pub fn sample(&self, n: usize, unit: Unit, rng: &mut Rng) -> Quantity {
        let n = n.max(1);
        let particles: Vec<f64> = match self {
            Family::Lognormal { mu, sigma } => (0..n)
                .map(|_| (mu + sigma * rng.next_normal()).exp())
                .collect(),
            Family::Normal { mean, sd } => {
                (0..n).map(|_| mean + sd * rng.next_normal()).collect()
            }
            Family::Uniform { lo, hi } => {
                (0..n).map(|_| lo + (hi - lo) * rng.next_f64()).collect()
            }
            Family::Beta { alpha, beta } => (0..n)
                .map(|_| {
                    let x = sample_gamma(*alpha, 1.0, rng);
                    let y = sample_gamma(*beta, 1.0, rng);
                    x / (x + y)
                })
                .collect(),
            Family::Gamma { shape, scale } => {
                (0..n).map(|_| sample_gamma(*shape, *scale, rng)).collect()
            }
            Family::Poisson { lambda } => {
                (0..n).map(|_| sample_poisson(*lambda, rng)).collect()
            }
            Family::Exponential { rate } => (0..n)
                .map(|_| -(1.0 - rng.next_f64()).ln() / rate)
                .collect(),
            Family::Binomial { trials, p } => (0..n)
                .map(|_| sample_binomial(*trials, *p, rng))
                .collect(),
            Family::Weighted { values, cumulative } => {
                let total = cumulative.last().copied().unwrap_or(1.0);
                (0..n)
                    .map(|_| {
                        let u = rng.next_f64() * total;
                        values[cumulative.partition_point(|&c| c <= u).min(values.len() - 1)]
                    })
                    .collect()
            }
        };
        Quantity::from_particles(particles, unit)
    }
}

/// Half-width in standard normal units of a central interval covering
/// probability `confidence`.
fn confidence_z(confidence: f64) -> Result<f64, EvalError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(EvalError::invalid_parameter(format!(
            "confidence must lie strictly between 0 and 1, got {}",
            confidence
        )));
    }
    Ok(inverse_normal_cdf(0.5 * (1.0 + confidence)))
}

/// Inverse of the standard normal CDF, Abramowitz & Stegun 26.2.23
/// (|error| < 4.5e-4). Accurate enough for interval parameterization.
pub fn inverse_normal_cdf(p: f64) -> f64 {
    debug_assert!(p > 0.0 && p < 1.0);
    if p > 0.5 {
        return -inverse_normal_cdf(1.0 - p);
    }
    let t = (-2.0 * p.ln()).sqrt();
    let num = 2.515517 + t * (0.802853 + t * 0.010328);
    let den = 1.0 + t * (1.432788 + t * (0.189269 + t * 0.001308));
    -(t - num / den)
}

/// Marsaglia–Tsang rejection sampler. Shapes below one use the boost
/// `Gamma(shape) = Gamma(shape + 1) * U^(1/shape)`.
fn sample_gamma(shape: f64, scale: f64, rng: &mut Rng) -> f64 {
    if shape < 1.0 {
        let u = rng.next_f64().max(f64::MIN_POSITIVE);
        return sample_gamma(shape + 1.0, scale, rng) * u.powf(1.0 / shape);
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let x = rng.next_normal();
        let v = (1.0 + c * x).powi(3);
        if v <= 0.0 {
            continue;
        }
        let u = rng.next_f64();
        let x2 = x * x;
        if u < 1.0 - 0.0331 * x2 * x2 {
            return d * v * scale;
        }
        if u.ln() < 0.5 * x2 + d * (1.0 - v + v.ln()) {
            return d * v * scale;
        }
    }
}

/// Product-of-uniforms for small rates; rounded normal approximation
/// floored at zero once the rate is large enough for it to hold.
fn sample_poisson(lambda: f64, rng: &mut Rng) -> f64 {
    if lambda < 30.0 {
        let limit = (-lambda).exp();
        let mut count = 0u64;
        let mut product = 1.0;
        loop {
            product *= rng.next_f64();
            if product <= limit {
                break;
            }
            count += 1;
        }
        count as f64
    } else {
        (lambda + lambda.sqrt() * rng.next_normal()).round().max(0.0)
    }
}

/// Bernoulli-trial simulation while both tails are small, otherwise the
/// normal approximation clamped to `[0, n]` and rounded.
fn sample_binomial(trials: u64, p: f64, rng: &mut Rng) -> f64 {
    let n = trials as f64;
    if n * p < 10.0 && n * (1.0 - p) < 10.0 {
        let mut hits = 0u64;
        for _ in 0..trials {
            if rng.next_f64() < p {
                hits += 1;
            }
        }
        hits as f64
    } else {
        let mean = n * p;
        let sd = (n * p * (1.0 - p)).sqrt();
        (mean + sd * rng.next_normal()).clamp(0.0, n).round()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(family: Family, n: usize) -> Quantity {
        let mut rng = Rng::new(42);
        family.sample(n, Unit::dimensionless(), &mut rng)
    }

    #[test]
    fn test_normal_quantile_known_points() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-3);
        assert!((inverse_normal_cdf(0.95) - 1.6449).abs() < 2e-3);
        assert!((inverse_normal_cdf(0.975) - 1.9600).abs() < 2e-3);
        assert!(
            (inverse_normal_cdf(0.05) + inverse_normal_cdf(0.95)).abs() < 1e-9,
            "quantile must be antisymmetric about 0.5"
        );
    }

    #[test]
    fn test_lognormal_interval_hits_percentiles() {
        let q = draw(
            Family::lognormal_interval(1.0, 10.0, 0.9).expect("valid"),
            20_000,
        );
        let p5 = q.percentile(0.05).expect("in range");
        let p95 = q.percentile(0.95).expect("in range");
        assert!((p5 - 1.0).abs() < 0.15, "p5 = {}", p5);
        assert!((p95 - 10.0).abs() < 1.0, "p95 = {}", p95);
        assert!(q.values().iter().all(|&v| v > 0.0));
    }

    #[test]
    fn test_normal_interval_center_and_spread() {
        let q = draw(
            Family::normal_interval(-5.0, 15.0, 0.9).expect("valid"),
            20_000,
        );
        assert!((q.mean() - 5.0).abs() < 0.3);
        let p5 = q.percentile(0.05).expect("in range");
        assert!((p5 + 5.0).abs() < 0.5, "p5 = {}", p5);
    }

    #[test]
    fn test_uniform_stays_in_bounds() {
        let q = draw(Family::uniform(2.0, 6.0).expect("valid"), 10_000);
        assert!(q.values().iter().all(|&v| (2.0..6.0).contains(&v)));
        assert!((q.mean() - 4.0).abs() < 0.1);
    }

    #[test]
    fn test_poisson_moments_match_rate() {
        let q = draw(Family::poisson(4.0).expect("valid"), 20_000);
        assert!((q.mean() - 4.0).abs() < 0.15, "mean = {}", q.mean());
        let var = q.std() * q.std();
        assert!((var - 4.0).abs() < 0.4, "var = {}", var);
        assert!(q.values().iter().all(|&v| v >= 0.0 && v.fract() == 0.0));
    }

    #[test]
    fn test_poisson_normal_regime() {
        let q = draw(Family::poisson(100.0).expect("valid"), 20_000);
        assert!((q.mean() - 100.0).abs() < 1.0);
        let var = q.std() * q.std();
        assert!((var - 100.0).abs() < 10.0);
    }

    #[test]
    fn test_binomial_trial_regime_moments() {
        let q = draw(Family::binomial(10.0, 0.5).expect("valid"), 20_000);
        assert!((q.mean() - 5.0).abs() < 0.15);
        let var = q.std() * q.std();
        assert!((var - 2.5).abs() < 0.35);
    }

    #[test]
    fn test_binomial_normal_regime_moments() {
        let q = draw(Family::binomial(100.0, 0.3).expect("valid"), 20_000);
        assert!((q.mean() - 30.0).abs() < 0.5);
        let var = q.std() * q.std();
        assert!((var - 21.0).abs() < 2.5);
        assert!(q.values().iter().all(|&v| (0.0..=100.0).contains(&v)));
    }

    #[test]
    fn test_exponential_mean_is_reciprocal_rate() {
        let q = draw(Family::exponential(2.0).expect("valid"), 20_000);
        assert!((q.mean() - 0.5).abs() < 0.02);

        let q = draw(Family::exponential_mean(5.0).expect("valid"), 20_000);
        assert!((q.mean() - 5.0).abs() < 0.25);
    }

    #[test]
    fn test_outof_laplace_smoothing() {
        // outof(3, 7) = beta(4, 5), mean 4/9
        let q = draw(Family::out_of(3.0, 7.0).expect("valid"), 20_000);
        assert!((q.mean() - 4.0 / 9.0).abs() < 0.01, "mean = {}", q.mean());
        assert!(q.values().iter().all(|&v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_gamma_moments() {
        let q = draw(Family::gamma(3.0, 2.0).expect("valid"), 20_000);
        assert!((q.mean() - 6.0).abs() < 0.2, "mean = {}", q.mean());
        let var = q.std() * q.std();
        assert!((var - 12.0).abs() < 1.5, "var = {}", var);
    }

    #[test]
    fn test_gamma_boost_for_small_shape() {
        let q = draw(Family::gamma(0.5, 2.0).expect("valid"), 20_000);
        assert!((q.mean() - 1.0).abs() < 0.08, "mean = {}", q.mean());
        assert!(q.values().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_weighted_draws_only_listed_values() {
        let family = Family::weighted(vec![1.0, 10.0], &[1.0, 3.0]).expect("valid");
        let q = draw(family, 20_000);
        assert!(q.values().iter().all(|&v| v == 1.0 || v == 10.0));
        // expectation 0.25 * 1 + 0.75 * 10 = 7.75
        assert!((q.mean() - 7.75).abs() < 0.15, "mean = {}", q.mean());
    }

    #[test]
    fn test_parameter_validation() {
        assert!(matches!(
            Family::lognormal_interval(-1.0, 10.0, 0.9),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::poisson(0.0),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::binomial(10.5, 0.5),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::gamma(0.0, 1.0),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::uniform(5.0, 5.0),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::out_of(5.0, 3.0),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::normal_interval(3.0, 7.0, 1.0),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::weighted(vec![1.0], &[1.0, 2.0]),
            Err(EvalError::InvalidParameter { .. })
        ));
        assert!(matches!(
            Family::weighted(vec![1.0, 2.0], &[0.0, 0.0]),
            Err(EvalError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_same_seed_reproduces_particles() {
        let family = Family::lognormal_interval(1.0, 10.0, 0.9).expect("valid");
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        let qa = family.sample(100, Unit::dimensionless(), &mut a);
        let qb = family.sample(100, Unit::dimensionless(), &mut b);
        assert_eq!(qa.values(), qb.values());
    }
}
