//! First-order sensitivity analysis
//!
//! Decomposes an output distribution's variance across named inputs via
//! squared Pearson correlation. Particles pair positionally with modulo
//! wraparound, matching broadcast arithmetic, so an input correlates with
//! the output exactly when its draws flowed through the computation at
//! the same positions.

use crate::quantity::Quantity;
use serde::Serialize;

/// One input's contribution to the output's variance.
#[derive(Debug, Clone, Serialize)]
pub struct Contribution {
    pub name: String,
    /// Fraction of the explained variance, in `[0, 1]`; shares sum to 1
    /// unless nothing correlates.
    pub share: f64,
    pub correlation: f64,
}

/// Correlate each named input with the output and normalize the squared
/// correlations into fractional shares, largest first. Scalar inputs and
/// a scalar output contribute nothing.
pub fn variance_decomposition(
    output: &Quantity,
    inputs: &[(String, Quantity)],
) -> Vec<Contribution> {
    let mut contributions: Vec<Contribution> = inputs
        .iter()
        .map(|(name, input)| {
            let correlation = pearson(input.values(), output.values());
            Contribution {
                name: name.clone(),
                share: correlation * correlation,
                correlation,
            }
        })
        .collect();

    let total: f64 = contributions.iter().map(|c| c.share).sum();
    for c in &mut contributions {
        c.share = if total > 0.0 { c.share / total } else { 0.0 };
    }

    contributions.sort_by(|a, b| {
        b.share
            .partial_cmp(&a.share)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    contributions
}

/// Pearson correlation with the input indexed modulo its length.
fn pearson(input: &[f64], output: &[f64]) -> f64 {
    let n = output.len();
    if n < 2 || input.is_empty() {
        return 0.0;
    }
    let xs = |i: usize| input[i % input.len()];

    let mean_x: f64 = (0..n).map(xs).sum::<f64>() / n as f64;
    let mean_y: f64 = output.iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (i, &y) in output.iter().enumerate() {
        let dx = xs(i) - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return 0.0;
    }
    cov / (var_x * var_y).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn dist(values: Vec<f64>) -> Quantity {
        Quantity::from_particles(values, Unit::dimensionless())
    }

    #[test]
    fn test_perfectly_correlated_input_takes_the_whole_share() {
        let x: Vec<f64> = (0..100).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| 2.0 * v + 3.0).collect();
        let result = variance_decomposition(&dist(y), &[("x".into(), dist(x))]);
        assert_eq!(result.len(), 1);
        assert!((result[0].share - 1.0).abs() < 1e-12);
        assert!((result[0].correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_dominant_input_gets_the_larger_share() {
        // y = big + 0.1 * small, with uncorrelated inputs
        let big: Vec<f64> = (0..200).map(f64::from).collect();
        let small: Vec<f64> = (0..200).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let y: Vec<f64> = big
            .iter()
            .zip(&small)
            .map(|(b, s)| b + 0.1 * s)
            .collect();

        let result = variance_decomposition(
            &dist(y),
            &[("small".into(), dist(small)), ("big".into(), dist(big))],
        );
        assert_eq!(result[0].name, "big");
        assert!(result[0].share > 0.95, "big share {}", result[0].share);
        assert!(result[1].share < 0.05, "small share {}", result[1].share);
        let total: f64 = result.iter().map(|c| c.share).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_scalar_input_contributes_nothing() {
        let y: Vec<f64> = (0..50).map(f64::from).collect();
        let result = variance_decomposition(
            &dist(y),
            &[("k".into(), Quantity::dimensionless(5.0))],
        );
        assert_eq!(result[0].share, 0.0);
        assert_eq!(result[0].correlation, 0.0);
    }

    #[test]
    fn test_scalar_output_has_no_shares() {
        let x: Vec<f64> = (0..50).map(f64::from).collect();
        let result =
            variance_decomposition(&Quantity::dimensionless(7.0), &[("x".into(), dist(x))]);
        assert_eq!(result[0].share, 0.0);
    }

    #[test]
    fn test_wraparound_pairing() {
        // the short input repeats, exactly as broadcast arithmetic pairs it
        let input = dist(vec![1.0, 2.0]);
        let output = dist(vec![1.0, 2.0, 1.0, 2.0]);
        let result = variance_decomposition(&output, &[("x".into(), input)]);
        assert!((result[0].correlation - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_correlation_still_contributes() {
        let x: Vec<f64> = (0..100).map(f64::from).collect();
        let y: Vec<f64> = x.iter().map(|v| -v).collect();
        let result = variance_decomposition(&dist(y), &[("x".into(), dist(x))]);
        assert!((result[0].correlation + 1.0).abs() < 1e-12);
        assert!((result[0].share - 1.0).abs() < 1e-12);
    }
}
