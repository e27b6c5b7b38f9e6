//! Quantities: scalars or Monte Carlo particle sets with a shared unit
//!
//! The calculator's single value type. A quantity is immutable; every
//! operation returns a new one. Arithmetic broadcasts elementwise over
//! `max(len_a, len_b)` positions with modular index wraparound, so a
//! scalar combines with every particle and unequal particle counts reuse
//! the shorter set cyclically.

use crate::diagnostics::EvalError;
use crate::units::dimension::Ratio;
use crate::units::{parse_target_unit, parse_unit, Unit};
use std::fmt;

/// Scalar state or particle state. Particle vectors are never empty.
#[derive(Debug, Clone, PartialEq)]
enum Samples {
    Scalar(f64),
    Particles(Vec<f64>),
}

/// A value with a unit: one number, or a particle set approximating a
/// probability distribution.
#[derive(Debug, Clone)]
pub struct Quantity {
    samples: Samples,
    unit: Unit,
}

impl Quantity {
    pub fn scalar(value: f64, unit: Unit) -> Quantity {
        Quantity {
            samples: Samples::Scalar(value),
            unit,
        }
    }

    pub fn dimensionless(value: f64) -> Quantity {
        Quantity::scalar(value, Unit::dimensionless())
    }

    pub fn from_particles(values: Vec<f64>, unit: Unit) -> Quantity {
        debug_assert!(!values.is_empty(), "particle set must be non-empty");
        Quantity {
            samples: Samples::Particles(values),
            unit,
        }
    }

    /// Construct from a value and unit text ("kilometer" normalizes to
    /// meter, scaling the value by 1000).
    pub fn new(value: f64, unit_text: &str) -> Result<Quantity, EvalError> {
        let (unit, factor) = parse_unit(unit_text)?;
        Ok(Quantity::scalar(value * factor, unit))
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    /// Unit display string; "dimensionless" when empty.
    pub fn unit_label(&self) -> String {
        let s = self.unit.to_string();
        if s.is_empty() {
            "dimensionless".to_string()
        } else {
            s
        }
    }

    pub fn dimension_name(&self) -> String {
        self.unit.dimension_name()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.samples, Samples::Scalar(_))
    }

    pub fn is_distribution(&self) -> bool {
        !self.is_scalar()
    }

    pub fn sample_count(&self) -> usize {
        match &self.samples {
            Samples::Scalar(_) => 1,
            Samples::Particles(v) => v.len(),
        }
    }

    /// View the underlying values (a scalar views as one element).
    pub fn values(&self) -> &[f64] {
        match &self.samples {
            Samples::Scalar(v) => std::slice::from_ref(v),
            Samples::Particles(v) => v,
        }
    }

    /// The raw particle vector (a scalar copies out as one particle).
    pub fn to_particles(&self) -> Vec<f64> {
        self.values().to_vec()
    }

    pub fn scalar_value(&self) -> Option<f64> {
        match self.samples {
            Samples::Scalar(v) => Some(v),
            Samples::Particles(_) => None,
        }
    }

    /// Scalar value or mean: the reduction applied to raw-number
    /// distribution-constructor arguments.
    pub fn reduce(&self) -> f64 {
        match &self.samples {
            Samples::Scalar(v) => *v,
            Samples::Particles(_) => self.mean(),
        }
    }

    // ===== Statistics =====

    pub fn mean(&self) -> f64 {
        let v = self.values();
        v.iter().sum::<f64>() / v.len() as f64
    }

    pub fn std(&self) -> f64 {
        match &self.samples {
            Samples::Scalar(_) => 0.0,
            Samples::Particles(v) => {
                let mean = self.mean();
                let var = v.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / v.len() as f64;
                var.sqrt()
            }
        }
    }

    pub fn median(&self) -> f64 {
        self.percentile(0.5).unwrap_or_else(|_| self.mean())
    }

    /// Order statistic at probability `p` in [0, 1]: sorts a copy and
    /// selects index `floor(p * n)` clamped to `n - 1`. Deliberately not
    /// interpolated, so `percentile(0.0)` is the minimum and
    /// `percentile(1.0)` the maximum.
    pub fn percentile(&self, p: f64) -> Result<f64, EvalError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(EvalError::OutOfRange {
                what: "percentile".into(),
                value: p,
                expected: "0 <= p <= 1".into(),
            });
        }
        match &self.samples {
            Samples::Scalar(v) => Ok(*v),
            Samples::Particles(v) => {
                let mut sorted = v.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                let idx = ((p * sorted.len() as f64) as usize).min(sorted.len() - 1);
                Ok(sorted[idx])
            }
        }
    }

    // ===== Elementwise machinery =====

    /// Map every value, keeping the unit.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Quantity {
        let samples = match &self.samples {
            Samples::Scalar(v) => Samples::Scalar(f(*v)),
            Samples::Particles(v) => Samples::Particles(v.iter().map(|&x| f(x)).collect()),
        };
        Quantity {
            samples,
            unit: self.unit.clone(),
        }
    }

    /// Elementwise combination with modular wraparound broadcasting.
    /// The caller supplies the result unit.
    fn zip_with(&self, other: &Quantity, unit: Unit, f: impl Fn(f64, f64) -> f64) -> Quantity {
        match (&self.samples, &other.samples) {
            (Samples::Scalar(a), Samples::Scalar(b)) => Quantity::scalar(f(*a, *b), unit),
            _ => {
                let a = self.values();
                let b = other.values();
                let n = a.len().max(b.len());
                let out: Vec<f64> = (0..n).map(|i| f(a[i % a.len()], b[i % b.len()])).collect();
                Quantity::from_particles(out, unit)
            }
        }
    }

    /// Conversion factor bringing `other` into this quantity's unit.
    fn align_factor(&self, other: &Quantity, op: &str) -> Result<f64, EvalError> {
        other.unit.factor_to(&self.unit).ok_or_else(|| {
            EvalError::incompatible_units(op, self.unit_label(), other.unit_label())
        })
    }

    // ===== Arithmetic =====

    pub fn add(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        let factor = self.align_factor(other, "addition")?;
        Ok(self.zip_with(other, self.unit.clone(), |a, b| a + b * factor))
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        let factor = self.align_factor(other, "subtraction")?;
        Ok(self.zip_with(other, self.unit.clone(), |a, b| a - b * factor))
    }

    pub fn mul(&self, other: &Quantity) -> Quantity {
        let (unit, factor) = self.unit.mul(&other.unit);
        self.zip_with(other, unit, |a, b| a * b * factor)
    }

    pub fn div(&self, other: &Quantity) -> Quantity {
        let (unit, factor) = self.unit.div(&other.unit);
        self.zip_with(other, unit, |a, b| a / b * factor)
    }

    pub fn neg(&self) -> Quantity {
        self.map(|v| -v)
    }

    /// Exponentiation. Dimensioned bases need an exponent that is a plain
    /// number representable as a small rational, so the unit stays exact.
    pub fn pow(&self, exponent: &Quantity) -> Result<Quantity, EvalError> {
        if !exponent.unit.is_dimensionless() {
            return Err(EvalError::invalid_parameter(format!(
                "exponent must be dimensionless, got `{}`",
                exponent.unit_label()
            )));
        }

        if self.unit.is_dimensionless() {
            return Ok(self.zip_with(exponent, Unit::dimensionless(), f64::powf));
        }

        let k = exponent.scalar_value().ok_or_else(|| {
            EvalError::invalid_parameter(
                "exponent of a dimensioned quantity must be a single number",
            )
        })?;
        let ratio = Ratio::approximate(k).ok_or_else(|| {
            EvalError::invalid_parameter(format!(
                "cannot raise `{}` to power {}: exponent is not a small rational",
                self.unit_label(),
                k
            ))
        })?;
        Ok(Quantity {
            samples: self.map(|v| v.powf(k)).samples,
            unit: self.unit.pow(ratio),
        })
    }

    pub fn min_with(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        let factor = self.align_factor(other, "min")?;
        Ok(self.zip_with(other, self.unit.clone(), move |a, b| a.min(b * factor)))
    }

    pub fn max_with(&self, other: &Quantity) -> Result<Quantity, EvalError> {
        let factor = self.align_factor(other, "max")?;
        Ok(self.zip_with(other, self.unit.clone(), move |a, b| a.max(b * factor)))
    }

    /// Comparison on means: a dimensionless 0/1 scalar. Scalars compare by
    /// value, distributions by their means, the right side converted into
    /// the left's unit first.
    pub fn compare(
        &self,
        other: &Quantity,
        op: fn(f64, f64) -> bool,
        op_name: &str,
    ) -> Result<Quantity, EvalError> {
        let factor = self.align_factor(other, op_name)?;
        let holds = op(self.mean(), other.mean() * factor);
        Ok(Quantity::dimensionless(if holds { 1.0 } else { 0.0 }))
    }

    // ===== Conversion =====

    /// Convert into a target unit, multiplying every sample by the scalar
    /// conversion factor.
    pub fn convert(&self, target: &Unit) -> Result<Quantity, EvalError> {
        let factor = self.unit.factor_to(target).ok_or_else(|| {
            EvalError::incompatible_units(
                "conversion",
                self.unit_label(),
                {
                    let s = target.to_string();
                    if s.is_empty() {
                        "dimensionless".to_string()
                    } else {
                        s
                    }
                },
            )
        })?;
        Ok(Quantity {
            samples: self.map(|v| v * factor).samples,
            unit: target.clone(),
        })
    }

    /// Convert using a unit string as the target ("km" stays km).
    pub fn convert_str(&self, target: &str) -> Result<Quantity, EvalError> {
        self.convert(&parse_target_unit(target)?)
    }

    /// Convert to the prefix-free base representation of the dimension.
    pub fn to_si(&self) -> Quantity {
        let base = self.unit.base_unit();
        // Same dimension by construction
        let factor = self.unit.factor_to(&base).unwrap_or(1.0);
        Quantity {
            samples: self.map(|v| v * factor).samples,
            unit: base,
        }
    }
}

fn fmt_value(v: f64) -> String {
    if !v.is_finite() {
        return format!("{}", v);
    }
    if v == 0.0 {
        return "0".to_string();
    }
    let abs = v.abs();
    if !(1e-4..1e9).contains(&abs) {
        return format!("{:.3e}", v);
    }
    if v.fract() == 0.0 {
        return format!("{}", v);
    }
    let s = format!("{:.4}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    s.to_string()
}

// Display is the CLI's human format: scalars print as `value unit`,
// distributions as a 90% interval plus the mean.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.unit.to_string();
        match &self.samples {
            Samples::Scalar(v) => {
                write!(f, "{}", fmt_value(*v))?;
                if !unit.is_empty() {
                    write!(f, " {}", unit)?;
                }
                Ok(())
            }
            Samples::Particles(_) => {
                // p = 0.05 and 0.95 are always in range
                let lo = self.percentile(0.05).unwrap_or(f64::NAN);
                let hi = self.percentile(0.95).unwrap_or(f64::NAN);
                write!(f, "{} .. {}", fmt_value(lo), fmt_value(hi))?;
                if !unit.is_empty() {
                    write!(f, " {}", unit)?;
                }
                write!(f, ", mean {}", fmt_value(self.mean()))?;
                if !unit.is_empty() {
                    write!(f, " {}", unit)?;
                }
                Ok(())
            }
        }
    }
}
