//! Runtime units: term lists over the dimension basis
//!
//! A unit is an ordered list of terms, each tying a display symbol to the
//! dimension it measures, a scale factor into that dimension's prefix-free
//! base units, and a rational exponent. Multiplying or dividing units
//! canonicalizes the term list and reports a net numeric scale factor the
//! caller must fold into its sample values (km/m collapses to dimensionless
//! and scales by 1000).

use crate::units::dimension::{Dimension, Ratio};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One factor of a unit, e.g. the `km` in `km/h`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitTerm {
    /// Display symbol ("m", "km", "mile", "'widget")
    pub symbol: String,
    /// Dimension measured by one of this term's unit (exponent 1)
    pub dim: Dimension,
    /// How many base units one of this term's unit is (km → 1000)
    pub scale: f64,
    pub exp: Ratio,
}

impl UnitTerm {
    pub fn new(symbol: impl Into<String>, dim: Dimension, scale: f64) -> UnitTerm {
        UnitTerm {
            symbol: symbol.into(),
            dim,
            scale,
            exp: Ratio::ONE,
        }
    }

    pub fn with_exp(mut self, exp: Ratio) -> UnitTerm {
        self.exp = exp;
        self
    }
}

/// A (possibly compound) unit.
///
/// Units never compare by display string; compatibility is base-equality
/// of the derived dimension vectors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Unit {
    terms: Vec<UnitTerm>,
}

impl Unit {
    pub fn dimensionless() -> Unit {
        Unit { terms: Vec::new() }
    }

    pub fn single(symbol: impl Into<String>, dim: Dimension, scale: f64) -> Unit {
        Unit {
            terms: vec![UnitTerm::new(symbol, dim, scale)],
        }
    }

    /// Canonicalize a raw term list: group terms measuring the same
    /// dimension (whatever prefix or alias they arrived through), convert
    /// later terms into the first-seen term's scale, sum exponents, and
    /// drop anything that cancelled. Returns the net scale factor to fold
    /// into sample values.
    pub fn canonicalize(raw: Vec<UnitTerm>) -> (Unit, f64) {
        let mut terms: Vec<UnitTerm> = Vec::new();
        let mut factor = 1.0;

        for term in raw {
            if term.exp.is_zero() {
                continue;
            }
            // A term with an empty dimension is a pure scale (`%`): fold it.
            if term.dim.is_dimensionless() {
                factor *= term.scale.powf(term.exp.as_f64());
                continue;
            }
            match terms.iter_mut().find(|t| t.dim == term.dim) {
                Some(slot) => {
                    factor *= (term.scale / slot.scale).powf(term.exp.as_f64());
                    slot.exp = slot.exp.add(term.exp);
                }
                None => terms.push(term),
            }
        }

        terms.retain(|t| !t.exp.is_zero());
        (Unit { terms }, factor)
    }

    pub fn terms(&self) -> &[UnitTerm] {
        &self.terms
    }

    /// The unit's full dimension vector.
    pub fn dimension(&self) -> Dimension {
        self.terms
            .iter()
            .fold(Dimension::dimensionless(), |acc, t| {
                acc.mul(&t.dim.pow(t.exp))
            })
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimension().is_dimensionless()
    }

    /// Base-equality check used by add/sub/convert/compare.
    pub fn same_dimension(&self, other: &Unit) -> bool {
        self.dimension().equals(&other.dimension())
    }

    /// Scale of one of this unit in prefix-free base units.
    pub fn scale_to_base(&self) -> f64 {
        self.terms
            .iter()
            .fold(1.0, |acc, t| acc * t.scale.powf(t.exp.as_f64()))
    }

    /// Conversion factor from this unit into `target`, if base-equal.
    pub fn factor_to(&self, target: &Unit) -> Option<f64> {
        self.same_dimension(target)
            .then(|| self.scale_to_base() / target.scale_to_base())
    }

    /// `self × other`, canonicalized; the factor folds into values.
    pub fn mul(&self, other: &Unit) -> (Unit, f64) {
        let mut raw = self.terms.clone();
        raw.extend(other.terms.iter().cloned());
        Unit::canonicalize(raw)
    }

    /// `self ÷ other`, canonicalized; the factor folds into values.
    pub fn div(&self, other: &Unit) -> (Unit, f64) {
        self.mul(&other.pow(Ratio::from_int(-1)))
    }

    /// Raise to a rational power (no scale side effect: relative scales
    /// between terms are unchanged).
    pub fn pow(&self, k: Ratio) -> Unit {
        if k.is_zero() {
            return Unit::dimensionless();
        }
        let terms = self
            .terms
            .iter()
            .map(|t| t.clone().with_exp(t.exp.mul(k)))
            .collect();
        Unit { terms }
    }

    pub fn recip(&self) -> Unit {
        self.pow(Ratio::from_int(-1))
    }

    /// The prefix-free base-unit rendition of this unit's dimension
    /// (meter, gram, second, ...; custom labels stay themselves).
    pub fn base_unit(&self) -> Unit {
        let dim = self.dimension();
        let mut terms: Vec<UnitTerm> = dim
            .base_terms()
            .map(|(d, e)| UnitTerm::new(d.base_unit(), Dimension::base(d), 1.0).with_exp(e))
            .collect();
        terms.extend(dim.custom_terms().map(|(label, e)| {
            UnitTerm::new(format!("'{}", label), Dimension::custom(label), 1.0).with_exp(e)
        }));
        Unit { terms }
    }

    /// Human name of the dimension ("length", "velocity", ...), falling
    /// back to the dimension formula.
    pub fn dimension_name(&self) -> String {
        let dim = self.dimension();
        match dim.name() {
            Some(name) => name.to_string(),
            None => dim.to_string(),
        }
    }
}

fn format_term(term: &UnitTerm, negate: bool) -> String {
    let exp = if negate { term.exp.neg() } else { term.exp };
    if exp == Ratio::ONE {
        term.symbol.clone()
    } else if exp.is_integer() {
        format!("{}^{}", term.symbol, exp.num())
    } else {
        format!("{}^({})", term.symbol, exp)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return Ok(());
        }

        let mut num: Vec<String> = Vec::new();
        let mut den: Vec<String> = Vec::new();
        for term in &self.terms {
            if term.exp.is_positive() {
                num.push(format_term(term, false));
            } else {
                den.push(format_term(term, true));
            }
        }
        num.sort();
        den.sort();

        let num_str = if num.is_empty() {
            "1".to_string()
        } else {
            num.join("*")
        };

        if den.is_empty() {
            write!(f, "{}", num_str)
        } else if den.len() == 1 {
            write!(f, "{}/{}", num_str, den[0])
        } else {
            write!(f, "{}/({})", num_str, den.join("*"))
        }
    }
}
