//! Dimensional analysis over a fixed nine-dimension basis
//!
//! Every quantity has a dimension vector: one rational exponent per base
//! dimension (mass, length, time, current, temperature, amount, luminous
//! intensity, angle, information), plus labels for user-declared custom
//! units. Exponents are exact rationals so roots of units stay closed
//! (sqrt of an area is a length, sqrt of a length is length^1/2).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Number of base dimensions in the closed basis.
pub const BASE_COUNT: usize = 9;

/// A base dimension of the closed basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseDim {
    Mass,
    Length,
    Time,
    Current,
    Temperature,
    Amount,
    Luminosity,
    Angle,
    Information,
}

impl BaseDim {
    pub const ALL: [BaseDim; BASE_COUNT] = [
        BaseDim::Mass,
        BaseDim::Length,
        BaseDim::Time,
        BaseDim::Current,
        BaseDim::Temperature,
        BaseDim::Amount,
        BaseDim::Luminosity,
        BaseDim::Angle,
        BaseDim::Information,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// One-letter symbol used in dimension formulas.
    pub const fn symbol(self) -> &'static str {
        match self {
            BaseDim::Mass => "M",
            BaseDim::Length => "L",
            BaseDim::Time => "T",
            BaseDim::Current => "I",
            BaseDim::Temperature => "Θ",
            BaseDim::Amount => "N",
            BaseDim::Luminosity => "J",
            BaseDim::Angle => "A",
            BaseDim::Information => "B",
        }
    }

    /// Symbol of the prefix-free base unit for this dimension.
    pub const fn base_unit(self) -> &'static str {
        match self {
            BaseDim::Mass => "g",
            BaseDim::Length => "m",
            BaseDim::Time => "s",
            BaseDim::Current => "A",
            BaseDim::Temperature => "K",
            BaseDim::Amount => "mol",
            BaseDim::Luminosity => "cd",
            BaseDim::Angle => "rad",
            BaseDim::Information => "bit",
        }
    }
}

/// Exact rational exponent, always normalized (gcd 1, positive denominator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ratio {
    num: i32,
    den: i32,
}

const fn gcd(mut a: i32, mut b: i32) -> i32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    if a < 0 {
        -a
    } else {
        a
    }
}

impl Ratio {
    pub const ZERO: Ratio = Ratio { num: 0, den: 1 };
    pub const ONE: Ratio = Ratio { num: 1, den: 1 };

    /// Create a normalized rational. `den` must be non-zero.
    pub const fn new(num: i32, den: i32) -> Ratio {
        assert!(den != 0, "rational exponent with zero denominator");
        let g = gcd(num, den);
        let (num, den) = if g == 0 { (0, 1) } else { (num / g, den / g) };
        if den < 0 {
            Ratio {
                num: -num,
                den: -den,
            }
        } else {
            Ratio { num, den }
        }
    }

    pub const fn from_int(n: i32) -> Ratio {
        Ratio { num: n, den: 1 }
    }

    pub const fn num(self) -> i32 {
        self.num
    }

    pub const fn den(self) -> i32 {
        self.den
    }

    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    pub const fn is_integer(self) -> bool {
        self.den == 1
    }

    pub const fn is_positive(self) -> bool {
        self.num > 0
    }

    pub fn add(self, other: Ratio) -> Ratio {
        Ratio::new(self.num * other.den + other.num * self.den, self.den * other.den)
    }

    pub fn sub(self, other: Ratio) -> Ratio {
        Ratio::new(self.num * other.den - other.num * self.den, self.den * other.den)
    }

    pub fn mul(self, other: Ratio) -> Ratio {
        Ratio::new(self.num * other.num, self.den * other.den)
    }

    pub const fn neg(self) -> Ratio {
        Ratio {
            num: -self.num,
            den: self.den,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Recover a small exact rational from a float exponent (for `x ^ 0.5`
    /// on dimensioned values). Denominators up to 12 are recognized.
    pub fn approximate(x: f64) -> Option<Ratio> {
        if !x.is_finite() {
            return None;
        }
        for den in 1..=12i32 {
            let scaled = x * den as f64;
            let rounded = scaled.round();
            if (scaled - rounded).abs() < 1e-9 && rounded.abs() <= i32::MAX as f64 {
                return Some(Ratio::new(rounded as i32, den));
            }
        }
        None
    }
}

impl Default for Ratio {
    fn default() -> Ratio {
        Ratio::ZERO
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// A dimension vector: rational exponents over the nine-base vector plus
/// custom labels introduced by tick units (`'widget`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Dimension {
    exponents: [Ratio; BASE_COUNT],
    customs: BTreeMap<String, Ratio>,
}

impl Dimension {
    /// Dimensionless (pure number)
    pub fn dimensionless() -> Dimension {
        Dimension::default()
    }

    /// A single base dimension to the first power.
    pub fn base(dim: BaseDim) -> Dimension {
        let mut exponents = [Ratio::ZERO; BASE_COUNT];
        exponents[dim.index()] = Ratio::ONE;
        Dimension {
            exponents,
            customs: BTreeMap::new(),
        }
    }

    /// A custom dimension label to the first power.
    pub fn custom(label: impl Into<String>) -> Dimension {
        let mut customs = BTreeMap::new();
        customs.insert(label.into(), Ratio::ONE);
        Dimension {
            exponents: [Ratio::ZERO; BASE_COUNT],
            customs,
        }
    }

    pub fn exponent(&self, dim: BaseDim) -> Ratio {
        self.exponents[dim.index()]
    }

    /// Multiply dimensions (add exponents)
    pub fn mul(&self, other: &Dimension) -> Dimension {
        let mut exponents = [Ratio::ZERO; BASE_COUNT];
        for i in 0..BASE_COUNT {
            exponents[i] = self.exponents[i].add(other.exponents[i]);
        }
        let mut customs = self.customs.clone();
        for (label, exp) in &other.customs {
            let merged = customs
                .get(label)
                .copied()
                .unwrap_or(Ratio::ZERO)
                .add(*exp);
            if merged.is_zero() {
                customs.remove(label);
            } else {
                customs.insert(label.clone(), merged);
            }
        }
        Dimension { exponents, customs }
    }

    /// Divide dimensions (subtract exponents)
    pub fn div(&self, other: &Dimension) -> Dimension {
        self.mul(&other.recip())
    }

    /// Reciprocal (negate all exponents)
    pub fn recip(&self) -> Dimension {
        self.pow(Ratio::from_int(-1))
    }

    /// Raise to a rational power (scale all exponents)
    pub fn pow(&self, k: Ratio) -> Dimension {
        let mut exponents = [Ratio::ZERO; BASE_COUNT];
        for i in 0..BASE_COUNT {
            exponents[i] = self.exponents[i].mul(k);
        }
        let customs = if k.is_zero() {
            BTreeMap::new()
        } else {
            self.customs
                .iter()
                .map(|(label, exp)| (label.clone(), exp.mul(k)))
                .collect()
        };
        Dimension { exponents, customs }
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| e.is_zero()) && self.customs.is_empty()
    }

    /// Base-equality: full equality of the vector and custom labels.
    pub fn equals(&self, other: &Dimension) -> bool {
        self == other
    }

    /// Iterate over non-zero base exponents.
    pub fn base_terms(&self) -> impl Iterator<Item = (BaseDim, Ratio)> + '_ {
        BaseDim::ALL
            .iter()
            .copied()
            .filter_map(|d| {
                let e = self.exponents[d.index()];
                (!e.is_zero()).then_some((d, e))
            })
    }

    /// Iterate over custom labels and their exponents.
    pub fn custom_terms(&self) -> impl Iterator<Item = (&str, Ratio)> + '_ {
        self.customs.iter().map(|(l, e)| (l.as_str(), *e))
    }

    /// Get the name of this dimension if it matches a known formula.
    pub fn name(&self) -> Option<&'static str> {
        if !self.customs.is_empty() {
            return None;
        }
        let ints: Option<Vec<i32>> = self
            .exponents
            .iter()
            .map(|e| e.is_integer().then_some(e.num()))
            .collect();
        let ints = ints?;
        // [M, L, T, I, Θ, N, J, A, B]
        match ints.as_slice() {
            [0, 0, 0, 0, 0, 0, 0, 0, 0] => Some("dimensionless"),
            [1, 0, 0, 0, 0, 0, 0, 0, 0] => Some("mass"),
            [0, 1, 0, 0, 0, 0, 0, 0, 0] => Some("length"),
            [0, 0, 1, 0, 0, 0, 0, 0, 0] => Some("time"),
            [0, 0, 0, 1, 0, 0, 0, 0, 0] => Some("electric current"),
            [0, 0, 0, 0, 1, 0, 0, 0, 0] => Some("temperature"),
            [0, 0, 0, 0, 0, 1, 0, 0, 0] => Some("amount of substance"),
            [0, 0, 0, 0, 0, 0, 1, 0, 0] => Some("luminous intensity"),
            [0, 0, 0, 0, 0, 0, 0, 1, 0] => Some("angle"),
            [0, 0, 0, 0, 0, 0, 0, 0, 1] => Some("information"),
            [0, 2, 0, 0, 0, 0, 0, 0, 0] => Some("area"),
            [0, 3, 0, 0, 0, 0, 0, 0, 0] => Some("volume"),
            [0, 1, -1, 0, 0, 0, 0, 0, 0] => Some("velocity"),
            [0, 1, -2, 0, 0, 0, 0, 0, 0] => Some("acceleration"),
            [1, 1, -2, 0, 0, 0, 0, 0, 0] => Some("force"),
            [1, 2, -2, 0, 0, 0, 0, 0, 0] => Some("energy"),
            [1, 2, -3, 0, 0, 0, 0, 0, 0] => Some("power"),
            [1, -1, -2, 0, 0, 0, 0, 0, 0] => Some("pressure"),
            [0, 0, -1, 0, 0, 0, 0, 0, 0] => Some("frequency"),
            [0, 0, -1, 0, 0, 0, 0, 0, 1] => Some("data rate"),
            _ => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dimensionless() {
            return write!(f, "1");
        }

        let mut num: Vec<String> = Vec::new();
        let mut den: Vec<String> = Vec::new();

        let mut push = |bucket: &mut Vec<String>, symbol: &str, exp: Ratio| {
            if exp == Ratio::ONE {
                bucket.push(symbol.to_string());
            } else if exp.is_integer() {
                bucket.push(format!("{}{}", symbol, superscript(exp.num())));
            } else {
                bucket.push(format!("{}^{}", symbol, exp));
            }
        };

        for (dim, exp) in self.base_terms() {
            if exp.is_positive() {
                push(&mut num, dim.symbol(), exp);
            } else {
                push(&mut den, dim.symbol(), exp.neg());
            }
        }
        for (label, exp) in self.custom_terms() {
            let symbol = format!("'{}", label);
            if exp.is_positive() {
                push(&mut num, &symbol, exp);
            } else {
                push(&mut den, &symbol, exp.neg());
            }
        }

        let num_str = if num.is_empty() {
            "1".to_string()
        } else {
            num.join(" ")
        };

        if den.is_empty() {
            write!(f, "{}", num_str)
        } else {
            write!(f, "{} / {}", num_str, den.join(" "))
        }
    }
}

/// Convert a positive integer to superscript digits
fn superscript(n: i32) -> String {
    let digits: Vec<char> = n.abs().to_string().chars().collect();
    let mut result = String::new();

    for d in digits {
        result.push(match d {
            '0' => '⁰',
            '1' => '¹',
            '2' => '²',
            '3' => '³',
            '4' => '⁴',
            '5' => '⁵',
            '6' => '⁶',
            '7' => '⁷',
            '8' => '⁸',
            '9' => '⁹',
            _ => d,
        });
    }

    if n < 0 {
        format!("⁻{}", result)
    } else {
        result
    }
}
