//! The fixed unit vocabulary
//!
//! An alias table (canonical symbol, long names, scale into prefix-free
//! base units) consulted before SI-prefix decomposition: long prefixes
//! combine with long names ("kilometers"), symbol prefixes with symbols
//! ("km"). The table is built once and validated by tests; resolving an
//! unknown token is the caller's `UnknownUnit` case.

use crate::diagnostics::EvalError;
use crate::suggest;
use crate::units::dimension::{BaseDim, Dimension, Ratio};
use crate::units::unit::{Unit, UnitTerm};
use std::collections::HashMap;
use std::sync::LazyLock;

/// One vocabulary entry: a unit the calculator knows by name.
#[derive(Debug, Clone)]
pub struct UnitEntry {
    /// Canonical display symbol
    pub symbol: &'static str,
    /// Dimension measured by this unit
    pub dim: Dimension,
    /// Scale of one of this unit in prefix-free base units
    pub scale: f64,
    /// Short spellings (combine with symbol prefixes: "km")
    pub symbols: &'static [&'static str],
    /// Long spellings (combine with long prefixes: "kilometers")
    pub names: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
struct Prefix {
    symbol: &'static str,
    name: &'static str,
    factor: f64,
}

const PREFIXES: &[Prefix] = &[
    Prefix { symbol: "a", name: "atto", factor: 1e-18 },
    Prefix { symbol: "f", name: "femto", factor: 1e-15 },
    Prefix { symbol: "p", name: "pico", factor: 1e-12 },
    Prefix { symbol: "n", name: "nano", factor: 1e-9 },
    Prefix { symbol: "u", name: "micro", factor: 1e-6 },
    Prefix { symbol: "µ", name: "micro", factor: 1e-6 },
    Prefix { symbol: "m", name: "milli", factor: 1e-3 },
    Prefix { symbol: "c", name: "centi", factor: 1e-2 },
    Prefix { symbol: "d", name: "deci", factor: 1e-1 },
    Prefix { symbol: "da", name: "deca", factor: 1e1 },
    Prefix { symbol: "h", name: "hecto", factor: 1e2 },
    Prefix { symbol: "k", name: "kilo", factor: 1e3 },
    Prefix { symbol: "M", name: "mega", factor: 1e6 },
    Prefix { symbol: "G", name: "giga", factor: 1e9 },
    Prefix { symbol: "T", name: "tera", factor: 1e12 },
    Prefix { symbol: "P", name: "peta", factor: 1e15 },
    Prefix { symbol: "E", name: "exa", factor: 1e18 },
];

/// A successfully resolved unit token.
#[derive(Debug, Clone)]
pub struct ResolvedUnit {
    /// Canonical symbol of the underlying entry ("m")
    pub entry_symbol: String,
    /// Display symbol including any prefix ("km")
    pub display: String,
    pub dim: Dimension,
    /// Scale of one entry unit in base units (mile → 1609.344)
    pub entry_scale: f64,
    /// Prefix factor ("k" → 1000, none → 1)
    pub prefix_factor: f64,
}

impl ResolvedUnit {
    /// Literal-construction view: normalize the prefix away, returning the
    /// base entry's term and the factor to multiply into the value
    /// ("kilometer" → meter term, value × 1000).
    pub fn construct_term(&self) -> (UnitTerm, f64) {
        (
            UnitTerm::new(self.entry_symbol.clone(), self.dim.clone(), self.entry_scale),
            self.prefix_factor,
        )
    }

    /// Conversion-target view: keep the prefixed unit so `to("km")`
    /// round-trips displaying `km`.
    pub fn target_term(&self) -> UnitTerm {
        UnitTerm::new(
            self.display.clone(),
            self.dim.clone(),
            self.entry_scale * self.prefix_factor,
        )
    }
}

pub struct Vocabulary {
    entries: Vec<UnitEntry>,
    by_symbol: HashMap<&'static str, usize>,
    by_name: HashMap<&'static str, usize>,
}

fn dim(d: BaseDim) -> Dimension {
    Dimension::base(d)
}

fn entries() -> Vec<UnitEntry> {
    use BaseDim::*;

    let energy = dim(Mass)
        .mul(&dim(Length).pow(Ratio::from_int(2)))
        .div(&dim(Time).pow(Ratio::from_int(2)));
    let power = energy.div(&dim(Time));
    let force = dim(Mass)
        .mul(&dim(Length))
        .div(&dim(Time).pow(Ratio::from_int(2)));

    vec![
        // Length
        UnitEntry { symbol: "m", dim: dim(Length), scale: 1.0, symbols: &["m"], names: &["meter", "meters", "metre", "metres"] },
        UnitEntry { symbol: "inch", dim: dim(Length), scale: 0.0254, symbols: &[], names: &["inch", "inches"] },
        UnitEntry { symbol: "ft", dim: dim(Length), scale: 0.3048, symbols: &["ft"], names: &["foot", "feet"] },
        UnitEntry { symbol: "yd", dim: dim(Length), scale: 0.9144, symbols: &["yd"], names: &["yard", "yards"] },
        UnitEntry { symbol: "mile", dim: dim(Length), scale: 1609.344, symbols: &["mi"], names: &["mile", "miles"] },
        UnitEntry { symbol: "au", dim: dim(Length), scale: 1.495_978_707e11, symbols: &["au"], names: &["astronomical_unit"] },
        UnitEntry { symbol: "ly", dim: dim(Length), scale: 9.460_730_472_580_8e15, symbols: &["ly"], names: &["lightyear", "lightyears"] },
        // Mass
        UnitEntry { symbol: "g", dim: dim(Mass), scale: 1.0, symbols: &["g"], names: &["gram", "grams"] },
        UnitEntry { symbol: "t", dim: dim(Mass), scale: 1e6, symbols: &["t"], names: &["tonne", "tonnes", "ton", "tons"] },
        UnitEntry { symbol: "lb", dim: dim(Mass), scale: 453.592_37, symbols: &["lb", "lbs"], names: &["pound", "pounds"] },
        UnitEntry { symbol: "oz", dim: dim(Mass), scale: 28.349_523_125, symbols: &["oz"], names: &["ounce", "ounces"] },
        // Time
        UnitEntry { symbol: "s", dim: dim(Time), scale: 1.0, symbols: &["s", "sec", "secs"], names: &["second", "seconds"] },
        UnitEntry { symbol: "min", dim: dim(Time), scale: 60.0, symbols: &["min"], names: &["minute", "minutes"] },
        UnitEntry { symbol: "h", dim: dim(Time), scale: 3600.0, symbols: &["h", "hr", "hrs"], names: &["hour", "hours"] },
        UnitEntry { symbol: "day", dim: dim(Time), scale: 86_400.0, symbols: &[], names: &["day", "days"] },
        UnitEntry { symbol: "week", dim: dim(Time), scale: 604_800.0, symbols: &["wk"], names: &["week", "weeks"] },
        UnitEntry { symbol: "month", dim: dim(Time), scale: 2_629_800.0, symbols: &[], names: &["month", "months"] },
        UnitEntry { symbol: "year", dim: dim(Time), scale: 31_557_600.0, symbols: &["yr", "yrs"], names: &["year", "years"] },
        // Current
        UnitEntry { symbol: "A", dim: dim(Current), scale: 1.0, symbols: &["A"], names: &["amp", "amps", "ampere", "amperes"] },
        // Temperature
        UnitEntry { symbol: "K", dim: dim(Temperature), scale: 1.0, symbols: &["K"], names: &["kelvin"] },
        // Amount
        UnitEntry { symbol: "mol", dim: dim(Amount), scale: 1.0, symbols: &["mol"], names: &["mole", "moles"] },
        // Luminous intensity
        UnitEntry { symbol: "cd", dim: dim(Luminosity), scale: 1.0, symbols: &["cd"], names: &["candela"] },
        // Angle
        UnitEntry { symbol: "rad", dim: dim(Angle), scale: 1.0, symbols: &["rad"], names: &["radian", "radians"] },
        UnitEntry { symbol: "deg", dim: dim(Angle), scale: std::f64::consts::PI / 180.0, symbols: &["deg"], names: &["degree", "degrees"] },
        // Information
        UnitEntry { symbol: "bit", dim: dim(Information), scale: 1.0, symbols: &["bit"], names: &["bits"] },
        UnitEntry { symbol: "B", dim: dim(Information), scale: 8.0, symbols: &["B"], names: &["byte", "bytes"] },
        // Derived
        UnitEntry { symbol: "Hz", dim: dim(Time).recip(), scale: 1.0, symbols: &["Hz", "hz"], names: &["hertz"] },
        UnitEntry { symbol: "L", dim: dim(Length).pow(Ratio::from_int(3)), scale: 1e-3, symbols: &["L", "l"], names: &["liter", "liters", "litre", "litres"] },
        UnitEntry { symbol: "J", dim: energy, scale: 1000.0, symbols: &["J"], names: &["joule", "joules"] },
        UnitEntry { symbol: "W", dim: power, scale: 1000.0, symbols: &["W"], names: &["watt", "watts"] },
        UnitEntry { symbol: "N", dim: force, scale: 1000.0, symbols: &["N"], names: &["newton", "newtons"] },
        UnitEntry { symbol: "%", dim: Dimension::dimensionless(), scale: 0.01, symbols: &["%"], names: &["percent"] },
    ]
}

impl Vocabulary {
    fn build() -> Vocabulary {
        let entries = entries();
        let mut by_symbol = HashMap::new();
        let mut by_name = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            for &s in entry.symbols {
                by_symbol.insert(s, i);
            }
            for &n in entry.names {
                by_name.insert(n, i);
            }
        }
        Vocabulary {
            entries,
            by_symbol,
            by_name,
        }
    }

    pub fn entries(&self) -> &[UnitEntry] {
        &self.entries
    }

    fn direct(&self, token: &str) -> Option<&UnitEntry> {
        self.by_symbol
            .get(token)
            .or_else(|| self.by_name.get(token))
            .map(|&i| &self.entries[i])
    }

    /// Resolve a unit token, trying the alias table before SI-prefix
    /// decomposition.
    pub fn resolve(&self, token: &str) -> Option<ResolvedUnit> {
        if let Some(entry) = self.direct(token) {
            return Some(ResolvedUnit {
                entry_symbol: entry.symbol.to_string(),
                display: entry.symbol.to_string(),
                dim: entry.dim.clone(),
                entry_scale: entry.scale,
                prefix_factor: 1.0,
            });
        }

        // Longest prefixes first so "da" wins over "d"
        let mut prefixes: Vec<&Prefix> = PREFIXES.iter().collect();
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.name.len()));
        for prefix in &prefixes {
            if let Some(rest) = token.strip_prefix(prefix.name) {
                if let Some(&i) = self.by_name.get(rest) {
                    let entry = &self.entries[i];
                    return Some(ResolvedUnit {
                        entry_symbol: entry.symbol.to_string(),
                        display: format!("{}{}", prefix.symbol, entry.symbol),
                        dim: entry.dim.clone(),
                        entry_scale: entry.scale,
                        prefix_factor: prefix.factor,
                    });
                }
            }
        }
        prefixes.sort_by_key(|p| std::cmp::Reverse(p.symbol.len()));
        for prefix in &prefixes {
            if let Some(rest) = token.strip_prefix(prefix.symbol) {
                if let Some(&i) = self.by_symbol.get(rest) {
                    let entry = &self.entries[i];
                    return Some(ResolvedUnit {
                        entry_symbol: entry.symbol.to_string(),
                        display: format!("{}{}", prefix.symbol, entry.symbol),
                        dim: entry.dim.clone(),
                        entry_scale: entry.scale,
                        prefix_factor: prefix.factor,
                    });
                }
            }
        }
        None
    }

    /// Whether a token names a known unit (used by the parser to decide
    /// if an identifier continues a unit expression).
    pub fn is_known(&self, token: &str) -> bool {
        self.resolve(token).is_some()
    }

    /// Every plain alias, for "did you mean" candidates.
    pub fn all_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .flat_map(|e| e.symbols.iter().chain(e.names.iter()).copied())
    }

    /// Listing rows (symbol, dimension, aliases) for `:units` and the
    /// `units` subcommand.
    pub fn catalog(&self) -> Vec<(String, String, String)> {
        self.entries
            .iter()
            .map(|e| {
                let dimension = e.dim.name().unwrap_or("derived").to_string();
                let aliases: Vec<&str> =
                    e.symbols.iter().chain(e.names.iter()).copied().collect();
                (e.symbol.to_string(), dimension, aliases.join(", "))
            })
            .collect()
    }
}

/// The compiled-in vocabulary.
pub static VOCABULARY: LazyLock<Vocabulary> = LazyLock::new(Vocabulary::build);

/// Build the `UnknownUnit` error for a token, with ranked suggestions.
pub fn unknown_unit(token: &str) -> EvalError {
    EvalError::UnknownUnit {
        name: token.to_string(),
        suggestion: suggest::did_you_mean(token, VOCABULARY.all_names()),
    }
}

fn apply_token(
    raw: &mut Vec<UnitTerm>,
    factor: &mut f64,
    token: &str,
    exp: Ratio,
    target_mode: bool,
) -> Result<(), EvalError> {
    if token == "1" {
        return Ok(());
    }
    let resolved = VOCABULARY.resolve(token).ok_or_else(|| unknown_unit(token))?;
    if target_mode {
        raw.push(resolved.target_term().with_exp(exp));
    } else {
        let (term, f) = resolved.construct_term();
        raw.push(term.with_exp(exp));
        *factor *= f.powf(exp.as_f64());
    }
    Ok(())
}

fn parse_unit_text(text: &str, target_mode: bool) -> Result<(Unit, f64), EvalError> {
    let mut raw = Vec::new();
    let mut factor = 1.0;

    let text = text.trim();
    if text.is_empty() {
        return Ok((Unit::dimensionless(), 1.0));
    }

    for (i, group) in text.split('/').enumerate() {
        let sign = if i == 0 { 1 } else { -1 };
        let group = group.trim().trim_start_matches('(').trim_end_matches(')');
        for piece in group.split('*') {
            let piece = piece.trim();
            if piece.is_empty() {
                continue;
            }
            let (token, exp) = match piece.split_once('^') {
                Some((tok, e)) => {
                    let e = e.trim().trim_start_matches('(').trim_end_matches(')');
                    let exp = match e.split_once('/') {
                        Some((n, d)) => {
                            let n: i32 = n.trim().parse().map_err(|_| {
                                EvalError::invalid_parameter(format!("bad unit exponent `{}`", e))
                            })?;
                            let d: i32 = d.trim().parse().map_err(|_| {
                                EvalError::invalid_parameter(format!("bad unit exponent `{}`", e))
                            })?;
                            Ratio::new(n, d)
                        }
                        None => Ratio::from_int(e.trim().parse().map_err(|_| {
                            EvalError::invalid_parameter(format!("bad unit exponent `{}`", e))
                        })?),
                    };
                    (tok.trim(), exp)
                }
                None => (piece, Ratio::ONE),
            };
            apply_token(
                &mut raw,
                &mut factor,
                token,
                exp.mul(Ratio::from_int(sign)),
                target_mode,
            )?;
        }
    }

    let (unit, canon_factor) = Unit::canonicalize(raw);
    Ok((unit, factor * canon_factor))
}

/// Parse a unit string for literal construction ("kilometer" normalizes to
/// meter; the returned factor multiplies into the value).
pub fn parse_unit(text: &str) -> Result<(Unit, f64), EvalError> {
    parse_unit_text(text, false)
}

/// Parse a unit string as a conversion target (prefixes kept: "km" stays
/// km). The factor only reflects term cancellation.
pub fn parse_target_unit(text: &str) -> Result<Unit, EvalError> {
    let (unit, _) = parse_unit_text(text, true)?;
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_table_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for entry in VOCABULARY.entries() {
            for alias in entry.symbols.iter().chain(entry.names.iter()) {
                assert!(seen.insert(*alias), "duplicate alias `{}`", alias);
            }
        }
    }

    #[test]
    fn test_every_alias_resolves_to_its_entry() {
        for entry in VOCABULARY.entries() {
            for alias in entry.symbols.iter().chain(entry.names.iter()) {
                let resolved = VOCABULARY.resolve(alias).expect("alias must resolve");
                assert_eq!(resolved.entry_symbol, entry.symbol);
                assert_eq!(resolved.prefix_factor, 1.0);
            }
        }
    }

    #[test]
    fn test_prefix_resolution() {
        let km = VOCABULARY.resolve("km").expect("km");
        assert_eq!(km.display, "km");
        assert_eq!(km.entry_symbol, "m");
        assert!((km.prefix_factor - 1000.0).abs() < 1e-9);

        let kilometers = VOCABULARY.resolve("kilometers").expect("kilometers");
        assert_eq!(kilometers.display, "km");
        assert!((kilometers.prefix_factor - 1000.0).abs() < 1e-9);

        // Alias lookup wins over prefix splitting
        let min = VOCABULARY.resolve("min").expect("min");
        assert_eq!(min.entry_symbol, "min");
        assert_eq!(min.prefix_factor, 1.0);

        // Symbol prefixes do not combine with long names
        assert!(VOCABULARY.resolve("kmeters").is_none());
    }

    #[test]
    fn test_construct_normalizes_prefix_into_value() {
        let (unit, factor) = parse_unit("kilometer").expect("parses");
        assert_eq!(unit.to_string(), "m");
        assert!((factor - 1000.0).abs() < 1e-9);

        let (unit, factor) = parse_unit("percent").expect("parses");
        assert!(unit.is_dimensionless());
        assert!((factor - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_target_keeps_prefix() {
        let km = parse_target_unit("km").expect("parses");
        assert_eq!(km.to_string(), "km");
        assert!((km.scale_to_base() - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_compound_units() {
        let (unit, factor) = parse_unit("kg*m/s^2").expect("parses");
        assert_eq!(unit.to_string(), "g*m/s^2");
        assert!((factor - 1000.0).abs() < 1e-9);

        let (per_hour, _) = parse_unit("1/h").expect("parses");
        assert_eq!(per_hour.to_string(), "1/h");
    }

    #[test]
    fn test_unknown_unit_suggestions() {
        let err = unknown_unit("metrs");
        match err {
            EvalError::UnknownUnit { name, suggestion } => {
                assert_eq!(name, "metrs");
                let s = suggestion.expect("close to meters");
                assert!(s.contains("meters") || s.contains("metres"));
            }
            other => panic!("expected UnknownUnit, got {:?}", other),
        }
    }

    #[test]
    fn test_derived_units_have_composite_dimensions() {
        let hz = VOCABULARY.resolve("Hz").expect("Hz");
        assert_eq!(hz.dim.name(), Some("frequency"));

        let joule = VOCABULARY.resolve("joules").expect("joules");
        assert_eq!(joule.dim.name(), Some("energy"));
        assert!((joule.entry_scale - 1000.0).abs() < 1e-9);
    }
}
