//! Tree-walking evaluator
//!
//! An [`Evaluator`] is a session: variable bindings, user-defined functions,
//! custom units, the sample count, and the RNG stream all persist across
//! statements. Distribution literals (ranges, sig-fig numbers, plus-minus)
//! sample at the session count; everything downstream is plain particle
//! arithmetic on [`Quantity`] values.
//!
//! Callers recover at statement boundaries: a failed statement reports its
//! error and leaves the environment untouched, because definitions commit
//! only after their right-hand side evaluates.

mod builtins;
mod env;

pub use builtins::{Builtin, BUILTINS};
pub use env::Environment;

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnitExpr};
use crate::diagnostics::EvalError;
use crate::dist::{Family, Rng, DEFAULT_SAMPLES};
use crate::quantity::Quantity;
use crate::suggest;
use crate::units::{unknown_unit, Dimension, Ratio, Unit, UnitTerm, VOCABULARY};
use std::collections::HashMap;
use tracing::debug;

/// Default RNG seed for sessions that don't pick one.
pub const DEFAULT_SEED: u64 = 42;

/// Probability mass a bare `lo to hi` range covers.
const RANGE_CONFIDENCE: f64 = 0.9;

/// A user-defined function.
#[derive(Debug, Clone)]
struct FunctionDef {
    params: Vec<String>,
    body: Expr,
}

/// What one statement produced.
#[derive(Debug, Clone)]
pub enum StmtValue {
    /// A bare expression's value.
    Value(Quantity),
    /// `name = …` committed a binding.
    Binding { name: String, value: Quantity },
    /// `f(…) = …` defined a function.
    Function { name: String },
    /// `1 'name = …` defined a custom unit; the value is the defining
    /// quantity of one unit.
    Unit { name: String, value: Quantity },
}

impl StmtValue {
    /// The quantity this statement produced, if any.
    pub fn quantity(&self) -> Option<&Quantity> {
        match self {
            StmtValue::Value(q) => Some(q),
            StmtValue::Binding { value, .. } => Some(value),
            StmtValue::Unit { value, .. } => Some(value),
            StmtValue::Function { .. } => None,
        }
    }
}

/// How a written unit is being used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitMode {
    /// Literal construction: prefixes fold into the value.
    Construct,
    /// Conversion target: prefixes kept, so `in km` displays `km`.
    Target,
}

/// An evaluation session.
pub struct Evaluator {
    env: Environment,
    functions: HashMap<String, FunctionDef>,
    custom_units: HashMap<String, Quantity>,
    rng: Rng,
    samples: usize,
}

impl Evaluator {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_SAMPLES, DEFAULT_SEED)
    }

    pub fn with_settings(samples: usize, seed: u64) -> Self {
        Evaluator {
            env: Environment::new(),
            functions: HashMap::new(),
            custom_units: HashMap::new(),
            rng: Rng::new(seed),
            samples: samples.max(1),
        }
    }

    /// Particles drawn per distribution literal.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Visible variable bindings, sorted by name.
    pub fn variables(&self) -> Vec<(String, Quantity)> {
        let mut vars: Vec<_> = self.env.flatten().into_iter().collect();
        vars.sort_by(|a, b| a.0.cmp(&b.0));
        vars
    }

    /// User-defined functions as (name, params), sorted by name.
    pub fn user_functions(&self) -> Vec<(String, Vec<String>)> {
        let mut fns: Vec<_> = self
            .functions
            .iter()
            .map(|(n, d)| (n.clone(), d.params.clone()))
            .collect();
        fns.sort();
        fns
    }

    /// Evaluate a whole program, recovering at statement boundaries.
    pub fn eval_program(&mut self, program: &Program) -> Vec<Result<StmtValue, EvalError>> {
        program
            .statements
            .iter()
            .map(|stmt| self.eval_stmt(stmt))
            .collect()
    }

    /// Evaluate one statement. Definitions commit only on success.
    pub fn eval_stmt(&mut self, stmt: &Stmt) -> Result<StmtValue, EvalError> {
        match stmt {
            Stmt::Expr { expr, .. } => Ok(StmtValue::Value(self.eval_expr(expr)?)),
            Stmt::Assign { name, expr, .. } => {
                let value = self.eval_expr(expr)?;
                debug!(name = %name, "bound variable");
                self.env.define(name.clone(), value.clone());
                Ok(StmtValue::Binding {
                    name: name.clone(),
                    value,
                })
            }
            Stmt::FunctionDef {
                name, params, body, ..
            } => {
                self.functions.insert(
                    name.clone(),
                    FunctionDef {
                        params: params.clone(),
                        body: body.clone(),
                    },
                );
                Ok(StmtValue::Function { name: name.clone() })
            }
            Stmt::UnitDef { name, expr, .. } => {
                let value = self.eval_expr(expr)?;
                if !value.is_scalar() {
                    return Err(EvalError::invalid_parameter(format!(
                        "unit `'{name}` must be defined by a single value"
                    )));
                }
                self.custom_units.insert(name.clone(), value.clone());
                Ok(StmtValue::Unit {
                    name: name.clone(),
                    value,
                })
            }
        }
    }

    pub fn eval_expr(&mut self, expr: &Expr) -> Result<Quantity, EvalError> {
        match expr {
            Expr::Number {
                value,
                raw,
                sig_fig,
                unit,
                ..
            } => self.eval_number(*value, raw, *sig_fig, unit.as_ref()),
            Expr::Ident { name, .. } => self.lookup(name),
            Expr::Neg { expr, .. } => Ok(self.eval_expr(expr)?.neg()),
            Expr::Binary {
                op, left, right, ..
            } => self.eval_binary(*op, left, right),
            Expr::Range { lo, hi, unit, .. } => self.eval_range(lo, hi, unit.as_ref()),
            Expr::Array { elements, .. } => self.eval_array(elements),
            Expr::Convert { expr, unit, .. } => {
                let value = self.eval_expr(expr)?;
                let (target, _) = self.resolve_unit(unit, UnitMode::Target)?;
                value.convert(&target)
            }
            Expr::Call { name, args, .. } => self.eval_call(name, args),
            Expr::Let {
                name, value, body, ..
            } => {
                let value = self.eval_expr(value)?;
                self.env.push_scope();
                self.env.define(name.clone(), value);
                let result = self.eval_expr(body);
                self.env.pop_scope();
                result
            }
            Expr::If {
                cond,
                then,
                otherwise,
                ..
            } => {
                let cond = self.eval_expr(cond)?;
                if cond.mean() != 0.0 {
                    self.eval_expr(then)
                } else {
                    self.eval_expr(otherwise)
                }
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Quantity, EvalError> {
        self.env.get(name).ok_or_else(|| {
            let names = self.env.names();
            EvalError::UndefinedVariable {
                name: name.to_string(),
                suggestion: suggest::did_you_mean(name, names.iter().map(String::as_str)),
            }
        })
    }

    fn eval_number(
        &mut self,
        value: f64,
        raw: &str,
        sig_fig: bool,
        unit: Option<&UnitExpr>,
    ) -> Result<Quantity, EvalError> {
        let (unit, factor) = match unit {
            Some(u) => self.resolve_unit(u, UnitMode::Construct)?,
            None => (Unit::dimensionless(), 1.0),
        };
        if !sig_fig {
            return Ok(Quantity::scalar(value * factor, unit));
        }
        // `~1200` is uniform over ±half the last significant place
        let place = sig_fig_place(raw);
        let lo = (value - place / 2.0) * factor;
        let hi = (value + place / 2.0) * factor;
        let family = Family::uniform(lo, hi)?;
        Ok(family.sample(self.samples, unit, &mut self.rng))
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Quantity, EvalError> {
        let l = self.eval_expr(left)?;
        let r = self.eval_expr(right)?;
        match op {
            BinaryOp::Add => l.add(&r),
            BinaryOp::Sub => l.sub(&r),
            BinaryOp::Mul => Ok(l.mul(&r)),
            BinaryOp::Div => Ok(l.div(&r)),
            BinaryOp::Pow => l.pow(&r),
            BinaryOp::PlusMinus => self.eval_plus_minus(&l, &r),
            BinaryOp::Eq => l.compare(&r, |a, b| a == b, "comparison"),
            BinaryOp::Ne => l.compare(&r, |a, b| a != b, "comparison"),
            BinaryOp::Lt => l.compare(&r, |a, b| a < b, "comparison"),
            BinaryOp::Le => l.compare(&r, |a, b| a <= b, "comparison"),
            BinaryOp::Gt => l.compare(&r, |a, b| a > b, "comparison"),
            BinaryOp::Ge => l.compare(&r, |a, b| a >= b, "comparison"),
        }
    }

    /// `a +- b`: a normal with mean a and standard deviation b. A united b
    /// converts into a's unit; a bare b is taken in a's unit directly.
    fn eval_plus_minus(&mut self, l: &Quantity, r: &Quantity) -> Result<Quantity, EvalError> {
        let sd = if r.unit().terms().is_empty() {
            r.reduce()
        } else {
            let factor = r.unit().factor_to(l.unit()).ok_or_else(|| {
                EvalError::incompatible_units("plus-minus", l.unit_label(), r.unit_label())
            })?;
            r.reduce() * factor
        };
        let family = Family::normal(l.reduce(), sd)?;
        Ok(family.sample(self.samples, l.unit().clone(), &mut self.rng))
    }

    /// Range unit resolution:
    /// 1. trailing unit, bare bounds: the unit applies to both
    /// 2. trailing unit, united bounds: bounds convert into it
    /// 3. both bounds united: the left converts into the right's unit
    /// 4. left united, right bare: ambiguous, `MixedUnits`
    /// 5. only the right united: an implicit trailing unit
    /// 6. nothing united: dimensionless
    ///
    /// The family is lognormal when both resolved bounds are positive,
    /// normal otherwise, covering 90% mass between the bounds.
    fn eval_range(
        &mut self,
        lo: &Expr,
        hi: &Expr,
        unit: Option<&UnitExpr>,
    ) -> Result<Quantity, EvalError> {
        let lo_q = self.eval_expr(lo)?;
        let hi_q = self.eval_expr(hi)?;
        let trailing = unit
            .map(|u| self.resolve_unit(u, UnitMode::Construct))
            .transpose()?;

        let lo_united = !lo_q.unit().terms().is_empty();
        let hi_united = !hi_q.unit().terms().is_empty();

        let (lo, hi, unit) = match (trailing, lo_united, hi_united) {
            (Some((unit, factor)), _, _) => {
                let lo = range_bound(&lo_q, &unit, factor)?;
                let hi = range_bound(&hi_q, &unit, factor)?;
                (lo, hi, unit)
            }
            (None, true, true) => {
                let factor = lo_q.unit().factor_to(hi_q.unit()).ok_or_else(|| {
                    EvalError::incompatible_units("range", lo_q.unit_label(), hi_q.unit_label())
                })?;
                (lo_q.reduce() * factor, hi_q.reduce(), hi_q.unit().clone())
            }
            (None, true, false) => {
                return Err(EvalError::MixedUnits {
                    left_unit: lo_q.unit_label(),
                })
            }
            (None, false, true) => (lo_q.reduce(), hi_q.reduce(), hi_q.unit().clone()),
            (None, false, false) => (lo_q.reduce(), hi_q.reduce(), Unit::dimensionless()),
        };

        let family = if lo > 0.0 && hi > 0.0 {
            Family::lognormal_interval(lo, hi, RANGE_CONFIDENCE)?
        } else {
            Family::normal_interval(lo, hi, RANGE_CONFIDENCE)?
        };
        debug!(lo, hi, samples = self.samples, "sampling range");
        Ok(family.sample(self.samples, unit, &mut self.rng))
    }

    /// Array literals are explicit particle sets: each element reduces to a
    /// value-or-mean, united elements converting into the first united
    /// element's unit.
    fn eval_array(&mut self, elements: &[Expr]) -> Result<Quantity, EvalError> {
        if elements.is_empty() {
            return Err(EvalError::invalid_parameter(
                "array literal must not be empty",
            ));
        }
        let mut quantities = Vec::with_capacity(elements.len());
        for element in elements {
            quantities.push(self.eval_expr(element)?);
        }
        let target = quantities
            .iter()
            .find(|q| !q.unit().terms().is_empty())
            .map(|q| q.unit().clone())
            .unwrap_or_else(Unit::dimensionless);
        let mut values = Vec::with_capacity(quantities.len());
        for q in &quantities {
            if q.unit().terms().is_empty() {
                values.push(q.reduce());
            } else {
                let factor = q.unit().factor_to(&target).ok_or_else(|| {
                    EvalError::incompatible_units("array", target.to_string(), q.unit_label())
                })?;
                values.push(q.reduce() * factor);
            }
        }
        Ok(Quantity::from_particles(values, target))
    }

    fn eval_call(&mut self, name: &str, args: &[Expr]) -> Result<Quantity, EvalError> {
        // User functions shadow builtins.
        if let Some(def) = self.functions.get(name).cloned() {
            if args.len() != def.params.len() {
                return Err(EvalError::ArityMismatch {
                    name: name.to_string(),
                    expected: def.params.len(),
                    got: args.len(),
                });
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg)?);
            }
            debug!(name = %name, "calling user function");
            self.env.push_scope();
            for (param, value) in def.params.iter().zip(values) {
                self.env.define(param.clone(), value);
            }
            let result = self.eval_expr(&def.body);
            self.env.pop_scope();
            return result;
        }

        if let Some(builtin) = Builtin::lookup(name) {
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(self.eval_expr(arg)?);
            }
            return builtin.call(&values, self.samples, &mut self.rng);
        }

        let mut candidates: Vec<&str> = Builtin::all_names().collect();
        candidates.extend(self.functions.keys().map(String::as_str));
        Err(EvalError::UndefinedFunction {
            name: name.to_string(),
            suggestion: suggest::did_you_mean(name, candidates),
        })
    }

    /// Resolve a written unit expression against the vocabulary and the
    /// session's custom units.
    fn resolve_unit(&self, unit: &UnitExpr, mode: UnitMode) -> Result<(Unit, f64), EvalError> {
        let mut raw = Vec::new();
        let mut factor = 1.0;
        for f in &unit.factors {
            let exp = Ratio::from_int(f.exp);
            if let Some(label) = f.name.strip_prefix('\'') {
                self.apply_custom(&mut raw, &mut factor, label, exp, mode);
            } else {
                let resolved = VOCABULARY
                    .resolve(&f.name)
                    .ok_or_else(|| unknown_unit(&f.name))?;
                match mode {
                    UnitMode::Target => raw.push(resolved.target_term().with_exp(exp)),
                    UnitMode::Construct => {
                        let (term, prefix) = resolved.construct_term();
                        raw.push(term.with_exp(exp));
                        factor *= prefix.powf(exp.as_f64());
                    }
                }
            }
        }
        let (unit, canon) = Unit::canonicalize(raw);
        Ok((unit, factor * canon))
    }

    /// Custom tick units. Defined names multiply through their defining
    /// quantity when constructing and keep their label as a conversion
    /// target; undefined names are opaque labels with their own dimension.
    fn apply_custom(
        &self,
        raw: &mut Vec<UnitTerm>,
        factor: &mut f64,
        label: &str,
        exp: Ratio,
        mode: UnitMode,
    ) {
        match self.custom_units.get(label) {
            Some(def) => match mode {
                UnitMode::Construct => {
                    *factor *= def.reduce().powf(exp.as_f64());
                    let powered = def.unit().pow(exp);
                    raw.extend(powered.terms().iter().cloned());
                }
                UnitMode::Target => {
                    let scale = def.reduce() * def.unit().scale_to_base();
                    raw.push(
                        UnitTerm::new(format!("'{label}"), def.unit().dimension(), scale)
                            .with_exp(exp),
                    );
                }
            },
            None => {
                raw.push(
                    UnitTerm::new(format!("'{label}"), Dimension::custom(label), 1.0)
                        .with_exp(exp),
                );
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// One range bound against the trailing unit: united bounds convert,
/// bare bounds take the unit as written.
fn range_bound(q: &Quantity, unit: &Unit, factor: f64) -> Result<f64, EvalError> {
    if q.unit().terms().is_empty() {
        Ok(q.reduce() * factor)
    } else {
        let f = q
            .unit()
            .factor_to(unit)
            .ok_or_else(|| EvalError::incompatible_units("range", q.unit_label(), unit.to_string()))?;
        Ok(q.reduce() * f)
    }
}

/// Magnitude of the place of the last significant digit:
/// `1200` → 100, `1.30` → 0.01, `1.2e3` → 100.
fn sig_fig_place(raw: &str) -> f64 {
    let cleaned = raw.replace('_', "");
    let (mantissa, exp10) = match cleaned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (cleaned.as_str(), 0),
    };
    let place = match mantissa.split_once('.') {
        Some((_, frac)) => -(frac.len() as i32),
        None => {
            let stripped = mantissa.trim_end_matches('0');
            if stripped.is_empty() {
                0
            } else {
                (mantissa.len() - stripped.len()) as i32
            }
        }
    };
    10f64.powi(place + exp10)
}
