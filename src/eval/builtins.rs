//! Builtin functions
//!
//! A fixed dispatch table in two halves. Distribution constructors reduce
//! their arguments to raw numbers (value-or-mean) over a shared unit before
//! sampling; quantity-aware math functions receive full Quantities and
//! preserve units and particles.

use crate::diagnostics::EvalError;
use crate::dist::{Family, Rng};
use crate::quantity::Quantity;
use crate::score;
use crate::units::Unit;

/// A builtin function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    // Distribution constructors
    Lognormal,
    Normal,
    Uniform,
    Beta,
    OutOf,
    Gamma,
    Poisson,
    Exponential,
    ExponentialMean,
    Binomial,
    Weighted,
    // Quantity-aware math
    Sqrt,
    Abs,
    Floor,
    Ceil,
    Round,
    Ln,
    Log10,
    Exp,
    Min,
    Max,
    Mean,
    Median,
    Std,
    Percentile,
    P5,
    P10,
    P25,
    P50,
    P75,
    P90,
    P95,
    P99,
    Crps,
    LogCrps,
    DbCrps,
}

/// Name table, in help display order.
pub const BUILTINS: &[(&str, Builtin)] = &[
    ("lognormal", Builtin::Lognormal),
    ("normal", Builtin::Normal),
    ("uniform", Builtin::Uniform),
    ("beta", Builtin::Beta),
    ("outof", Builtin::OutOf),
    ("gamma", Builtin::Gamma),
    ("poisson", Builtin::Poisson),
    ("exponential", Builtin::Exponential),
    ("exponential_mean", Builtin::ExponentialMean),
    ("binomial", Builtin::Binomial),
    ("weighted", Builtin::Weighted),
    ("sqrt", Builtin::Sqrt),
    ("abs", Builtin::Abs),
    ("floor", Builtin::Floor),
    ("ceil", Builtin::Ceil),
    ("round", Builtin::Round),
    ("ln", Builtin::Ln),
    ("log10", Builtin::Log10),
    ("exp", Builtin::Exp),
    ("min", Builtin::Min),
    ("max", Builtin::Max),
    ("mean", Builtin::Mean),
    ("median", Builtin::Median),
    ("std", Builtin::Std),
    ("percentile", Builtin::Percentile),
    ("p5", Builtin::P5),
    ("p10", Builtin::P10),
    ("p25", Builtin::P25),
    ("p50", Builtin::P50),
    ("p75", Builtin::P75),
    ("p90", Builtin::P90),
    ("p95", Builtin::P95),
    ("p99", Builtin::P99),
    ("crps", Builtin::Crps),
    ("logcrps", Builtin::LogCrps),
    ("dbcrps", Builtin::DbCrps),
];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        BUILTINS.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
    }

    /// All builtin names, for suggestions and completion.
    pub fn all_names() -> impl Iterator<Item = &'static str> {
        BUILTINS.iter().map(|(n, _)| *n)
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Lognormal => "lognormal",
            Builtin::Normal => "normal",
            Builtin::Uniform => "uniform",
            Builtin::Beta => "beta",
            Builtin::OutOf => "outof",
            Builtin::Gamma => "gamma",
            Builtin::Poisson => "poisson",
            Builtin::Exponential => "exponential",
            Builtin::ExponentialMean => "exponential_mean",
            Builtin::Binomial => "binomial",
            Builtin::Weighted => "weighted",
            Builtin::Sqrt => "sqrt",
            Builtin::Abs => "abs",
            Builtin::Floor => "floor",
            Builtin::Ceil => "ceil",
            Builtin::Round => "round",
            Builtin::Ln => "ln",
            Builtin::Log10 => "log10",
            Builtin::Exp => "exp",
            Builtin::Min => "min",
            Builtin::Max => "max",
            Builtin::Mean => "mean",
            Builtin::Median => "median",
            Builtin::Std => "std",
            Builtin::Percentile => "percentile",
            Builtin::P5 => "p5",
            Builtin::P10 => "p10",
            Builtin::P25 => "p25",
            Builtin::P50 => "p50",
            Builtin::P75 => "p75",
            Builtin::P90 => "p90",
            Builtin::P95 => "p95",
            Builtin::P99 => "p99",
            Builtin::Crps => "crps",
            Builtin::LogCrps => "logcrps",
            Builtin::DbCrps => "dbcrps",
        }
    }

    /// Argument hint shown by the REPL.
    pub fn signature(self) -> &'static str {
        match self {
            Builtin::Lognormal => "lognormal(lo, hi[, confidence])",
            Builtin::Normal => "normal(lo, hi[, confidence])",
            Builtin::Uniform => "uniform(lo, hi)",
            Builtin::Beta => "beta(alpha, beta)",
            Builtin::OutOf => "outof(successes, total)",
            Builtin::Gamma => "gamma(shape, scale)",
            Builtin::Poisson => "poisson(lambda)",
            Builtin::Exponential => "exponential(rate)",
            Builtin::ExponentialMean => "exponential_mean(mean)",
            Builtin::Binomial => "binomial(trials, p)",
            Builtin::Weighted => "weighted(values, weights)",
            Builtin::Sqrt => "sqrt(x)",
            Builtin::Abs => "abs(x)",
            Builtin::Floor => "floor(x)",
            Builtin::Ceil => "ceil(x)",
            Builtin::Round => "round(x)",
            Builtin::Ln => "ln(x)",
            Builtin::Log10 => "log10(x)",
            Builtin::Exp => "exp(x)",
            Builtin::Min => "min(a, b)",
            Builtin::Max => "max(a, b)",
            Builtin::Mean => "mean(x)",
            Builtin::Median => "median(x)",
            Builtin::Std => "std(x)",
            Builtin::Percentile => "percentile(x, p)",
            Builtin::P5 => "p5(x)",
            Builtin::P10 => "p10(x)",
            Builtin::P25 => "p25(x)",
            Builtin::P50 => "p50(x)",
            Builtin::P75 => "p75(x)",
            Builtin::P90 => "p90(x)",
            Builtin::P95 => "p95(x)",
            Builtin::P99 => "p99(x)",
            Builtin::Crps => "crps(forecast, observation)",
            Builtin::LogCrps => "logcrps(forecast, observation)",
            Builtin::DbCrps => "dbcrps(forecast, observation)",
        }
    }

    /// Allowed argument count, inclusive.
    fn arity(self) -> (usize, usize) {
        match self {
            Builtin::Lognormal | Builtin::Normal => (2, 3),
            Builtin::Uniform
            | Builtin::Beta
            | Builtin::OutOf
            | Builtin::Gamma
            | Builtin::Binomial
            | Builtin::Weighted
            | Builtin::Min
            | Builtin::Max
            | Builtin::Percentile
            | Builtin::Crps
            | Builtin::LogCrps
            | Builtin::DbCrps => (2, 2),
            _ => (1, 1),
        }
    }

    /// Call with evaluated arguments.
    pub fn call(
        self,
        args: &[Quantity],
        samples: usize,
        rng: &mut Rng,
    ) -> Result<Quantity, EvalError> {
        let (min, max) = self.arity();
        if args.len() < min || args.len() > max {
            return Err(EvalError::ArityMismatch {
                name: self.name().to_string(),
                expected: if args.len() < min { min } else { max },
                got: args.len(),
            });
        }

        match self {
            Builtin::Lognormal => {
                let (v, unit) = raw_args(self.name(), args)?;
                let confidence = v.get(2).copied().unwrap_or(0.9);
                Ok(Family::lognormal_interval(v[0], v[1], confidence)?.sample(samples, unit, rng))
            }
            Builtin::Normal => {
                let (v, unit) = raw_args(self.name(), args)?;
                let confidence = v.get(2).copied().unwrap_or(0.9);
                Ok(Family::normal_interval(v[0], v[1], confidence)?.sample(samples, unit, rng))
            }
            Builtin::Uniform => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::uniform(v[0], v[1])?.sample(samples, unit, rng))
            }
            Builtin::Beta => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::beta(v[0], v[1])?.sample(samples, unit, rng))
            }
            Builtin::OutOf => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::out_of(v[0], v[1])?.sample(samples, unit, rng))
            }
            Builtin::Gamma => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::gamma(v[0], v[1])?.sample(samples, unit, rng))
            }
            Builtin::Poisson => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::poisson(v[0])?.sample(samples, unit, rng))
            }
            Builtin::Exponential => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::exponential(v[0])?.sample(samples, unit, rng))
            }
            Builtin::ExponentialMean => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::exponential_mean(v[0])?.sample(samples, unit, rng))
            }
            Builtin::Binomial => {
                let (v, unit) = raw_args(self.name(), args)?;
                Ok(Family::binomial(v[0], v[1])?.sample(samples, unit, rng))
            }
            Builtin::Weighted => {
                let family = Family::weighted(args[0].to_particles(), args[1].values())?;
                Ok(family.sample(samples, args[0].unit().clone(), rng))
            }
            Builtin::Sqrt => args[0].pow(&Quantity::dimensionless(0.5)),
            Builtin::Abs => Ok(args[0].map(f64::abs)),
            Builtin::Floor => Ok(args[0].map(f64::floor)),
            Builtin::Ceil => Ok(args[0].map(f64::ceil)),
            Builtin::Round => Ok(args[0].map(f64::round)),
            Builtin::Ln => Ok(dimensionless_arg("ln", &args[0])?.map(f64::ln)),
            Builtin::Log10 => Ok(dimensionless_arg("log10", &args[0])?.map(f64::log10)),
            Builtin::Exp => Ok(dimensionless_arg("exp", &args[0])?.map(f64::exp)),
            Builtin::Min => args[0].min_with(&args[1]),
            Builtin::Max => args[0].max_with(&args[1]),
            Builtin::Mean => Ok(Quantity::scalar(args[0].mean(), args[0].unit().clone())),
            Builtin::Median => Ok(Quantity::scalar(args[0].median(), args[0].unit().clone())),
            Builtin::Std => Ok(Quantity::scalar(args[0].std(), args[0].unit().clone())),
            Builtin::Percentile => {
                let p = args[1].to_si().reduce();
                percentile_of(&args[0], p)
            }
            Builtin::P5 => percentile_of(&args[0], 0.05),
            Builtin::P10 => percentile_of(&args[0], 0.10),
            Builtin::P25 => percentile_of(&args[0], 0.25),
            Builtin::P50 => percentile_of(&args[0], 0.50),
            Builtin::P75 => percentile_of(&args[0], 0.75),
            Builtin::P90 => percentile_of(&args[0], 0.90),
            Builtin::P95 => percentile_of(&args[0], 0.95),
            Builtin::P99 => percentile_of(&args[0], 0.99),
            Builtin::Crps => score::crps(&args[0], &args[1]),
            Builtin::LogCrps => score::logcrps(&args[0], &args[1]),
            Builtin::DbCrps => score::dbcrps(&args[0], &args[1]),
        }
    }
}

/// Reduce constructor arguments to raw numbers over a shared unit: the
/// first dimensioned argument's unit wins and later dimensioned arguments
/// convert into it. Dimensionless arguments reduce to base scale, so `90%`
/// arrives as 0.9.
fn raw_args(op: &str, args: &[Quantity]) -> Result<(Vec<f64>, Unit), EvalError> {
    let target = args
        .iter()
        .find(|q| !q.unit().is_dimensionless())
        .map(|q| q.unit().clone())
        .unwrap_or_else(Unit::dimensionless);
    let mut values = Vec::with_capacity(args.len());
    for q in args {
        if q.unit().is_dimensionless() {
            values.push(q.reduce() * q.unit().scale_to_base());
        } else {
            let factor = q.unit().factor_to(&target).ok_or_else(|| {
                EvalError::incompatible_units(op, target.to_string(), q.unit_label())
            })?;
            values.push(q.reduce() * factor);
        }
    }
    Ok((values, target))
}

/// ln/log10/exp want plain numbers; display-scaled dimensionless units
/// like `%` reduce to base scale first.
fn dimensionless_arg(name: &str, q: &Quantity) -> Result<Quantity, EvalError> {
    if !q.unit().is_dimensionless() {
        return Err(EvalError::invalid_parameter(format!(
            "{name} requires a dimensionless argument, got `{}`",
            q.unit_label()
        )));
    }
    Ok(q.to_si())
}

fn percentile_of(q: &Quantity, p: f64) -> Result<Quantity, EvalError> {
    Ok(Quantity::scalar(q.percentile(p)?, q.unit().clone()))
}
