//! Fermi estimation language
//!
//! A calculator for order-of-magnitude reasoning where:
//! - Every number can be a distribution (`300 to 500` samples a lognormal)
//! - Quantities carry units that reconcile themselves (`3 km + 500 meters`)
//! - Trailing zeros encode uncertainty (`~1200` is uniform over ±50)
//! - Models decompose into the inputs that drive their variance
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → AST → Evaluator → Quantity
//! ```
//!
//! # Example
//!
//! ```fermi
//! commuters = 700_000 to 1_300_000
//! trips_per_day = 1.5 to 2.5
//! km_per_trip = 3 to 15 km
//!
//! commuters * trips_per_day * km_per_trip in km
//! ```

pub mod ast;
pub mod common;
pub mod diagnostics;
pub mod dist;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod quantity;
pub mod repl;
pub mod score;
pub mod sensitivity;
pub mod suggest;
pub mod units;

// Re-export diagnostics for convenience
pub use diagnostics::{EvalError, ParseError};

// Re-exports for convenience
pub use dist::{Family, Rng};
pub use eval::{Evaluator, StmtValue};
pub use quantity::Quantity;
pub use units::{Dimension, Unit};

/// Interpreter version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse source code to a program
pub fn parse(source: &str) -> miette::Result<ast::Program> {
    let tokens = lexer::lex(source)?;
    Ok(parser::parse(&tokens)?)
}

/// Evaluate source code with default sampling settings, returning the
/// last value produced
pub fn evaluate(source: &str) -> miette::Result<Quantity> {
    evaluate_with(source, dist::DEFAULT_SAMPLES, eval::DEFAULT_SEED)
}

/// Evaluate source code with explicit sample count and seed
pub fn evaluate_with(source: &str, samples: usize, seed: u64) -> miette::Result<Quantity> {
    let program = parse(source)?;
    let mut evaluator = Evaluator::with_settings(samples, seed);
    let mut last = None;
    for result in evaluator.eval_program(&program) {
        let value = result?;
        if let Some(q) = value.quantity() {
            last = Some(q.clone());
        }
    }
    last.ok_or_else(|| miette::miette!("the source produced no value"))
}
