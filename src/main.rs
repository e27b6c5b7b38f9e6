//! Fermi estimation CLI
//!
//! Main entry point for the `fermi` command.

use clap::{Parser, Subcommand, ValueEnum};
use fermi::diagnostics::{EvalError, ParseError};
use fermi::dist::DEFAULT_SAMPLES;
use fermi::eval::{Evaluator, StmtValue, DEFAULT_SEED};
use fermi::quantity::Quantity;
use fermi::repl::{print_units, Repl};
use fermi::sensitivity::variance_decomposition;
use fermi::suggest;
use fermi::units::VOCABULARY;
use fermi::{lexer, parser};
use miette::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "fermi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Order-of-magnitude estimation with uncertainty",
    long_about = "fermi — an estimation calculator where every number can be a distribution.\n\nRanges sample lognormals, units reconcile themselves, and answers carry their uncertainty."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Particles drawn per distribution
    #[arg(long, global = true, default_value_t = DEFAULT_SAMPLES)]
    samples: usize,

    /// RNG seed, for reproducible runs
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    seed: u64,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one expression or statement list
    Eval {
        /// Source text
        #[arg(value_name = "EXPR")]
        expr: String,
    },

    /// Run a model file
    Run {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Start the interactive REPL
    Repl,

    /// Rank a model's inputs by their influence on a target
    Sensitivity {
        /// Input file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Target binding (defaults to the last statement's value)
        #[arg(long, value_name = "NAME")]
        target: Option<String>,
    },

    /// List known units
    Units {
        /// Substring filter on symbol, dimension, or alias
        #[arg(value_name = "FILTER")]
        filter: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Human,
    Json,
}

/// One statement's result, for `--format json`.
#[derive(Serialize)]
struct Summary {
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    median: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    std: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    p95: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Summary {
    fn empty(kind: &'static str, name: Option<String>) -> Summary {
        Summary {
            kind,
            name,
            value: None,
            mean: None,
            median: None,
            std: None,
            p5: None,
            p95: None,
            unit: None,
            dimension: None,
            samples: None,
            error: None,
        }
    }

    fn from_value(value: &StmtValue) -> Summary {
        let (kind, name, quantity) = match value {
            StmtValue::Value(q) => ("value", None, Some(q)),
            StmtValue::Binding { name, value } => ("binding", Some(name.clone()), Some(value)),
            StmtValue::Function { name } => ("function", Some(name.clone()), None),
            StmtValue::Unit { name, value } => ("unit", Some(name.clone()), Some(value)),
        };
        let mut summary = Summary::empty(kind, name);
        if let Some(q) = quantity {
            summary.fill(q);
        }
        summary
    }

    fn from_error(error: &EvalError) -> Summary {
        let mut summary = Summary::empty("error", None);
        summary.error = Some(error.to_string());
        summary
    }

    fn fill(&mut self, q: &Quantity) {
        let unit = q.unit().to_string();
        self.unit = (!unit.is_empty()).then_some(unit);
        self.dimension = Some(q.dimension_name());
        if let Some(v) = q.scalar_value() {
            self.value = Some(v);
        } else {
            self.mean = Some(q.mean());
            self.median = Some(q.median());
            self.std = Some(q.std());
            self.p5 = q.percentile(0.05).ok();
            self.p95 = q.percentile(0.95).ok();
            self.samples = Some(q.sample_count());
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Eval { expr } => {
            eval_source(&expr, "<expr>", cli.samples, cli.seed, cli.format)
        }
        Commands::Run { input } => {
            let source = read_file(&input)?;
            let origin = input.display().to_string();
            eval_source(&source, &origin, cli.samples, cli.seed, cli.format)
        }
        Commands::Repl => {
            let mut repl = Repl::new(cli.samples, cli.seed);
            repl.run().map_err(|e| miette::miette!("readline: {e}"))
        }
        Commands::Sensitivity { input, target } => {
            let source = read_file(&input)?;
            let origin = input.display().to_string();
            sensitivity(
                &source,
                &origin,
                target.as_deref(),
                cli.samples,
                cli.seed,
                cli.format,
            )
        }
        Commands::Units { filter } => units(filter.as_deref(), cli.format),
    }
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| miette::miette!("cannot read {}: {}", path.display(), e))
}

fn parse_source(source: &str, origin: &str) -> Result<fermi::ast::Program> {
    let tokens = lexer::lex(source).map_err(|e| parse_report(e, source, origin))?;
    parser::parse(&tokens).map_err(|e| parse_report(e, source, origin))
}

fn parse_report(error: ParseError, source: &str, origin: &str) -> miette::Report {
    miette::Report::new(error)
        .with_source_code(miette::NamedSource::new(origin, source.to_string()))
}

/// Evaluate a whole source, recovering at statement boundaries. Exits
/// non-zero when any statement failed.
fn eval_source(
    source: &str,
    origin: &str,
    samples: usize,
    seed: u64,
    format: Format,
) -> Result<()> {
    let program = parse_source(source, origin)?;
    let mut evaluator = Evaluator::with_settings(samples, seed);
    let results = evaluator.eval_program(&program);

    let mut failures = 0;
    match format {
        Format::Human => {
            for result in &results {
                match result {
                    Ok(StmtValue::Value(q)) => println!("{q}"),
                    Ok(StmtValue::Binding { name, value }) => println!("{name} = {value}"),
                    Ok(StmtValue::Function { name }) => println!("defined function {name}"),
                    Ok(StmtValue::Unit { name, value }) => {
                        println!("defined unit '{name} = {value}")
                    }
                    Err(e) => {
                        failures += 1;
                        eprintln!("{:?}", miette::Report::new(e.clone()));
                    }
                }
            }
        }
        Format::Json => {
            let mut summaries = Vec::with_capacity(results.len());
            for result in &results {
                match result {
                    Ok(value) => summaries.push(Summary::from_value(value)),
                    Err(e) => {
                        failures += 1;
                        summaries.push(Summary::from_error(e));
                    }
                }
            }
            println!("{}", to_json(&summaries)?);
        }
    }

    if failures > 0 {
        Err(miette::miette!("{failures} statement(s) failed"))
    } else {
        Ok(())
    }
}

fn sensitivity(
    source: &str,
    origin: &str,
    target: Option<&str>,
    samples: usize,
    seed: u64,
    format: Format,
) -> Result<()> {
    let program = parse_source(source, origin)?;
    let mut evaluator = Evaluator::with_settings(samples, seed);

    // Bindings in first-definition order; rebinding keeps the new value.
    let mut bindings: Vec<(String, Quantity)> = Vec::new();
    let mut last: Option<Quantity> = None;
    for result in evaluator.eval_program(&program) {
        match result {
            Ok(StmtValue::Binding { name, value }) => {
                match bindings.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = value.clone(),
                    None => bindings.push((name, value.clone())),
                }
                last = Some(value);
            }
            Ok(StmtValue::Value(q)) => last = Some(q),
            Ok(_) => {}
            Err(e) => return Err(miette::Report::new(e)),
        }
    }

    let output = match target {
        Some(name) => bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, q)| q.clone())
            .ok_or_else(|| {
                let candidates: Vec<&str> = bindings.iter().map(|(n, _)| n.as_str()).collect();
                miette::Report::new(EvalError::UndefinedVariable {
                    name: name.to_string(),
                    suggestion: suggest::did_you_mean(name, candidates),
                })
            })?,
        None => last.ok_or_else(|| miette::miette!("the model produced no value to analyze"))?,
    };

    let inputs: Vec<(String, Quantity)> = bindings
        .into_iter()
        .filter(|(name, _)| Some(name.as_str()) != target)
        .collect();
    let contributions = variance_decomposition(&output, &inputs);

    match format {
        Format::Json => println!("{}", to_json(&contributions)?),
        Format::Human => {
            if contributions.is_empty() {
                println!("no inputs to rank");
                return Ok(());
            }
            let width = contributions
                .iter()
                .map(|c| c.name.len())
                .max()
                .unwrap_or(0);
            for c in &contributions {
                println!(
                    "  {:<width$}  {:>5.1}%  (r = {:+.3})",
                    c.name,
                    c.share * 100.0,
                    c.correlation
                );
            }
        }
    }
    Ok(())
}

fn units(filter: Option<&str>, format: Format) -> Result<()> {
    match format {
        Format::Human => print_units(filter),
        Format::Json => {
            let rows: Vec<serde_json::Value> = VOCABULARY
                .catalog()
                .into_iter()
                .filter(|(s, d, a)| {
                    filter.map_or(true, |f| s.contains(f) || d.contains(f) || a.contains(f))
                })
                .map(|(symbol, dimension, aliases)| {
                    serde_json::json!({
                        "symbol": symbol,
                        "dimension": dimension,
                        "aliases": aliases,
                    })
                })
                .collect();
            println!("{}", to_json(&rows)?);
        }
    }
    Ok(())
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| miette::miette!("serialize: {e}"))
}
