//! Interactive estimation sessions
//!
//! One [`Evaluator`] lives for the whole session, so bindings, functions,
//! and custom units accumulate across lines and the RNG stream stays
//! reproducible under a fixed seed.
//!
//! # Commands
//!
//! - `:help` - show help
//! - `:env` - show variable bindings
//! - `:funcs` - show builtin and user functions
//! - `:units [filter]` - list known units
//! - `:clear` - reset the session
//! - `:quit` - exit

use crate::diagnostics::ParseError;
use crate::eval::{Builtin, Evaluator, StmtValue, BUILTINS};
use crate::lexer;
use crate::parser;
use crate::units::VOCABULARY;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Config, Context, Editor, Helper, Result as RlResult};
use std::borrow::Cow;

mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";

    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BRIGHT_BLUE: &str = "\x1b[94m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
}

/// Commands available in the REPL
const COMMANDS: &[&str] = &[
    ":help", ":quit", ":q", ":exit", ":clear", ":env", ":funcs", ":units",
];

const KEYWORDS: &[&str] = &["let", "if", "then", "else", "to", "in"];

const HISTORY_FILE: &str = ".fermi_history";

/// REPL helper for autocompletion and argument hints
struct ReplHelper {
    bindings: Vec<String>,
    functions: Vec<String>,
}

impl ReplHelper {
    fn new() -> Self {
        Self {
            bindings: Vec::new(),
            functions: Builtin::all_names().map(str::to_string).collect(),
        }
    }

    fn update(&mut self, evaluator: &Evaluator) {
        self.bindings = evaluator
            .variables()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        self.functions = Builtin::all_names().map(str::to_string).collect();
        self.functions
            .extend(evaluator.user_functions().into_iter().map(|(name, _)| name));
    }
}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        // Command completion
        if line.starts_with(':') {
            let prefix = &line[..pos];
            let completions: Vec<Pair> = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(prefix))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return Ok((0, completions));
        }

        let word_start = line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        let prefix = &line[word_start..pos];

        if prefix.is_empty() {
            return Ok((pos, Vec::new()));
        }

        let mut completions: Vec<Pair> = Vec::new();

        for kw in KEYWORDS {
            if kw.starts_with(prefix) {
                completions.push(Pair {
                    display: kw.to_string(),
                    replacement: kw.to_string(),
                });
            }
        }

        for binding in &self.bindings {
            if binding.starts_with(prefix) {
                completions.push(Pair {
                    display: binding.clone(),
                    replacement: binding.clone(),
                });
            }
        }

        for func in &self.functions {
            if func.starts_with(prefix) {
                completions.push(Pair {
                    display: format!("{}()", func),
                    replacement: format!("{}(", func),
                });
            }
        }

        Ok((word_start, completions))
    }
}

impl Hinter for ReplHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        if line.starts_with(':') {
            for cmd in COMMANDS {
                if cmd.starts_with(line) && cmd.len() > line.len() {
                    return Some(cmd[line.len()..].to_string());
                }
            }
            return None;
        }
        // Argument hint right after `name(`
        let open = line.strip_suffix('(')?;
        let start = open
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        let builtin = Builtin::lookup(&open[start..])?;
        builtin
            .signature()
            .split_once('(')
            .map(|(_, args)| args.to_string())
    }
}

impl Highlighter for ReplHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(format!(
            "{}{}{}",
            colors::BRIGHT_CYAN,
            prompt,
            colors::RESET
        ))
    }
}

impl Validator for ReplHelper {}

impl Helper for ReplHelper {}

/// The REPL state
pub struct Repl {
    evaluator: Evaluator,
    samples: usize,
    seed: u64,
    line_count: usize,
}

impl Repl {
    pub fn new(samples: usize, seed: u64) -> Self {
        Self {
            evaluator: Evaluator::with_settings(samples, seed),
            samples,
            seed,
            line_count: 0,
        }
    }

    /// Run the read-eval-print loop until `:quit` or EOF.
    pub fn run(&mut self) -> RlResult<()> {
        let config = Config::builder()
            .history_ignore_space(true)
            .completion_type(rustyline::CompletionType::List)
            .build();

        let mut rl: Editor<ReplHelper, DefaultHistory> = Editor::with_config(config)?;
        rl.set_helper(Some(ReplHelper::new()));
        let _ = rl.load_history(HISTORY_FILE);

        self.print_banner();

        loop {
            if let Some(helper) = rl.helper_mut() {
                helper.update(&self.evaluator);
            }

            let prompt = format!("fermi[{}]> ", self.line_count);

            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();

                    if line.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(line);

                    if line.starts_with(':') {
                        if self.handle_command(line) {
                            break;
                        }
                        continue;
                    }

                    self.eval_line(line);
                    self.line_count += 1;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    self.print_goodbye();
                    break;
                }
                Err(err) => {
                    eprintln!("{}error:{} {:?}", colors::RED, colors::RESET, err);
                    break;
                }
            }
        }

        let _ = rl.save_history(HISTORY_FILE);
        Ok(())
    }

    fn eval_line(&mut self, line: &str) {
        let tokens = match lexer::lex(line) {
            Ok(tokens) => tokens,
            Err(e) => return report_parse(line, e),
        };
        let program = match parser::parse(&tokens) {
            Ok(program) => program,
            Err(e) => return report_parse(line, e),
        };

        for result in self.evaluator.eval_program(&program) {
            match result {
                Ok(StmtValue::Value(q)) => {
                    println!("{}=>{} {}", colors::BRIGHT_GREEN, colors::RESET, q);
                }
                Ok(StmtValue::Binding { name, value }) => {
                    println!(
                        "{}{}{} = {}",
                        colors::BRIGHT_CYAN,
                        name,
                        colors::RESET,
                        value
                    );
                }
                Ok(StmtValue::Function { name }) => {
                    println!(
                        "defined function {}{}{}",
                        colors::BRIGHT_BLUE,
                        name,
                        colors::RESET
                    );
                }
                Ok(StmtValue::Unit { name, value }) => {
                    println!(
                        "defined unit {}'{}{} = {}",
                        colors::BRIGHT_CYAN,
                        name,
                        colors::RESET,
                        value
                    );
                }
                Err(e) => {
                    eprintln!("{:?}", miette::Report::new(e));
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: &str) -> bool {
        let parts: Vec<&str> = cmd.split_whitespace().collect();

        match parts.first().copied() {
            Some(":quit") | Some(":q") | Some(":exit") => {
                self.print_goodbye();
                return true;
            }
            Some(":help") | Some(":h") | Some(":?") => {
                self.print_help();
            }
            Some(":clear") => {
                self.evaluator = Evaluator::with_settings(self.samples, self.seed);
                println!(
                    "{}cleared{} all bindings and definitions",
                    colors::GREEN,
                    colors::RESET
                );
            }
            Some(":env") => {
                self.print_environment();
            }
            Some(":funcs") => {
                self.print_functions();
            }
            Some(":units") => {
                print_units(parts.get(1).copied());
            }
            Some(other) => {
                println!("{}unknown command:{} {}", colors::RED, colors::RESET, other);
                println!(
                    "type {}:help{} for available commands",
                    colors::BRIGHT_GREEN,
                    colors::RESET
                );
            }
            None => {}
        }

        false
    }

    fn print_banner(&self) {
        println!(
            "{}{}fermi{} v{}",
            colors::BOLD,
            colors::BRIGHT_CYAN,
            colors::RESET,
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "{}order-of-magnitude estimation with uncertainty{}",
            colors::DIM,
            colors::RESET
        );
        println!();
        println!(
            "type {}:help{} for help, {}:quit{} to exit",
            colors::BRIGHT_GREEN,
            colors::RESET,
            colors::BRIGHT_GREEN,
            colors::RESET
        );
        println!();
    }

    fn print_goodbye(&self) {
        println!(
            "\n{}goodbye!{} {} evaluations this session.",
            colors::BRIGHT_CYAN,
            colors::RESET,
            self.line_count
        );
    }

    fn print_help(&self) {
        println!(
            "{}{}fermi REPL commands{}",
            colors::BOLD,
            colors::BRIGHT_CYAN,
            colors::RESET
        );
        println!();
        println!("  {}:help{}, :h, :?      show this help", colors::GREEN, colors::RESET);
        println!("  {}:quit{}, :q, :exit  exit the REPL", colors::GREEN, colors::RESET);
        println!("  {}:clear{}            reset the session", colors::GREEN, colors::RESET);
        println!("  {}:env{}              show variable bindings", colors::GREEN, colors::RESET);
        println!("  {}:funcs{}            show builtin and user functions", colors::GREEN, colors::RESET);
        println!("  {}:units{} [filter]   list known units", colors::GREEN, colors::RESET);
        println!();
        println!("{}examples:{}", colors::BOLD, colors::RESET);
        println!("  {}300 to 500 km{}            90% interval, lognormal", colors::DIM, colors::RESET);
        println!("  {}~1200 * 3{}                sig-fig uncertainty", colors::DIM, colors::RESET);
        println!("  {}100 +- 10{}                normal, mean 100, sd 10", colors::DIM, colors::RESET);
        println!("  {}1000 meters in km{}        unit conversion", colors::DIM, colors::RESET);
        println!("  {}x = lognormal(1, 10){}     bind a sampler's draws", colors::DIM, colors::RESET);
        println!("  {}area(r) = r^2 * 3.14159{}  define a function", colors::DIM, colors::RESET);
    }

    fn print_environment(&self) {
        let vars = self.evaluator.variables();
        if vars.is_empty() {
            println!("{}no bindings{}", colors::DIM, colors::RESET);
            return;
        }
        println!(
            "{}bindings:{} ({} total)",
            colors::BOLD,
            colors::RESET,
            vars.len()
        );
        for (name, value) in &vars {
            println!("  {}{}{} = {}", colors::BRIGHT_CYAN, name, colors::RESET, value);
        }
    }

    fn print_functions(&self) {
        let user = self.evaluator.user_functions();
        if !user.is_empty() {
            println!("{}user functions:{}", colors::BOLD, colors::RESET);
            for (name, params) in &user {
                println!(
                    "  {}{}{}({})",
                    colors::BRIGHT_BLUE,
                    name,
                    colors::RESET,
                    params.join(", ")
                );
            }
            println!();
        }
        println!("{}builtins:{}", colors::BOLD, colors::RESET);
        for (_, builtin) in BUILTINS {
            println!("  {}", builtin.signature());
        }
    }
}

/// Shared by `:units` and the `units` subcommand.
pub fn print_units(filter: Option<&str>) {
    let rows: Vec<_> = VOCABULARY
        .catalog()
        .into_iter()
        .filter(|(symbol, dimension, aliases)| match filter {
            Some(f) => {
                symbol.contains(f) || dimension.contains(f) || aliases.contains(f)
            }
            None => true,
        })
        .collect();

    if rows.is_empty() {
        println!("no units match");
        return;
    }

    let symbol_width = rows.iter().map(|(s, _, _)| s.len()).max().unwrap_or(0);
    let dim_width = rows.iter().map(|(_, d, _)| d.len()).max().unwrap_or(0);
    for (symbol, dimension, aliases) in &rows {
        println!("  {symbol:<symbol_width$}  {dimension:<dim_width$}  {aliases}");
    }
}

fn report_parse(source: &str, error: ParseError) {
    let report = miette::Report::new(error).with_source_code(source.to_string());
    eprintln!("{:?}", report);
}
