//! Abstract syntax tree for estimation programs
//!
//! The parser produces a [`Program`], a flat list of statements. Expressions
//! keep the raw spelling of number literals so the evaluator can derive
//! significant-figure uncertainty from how a number was written.

use crate::common::Span;
use serde::{Deserialize, Serialize};

/// A parsed program: statements in source order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

/// A top-level statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Stmt {
    /// A bare expression: `2 to 4 hours * crew`
    Expr { expr: Expr, span: Span },
    /// A variable binding: `trips = 100 to 400`
    Assign { name: String, expr: Expr, span: Span },
    /// A function definition: `area(w, h) = w * h`
    FunctionDef {
        name: String,
        params: Vec<String>,
        body: Expr,
        span: Span,
    },
    /// A custom unit definition: `1 'widget = 5 kg`.
    /// `name` is stored without the leading tick.
    UnitDef { name: String, expr: Expr, span: Span },
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr { span, .. }
            | Stmt::Assign { span, .. }
            | Stmt::FunctionDef { span, .. }
            | Stmt::UnitDef { span, .. } => *span,
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    /// Uncertain value: `100 +- 10` is a normal with mean 100, sd 10
    PlusMinus,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    /// Source spelling, used in diagnostics.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::PlusMinus => "+-",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Le
                | BinaryOp::Gt
                | BinaryOp::Ge
        )
    }
}

/// One multiplicative factor of a written unit, e.g. the `s^-2` in `kg*m*s^-2`.
/// Tick-prefixed custom names keep their tick: `'widget`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitFactor {
    pub name: String,
    pub exp: i32,
    pub span: Span,
}

/// A unit expression as written: ordered factors with signed exponents.
/// `kg*m/s^2` becomes `[kg^1, m^1, s^-2]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitExpr {
    pub factors: Vec<UnitFactor>,
    pub span: Span,
}

/// An expression node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// A number literal, optionally sig-fig marked (`~1200`) and optionally
    /// carrying a juxtaposed unit (`3.5 km`). `raw` is the literal exactly as
    /// written, before underscore stripping.
    Number {
        value: f64,
        raw: String,
        sig_fig: bool,
        unit: Option<UnitExpr>,
        span: Span,
    },
    /// A variable reference.
    Ident { name: String, span: Span },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    /// Arithmetic negation: `-x`
    Neg { expr: Box<Expr>, span: Span },
    /// A range literal: `1 to 10`, optionally with a trailing unit that the
    /// parser hoists off a bare right-bound literal (`1 to 10 meters`).
    Range {
        lo: Box<Expr>,
        hi: Box<Expr>,
        unit: Option<UnitExpr>,
        span: Span,
    },
    /// An array literal: `[1, 2.5, 10]`
    Array { elements: Vec<Expr>, span: Span },
    /// A unit conversion: `distance in km`
    Convert {
        expr: Box<Expr>,
        unit: UnitExpr,
        span: Span,
    },
    /// A function call: `lognormal(1, 10)`
    Call {
        name: String,
        args: Vec<Expr>,
        span: Span,
    },
    /// A scoped binding: `let x = 5 in x * x`
    Let {
        name: String,
        value: Box<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    /// A conditional: `if c then a else b`
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Number { span, .. }
            | Expr::Ident { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Neg { span, .. }
            | Expr::Range { span, .. }
            | Expr::Array { span, .. }
            | Expr::Convert { span, .. }
            | Expr::Call { span, .. }
            | Expr::Let { span, .. }
            | Expr::If { span, .. } => *span,
        }
    }
}
