//! Typed errors with rich diagnostics
//!
//! Two error families: [`ParseError`] for the front end (carries source
//! spans, the caller attaches source text at report time) and [`EvalError`]
//! for everything the engine can reject at evaluation time. Every variant
//! has a stable `fermi::` diagnostic code.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Evaluation-time failures.
///
/// Messages carry the offending operands or units; name-lookup variants
/// carry ranked "did you mean" suggestions as help text.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum EvalError {
    #[error("incompatible units in {op}: `{left}` vs `{right}`")]
    #[diagnostic(
        code(fermi::incompatible_units),
        help("both operands must reduce to the same base dimension")
    )]
    IncompatibleUnits {
        op: String,
        left: String,
        right: String,
    },

    #[error("unknown unit `{name}`")]
    #[diagnostic(code(fermi::unknown_unit))]
    UnknownUnit {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("undefined variable `{name}`")]
    #[diagnostic(code(fermi::undefined_variable))]
    UndefinedVariable {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("undefined function `{name}`")]
    #[diagnostic(code(fermi::undefined_function))]
    UndefinedFunction {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("invalid parameter: {message}")]
    #[diagnostic(code(fermi::invalid_parameter))]
    InvalidParameter { message: String },

    #[error("{what} {value} is out of range: expected {expected}")]
    #[diagnostic(code(fermi::out_of_range))]
    OutOfRange {
        what: String,
        value: f64,
        expected: String,
    },

    #[error("non-positive value in {context}")]
    #[diagnostic(
        code(fermi::non_positive),
        help("log and decibel scores require strictly positive particles")
    )]
    NonPositiveValue { context: String },

    #[error("ambiguous range: left bound has unit `{left_unit}` but right bound has none")]
    #[diagnostic(
        code(fermi::mixed_units),
        help("write the unit after the right bound, or give both bounds units")
    )]
    MixedUnits { left_unit: String },

    #[error("function `{name}` expects {expected} argument(s), got {got}")]
    #[diagnostic(code(fermi::arity_mismatch))]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl EvalError {
    pub fn incompatible_units(
        op: impl Into<String>,
        left: impl Into<String>,
        right: impl Into<String>,
    ) -> Self {
        EvalError::IncompatibleUnits {
            op: op.into(),
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        EvalError::InvalidParameter {
            message: message.into(),
        }
    }
}

/// Front-end failures, labeled with byte spans into the source line.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq)]
pub enum ParseError {
    #[error("unrecognized character")]
    #[diagnostic(code(fermi::parse::unknown_token))]
    UnknownToken {
        #[label("cannot tokenize this")]
        span: SourceSpan,
    },

    #[error("expected {expected}, found `{found}`")]
    #[diagnostic(code(fermi::parse::unexpected_token))]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("unexpected token here")]
        span: SourceSpan,
    },

    #[error("unexpected end of input")]
    #[diagnostic(code(fermi::parse::unexpected_eof))]
    UnexpectedEof {
        #[label("expected more input")]
        span: SourceSpan,
    },

    #[error("expected an expression")]
    #[diagnostic(code(fermi::parse::expected_expression))]
    ExpectedExpression {
        found: String,
        #[label("expected an expression here")]
        span: SourceSpan,
    },

    #[error("malformed number literal `{text}`")]
    #[diagnostic(code(fermi::parse::bad_number))]
    BadNumber {
        text: String,
        #[label("cannot parse this as a number")]
        span: SourceSpan,
    },

    #[error("invalid function parameter")]
    #[diagnostic(
        code(fermi::parse::bad_parameter),
        help("function parameters must be plain names, e.g. `f(x, y) = x * y`")
    )]
    BadParameter {
        #[label("expected a parameter name")]
        span: SourceSpan,
    },

    #[error("invalid unit definition")]
    #[diagnostic(
        code(fermi::parse::bad_unit_definition),
        help("unit definitions look like `1 'widget = 5 kg`")
    )]
    BadUnitDefinition {
        #[label("expected `1 'name = quantity`")]
        span: SourceSpan,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_operands() {
        let err = EvalError::incompatible_units("addition", "m", "s");
        assert_eq!(
            err.to_string(),
            "incompatible units in addition: `m` vs `s`"
        );

        let err = EvalError::ArityMismatch {
            name: "outof".into(),
            expected: 2,
            got: 3,
        };
        assert_eq!(
            err.to_string(),
            "function `outof` expects 2 argument(s), got 3"
        );
    }

    #[test]
    fn test_diagnostic_codes_are_stable() {
        let err = EvalError::UnknownUnit {
            name: "metrs".into(),
            suggestion: Some("did you mean `meters`?".into()),
        };
        let code = miette::Diagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("fermi::unknown_unit"));
    }
}
