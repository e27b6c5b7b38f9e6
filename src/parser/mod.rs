//! Recursive descent parser for the estimation language
//!
//! Expressions use precedence climbing. Binding, loosest first:
//!
//! ```text
//! in            unit conversion
//! == != < <= > >=
//! to            range literals
//! + - +-
//! * /
//! ^             right associative
//! unary -
//! ```
//!
//! Units juxtapose onto number literals: `3 km` is one literal. A unit
//! suffix continues across `*`, `/`, and `^`, but only while the next name
//! is in the unit vocabulary or tick-prefixed, so `3 meters / x` divides by
//! the variable `x` while `3 m / s` is a speed. A unit written after the
//! right bound of a range is hoisted into the range's trailing-unit slot.

use crate::ast::{BinaryOp, Expr, Program, Stmt, UnitExpr, UnitFactor};
use crate::common::Span;
use crate::diagnostics::ParseError;
use crate::lexer::{Token, TokenKind};
use crate::units::VOCABULARY;

/// Operator associativity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

// Precedence levels, loosest first.
const PREC_CONVERT: u8 = 1;
const PREC_COMPARE: u8 = 2;
const PREC_RANGE: u8 = 3;
const PREC_ADD: u8 = 4;
const PREC_MUL: u8 = 5;
const PREC_POW: u8 = 6;

/// Parse a token stream into a program.
pub fn parse(tokens: &[Token]) -> Result<Program, ParseError> {
    if tokens.is_empty() {
        return Ok(Program {
            statements: Vec::new(),
        });
    }
    Parser::new(tokens).parse_program()
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ==================== token helpers ====================

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind_at(&self, i: usize) -> TokenKind {
        self.tokens
            .get(i)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&expected_name(kind)))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let tok = self.current();
        if tok.kind == TokenKind::Eof {
            ParseError::UnexpectedEof {
                span: tok.span.into(),
            }
        } else {
            ParseError::UnexpectedToken {
                expected: expected.to_string(),
                found: describe(tok),
                span: tok.span.into(),
            }
        }
    }

    fn skip_separators(&mut self) {
        while self.current().kind.is_separator() {
            self.advance();
        }
    }

    /// True when the token at `i` can start a unit: a vocabulary name, a
    /// tick-prefixed custom name, or `%`.
    fn unit_follows(&self, i: usize) -> bool {
        match self.kind_at(i) {
            TokenKind::TickName | TokenKind::Percent => true,
            TokenKind::Ident => VOCABULARY.is_known(&self.tokens[i].text),
            _ => false,
        }
    }

    // ==================== statements ====================

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut statements = Vec::new();
        self.skip_separators();
        while !self.at(TokenKind::Eof) {
            statements.push(self.parse_stmt()?);
            if !self.at(TokenKind::Eof) {
                if !self.current().kind.is_separator() {
                    return Err(self.unexpected("end of statement"));
                }
                self.skip_separators();
            }
        }
        Ok(Program { statements })
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.at(TokenKind::Ident) && self.kind_at(self.pos + 1) == TokenKind::Eq {
            return self.parse_assignment();
        }
        if self.at(TokenKind::Ident)
            && self.kind_at(self.pos + 1) == TokenKind::LParen
            && self.looks_like_function_def()
        {
            return self.parse_function_def();
        }
        if self.at(TokenKind::Number)
            && self.kind_at(self.pos + 1) == TokenKind::TickName
            && self.kind_at(self.pos + 2) == TokenKind::Eq
        {
            return self.parse_unit_def();
        }
        let expr = self.parse_expr()?;
        let span = expr.span();
        Ok(Stmt::Expr { expr, span })
    }

    /// Distinguishes `f(x, y) = body` from the call `f(x, y)`: scan to the
    /// closing paren and check for `=` after it.
    fn looks_like_function_def(&self) -> bool {
        let mut i = self.pos + 2;
        loop {
            match self.kind_at(i) {
                TokenKind::RParen => return self.kind_at(i + 1) == TokenKind::Eq,
                TokenKind::LParen
                | TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eof => return false,
                _ => i += 1,
            }
        }
    }

    fn parse_assignment(&mut self) -> Result<Stmt, ParseError> {
        let name_tok = self.advance();
        let name = name_tok.text.clone();
        let start = name_tok.span;
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        let span = start.merge(expr.span());
        Ok(Stmt::Assign { name, expr, span })
    }

    fn parse_function_def(&mut self) -> Result<Stmt, ParseError> {
        let name_tok = self.advance();
        let name = name_tok.text.clone();
        let start = name_tok.span;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            if !self.at(TokenKind::Ident) {
                return Err(ParseError::BadParameter {
                    span: self.span().into(),
                });
            }
            params.push(self.advance().text.clone());
            if !self.at(TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Eq)?;
        let body = self.parse_expr()?;
        let span = start.merge(body.span());
        Ok(Stmt::FunctionDef {
            name,
            params,
            body,
            span,
        })
    }

    /// `1 'name = quantity`. The count must be exactly 1.
    fn parse_unit_def(&mut self) -> Result<Stmt, ParseError> {
        let count = self.advance().clone();
        let value: f64 = count.text.replace('_', "").parse().map_err(|_| {
            ParseError::BadNumber {
                text: count.text.clone(),
                span: count.span.into(),
            }
        })?;
        if value != 1.0 {
            return Err(ParseError::BadUnitDefinition {
                span: count.span.into(),
            });
        }
        let tick = self.advance();
        let name = tick.text.trim_start_matches('\'').to_string();
        self.expect(TokenKind::Eq)?;
        let expr = self.parse_expr()?;
        let span = count.span.merge(expr.span());
        Ok(Stmt::UnitDef { name, expr, span })
    }

    // ==================== expressions ====================

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expr_with_precedence(0)
    }

    fn parse_expr_with_precedence(&mut self, min_prec: u8) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            // `in` starts a conversion only when a unit name follows;
            // otherwise it is left for an enclosing `let`.
            if min_prec <= PREC_CONVERT && self.at(TokenKind::In) && self.unit_follows(self.pos + 1)
            {
                self.advance();
                let unit = self.parse_unit_expr()?;
                let span = left.span().merge(unit.span);
                left = Expr::Convert {
                    expr: Box::new(left),
                    unit,
                    span,
                };
                continue;
            }

            if min_prec <= PREC_RANGE && self.at(TokenKind::To) {
                self.advance();
                let mut hi = self.parse_expr_with_precedence(PREC_RANGE + 1)?;
                // `1 to 10 meters`: a unit on a bare right-bound literal
                // belongs to the range, not the literal.
                let mut unit = None;
                if let Expr::Number { unit: u, .. } = &mut hi {
                    unit = u.take();
                }
                let span = left.span().merge(hi.span());
                left = Expr::Range {
                    lo: Box::new(left),
                    hi: Box::new(hi),
                    unit,
                    span,
                };
                continue;
            }

            match self.binary_op_info() {
                Some((op, prec, assoc)) if prec >= min_prec => {
                    self.advance();
                    let next_min = if assoc == Assoc::Left { prec + 1 } else { prec };
                    let right = self.parse_expr_with_precedence(next_min)?;
                    let span = left.span().merge(right.span());
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                        span,
                    };
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn binary_op_info(&self) -> Option<(BinaryOp, u8, Assoc)> {
        let info = match self.current().kind {
            TokenKind::EqEq => (BinaryOp::Eq, PREC_COMPARE, Assoc::Left),
            TokenKind::Ne => (BinaryOp::Ne, PREC_COMPARE, Assoc::Left),
            TokenKind::Lt => (BinaryOp::Lt, PREC_COMPARE, Assoc::Left),
            TokenKind::Le => (BinaryOp::Le, PREC_COMPARE, Assoc::Left),
            TokenKind::Gt => (BinaryOp::Gt, PREC_COMPARE, Assoc::Left),
            TokenKind::Ge => (BinaryOp::Ge, PREC_COMPARE, Assoc::Left),
            TokenKind::Plus => (BinaryOp::Add, PREC_ADD, Assoc::Left),
            TokenKind::Minus => (BinaryOp::Sub, PREC_ADD, Assoc::Left),
            TokenKind::PlusMinus => (BinaryOp::PlusMinus, PREC_ADD, Assoc::Left),
            TokenKind::Star => (BinaryOp::Mul, PREC_MUL, Assoc::Left),
            TokenKind::Slash => (BinaryOp::Div, PREC_MUL, Assoc::Left),
            TokenKind::Caret => (BinaryOp::Pow, PREC_POW, Assoc::Right),
            _ => return None,
        };
        Some(info)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.at(TokenKind::Minus) {
            let start = self.span();
            self.advance();
            let expr = self.parse_unary()?;
            let span = start.merge(expr.span());
            return Ok(Expr::Neg {
                expr: Box::new(expr),
                span,
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.current().kind {
            TokenKind::Number => self.parse_number(false, None),
            TokenKind::Tilde => {
                let start = self.span();
                self.advance();
                if !self.at(TokenKind::Number) {
                    return Err(self.unexpected("a number literal"));
                }
                self.parse_number(true, Some(start))
            }
            TokenKind::Ident => {
                if self.kind_at(self.pos + 1) == TokenKind::LParen {
                    self.parse_call()
                } else {
                    let tok = self.advance();
                    Ok(Expr::Ident {
                        name: tok.text.clone(),
                        span: tok.span,
                    })
                }
            }
            TokenKind::Let => self.parse_let(),
            TokenKind::If => self.parse_if(),
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::Eof => Err(self.unexpected("an expression")),
            _ => {
                let tok = self.current();
                Err(ParseError::ExpectedExpression {
                    found: describe(tok),
                    span: tok.span.into(),
                })
            }
        }
    }

    fn parse_number(&mut self, sig_fig: bool, lead: Option<Span>) -> Result<Expr, ParseError> {
        let tok = self.advance().clone();
        let value: f64 = tok.text.replace('_', "").parse().map_err(|_| {
            ParseError::BadNumber {
                text: tok.text.clone(),
                span: tok.span.into(),
            }
        })?;
        let mut span = lead.map_or(tok.span, |l| l.merge(tok.span));
        let unit = if self.unit_follows(self.pos) {
            let u = self.parse_unit_expr()?;
            span = span.merge(u.span);
            Some(u)
        } else {
            None
        };
        Ok(Expr::Number {
            value,
            raw: tok.text,
            sig_fig,
            unit,
            span,
        })
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let name_tok = self.advance().clone();
        self.advance(); // (
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            args.push(self.parse_expr()?);
            if !self.at(TokenKind::RParen) {
                self.expect(TokenKind::Comma)?;
            }
        }
        let close = self.expect(TokenKind::RParen)?.span;
        Ok(Expr::Call {
            name: name_tok.text,
            args,
            span: name_tok.span.merge(close),
        })
    }

    fn parse_let(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        self.advance();
        if !self.at(TokenKind::Ident) {
            return Err(self.unexpected("a variable name"));
        }
        let name = self.advance().text.clone();
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        self.expect(TokenKind::In)?;
        let body = self.parse_expr()?;
        let span = start.merge(body.span());
        Ok(Expr::Let {
            name,
            value: Box::new(value),
            body: Box::new(body),
            span,
        })
    }

    fn parse_if(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        self.advance();
        let cond = self.parse_expr()?;
        self.expect(TokenKind::Then)?;
        let then = self.parse_expr()?;
        self.expect(TokenKind::Else)?;
        let otherwise = self.parse_expr()?;
        let span = start.merge(otherwise.span());
        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            span,
        })
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        let start = self.span();
        self.advance();
        let mut elements = Vec::new();
        while !self.at(TokenKind::RBracket) {
            elements.push(self.parse_expr()?);
            if !self.at(TokenKind::RBracket) {
                self.expect(TokenKind::Comma)?;
            }
        }
        let close = self.expect(TokenKind::RBracket)?.span;
        Ok(Expr::Array {
            elements,
            span: start.merge(close),
        })
    }

    // ==================== units ====================

    /// Parses `name (('*' | '/') name | '^' [-]int)*`, continuing only
    /// while the name after `*` or `/` is itself a unit token.
    fn parse_unit_expr(&mut self) -> Result<UnitExpr, ParseError> {
        let start = self.span();
        let mut factors = vec![self.parse_unit_factor(1)?];
        loop {
            if self.at(TokenKind::Star) && self.unit_follows(self.pos + 1) {
                self.advance();
                factors.push(self.parse_unit_factor(1)?);
            } else if self.at(TokenKind::Slash) && self.unit_follows(self.pos + 1) {
                self.advance();
                factors.push(self.parse_unit_factor(-1)?);
            } else {
                break;
            }
        }
        let end = factors.last().map(|f| f.span).unwrap_or(start);
        Ok(UnitExpr {
            factors,
            span: start.merge(end),
        })
    }

    fn parse_unit_factor(&mut self, sign: i32) -> Result<UnitFactor, ParseError> {
        let tok = self.advance().clone();
        let name = if tok.kind == TokenKind::Percent {
            "%".to_string()
        } else {
            tok.text.clone()
        };
        let mut exp = 1i32;
        let mut span = tok.span;
        if self.at(TokenKind::Caret) && self.exponent_follows() {
            self.advance();
            let negative = if self.at(TokenKind::Minus) {
                self.advance();
                true
            } else {
                false
            };
            let num = self.advance().clone();
            let value: f64 = num.text.replace('_', "").parse().map_err(|_| {
                ParseError::BadNumber {
                    text: num.text.clone(),
                    span: num.span.into(),
                }
            })?;
            if value.fract() != 0.0 || value > i32::MAX as f64 {
                return Err(ParseError::UnexpectedToken {
                    expected: "an integer unit exponent".to_string(),
                    found: num.text,
                    span: num.span.into(),
                });
            }
            exp = value as i32;
            if negative {
                exp = -exp;
            }
            span = span.merge(num.span);
        }
        Ok(UnitFactor {
            name,
            exp: exp * sign,
            span,
        })
    }

    fn exponent_follows(&self) -> bool {
        self.kind_at(self.pos + 1) == TokenKind::Number
            || (self.kind_at(self.pos + 1) == TokenKind::Minus
                && self.kind_at(self.pos + 2) == TokenKind::Number)
    }
}

fn expected_name(kind: TokenKind) -> String {
    let s = kind.as_str();
    if s.starts_with('<') || s == "newline" {
        s.to_string()
    } else {
        format!("`{s}`")
    }
}

/// How a token reads in an error message.
fn describe(tok: &Token) -> String {
    match tok.kind {
        TokenKind::Newline | TokenKind::Eof => tok.kind.as_str().to_string(),
        _ if tok.text.is_empty() => tok.kind.as_str().to_string(),
        _ => tok.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> Program {
        parse(&lex(source).unwrap()).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        parse(&lex(source).unwrap()).unwrap_err()
    }

    fn single_expr(source: &str) -> Expr {
        let program = parse_source(source);
        assert_eq!(program.statements.len(), 1, "want one statement");
        match program.statements.into_iter().next().unwrap() {
            Stmt::Expr { expr, .. } => expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let expr = single_expr("1 + 2 * 3");
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Mul,
                    ..
                }
            )),
            other => panic!("expected addition at the root, got {other:?}"),
        }
    }

    #[test]
    fn test_pow_is_right_associative() {
        let expr = single_expr("2 ^ 3 ^ 2");
        match expr {
            Expr::Binary {
                op: BinaryOp::Pow,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Number { value, .. } if value == 2.0));
                assert!(matches!(
                    *right,
                    Expr::Binary {
                        op: BinaryOp::Pow,
                        ..
                    }
                ));
            }
            other => panic!("expected pow at the root, got {other:?}"),
        }
    }

    #[test]
    fn test_range_hoists_trailing_unit() {
        let expr = single_expr("1 to 10 meters");
        match expr {
            Expr::Range { hi, unit, .. } => {
                let unit = unit.expect("trailing unit");
                assert_eq!(unit.factors[0].name, "meters");
                assert!(matches!(*hi, Expr::Number { unit: None, .. }));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_range_left_unit_stays_on_literal() {
        let expr = single_expr("1 meters to 10");
        match expr {
            Expr::Range { lo, unit, .. } => {
                assert!(unit.is_none());
                assert!(matches!(*lo, Expr::Number { unit: Some(_), .. }));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_range_binds_looser_than_arithmetic() {
        // (2 + 3) to (9 + 1)
        let expr = single_expr("2 + 3 to 9 + 1");
        match expr {
            Expr::Range { lo, hi, .. } => {
                assert!(matches!(
                    *lo,
                    Expr::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
                assert!(matches!(
                    *hi,
                    Expr::Binary {
                        op: BinaryOp::Add,
                        ..
                    }
                ));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_compound_unit_suffix() {
        let expr = single_expr("3 kg*m/s^2");
        match expr {
            Expr::Number { unit: Some(u), .. } => {
                let parts: Vec<(&str, i32)> = u
                    .factors
                    .iter()
                    .map(|f| (f.name.as_str(), f.exp))
                    .collect();
                assert_eq!(parts, vec![("kg", 1), ("m", 1), ("s", -2)]);
            }
            other => panic!("expected united literal, got {other:?}"),
        }
    }

    #[test]
    fn test_unit_suffix_stops_at_variables() {
        let expr = single_expr("3 meters / x");
        match expr {
            Expr::Binary {
                op: BinaryOp::Div,
                left,
                right,
                ..
            } => {
                assert!(matches!(*left, Expr::Number { unit: Some(_), .. }));
                assert!(matches!(*right, Expr::Ident { .. }));
            }
            other => panic!("expected division, got {other:?}"),
        }
    }

    #[test]
    fn test_percent_suffix() {
        let expr = single_expr("50%");
        match expr {
            Expr::Number { unit: Some(u), .. } => assert_eq!(u.factors[0].name, "%"),
            other => panic!("expected united literal, got {other:?}"),
        }
    }

    #[test]
    fn test_conversion_and_let_share_in() {
        assert!(matches!(single_expr("x in km"), Expr::Convert { .. }));
        // `in` before a non-unit name belongs to the let
        let expr = single_expr("let y = 5 in y + 1");
        assert!(matches!(expr, Expr::Let { .. }));
    }

    #[test]
    fn test_sig_fig_marker() {
        let expr = single_expr("~1200");
        match expr {
            Expr::Number { sig_fig, raw, .. } => {
                assert!(sig_fig);
                assert_eq!(raw, "1200");
            }
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn test_plus_minus_operator() {
        let expr = single_expr("100 +- 10");
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::PlusMinus,
                ..
            }
        ));
    }

    #[test]
    fn test_if_then_else() {
        let expr = single_expr("if 3 > 2 then 1 else 2");
        match expr {
            Expr::If { cond, .. } => assert!(matches!(
                *cond,
                Expr::Binary {
                    op: BinaryOp::Gt,
                    ..
                }
            )),
            other => panic!("expected if, got {other:?}"),
        }
    }

    #[test]
    fn test_array_literal() {
        let expr = single_expr("[1, 2.5, 10]");
        match expr {
            Expr::Array { elements, .. } => assert_eq!(elements.len(), 3),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn test_statement_forms() {
        let program = parse_source("x = 5\narea(w, h) = w * h\n1 'widget = 5 kg\nx + 1");
        assert_eq!(program.statements.len(), 4);
        assert!(matches!(&program.statements[0], Stmt::Assign { name, .. } if name == "x"));
        assert!(matches!(
            &program.statements[1],
            Stmt::FunctionDef { params, .. } if params == &["w".to_string(), "h".to_string()]
        ));
        assert!(matches!(&program.statements[2], Stmt::UnitDef { name, .. } if name == "widget"));
        assert!(matches!(&program.statements[3], Stmt::Expr { .. }));
    }

    #[test]
    fn test_call_is_not_a_definition() {
        let program = parse_source("f(2) + 1");
        assert!(matches!(&program.statements[0], Stmt::Expr { .. }));
        // and a comparison after the parens stays an expression
        let program = parse_source("f(x) == 3");
        assert!(matches!(&program.statements[0], Stmt::Expr { .. }));
    }

    #[test]
    fn test_semicolons_separate_statements() {
        let program = parse_source("x = 1; y = 2; x + y");
        assert_eq!(program.statements.len(), 3);
    }

    #[test]
    fn test_unit_definition_requires_count_one() {
        assert!(matches!(
            parse_err("2 'widget = 4 kg"),
            ParseError::BadUnitDefinition { .. }
        ));
    }

    #[test]
    fn test_bad_parameter() {
        assert!(matches!(
            parse_err("f(x, 2) = x"),
            ParseError::BadParameter { .. }
        ));
    }

    #[test]
    fn test_unexpected_eof() {
        assert!(matches!(parse_err("1 +"), ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn test_expected_expression() {
        assert!(matches!(
            parse_err("* 2"),
            ParseError::ExpectedExpression { .. }
        ));
    }

    #[test]
    fn test_two_expressions_need_separator() {
        let err = parse_err("1 2");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
        assert!(err.to_string().contains("end of statement"));
    }

    #[test]
    fn test_unit_exponent_must_be_integer() {
        let err = parse_err("3 m^2.5");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn test_conversion_after_arithmetic() {
        // (x + 500) in km
        let expr = single_expr("x + 500 in km");
        assert!(matches!(expr, Expr::Convert { .. }));
    }
}
