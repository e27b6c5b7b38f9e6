//! Token definitions for the estimation language

use crate::common::Span;
use logos::Logos;
use serde::{Deserialize, Serialize};

/// A token with its kind, source span, and original text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

/// Token kinds.
///
/// Whitespace and comments (`#` and `//` to end of line) are skipped, but
/// newlines are kept: they separate statements, as do semicolons.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    // Keywords
    #[token("let")]
    Let,
    #[token("if")]
    If,
    #[token("then")]
    Then,
    #[token("else")]
    Else,
    #[token("to")]
    To,
    #[token("in")]
    In,

    // Literals. Underscores group digits: `1_200_000`.
    #[regex(r"[0-9][0-9_]*(\.[0-9][0-9_]*)?([eE][+-]?[0-9]+)?")]
    Number,
    #[regex(r"[a-zA-Z_µ][a-zA-Z0-9_µ]*")]
    Ident,
    /// A tick-prefixed custom unit name: `'widget`
    #[regex(r"'[a-zA-Z_][a-zA-Z0-9_]*")]
    TickName,

    // Operators
    #[token("+-")]
    #[token("±")]
    PlusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("^")]
    Caret,
    #[token("%")]
    Percent,
    #[token("~")]
    Tilde,
    #[token("==")]
    EqEq,
    #[token("!=")]
    Ne,
    #[token("<=")]
    Le,
    #[token("<")]
    Lt,
    #[token(">=")]
    Ge,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,

    // Statement separators
    #[token("\n")]
    Newline,
    #[token(";")]
    Semicolon,

    /// End of input, appended by the lexer.
    Eof,
}

impl TokenKind {
    /// Human-readable name, used in diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Let => "let",
            TokenKind::If => "if",
            TokenKind::Then => "then",
            TokenKind::Else => "else",
            TokenKind::To => "to",
            TokenKind::In => "in",
            TokenKind::Number => "<number>",
            TokenKind::Ident => "<identifier>",
            TokenKind::TickName => "<custom unit>",
            TokenKind::PlusMinus => "+-",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Caret => "^",
            TokenKind::Percent => "%",
            TokenKind::Tilde => "~",
            TokenKind::EqEq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Le => "<=",
            TokenKind::Lt => "<",
            TokenKind::Ge => ">=",
            TokenKind::Gt => ">",
            TokenKind::Eq => "=",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Comma => ",",
            TokenKind::Newline => "newline",
            TokenKind::Semicolon => ";",
            TokenKind::Eof => "<eof>",
        }
    }

    /// True for tokens that end a statement.
    pub fn is_separator(self) -> bool {
        matches!(self, TokenKind::Newline | TokenKind::Semicolon)
    }
}
