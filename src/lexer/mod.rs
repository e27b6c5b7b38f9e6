//! Lexer for the estimation language
//!
//! Built on [logos]. Produces a flat token stream with byte spans and the
//! original text of each token; a trailing [`TokenKind::Eof`] is always
//! appended so the parser never runs off the end.

mod tokens;

pub use tokens::{Token, TokenKind};

use crate::common::Span;
use crate::diagnostics::ParseError;
use logos::Logos;

/// Tokenize source text.
///
/// Newlines come through as tokens (they separate statements); all other
/// whitespace and comments are skipped.
pub fn lex(source: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(kind) => tokens.push(Token {
                kind,
                span,
                text: source[range].to_string(),
            }),
            Err(_) => return Err(ParseError::UnknownToken { span: span.into() }),
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span::new(source.len(), source.len()),
        text: String::new(),
    });

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_numbers_keep_raw_text() {
        let tokens = lex("1_200 3.5 1.2e3 7e-2").unwrap();
        let texts: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Number)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(texts, vec!["1_200", "3.5", "1.2e3", "7e-2"]);
    }

    #[test]
    fn test_keywords_vs_identifiers() {
        assert_eq!(
            kinds("to in let if then else total"),
            vec![
                TokenKind::To,
                TokenKind::In,
                TokenKind::Let,
                TokenKind::If,
                TokenKind::Then,
                TokenKind::Else,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_plus_minus_both_spellings() {
        assert_eq!(
            kinds("100 +- 10"),
            vec![
                TokenKind::Number,
                TokenKind::PlusMinus,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("100 ± 10"), kinds("100 +- 10"));
        // `+ -` with a space stays two tokens
        assert_eq!(
            kinds("1 + -2"),
            vec![
                TokenKind::Number,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_tick_names_and_sig_fig_marker() {
        let tokens = lex("~1200 'widget").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Tilde);
        assert_eq!(tokens[1].kind, TokenKind::Number);
        assert_eq!(tokens[2].kind, TokenKind::TickName);
        assert_eq!(tokens[2].text, "'widget");
    }

    #[test]
    fn test_comments_skipped_newlines_kept() {
        assert_eq!(
            kinds("1 # tail comment\n2 // other style\n3"),
            vec![
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Number,
                TokenKind::Newline,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("a <= b == c != d >= e"),
            vec![
                TokenKind::Ident,
                TokenKind::Le,
                TokenKind::Ident,
                TokenKind::EqEq,
                TokenKind::Ident,
                TokenKind::Ne,
                TokenKind::Ident,
                TokenKind::Ge,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_micro_prefix_identifier() {
        let tokens = lex("3 µm").unwrap();
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].text, "µm");
    }

    #[test]
    fn test_unknown_character_errors() {
        let err = lex("1 @ 2").unwrap_err();
        assert!(matches!(err, ParseError::UnknownToken { .. }));
    }

    #[test]
    fn test_spans_cover_source() {
        let source = "ab + cd";
        let tokens = lex(source).unwrap();
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(3, 4));
        assert_eq!(tokens[2].span, Span::new(5, 7));
        assert_eq!(tokens[3].span, Span::new(7, 7));
    }
}
