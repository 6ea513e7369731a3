//! Lexer: source text to a token stream

mod token;

pub use token::Token;

use crate::ast::Span;
use crate::error::{CompileError, Result};
use logos::Logos;

/// Tokenize the whole source, pairing each token with its byte span
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(source);

    while let Some(result) = lexer.next() {
        let span = Span::new(lexer.span().start, lexer.span().end);
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => {
                let (line, column) = span.line_col(source);
                return Err(CompileError::parser(
                    format!("unrecognized token `{}`", lexer.slice()),
                    line,
                    column,
                    span,
                ));
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .expect("tokenize")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_number_bases() {
        assert_eq!(kinds("77"), vec![Token::IntLit(77)]);
        assert_eq!(kinds("0o10"), vec![Token::IntLit(8)]);
        assert_eq!(kinds("0xf"), vec![Token::IntLit(15)]);
    }

    #[test]
    fn test_string_and_ident() {
        assert_eq!(
            kinds("'foo' bar"),
            vec![Token::StringLit("foo".into()), Token::Ident("bar".into())]
        );
    }

    #[test]
    fn test_keywords_vs_idents() {
        assert_eq!(kinds("in"), vec![Token::In]);
        assert_eq!(kinds("index"), vec![Token::Ident("index".into())]);
        assert_eq!(kinds("not in"), vec![Token::Not, Token::In]);
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != <= >= < > = + - * / %"),
            vec![
                Token::EqEq,
                Token::NotEq,
                Token::LtEq,
                Token::GtEq,
                Token::Lt,
                Token::Gt,
                Token::Assign,
                Token::Plus,
                Token::Minus,
                Token::Star,
                Token::Slash,
                Token::Percent,
            ]
        );
    }

    #[test]
    fn test_newlines_collapse() {
        assert_eq!(
            kinds("a\n\n\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("a # trailing comment\nb"),
            vec![
                Token::Ident("a".into()),
                Token::Newline,
                Token::Ident("b".into()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_error() {
        assert!(tokenize("'oops").is_err());
    }
}
