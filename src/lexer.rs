use logos::Logos;
use std::fmt;
use thiserror::Error;

use crate::Span;

// Consumes a block comment through its closing `*/`. An unclosed comment
// runs to the end of input and fails.
fn block_comment(lex: &mut logos::Lexer<RawToken>) -> Result<(), LexerErrorKind> {
    match lex.remainder().find("*/") {
        Some(idx) => {
            lex.bump(idx + 2);
            Ok(())
        }
        None => {
            lex.bump(lex.remainder().len());
            Err(LexerErrorKind::UnterminatedComment)
        }
    }
}

/// Raw token produced by logos, before comments are dropped and the
/// unterminated strings are turned into errors.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\n\r]+")] // Skip whitespace
#[logos(error = LexerErrorKind)]
enum RawToken {
    #[regex(r"//[^\n]*")]
    LineComment,
    #[token("/*", block_comment)]
    BlockComment,

    #[token("let")]
    #[token("cho")]
    Let,
    #[token("const")]
    Const,
    #[token("fn")]
    Fn,

    #[regex(r"[a-zA-Z]+")]
    Identifier,
    #[regex(r"[0-9]+")]
    Number,
    #[regex(r#""[^"]*""#)]
    String,
    #[regex(r#""[^"]*"#)]
    UnterminatedString,

    #[regex(r"[+\-*/^%]")]
    BinaryOperator,
    #[token("=")]
    Equals,

    #[token("(")]
    OpenParen,
    #[token(")")]
    CloseParen,
    #[token("[")]
    OpenBracket,
    #[token("]")]
    CloseBracket,
    #[token("{")]
    OpenBrace,
    #[token("}")]
    CloseBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    String,
    Identifier,

    // Keywords
    Let,
    Const,
    Fn,

    // Operators. Every arithmetic operator shares one kind; the parser
    // switches on the token text.
    BinaryOperator,
    Equals,

    // Grouping and punctuation
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,
    OpenBrace,
    CloseBrace,
    Comma,
    Dot,
    Colon,
    Semicolon,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Identifier => "identifier",
            TokenKind::Let => "'let'",
            TokenKind::Const => "'const'",
            TokenKind::Fn => "'fn'",
            TokenKind::BinaryOperator => "operator",
            TokenKind::Equals => "'='",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::OpenBracket => "'['",
            TokenKind::CloseBracket => "']'",
            TokenKind::OpenBrace => "'{'",
            TokenKind::CloseBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Eof => "end of input",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal source text. String tokens hold their contents without quotes.
    pub text: String,
    pub span: Span,
}

impl Token {
    fn eof(offset: usize) -> Self {
        Token {
            kind: TokenKind::Eof,
            text: String::new(),
            span: Span::new(offset, offset),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::String => write!(f, "\"{}\"", self.text),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

#[derive(Error, Default, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    #[error("Unterminated string literal")]
    UnterminatedString,
    #[error("Unterminated block comment")]
    UnterminatedComment,
    #[error("Unexpected character '{0}'")]
    InvalidCharacter(char),
    #[default]
    #[error("Invalid token")]
    InvalidToken,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct LexerError {
    pub error: LexerErrorKind,
    pub span: Span,
}

// Result type alias for convenience
type LexerRangedResult<T> = Result<T, LexerError>;

/// Converts source text into tokens, always terminated by exactly one
/// `TokenKind::Eof`. Fails on the first character no rule accepts.
pub fn tokenize(input: &str) -> LexerRangedResult<Vec<Token>> {
    let mut tokens = Vec::new();

    for (result, range) in RawToken::lexer(input).spanned() {
        let span = Span::from(range.clone());
        let raw = result.map_err(|error| {
            let error = match error {
                LexerErrorKind::InvalidToken => input
                    .get(range.clone())
                    .and_then(|slice| slice.chars().next())
                    .map_or(LexerErrorKind::InvalidToken, LexerErrorKind::InvalidCharacter),
                other => other,
            };
            LexerError { error, span }
        })?;

        let kind = match raw {
            RawToken::LineComment | RawToken::BlockComment => continue,
            RawToken::UnterminatedString => {
                return Err(LexerError {
                    error: LexerErrorKind::UnterminatedString,
                    span,
                });
            }
            RawToken::Let => TokenKind::Let,
            RawToken::Const => TokenKind::Const,
            RawToken::Fn => TokenKind::Fn,
            RawToken::Identifier => TokenKind::Identifier,
            RawToken::Number => TokenKind::Number,
            RawToken::String => TokenKind::String,
            RawToken::BinaryOperator => TokenKind::BinaryOperator,
            RawToken::Equals => TokenKind::Equals,
            RawToken::OpenParen => TokenKind::OpenParen,
            RawToken::CloseParen => TokenKind::CloseParen,
            RawToken::OpenBracket => TokenKind::OpenBracket,
            RawToken::CloseBracket => TokenKind::CloseBracket,
            RawToken::OpenBrace => TokenKind::OpenBrace,
            RawToken::CloseBrace => TokenKind::CloseBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Semicolon => TokenKind::Semicolon,
        };

        let slice = &input[range];
        let text = if kind == TokenKind::String {
            slice[1..slice.len() - 1].to_string()
        } else {
            slice.to_string()
        };
        tokens.push(Token { kind, text, span });
    }

    tokens.push(Token::eof(input.len()));
    log::trace!("tokenized {} bytes into {} tokens", input.len(), tokens.len());
    Ok(tokens)
}
