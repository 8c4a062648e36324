use crate::environment::Environment;
use crate::evaluator::{EvalError, evaluate};
use crate::parser::{ParseError, parse_str};
use crate::source::Span;
use crate::types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Any failure from running source text: lexing and parsing faults surface
/// as `Parse`, runtime faults as `Eval`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Eval(#[from] EvalError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl ParseError {
    pub fn span(&self) -> Span {
        match self {
            ParseError::UnexpectedToken { found, .. } => found.span,
            ParseError::UnexpectedEof { span, .. } => *span,
            ParseError::LexerError(lex_err) => lex_err.span,
            ParseError::MissingConstInitializer(span) | ParseError::InvalidParameter(span) => *span,
        }
    }
}

impl Error {
    pub fn span(&self) -> Span {
        match self {
            Error::Parse(e) => e.span(),
            Error::Eval(e) => e.span(),
        }
    }
}

/// Lexes, parses and evaluates `source` in `env`.
pub fn run(source: &str, env: &Rc<RefCell<Environment>>) -> Result<Value> {
    let program = parse_str(source)?;
    Ok(evaluate(&program, env)?)
}
