use crate::lexer::LexerErrorKind;
use crate::{EnvError, Error, EvalError, LexerError, ParseError, Span};
use ariadne::{Config, Label, Report, ReportKind, Source};
use std::io::{self, Write};
use std::ops::Range;

// Headline, labelled span and label text of a diagnostic.
struct Diagnostic {
    message: String,
    span: Span,
    label: String,
}

// Zero-width spans (end of input) still need one column to point at.
fn label_range(span: Span) -> Range<usize> {
    if span.start == span.end {
        span.start..span.end + 1
    } else {
        span.to_range()
    }
}

fn build_report<'a>(
    id: &'a str,
    diagnostic: Diagnostic,
    color: bool,
) -> Report<'a, (&'a str, Range<usize>)> {
    let range = label_range(diagnostic.span);
    Report::build(ReportKind::Error, (id, range.clone()))
        .with_config(Config::default().with_color(color))
        .with_message(diagnostic.message)
        .with_label(Label::new((id, range)).with_message(diagnostic.label))
        .finish()
}

impl LexerError {
    fn diagnostic(&self) -> Diagnostic {
        let label = match self.error {
            LexerErrorKind::UnterminatedString => "This string is never closed".to_string(),
            LexerErrorKind::UnterminatedComment => "This comment is never closed".to_string(),
            LexerErrorKind::InvalidCharacter(c) => format!("'{}' is not part of the language", c),
            LexerErrorKind::InvalidToken => "Unrecognised input".to_string(),
        };
        Diagnostic {
            message: format!("Lexer Error: {}", self.error),
            span: self.span,
            label,
        }
    }
}

impl ParseError {
    fn diagnostic(&self) -> Diagnostic {
        match self {
            ParseError::UnexpectedToken { found, expected } => Diagnostic {
                message: format!("Unexpected token: {}", found),
                span: found.span,
                label: format!("Expected {expected}"),
            },
            ParseError::UnexpectedEof { expected, span } => Diagnostic {
                message: "Unexpected end of input".to_string(),
                span: *span,
                label: format!("Expected {expected}"),
            },
            ParseError::LexerError(lex_err) => lex_err.diagnostic(),
            ParseError::MissingConstInitializer(span) => Diagnostic {
                message: "Missing initializer in const declaration".to_string(),
                span: *span,
                label: "Constants must be given a value with '='".to_string(),
            },
            ParseError::InvalidParameter(span) => Diagnostic {
                message: "Invalid function parameter".to_string(),
                span: *span,
                label: "Parameters must be plain identifiers".to_string(),
            },
        }
    }
}

impl EvalError {
    fn diagnostic(&self) -> Diagnostic {
        let (message, label) = match self {
            EvalError::EnvError(env_error) => match env_error {
                EnvError::UnboundVariable(name, _) => (
                    format!("Unbound variable `{}`", name),
                    "This name is not defined in the current scope".to_string(),
                ),
                EnvError::DuplicateDeclaration(name, _) => (
                    format!("Duplicate declaration of `{}`", name),
                    "This name is already declared in this scope".to_string(),
                ),
                EnvError::ConstantReassignment(name, _) => (
                    format!("Cannot reassign constant `{}`", name),
                    "Constants cannot be assigned after declaration".to_string(),
                ),
            },
            EvalError::InvalidAssignmentTarget(_) => (
                "Invalid assignment target".to_string(),
                "Only identifiers can be assigned to".to_string(),
            ),
            EvalError::NotCallable(value, _) => (
                format!("Not a function: {}", value),
                format!("This {} cannot be called", value.type_name()),
            ),
            EvalError::NotAnObject(value, _) => (
                format!("Cannot read a property of {}", value.type_name()),
                format!("This evaluates to {}", value),
            ),
            EvalError::InvalidMemberKey(value, _) => (
                "Invalid property key".to_string(),
                format!("Expected a string or number, found a {}", value.type_name()),
            ),
            EvalError::UnknownOperator(operator, _) => (
                format!("Unknown operator '{}'", operator),
                "This operator is not supported".to_string(),
            ),
        };
        Diagnostic {
            message,
            span: self.span(),
            label,
        }
    }
}

impl Error {
    fn diagnostic(&self) -> Diagnostic {
        match self {
            Error::Parse(e) => e.diagnostic(),
            Error::Eval(e) => e.diagnostic(),
        }
    }
}

macro_rules! impl_pretty_print {
    ($($error:ty),*) => {
        $(
            impl $error {
                /// Prints a source-annotated report of this error to stderr.
                /// `id` names the source (a file path, or "REPL").
                pub fn pretty_print(&self, id: &str, input: &str) -> io::Result<()> {
                    build_report(id, self.diagnostic(), true).eprint((id, Source::from(input)))
                }

                /// Writes the same report without colors.
                pub fn write_report<W: Write>(&self, id: &str, input: &str, w: W) -> io::Result<()> {
                    build_report(id, self.diagnostic(), false).write((id, Source::from(input)), w)
                }
            }
        )*
    };
}

impl_pretty_print!(LexerError, ParseError, EvalError, Error);
