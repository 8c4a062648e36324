//! Syntax tree produced by the parser.
//!
//! Nodes carry no behaviour beyond their `Display` rendering, a compact
//! parenthesised prefix form (`(+ 1 (* 2 3))`) used by the `check` command
//! and by parser tests.

use crate::source::Span;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    VarDeclaration {
        constant: bool,
        identifier: String,
        value: Option<Expr>,
    },
    FunctionDeclaration {
        name: String,
        parameters: Vec<String>,
        body: Vec<Stmt>,
    },
    Expression(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    NumericLiteral(f64),
    StringLiteral(String),
    ObjectLiteral(Vec<Property>),
    Binary {
        left: Box<Expr>,
        // Kept as the raw token text; validity is checked during evaluation.
        operator: String,
        right: Box<Expr>,
    },
    Assignment {
        assignee: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        caller: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
        computed: bool,
    },
}

/// A `key: value` entry of an object literal. `value` is `None` for the
/// shorthand form `{ key }`, which reads `key` from scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub key: String,
    pub value: Option<Expr>,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Stmt { kind, span }
    }
}

fn write_separated<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    separator: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_separated(f, &self.body, "\n")
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            StmtKind::VarDeclaration {
                constant,
                identifier,
                value,
            } => {
                let keyword = if *constant { "const" } else { "let" };
                match value {
                    Some(value) => write!(f, "({} {} {})", keyword, identifier, value),
                    None => write!(f, "({} {})", keyword, identifier),
                }
            }
            StmtKind::FunctionDeclaration {
                name,
                parameters,
                body,
            } => {
                write!(f, "(fn {} ({})", name, parameters.join(" "))?;
                for stmt in body {
                    write!(f, " {}", stmt)?;
                }
                write!(f, ")")
            }
            StmtKind::Expression(expr) => write!(f, "{}", expr),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExprKind::Identifier(name) => write!(f, "{}", name),
            ExprKind::NumericLiteral(n) => write!(f, "{}", n),
            ExprKind::StringLiteral(s) => write!(f, "\"{}\"", s),
            ExprKind::ObjectLiteral(properties) => {
                write!(f, "{{")?;
                write_separated(f, properties, ", ")?;
                write!(f, "}}")
            }
            ExprKind::Binary {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", operator, left, right),
            ExprKind::Assignment { assignee, value } => write!(f, "(= {} {})", assignee, value),
            ExprKind::Call { caller, arguments } => {
                write!(f, "(call {}", caller)?;
                for argument in arguments {
                    write!(f, " {}", argument)?;
                }
                write!(f, ")")
            }
            ExprKind::Member {
                object,
                property,
                computed: false,
            } => write!(f, "(. {} {})", object, property),
            ExprKind::Member {
                object,
                property,
                computed: true,
            } => write!(f, "([] {} {})", object, property),
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}: {}", self.key, value),
            None => write!(f, "{}", self.key),
        }
    }
}
