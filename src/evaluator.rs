use crate::ast::{Expr, ExprKind, Program, Property, Stmt, StmtKind};
use crate::environment::{EnvError, Environment};
use crate::source::Span;
use crate::types::{Function, Value};
use log::debug;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

// --- Evaluation Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error(transparent)]
    EnvError(#[from] EnvError), // Errors from declaring, assigning or looking up names
    #[error("Evaluation Error: Invalid assignment target, only identifiers can be assigned")]
    InvalidAssignmentTarget(Span),
    #[error("Evaluation Error: Expected a function, but got: {0}")]
    NotCallable(Value, Span),
    #[error("Evaluation Error: Cannot read a property of {}", .0.type_name())]
    NotAnObject(Value, Span),
    #[error("Evaluation Error: Property keys must be strings or numbers, got: {0}")]
    InvalidMemberKey(Value, Span),
    #[error("Evaluation Error: Unknown operator '{0}'")]
    UnknownOperator(String, Span),
}

impl EvalError {
    pub fn span(&self) -> Span {
        match self {
            EvalError::EnvError(
                EnvError::DuplicateDeclaration(_, span)
                | EnvError::UnboundVariable(_, span)
                | EnvError::ConstantReassignment(_, span),
            ) => *span,
            EvalError::InvalidAssignmentTarget(span)
            | EvalError::NotCallable(_, span)
            | EvalError::NotAnObject(_, span)
            | EvalError::InvalidMemberKey(_, span)
            | EvalError::UnknownOperator(_, span) => *span,
        }
    }
}

// Result type alias for convenience
pub type EvalResult<T = Value> = Result<T, EvalError>;

// --- Evaluate Functions ---

/// Evaluates every statement of `program` in `env`; the result is the value
/// of the last statement, or null for an empty program.
pub fn evaluate(program: &Program, env: &Rc<RefCell<Environment>>) -> EvalResult {
    debug!("evaluating program with {} statements", program.body.len());
    evaluate_body(&program.body, env)
}

fn evaluate_body(body: &[Stmt], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let mut last = Value::Null;
    for stmt in body {
        last = evaluate_statement(stmt, env)?;
    }
    Ok(last)
}

pub fn evaluate_statement(stmt: &Stmt, env: &Rc<RefCell<Environment>>) -> EvalResult {
    match &stmt.kind {
        StmtKind::VarDeclaration {
            constant,
            identifier,
            value,
        } => {
            let value = match value {
                Some(expr) => evaluate_expression(expr, env)?,
                None => Value::Null,
            };
            debug!("declaring '{}' (constant: {})", identifier, constant);
            Ok(env
                .borrow_mut()
                .declare(identifier, value, *constant, stmt.span)?)
        }
        StmtKind::FunctionDeclaration {
            name,
            parameters,
            body,
        } => {
            let function = Value::Function(Rc::new(Function {
                name: name.clone(),
                parameters: parameters.clone(),
                body: body.clone(),
                declaration_env: Rc::clone(env),
            }));
            debug!("declaring function '{}'", name);
            // Function bindings are always constant
            Ok(env.borrow_mut().declare(name, function, true, stmt.span)?)
        }
        StmtKind::Expression(expr) => evaluate_expression(expr, env),
    }
}

pub fn evaluate_expression(expr: &Expr, env: &Rc<RefCell<Environment>>) -> EvalResult {
    match &expr.kind {
        ExprKind::NumericLiteral(n) => Ok(Value::Number(*n)),
        ExprKind::StringLiteral(s) => Ok(Value::String(s.clone())),
        ExprKind::Identifier(name) => Ok(Environment::lookup(env, name, expr.span)?),
        ExprKind::ObjectLiteral(properties) => evaluate_object(properties, env),
        ExprKind::Binary {
            left,
            operator,
            right,
        } => evaluate_binary(left, operator, right, env, expr.span),
        ExprKind::Assignment { assignee, value } => {
            evaluate_assignment(assignee, value, env, expr.span)
        }
        ExprKind::Call { caller, arguments } => evaluate_call(caller, arguments, env, expr.span),
        ExprKind::Member {
            object,
            property,
            computed,
        } => evaluate_member(object, property, *computed, env),
    }
}

fn evaluate_object(properties: &[Property], env: &Rc<RefCell<Environment>>) -> EvalResult {
    let mut object = HashMap::with_capacity(properties.len());
    for property in properties {
        let value = match &property.value {
            Some(expr) => evaluate_expression(expr, env)?,
            // Shorthand `{ key }` reads `key` from scope
            None => Environment::lookup(env, &property.key, property.span)?,
        };
        // Later duplicates overwrite earlier ones
        object.insert(property.key.clone(), value);
    }
    Ok(Value::Object(Rc::new(object)))
}

fn evaluate_binary(
    left: &Expr,
    operator: &str,
    right: &Expr,
    env: &Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    let lhs = evaluate_expression(left, env)?;
    let rhs = evaluate_expression(right, env)?;

    match (lhs, rhs) {
        (Value::Number(l), Value::Number(r)) => {
            evaluate_numeric_binary(l, operator, r, span).map(Value::Number)
        }
        // Any non-numeric operand yields null
        _ => Ok(Value::Null),
    }
}

// IEEE semantics throughout: division by zero gives infinities or NaN.
fn evaluate_numeric_binary(left: f64, operator: &str, right: f64, span: Span) -> EvalResult<f64> {
    match operator {
        "+" => Ok(left + right),
        "-" => Ok(left - right),
        "*" => Ok(left * right),
        "/" => Ok(left / right),
        "%" => Ok(left % right),
        "^" => Ok(left.powf(right)),
        other => Err(EvalError::UnknownOperator(other.to_string(), span)),
    }
}

fn evaluate_assignment(
    assignee: &Expr,
    value: &Expr,
    env: &Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    let ExprKind::Identifier(name) = &assignee.kind else {
        return Err(EvalError::InvalidAssignmentTarget(assignee.span));
    };
    let value = evaluate_expression(value, env)?;
    Ok(Environment::assign(env, name, value, span)?)
}

fn evaluate_call(
    caller: &Expr,
    arguments: &[Expr],
    env: &Rc<RefCell<Environment>>,
    span: Span,
) -> EvalResult {
    // Arguments first, left to right, then the callee
    let mut evaluated_args = Vec::with_capacity(arguments.len());
    for argument in arguments {
        evaluated_args.push(evaluate_expression(argument, env)?);
    }

    match evaluate_expression(caller, env)? {
        Value::NativeFunction(func, name) => {
            debug!("calling native '{}' with {} arguments", name, evaluated_args.len());
            func(evaluated_args, env)
        }
        Value::Function(function) => call_function(&function, evaluated_args, span),
        other => Err(EvalError::NotCallable(other, caller.span)),
    }
}

/// Runs `function` in a fresh scope enclosed by its declaration scope.
/// Parameters bind positionally; missing arguments bind to null and extra
/// ones are dropped.
fn call_function(function: &Function, args: Vec<Value>, span: Span) -> EvalResult {
    debug!(
        "calling '{}' with {} of {} arguments",
        function.name,
        args.len(),
        function.parameters.len()
    );
    let scope = Environment::new_enclosed(Rc::clone(&function.declaration_env));

    let mut args = args.into_iter();
    for parameter in &function.parameters {
        let value = args.next().unwrap_or(Value::Null);
        scope.borrow_mut().declare(parameter, value, false, span)?;
    }

    evaluate_body(&function.body, &scope)
}

fn evaluate_member(
    object: &Expr,
    property: &Expr,
    computed: bool,
    env: &Rc<RefCell<Environment>>,
) -> EvalResult {
    let target = evaluate_expression(object, env)?;

    let key = match (&property.kind, computed) {
        (ExprKind::Identifier(name), false) => name.clone(),
        _ => match evaluate_expression(property, env)? {
            Value::String(key) => key,
            number @ Value::Number(_) => number.to_string(),
            other => return Err(EvalError::InvalidMemberKey(other, property.span)),
        },
    };

    match target {
        Value::Object(properties) => Ok(properties.get(&key).cloned().unwrap_or(Value::Null)),
        other => Err(EvalError::NotAnObject(other, object.span)),
    }
}
