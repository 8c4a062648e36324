use crate::ast::Stmt;
use crate::environment::Environment;
use crate::evaluator::EvalResult;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Host callable exposed to scripts. Receives the evaluated arguments and
/// the scope of the call site.
pub type NativeFunc = fn(Vec<Value>, &Rc<RefCell<Environment>>) -> EvalResult;

/// Runtime value produced by evaluation.
#[derive(Clone)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    Object(Rc<HashMap<String, Value>>),
    NativeFunction(NativeFunc, String), // The function pointer and its name (for display/debug)
    Function(Rc<Function>),
}

/// A user function together with the scope it was declared in.
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Vec<Stmt>,
    // Shared: the function may outlive the call that declared it.
    pub declaration_env: Rc<RefCell<Environment>>,
}

impl Value {
    pub fn object(properties: impl IntoIterator<Item = (String, Value)>) -> Self {
        Value::Object(Rc::new(properties.into_iter().collect()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::NativeFunction(..) => "native-function",
            Value::Function(_) => "function",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::NativeFunction(..) | Value::Function(_))
    }
}

fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

// Strings are quoted when nested inside objects
fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::String(s) => write!(f, "\"{}\"", s),
        other => write!(f, "{}", other),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(properties) => {
                if properties.is_empty() {
                    return write!(f, "{{}}");
                }
                let mut keys: Vec<&String> = properties.keys().collect();
                keys.sort();
                write!(f, "{{ ")?;
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    write_nested(f, &properties[key])?;
                }
                write!(f, " }}")
            }
            Value::NativeFunction(_, name) => write!(f, "<native {}>", name),
            Value::Function(function) => write!(f, "{}", function),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}({})", self.name, self.parameters.join(", "))
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Object(properties) => f.debug_map().entries(properties.iter()).finish(),
            Value::NativeFunction(_, name) => write!(f, "NativeFunction({})", name),
            Value::Function(function) => write!(f, "{:?}", function),
        }
    }
}

// The declaration scope is left out: it usually contains the function itself.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

// Function pointers are not comparable in a meaningful way, so natives
// compare by name and user functions by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::NativeFunction(_, a), Value::NativeFunction(_, b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}
