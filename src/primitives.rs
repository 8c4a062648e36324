//! Native functions bound in the global environment.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{Environment, EvalResult, Value};

/// Renders arguments the way `print` writes them: comma separated, strings
/// unquoted.
pub fn format_arguments(args: &[Value]) -> String {
    args.iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn prim_print(args: Vec<Value>, _env: &Rc<RefCell<Environment>>) -> EvalResult {
    println!("{}", format_arguments(&args));
    Ok(Value::Null)
}

/// Milliseconds since the Unix epoch.
pub fn prim_time(_args: Vec<Value>, _env: &Rc<RefCell<Environment>>) -> EvalResult {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as f64)
        .unwrap_or(0.0);
    log::trace!("native 'time' returned {}", millis);
    Ok(Value::Number(millis))
}
