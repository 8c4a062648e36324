use crate::source::Span;
use crate::types::{NativeFunc, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use thiserror::Error;

// --- Environment Error ---
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvError {
    #[error("Cannot declare '{0}': it is already declared in this scope")]
    DuplicateDeclaration(String, Span),
    #[error("Unbound variable: '{0}'")]
    UnboundVariable(String, Span), // Symbol name, span where lookup happened
    #[error("Cannot reassign '{0}': it is a constant")]
    ConstantReassignment(String, Span),
}

pub type EnvResult<T> = Result<T, EnvError>;

// --- Environment Definition ---

#[derive(Debug, Default)]
pub struct Environment {
    // Shared so that function values can keep their declaration scope alive
    // after the call that created it has returned.
    outer: Option<Rc<RefCell<Environment>>>,
    bindings: HashMap<String, Value>,
    constants: HashSet<String>,
}

impl Environment {
    /// Creates a new, top-level (global) environment.
    pub fn new() -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// Creates a global environment holding `true`, `false`, `null` and the
    /// native functions from `primitives`.
    pub fn new_global_populated() -> Rc<RefCell<Environment>> {
        let env_ptr = Environment::new(); // Create empty global env
        {
            // Borrow mutably only inside this scope
            let mut env = env_ptr.borrow_mut();
            env.add_constant("true", Value::Boolean(true));
            env.add_constant("false", Value::Boolean(false));
            env.add_constant("null", Value::Null);

            env.add_primitive("print", crate::primitives::prim_print);
            env.add_primitive("time", crate::primitives::prim_time);
        }
        env_ptr
    }

    /// Creates a new environment enclosed within an outer one.
    pub fn new_enclosed(outer_env: Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Environment {
            outer: Some(outer_env),
            ..Environment::default()
        }))
    }

    /// Binds `name` in *this* frame. Shadowing a binding of an outer frame is
    /// allowed; redeclaring one of this frame is not.
    pub fn declare(
        &mut self,
        name: &str,
        value: Value,
        constant: bool,
        span: Span,
    ) -> EnvResult<Value> {
        if self.bindings.contains_key(name) {
            return Err(EnvError::DuplicateDeclaration(name.to_string(), span));
        }
        self.bindings.insert(name.to_string(), value.clone());
        if constant {
            self.constants.insert(name.to_string());
        }
        Ok(value)
    }

    /// Finds the environment that owns `name`, walking outward from `env`.
    pub fn resolve(
        env: &Rc<RefCell<Environment>>,
        name: &str,
        span: Span,
    ) -> EnvResult<Rc<RefCell<Environment>>> {
        let frame = env.borrow();
        if frame.bindings.contains_key(name) {
            return Ok(Rc::clone(env));
        }
        match &frame.outer {
            Some(outer_env_ptr) => Environment::resolve(outer_env_ptr, name, span),
            None => Err(EnvError::UnboundVariable(name.to_string(), span)),
        }
    }

    /// Updates the innermost existing binding of `name`. Constants are
    /// checked in the frame that owns the binding.
    pub fn assign(
        env: &Rc<RefCell<Environment>>,
        name: &str,
        value: Value,
        span: Span,
    ) -> EnvResult<Value> {
        let owner = Environment::resolve(env, name, span)?;
        let mut frame = owner.borrow_mut();
        if frame.constants.contains(name) {
            return Err(EnvError::ConstantReassignment(name.to_string(), span));
        }
        frame.bindings.insert(name.to_string(), value.clone());
        Ok(value)
    }

    /// Looks up a variable's value in the frame that owns it. `span` is
    /// where the variable was referenced.
    pub fn lookup(env: &Rc<RefCell<Environment>>, name: &str, span: Span) -> EnvResult<Value> {
        let owner = Environment::resolve(env, name, span)?;
        let frame = owner.borrow();
        frame
            .bindings
            .get(name)
            .cloned()
            .ok_or_else(|| EnvError::UnboundVariable(name.to_string(), span))
    }

    pub fn is_constant(&self, name: &str) -> bool {
        self.constants.contains(name)
    }

    /// Helper to add a native function to the environment.
    pub fn add_primitive(&mut self, name: &str, func: NativeFunc) {
        self.add_constant(name, Value::NativeFunction(func, name.to_string()));
    }

    fn add_constant(&mut self, name: &str, value: Value) {
        self.bindings.insert(name.to_string(), value);
        self.constants.insert(name.to_string());
    }

    /// Gets all identifiers visible from this environment
    pub fn get_identifiers(&self) -> HashSet<String> {
        let mut identifiers: HashSet<String> = self.bindings.keys().cloned().collect();
        if let Some(outer_env_ptr) = &self.outer {
            identifiers.extend(outer_env_ptr.borrow().get_identifiers());
        }
        identifiers
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn declare(env: &Rc<RefCell<Environment>>, name: &str, value: Value) {
        env.borrow_mut()
            .declare(name, value, false, Span::default())
            .expect("declaration should succeed");
    }

    #[test]
    fn test_declare_and_lookup_global() {
        let env = Environment::new();
        let declared = env
            .borrow_mut()
            .declare("x", num(10.0), false, Span::default());
        assert_eq!(declared, Ok(num(10.0)));
        assert_eq!(Environment::lookup(&env, "x", Span::default()), Ok(num(10.0)));
    }

    #[test]
    fn test_lookup_unbound() {
        let global_env = Environment::new();
        let local_env = Environment::new_enclosed(global_env);

        let span = Span::new(11, 12);
        assert_eq!(
            Environment::lookup(&local_env, "z", span),
            Err(EnvError::UnboundVariable("z".to_string(), span))
        );
    }

    #[test]
    fn test_duplicate_declaration() {
        let env = Environment::new();
        declare(&env, "x", num(1.0));
        let result = env.borrow_mut().declare("x", num(2.0), false, Span::new(3, 4));
        assert_eq!(
            result,
            Err(EnvError::DuplicateDeclaration("x".to_string(), Span::new(3, 4)))
        );
        // The first binding is untouched
        assert_eq!(Environment::lookup(&env, "x", Span::default()), Ok(num(1.0)));
    }

    #[test]
    fn test_shadowing_does_not_touch_outer() {
        let global_env = Environment::new();
        declare(&global_env, "x", num(10.0));

        let local_env = Environment::new_enclosed(global_env.clone());
        declare(&local_env, "x", num(50.0));
        Environment::assign(&local_env, "x", num(60.0), Span::default()).unwrap();

        assert_eq!(Environment::lookup(&local_env, "x", Span::default()), Ok(num(60.0)));
        assert_eq!(Environment::lookup(&global_env, "x", Span::default()), Ok(num(10.0)));
    }

    #[test]
    fn test_assign_walks_to_owner() {
        let global_env = Environment::new();
        declare(&global_env, "count", num(0.0));
        let inner_env = Environment::new_enclosed(Environment::new_enclosed(global_env.clone()));

        let result = Environment::assign(&inner_env, "count", num(3.0), Span::default());
        assert_eq!(result, Ok(num(3.0)));
        assert_eq!(Environment::lookup(&global_env, "count", Span::default()), Ok(num(3.0)));
        assert!(!inner_env.borrow().get_identifiers().is_empty());
    }

    #[test]
    fn test_assign_unbound() {
        let env = Environment::new_enclosed(Environment::new());
        let result = Environment::assign(&env, "nope", num(1.0), Span::new(0, 4));
        assert_eq!(
            result,
            Err(EnvError::UnboundVariable("nope".to_string(), Span::new(0, 4)))
        );
    }

    #[test]
    fn test_assign_constant() {
        let global_env = Environment::new();
        global_env
            .borrow_mut()
            .declare("pi", num(3.0), true, Span::default())
            .unwrap();
        assert!(global_env.borrow().is_constant("pi"));

        let local_env = Environment::new_enclosed(global_env.clone());
        let result = Environment::assign(&local_env, "pi", num(4.0), Span::default());
        assert!(matches!(result, Err(EnvError::ConstantReassignment(name, _)) if name == "pi"));
        assert_eq!(Environment::lookup(&global_env, "pi", Span::default()), Ok(num(3.0)));
    }

    #[test]
    fn test_constant_can_be_shadowed() {
        let global_env = Environment::new();
        global_env
            .borrow_mut()
            .declare("x", num(1.0), true, Span::default())
            .unwrap();
        let local_env = Environment::new_enclosed(global_env);
        declare(&local_env, "x", num(2.0));
        Environment::assign(&local_env, "x", num(3.0), Span::default()).unwrap();
        assert_eq!(Environment::lookup(&local_env, "x", Span::default()), Ok(num(3.0)));
    }

    #[test]
    fn test_resolve_returns_owning_frame() {
        let global_env = Environment::new();
        declare(&global_env, "g", num(1.0));
        let local_env = Environment::new_enclosed(global_env.clone());
        declare(&local_env, "l", num(2.0));

        let owner = Environment::resolve(&local_env, "g", Span::default()).unwrap();
        assert!(Rc::ptr_eq(&owner, &global_env));
        let owner = Environment::resolve(&local_env, "l", Span::default()).unwrap();
        assert!(Rc::ptr_eq(&owner, &local_env));
        assert!(matches!(
            Environment::resolve(&local_env, "missing", Span::default()),
            Err(EnvError::UnboundVariable(..))
        ));
    }

    #[test]
    fn test_lookup_and_assign_use_the_resolved_frame() {
        let global_env = Environment::new();
        declare(&global_env, "x", num(1.0));
        let middle_env = Environment::new_enclosed(global_env.clone());
        declare(&middle_env, "x", num(2.0));
        let inner_env = Environment::new_enclosed(middle_env.clone());

        let owner = Environment::resolve(&inner_env, "x", Span::default()).unwrap();
        assert!(Rc::ptr_eq(&owner, &middle_env));
        assert_eq!(Environment::lookup(&inner_env, "x", Span::default()), Ok(num(2.0)));

        Environment::assign(&inner_env, "x", num(5.0), Span::default()).unwrap();
        assert_eq!(Environment::lookup(&middle_env, "x", Span::default()), Ok(num(5.0)));
        assert_eq!(Environment::lookup(&global_env, "x", Span::default()), Ok(num(1.0)));
        assert!(!inner_env.borrow().get_identifiers().contains("y"));
    }

    #[test]
    fn test_global_populated() {
        let env = Environment::new_global_populated();
        assert_eq!(Environment::lookup(&env, "true", Span::default()), Ok(Value::Boolean(true)));
        assert_eq!(Environment::lookup(&env, "false", Span::default()), Ok(Value::Boolean(false)));
        assert_eq!(Environment::lookup(&env, "null", Span::default()), Ok(Value::Null));
        assert!(Environment::lookup(&env, "print", Span::default()).unwrap().is_callable());
        assert!(Environment::lookup(&env, "time", Span::default()).unwrap().is_callable());
        assert!(env.borrow().is_constant("null"));
        assert!(env.borrow().get_identifiers().contains("print"));
    }
}
