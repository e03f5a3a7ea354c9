//! One-shot sandboxed evaluation: lex, parse, evaluate against a binding
//! environment.
//!
//! This is the seam between the protocol layer and the interpreter. The
//! session hands in source text, an environment object, and a console sink;
//! everything the evaluated code can observe or mutate flows through those
//! three arguments.

use thiserror::Error;

use crate::interpreter::{Console, Evaluator, ObjectRef, Scope, Value};
use crate::parser;

/// A failure anywhere in the lex/parse/eval pipeline. Rendered as a single
/// diagnostic line for the error channel; the distinction only affects the
/// message shape.
#[derive(Debug, Clone, Error)]
pub enum SandboxError {
    #[error("syntax error: {0}")]
    Parse(String),
    #[error("evaluation error: {0}")]
    Eval(#[from] crate::interpreter::EvalError),
}

/// Evaluate `source` with free identifiers bound to `env`.
///
/// Returns the program's completion value. Mutations the code makes through
/// `this` or undeclared assignment land on `env` and survive the call.
pub fn run_in_scope<C: Console>(
    source: &str,
    env: &ObjectRef,
    console: &mut C,
) -> Result<Value, SandboxError> {
    let program = parser::parse(source).map_err(|errors| {
        // the first error is the one worth reporting; the rest are usually
        // cascades from the same token
        let first = errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown parse failure".to_string());
        SandboxError::Parse(first)
    })?;

    let mut scope = Scope::new(env.clone());
    let mut evaluator = Evaluator::new(&mut scope, console);
    Ok(evaluator.eval_program(&program)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::NoConsole;

    fn fresh_env() -> ObjectRef {
        Value::empty_object()
    }

    #[test]
    fn completion_value_comes_back() {
        let env = fresh_env();
        let value = run_in_scope("1 + 2", &env, &mut NoConsole).unwrap();
        assert!(matches!(value, Value::Int(3)));
    }

    #[test]
    fn environment_bindings_are_visible() {
        let env = fresh_env();
        env.borrow_mut().insert("x".to_string(), Value::Int(41));
        let value = run_in_scope("x + 1", &env, &mut NoConsole).unwrap();
        assert!(matches!(value, Value::Int(42)));
    }

    #[test]
    fn mutations_persist_across_calls() {
        let env = fresh_env();
        run_in_scope("var counter = 0;", &env, &mut NoConsole).unwrap();
        run_in_scope("counter += 1", &env, &mut NoConsole).unwrap();
        let value = run_in_scope("counter", &env, &mut NoConsole).unwrap();
        assert!(matches!(value, Value::Int(1)));
    }

    #[test]
    fn syntax_errors_are_reported_not_panicked() {
        let env = fresh_env();
        let err = run_in_scope("1 +", &env, &mut NoConsole).unwrap_err();
        assert!(matches!(err, SandboxError::Parse(_)));
    }

    #[test]
    fn eval_errors_are_reported() {
        let env = fresh_env();
        let err = run_in_scope("missing", &env, &mut NoConsole).unwrap_err();
        assert!(matches!(err, SandboxError::Eval(_)));
    }
}
