//! Variable scope management for evaluated expressions.
//!
//! A scope is a chain of local frames over a single global object — the
//! binding environment supplied by the session. Identifier lookup walks the
//! frames innermost-first and falls back to the global object; assignment to
//! a name with no existing binding writes the global object, matching
//! non-strict ES5 inside an isolated context.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::value::{FrameRef, ObjectRef, Value};

/// A variable scope for one evaluation.
#[derive(Debug)]
pub struct Scope {
    /// The binding environment object. Free identifiers resolve here.
    globals: ObjectRef,
    /// Value of `this` for the code running in this scope.
    this_val: Value,
    /// Stack of local frames. Empty at program top level, where `var`
    /// declares directly on the binding environment.
    frames: Vec<FrameRef>,
}

impl Scope {
    /// Top-level scope over a binding environment. `this` is the
    /// environment object itself.
    pub fn new(globals: ObjectRef) -> Self {
        Self {
            this_val: Value::Object(globals.clone()),
            globals,
            frames: Vec::new(),
        }
    }

    /// Scope for a function invocation: the closure's captured frames plus
    /// one fresh frame for parameters and `var` declarations.
    pub fn for_call(globals: ObjectRef, this_val: Value, captured: Vec<FrameRef>) -> Self {
        let mut frames = captured;
        frames.push(Rc::new(RefCell::new(HashMap::new())));
        Self {
            globals,
            this_val,
            frames,
        }
    }

    /// The binding environment object.
    pub fn globals(&self) -> &ObjectRef {
        &self.globals
    }

    /// The current `this` value.
    pub fn this_value(&self) -> Value {
        self.this_val.clone()
    }

    /// Declare a name in the innermost frame, or on the binding environment
    /// at top level.
    pub fn declare(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.frames.last() {
            Some(frame) => {
                frame.borrow_mut().insert(name, value);
            }
            None => {
                self.globals.borrow_mut().insert(name, value);
            }
        }
    }

    /// Look up a name, innermost frame first, then the binding environment.
    pub fn get(&self, name: &str) -> Option<Value> {
        for frame in self.frames.iter().rev() {
            if let Some(value) = frame.borrow().get(name) {
                return Some(value.clone());
            }
        }
        self.globals.borrow().get(name).cloned()
    }

    /// Assign to an existing binding, or create one on the binding
    /// environment if no frame declares the name.
    pub fn assign(&mut self, name: &str, value: Value) {
        for frame in self.frames.iter().rev() {
            if frame.borrow().contains_key(name) {
                frame.borrow_mut().insert(name.to_string(), value);
                return;
            }
        }
        self.globals.borrow_mut().insert(name.to_string(), value);
    }

    /// True if the name resolves in any frame or the environment.
    pub fn contains(&self, name: &str) -> bool {
        self.frames.iter().any(|f| f.borrow().contains_key(name))
            || self.globals.borrow().contains_key(name)
    }

    /// Snapshot the current frame chain for closure capture.
    pub fn capture(&self) -> Vec<FrameRef> {
        self.frames.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_declare_writes_environment() {
        let env = Value::empty_object();
        let mut scope = Scope::new(env.clone());
        scope.declare("x", Value::Int(1));
        assert!(env.borrow().contains_key("x"));
    }

    #[test]
    fn call_frame_shadows_environment() {
        let env = Value::empty_object();
        env.borrow_mut().insert("x".to_string(), Value::Int(1));
        let mut scope = Scope::for_call(env.clone(), Value::Null, vec![]);
        scope.declare("x", Value::Int(2));
        assert!(matches!(scope.get("x"), Some(Value::Int(2))));
        // the environment binding is untouched
        assert!(matches!(env.borrow().get("x"), Some(Value::Int(1))));
    }

    #[test]
    fn assign_without_declaration_writes_environment() {
        let env = Value::empty_object();
        let mut scope = Scope::for_call(env.clone(), Value::Null, vec![]);
        scope.assign("leaked", Value::Bool(true));
        assert!(env.borrow().contains_key("leaked"));
    }

    #[test]
    fn captured_frames_are_shared() {
        let env = Value::empty_object();
        let mut outer = Scope::for_call(env.clone(), Value::Null, vec![]);
        outer.declare("n", Value::Int(10));

        let captured = outer.capture();
        let inner = Scope::for_call(env, Value::Null, captured);
        assert!(matches!(inner.get("n"), Some(Value::Int(10))));

        // mutation through the outer scope is visible to the capture
        outer.assign("n", Value::Int(11));
        assert!(matches!(inner.get("n"), Some(Value::Int(11))));
    }

    #[test]
    fn this_defaults_to_environment_object() {
        let env = Value::empty_object();
        let scope = Scope::new(env.clone());
        match scope.this_value() {
            Value::Object(obj) => assert!(Rc::ptr_eq(&obj, &env)),
            other => panic!("expected object, got {:?}", other),
        }
    }
}
