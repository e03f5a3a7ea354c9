//! Runtime values for the evaluator.
//!
//! Unlike the wire `jsbox_types::Value`, runtime values have reference
//! semantics for arrays and objects (`Rc<RefCell<…>>`) so that mutations
//! through `this` persist in a context-carrying session, and they can hold
//! closures and injected capability functions which never cross the wire.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use jsbox_types::Value as WireValue;

use crate::ast::FunctionLit;

/// A local variable frame shared between a closure and its defining scope.
pub type FrameRef = Rc<RefCell<HashMap<String, Value>>>;
/// A shared, mutable array.
pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
/// A shared, mutable object. Doubles as the binding environment.
pub type ObjectRef = Rc<RefCell<BTreeMap<String, Value>>>;

/// Maximum structural depth when lowering a runtime value to the wire.
/// Guards against cyclic object graphs built by evaluated source.
const MAX_WIRE_DEPTH: usize = 128;

/// A runtime value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Closure>),
    Builtin(Builtin),
}

/// A function value: the shared body plus the captured frame chain.
#[derive(Debug)]
pub struct Closure {
    pub func: Rc<FunctionLit>,
    pub env: Vec<FrameRef>,
}

/// Injected capability functions. Dispatched by the evaluator through the
/// `Console` trait, never stored beyond the scope that binds them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    ConsoleLog,
    ConsoleError,
}

/// Error lowering a runtime value to a wire value.
#[derive(Debug, Clone, PartialEq)]
pub struct CircularStructure;

impl fmt::Display for CircularStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "converting circular structure to JSON")
    }
}

impl std::error::Error for CircularStructure {}

impl Value {
    /// A fresh empty object.
    pub fn empty_object() -> ObjectRef {
        Rc::new(RefCell::new(BTreeMap::new()))
    }

    /// ES5 truthiness.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0 && !x.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Builtin(_) => true,
        }
    }

    /// `typeof` result, ES5 rules (`typeof null` is `"object"`).
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) => "object",
            Value::Function(_) | Value::Builtin(_) => "function",
        }
    }

    /// Lower to the wire value model. Functions become `null` (they have no
    /// JSON representation); cyclic structures are an error, matching
    /// `JSON.stringify` behavior.
    pub fn to_wire(&self) -> Result<WireValue, CircularStructure> {
        self.to_wire_depth(0)
    }

    fn to_wire_depth(&self, depth: usize) -> Result<WireValue, CircularStructure> {
        if depth > MAX_WIRE_DEPTH {
            return Err(CircularStructure);
        }
        Ok(match self {
            Value::Null => WireValue::Null,
            Value::Bool(b) => WireValue::Bool(*b),
            Value::Int(n) => WireValue::Int(*n),
            Value::Float(x) => WireValue::Float(*x),
            Value::String(s) => WireValue::String(s.clone()),
            Value::Array(items) => WireValue::Array(
                items
                    .borrow()
                    .iter()
                    .map(|v| v.to_wire_depth(depth + 1))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(map) => WireValue::Object(
                map.borrow()
                    .iter()
                    .map(|(k, v)| Ok((k.clone(), v.to_wire_depth(depth + 1)?)))
                    .collect::<Result<_, CircularStructure>>()?,
            ),
            Value::Function(_) | Value::Builtin(_) => WireValue::Null,
        })
    }

    /// Lift a wire value into the runtime model.
    pub fn from_wire(wire: &WireValue) -> Value {
        match wire {
            WireValue::Null => Value::Null,
            WireValue::Bool(b) => Value::Bool(*b),
            WireValue::Int(n) => Value::Int(*n),
            WireValue::Float(x) => Value::Float(*x),
            WireValue::String(s) => Value::String(s.clone()),
            WireValue::Array(items) => Value::Array(Rc::new(RefCell::new(
                items.iter().map(Value::from_wire).collect(),
            ))),
            WireValue::Object(map) => Value::Object(Rc::new(RefCell::new(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::from_wire(v)))
                    .collect(),
            ))),
        }
    }

    /// Rendering for console output: strings print bare, functions print a
    /// placeholder, everything else prints as JSON.
    pub fn display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Function(_) | Value::Builtin(_) => "[Function]".to_string(),
            other => match other.to_wire() {
                Ok(wire) => serde_json::to_string(&wire).unwrap_or_else(|_| "null".to_string()),
                Err(_) => "[Circular]".to_string(),
            },
        }
    }
}
