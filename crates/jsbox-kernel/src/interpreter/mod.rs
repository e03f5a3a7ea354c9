//! Expression evaluation: runtime values, scopes, and the evaluator.

pub mod eval;
pub mod scope;
pub mod value;

pub use eval::{Console, EvalError, EvalResult, Evaluator, NoConsole};
pub use scope::Scope;
pub use value::{ArrayRef, Builtin, Closure, FrameRef, ObjectRef, Value};
