//! jsbox-kernel: the core of the jsbox evaluation engine.
//!
//! This crate provides:
//!
//! - **Lexer**: Tokenizes expression source using logos
//! - **Parser**: Builds AST from tokens using chumsky
//! - **AST**: Type definitions for the abstract syntax tree
//! - **Interpreter**: Runtime values, scopes, and the tree-walking evaluator
//! - **Sandbox**: One-shot evaluation against a binding environment
//! - **Session**: Line framing, message dispatch, response cycles
//! - **Protocol**: The completion sentinel and channel conventions
//! - **Validator**: jshint-style lint service over the same transport

pub mod ast;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod protocol;
pub mod sandbox;
pub mod session;
pub mod validator;

pub use protocol::SENTINEL;
pub use sandbox::{run_in_scope, SandboxError};
pub use session::{Session, SessionFault};
pub use validator::{LintReply, LintRequest};
