//! Pure data types for jsbox — the wire-level value model.
//!
//! This crate is a leaf dependency with no parser, no interpreter, no I/O.
//! It exists so that consumers of the engine's protocol can work with
//! jsbox's value system without pulling jsbox-kernel's dependencies.

pub mod value;

pub use value::{json_to_value, value_to_json, Value};
