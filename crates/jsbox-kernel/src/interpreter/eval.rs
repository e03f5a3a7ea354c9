//! Tree-walking evaluator for the jsbox expression subset.
//!
//! The evaluator reduces AST nodes to runtime values against a `Scope`.
//! It sees exactly the bindings the scope supplies — there is no ambient
//! host state to reach. Injected capabilities (the `console` object) are
//! dispatched through the `Console` trait, which routes all output away
//! from the response channel.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::ast::{AssignOp, BinaryOp, Expr, Lit, Program, Stmt, UnaryOp};

use super::scope::Scope;
use super::value::{Builtin, Closure, Value};

/// Maximum function call nesting. Prevents stack overflow from
/// pathologically recursive inputs.
const MAX_CALL_DEPTH: usize = 128;

/// Errors that can occur during expression evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// Variable not found in scope.
    UndefinedVariable(String),
    /// Operand type does not fit the operation.
    TypeError { expected: &'static str, got: String },
    /// Property access on null.
    NullPropertyAccess(String),
    /// Callee is not a function.
    NotCallable(String),
    /// Left side of an assignment is not assignable.
    InvalidAssignTarget,
    /// Function call nesting exceeded MAX_CALL_DEPTH.
    CallDepthExceeded,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UndefinedVariable(name) => write!(f, "{} is not defined", name),
            EvalError::TypeError { expected, got } => {
                write!(f, "type error: expected {}, got {}", expected, got)
            }
            EvalError::NullPropertyAccess(prop) => {
                write!(f, "cannot read property '{}' of null", prop)
            }
            EvalError::NotCallable(got) => write!(f, "{} is not a function", got),
            EvalError::InvalidAssignTarget => write!(f, "invalid assignment target"),
            EvalError::CallDepthExceeded => write!(f, "maximum call depth exceeded"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Result type for evaluation.
pub type EvalResult<T> = Result<T, EvalError>;

/// Sink for the injected `console` capability.
///
/// Implemented by the protocol layer to route output to the error channel
/// with per-line prefixes. The evaluator only formats and dispatches.
pub trait Console {
    /// `console.log(...)` payload, already space-joined.
    fn log(&mut self, message: &str);
    /// `console.error(...)` payload, already space-joined.
    fn error(&mut self, message: &str);
}

/// A console sink that discards everything.
///
/// Used when the capability is not bound; the builtins are then
/// unreachable, but the evaluator still needs a sink type.
pub struct NoConsole;

impl Console for NoConsole {
    fn log(&mut self, _message: &str) {}
    fn error(&mut self, _message: &str) {}
}

/// Control flow through statement lists.
enum Flow {
    /// Fell through; carries the last expression-statement value.
    Normal(Option<Value>),
    /// A `return` unwound to the nearest function boundary.
    Return(Value),
}

/// Numeric operand, preserving the int/float split.
#[derive(Clone, Copy)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

fn as_num(value: &Value) -> Option<Num> {
    match value {
        Value::Int(n) => Some(Num::Int(*n)),
        Value::Float(x) => Some(Num::Float(*x)),
        Value::Bool(b) => Some(Num::Int(i64::from(*b))),
        Value::Null => Some(Num::Int(0)),
        _ => None,
    }
}

/// Expression evaluator over a scope and a console sink.
pub struct Evaluator<'a, C: Console> {
    scope: &'a mut Scope,
    console: &'a mut C,
    depth: usize,
}

impl<'a, C: Console> Evaluator<'a, C> {
    pub fn new(scope: &'a mut Scope, console: &'a mut C) -> Self {
        Self {
            scope,
            console,
            depth: 0,
        }
    }

    /// Evaluate a program; the completion value is the last expression
    /// statement's value, or null if there is none.
    pub fn eval_program(&mut self, program: &Program) -> EvalResult<Value> {
        match self.exec_stmts(&program.body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(value) => Ok(value.unwrap_or(Value::Null)),
        }
    }

    fn exec_stmts(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
        let mut last = None;
        for stmt in stmts {
            match self.exec_stmt(stmt)? {
                Flow::Return(value) => return Ok(Flow::Return(value)),
                Flow::Normal(Some(value)) => last = Some(value),
                Flow::Normal(None) => {}
            }
        }
        Ok(Flow::Normal(last))
    }

    fn exec_stmt(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
        match stmt {
            Stmt::Expr(expr) => Ok(Flow::Normal(Some(self.eval(expr)?))),
            Stmt::VarDecl(decls) => {
                for (name, init) in decls {
                    let value = match init {
                        Some(expr) => self.eval(expr)?,
                        None => Value::Null,
                    };
                    self.scope.declare(name.clone(), value);
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Return(expr) => {
                let value = match expr {
                    Some(e) => self.eval(e)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                if self.eval(cond)?.truthy() {
                    self.exec_stmts(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmts(else_branch)
                } else {
                    Ok(Flow::Normal(None))
                }
            }
            Stmt::While { cond, body } => {
                while self.eval(cond)?.truthy() {
                    if let Flow::Return(value) = self.exec_stmts(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal(None))
            }
            Stmt::Block(body) => self.exec_stmts(body),
            Stmt::Empty => Ok(Flow::Normal(None)),
        }
    }

    /// Evaluate an expression to a value.
    pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
        match expr {
            Expr::Literal(lit) => Ok(eval_literal(lit)),
            Expr::Ident { name, .. } => self
                .scope
                .get(name)
                .ok_or_else(|| EvalError::UndefinedVariable(name.clone())),
            Expr::This => Ok(self.scope.this_value()),
            Expr::Array(items) => {
                let values = items
                    .iter()
                    .map(|e| self.eval(e))
                    .collect::<EvalResult<Vec<_>>>()?;
                Ok(Value::Array(Rc::new(RefCell::new(values))))
            }
            Expr::Object(fields) => {
                let mut map = BTreeMap::new();
                for (key, value_expr) in fields {
                    map.insert(key.clone(), self.eval(value_expr)?);
                }
                Ok(Value::Object(Rc::new(RefCell::new(map))))
            }
            Expr::Function(func) => Ok(Value::Function(Rc::new(Closure {
                func: func.clone(),
                env: self.scope.capture(),
            }))),
            Expr::Member { object, property } => {
                let obj = self.eval(object)?;
                self.member_get(&obj, property)
            }
            Expr::Index { object, index } => {
                let obj = self.eval(object)?;
                let key = self.eval(index)?;
                self.index_get(&obj, &key)
            }
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Unary { op, operand } => {
                // typeof tolerates unresolved identifiers, ES5-style
                if *op == UnaryOp::TypeOf {
                    if let Expr::Ident { name, .. } = &**operand {
                        return Ok(Value::String(
                            self.scope
                                .get(name)
                                .map(|v| v.type_of())
                                .unwrap_or("undefined")
                                .to_string(),
                        ));
                    }
                }
                let value = self.eval(operand)?;
                self.eval_unary(*op, value)
            }
            Expr::Binary { left, op, right } => match op {
                // short-circuit: return the deciding operand, ES5-style
                BinaryOp::And => {
                    let lhs = self.eval(left)?;
                    if lhs.truthy() {
                        self.eval(right)
                    } else {
                        Ok(lhs)
                    }
                }
                BinaryOp::Or => {
                    let lhs = self.eval(left)?;
                    if lhs.truthy() {
                        Ok(lhs)
                    } else {
                        self.eval(right)
                    }
                }
                _ => {
                    let lhs = self.eval(left)?;
                    let rhs = self.eval(right)?;
                    eval_binary(*op, lhs, rhs)
                }
            },
            Expr::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then_expr)
                } else {
                    self.eval(else_expr)
                }
            }
            Expr::Assign { target, op, value } => self.eval_assign(target, *op, value),
        }
    }

    fn eval_call(&mut self, callee: &Expr, args: &[Expr]) -> EvalResult<Value> {
        // Method calls bind `this` to the receiver; plain calls bind it to
        // the binding environment object.
        let (func, this_val) = match callee {
            Expr::Member { object, property } => {
                let obj = self.eval(object)?;
                let func = self.member_get(&obj, property)?;
                (func, obj)
            }
            Expr::Index { object, index } => {
                let obj = self.eval(object)?;
                let key = self.eval(index)?;
                let func = self.index_get(&obj, &key)?;
                (func, obj)
            }
            other => {
                let func = self.eval(other)?;
                (func, Value::Object(self.scope.globals().clone()))
            }
        };

        let arg_values = args
            .iter()
            .map(|e| self.eval(e))
            .collect::<EvalResult<Vec<_>>>()?;

        match func {
            Value::Function(closure) => self.call_closure(&closure, this_val, arg_values),
            Value::Builtin(builtin) => {
                self.call_builtin(builtin, &arg_values);
                Ok(Value::Null)
            }
            other => Err(EvalError::NotCallable(other.type_of().to_string())),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Closure,
        this_val: Value,
        args: Vec<Value>,
    ) -> EvalResult<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(EvalError::CallDepthExceeded);
        }

        let mut scope = Scope::for_call(
            self.scope.globals().clone(),
            this_val,
            closure.env.clone(),
        );
        for (i, param) in closure.func.params.iter().enumerate() {
            scope.declare(param.clone(), args.get(i).cloned().unwrap_or(Value::Null));
        }

        let mut child = Evaluator {
            scope: &mut scope,
            console: &mut *self.console,
            depth: self.depth + 1,
        };
        match child.exec_stmts(&closure.func.body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal(_) => Ok(Value::Null),
        }
    }

    fn call_builtin(&mut self, builtin: Builtin, args: &[Value]) {
        let message = args
            .iter()
            .map(Value::display_string)
            .collect::<Vec<_>>()
            .join(" ");
        match builtin {
            Builtin::ConsoleLog => self.console.log(&message),
            Builtin::ConsoleError => self.console.error(&message),
        }
    }

    fn eval_assign(&mut self, target: &Expr, op: AssignOp, value: &Expr) -> EvalResult<Value> {
        match target {
            Expr::Ident { name, .. } => {
                let rhs = self.eval(value)?;
                let new_value = match op {
                    AssignOp::Assign => rhs,
                    _ => {
                        let old = self
                            .scope
                            .get(name)
                            .ok_or_else(|| EvalError::UndefinedVariable(name.clone()))?;
                        compound(op, old, rhs)?
                    }
                };
                self.scope.assign(name, new_value.clone());
                Ok(new_value)
            }
            Expr::Member { object, property } => {
                let obj = self.eval(object)?;
                let rhs = self.eval(value)?;
                let new_value = match op {
                    AssignOp::Assign => rhs,
                    _ => {
                        let old = self.member_get(&obj, property)?;
                        compound(op, old, rhs)?
                    }
                };
                self.member_set(&obj, property, new_value.clone())?;
                Ok(new_value)
            }
            Expr::Index { object, index } => {
                let obj = self.eval(object)?;
                let key = self.eval(index)?;
                let rhs = self.eval(value)?;
                let new_value = match op {
                    AssignOp::Assign => rhs,
                    _ => {
                        let old = self.index_get(&obj, &key)?;
                        compound(op, old, rhs)?
                    }
                };
                self.index_set(&obj, &key, new_value.clone())?;
                Ok(new_value)
            }
            _ => Err(EvalError::InvalidAssignTarget),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, value: Value) -> EvalResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
            UnaryOp::TypeOf => Ok(Value::String(value.type_of().to_string())),
            UnaryOp::Neg => match as_num(&value) {
                Some(Num::Int(n)) => Ok(n
                    .checked_neg()
                    .map(Value::Int)
                    .unwrap_or(Value::Float(-(n as f64)))),
                Some(Num::Float(x)) => Ok(Value::Float(-x)),
                None => Err(EvalError::TypeError {
                    expected: "number",
                    got: value.type_of().to_string(),
                }),
            },
            UnaryOp::Plus => match as_num(&value) {
                Some(Num::Int(n)) => Ok(Value::Int(n)),
                Some(Num::Float(x)) => Ok(Value::Float(x)),
                None => Err(EvalError::TypeError {
                    expected: "number",
                    got: value.type_of().to_string(),
                }),
            },
        }
    }

    fn member_get(&self, object: &Value, property: &str) -> EvalResult<Value> {
        match object {
            Value::Object(map) => Ok(map.borrow().get(property).cloned().unwrap_or(Value::Null)),
            Value::Array(items) => match property {
                "length" => Ok(Value::Int(items.borrow().len() as i64)),
                _ => Ok(Value::Null),
            },
            Value::String(s) => match property {
                "length" => Ok(Value::Int(s.chars().count() as i64)),
                _ => Ok(Value::Null),
            },
            Value::Null => Err(EvalError::NullPropertyAccess(property.to_string())),
            _ => Ok(Value::Null),
        }
    }

    fn index_get(&self, object: &Value, key: &Value) -> EvalResult<Value> {
        match object {
            Value::Array(items) => match key {
                Value::Int(n) => {
                    if *n < 0 {
                        return Ok(Value::Null);
                    }
                    Ok(items
                        .borrow()
                        .get(*n as usize)
                        .cloned()
                        .unwrap_or(Value::Null))
                }
                Value::String(s) if s == "length" => {
                    Ok(Value::Int(items.borrow().len() as i64))
                }
                _ => Ok(Value::Null),
            },
            Value::Object(_) => self.member_get(object, &index_key(key)),
            Value::String(s) => match key {
                Value::Int(n) if *n >= 0 => Ok(s
                    .chars()
                    .nth(*n as usize)
                    .map(|c| Value::String(c.to_string()))
                    .unwrap_or(Value::Null)),
                Value::String(k) if k == "length" => {
                    Ok(Value::Int(s.chars().count() as i64))
                }
                _ => Ok(Value::Null),
            },
            Value::Null => Err(EvalError::NullPropertyAccess(index_key(key))),
            _ => Ok(Value::Null),
        }
    }

    fn member_set(&self, object: &Value, property: &str, value: Value) -> EvalResult<()> {
        match object {
            Value::Object(map) => {
                map.borrow_mut().insert(property.to_string(), value);
                Ok(())
            }
            Value::Null => Err(EvalError::NullPropertyAccess(property.to_string())),
            other => Err(EvalError::TypeError {
                expected: "object",
                got: other.type_of().to_string(),
            }),
        }
    }

    fn index_set(&self, object: &Value, key: &Value, value: Value) -> EvalResult<()> {
        match object {
            Value::Array(items) => match key {
                Value::Int(n) if *n >= 0 => {
                    let idx = *n as usize;
                    let mut items = items.borrow_mut();
                    if idx >= items.len() {
                        items.resize(idx + 1, Value::Null);
                    }
                    items[idx] = value;
                    Ok(())
                }
                other => Err(EvalError::TypeError {
                    expected: "array index",
                    got: other.type_of().to_string(),
                }),
            },
            Value::Object(_) => self.member_set(object, &index_key(key), value),
            Value::Null => Err(EvalError::NullPropertyAccess(index_key(key))),
            other => Err(EvalError::TypeError {
                expected: "object",
                got: other.type_of().to_string(),
            }),
        }
    }
}

/// ToString for property keys in computed access.
fn index_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => other.display_string(),
    }
}

fn eval_literal(lit: &Lit) -> Value {
    match lit {
        Lit::Null => Value::Null,
        Lit::Bool(b) => Value::Bool(*b),
        Lit::Int(n) => Value::Int(*n),
        Lit::Float(x) => Value::Float(*x),
        Lit::String(s) => Value::String(s.clone()),
    }
}

fn compound(op: AssignOp, old: Value, rhs: Value) -> EvalResult<Value> {
    let binop = match op {
        AssignOp::AddAssign => BinaryOp::Add,
        AssignOp::SubAssign => BinaryOp::Sub,
        AssignOp::MulAssign => BinaryOp::Mul,
        AssignOp::DivAssign => BinaryOp::Div,
        // plain `=` never reaches here
        AssignOp::Assign => return Ok(rhs),
    };
    eval_binary(binop, old, rhs)
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> EvalResult<Value> {
    match op {
        BinaryOp::Add => {
            // string concatenation wins if either side is a string
            if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) {
                return Ok(Value::String(format!(
                    "{}{}",
                    lhs.display_string(),
                    rhs.display_string()
                )));
            }
            numeric_binop(op, &lhs, &rhs)
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            numeric_binop(op, &lhs, &rhs)
        }
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::LtEq | BinaryOp::GtEq => {
            if let (Value::String(a), Value::String(b)) = (&lhs, &rhs) {
                return Ok(Value::Bool(match op {
                    BinaryOp::Lt => a < b,
                    BinaryOp::Gt => a > b,
                    BinaryOp::LtEq => a <= b,
                    _ => a >= b,
                }));
            }
            let (a, b) = numeric_pair(&lhs, &rhs)?;
            let (a, b) = (a.as_f64(), b.as_f64());
            Ok(Value::Bool(match op {
                BinaryOp::Lt => a < b,
                BinaryOp::Gt => a > b,
                BinaryOp::LtEq => a <= b,
                _ => a >= b,
            }))
        }
        BinaryOp::EqStrict => Ok(Value::Bool(strict_eq(&lhs, &rhs))),
        BinaryOp::NotEqStrict => Ok(Value::Bool(!strict_eq(&lhs, &rhs))),
        BinaryOp::EqLoose => Ok(Value::Bool(loose_eq(&lhs, &rhs))),
        BinaryOp::NotEqLoose => Ok(Value::Bool(!loose_eq(&lhs, &rhs))),
        // And/Or are short-circuited by the evaluator
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled in eval"),
    }
}

fn numeric_pair(lhs: &Value, rhs: &Value) -> EvalResult<(Num, Num)> {
    match (as_num(lhs), as_num(rhs)) {
        (Some(a), Some(b)) => Ok((a, b)),
        (None, _) => Err(EvalError::TypeError {
            expected: "number",
            got: lhs.type_of().to_string(),
        }),
        (_, None) => Err(EvalError::TypeError {
            expected: "number",
            got: rhs.type_of().to_string(),
        }),
    }
}

fn numeric_binop(op: BinaryOp, lhs: &Value, rhs: &Value) -> EvalResult<Value> {
    let (a, b) = numeric_pair(lhs, rhs)?;

    if let (Num::Int(x), Num::Int(y)) = (a, b) {
        match op {
            BinaryOp::Add => {
                if let Some(n) = x.checked_add(y) {
                    return Ok(Value::Int(n));
                }
            }
            BinaryOp::Sub => {
                if let Some(n) = x.checked_sub(y) {
                    return Ok(Value::Int(n));
                }
            }
            BinaryOp::Mul => {
                if let Some(n) = x.checked_mul(y) {
                    return Ok(Value::Int(n));
                }
            }
            BinaryOp::Div => {
                // exact integer division stays an int; everything else,
                // including division by zero and i64::MIN / -1, falls
                // through to floats
                if let (Some(0), Some(n)) = (x.checked_rem(y), x.checked_div(y)) {
                    return Ok(Value::Int(n));
                }
            }
            BinaryOp::Mod => {
                if let Some(n) = x.checked_rem(y) {
                    return Ok(Value::Int(n));
                }
            }
            _ => {}
        }
    }

    let (x, y) = (a.as_f64(), b.as_f64());
    Ok(Value::Float(match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div => x / y,
        BinaryOp::Mod => x % y,
        _ => unreachable!("non-arithmetic op in numeric_binop"),
    }))
}

/// Strict equality: numbers compare numerically, primitives by value,
/// reference types by identity.
fn strict_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
        (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => a == b,
        _ => false,
    }
}

/// ToNumber for a string operand of `==`. Empty and blank strings are
/// zero; anything unparseable is NaN, which compares unequal to
/// everything.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        0.0
    } else {
        trimmed.parse::<f64>().unwrap_or(f64::NAN)
    }
}

/// Loose equality: strict equality plus number/boolean/string coercion.
/// Null equals only null.
fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    if strict_eq(lhs, rhs) {
        return true;
    }
    match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(s), other) | (other, Value::String(s))
            if matches!(other, Value::Bool(_) | Value::Int(_) | Value::Float(_)) =>
        {
            match as_num(other) {
                Some(n) => string_to_number(s) == n.as_f64(),
                None => false,
            }
        }
        (Value::Bool(_) | Value::Int(_) | Value::Float(_), Value::Bool(_) | Value::Int(_) | Value::Float(_)) => {
            match (as_num(lhs), as_num(rhs)) {
                (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
                _ => false,
            }
        }
        _ => false,
    }
}
