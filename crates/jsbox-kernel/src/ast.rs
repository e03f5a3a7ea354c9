//! Abstract syntax tree for the jsbox expression subset.
//!
//! A program is a statement list; the completion value of a program is the
//! value of its last expression statement. Function bodies reuse the same
//! statement list shape.

use std::rc::Rc;

/// A source span, byte offsets into the original source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SrcSpan {
    pub start: usize,
    pub end: usize,
}

impl SrcSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A parsed program: the unit the sandbox evaluates.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Vec<Stmt>,
}

/// Statements allowed at top level and inside function bodies.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// An expression statement; its value becomes the completion value.
    Expr(Expr),
    /// `var a = 1, b;` — names with optional initializers.
    VarDecl(Vec<(String, Option<Expr>)>),
    /// `return;` or `return expr;` — only meaningful inside functions.
    Return(Option<Expr>),
    If {
        cond: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    Block(Vec<Stmt>),
    Empty,
}

/// Literal values as they appear in source.
#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// An anonymous function literal. `Rc` so closures share the body.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLit {
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Plus,
    TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    EqLoose,
    NotEqLoose,
    EqStrict,
    NotEqStrict,
    Lt,
    Gt,
    LtEq,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Lit),
    /// Identifier reference. Carries its span so the validator can report
    /// undefined names with a source location.
    Ident { name: String, span: SrcSpan },
    This,
    Array(Vec<Expr>),
    /// Object literal; keys are identifier, string, or numeric property names.
    Object(Vec<(String, Expr)>),
    Function(Rc<FunctionLit>),
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        op: AssignOp,
        value: Box<Expr>,
    },
}

impl Expr {
    /// Shorthand for an identifier without a meaningful span (tests, builders).
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident {
            name: name.into(),
            span: SrcSpan::default(),
        }
    }
}
