//! Abstract Syntax Tree definitions
//!
//! The AST is the loss-preserving tree produced by the parser. Every node
//! renders back to canonical DSL text (see `output`), which is the contract
//! the parser tests assert against.

mod output;
mod span;

pub use span::*;

use serde::{Deserialize, Serialize};

/// Expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Integer literal; octal and hex forms are normalized at lex time
    Number(i64),
    /// Boolean literal
    Boolean(bool),
    /// Single-quoted string literal
    String(String),
    /// Identifier reference
    Identifier(String),
    /// Array literal: [a, b, c]
    Array(Vec<Expr>),
    /// Dict literal: {k : v, ...}, source order preserved
    Dict(Vec<(Expr, Expr)>),

    /// Unary operation
    Unary { op: UnaryOp, rhs: Box<Expr> },

    /// Multiplicative operation: *, /, %
    Multiplicative {
        lhs: Box<Expr>,
        op: MulOp,
        rhs: Box<Expr>,
    },

    /// Additive operation: +, -
    Additive {
        lhs: Box<Expr>,
        op: AddOp,
        rhs: Box<Expr>,
    },

    /// Relational operation, including logic and membership
    Relational {
        lhs: Box<Expr>,
        op: RelOp,
        rhs: Box<Expr>,
    },

    /// Subscript: lhs[rhs]
    Subscript { lhs: Box<Expr>, rhs: Box<Expr> },

    /// Assignment: lhs = rhs; the parser guarantees lhs is an Identifier
    Assignment { lhs: Box<Expr>, rhs: Box<Expr> },

    /// Function call: callee(args)
    FunctionCall { callee: Box<Expr>, args: Arguments },

    /// Method call: receiver.name(args)
    MethodCall {
        receiver: Box<Expr>,
        name: String,
        args: Arguments,
    },
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
}

/// Multiplicative operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MulOp {
    Mul,
    Div,
    Mod,
}

/// Additive operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddOp {
    Add,
    Sub,
}

/// Relational operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    Lt,
    Le,
    Eq,
    Ne,
    Ge,
    Gt,
    And,
    Or,
    In,
    NotIn,
}

/// Ordered positional and keyword arguments of a call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Arguments {
    pub positional: Vec<Expr>,
    /// Keyword pairs; keys are identifiers by construction
    pub keyword: Vec<(Expr, Expr)>,
}

/// A statement wraps a single expression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub expr: Expr,
}

/// A code block is an ordered sequence of statements
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CodeBlock {
    pub statements: Vec<Statement>,
}
