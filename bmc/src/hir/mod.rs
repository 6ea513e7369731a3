//! High-level IR
//!
//! HIR is not much different from the AST: still a tree, but no longer
//! loss-preserving. Operator syntax collapses into generic calls with
//! synthetic names and statements unwrap to their inner expression, so later
//! stages only ever deal with calls and leaf values.

mod lower;

pub use lower::lower_ast;

/// An HIR value
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Number(i64),
    Boolean(bool),
    String(String),
    Identifier(String),
    Array(Vec<Object>),
    /// String-keyed, source order preserved
    Dict(Vec<(String, Object)>),
    FunctionCall(FunctionCall),
}

/// A function or method call
///
/// The receiver is `None` for free function calls; for method calls it is an
/// identifier-like object or another call (method chaining).
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub receiver: Option<Box<Object>>,
    pub name: String,
    pub pos: Vec<Object>,
    pub kw: Vec<(String, Object)>,
}

/// Flat list of HIR instructions in source order
pub type IrList = Vec<Object>;
