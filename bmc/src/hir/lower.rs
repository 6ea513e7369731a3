//! AST to HIR lowering
//!
//! A structural map. The only failures are violated AST invariants, which
//! indicate a parser bug rather than a user error.

use super::{FunctionCall, IrList, Object};
use crate::ast::{AddOp, Arguments, CodeBlock, Expr, MulOp, RelOp, UnaryOp};
use crate::error::{CompileError, Result};

/// Lower a parsed code block to a flat HIR list
pub fn lower_ast(block: &CodeBlock) -> Result<IrList> {
    block
        .statements
        .iter()
        .map(|stmt| lower_expr(&stmt.expr))
        .collect()
}

fn lower_expr(expr: &Expr) -> Result<Object> {
    match expr {
        Expr::Number(n) => Ok(Object::Number(*n)),
        Expr::Boolean(b) => Ok(Object::Boolean(*b)),
        Expr::String(s) => Ok(Object::String(s.clone())),
        Expr::Identifier(name) => Ok(Object::Identifier(name.clone())),

        Expr::Array(elements) => {
            let elements = elements.iter().map(lower_expr).collect::<Result<_>>()?;
            Ok(Object::Array(elements))
        }

        Expr::Dict(pairs) => {
            let mut lowered = Vec::with_capacity(pairs.len());
            for (key, value) in pairs {
                let Expr::String(key) = key else {
                    return Err(CompileError::lowering(format!(
                        "dict keys must be string literals, got `{}`",
                        key.as_string()
                    )));
                };
                lowered.push((key.clone(), lower_expr(value)?));
            }
            Ok(Object::Dict(lowered))
        }

        Expr::Unary { op, rhs } => {
            let name = match op {
                UnaryOp::Neg => "__neg",
            };
            Ok(call(name, vec![lower_expr(rhs)?]))
        }

        Expr::Multiplicative { lhs, op, rhs } => {
            let name = match op {
                MulOp::Mul => "__mul",
                MulOp::Div => "__div",
                MulOp::Mod => "__mod",
            };
            Ok(call(name, vec![lower_expr(lhs)?, lower_expr(rhs)?]))
        }

        Expr::Additive { lhs, op, rhs } => {
            let name = match op {
                AddOp::Add => "__add",
                AddOp::Sub => "__sub",
            };
            Ok(call(name, vec![lower_expr(lhs)?, lower_expr(rhs)?]))
        }

        Expr::Relational { lhs, op, rhs } => {
            let name = match op {
                RelOp::Lt => "__lt",
                RelOp::Le => "__le",
                RelOp::Eq => "__eq",
                RelOp::Ne => "__ne",
                RelOp::Ge => "__ge",
                RelOp::Gt => "__gt",
                RelOp::And => "__and",
                RelOp::Or => "__or",
                RelOp::In => "__in",
                RelOp::NotIn => "__not_in",
            };
            Ok(call(name, vec![lower_expr(lhs)?, lower_expr(rhs)?]))
        }

        Expr::Subscript { lhs, rhs } => {
            Ok(call("__subscript", vec![lower_expr(lhs)?, lower_expr(rhs)?]))
        }

        Expr::Assignment { lhs, rhs } => {
            let Expr::Identifier(name) = lhs.as_ref() else {
                return Err(CompileError::lowering(
                    "assignment target is not an identifier",
                ));
            };
            Ok(call(
                "__assign",
                vec![Object::Identifier(name.clone()), lower_expr(rhs)?],
            ))
        }

        Expr::FunctionCall { callee, args } => {
            let Expr::Identifier(name) = callee.as_ref() else {
                return Err(CompileError::lowering(format!(
                    "call target must be an identifier, got `{}`",
                    callee.as_string()
                )));
            };
            let (pos, kw) = lower_arguments(args)?;
            Ok(Object::FunctionCall(FunctionCall {
                receiver: None,
                name: name.clone(),
                pos,
                kw,
            }))
        }

        Expr::MethodCall {
            receiver,
            name,
            args,
        } => {
            let receiver = lower_expr(receiver)?;
            match receiver {
                Object::Identifier(_) | Object::FunctionCall(_) => {}
                _ => {
                    return Err(CompileError::lowering(format!(
                        "method receiver must be an identifier or call, got `{:?}`",
                        receiver
                    )));
                }
            }
            let (pos, kw) = lower_arguments(args)?;
            Ok(Object::FunctionCall(FunctionCall {
                receiver: Some(Box::new(receiver)),
                name: name.clone(),
                pos,
                kw,
            }))
        }
    }
}

fn lower_arguments(args: &Arguments) -> Result<(Vec<Object>, Vec<(String, Object)>)> {
    let pos = args
        .positional
        .iter()
        .map(lower_expr)
        .collect::<Result<_>>()?;
    let mut kw = Vec::with_capacity(args.keyword.len());
    for (key, value) in &args.keyword {
        let Expr::Identifier(key) = key else {
            return Err(CompileError::lowering(
                "keyword argument name is not an identifier",
            ));
        };
        kw.push((key.clone(), lower_expr(value)?));
    }
    Ok((pos, kw))
}

fn call(name: &str, pos: Vec<Object>) -> Object {
    Object::FunctionCall(FunctionCall {
        receiver: None,
        name: name.to_string(),
        pos,
        kw: Vec::new(),
    })
}
