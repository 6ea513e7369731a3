//! HIR to MIR lowering
//!
//! Builds the initial control flow graph. Sequential statements populate a
//! single entry block; `__condition` calls become branch terminators with
//! fresh arm blocks that reconverge at a join block. Assignments disappear
//! here: the lowered value carries the bound name in its variable
//! annotation.

use std::collections::BTreeMap;

use super::{BasicBlock, FunctionCall, Mir, Object, Terminator, Variable};
use crate::error::{CompileError, Result};
use crate::hir;
use crate::parser::CONDITION_FN;

/// Lower a flat HIR list into a CFG
pub fn lower_hir(ir: hir::IrList) -> Result<Mir> {
    let mut ctx = LoweringContext::new();
    lower_into(&mut ctx, ir)?;
    ctx.finish_block(Terminator::End);
    Ok(Mir { blocks: ctx.blocks })
}

/// Context for MIR lowering
struct LoweringContext {
    blocks: Vec<BasicBlock>,
    current_label: String,
    current_instructions: Vec<Object>,
    block_counter: usize,
}

impl LoweringContext {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            current_label: "entry".to_string(),
            current_instructions: Vec::new(),
            block_counter: 0,
        }
    }

    /// Generate a fresh block label
    fn fresh_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.block_counter);
        self.block_counter += 1;
        label
    }

    fn push(&mut self, obj: Object) {
        self.current_instructions.push(obj);
    }

    /// Finish the current block with a terminator
    fn finish_block(&mut self, terminator: Terminator) {
        let block = BasicBlock {
            label: std::mem::take(&mut self.current_label),
            instructions: std::mem::take(&mut self.current_instructions),
            terminator,
        };
        self.blocks.push(block);
    }

    fn start_block(&mut self, label: String) {
        self.current_label = label;
    }
}

fn lower_into(ctx: &mut LoweringContext, objects: Vec<hir::Object>) -> Result<()> {
    for obj in objects {
        match obj {
            hir::Object::FunctionCall(call)
                if call.receiver.is_none() && call.name == CONDITION_FN =>
            {
                lower_condition(ctx, call)?;
            }
            other => {
                let lowered = lower_object(other)?;
                ctx.push(lowered);
            }
        }
    }
    Ok(())
}

fn lower_condition(ctx: &mut LoweringContext, call: hir::FunctionCall) -> Result<()> {
    let mut args = call.pos.into_iter();
    let (Some(condition), Some(then_body), Some(else_body)) =
        (args.next(), args.next(), args.next())
    else {
        return Err(CompileError::lowering("malformed conditional shape"));
    };
    let (hir::Object::Array(then_body), hir::Object::Array(else_body)) = (then_body, else_body)
    else {
        return Err(CompileError::lowering(
            "conditional branches must be statement arrays",
        ));
    };

    let condition = lower_object(condition)?;
    let then_label = ctx.fresh_label("then");
    let else_label = ctx.fresh_label("else");
    let join_label = ctx.fresh_label("join");

    ctx.finish_block(Terminator::Branch {
        condition,
        then_label: then_label.clone(),
        else_label: else_label.clone(),
    });

    ctx.start_block(then_label);
    lower_into(ctx, then_body)?;
    ctx.finish_block(Terminator::Goto(join_label.clone()));

    ctx.start_block(else_label);
    lower_into(ctx, else_body)?;
    ctx.finish_block(Terminator::Goto(join_label.clone()));

    ctx.start_block(join_label);
    Ok(())
}

fn lower_object(obj: hir::Object) -> Result<Object> {
    match obj {
        hir::Object::Number(n) => Ok(Object::number(n)),
        hir::Object::Boolean(b) => Ok(Object::boolean(b)),
        hir::Object::String(s) => Ok(Object::string(s)),
        hir::Object::Identifier(name) => Ok(Object::identifier(name)),

        hir::Object::Array(elements) => {
            let elements = elements.into_iter().map(lower_object).collect::<Result<_>>()?;
            Ok(Object::array(elements))
        }

        hir::Object::Dict(pairs) => {
            let mut value = BTreeMap::new();
            for (key, v) in pairs {
                if value.insert(key.clone(), lower_object(v)?).is_some() {
                    return Err(CompileError::invalid_arguments(format!(
                        "duplicate dict key `{}`",
                        key
                    )));
                }
            }
            Ok(Object::Dict(super::Dict {
                value,
                var: Variable::default(),
            }))
        }

        hir::Object::FunctionCall(call) => lower_call(call),
    }
}

fn lower_call(call: hir::FunctionCall) -> Result<Object> {
    // Assignments bind the value to a name instead of producing a call
    if call.receiver.is_none() && call.name == "__assign" {
        let mut args = call.pos.into_iter();
        let (Some(target), Some(value)) = (args.next(), args.next()) else {
            return Err(CompileError::lowering("malformed assignment shape"));
        };
        let hir::Object::Identifier(name) = target else {
            return Err(CompileError::lowering(
                "assignment target is not an identifier",
            ));
        };
        let value = lower_object(value)?;
        return Ok(value.with_var(Variable::named(name)));
    }

    let holder = match call.receiver {
        None => None,
        Some(receiver) => match *receiver {
            hir::Object::Identifier(name) => Some(name),
            other => {
                return Err(CompileError::lowering(format!(
                    "method calls on non-identifier receivers are not supported: {:?}",
                    other
                )));
            }
        },
    };

    let pos_args = call
        .pos
        .into_iter()
        .map(lower_object)
        .collect::<Result<_>>()?;
    let mut kw_args = BTreeMap::new();
    for (key, value) in call.kw {
        if kw_args.insert(key.clone(), lower_object(value)?).is_some() {
            return Err(CompileError::invalid_arguments(format!(
                "duplicate keyword argument `{}`",
                key
            )));
        }
    }

    Ok(Object::FunctionCall(FunctionCall {
        holder,
        name: call.name,
        pos_args,
        kw_args,
        var: Variable::default(),
    }))
}
