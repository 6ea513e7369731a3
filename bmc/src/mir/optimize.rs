//! MIR lowering passes
//!
//! This module provides the passes that reduce MIR to its final form, the
//! traversal primitives they are built from, and the fixed-point driver
//! that composes them. Each pass reports whether it changed the IR; the
//! driver keeps running the full list until a round makes no progress.
//!
//! Passes must be monotonic (never toggle the IR between two states), so a
//! bounded round count is only a safety net against a buggy pass.

use std::collections::{HashMap, HashSet};

use super::{
    BasicBlock, Compiler, Executable, File, Mir, Object, Persistent, Terminator,
};
use crate::error::{CompileError, Result};
use crate::machines::{Machine, MachineInfo, PerMachine};
use crate::toolchain::Language;

/// Safety cap on fixed-point rounds
const MAX_ROUNDS: usize = 1000;

/// Calls whose array arguments keep their structure
const NO_FLATTEN: [&str; 3] = ["message", "error", "warning"];

/// A lowering pass
pub trait Pass {
    /// Name of the pass
    fn name(&self) -> &'static str;

    /// Run over the whole CFG; returns true if anything changed
    fn run(&self, mir: &mut Mir, state: &Persistent) -> Result<bool>;
}

/// Fixed-point pass pipeline
pub struct Pipeline {
    passes: Vec<Box<dyn Pass>>,
    max_rounds: usize,
}

impl Pipeline {
    /// The standard pass list, in order
    pub fn new() -> Self {
        let mut pipeline = Self::empty();
        pipeline.add_pass(Box::new(MachineLower));
        pipeline.add_pass(Box::new(InsertCompilers));
        pipeline.add_pass(Box::new(CompilerMethods));
        pipeline.add_pass(Box::new(Flatten));
        pipeline.add_pass(Box::new(FoldConstants));
        pipeline.add_pass(Box::new(ConstantPropagation));
        pipeline.add_pass(Box::new(ValueNumbering));
        pipeline.add_pass(Box::new(LowerTargets));
        pipeline.add_pass(Box::new(BranchPruning));
        pipeline.add_pass(Box::new(JoinBlocks));
        pipeline
    }

    /// A pipeline with no passes
    pub fn empty() -> Self {
        Self {
            passes: Vec::new(),
            max_rounds: MAX_ROUNDS,
        }
    }

    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    pub fn set_max_rounds(&mut self, rounds: usize) {
        self.max_rounds = rounds;
    }

    /// Run all passes until a full round reports no progress
    pub fn run(&self, mir: &mut Mir, state: &Persistent) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();

        loop {
            if stats.rounds >= self.max_rounds {
                return Err(CompileError::PassDivergence {
                    rounds: self.max_rounds,
                });
            }
            stats.rounds += 1;

            let mut progress = false;
            for pass in &self.passes {
                if pass.run(mir, state)? {
                    progress = true;
                    stats.record_pass(pass.name());
                }
            }

            if !progress {
                break;
            }
        }

        Ok(stats)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics from a pipeline run
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Number of rounds until the fixed point, including the final idle one
    pub rounds: usize,
    /// Per-pass progress counts
    pub pass_counts: HashMap<String, usize>,
}

impl PipelineStats {
    fn record_pass(&mut self, name: &str) {
        *self.pass_counts.entry(name.to_string()).or_insert(0) += 1;
    }
}

// ============================================================================
// Traversal primitives
// ============================================================================
//
// Rewrite callbacks have the shape `(Object) -> Option<Object>`: a Some
// result requests in-place replacement of the visited object, None requests
// no change. Replacement happens position by position, so a callback never
// invalidates an ongoing walk. Errors abort the walk immediately.

/// Visit every top-level instruction of every block
pub fn instruction_walker<F>(mir: &mut Mir, cb: &mut F) -> Result<bool>
where
    F: FnMut(&Object) -> Result<Option<Object>>,
{
    let mut progress = false;
    for block in &mut mir.blocks {
        for obj in &mut block.instructions {
            if let Some(new) = cb(obj)? {
                *obj = new;
                progress = true;
            }
        }
    }
    Ok(progress)
}

/// Apply the callback to each element if the object is an array
pub fn array_walker<F>(obj: &mut Object, cb: &mut F) -> Result<bool>
where
    F: FnMut(&Object) -> Result<Option<Object>>,
{
    let mut progress = false;
    if let Object::Array(arr) = obj {
        for element in &mut arr.value {
            if let Some(new) = cb(element)? {
                *element = new;
                progress = true;
            }
        }
    }
    Ok(progress)
}

/// Apply the callback to each argument if the object is a function call
pub fn function_argument_walker<F>(obj: &mut Object, cb: &mut F) -> Result<bool>
where
    F: FnMut(&Object) -> Result<Option<Object>>,
{
    let mut progress = false;
    if let Object::FunctionCall(f) = obj {
        for arg in f.pos_args.iter_mut().chain(f.kw_args.values_mut()) {
            if let Some(new) = cb(arg)? {
                *arg = new;
                progress = true;
            }
        }
    }
    Ok(progress)
}

/// Like `instruction_walker`, but the mutator only runs on instructions
/// accepted by the filter
pub fn instruction_filter_walker<P, F>(mir: &mut Mir, filter: P, f: &mut F) -> Result<bool>
where
    P: Fn(&Object) -> bool,
    F: FnMut(&mut Object) -> Result<bool>,
{
    let mut progress = false;
    for block in &mut mir.blocks {
        for obj in &mut block.instructions {
            if filter(obj) {
                progress |= f(obj)?;
            }
        }
    }
    Ok(progress)
}

/// Apply the callback to each branch condition and one level of its
/// arguments or elements
pub fn condition_walker<F>(mir: &mut Mir, cb: &mut F) -> Result<bool>
where
    F: FnMut(&Object) -> Result<Option<Object>>,
{
    let mut progress = false;
    for block in &mut mir.blocks {
        if let Terminator::Branch { condition, .. } = &mut block.terminator {
            if let Some(new) = cb(condition)? {
                *condition = new;
                progress = true;
            }
            progress |= array_walker(condition, &mut *cb)?;
            progress |= function_argument_walker(condition, &mut *cb)?;
        }
    }
    Ok(progress)
}

// ============================================================================
// machine_lower
// ============================================================================

/// Replaces method calls on the machine holders with literal strings from
/// the corresponding machine info
pub struct MachineLower;

fn machine_map(holder: &str) -> Option<Machine> {
    match holder {
        "build_machine" => Some(Machine::Build),
        "host_machine" => Some(Machine::Host),
        "target_machine" => Some(Machine::Target),
        _ => None,
    }
}

fn lower_machine_call(
    machines: &PerMachine<MachineInfo>,
    obj: &Object,
) -> Result<Option<Object>> {
    let Object::FunctionCall(f) = obj else {
        return Ok(None);
    };
    let Some(holder) = &f.holder else {
        return Ok(None);
    };
    let Some(machine) = machine_map(holder) else {
        return Ok(None);
    };

    let info = machines.get(machine);
    let value = match f.name.as_str() {
        "cpu_family" => info.cpu_family.clone(),
        "cpu" => info.cpu.clone(),
        "system" => info.system().to_string(),
        "endian" => info.endian.as_str().to_string(),
        _ => return Err(CompileError::unknown_method(holder, &f.name)),
    };

    Ok(Some(Object::string(value).with_var(f.var.clone())))
}

impl Pass for MachineLower {
    fn name(&self) -> &'static str {
        "machine_lower"
    }

    fn run(&self, mir: &mut Mir, state: &Persistent) -> Result<bool> {
        let machines = &state.machines;

        let mut progress = instruction_walker(mir, &mut |o| lower_machine_call(machines, o))?;

        progress |= instruction_filter_walker(
            mir,
            |o| matches!(o, Object::Array(_)),
            &mut |obj| array_walker(obj, &mut |o| lower_machine_call(machines, o)),
        )?;

        progress |= instruction_filter_walker(
            mir,
            |o| matches!(o, Object::FunctionCall(_)),
            &mut |obj| function_argument_walker(obj, &mut |o| lower_machine_call(machines, o)),
        )?;

        progress |= condition_walker(mir, &mut |o| lower_machine_call(machines, o))?;

        Ok(progress)
    }
}

// ============================================================================
// insert_compilers
// ============================================================================

/// Replaces `meson.get_compiler(lang)` calls with compiler objects sharing
/// the toolchains owned by the persistent state
pub struct InsertCompilers;

fn replace_compiler(state: &Persistent, obj: &Object) -> Result<Option<Object>> {
    let Object::FunctionCall(f) = obj else {
        return Ok(None);
    };
    if f.holder.as_deref() != Some("meson") || f.name != "get_compiler" {
        return Ok(None);
    }

    let Some(first) = f.pos_args.first() else {
        return Err(CompileError::invalid_arguments(
            "meson.get_compiler(): requires a language argument",
        ));
    };
    // Wait until earlier rounds have reduced the argument to a string
    let Object::Str(lang) = first else {
        return Ok(None);
    };
    let language = Language::from_string(&lang.value)?;

    let machine = match f.kw_args.get("native") {
        Some(Object::Boolean(b)) => {
            if b.value {
                Machine::Build
            } else {
                Machine::Host
            }
        }
        // The native keyword has not been reduced yet
        Some(_) => return Ok(None),
        None => Machine::Host,
    };

    let Some(toolchains) = state.toolchains.get(&language) else {
        return Err(CompileError::unknown_language(&lang.value));
    };

    Ok(Some(Object::Compiler(Compiler {
        toolchain: toolchains.get(machine).clone(),
        for_machine: machine,
        var: f.var.clone(),
    })))
}

impl Pass for InsertCompilers {
    fn name(&self) -> &'static str {
        "insert_compilers"
    }

    fn run(&self, mir: &mut Mir, state: &Persistent) -> Result<bool> {
        instruction_walker(mir, &mut |o| replace_compiler(state, o))
    }
}

// ============================================================================
// compiler_methods
// ============================================================================

/// Folds method calls on variables bound to compiler objects, e.g.
/// `cxx.get_id()`
pub struct CompilerMethods;

impl Pass for CompilerMethods {
    fn name(&self) -> &'static str {
        "compiler_methods"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = false;

        for block in &mut mir.blocks {
            let compilers = block_compiler_bindings(block);
            if compilers.is_empty() {
                continue;
            }

            let mut cb = |obj: &Object| -> Result<Option<Object>> {
                let Object::FunctionCall(f) = obj else {
                    return Ok(None);
                };
                let Some(holder) = &f.holder else {
                    return Ok(None);
                };
                let Some(compiler) = compilers.get(holder) else {
                    return Ok(None);
                };
                match f.name.as_str() {
                    "get_id" => Ok(Some(
                        compiler
                            .get_id(&f.pos_args, &f.kw_args)?
                            .with_var(f.var.clone()),
                    )),
                    _ => Err(CompileError::unknown_method(holder, &f.name)),
                }
            };

            for obj in &mut block.instructions {
                if let Some(new) = cb(obj)? {
                    *obj = new;
                    progress = true;
                }
                progress |= function_argument_walker(obj, &mut cb)?;
            }
            if let Terminator::Branch { condition, .. } = &mut block.terminator {
                if let Some(new) = cb(condition)? {
                    *condition = new;
                    progress = true;
                }
                progress |= function_argument_walker(condition, &mut cb)?;
            }
        }

        Ok(progress)
    }
}

/// Names with exactly one definition in the block, where that definition is
/// a compiler object
fn block_compiler_bindings(block: &BasicBlock) -> HashMap<String, Compiler> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for inst in &block.instructions {
        let var = inst.var();
        if var.is_named() {
            *counts.entry(var.name.as_str()).or_insert(0) += 1;
        }
    }

    let mut compilers = HashMap::new();
    for inst in &block.instructions {
        if let Object::Compiler(c) = inst
            && c.var.is_named()
            && counts.get(c.var.name.as_str()) == Some(&1)
        {
            compilers.insert(c.var.name.clone(), c.clone());
        }
    }
    compilers
}

// ============================================================================
// flatten
// ============================================================================

/// Splices nested arrays in call arguments, except for the diagnostic
/// functions which keep their structure
pub struct Flatten;

fn splice(elements: Vec<Object>, out: &mut Vec<Object>) {
    for element in elements {
        match element {
            Object::Array(arr) => splice(arr.value, out),
            other => out.push(other),
        }
    }
}

impl Pass for Flatten {
    fn name(&self) -> &'static str {
        "flatten"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        instruction_filter_walker(
            mir,
            |o| matches!(o, Object::FunctionCall(f) if !NO_FLATTEN.contains(&f.name.as_str())),
            &mut |obj| {
                let Object::FunctionCall(f) = obj else {
                    return Ok(false);
                };
                let mut progress = false;
                for arg in f.pos_args.iter_mut().chain(f.kw_args.values_mut()) {
                    if let Object::Array(arr) = arg
                        && arr.value.iter().any(|e| matches!(e, Object::Array(_)))
                    {
                        let elements = std::mem::take(&mut arr.value);
                        let mut flat = Vec::new();
                        splice(elements, &mut flat);
                        arr.value = flat;
                        progress = true;
                    }
                }
                Ok(progress)
            },
        )
    }
}

// ============================================================================
// fold_constants
// ============================================================================

/// Evaluates the synthetic operator calls over literal operands
pub struct FoldConstants;

/// Structural equality on literal values, ignoring variable annotations
fn literal_eq(a: &Object, b: &Object) -> bool {
    match (a, b) {
        (Object::Number(a), Object::Number(b)) => a.value == b.value,
        (Object::Boolean(a), Object::Boolean(b)) => a.value == b.value,
        (Object::Str(a), Object::Str(b)) => a.value == b.value,
        (Object::Array(a), Object::Array(b)) => {
            a.value.len() == b.value.len()
                && a.value.iter().zip(&b.value).all(|(x, y)| literal_eq(x, y))
        }
        (Object::Dict(a), Object::Dict(b)) => {
            a.value.len() == b.value.len()
                && a.value
                    .iter()
                    .zip(&b.value)
                    .all(|((ka, va), (kb, vb))| ka == kb && literal_eq(va, vb))
        }
        _ => false,
    }
}

fn fold_call(obj: &Object) -> Result<Option<Object>> {
    let Object::FunctionCall(f) = obj else {
        return Ok(None);
    };
    if f.holder.is_some() || !f.name.starts_with("__") || !f.kw_args.is_empty() {
        return Ok(None);
    }

    let folded = match (f.name.as_str(), f.pos_args.as_slice()) {
        ("__neg", [Object::Number(n)]) => Some(Object::number(-n.value)),
        (name, [lhs, rhs]) => fold_binary(name, lhs, rhs)?,
        _ => None,
    };

    Ok(folded.map(|o| o.with_var(f.var.clone())))
}

fn fold_binary(name: &str, lhs: &Object, rhs: &Object) -> Result<Option<Object>> {
    let folded = match (name, lhs, rhs) {
        ("__add", Object::Number(a), Object::Number(b)) => Object::number(a.value + b.value),
        ("__add", Object::Str(a), Object::Str(b)) => {
            Object::string(format!("{}{}", a.value, b.value))
        }
        ("__sub", Object::Number(a), Object::Number(b)) => Object::number(a.value - b.value),
        ("__mul", Object::Number(a), Object::Number(b)) => Object::number(a.value * b.value),
        ("__div", Object::Number(a), Object::Number(b)) if b.value != 0 => {
            Object::number(a.value / b.value)
        }
        ("__mod", Object::Number(a), Object::Number(b)) if b.value != 0 => {
            Object::number(a.value % b.value)
        }

        ("__lt", Object::Number(a), Object::Number(b)) => Object::boolean(a.value < b.value),
        ("__le", Object::Number(a), Object::Number(b)) => Object::boolean(a.value <= b.value),
        ("__gt", Object::Number(a), Object::Number(b)) => Object::boolean(a.value > b.value),
        ("__ge", Object::Number(a), Object::Number(b)) => Object::boolean(a.value >= b.value),

        ("__eq", Object::Number(a), Object::Number(b)) => Object::boolean(a.value == b.value),
        ("__eq", Object::Str(a), Object::Str(b)) => Object::boolean(a.value == b.value),
        ("__eq", Object::Boolean(a), Object::Boolean(b)) => Object::boolean(a.value == b.value),
        ("__ne", Object::Number(a), Object::Number(b)) => Object::boolean(a.value != b.value),
        ("__ne", Object::Str(a), Object::Str(b)) => Object::boolean(a.value != b.value),
        ("__ne", Object::Boolean(a), Object::Boolean(b)) => Object::boolean(a.value != b.value),

        ("__and", Object::Boolean(a), Object::Boolean(b)) => Object::boolean(a.value && b.value),
        ("__or", Object::Boolean(a), Object::Boolean(b)) => Object::boolean(a.value || b.value),

        ("__in" | "__not_in", needle, Object::Array(haystack)) if needle.is_literal() => {
            if !haystack.value.iter().all(|e| e.is_literal()) {
                return Ok(None);
            }
            let found = haystack.value.iter().any(|e| literal_eq(needle, e));
            Object::boolean(if name == "__in" { found } else { !found })
        }

        ("__subscript", Object::Array(arr), Object::Number(idx)) => {
            let Ok(index) = usize::try_from(idx.value) else {
                return Err(CompileError::invalid_arguments(format!(
                    "array index {} out of range",
                    idx.value
                )));
            };
            let Some(element) = arr.value.get(index) else {
                return Err(CompileError::invalid_arguments(format!(
                    "array index {} out of range",
                    idx.value
                )));
            };
            element.clone()
        }
        ("__subscript", Object::Dict(dict), Object::Str(key)) => {
            let Some(value) = dict.value.get(&key.value) else {
                return Err(CompileError::invalid_arguments(format!(
                    "dict has no key '{}'",
                    key.value
                )));
            };
            value.clone()
        }

        _ => return Ok(None),
    };

    Ok(Some(folded))
}

impl Pass for FoldConstants {
    fn name(&self) -> &'static str {
        "fold_constants"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = instruction_walker(mir, &mut fold_call)?;

        progress |= instruction_filter_walker(
            mir,
            |o| matches!(o, Object::Array(_)),
            &mut |obj| array_walker(obj, &mut fold_call),
        )?;

        progress |= instruction_filter_walker(
            mir,
            |o| matches!(o, Object::FunctionCall(_)),
            &mut |obj| function_argument_walker(obj, &mut fold_call),
        )?;

        progress |= condition_walker(mir, &mut fold_call)?;

        Ok(progress)
    }
}

// ============================================================================
// constant_propagation
// ============================================================================

/// Replaces identifier reads with the value of a name whose single
/// definition in the same block is a literal
///
/// Propagation never crosses block boundaries.
pub struct ConstantPropagation;

impl Pass for ConstantPropagation {
    fn name(&self) -> &'static str {
        "constant_propagation"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = false;

        for block in &mut mir.blocks {
            let values = block_literal_bindings(block);
            if values.is_empty() {
                continue;
            }

            let mut cb = |obj: &Object| -> Result<Option<Object>> {
                let Object::Identifier(id) = obj else {
                    return Ok(None);
                };
                let Some(value) = values.get(&id.value) else {
                    return Ok(None);
                };
                Ok(Some(value.clone().with_var(id.var.clone())))
            };

            for obj in &mut block.instructions {
                if let Some(new) = cb(obj)? {
                    *obj = new;
                    progress = true;
                }
                progress |= array_walker(obj, &mut cb)?;
                progress |= function_argument_walker(obj, &mut cb)?;
                // Reads one level further down: arrays passed as arguments
                if let Object::FunctionCall(f) = obj {
                    for arg in f.pos_args.iter_mut().chain(f.kw_args.values_mut()) {
                        progress |= array_walker(arg, &mut cb)?;
                    }
                }
            }
            if let Terminator::Branch { condition, .. } = &mut block.terminator {
                if let Some(new) = cb(condition)? {
                    *condition = new;
                    progress = true;
                }
                progress |= array_walker(condition, &mut cb)?;
                progress |= function_argument_walker(condition, &mut cb)?;
            }
        }

        Ok(progress)
    }
}

/// Names with exactly one definition in the block, where that definition is
/// a literal
fn block_literal_bindings(block: &BasicBlock) -> HashMap<String, Object> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for inst in &block.instructions {
        let var = inst.var();
        if var.is_named() {
            *counts.entry(var.name.as_str()).or_insert(0) += 1;
        }
    }

    let mut values = HashMap::new();
    for inst in &block.instructions {
        let var = inst.var();
        if var.is_named() && inst.is_literal() && counts.get(var.name.as_str()) == Some(&1) {
            values.insert(var.name.clone(), inst.clone());
        }
    }
    values
}

// ============================================================================
// value_numbering
// ============================================================================

/// Assigns each named object a monotonically increasing version per name
/// within its block; first assignment is version 0
pub struct ValueNumbering;

impl Pass for ValueNumbering {
    fn name(&self) -> &'static str {
        "value_numbering"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = false;

        for block in &mut mir.blocks {
            let mut counters: HashMap<String, u32> = HashMap::new();
            for obj in &mut block.instructions {
                let var = obj.var_mut();
                if var.name.is_empty() {
                    continue;
                }
                let counter = counters.entry(var.name.clone()).or_insert(0);
                let version = *counter;
                *counter += 1;
                if var.version != version {
                    var.version = version;
                    progress = true;
                }
            }
        }

        Ok(progress)
    }
}

// ============================================================================
// lower_targets
// ============================================================================

/// Reduces `executable(name, sources...)` calls to executable targets once
/// their arguments are fully reduced strings
pub struct LowerTargets;

fn source_file(name: &str, state: &Persistent) -> File {
    File::new(name, "", false, &state.source_root, &state.build_root)
}

fn reduce_executable(state: &Persistent, obj: &Object) -> Result<Option<Object>> {
    let Object::FunctionCall(f) = obj else {
        return Ok(None);
    };
    if f.holder.is_some() || f.name != "executable" {
        return Ok(None);
    }
    if f.pos_args.len() < 2 {
        return Err(CompileError::invalid_arguments(
            "executable(): requires a name and at least one source",
        ));
    }

    let Object::Str(name) = &f.pos_args[0] else {
        // Not reduced yet
        return Ok(None);
    };

    let mut sources = Vec::new();
    for arg in &f.pos_args[1..] {
        match arg {
            Object::Str(s) => sources.push(source_file(&s.value, state)),
            Object::Array(arr) => {
                for element in &arr.value {
                    match element {
                        Object::Str(s) => sources.push(source_file(&s.value, state)),
                        // Unreduced or still nested; wait for other passes
                        Object::Array(_) | Object::Identifier(_) | Object::FunctionCall(_) => {
                            return Ok(None);
                        }
                        other => {
                            return Err(CompileError::invalid_arguments(format!(
                                "executable(): sources must be strings, got {}",
                                other
                            )));
                        }
                    }
                }
            }
            Object::Identifier(_) | Object::FunctionCall(_) => return Ok(None),
            other => {
                return Err(CompileError::invalid_arguments(format!(
                    "executable(): sources must be strings, got {}",
                    other
                )));
            }
        }
    }

    Ok(Some(Object::Executable(Executable {
        name: name.value.clone(),
        sources,
        machine: Machine::Host,
        var: f.var.clone(),
    })))
}

impl Pass for LowerTargets {
    fn name(&self) -> &'static str {
        "lower_targets"
    }

    fn run(&self, mir: &mut Mir, state: &Persistent) -> Result<bool> {
        instruction_walker(mir, &mut |o| reduce_executable(state, o))
    }
}

// ============================================================================
// branch_pruning
// ============================================================================

/// Replaces branches on boolean literals with a jump to the selected arm
/// and drops blocks that become unreachable
pub struct BranchPruning;

impl Pass for BranchPruning {
    fn name(&self) -> &'static str {
        "branch_pruning"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = false;

        for block in &mut mir.blocks {
            let target = match &block.terminator {
                Terminator::Branch {
                    condition: Object::Boolean(b),
                    then_label,
                    else_label,
                } => Some(if b.value {
                    then_label.clone()
                } else {
                    else_label.clone()
                }),
                _ => None,
            };
            if let Some(target) = target {
                block.terminator = Terminator::Goto(target);
                progress = true;
            }
        }

        if progress {
            remove_unreachable(mir);
        }
        Ok(progress)
    }
}

/// Drop every block not reachable from the entry block
fn remove_unreachable(mir: &mut Mir) {
    let mut reachable: HashSet<String> = HashSet::new();
    let mut worklist = Vec::new();
    if let Some(entry) = mir.blocks.first() {
        worklist.push(entry.label.clone());
    }

    while let Some(label) = worklist.pop() {
        if !reachable.insert(label.clone()) {
            continue;
        }
        if let Some(block) = mir.blocks.iter().find(|b| b.label == label) {
            match &block.terminator {
                Terminator::Goto(target) => worklist.push(target.clone()),
                Terminator::Branch {
                    then_label,
                    else_label,
                    ..
                } => {
                    worklist.push(then_label.clone());
                    worklist.push(else_label.clone());
                }
                Terminator::End => {}
            }
        }
    }

    mir.blocks.retain(|b| reachable.contains(&b.label));
}

// ============================================================================
// join_blocks
// ============================================================================

/// Splices a block into its predecessor when the jump between them is the
/// only edge either side has
pub struct JoinBlocks;

impl Pass for JoinBlocks {
    fn name(&self) -> &'static str {
        "join_blocks"
    }

    fn run(&self, mir: &mut Mir, _state: &Persistent) -> Result<bool> {
        let mut progress = false;

        loop {
            let mut preds: HashMap<String, usize> = HashMap::new();
            for block in &mir.blocks {
                match &block.terminator {
                    Terminator::Goto(label) => *preds.entry(label.clone()).or_insert(0) += 1,
                    Terminator::Branch {
                        then_label,
                        else_label,
                        ..
                    } => {
                        *preds.entry(then_label.clone()).or_insert(0) += 1;
                        *preds.entry(else_label.clone()).or_insert(0) += 1;
                    }
                    Terminator::End => {}
                }
            }

            let candidate = mir.blocks.iter().enumerate().find_map(|(i, block)| {
                let Terminator::Goto(label) = &block.terminator else {
                    return None;
                };
                if preds.get(label) != Some(&1) {
                    return None;
                }
                let target = mir.blocks.iter().position(|t| t.label == *label)?;
                Some((i, target))
            });
            let Some((index, target_index)) = candidate else {
                break;
            };

            let target = mir.blocks.remove(target_index);
            let index = if target_index < index { index - 1 } else { index };

            let block = &mut mir.blocks[index];
            block.instructions.extend(target.instructions);
            block.terminator = target.terminator;
            progress = true;
        }

        Ok(progress)
    }
}

// ============================================================================
// Module tests
// ============================================================================
