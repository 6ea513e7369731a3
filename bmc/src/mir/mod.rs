//! Middle Intermediate Representation (MIR)
//!
//! MIR is a CFG-based intermediate representation and the working IR of the
//! pass pipeline. Control flow is explicit: basic blocks end in a branch on
//! a condition object, a jump to a join block, or nothing. Instructions are
//! tagged values mutated in place by passes until only build targets remain
//! in the entry block.

mod lower;
pub mod optimize;

pub use lower::lower_hir;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{CompileError, Result};
use crate::machines::{self, Machine, MachineInfo, PerMachine};
use crate::toolchain::{self, Compiler as CompilerTool, Language, Toolchain};

// ============================================================================
// Objects
// ============================================================================

/// Variable annotation carried by every object
///
/// An empty name marks an unnamed temporary. Versions are assigned by the
/// value numbering pass, per name, within a block.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Variable {
    pub name: String,
    pub version: u32,
}

impl Variable {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 0,
        }
    }

    pub fn is_named(&self) -> bool {
        !self.name.is_empty()
    }
}

/// A MIR instruction value
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Number(Number),
    Boolean(Boolean),
    Str(Str),
    Array(Array),
    Dict(Dict),
    Identifier(Identifier),
    FunctionCall(FunctionCall),
    Compiler(Compiler),
    Executable(Executable),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Number {
    pub value: i64,
    pub var: Variable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Boolean {
    pub value: bool,
    pub var: Variable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Str {
    pub value: String,
    pub var: Variable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Array {
    pub value: Vec<Object>,
    pub var: Variable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dict {
    pub value: BTreeMap<String, Object>,
    pub var: Variable,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identifier {
    pub value: String,
    pub var: Variable,
}

/// An unresolved call
///
/// `holder` is the receiver name for method calls. Keyword arguments are a
/// map, so duplicate keys cannot be represented; positional order is kept.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionCall {
    pub holder: Option<String>,
    pub name: String,
    pub pos_args: Vec<Object>,
    pub kw_args: BTreeMap<String, Object>,
    pub var: Variable,
}

/// A resolved compiler, sharing the toolchain owned by the persistent state
#[derive(Clone)]
pub struct Compiler {
    pub toolchain: Arc<Toolchain>,
    pub for_machine: Machine,
    pub var: Variable,
}

impl Compiler {
    /// The compiler's identifier, as exposed to the DSL via `get_id()`
    pub fn get_id(&self, args: &[Object], kwargs: &BTreeMap<String, Object>) -> Result<Object> {
        if !args.is_empty() {
            return Err(CompileError::invalid_arguments(
                "compiler.get_id(): takes no positional arguments",
            ));
        }
        if !kwargs.is_empty() {
            return Err(CompileError::invalid_arguments(
                "compiler.get_id(): takes no keyword arguments",
            ));
        }
        Ok(Object::Str(Str {
            value: self.toolchain.compiler.id().to_string(),
            var: Variable::default(),
        }))
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("id", &self.toolchain.compiler.id())
            .field("language", &self.toolchain.compiler.language())
            .field("for_machine", &self.for_machine)
            .field("var", &self.var)
            .finish()
    }
}

impl PartialEq for Compiler {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.toolchain, &other.toolchain)
            && self.for_machine == other.for_machine
            && self.var == other.var
    }
}

/// An executable build target
#[derive(Debug, Clone, PartialEq)]
pub struct Executable {
    pub name: String,
    pub sources: Vec<File>,
    pub machine: Machine,
    pub var: Variable,
}

impl Object {
    pub fn number(value: i64) -> Self {
        Object::Number(Number {
            value,
            var: Variable::default(),
        })
    }

    pub fn boolean(value: bool) -> Self {
        Object::Boolean(Boolean {
            value,
            var: Variable::default(),
        })
    }

    pub fn string(value: impl Into<String>) -> Self {
        Object::Str(Str {
            value: value.into(),
            var: Variable::default(),
        })
    }

    pub fn identifier(value: impl Into<String>) -> Self {
        Object::Identifier(Identifier {
            value: value.into(),
            var: Variable::default(),
        })
    }

    pub fn array(value: Vec<Object>) -> Self {
        Object::Array(Array {
            value,
            var: Variable::default(),
        })
    }

    pub fn var(&self) -> &Variable {
        match self {
            Object::Number(o) => &o.var,
            Object::Boolean(o) => &o.var,
            Object::Str(o) => &o.var,
            Object::Array(o) => &o.var,
            Object::Dict(o) => &o.var,
            Object::Identifier(o) => &o.var,
            Object::FunctionCall(o) => &o.var,
            Object::Compiler(o) => &o.var,
            Object::Executable(o) => &o.var,
        }
    }

    pub fn var_mut(&mut self) -> &mut Variable {
        match self {
            Object::Number(o) => &mut o.var,
            Object::Boolean(o) => &mut o.var,
            Object::Str(o) => &mut o.var,
            Object::Array(o) => &mut o.var,
            Object::Dict(o) => &mut o.var,
            Object::Identifier(o) => &mut o.var,
            Object::FunctionCall(o) => &mut o.var,
            Object::Compiler(o) => &mut o.var,
            Object::Executable(o) => &mut o.var,
        }
    }

    /// Returns a clone with the variable annotation replaced
    pub fn with_var(mut self, var: Variable) -> Self {
        *self.var_mut() = var;
        self
    }

    /// True for reduced values that can bind to names and propagate
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Object::Number(_) | Object::Boolean(_) | Object::Str(_) | Object::Array(_) | Object::Dict(_)
        )
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Number(o) => write!(f, "{}", o.value),
            Object::Boolean(o) => write!(f, "{}", o.value),
            Object::Str(o) => write!(f, "'{}'", o.value),
            Object::Identifier(o) => write!(f, "{}", o.value),
            Object::Array(o) => {
                let inner = o
                    .value
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{}]", inner)
            }
            Object::Dict(o) => {
                let inner = o
                    .value
                    .iter()
                    .map(|(k, v)| format!("'{}' : {}", k, v))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{{{}}}", inner)
            }
            Object::FunctionCall(o) => {
                let mut parts: Vec<String> = o.pos_args.iter().map(|a| a.to_string()).collect();
                parts.extend(o.kw_args.iter().map(|(k, v)| format!("{} : {}", k, v)));
                match &o.holder {
                    Some(holder) => write!(f, "{}.{}({})", holder, o.name, parts.join(", ")),
                    None => write!(f, "{}({})", o.name, parts.join(", ")),
                }
            }
            Object::Compiler(o) => write!(
                f,
                "<{} compiler ({}) for {}>",
                o.toolchain.compiler.language().as_str(),
                o.toolchain.compiler.id(),
                o.for_machine.as_str()
            ),
            Object::Executable(o) => {
                let srcs = o
                    .sources
                    .iter()
                    .map(|s| s.get_name())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "executable('{}', [{}])", o.name, srcs)
            }
        }
    }
}

// ============================================================================
// Files
// ============================================================================

/// A source or built file that knows its place in both trees
#[derive(Debug, Clone, PartialEq)]
pub struct File {
    pub name: String,
    pub subdir: PathBuf,
    pub built: bool,
    pub source_root: PathBuf,
    pub build_root: PathBuf,
}

impl File {
    pub fn new(
        name: impl Into<String>,
        subdir: impl Into<PathBuf>,
        built: bool,
        source_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            subdir: subdir.into(),
            built,
            source_root: source_root.into(),
            build_root: build_root.into(),
        }
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Name of the file relative to its own root
    pub fn get_name(&self) -> String {
        self.in_subdir().display().to_string()
    }

    /// Path for this file relative to the source tree
    pub fn relative_to_source_dir(&self) -> PathBuf {
        if self.built {
            relative_path(&self.build_root, &self.source_root).join(self.in_subdir())
        } else {
            self.in_subdir()
        }
    }

    /// Path for this file relative to the build tree
    pub fn relative_to_build_dir(&self) -> PathBuf {
        if self.built {
            self.in_subdir()
        } else {
            relative_path(&self.source_root, &self.build_root).join(self.in_subdir())
        }
    }

    fn in_subdir(&self) -> PathBuf {
        if self.subdir.as_os_str().is_empty() {
            PathBuf::from(&self.name)
        } else {
            self.subdir.join(&self.name)
        }
    }
}

/// Lexical relative path from `base` to `target`
fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in common..base.len() {
        out.push("..");
    }
    for component in &target[common..] {
        out.push(component);
    }
    out
}

// ============================================================================
// Control flow graph
// ============================================================================

/// Block terminator
#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    /// Conditional branch; the condition is an object reduced by passes
    Branch {
        condition: Object,
        then_label: String,
        else_label: String,
    },
    /// Unconditional jump to the join block
    Goto(String),
    /// End of the program
    End,
}

/// A basic block: straight-line instructions plus a terminator
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Object>,
    pub terminator: Terminator,
}

/// The MIR program: a flat arena of blocks, entry first
///
/// Acyclic by construction; the DSL has no loops.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mir {
    pub blocks: Vec<BasicBlock>,
}

impl Mir {
    pub fn entry(&self) -> &BasicBlock {
        &self.blocks[0]
    }

    pub fn entry_mut(&mut self) -> &mut BasicBlock {
        &mut self.blocks[0]
    }

    pub fn block(&self, label: &str) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }
}

impl fmt::Display for Mir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in &self.blocks {
            writeln!(f, "{}:", block.label)?;
            for inst in &block.instructions {
                let var = inst.var();
                if var.is_named() {
                    writeln!(f, "  {}.{} = {}", var.name, var.version, inst)?;
                } else {
                    writeln!(f, "  {}", inst)?;
                }
            }
            match &block.terminator {
                Terminator::Branch {
                    condition,
                    then_label,
                    else_label,
                } => writeln!(f, "  branch {} ? {} : {}", condition, then_label, else_label)?,
                Terminator::Goto(label) => writeln!(f, "  goto {}", label)?,
                Terminator::End => {}
            }
        }
        Ok(())
    }
}

// ============================================================================
// Persistent state
// ============================================================================

/// State constructed once per compilation and shared read-only by every
/// pass and the backend
pub struct Persistent {
    pub name: String,
    pub source_root: PathBuf,
    pub build_root: PathBuf,
    pub toolchains: HashMap<Language, PerMachine<Arc<Toolchain>>>,
    pub machines: PerMachine<MachineInfo>,
}

impl Persistent {
    pub fn new(
        name: impl Into<String>,
        source_root: impl Into<PathBuf>,
        build_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source_root: source_root.into(),
            build_root: build_root.into(),
            toolchains: HashMap::new(),
            machines: PerMachine::new(machines::detect_build()),
        }
    }

    /// Detect and register the build-machine toolchain for a language
    pub fn register_toolchain(&mut self, language: Language) {
        self.toolchains.entry(language).or_insert_with(|| {
            PerMachine::new(Arc::new(toolchain::detect_toolchain(
                language,
                Machine::Build,
            )))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variable_annotations() {
        let mut obj = Object::number(5);
        assert!(!obj.var().is_named());
        obj.var_mut().name = "x".to_string();
        assert!(obj.var().is_named());
        assert_eq!(obj.var().version, 0);
    }

    #[test]
    fn test_object_display() {
        assert_eq!(Object::number(8).to_string(), "8");
        assert_eq!(Object::string("s").to_string(), "'s'");
        let arr = Object::array(vec![Object::number(1), Object::string("b")]);
        assert_eq!(arr.to_string(), "[1, 'b']");

        let call = Object::FunctionCall(FunctionCall {
            holder: Some("meson".into()),
            name: "get_compiler".into(),
            pos_args: vec![Object::string("cpp")],
            ..Default::default()
        });
        assert_eq!(call.to_string(), "meson.get_compiler('cpp')");
    }

    #[test]
    fn test_file_paths_shared_root() {
        let f = File::new("a.cpp", "", false, ".", ".");
        assert_eq!(f.get_name(), "a.cpp");
        assert_eq!(f.relative_to_build_dir(), PathBuf::from("a.cpp"));
        assert_eq!(f.relative_to_source_dir(), PathBuf::from("a.cpp"));
    }

    #[test]
    fn test_file_paths_build_subdir() {
        let f = File::new("a.cpp", "sub", false, "/proj", "/proj/build");
        assert_eq!(f.get_name(), "sub/a.cpp");
        assert_eq!(f.relative_to_build_dir(), PathBuf::from("../sub/a.cpp"));

        let built = File::new("a.o", "", true, "/proj", "/proj/build");
        assert_eq!(built.relative_to_build_dir(), PathBuf::from("a.o"));
        assert_eq!(built.relative_to_source_dir(), PathBuf::from("build/a.o"));
    }

    #[test]
    fn test_persistent_registers_toolchains() {
        let mut state = Persistent::new("proj", ".", "build");
        assert!(state.toolchains.is_empty());
        state.register_toolchain(Language::Cpp);
        state.register_toolchain(Language::Cpp);
        assert_eq!(state.toolchains.len(), 1);
    }
}
