//! Compiler, linker, and archiver toolchains
//!
//! A toolchain is the (compiler, linker, archiver) triple for one language
//! and one machine. The tools are trait objects so per-vendor behavior stays
//! behind a uniform interface; detection never spawns processes, it only
//! consults conventional environment overrides.

use std::env;

use crate::error::{CompileError, Result};
use crate::machines::Machine;

/// Languages the toolchain registry knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Language {
    C,
    Cpp,
}

impl Language {
    pub fn from_string(s: &str) -> Result<Language> {
        match s {
            "c" => Ok(Language::C),
            "cpp" | "c++" => Ok(Language::Cpp),
            _ => Err(CompileError::unknown_language(s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
        }
    }

    /// Language of a source file, by extension
    pub fn from_source_name(name: &str) -> Option<Language> {
        let ext = name.rsplit_once('.').map(|(_, e)| e)?;
        match ext {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "C" => Some(Language::Cpp),
            _ => None,
        }
    }
}

/// Whether a tool supports response files, and which dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RspSupport {
    None,
    Gcc,
    Msvc,
}

/// Abstract interface for compilers
pub trait Compiler {
    /// Program and leading argv tokens
    fn command(&self) -> &[String];

    /// Short identifier, e.g. "gcc"
    fn id(&self) -> &'static str;

    fn language(&self) -> Language;

    fn rsp_support(&self) -> RspSupport;

    /// Arguments that direct output to `out`
    fn output_command(&self, out: &str) -> Vec<String>;

    /// Arguments for compiling without linking
    fn compile_only_command(&self) -> Vec<String>;
}

/// Abstract interface for dynamic linkers
pub trait Linker {
    fn command(&self) -> &[String];

    fn output_command(&self, out: &str) -> Vec<String>;
}

/// Abstract interface for static archivers
pub trait Archiver {
    fn command(&self) -> &[String];

    fn rsp_support(&self) -> RspSupport;
}

/// A gcc/clang style compiler
pub struct GnuCompiler {
    command: Vec<String>,
    language: Language,
}

impl GnuCompiler {
    pub fn new(command: Vec<String>, language: Language) -> Self {
        Self { command, language }
    }
}

impl Compiler for GnuCompiler {
    fn command(&self) -> &[String] {
        &self.command
    }

    fn id(&self) -> &'static str {
        "gcc"
    }

    fn language(&self) -> Language {
        self.language
    }

    fn rsp_support(&self) -> RspSupport {
        RspSupport::Gcc
    }

    fn output_command(&self, out: &str) -> Vec<String> {
        vec!["-o".to_string(), out.to_string()]
    }

    fn compile_only_command(&self) -> Vec<String> {
        vec!["-c".to_string()]
    }
}

/// A gcc/clang style linker driver
pub struct GnuLinker {
    command: Vec<String>,
}

impl GnuLinker {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Linker for GnuLinker {
    fn command(&self) -> &[String] {
        &self.command
    }

    fn output_command(&self, out: &str) -> Vec<String> {
        vec!["-o".to_string(), out.to_string()]
    }
}

/// The GNU ar archiver
pub struct GnuArchiver {
    command: Vec<String>,
}

impl GnuArchiver {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl Archiver for GnuArchiver {
    fn command(&self) -> &[String] {
        &self.command
    }

    fn rsp_support(&self) -> RspSupport {
        RspSupport::Gcc
    }
}

/// The (compiler, linker, archiver) triple for one language and machine
pub struct Toolchain {
    pub compiler: Box<dyn Compiler>,
    pub linker: Box<dyn Linker>,
    pub archiver: Box<dyn Archiver>,
}

impl Toolchain {
    pub fn new(
        compiler: Box<dyn Compiler>,
        linker: Box<dyn Linker>,
        archiver: Box<dyn Archiver>,
    ) -> Self {
        Self {
            compiler,
            linker,
            archiver,
        }
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain")
            .field("language", &self.compiler.language())
            .field("compiler", &self.compiler.id())
            .finish()
    }
}

/// Build the default toolchain for a language and machine
///
/// Honors the conventional CC/CXX/AR environment overrides; the machine
/// argument is reserved for per-machine override variables.
pub fn detect_toolchain(language: Language, machine: Machine) -> Toolchain {
    let _ = machine;
    let cc = match language {
        Language::C => env::var("CC").unwrap_or_else(|_| "cc".to_string()),
        Language::Cpp => env::var("CXX").unwrap_or_else(|_| "c++".to_string()),
    };
    let ar = env::var("AR").unwrap_or_else(|_| "ar".to_string());

    Toolchain::new(
        Box::new(GnuCompiler::new(vec![cc.clone()], language)),
        Box::new(GnuLinker::new(vec![cc])),
        Box::new(GnuArchiver::new(vec![ar])),
    )
}
