//! Build Pipeline
//!
//! This module orchestrates the full compilation pipeline:
//! DSL source → AST → HIR → MIR → pass fixed point → manifest emission.
//!
//! The `project()` header is processed here, before the fixed point,
//! because it mutates the persistent state and the state is shared
//! read-only once passes run. Diagnostics (`message`, `warning`, `error`)
//! are drained here after the fixed point; printing from inside the
//! fixed-point loop would repeat output once per round.

use std::fs;
use std::path::PathBuf;

use crate::backend::{Backend, NinjaBackend};
use crate::error::{CompileError, Result};
use crate::hir;
use crate::lexer::tokenize;
use crate::mir::{self, Mir, Object, Persistent};
use crate::parser::parse;
use crate::toolchain::Language;

/// Build configuration
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Input build description file
    pub source: PathBuf,
    /// Build directory the manifest is written into
    pub build_dir: PathBuf,
    /// Verbose output
    pub verbose: bool,
}

impl BuildConfig {
    pub fn new(source: PathBuf, build_dir: PathBuf) -> Self {
        Self {
            source,
            build_dir,
            verbose: false,
        }
    }

    /// Set verbose mode
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

/// Run the whole pipeline and write the manifest
pub fn configure(config: &BuildConfig) -> Result<()> {
    let source_text = fs::read_to_string(&config.source)?;

    let tokens = tokenize(&source_text)?;
    let ast = parse(&source_text, tokens)?;
    let ir = hir::lower_ast(&ast)?;
    let mut mir = mir::lower_hir(ir)?;

    let mut state = new_state(config);
    extract_project(&mut mir, &mut state)?;
    if state.toolchains.is_empty() {
        state.register_toolchain(Language::Cpp);
    }
    if config.verbose {
        println!("Project name: {}", state.name);
    }

    let stats = mir::optimize::Pipeline::new().run(&mut mir, &state)?;
    if config.verbose {
        println!("Fixed point reached after {} rounds", stats.rounds);
    }

    drain_diagnostics(&mut mir)?;

    let backend = NinjaBackend;
    backend.generate(&mir, &state)?;
    if config.verbose {
        println!(
            "Wrote {}",
            state.build_root.join("build.ninja").display()
        );
    }

    Ok(())
}

fn new_state(config: &BuildConfig) -> Persistent {
    let source_root = config
        .source
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let fallback_name = config
        .source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());
    Persistent::new(fallback_name, source_root, config.build_dir.clone())
}

/// Process a leading `project(name, languages...)` call
///
/// Sets the project name, registers one toolchain per listed language, and
/// removes the call from the IR.
fn extract_project(mir: &mut Mir, state: &mut Persistent) -> Result<()> {
    let entry = mir.entry_mut();
    let is_project = matches!(
        entry.instructions.first(),
        Some(Object::FunctionCall(f)) if f.holder.is_none() && f.name == "project"
    );
    if !is_project {
        return Ok(());
    }

    let Object::FunctionCall(call) = entry.instructions.remove(0) else {
        return Ok(());
    };

    let mut args = call.pos_args.iter();
    let Some(Object::Str(name)) = args.next() else {
        return Err(CompileError::invalid_arguments(
            "project(): first argument must be the project name string",
        ));
    };
    state.name = name.value.clone();

    for arg in args {
        let Object::Str(language) = arg else {
            return Err(CompileError::invalid_arguments(
                "project(): language arguments must be strings",
            ));
        };
        state.register_toolchain(Language::from_string(&language.value)?);
    }

    Ok(())
}

/// Print `message`/`warning` diagnostics and fail on `error`
fn drain_diagnostics(mir: &mut Mir) -> Result<()> {
    let entry = mir.entry_mut();
    let mut kept = Vec::with_capacity(entry.instructions.len());

    for instruction in entry.instructions.drain(..) {
        if let Object::FunctionCall(f) = &instruction
            && f.holder.is_none()
            && matches!(f.name.as_str(), "message" | "warning" | "error")
        {
            let text = f
                .pos_args
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            match f.name.as_str() {
                "message" => println!("Message: {}", text),
                "warning" => eprintln!("Warning: {}", text),
                _ => return Err(CompileError::user(format!("Error: {}", text))),
            }
            continue;
        }
        kept.push(instruction);
    }

    entry.instructions = kept;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mir::{BasicBlock, FunctionCall, Terminator};

    fn write_source(dir: &std::path::Path, content: &str) -> PathBuf {
        let path = dir.join("build.bmc");
        fs::write(&path, content).expect("write source");
        path
    }

    #[test]
    fn test_configure_end_to_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = write_source(
            dir.path(),
            "project('demo', 'cpp')\nexecutable('demo', ['a.cpp'])\n",
        );
        let build_dir = dir.path().join("build");

        let config = BuildConfig::new(source, build_dir.clone());
        configure(&config).expect("configure");

        let manifest = fs::read_to_string(build_dir.join("build.ninja")).expect("manifest");
        assert!(manifest.contains("# This is a build file for the project \"demo\"."));
        assert!(manifest.contains("rule cpp_compiler_for_build"));
        assert!(manifest.contains("build a.cpp.o: cpp_compiler_for_build ../a.cpp"));
        assert!(manifest.contains("build demo: cpp_linker_for_build a.cpp.o"));
    }

    #[test]
    fn test_configure_without_project_header() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = write_source(dir.path(), "executable('p', ['a.cpp'])\n");
        let build_dir = dir.path().join("build");

        configure(&BuildConfig::new(source, build_dir.clone())).expect("configure");

        let manifest = fs::read_to_string(build_dir.join("build.ninja")).expect("manifest");
        // Falls back to the file stem and an implicit cpp toolchain
        assert!(manifest.contains("project \"build\""));
        assert!(manifest.contains("rule cpp_compiler_for_build"));
    }

    #[test]
    fn test_error_call_aborts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = write_source(dir.path(), "error('nope')\n");

        let err = configure(&BuildConfig::new(source, dir.path().join("build"))).unwrap_err();
        assert!(matches!(err, CompileError::User { .. }));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BuildConfig::new(dir.path().join("nope.bmc"), dir.path().join("build"));
        let err = configure(&config).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn test_extract_project_registers_languages() {
        let mut mir = Mir {
            blocks: vec![BasicBlock {
                label: "entry".into(),
                instructions: vec![Object::FunctionCall(FunctionCall {
                    holder: None,
                    name: "project".into(),
                    pos_args: vec![Object::string("demo"), Object::string("cpp"), Object::string("c")],
                    ..Default::default()
                })],
                terminator: Terminator::End,
            }],
        };
        let mut state = Persistent::new("fallback", ".", "build");

        extract_project(&mut mir, &mut state).expect("extract");
        assert_eq!(state.name, "demo");
        assert!(state.toolchains.contains_key(&Language::Cpp));
        assert!(state.toolchains.contains_key(&Language::C));
        assert!(mir.entry().instructions.is_empty());
    }

    #[test]
    fn test_drain_diagnostics_removes_messages() {
        let mut mir = Mir {
            blocks: vec![BasicBlock {
                label: "entry".into(),
                instructions: vec![
                    Object::FunctionCall(FunctionCall {
                        holder: None,
                        name: "message".into(),
                        pos_args: vec![Object::string("hello")],
                        ..Default::default()
                    }),
                    Object::number(1),
                ],
                terminator: Terminator::End,
            }],
        };

        drain_diagnostics(&mut mir).expect("drain");
        assert_eq!(mir.entry().instructions.len(), 1);
        assert!(matches!(&mir.entry().instructions[0], Object::Number(_)));
    }
}
