//! Ninja backend
//!
//! Writes `build.ninja` into the build root: one compile and one link rule
//! per (language, machine) pair, a compile edge per source, a link edge per
//! target, and the phony sentinel. Records are emitted in deterministic
//! order: rules grouped by language then role, targets in IR order.

use std::fs;
use std::io::{BufWriter, Write};
use std::sync::Arc;

use super::Backend;
use crate::error::{CompileError, Result};
use crate::machines::Machine;
use crate::mir::{Executable, Mir, Object, Persistent};
use crate::toolchain::{Compiler as _, Language, Linker as _, Toolchain};

pub struct NinjaBackend;

impl Backend for NinjaBackend {
    fn name(&self) -> &'static str {
        "ninja"
    }

    fn generate(&self, mir: &Mir, state: &Persistent) -> Result<()> {
        fs::create_dir_all(&state.build_root)?;

        let path = state.build_root.join("build.ninja");
        let file = fs::File::create(&path)?;
        let mut out = BufWriter::new(file);

        write_header(&mut out, state)?;
        write_rules(&mut out, state)?;
        write_phony(&mut out)?;
        write_targets(&mut out, mir, state)?;

        out.flush()?;
        Ok(())
    }
}

/// Escape path tokens for ninja; spaces get a `$` prefix
fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch == ' ' {
            escaped.push('$');
        }
        escaped.push(ch);
    }
    escaped
}

/// Languages in deterministic order
fn sorted_languages(state: &Persistent) -> Vec<Language> {
    let mut languages: Vec<_> = state.toolchains.keys().copied().collect();
    languages.sort();
    languages
}

fn write_header(out: &mut impl Write, state: &Persistent) -> Result<()> {
    writeln!(
        out,
        "# This is a build file for the project \"{}\".",
        state.name
    )?;
    writeln!(out, "# It is autogenerated by the bmc build system.")?;
    writeln!(out, "# Do not edit by hand.")?;
    writeln!(out)?;
    writeln!(out, "ninja_required_version = 1.8.2")?;
    writeln!(out)?;
    Ok(())
}

fn write_rules(out: &mut impl Write, state: &Persistent) -> Result<()> {
    writeln!(out, "# Compilation rules")?;
    writeln!(out)?;
    for language in sorted_languages(state) {
        for (machine, toolchain) in state.toolchains[&language].explicit() {
            write_compiler_rule(out, language, machine, toolchain)?;
        }
    }

    writeln!(out, "# Linking rules")?;
    writeln!(out)?;
    for language in sorted_languages(state) {
        for (machine, toolchain) in state.toolchains[&language].explicit() {
            write_linker_rule(out, language, machine, toolchain)?;
        }
    }
    Ok(())
}

fn write_compiler_rule(
    out: &mut impl Write,
    language: Language,
    machine: Machine,
    toolchain: &Arc<Toolchain>,
) -> Result<()> {
    let compiler = &toolchain.compiler;
    writeln!(
        out,
        "rule {}_compiler_for_{}",
        language.as_str(),
        machine.as_str()
    )?;

    write!(out, "  command =")?;
    for token in compiler.command() {
        write!(out, " {}", token)?;
    }
    write!(out, " ${{ARGS}}")?;
    for token in compiler.output_command("${out}") {
        write!(out, " {}", token)?;
    }
    for token in compiler.compile_only_command() {
        write!(out, " {}", token)?;
    }
    writeln!(out, " ${{in}}")?;

    writeln!(
        out,
        "  description = Compiling {} object ${{out}}",
        language.as_str()
    )?;
    writeln!(out)?;
    Ok(())
}

fn write_linker_rule(
    out: &mut impl Write,
    language: Language,
    machine: Machine,
    toolchain: &Arc<Toolchain>,
) -> Result<()> {
    let linker = &toolchain.linker;
    writeln!(
        out,
        "rule {}_linker_for_{}",
        language.as_str(),
        machine.as_str()
    )?;

    write!(out, "  command =")?;
    for token in linker.command() {
        write!(out, " {}", token)?;
    }
    write!(out, " ${{ARGS}}")?;
    for token in linker.output_command("${out}") {
        write!(out, " {}", token)?;
    }
    writeln!(out, " ${{in}} ${{LINK_ARGS}}")?;

    writeln!(out, "  description = Linking target ${{out}}")?;
    writeln!(out)?;
    Ok(())
}

fn write_phony(out: &mut impl Write) -> Result<()> {
    writeln!(out, "# Phony build target, always out of date")?;
    writeln!(out)?;
    writeln!(out, "build PHONY: phony")?;
    writeln!(out)?;
    Ok(())
}

fn write_targets(out: &mut impl Write, mir: &Mir, state: &Persistent) -> Result<()> {
    writeln!(out, "# Build rules for targets")?;
    writeln!(out)?;

    for instruction in &mir.entry().instructions {
        match instruction {
            Object::Executable(e) => write_executable(out, e, state)?,
            // Leftover bindings of reduced values are inert
            Object::Number(_)
            | Object::Boolean(_)
            | Object::Str(_)
            | Object::Array(_)
            | Object::Dict(_)
            | Object::Compiler(_) => {}
            unreduced => {
                return Err(CompileError::unreduced(unreduced.to_string()));
            }
        }
    }
    Ok(())
}

fn write_executable(out: &mut impl Write, exe: &Executable, state: &Persistent) -> Result<()> {
    let mut objects = Vec::new();
    let mut link_language = Language::C;

    for source in &exe.sources {
        let Some(language) = Language::from_source_name(&source.name) else {
            return Err(CompileError::unknown_language(source.get_name()));
        };
        // C++ sources force a C++ link step
        if language == Language::Cpp {
            link_language = Language::Cpp;
        }
        let machine = rule_machine(state, language, exe.machine)?;

        let object = format!("{}.o", escape(&source.get_name()));
        writeln!(
            out,
            "build {}: {}_compiler_for_{} {}",
            object,
            language.as_str(),
            machine.as_str(),
            escape(&source.relative_to_build_dir().display().to_string())
        )?;
        writeln!(out, "  ARGS =")?;
        writeln!(out)?;
        objects.push(object);
    }

    let machine = rule_machine(state, link_language, exe.machine)?;
    write!(
        out,
        "build {}: {}_linker_for_{}",
        escape(&exe.name),
        link_language.as_str(),
        machine.as_str()
    )?;
    for object in &objects {
        write!(out, " {}", object)?;
    }
    writeln!(out)?;
    writeln!(out, "  LINK_ARGS =")?;
    writeln!(out)?;
    Ok(())
}

/// The machine slot whose rule serves `machine`, following the fallback
/// chain of the language's registered toolchains
fn rule_machine(state: &Persistent, language: Language, machine: Machine) -> Result<Machine> {
    let Some(toolchains) = state.toolchains.get(&language) else {
        return Err(CompileError::unknown_language(language.as_str()));
    };
    Ok(toolchains.resolve(machine))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machines::{Endian, Kernel, MachineInfo, PerMachine};
    use crate::mir::{BasicBlock, File, Terminator, Variable};

    fn test_state(build_root: &std::path::Path) -> Persistent {
        let mut state = Persistent::new("p", build_root, build_root);
        state.machines = PerMachine::new(MachineInfo::new(
            Machine::Build,
            Kernel::Linux,
            Endian::Little,
            "x86_64",
        ));
        state.register_toolchain(Language::Cpp);
        state
    }

    fn executable_mir(state: &Persistent, sources: &[&str]) -> Mir {
        let files = sources
            .iter()
            .map(|name| File::new(*name, "", false, &state.source_root, &state.build_root))
            .collect();
        Mir {
            blocks: vec![BasicBlock {
                label: "entry".into(),
                instructions: vec![Object::Executable(Executable {
                    name: "p".into(),
                    sources: files,
                    machine: Machine::Host,
                    var: Variable::default(),
                })],
                terminator: Terminator::End,
            }],
        }
    }

    #[test]
    fn test_escape_spaces() {
        assert_eq!(escape("a b.cpp"), "a$ b.cpp");
        assert_eq!(escape("plain.cpp"), "plain.cpp");
    }

    #[test]
    fn test_minimal_emission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path());
        let mir = executable_mir(&state, &["a.cpp"]);

        NinjaBackend.generate(&mir, &state).expect("generate");

        let manifest =
            fs::read_to_string(dir.path().join("build.ninja")).expect("manifest written");
        assert!(manifest.contains("rule cpp_compiler_for_build"));
        assert!(manifest.contains("rule cpp_linker_for_build"));
        assert!(manifest.contains("build a.cpp.o: cpp_compiler_for_build a.cpp"));
        assert!(manifest.contains("build p: cpp_linker_for_build a.cpp.o"));
        assert!(manifest.contains("build PHONY: phony"));
        assert!(manifest.contains("ninja_required_version = 1.8.2"));
    }

    #[test]
    fn test_host_falls_back_to_build_rules() {
        // The target asks for HOST, only a build toolchain exists; edges
        // must reference the build rules
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path());
        let mir = executable_mir(&state, &["a.cpp", "b.cpp"]);

        NinjaBackend.generate(&mir, &state).expect("generate");

        let manifest = fs::read_to_string(dir.path().join("build.ninja")).expect("manifest");
        assert!(!manifest.contains("_for_host"));
        assert!(manifest.contains("build p: cpp_linker_for_build a.cpp.o b.cpp.o"));
    }

    #[test]
    fn test_unreduced_instruction_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path());
        let mir = Mir {
            blocks: vec![BasicBlock {
                label: "entry".into(),
                instructions: vec![Object::FunctionCall(crate::mir::FunctionCall {
                    holder: None,
                    name: "mystery".into(),
                    ..Default::default()
                })],
                terminator: Terminator::End,
            }],
        };

        let err = NinjaBackend.generate(&mir, &state).unwrap_err();
        match err {
            CompileError::UnreducedIr { instruction } => {
                assert_eq!(instruction, "mystery()");
            }
            other => panic!("expected UnreducedIr, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_source_language_is_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path());
        let mir = executable_mir(&state, &["a.rs"]);

        let err = NinjaBackend.generate(&mir, &state).unwrap_err();
        assert!(matches!(err, CompileError::UnknownLanguage { .. }));
    }

    #[test]
    fn test_existing_build_dir_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = test_state(dir.path());
        let mir = executable_mir(&state, &["a.cpp"]);

        NinjaBackend.generate(&mir, &state).expect("first");
        NinjaBackend.generate(&mir, &state).expect("second");
    }
}
