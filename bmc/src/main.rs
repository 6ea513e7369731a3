//! BMC Compiler CLI

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

use bmc::build::{configure, BuildConfig};
use bmc::error::report_error;
use bmc::{hir, mir, CompileError};

#[derive(Parser)]
#[command(name = "bmc", version, about = "bmc - build manifest compiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Configure a build directory from a build description
    Setup {
        /// Build description file
        file: PathBuf,
        /// Build directory to write the manifest into
        build_dir: PathBuf,
        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
    /// Parse and dump the AST (debug)
    Parse {
        /// Build description file
        file: PathBuf,
        /// Output format: text (canonical rendering) or json
        #[arg(long, short, default_value = "text")]
        format: String,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Build description file
        file: PathBuf,
    },
    /// Lower to MIR, run the pass pipeline, and print the result (debug)
    Lower {
        /// Build description file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Setup {
            file,
            build_dir,
            verbose,
        } => setup_file(&file, build_dir, verbose),
        Command::Parse { file, format } => parse_file(&file, &format),
        Command::Tokens { file } => tokenize_file(&file),
        Command::Lower { file } => lower_file(&file),
    };

    if let Err(err) = result {
        eprintln!("bmc: error: {err}");
        std::process::exit(err.exit_code());
    }
}

/// Print an ariadne report for errors that carry a source position
fn report(file: &Path, err: CompileError) -> CompileError {
    if err.span().is_some()
        && let Ok(source) = fs::read_to_string(file)
    {
        report_error(&file.display().to_string(), &source, &err);
    }
    err
}

fn setup_file(file: &Path, build_dir: PathBuf, verbose: bool) -> Result<(), CompileError> {
    let config = BuildConfig::new(file.to_path_buf(), build_dir).verbose(verbose);
    configure(&config).map_err(|e| report(file, e))
}

fn parse_file(file: &Path, format: &str) -> Result<(), CompileError> {
    let source = fs::read_to_string(file)?;
    let tokens = bmc::lexer::tokenize(&source).map_err(|e| report(file, e))?;
    let ast = bmc::parser::parse(&source, tokens).map_err(|e| report(file, e))?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&ast)
                .map_err(|e| CompileError::Io {
                    message: e.to_string(),
                })?;
            println!("{json}");
        }
        _ => println!("{}", ast.as_string()),
    }
    Ok(())
}

fn tokenize_file(file: &Path) -> Result<(), CompileError> {
    let source = fs::read_to_string(file)?;
    let tokens = bmc::lexer::tokenize(&source).map_err(|e| report(file, e))?;
    for (token, span) in tokens {
        let (line, column) = span.line_col(&source);
        println!("{line}:{column}\t{token}");
    }
    Ok(())
}

fn lower_file(file: &Path) -> Result<(), CompileError> {
    let source = fs::read_to_string(file)?;
    let tokens = bmc::lexer::tokenize(&source).map_err(|e| report(file, e))?;
    let ast = bmc::parser::parse(&source, tokens).map_err(|e| report(file, e))?;
    let ir = hir::lower_ast(&ast)?;
    let mut mir = mir::lower_hir(ir)?;

    let source_root = file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut state = mir::Persistent::new("debug", source_root, PathBuf::from("build"));
    state.register_toolchain(bmc::toolchain::Language::Cpp);

    mir::optimize::Pipeline::new().run(&mut mir, &state)?;
    print!("{mir}");
    Ok(())
}
