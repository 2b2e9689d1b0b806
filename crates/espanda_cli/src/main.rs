//! espanda: command-line front end.
//!
//! Usage:
//!   espanda [OPTIONS] <FILE>...
//!
//! Parses, checks and compiles the given files (plus the ones listed in a
//! project file), reports diagnostics with source snippets and prints or
//! writes the requested dumps.
//!
//! Exit codes: 0 on success, 1 for usage and IO errors, 2 when any file
//! has error diagnostics or fails code generation.

mod report;
mod tracing_config;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser as ClapParser;
use espanda_compiler::{CompilationResult, Program};
use espanda_options::{read_project_config, CompilerOptions};
use miette::{Context, IntoDiagnostic};
use serde_json::json;

use crate::report::SourceDiagnostic;

#[derive(ClapParser, Debug)]
#[command(name = "espanda", version, about = "espanda - TypeScript to panda bytecode front end")]
struct Cli {
    /// TypeScript files to compile.
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Project file with `compilerOptions` and `files`.
    #[arg(short = 'p', long = "project", value_name = "PATH")]
    project: Option<PathBuf>,

    /// Print each file's AST as JSON.
    #[arg(long)]
    dump_ast: bool,

    /// Print each file's bytecode disassembly.
    #[arg(long)]
    dump_bytecode: bool,

    /// Write the compiled programs as JSON to PATH.
    #[arg(long, value_name = "PATH")]
    emit_json: Option<PathBuf>,

    /// Skip type checking.
    #[arg(long)]
    no_check: bool,

    /// Enable all strict type-checking options.
    #[arg(long)]
    strict: bool,

    /// Do not generate code for files with errors, even if the project
    /// file enables `emitOnError`.
    #[arg(long)]
    no_emit_on_error: bool,

    /// Prefix for literal buffer ids.
    #[arg(long, value_name = "NAME")]
    record_name: Option<String>,

    /// Record the checked types of top-level bindings in the output.
    #[arg(long)]
    type_extractor: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            // --help and --version are not failures
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    tracing_config::init_tracing();

    match run(&cli) {
        Ok(code) => code,
        Err(report) => {
            eprintln!("{report:?}");
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> miette::Result<ExitCode> {
    let start = Instant::now();
    let (files, options) = resolve_inputs(cli)?;
    if files.is_empty() {
        miette::bail!("no input files");
    }

    let mut program = Program::new(files, options);
    program.type_check = !cli.no_check;
    program.load_root_files().into_diagnostic()?;

    let result = program.compile();
    report_errors(&program, &result);

    if cli.dump_ast {
        for file in &result.files {
            if let Some(dump) = &file.ast_dump {
                let text = serde_json::to_string_pretty(dump).into_diagnostic()?;
                println!("{text}");
            }
        }
    }
    if cli.dump_bytecode {
        for file in &result.files {
            if let Some(bytecode) = &file.bytecode {
                print!("{bytecode}");
            }
        }
    }
    if let Some(path) = &cli.emit_json {
        write_json(path, &result)?;
    }

    tracing::debug!(elapsed_ms = start.elapsed().as_millis() as u64, "done");
    if result.has_errors() {
        let count = result.error_count();
        eprintln!("\nFound {count} error{}.", if count == 1 { "" } else { "s" });
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

/// Root files and options from the project file (if any) and the command
/// line. Command-line flags override the project file.
fn resolve_inputs(cli: &Cli) -> miette::Result<(Vec<PathBuf>, CompilerOptions)> {
    let mut files = Vec::new();
    let mut options = CompilerOptions::default();
    if let Some(project) = &cli.project {
        let config = read_project_config(project).into_diagnostic()?;
        let base = project.parent().unwrap_or_else(|| Path::new("."));
        files.extend(config.resolved_files(base));
        options = config.compiler_options;
    }
    files.extend(cli.files.iter().cloned());

    let mut overrides = CompilerOptions::default();
    if cli.strict {
        overrides.set_strict();
    }
    if cli.dump_ast {
        overrides.dump_ast = Some(true);
    }
    if cli.no_emit_on_error {
        overrides.emit_on_error = Some(false);
    }
    if cli.type_extractor {
        overrides.type_extractor = Some(true);
    }
    overrides.record_name.clone_from(&cli.record_name);
    options.merge(&overrides);
    Ok((files, options))
}

fn report_errors(program: &Program, result: &CompilationResult) {
    for file in &result.files {
        let text: Option<Arc<str>> = program
            .source(&file.file_name)
            .map(|source| Arc::from(source.text.as_str()));
        let source = || text.clone().map(|text| (file.file_name.as_str(), text));

        for diagnostic in file.diagnostics.diagnostics() {
            report::emit(SourceDiagnostic::from_diagnostic(diagnostic, source()));
        }
        if let Some(error) = &file.codegen_error {
            report::emit(SourceDiagnostic::from_compile_error(error, source()));
        }
    }
}

fn write_json(path: &Path, result: &CompilationResult) -> miette::Result<()> {
    let files: Vec<_> = result
        .files
        .iter()
        .filter_map(|file| {
            let bytecode = file.bytecode.as_ref()?;
            Some(json!({ "file": file.file_name, "program": bytecode }))
        })
        .collect();
    let text = serde_json::to_string_pretty(&json!({ "files": files })).into_diagnostic()?;
    std::fs::write(path, text)
        .into_diagnostic()
        .wrap_err_with(|| format!("cannot write '{}'", path.display()))
}
