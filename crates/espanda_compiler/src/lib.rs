//! espanda_compiler: compiler orchestration.
//!
//! A [`Program`] holds the source files of one compilation and runs each of
//! them through parse, bind, check and codegen. Files are independent, so
//! they are processed in parallel; every worker builds its own binder and
//! checker and only the string interner is shared.

use std::path::{Path, PathBuf};

use espanda_ast::AstDumper;
use espanda_binder::bind;
use espanda_checker::Checker;
use espanda_codegen::{compile, compile_with_types, CodegenOptions, CompileError, CompiledProgram};
use espanda_core::intern::StringInterner;
use espanda_diagnostics::{Diagnostic, DiagnosticCollection};
use espanda_options::CompilerOptions;
use espanda_parser::parse;
use rayon::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One input file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub file_name: String,
    pub text: String,
}

/// Everything produced for one file.
#[derive(Debug)]
pub struct FileOutput {
    pub file_name: String,
    /// Syntax, binding and type diagnostics, ordered by position.
    pub diagnostics: DiagnosticCollection,
    /// The JSON AST, when `dumpAst` is set.
    pub ast_dump: Option<serde_json::Value>,
    /// Bytecode; absent when code generation was skipped or failed.
    pub bytecode: Option<CompiledProgram>,
    /// Why code generation failed.
    pub codegen_error: Option<CompileError>,
}

impl FileOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors() || self.codegen_error.is_some()
    }
}

/// Outputs in the order the files were added.
#[derive(Debug, Default)]
pub struct CompilationResult {
    pub files: Vec<FileOutput>,
}

impl CompilationResult {
    pub fn has_errors(&self) -> bool {
        self.files.iter().any(FileOutput::has_errors)
    }

    pub fn error_count(&self) -> usize {
        self.files
            .iter()
            .map(|file| file.diagnostics.error_count() + usize::from(file.codegen_error.is_some()))
            .sum()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.files.iter().flat_map(|file| file.diagnostics.diagnostics())
    }

    pub fn file(&self, file_name: &str) -> Option<&FileOutput> {
        self.files.iter().find(|file| file.file_name == file_name)
    }
}

/// The program represents the entire compilation unit.
pub struct Program {
    pub options: CompilerOptions,
    /// Files read by [`load_root_files`](Self::load_root_files).
    pub root_files: Vec<PathBuf>,
    /// Run the type checker. Without it only syntax and binding errors
    /// stop code generation.
    pub type_check: bool,
    interner: StringInterner,
    sources: Vec<SourceFile>,
}

impl Program {
    pub fn new(root_files: Vec<PathBuf>, options: CompilerOptions) -> Self {
        Self {
            options,
            root_files,
            type_check: true,
            interner: StringInterner::new(),
            sources: Vec::new(),
        }
    }

    /// Add a source file to the program.
    pub fn add_source(&mut self, file_name: impl Into<String>, text: impl Into<String>) {
        self.sources.push(SourceFile {
            file_name: file_name.into(),
            text: text.into(),
        });
    }

    /// Read every root file from disk.
    pub fn load_root_files(&mut self) -> Result<(), LoadError> {
        for path in self.root_files.clone() {
            let text = read_source(&path)?;
            self.add_source(path.display().to_string(), text);
        }
        Ok(())
    }

    pub fn sources(&self) -> &[SourceFile] {
        &self.sources
    }

    pub fn source(&self, file_name: &str) -> Option<&SourceFile> {
        self.sources.iter().find(|source| source.file_name == file_name)
    }

    /// Run the full pipeline over every file.
    #[tracing::instrument(level = "debug", skip_all, fields(files = self.sources.len()))]
    pub fn compile(&self) -> CompilationResult {
        let files: Vec<FileOutput> = self.sources.par_iter().map(|source| self.compile_file(source)).collect();
        let result = CompilationResult { files };
        tracing::debug!(errors = result.error_count(), "compilation finished");
        result
    }

    fn compile_file(&self, source: &SourceFile) -> FileOutput {
        let _span = tracing::debug_span!("file", name = %source.file_name).entered();

        let parsed = parse(&source.file_name, &source.text, self.interner.clone());
        let ast = parsed.ast;
        let mut diagnostics = parsed.diagnostics;

        let bound = bind(&ast);
        diagnostics.extend(bound.diagnostics);
        let mut scopes = bound.scopes;

        let mut types = None;
        if self.type_check {
            let mut checker = Checker::with_options(
                &ast,
                &mut scopes,
                self.options.strict_null_checks(),
                self.options.no_implicit_any(),
            );
            checker.check_program(ast.root());
            diagnostics.extend(checker.take_diagnostics());
            if self.options.type_extractor() {
                types = Some(checker.into_types());
            }
        }
        diagnostics.sort();

        let ast_dump = self
            .options
            .dump_ast()
            .then(|| AstDumper::new(&ast).dump(ast.root()));

        let mut output = FileOutput {
            file_name: source.file_name.clone(),
            diagnostics,
            ast_dump,
            bytecode: None,
            codegen_error: None,
        };
        if output.diagnostics.has_errors() && !self.options.emit_on_error() {
            tracing::debug!(errors = output.diagnostics.error_count(), "skipping code generation");
            return output;
        }

        let codegen_options = CodegenOptions {
            record_name: self.options.record_name().to_string(),
        };
        let compiled = match &types {
            Some(types) => compile_with_types(&ast, &scopes, types, &codegen_options),
            None => compile(&ast, &scopes, &codegen_options),
        };
        match compiled {
            Ok(program) => output.bytecode = Some(program),
            Err(error) => {
                tracing::debug!(%error, "code generation failed");
                output.codegen_error = Some(error);
            }
        }
        output
    }
}

fn read_source(path: &Path) -> Result<String, LoadError> {
    std::fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}
