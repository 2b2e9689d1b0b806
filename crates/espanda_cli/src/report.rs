//! Rendering diagnostics and code generation errors through `miette`.

use std::fmt;
use std::sync::Arc;

use espanda_codegen::CompileError;
use espanda_diagnostics::{Diagnostic, DiagnosticCategory};
use miette::{LabeledSpan, NamedSource, Severity, SourceCode, SourceSpan};
use thiserror::Error;

/// A diagnostic bound to the text of its file.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceDiagnostic {
    message: String,
    code: Option<String>,
    severity: Severity,
    source_code: Option<NamedSource<Arc<str>>>,
    span: Option<SourceSpan>,
}

impl SourceDiagnostic {
    pub fn from_diagnostic(diagnostic: &Diagnostic, source: Option<(&str, Arc<str>)>) -> Self {
        let severity = match diagnostic.category {
            DiagnosticCategory::Error => Severity::Error,
            DiagnosticCategory::Warning => Severity::Warning,
            DiagnosticCategory::Message => Severity::Advice,
        };
        let span = diagnostic
            .span
            .map(|span| SourceSpan::from((span.start as usize, span.length as usize)));
        Self {
            message: diagnostic.message_text.clone(),
            code: Some(format!("ES{}", diagnostic.code)),
            severity,
            source_code: source.map(|(name, text)| NamedSource::new(name, text)),
            span,
        }
    }

    pub fn from_compile_error(error: &CompileError, source: Option<(&str, Arc<str>)>) -> Self {
        let (message, offset) = match error {
            CompileError::UnresolvedJumpTarget { offset, statement, .. } => {
                (format!("no enclosing target for '{statement}'"), Some(*offset))
            }
            CompileError::Unsupported { offset, feature, .. } => {
                (format!("{feature} is not supported by the code generator"), Some(*offset))
            }
            CompileError::RegisterOverflow { .. } => (error.to_string(), None),
        };
        Self {
            message,
            code: Some("codegen".to_string()),
            severity: Severity::Error,
            source_code: source.map(|(name, text)| NamedSource::new(name, text)),
            span: offset.map(|offset| SourceSpan::from((offset as usize, 0))),
        }
    }
}

impl miette::Diagnostic for SourceDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.code.as_ref().map(|code| Box::new(code) as Box<dyn fmt::Display + 'a>)
    }

    fn severity(&self) -> Option<Severity> {
        Some(self.severity)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        self.source_code.as_ref().map(|source| source as &dyn SourceCode)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        // a span is only meaningful with the text it points into
        self.source_code.as_ref()?;
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(None, span))))
    }
}

/// Print `diagnostic` to stderr with the installed report handler.
pub fn emit(diagnostic: SourceDiagnostic) {
    eprintln!("{:?}", miette::Report::new(diagnostic));
}
