//! espanda_diagnostics: diagnostic values and the message catalogue.
//!
//! Diagnostics are plain data: a message template, the resolved text and an
//! optional location. Every phase collects them into a
//! [`DiagnosticCollection`] and keeps going; none of them is an `Err`.

pub mod messages;

use espanda_core::text::TextSpan;
use serde::Serialize;
use std::fmt;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Message,
}

impl fmt::Display for DiagnosticCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticCategory::Error => "error",
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Message => "message",
        })
    }
}

/// Which phase raised a diagnostic, and whether it reports a user mistake
/// or a construct the compiler does not handle yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Syntax,
    Semantic,
    /// A valid program using a feature that is not implemented.
    Unsupported,
}

/// A message template from the catalogue in [`messages`].
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub kind: DiagnosticKind,
    /// Template text with `{0}`, `{1}`, ... placeholders.
    pub message: &'static str,
}

/// A reported diagnostic.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    /// File the diagnostic belongs to, if any.
    pub file: Option<String>,
    /// Location inside `file`.
    pub span: Option<TextSpan>,
    /// Message text with arguments substituted.
    pub message_text: String,
    pub code: u32,
    pub category: DiagnosticCategory,
    pub kind: DiagnosticKind,
}

impl Diagnostic {
    /// A diagnostic without a location.
    pub fn new(message: &DiagnosticMessage, args: &[&str]) -> Self {
        Self {
            file: None,
            span: None,
            message_text: format_message(message.message, args),
            code: message.code,
            category: message.category,
            kind: message.kind,
        }
    }

    pub fn with_location(
        file: impl Into<String>,
        span: TextSpan,
        message: &DiagnosticMessage,
        args: &[&str],
    ) -> Self {
        Self {
            file: Some(file.into()),
            span: Some(span),
            ..Self::new(message, args)
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    pub fn is_unsupported(&self) -> bool {
        self.kind == DiagnosticKind::Unsupported
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            match self.span {
                Some(span) => write!(f, "{}({}): ", file, span.start)?,
                None => write!(f, "{}: ", file)?,
            }
        }
        write!(f, "{} ES{}: {}", self.category, self.code, self.message_text)
    }
}

/// Substitute `{0}`, `{1}`, ... in `template` with `args`.
pub fn format_message(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let index = after
            .find('}')
            .and_then(|close| after[..close].parse::<usize>().ok().map(|i| (i, close)));
        match index {
            Some((i, close)) if i < args.len() => {
                out.push_str(args[i]);
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Diagnostics accumulated by one phase or one file.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticCollection {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Drop everything reported after the first `len` diagnostics. Used to
    /// roll back speculative parses.
    pub fn truncate(&mut self, len: usize) {
        self.diagnostics.truncate(len);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(other);
    }

    /// Order by file, then by position.
    pub fn sort(&mut self) {
        self.diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.span.map(|s| s.start).cmp(&b.span.map(|s| s.start)))
        });
    }
}

impl IntoIterator for DiagnosticCollection {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.diagnostics.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message() {
        let msg = format_message("Expected {0}-{1} arguments, but got {2}.", &["1", "2", "3"]);
        assert_eq!(msg, "Expected 1-2 arguments, but got 3.");
    }

    #[test]
    fn test_format_message_keeps_unknown_placeholders() {
        assert_eq!(format_message("a {1} b", &["x"]), "a {1} b");
        assert_eq!(format_message("{ not a placeholder }", &[]), "{ not a placeholder }");
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::with_location(
            "main.ts",
            TextSpan::new(10, 3),
            &messages::CANNOT_FIND_NAME_0,
            &["foo"],
        );
        assert_eq!(diag.to_string(), "main.ts(10): error ES2304: Cannot find name 'foo'.");
        assert!(!diag.is_unsupported());
    }

    #[test]
    fn test_unsupported_is_distinct_kind() {
        let diag = Diagnostic::new(&messages::FEATURE_0_IS_NOT_SUPPORTED, &["import.meta"]);
        assert!(diag.is_unsupported());
        assert_eq!(diag.kind, DiagnosticKind::Unsupported);
        assert_eq!(diag.message_text, "'import.meta' is not supported yet.");
    }

    #[test]
    fn test_collection_sort() {
        let mut collection = DiagnosticCollection::new();
        collection.add(Diagnostic::with_location(
            "b.ts",
            TextSpan::new(1, 1),
            &messages::EXPRESSION_EXPECTED,
            &[],
        ));
        collection.add(Diagnostic::with_location(
            "a.ts",
            TextSpan::new(9, 1),
            &messages::EXPRESSION_EXPECTED,
            &[],
        ));
        collection.add(Diagnostic::with_location(
            "a.ts",
            TextSpan::new(2, 1),
            &messages::EXPRESSION_EXPECTED,
            &[],
        ));
        collection.sort();
        let order: Vec<_> = collection
            .diagnostics()
            .iter()
            .map(|d| (d.file.clone().unwrap_or_default(), d.span.map(|s| s.start)))
            .collect();
        assert_eq!(
            order,
            vec![
                ("a.ts".to_string(), Some(2)),
                ("a.ts".to_string(), Some(9)),
                ("b.ts".to_string(), Some(1)),
            ]
        );
        assert_eq!(collection.error_count(), 3);
    }
}
