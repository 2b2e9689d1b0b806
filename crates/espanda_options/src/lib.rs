//! espanda_options: project configuration and compiler options.
//!
//! A project file is JSON with a `compilerOptions` object and a `files`
//! list. Unknown keys are rejected so a misspelt option fails loudly
//! instead of being ignored. Every option is optional in the file; the
//! accessors supply the defaults and command-line flags override through
//! [`CompilerOptions::merge`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Record name used for literal buffer ids when none is configured.
pub const DEFAULT_RECORD_NAME: &str = "_ESModuleRecord";

/// Compiler options, as written in the `compilerOptions` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompilerOptions {
    // -- Type checking --
    /// `null` and `undefined` are only assignable to themselves, `any`,
    /// `unknown` and unions containing them.
    pub strict_null_checks: Option<bool>,
    /// Report declarations whose type silently becomes `any`.
    pub no_implicit_any: Option<bool>,

    // -- Output --
    /// Generate bytecode for files that have error diagnostics.
    pub emit_on_error: Option<bool>,
    /// Keep the JSON AST dump in each file's output.
    pub dump_ast: Option<bool>,
    /// Prefix of literal buffer ids.
    pub record_name: Option<String>,
    /// Record the checked types of top-level bindings in type buffers.
    pub type_extractor: Option<bool>,
}

impl CompilerOptions {
    pub fn strict_null_checks(&self) -> bool {
        self.strict_null_checks.unwrap_or(false)
    }

    pub fn no_implicit_any(&self) -> bool {
        self.no_implicit_any.unwrap_or(false)
    }

    pub fn emit_on_error(&self) -> bool {
        self.emit_on_error.unwrap_or(false)
    }

    pub fn dump_ast(&self) -> bool {
        self.dump_ast.unwrap_or(false)
    }

    pub fn type_extractor(&self) -> bool {
        self.type_extractor.unwrap_or(false)
    }

    pub fn record_name(&self) -> &str {
        self.record_name.as_deref().unwrap_or(DEFAULT_RECORD_NAME)
    }

    /// `strict` turns on every strictness check.
    pub fn set_strict(&mut self) {
        self.strict_null_checks = Some(true);
        self.no_implicit_any = Some(true);
    }

    /// Options set in `overrides` win over the ones set here.
    pub fn merge(&mut self, overrides: &CompilerOptions) {
        fn take<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                slot.clone_from(value);
            }
        }
        take(&mut self.strict_null_checks, &overrides.strict_null_checks);
        take(&mut self.no_implicit_any, &overrides.no_implicit_any);
        take(&mut self.emit_on_error, &overrides.emit_on_error);
        take(&mut self.dump_ast, &overrides.dump_ast);
        take(&mut self.record_name, &overrides.record_name);
        take(&mut self.type_extractor, &overrides.type_extractor);
    }
}

/// A project file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProjectConfig {
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    /// Root files, relative to the project file's directory.
    #[serde(default)]
    pub files: Vec<String>,
}

impl ProjectConfig {
    /// Root files resolved against `base`, normally the directory holding
    /// the project file.
    pub fn resolved_files(&self, base: &Path) -> Vec<PathBuf> {
        self.files.iter().map(|file| base.join(file)).collect()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read project file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid project file '{}': {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parse a project file from a string.
pub fn parse_project_config(content: &str) -> Result<ProjectConfig, serde_json::Error> {
    serde_json::from_str(content)
}

/// Read and parse a project file.
pub fn read_project_config(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_project_config(&content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), files = config.files.len(), "read project file");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = CompilerOptions::default();
        assert!(!options.strict_null_checks());
        assert!(!options.no_implicit_any());
        assert!(!options.emit_on_error());
        assert!(!options.dump_ast());
        assert!(!options.type_extractor());
        assert_eq!(options.record_name(), "_ESModuleRecord");
    }

    #[test]
    fn test_parse_camel_case() {
        let config = parse_project_config(
            r#"{
                "compilerOptions": { "strictNullChecks": true, "recordName": "app", "typeExtractor": true },
                "files": ["main.ts", "lib/util.ts"]
            }"#,
        )
        .unwrap();
        assert!(config.compiler_options.strict_null_checks());
        assert!(!config.compiler_options.no_implicit_any());
        assert_eq!(config.compiler_options.record_name(), "app");
        assert!(config.compiler_options.type_extractor());
        assert_eq!(config.files, vec!["main.ts", "lib/util.ts"]);
    }

    #[test]
    fn test_empty_object_is_valid() {
        assert_eq!(parse_project_config("{}").unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let error = parse_project_config(r#"{ "compilerOptions": { "strictNullCheck": true } }"#).unwrap_err();
        assert!(error.to_string().contains("strictNullCheck"), "{error}");
        assert!(parse_project_config(r#"{ "include": ["src"] }"#).is_err());
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(parse_project_config(r#"{ "compilerOptions": { "dumpAst": "yes" } }"#).is_err());
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let mut options = CompilerOptions {
            strict_null_checks: Some(false),
            record_name: Some("file".to_string()),
            ..CompilerOptions::default()
        };
        let mut overrides = CompilerOptions::default();
        overrides.set_strict();
        options.merge(&overrides);
        assert!(options.strict_null_checks());
        assert!(options.no_implicit_any());
        assert_eq!(options.record_name(), "file");
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("espanda.json");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, r#"{{ "compilerOptions": {{ "emitOnError": true }}, "files": ["a.ts"] }}"#).unwrap();

        let config = read_project_config(&path).unwrap();
        assert!(config.compiler_options.emit_on_error());
        assert_eq!(config.resolved_files(dir.path()), vec![dir.path().join("a.ts")]);
    }

    #[test]
    fn test_read_errors_name_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let error = read_project_config(&missing).unwrap_err();
        assert!(matches!(error, ConfigError::Io { .. }));
        assert!(error.to_string().contains("missing.json"));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        let error = read_project_config(&broken).unwrap_err();
        assert!(matches!(error, ConfigError::Json { .. }));
    }
}
