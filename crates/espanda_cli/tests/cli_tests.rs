//! CLI tests.
//!
//! Run the `espanda` binary against files in a temporary directory and
//! check exit codes, dumps and reports.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn espanda(args: &[&str], dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_espanda"))
        .args(args)
        .current_dir(dir)
        .env_remove("ESPANDA_LOG")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run espanda")
}

fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_clean_file_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", "let x: number = 1;");
    let output = espanda(&["main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
}

#[test]
fn test_type_error_exits_with_2() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", r#"let x: number = "one";"#);
    let output = espanda(&["main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    let report = stderr(&output);
    assert!(report.contains("ES2322"), "{report}");
    assert!(report.contains("Found 1 error."), "{report}");
}

#[test]
fn test_no_check_skips_type_errors() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", r#"let x: number = "one";"#);
    let output = espanda(&["--no-check", "main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
}

#[test]
fn test_missing_file_exits_with_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = espanda(&["missing.ts"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("missing.ts"));
}

#[test]
fn test_no_input_exits_with_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = espanda(&[], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_unknown_flag_exits_with_1() {
    let dir = tempfile::tempdir().unwrap();
    let output = espanda(&["--bogus"], dir.path());
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_dump_bytecode() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", "function f() { return 1; }\nf();");
    let output = espanda(&["--dump-bytecode", "main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains(".function func_main_0"), "{text}");
    assert!(text.contains(".function f(0)"), "{text}");
}

#[test]
fn test_dump_ast() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", "let x = 1;");
    let output = espanda(&["--dump-ast", "main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
    let dump: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(dump["type"], "Program");
}

#[test]
fn test_emit_json() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", "const xs = [1, 2];");
    let output = espanda(&["--emit-json", "out.json", "--record-name", "app", "main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let text = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let program = &json["files"][0]["program"];
    assert_eq!(program["record_name"], "app");
    assert_eq!(program["functions"][0]["name"], "func_main_0");
    assert_eq!(program["literal_buffers"][0]["id"], "app_0");
}

#[test]
fn test_type_extractor_flag() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "main.ts", "let n: number = 1;");
    let output = espanda(&["--emit-json", "out.json", "--type-extractor", "main.ts"], dir.path());
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let text = std::fs::read_to_string(dir.path().join("out.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    let info = &json["files"][0]["program"]["type_info"];
    assert_eq!(info["bindings"][0]["name"], "n");
    assert_eq!(info["bindings"][0]["type_index"], 1);
}

#[test]
fn test_project_file() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();
    write(&dir.path().join("src"), "a.ts", "function f(x: string | null) { x.length; }");
    write(
        dir.path(),
        "espanda.json",
        r#"{ "compilerOptions": { "strictNullChecks": true }, "files": ["src/a.ts"] }"#,
    );
    let output = espanda(&["--project", "espanda.json"], dir.path());
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("ES2531"));
}

#[test]
fn test_invalid_project_file() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "espanda.json", r#"{ "compilerOptions": { "target": "ES5" } }"#);
    let output = espanda(&["-p", "espanda.json"], dir.path());
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("espanda.json"));
}
