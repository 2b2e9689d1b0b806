//! Compiler integration tests.
//!
//! End-to-end tests for the compilation pipeline: parse -> bind -> check ->
//! codegen, driven through [`Program`].

use espanda_codegen::{CompileError, Opcode};
use espanda_compiler::{CompilationResult, LoadError, Program};
use espanda_options::CompilerOptions;

/// Helper: create a program with one file and compile it.
fn compile_with(source: &str, options: CompilerOptions) -> CompilationResult {
    let mut program = Program::new(vec![], options);
    program.add_source("test.ts", source);
    program.compile()
}

fn compile_source(source: &str) -> CompilationResult {
    compile_with(source, CompilerOptions::default())
}

fn codes(result: &CompilationResult) -> Vec<u32> {
    result.diagnostics().map(|d| d.code).collect()
}

// ============================================================================
// Basic Compilation
// ============================================================================

#[test]
fn test_compile_empty_file() {
    let result = compile_source("");
    assert!(!result.has_errors());
    let bytecode = result.files[0].bytecode.as_ref().expect("bytecode");
    assert_eq!(bytecode.main().unwrap().opcodes(), vec![Opcode::ReturnUndefined]);
}

#[test]
fn test_compile_function() {
    let result = compile_source("function add(a: number, b: number): number { return a + b; }");
    assert_eq!(codes(&result), Vec::<u32>::new());
    let bytecode = result.files[0].bytecode.as_ref().unwrap();
    let add = bytecode.function("add").expect("add is compiled");
    assert_eq!(add.params, 2);
    assert!(add.opcodes().contains(&Opcode::Add2));
}

#[test]
fn test_type_error_blocks_codegen() {
    let result = compile_source(r#"const n: number = "x";"#);
    assert_eq!(codes(&result), vec![2322]);
    assert!(result.has_errors());
    assert!(result.files[0].bytecode.is_none());
}

#[test]
fn test_emit_on_error() {
    let options = CompilerOptions {
        emit_on_error: Some(true),
        ..CompilerOptions::default()
    };
    let result = compile_with(r#"const n: number = "x";"#, options);
    assert!(result.has_errors());
    assert!(result.files[0].bytecode.is_some());
}

#[test]
fn test_type_check_can_be_disabled() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.type_check = false;
    program.add_source("test.ts", r#"const n: number = "x";"#);
    let result = program.compile();
    assert!(!result.has_errors());
    assert!(result.files[0].bytecode.is_some());
}

#[test]
fn test_strict_null_checks_option() {
    let src = "function f(x: string | null) { x.length; }";
    assert!(!codes(&compile_source(src)).contains(&2531));

    let mut options = CompilerOptions::default();
    options.set_strict();
    assert_eq!(codes(&compile_with(src, options)), vec![2531]);
}

#[test]
fn test_record_name_option() {
    let options = CompilerOptions {
        record_name: Some("app".to_string()),
        ..CompilerOptions::default()
    };
    let result = compile_with("const xs = [1, 2];", options);
    let bytecode = result.files[0].bytecode.as_ref().unwrap();
    assert_eq!(bytecode.record_name, "app");
    assert_eq!(bytecode.literal_buffers[0].id, "app_0");
}

#[test]
fn test_dump_ast_option() {
    assert!(compile_source("let x = 1;").files[0].ast_dump.is_none());

    let options = CompilerOptions {
        dump_ast: Some(true),
        ..CompilerOptions::default()
    };
    let result = compile_with("let x = 1;", options);
    let dump = result.files[0].ast_dump.as_ref().expect("dump");
    assert_eq!(dump["type"], "Program");
    assert_eq!(dump["statements"][0]["type"], "VariableDeclaration");
}

#[test]
fn test_type_extractor_option() {
    let src = "function id(x: number): number { return x; }";
    assert!(compile_source(src).files[0].bytecode.as_ref().unwrap().type_info.is_none());

    let options = CompilerOptions {
        type_extractor: Some(true),
        ..CompilerOptions::default()
    };
    let result = compile_with(src, options);
    let bytecode = result.files[0].bytecode.as_ref().unwrap();
    let info = bytecode.type_info.as_ref().expect("types were recorded");
    assert_eq!(info.bindings.len(), 1);
    assert_eq!(info.bindings[0].name, "id");
    assert!(bytecode.literal_buffer(&info.summary).is_some());
}

#[test]
fn test_type_extractor_needs_type_check() {
    let options = CompilerOptions {
        type_extractor: Some(true),
        ..CompilerOptions::default()
    };
    let mut program = Program::new(vec![], options);
    program.type_check = false;
    program.add_source("test.ts", "let x = 1;");
    let result = program.compile();
    assert!(result.files[0].bytecode.as_ref().unwrap().type_info.is_none());
}

#[test]
fn test_codegen_error_is_reported() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.type_check = false;
    program.add_source("test.ts", "function* g() { yield* other(); }");
    let result = program.compile();
    let file = &result.files[0];
    assert!(file.bytecode.is_none());
    assert!(matches!(file.codegen_error, Some(CompileError::Unsupported { .. })));
    assert!(result.has_errors());
}

// ============================================================================
// Multiple Files
// ============================================================================

#[test]
fn test_compile_multiple_files_in_order() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    for i in 0..8 {
        program.add_source(format!("file_{i}.ts"), format!("const value{i} = {i};"));
    }
    let result = program.compile();
    let names: Vec<&str> = result.files.iter().map(|f| f.file_name.as_str()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("file_{i}.ts")).collect();
    assert_eq!(names, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(result.files.iter().all(|f| f.bytecode.is_some()));
}

#[test]
fn test_errors_stay_with_their_file() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.add_source("good.ts", "const a = 1;");
    program.add_source("bad.ts", r#"const b: number = "x";"#);
    let result = program.compile();
    assert!(result.file("good.ts").unwrap().bytecode.is_some());
    let bad = result.file("bad.ts").unwrap();
    assert!(bad.bytecode.is_none());
    assert_eq!(bad.diagnostics.diagnostics()[0].file.as_deref(), Some("bad.ts"));
    assert_eq!(result.error_count(), 1);
}

// ============================================================================
// Loading From Disk
// ============================================================================

#[test]
fn test_load_root_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("main.ts");
    std::fs::write(&path, "let greeting: string = \"hi\";").unwrap();

    let mut program = Program::new(vec![path.clone()], CompilerOptions::default());
    program.load_root_files().unwrap();
    assert_eq!(program.sources().len(), 1);
    let result = program.compile();
    assert_eq!(result.files[0].file_name, path.display().to_string());
    assert!(!result.has_errors());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.ts");
    let mut program = Program::new(vec![missing], CompilerOptions::default());
    let error = program.load_root_files().unwrap_err();
    assert!(matches!(error, LoadError::Read { .. }));
    assert!(error.to_string().contains("missing.ts"));
}

// ============================================================================
// Fixture File Compilation
// ============================================================================

#[test]
fn test_compile_basic_fixture() {
    let result = compile_source(include_str!("../../../tests/fixtures/basic.ts"));
    assert_eq!(codes(&result), Vec::<u32>::new());
    let bytecode = result.files[0].bytecode.as_ref().unwrap();
    assert!(bytecode.function("add").is_some());
}

#[test]
fn test_compile_classes_fixture() {
    let result = compile_source(include_str!("../../../tests/fixtures/classes.ts"));
    assert_eq!(codes(&result), Vec::<u32>::new());
    let bytecode = result.files[0].bytecode.as_ref().unwrap();
    let ctor = bytecode.function("Counter").expect("implicit constructor");
    assert!(ctor.opcodes().contains(&Opcode::DefineFieldByName));
    assert!(bytecode.function("increment").is_some());
}

#[test]
fn test_compile_control_flow_fixture() {
    let mut program = Program::new(vec![], CompilerOptions::default());
    program.type_check = false;
    program.add_source("control_flow.ts", include_str!("../../../tests/fixtures/control_flow.ts"));
    let result = program.compile();
    let file = &result.files[0];
    assert!(file.diagnostics.is_empty(), "{:?}", file.diagnostics.diagnostics());
    assert!(file.codegen_error.is_none(), "{:?}", file.codegen_error);

    let bytecode = file.bytecode.as_ref().unwrap();
    let main = bytecode.main().unwrap();
    assert!(main.label_targets.iter().any(|t| t.label.as_deref() == Some("done")));
    assert_eq!(main.catch_tables.len(), 1);

    let later = bytecode.function("later").unwrap();
    assert_eq!(later.resume_points.len(), 2);
    let counter = bytecode.function("counter").unwrap();
    assert_eq!(counter.resume_points.len(), 3);
}

#[test]
fn test_compile_type_error_fixture() {
    let result = compile_source(include_str!("../../../tests/fixtures/type_error.ts"));
    assert_eq!(codes(&result), vec![2322]);
    assert!(result.files[0].bytecode.is_none());
}

// ============================================================================
// Stress Tests
// ============================================================================

#[test]
fn test_compile_large_file() {
    let mut source = String::new();
    for i in 0..100 {
        source.push_str(&format!("const var_{i}: number = {i};\n"));
    }
    for i in 0..50 {
        source.push_str(&format!("function func_{i}(x: number): number {{ return x + {i}; }}\n"));
    }
    for i in 0..20 {
        source.push_str(&format!("interface Iface_{i} {{ prop_{i}: string; }}\n"));
    }

    let result = compile_source(&source);
    assert!(!result.has_errors());
    assert_eq!(result.files[0].bytecode.as_ref().unwrap().functions.len(), 51);
}

#[test]
fn test_compile_deeply_nested() {
    let mut source = String::from("function f(x: number): number { return x; }\nconst x = ");
    for _ in 0..20 {
        source.push_str("f(");
    }
    source.push('1');
    for _ in 0..20 {
        source.push(')');
    }
    source.push(';');

    let result = compile_source(&source);
    assert!(!result.has_errors());
    let main = result.files[0].bytecode.as_ref().unwrap().main().unwrap();
    assert_eq!(main.find(Opcode::CallArg1).count(), 20);
}
