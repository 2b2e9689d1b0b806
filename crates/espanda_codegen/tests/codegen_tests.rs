//! Codegen integration tests.
//!
//! Parse -> bind -> compile, then inspect the emitted functions: jump
//! targets, call shapes, literal buffers, lexical variables, suspension
//! points, catch tables and recorded types.

use espanda_binder::bind;
use espanda_checker::Checker;
use espanda_codegen::{
    compile, compile_with_types, CodegenOptions, CompileError, CompiledFunction, CompiledProgram, FunctionKind,
    LiteralValue, Opcode, Operand, PrimitiveType, SuspendKind, UserTypeTag, USER_TYPE_INDEX_HEAD,
};
use espanda_core::StringInterner;
use espanda_parser::parse;

fn options() -> CodegenOptions {
    CodegenOptions {
        record_name: "test".to_string(),
    }
}

fn compile_source(source: &str) -> CompiledProgram {
    let parsed = parse("test.ts", source, StringInterner::new());
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:?}",
        parsed.diagnostics.diagnostics()
    );
    let bound = bind(&parsed.ast);
    compile(&parsed.ast, &bound.scopes, &options()).expect("codegen failed")
}

/// Compile without insisting on a clean parse.
fn compile_error(source: &str) -> CompileError {
    let parsed = parse("test.ts", source, StringInterner::new());
    let bound = bind(&parsed.ast);
    compile(&parsed.ast, &bound.scopes, &options()).expect_err("expected a codegen error")
}

fn main_of(program: &CompiledProgram) -> &CompiledFunction {
    program.main().expect("no main function")
}

fn count(function: &CompiledFunction, opcode: Opcode) -> usize {
    function.find(opcode).count()
}

fn first_jump(function: &CompiledFunction) -> &espanda_codegen::Insn {
    function
        .insns
        .iter()
        .find(|insn| insn.opcode == Opcode::Jmp)
        .expect("no jmp emitted")
}

// ============================================================================
// Jumps
// ============================================================================

#[test]
fn test_labelled_continue_targets_outer_loop() {
    let program = compile_source(
        r#"
        outer: for (;;) {
            for (;;) {
                continue outer;
            }
        }
        "#,
    );
    let main = main_of(&program);
    assert_eq!(main.label_targets.len(), 2);
    let (outer, inner) = (&main.label_targets[0], &main.label_targets[1]);
    let jump = first_jump(main);
    assert_eq!(jump.jump_target(), outer.continue_label);
    assert_ne!(jump.jump_target(), inner.continue_label);
}

#[test]
fn test_unlabelled_break_targets_innermost_loop() {
    let program = compile_source(
        r#"
        while (true) {
            while (true) {
                break;
            }
        }
        "#,
    );
    let main = main_of(&program);
    let inner = &main.label_targets[1];
    assert_eq!(first_jump(main).jump_target(), inner.break_label);
}

#[test]
fn test_break_out_of_labelled_block() {
    let program = compile_source(
        r#"
        let x = 0;
        done: {
            while (true) {
                break done;
            }
            x = 1;
        }
        "#,
    );
    let main = main_of(&program);
    let block = main
        .label_targets
        .iter()
        .find(|target| target.label.as_deref() == Some("done"))
        .expect("labelled block target");
    let end = block.break_label.expect("labelled block has a break label");
    assert_eq!(first_jump(main).jump_target(), Some(end));
    // the block ends right before the implicit return
    assert_eq!(main.label_offset(end), Some(main.insns.len() as u32 - 1));
}

#[test]
fn test_break_through_finally_inlines_finalizer() {
    let program = compile_source(
        r#"
        let log = 0;
        while (true) {
            try {
                break;
            } finally {
                log = 1;
            }
        }
        "#,
    );
    let main = main_of(&program);
    // jump path, normal path and exceptional path
    assert_eq!(count(main, Opcode::TryStGlobalByName), 3);
    let first_store = main.find(Opcode::TryStGlobalByName).next().unwrap();
    let after = &main.insns[first_store + 1];
    assert_eq!(after.opcode, Opcode::Jmp);
    assert_eq!(after.jump_target(), main.label_targets[0].break_label);
    assert_eq!(main.catch_tables.len(), 1);
}

#[test]
fn test_for_of_break_closes_iterator() {
    let program = compile_source("for (const x of xs) { break; }");
    assert_eq!(count(main_of(&program), Opcode::CloseIterator), 1);

    let program = compile_source("for (const x of xs) { continue; }");
    assert_eq!(count(main_of(&program), Opcode::CloseIterator), 0);
}

#[test]
fn test_unresolved_break_is_an_error() {
    let error = compile_error("break;");
    assert!(
        matches!(&error, CompileError::UnresolvedJumpTarget { statement, .. } if statement == "break"),
        "{error:?}"
    );
}

#[test]
fn test_continue_to_labelled_block_is_an_error() {
    let error = compile_error("outer: { for (;;) { continue outer; } }");
    assert!(
        matches!(&error, CompileError::UnresolvedJumpTarget { statement, .. } if statement == "continue outer"),
        "{error:?}"
    );
}

#[test]
fn test_continue_through_nested_labels_targets_loop() {
    let program = compile_source(
        r#"
        a: b: for (;;) {
            for (;;) {
                continue a;
            }
        }
        "#,
    );
    let main = main_of(&program);
    let outer = main
        .label_targets
        .iter()
        .find(|entry| entry.continue_label.is_some())
        .expect("no loop entry");
    assert_eq!(first_jump(main).jump_target(), outer.continue_label);
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_new_passes_constructor_and_arguments() {
    let program = compile_source(
        r#"
        class Foo { constructor(a: number, b: number) {} }
        const a = 1, b = 2;
        new Foo(a, b);
        "#,
    );
    let main = main_of(&program);
    let index = main.find(Opcode::NewObjRange).next().expect("newobjrange");
    let insn = &main.insns[index];
    assert_eq!(insn.operands[0], Operand::Imm(3));
    assert!(matches!(insn.operands[1], Operand::Reg(_)));
}

#[test]
fn test_new_with_spread_builds_argument_array() {
    let program = compile_source(
        r#"
        function Foo(...xs: number[]) {}
        const args = [1, 2];
        new Foo(...args);
        "#,
    );
    let main = main_of(&program);
    assert_eq!(count(main, Opcode::CreateEmptyArray), 1);
    assert_eq!(count(main, Opcode::StArraySpread), 1);
    assert_eq!(count(main, Opcode::NewObjApply), 1);
    assert_eq!(count(main, Opcode::NewObjRange), 0);
}

#[test]
fn test_call_shapes() {
    let program = compile_source("f(1); o.m(1, 2); f(...xs);");
    let main = main_of(&program);
    assert_eq!(count(main, Opcode::CallArg1), 1);
    assert_eq!(count(main, Opcode::CallThis2), 1);
    assert_eq!(count(main, Opcode::Apply), 1);
}

// ============================================================================
// Literals and classes
// ============================================================================

#[test]
fn test_object_literal_uses_buffer_for_constant_prefix() {
    let program = compile_source(
        r#"
        function f() { return 0; }
        const o = { a: 1, b: "x", c: f() };
        "#,
    );
    let main = main_of(&program);
    let index = main.find(Opcode::CreateObjectWithBuffer).next().expect("buffered object");
    let Operand::Literal(id) = &main.insns[index].operands[0] else {
        panic!("expected a literal buffer operand");
    };
    assert_eq!(id, "test_0");
    let buffer = program.literal_buffer(id).expect("buffer exists");
    assert_eq!(
        buffer.entries,
        vec![
            LiteralValue::String("a".to_string()),
            LiteralValue::Integer(1),
            LiteralValue::String("b".to_string()),
            LiteralValue::String("x".to_string()),
        ]
    );
    assert_eq!(count(main, Opcode::StOwnByName), 1);
}

#[test]
fn test_array_literal_stores_after_buffer() {
    let program = compile_source("const x = 3; const xs = [1, 2, x];");
    let main = main_of(&program);
    assert_eq!(count(main, Opcode::CreateArrayWithBuffer), 1);
    let index = main.find(Opcode::StOwnByIndex).next().expect("stownbyindex");
    assert_eq!(main.insns[index].operands[1], Operand::Imm(2));
}

#[test]
fn test_class_literal_buffer_layout() {
    let program = compile_source("class A { m() {} static s() {} }");
    let main = main_of(&program);
    let index = main.find(Opcode::DefineClass).next().expect("defineclass");
    let insn = &main.insns[index];
    assert_eq!(insn.operands[0], Operand::Function("A".to_string()));
    let Operand::Literal(id) = &insn.operands[1] else {
        panic!("expected a literal buffer operand");
    };
    let buffer = program.literal_buffer(id).expect("buffer exists");
    assert_eq!(
        buffer.entries,
        vec![
            LiteralValue::String("m".to_string()),
            LiteralValue::Method {
                function: "m".to_string(),
                params: 0
            },
            LiteralValue::String("s".to_string()),
            LiteralValue::Method {
                function: "s".to_string(),
                params: 0
            },
            LiteralValue::Integer(1),
        ]
    );
    // the implicit constructor returns `this`
    let ctor = program.function("A").expect("implicit constructor");
    assert_eq!(ctor.opcodes().last(), Some(&Opcode::Return));
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_const_assignment_throws() {
    let program = compile_source("const c = 1; function g() { c = 2; }");
    assert_eq!(count(main_of(&program), Opcode::StConstToGlobalRecord), 1);
    let g = program.function("g").expect("g");
    assert_eq!(count(g, Opcode::ThrowConstAssignment), 1);
}

#[test]
fn test_captured_variable_lives_in_lexical_env() {
    let program = compile_source(
        r#"
        function outer() {
            let count = 0;
            return () => { count += 1; return count; };
        }
        "#,
    );
    let outer = program.function("outer").expect("outer");
    let env = outer.find(Opcode::NewLexEnv).next().expect("newlexenv");
    assert_eq!(outer.insns[env].operands[0], Operand::Imm(1));
    assert!(count(outer, Opcode::StLexVar) >= 1);

    let arrow = &program.functions[2];
    assert!(arrow.name.starts_with('#'));
    let load = arrow.find(Opcode::LdLexVar).next().expect("ldlexvar");
    assert_eq!(arrow.insns[load].operands.to_vec(), vec![Operand::Imm(0), Operand::Imm(0)]);
}

#[test]
fn test_arrow_reads_this_from_enclosing_env() {
    let program = compile_source("class C { m() { return () => this; } }");
    let m = program.function("m").expect("m");
    assert_eq!(count(m, Opcode::StLexVar), 1);
    let arrow = program
        .functions
        .iter()
        .find(|f| f.name.starts_with('#'))
        .expect("arrow function");
    assert_eq!(count(arrow, Opcode::LdLexVar), 1);
}

#[test]
fn test_internal_names_are_unique() {
    let program = compile_source("function a() {} function b() { function a() {} } const f = () => 1; [() => 2];");
    let names: Vec<&str> = program.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names[0], "func_main_0");
    assert!(names.contains(&"a"));
    assert!(names.contains(&"f"));
    // main is compiled before `b`, so its anonymous arrow is named first
    assert!(names.contains(&"#1#"));
    assert!(names.contains(&"#2#a"));
}

// ============================================================================
// Suspension and exceptions
// ============================================================================

#[test]
fn test_async_function_resume_points() {
    let program = compile_source("async function f(p: Promise<number>) { await p; await p; }");
    let f = program.function("f").expect("f");
    assert_eq!(f.kind, FunctionKind::Async);
    assert_eq!(f.resume_points.len(), 2);
    assert!(f.resume_points.iter().all(|point| point.kind == SuspendKind::Await));
    assert_eq!(f.insns[0].opcode, Opcode::AsyncFunctionEnter);
    // the body handler rejects the promise
    assert_eq!(f.catch_tables.len(), 1);
    assert_eq!(count(f, Opcode::AsyncFunctionReject), 1);
}

#[test]
fn test_generator_resume_points() {
    let program = compile_source("function* g() { yield 1; }");
    let g = program.function("g").expect("g");
    assert_eq!(g.kind, FunctionKind::Generator);
    let kinds: Vec<SuspendKind> = g.resume_points.iter().map(|point| point.kind).collect();
    assert_eq!(kinds, vec![SuspendKind::Initial, SuspendKind::Yield]);
    for point in &g.resume_points {
        assert_eq!(g.insns[point.offset as usize].opcode, Opcode::ResumeGenerator);
    }
}

#[test]
fn test_delegating_yield_is_unsupported() {
    let error = compile_error("function* g() { yield* other(); }");
    assert!(matches!(error, CompileError::Unsupported { .. }), "{error:?}");
}

#[test]
fn test_catch_tables_innermost_first() {
    let program = compile_source("try { try { a(); } catch (e) {} } catch (e) {}");
    let main = main_of(&program);
    let depths: Vec<u32> = main.catch_tables.iter().map(|table| table.depth).collect();
    assert_eq!(depths, vec![1, 0]);
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn test_serializes_to_json() {
    let program = compile_source("let x = 1 + 2;");
    let json = serde_json::to_value(&program).expect("serializable");
    assert_eq!(json["record_name"], "test");
    assert_eq!(json["functions"][0]["name"], "func_main_0");
    assert_eq!(json["functions"][0]["insns"][0]["opcode"], "ldai");
    assert_eq!(json["functions"][0]["insns"][0]["operands"][0]["kind"], "imm");
}

#[test]
fn test_disassembly() {
    let program = compile_source("let x = 1;");
    let text = program.to_string();
    assert!(text.starts_with(".record test\n"));
    assert!(text.contains(".function func_main_0(0) kind=normal"));
    assert!(text.contains("    sttoglobalrecord \"x\""));
    assert!(text.trim_end().ends_with(".end"));
}

// ============================================================================
// Type recording
// ============================================================================

fn compile_typed(source: &str) -> CompiledProgram {
    let parsed = parse("test.ts", source, StringInterner::new());
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:?}",
        parsed.diagnostics.diagnostics()
    );
    let mut bound = bind(&parsed.ast);
    let mut checker = Checker::new(&parsed.ast, &mut bound.scopes);
    checker.check_program(parsed.ast.root());
    assert!(
        checker.diagnostics().is_empty(),
        "unexpected type errors: {:?}",
        checker.diagnostics().diagnostics()
    );
    let types = checker.into_types();
    compile_with_types(&parsed.ast, &bound.scopes, &types, &options()).expect("codegen failed")
}

fn type_of(program: &CompiledProgram, name: &str) -> i64 {
    let info = program.type_info.as_ref().expect("types were recorded");
    info.bindings
        .iter()
        .find(|binding| binding.name == name)
        .unwrap_or_else(|| panic!("no recorded binding {name}"))
        .type_index
}

fn type_buffer(program: &CompiledProgram, index: i64) -> &[LiteralValue] {
    let info = program.type_info.as_ref().expect("types were recorded");
    let summary = program.literal_buffer(&info.summary).expect("summary buffer");
    let slot = (index - USER_TYPE_INDEX_HEAD) as usize;
    let LiteralValue::LiteralArray(id) = &summary.entries[2 + slot] else {
        panic!("summary entry {slot} is not a literal array");
    };
    &program.literal_buffer(id).expect("type buffer").entries
}

fn int(value: i64) -> LiteralValue {
    LiteralValue::Integer(value)
}

fn string(value: &str) -> LiteralValue {
    LiteralValue::String(value.to_string())
}

fn tag(tag: UserTypeTag) -> LiteralValue {
    int(tag.value())
}

#[test]
fn test_untyped_compile_records_no_types() {
    assert!(compile_source("let x = 1;").type_info.is_none());
}

#[test]
fn test_primitive_bindings_use_fixed_indices() {
    let program = compile_typed("let n = 1; let s: string = \"a\"; let b = true; let u: undefined = undefined;");
    assert_eq!(type_of(&program, "n"), PrimitiveType::Number.index());
    assert_eq!(type_of(&program, "s"), PrimitiveType::String.index());
    assert_eq!(type_of(&program, "b"), PrimitiveType::Boolean.index());
    assert_eq!(type_of(&program, "u"), PrimitiveType::Undefined.index());
}

#[test]
fn test_function_type_buffer_layout() {
    let program = compile_typed("function add(a: number, b: string): boolean { return true; }");
    let add = type_of(&program, "add");
    assert!(add >= USER_TYPE_INDEX_HEAD);
    assert_eq!(
        type_buffer(&program, add),
        [tag(UserTypeTag::Function), int(0), string("add"), int(0), int(2), int(1), int(4), int(2)]
    );
}

#[test]
fn test_class_and_instance_buffers() {
    let program = compile_typed(
        "class Point { x: number = 0; readonly y: string = \"\"; norm(): number { return 1; } \
         static origin: number = 0; static make(): number { return 2; } } \
         let p = new Point();",
    );
    let class = type_of(&program, "Point");
    let buffer = type_buffer(&program, class);
    let LiteralValue::Integer(norm) = buffer[15] else {
        panic!("expected the type of norm");
    };
    let LiteralValue::Integer(make) = buffer[23] else {
        panic!("expected the type of make");
    };
    assert_eq!(
        buffer,
        [
            tag(UserTypeTag::Class),
            int(0),
            int(PrimitiveType::Any.index()),
            int(0),
            // instance fields
            int(2),
            string("x"),
            int(1),
            int(0),
            int(0),
            string("y"),
            int(4),
            int(0),
            int(1),
            // instance methods
            int(1),
            string("norm"),
            int(norm),
            // static fields
            int(1),
            string("origin"),
            int(1),
            int(0),
            int(0),
            // static methods
            int(1),
            string("make"),
            int(make),
        ]
    );
    assert_eq!(
        type_buffer(&program, norm),
        [tag(UserTypeTag::Function), int(0), string("norm"), int(0), int(0), int(1)]
    );
    // static methods carry the static modifier
    assert_eq!(type_buffer(&program, make)[1], int(4));

    let instance = type_of(&program, "p");
    assert_eq!(type_buffer(&program, instance), [tag(UserTypeTag::ClassInstance), int(class)]);
}

#[test]
fn test_derived_class_names_its_base() {
    let program = compile_typed("class A { a: number = 1; } class B extends A { b: string = \"\"; }");
    let base = type_of(&program, "A");
    let derived = type_buffer(&program, type_of(&program, "B"));
    assert_eq!(derived[2], int(base));
    // only the members B declares itself
    assert_eq!(&derived[4..9], [int(1), string("b"), int(4), int(0), int(0)]);
}

#[test]
fn test_unions_and_arrays_are_shared() {
    let program = compile_typed(
        "let a: string | number = 1; let b: number | string = \"x\"; \
         let c: number[] = []; let d: number[] = [1];",
    );
    let union = type_of(&program, "a");
    assert_eq!(type_of(&program, "b"), union);
    assert_eq!(type_buffer(&program, union), [tag(UserTypeTag::Union), int(2), int(1), int(4)]);

    let array = type_of(&program, "c");
    assert_eq!(type_of(&program, "d"), array);
    assert_eq!(type_buffer(&program, array), [tag(UserTypeTag::Array), int(1)]);
}

#[test]
fn test_interface_parameter_types() {
    let program = compile_typed(
        "interface Shape { name: string; area(): number; } \
         function describe(shape: Shape): string { return shape.name; }",
    );
    let describe = type_buffer(&program, type_of(&program, "describe"));
    assert_eq!(describe[..5], [tag(UserTypeTag::Function), int(0), string("describe"), int(0), int(1)]);
    assert_eq!(describe[6], int(PrimitiveType::String.index()));
    let LiteralValue::Integer(shape) = describe[5] else {
        panic!("expected the parameter type");
    };
    let interface = type_buffer(&program, shape);
    assert_eq!(
        interface[..9],
        [tag(UserTypeTag::Interface), int(0), int(1), string("name"), int(4), int(0), int(0), int(1), string("area")]
    );
    let LiteralValue::Integer(area) = interface[9] else {
        panic!("expected the type of area");
    };
    let area = type_buffer(&program, area);
    assert_eq!(area[0], tag(UserTypeTag::Function));
    assert_eq!(area.last(), Some(&int(PrimitiveType::Number.index())));
}

#[test]
fn test_self_referential_interface_points_at_itself() {
    let program = compile_typed(
        "interface Link { next: Link; value: number; } \
         function head(link: Link): Link { return link; }",
    );
    let head = type_buffer(&program, type_of(&program, "head"));
    let LiteralValue::Integer(link) = head[5] else {
        panic!("expected the parameter type");
    };
    assert_eq!(head[6], int(link));
    let interface = type_buffer(&program, link);
    assert_eq!(interface[3..5], [string("next"), int(link)]);
}

#[test]
fn test_type_buffers_follow_code_buffers() {
    let program = compile_typed("const xs = [1, 2]; function first(): number[] { return xs; }");
    let info = program.type_info.as_ref().expect("types were recorded");
    assert_eq!(program.literal_buffers[0].id, "test_0");
    assert_eq!(program.literal_buffers[0].entries, [int(1), int(2)]);

    let summary = program.literal_buffers.last().expect("summary buffer");
    assert_eq!(summary.id, info.summary);
    let LiteralValue::Integer(count) = summary.entries[1] else {
        panic!("expected the user type count");
    };
    assert_eq!(summary.entries[0], tag(UserTypeTag::Counter));
    assert_eq!(summary.entries.len(), 2 + count as usize);
    // the array type and the function type
    assert_eq!(count, 2);
    assert_eq!(program.literal_buffers.len(), 1 + 2 + 1);
}

#[test]
fn test_disassembly_lists_recorded_types() {
    let program = compile_typed("let s: string = \"a\";");
    let text = program.to_string();
    let summary = &program.type_info.as_ref().expect("types were recorded").summary;
    assert!(text.contains(&format!(".typesummary {summary}\n")), "{text}");
    assert!(text.contains(".typeof s 4\n"), "{text}");
}
