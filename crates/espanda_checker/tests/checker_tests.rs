//! Checker integration tests.
//!
//! Tests the full parse -> bind -> check pipeline and verifies diagnostics.

use espanda_ast::NodeKind;
use espanda_binder::bind;
use espanda_checker::Checker;
use espanda_core::StringInterner;
use espanda_parser::parse;

struct Options {
    strict_null_checks: bool,
    no_implicit_any: bool,
}

const LOOSE: Options = Options {
    strict_null_checks: false,
    no_implicit_any: false,
};

const STRICT: Options = Options {
    strict_null_checks: true,
    no_implicit_any: true,
};

/// Run parse -> bind -> check and return `(code, message)` pairs.
fn check_with(source: &str, options: Options) -> Vec<(u32, String)> {
    let parsed = parse("test.ts", source, StringInterner::new());
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:?}",
        parsed.diagnostics.diagnostics()
    );
    let mut bound = bind(&parsed.ast);
    assert!(
        bound.diagnostics.is_empty(),
        "unexpected binder errors: {:?}",
        bound.diagnostics.diagnostics()
    );
    let mut checker = Checker::with_options(
        &parsed.ast,
        &mut bound.scopes,
        options.strict_null_checks,
        options.no_implicit_any,
    );
    checker.check_program(parsed.ast.root());
    checker
        .take_diagnostics()
        .into_diagnostics()
        .into_iter()
        .map(|d| (d.code, d.message_text))
        .collect()
}

fn codes(source: &str) -> Vec<u32> {
    check_with(source, LOOSE).into_iter().map(|(code, _)| code).collect()
}

fn strict_codes(source: &str) -> Vec<u32> {
    check_with(source, STRICT).into_iter().map(|(code, _)| code).collect()
}

fn messages(source: &str) -> Vec<String> {
    check_with(source, LOOSE).into_iter().map(|(_, message)| message).collect()
}

// ============================================================================
// Valid code
// ============================================================================

#[test]
fn test_valid_declarations() {
    let src = r#"
        const x = 42;
        let s: string = "hello";
        function add(a: number, b: number): number { return a + b; }
        const total: number = add(x, 1);
        type Name = string;
        interface Point { x: number; y: number; }
        const p: Point = { x: 1, y: 2 };
        const n: Name = s;
    "#;
    assert_eq!(codes(src), Vec::<u32>::new());
}

#[test]
fn test_valid_class_usage() {
    let src = r#"
        class Counter {
            count: number = 0;
            increment(): number {
                this.count++;
                return this.count;
            }
        }
        const c = new Counter();
        const n: number = c.increment();
    "#;
    assert_eq!(codes(src), Vec::<u32>::new());
}

#[test]
fn test_valid_strict_program() {
    let src = r#"
        function apply(f: (x: number) => number, v: number): number { return f(v); }
        const doubled = apply(x => x * 2, 21);
        const items: number[] = [1, 2, 3];
        const first: number = items[0];
    "#;
    assert_eq!(strict_codes(src), Vec::<u32>::new());
}

// ============================================================================
// Assignability
// ============================================================================

#[test]
fn test_literal_reported_as_its_primitive() {
    assert_eq!(
        messages(r#"let x: number = "a";"#),
        vec!["Type 'string' is not assignable to type 'number'.".to_string()]
    );
}

#[test]
fn test_array_not_assignable_to_number() {
    assert_eq!(
        messages("let n: number = [1, 2];"),
        vec!["Type 'number[]' is not assignable to type 'number'.".to_string()]
    );
}

#[test]
fn test_missing_property() {
    let src = r#"
        interface Point { x: number; y: number; }
        const p: Point = { x: 1 };
    "#;
    assert_eq!(codes(src), vec![2741]);
}

#[test]
fn test_generic_inference_widens_literals() {
    let src = r#"
        function id<T>(x: T): T { return x; }
        const n: number = id(1);
        const s: string = id(1);
    "#;
    assert_eq!(
        messages(src),
        vec!["Type 'number' is not assignable to type 'string'.".to_string()]
    );
}

// ============================================================================
// Calls
// ============================================================================

#[test]
fn test_too_many_arguments() {
    let src = "function g(a: number) {} g(1, 2);";
    assert_eq!(messages(src), vec!["Expected 1 arguments, but got 2.".to_string()]);
}

#[test]
fn test_optional_parameter_range() {
    let src = "function f(a: number, b?: string) {} f();";
    assert_eq!(messages(src), vec!["Expected 1-2 arguments, but got 0.".to_string()]);
}

#[test]
fn test_rest_parameter_minimum() {
    let src = "function h(a: number, ...rest: number[]) {} h();";
    assert_eq!(messages(src), vec!["Expected at least 1 arguments, but got 0.".to_string()]);
}

#[test]
fn test_argument_type_mismatch() {
    let src = r#"function f(a: number) {} f("x");"#;
    assert_eq!(
        messages(src),
        vec!["Argument of type 'string' is not assignable to parameter of type 'number'.".to_string()]
    );
}

#[test]
fn test_no_overload_matches() {
    let src = r#"
        function f(a: number): number;
        function f(a: string): string;
        function f(a: any): any { return a; }
        const ok: number = f(1);
        f(true);
    "#;
    assert_eq!(codes(src), vec![2769]);
}

#[test]
fn test_not_callable_or_constructable() {
    assert_eq!(codes("const n = 1; n();"), vec![2349]);
    assert_eq!(codes("const n = 1; new n();"), vec![2351]);
}

// ============================================================================
// Names and type references
// ============================================================================

#[test]
fn test_cannot_find_name() {
    assert_eq!(messages("foo;"), vec!["Cannot find name 'foo'.".to_string()]);
}

#[test]
fn test_type_used_as_value() {
    assert_eq!(codes("type T = number; T;"), vec![2693]);
}

#[test]
fn test_value_used_as_type() {
    assert_eq!(codes("const v = 1; let x: v;"), vec![2749]);
}

#[test]
fn test_generic_type_requires_arguments() {
    let src = "interface Box<T> { v: T; } let b: Box;";
    assert_eq!(
        messages(src),
        vec!["Generic type 'Box<T>' requires 1 type argument(s).".to_string()]
    );
}

#[test]
fn test_type_is_not_generic() {
    assert_eq!(codes("type N = number; let n: N<string>;"), vec![2315]);
}

#[test]
fn test_circular_type_alias() {
    assert!(codes("type A = B; type B = A;").contains(&2456));
}

#[test]
fn test_recursive_object_alias_is_allowed() {
    let src = "type List = { value: number; next: List | null; };";
    assert_eq!(codes(src), Vec::<u32>::new());
}

#[test]
fn test_property_does_not_exist() {
    let src = "const o = { a: 1 }; o.b;";
    let found = messages(src);
    assert_eq!(found.len(), 1);
    assert!(found[0].starts_with("Property 'b' does not exist on type"));
}

// ============================================================================
// Assignment targets
// ============================================================================

#[test]
fn test_assign_to_constant() {
    assert_eq!(
        messages("const c = 1; c = 2;"),
        vec!["Cannot assign to 'c' because it is a constant.".to_string()]
    );
}

#[test]
fn test_assign_to_readonly_property() {
    let src = r#"
        interface P { readonly x: number; }
        const p: P = { x: 1 };
        p.x = 2;
    "#;
    assert_eq!(codes(src), vec![2540]);
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_operator_cannot_be_applied() {
    assert_eq!(
        messages("let b = true + 1;"),
        vec!["Operator '+' cannot be applied to types 'boolean' and 'number'.".to_string()]
    );
}

#[test]
fn test_arithmetic_operand() {
    assert_eq!(codes(r#"let s = "a" - 1;"#), vec![2362]);
}

#[test]
fn test_comparison_without_overlap() {
    assert_eq!(codes(r#"const a: number = 1; if (a === "x") {}"#), vec![2367]);
}

// ============================================================================
// Functions
// ============================================================================

#[test]
fn test_missing_return_value() {
    assert_eq!(codes("function f(): number { }"), vec![2355]);
}

#[test]
fn test_implicit_any_parameter() {
    assert_eq!(
        check_with("function f(a) {}", STRICT),
        vec![(7006, "Parameter 'a' implicitly has an 'any' type.".to_string())]
    );
    assert_eq!(codes("function f(a) {}"), Vec::<u32>::new());
}

// ============================================================================
// Narrowing
// ============================================================================

#[test]
fn test_null_check_narrows() {
    let src = r#"
        function f(x: string | null): number {
            if (x !== null) {
                return x.length;
            }
            return 0;
        }
    "#;
    assert_eq!(strict_codes(src), Vec::<u32>::new());
}

#[test]
fn test_possibly_null_without_guard() {
    let src = "function f(x: string | null) { x.length; }";
    assert_eq!(strict_codes(src), vec![2531]);
}

#[test]
fn test_possibly_undefined_and_optional_chain() {
    let src = "function f(o: { a: number } | undefined) { o.a; }";
    assert_eq!(strict_codes(src), vec![2532]);
    let src = "function f(o: { a: number } | undefined) { const n = o?.a; }";
    assert_eq!(strict_codes(src), Vec::<u32>::new());
}

#[test]
fn test_typeof_guard_narrows() {
    let src = r#"
        function g(x: number | string) {
            if (typeof x === "number") {
                const y: number = x;
            } else {
                const z: string = x;
            }
        }
    "#;
    assert_eq!(strict_codes(src), Vec::<u32>::new());
}

// ============================================================================
// Unsupported constructs
// ============================================================================

#[test]
fn test_import_type_is_unsupported() {
    assert_eq!(
        messages(r#"let x: import("m").T;"#),
        vec!["'import type' is not supported yet.".to_string()]
    );
}

// ============================================================================
// Literal types
// ============================================================================

#[test]
fn test_equal_number_literals_share_a_type() {
    let parsed = parse("test.ts", "const a = 5; const b = 5; const c = 6;", StringInterner::new());
    let ast = &parsed.ast;
    let mut bound = bind(ast);
    let mut checker = Checker::new(ast, &mut bound.scopes);
    checker.check_program(ast.root());
    assert!(checker.diagnostics().is_empty());

    let literals: Vec<_> = ast
        .ids()
        .filter(|&id| matches!(ast.kind(id), NodeKind::NumberLiteral { .. }))
        .map(|id| checker.type_of_node(id).expect("literal was checked"))
        .collect();
    assert_eq!(literals.len(), 3);
    assert_eq!(literals[0], literals[1]);
    assert_ne!(literals[0], literals[2]);
    assert_eq!(checker.type_to_string(literals[0]), "5");
}

// ============================================================================
// Handing types on
// ============================================================================

#[test]
fn test_checked_types_find_unreferenced_declarations() {
    let parsed = parse(
        "test.ts",
        "function f() { return 1; } class C { n: number = 0; }",
        StringInterner::new(),
    );
    let ast = &parsed.ast;
    let mut bound = bind(ast);
    let mut checker = Checker::new(ast, &mut bound.scopes);
    checker.check_program(ast.root());
    assert!(checker.diagnostics().is_empty());
    let types = checker.into_types();
    let table = types.table();
    let variable = |name: &str| {
        bound
            .scopes
            .variables()
            .find(|v| ast.str(v.name) == name)
            .unwrap_or_else(|| panic!("no variable {name}"))
    };

    let f = types.value_type(ast, variable("f")).expect("function type");
    let signature = &table.call_signatures(f)[0];
    let returned = types.return_type(signature);
    assert_ne!(returned, table.globals().resolving_return_type);
    assert!(table.kind(returned).is_number_like());
    assert!(types.function_node(f).is_some());

    let c = types.value_type(ast, variable("C")).expect("constructor type");
    let instance = table.construct_signatures(c)[0].return_type;
    assert_eq!(types.class_of_instance(instance), Some(c));
    assert_eq!(types.base_class(c), None);
}
