//! Parser integration tests.
//!
//! Parses small TypeScript snippets and checks the shape of the resulting
//! tree and the syntax diagnostics.

use espanda_ast::{
    Ast, AstDumper, AssignmentOperator, DumpShape, Transform, BinaryOperator, FunctionFlags, KeywordType, MetaPropertyKind, NodeId,
    NodeKind, VariableDeclarationKind,
};
use espanda_core::{StringInterner, TextRange};
use espanda_parser::{parse, ParseResult};

fn parse_source(source: &str) -> ParseResult {
    parse("test.ts", source, StringInterner::new())
}

/// Parse and assert there are no diagnostics.
fn parse_ok(source: &str) -> Ast {
    let result = parse_source(source);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics for {source:?}: {:?}",
        result.diagnostics.diagnostics()
    );
    result.ast
}

fn codes(source: &str) -> Vec<u32> {
    parse_source(source)
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.code)
        .collect()
}

fn statements(ast: &Ast) -> Vec<NodeId> {
    match ast.kind(ast.root()) {
        NodeKind::Program { statements } => statements.clone(),
        other => panic!("root is {other:?}"),
    }
}

fn expression_of(ast: &Ast, statement: NodeId) -> NodeId {
    match ast.kind(statement) {
        NodeKind::ExpressionStatement { expression } => *expression,
        other => panic!("expected an expression statement, got {other:?}"),
    }
}

fn first_expression(ast: &Ast) -> NodeId {
    expression_of(ast, statements(ast)[0])
}

/// Initializer of the first declarator of the first statement.
fn first_init(ast: &Ast) -> NodeId {
    let NodeKind::VariableDeclaration { declarators, .. } = ast.kind(statements(ast)[0]) else {
        panic!("expected a variable declaration");
    };
    match ast.kind(declarators[0]) {
        NodeKind::VariableDeclarator { init: Some(init), .. } => *init,
        other => panic!("declarator without initializer: {other:?}"),
    }
}

fn type_name(ast: &Ast, id: NodeId) -> &'static str {
    ast.kind(id).type_name()
}

// ============================================================================
// Declarations
// ============================================================================

#[test]
fn test_variable_declarations() {
    let ast = parse_ok("const a = 1; let b: number = 2, c; var d;");
    let stmts = statements(&ast);
    assert_eq!(stmts.len(), 3);
    let kinds: Vec<_> = stmts
        .iter()
        .map(|&s| match ast.kind(s) {
            NodeKind::VariableDeclaration { kind, declarators, .. } => (*kind, declarators.len()),
            other => panic!("{other:?}"),
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            (VariableDeclarationKind::Const, 1),
            (VariableDeclarationKind::Let, 2),
            (VariableDeclarationKind::Var, 1),
        ]
    );
}

#[test]
fn test_statement_range_includes_semicolon() {
    let ast = parse_ok("let x = 1;");
    let range = ast.range(statements(&ast)[0]);
    assert_eq!((range.pos, range.end), (0, 10));
}

#[test]
fn test_let_as_identifier() {
    let ast = parse_ok("let = 5;");
    assert!(matches!(
        ast.kind(first_expression(&ast)),
        NodeKind::AssignmentExpression { .. }
    ));
}

#[test]
fn test_function_declaration_flags() {
    let ast = parse_ok("async function f() {} function* g() { yield 1; } async function* h() {}");
    let flags: Vec<FunctionFlags> = statements(&ast)
        .iter()
        .map(|&s| {
            let NodeKind::FunctionDeclaration { function } = ast.kind(s) else {
                panic!("not a function");
            };
            let NodeKind::ScriptFunction { flags, .. } = ast.kind(*function) else {
                panic!("not a script function");
            };
            *flags
        })
        .collect();
    assert_eq!(flags[0], FunctionFlags::ASYNC);
    assert_eq!(flags[1], FunctionFlags::GENERATOR);
    assert_eq!(flags[2], FunctionFlags::ASYNC | FunctionFlags::GENERATOR);
}

#[test]
fn test_overload_signature_is_declare() {
    let ast = parse_ok("function f(x: number): void;\nfunction f(x: any) {}");
    let NodeKind::FunctionDeclaration { function } = ast.kind(statements(&ast)[0]) else {
        panic!();
    };
    let NodeKind::ScriptFunction { body, flags, .. } = ast.kind(*function) else {
        panic!();
    };
    assert!(body.is_none());
    assert!(flags.contains(FunctionFlags::DECLARE));
}

#[test]
fn test_class_members() {
    let ast = parse_ok(
        "class A extends B {\n\
         constructor(private x: number) { super(); }\n\
         m() {}\n\
         static s = 1;\n\
         get g() { return 1; }\n\
         }",
    );
    let NodeKind::ClassDeclaration { definition } = ast.kind(statements(&ast)[0]) else {
        panic!();
    };
    let NodeKind::ClassDefinition {
        super_class,
        ctor,
        body,
        ..
    } = ast.kind(*definition)
    else {
        panic!();
    };
    assert!(super_class.is_some());
    assert!(ctor.is_some());
    let kinds: Vec<_> = body.iter().map(|&m| type_name(&ast, m)).collect();
    assert_eq!(kinds, vec!["MethodDefinition", "ClassProperty", "MethodDefinition"]);
}

#[test]
fn test_interface_declaration() {
    let ast = parse_ok(
        "interface P extends Q { x: number; readonly y?: string; m(a: number): void; [k: string]: any }",
    );
    let NodeKind::TSInterfaceDeclaration { extends, body, .. } = ast.kind(statements(&ast)[0]) else {
        panic!();
    };
    assert_eq!(extends.len(), 1);
    let kinds: Vec<_> = body.iter().map(|&m| type_name(&ast, m)).collect();
    assert_eq!(
        kinds,
        vec![
            "TSPropertySignature",
            "TSPropertySignature",
            "TSMethodSignature",
            "TSIndexSignature"
        ]
    );
    assert!(matches!(
        ast.kind(body[1]),
        NodeKind::TSPropertySignature {
            optional: true,
            readonly: true,
            ..
        }
    ));
}

#[test]
fn test_type_alias_union() {
    let ast = parse_ok("type U = string | 1 | \"a\"[];");
    let NodeKind::TSTypeAliasDeclaration { type_annotation, .. } = ast.kind(statements(&ast)[0]) else {
        panic!();
    };
    let NodeKind::TSUnionType { types } = ast.kind(*type_annotation) else {
        panic!();
    };
    assert!(matches!(
        ast.kind(types[0]),
        NodeKind::TSKeywordType {
            keyword: KeywordType::String
        }
    ));
    assert_eq!(type_name(&ast, types[1]), "TSLiteralType");
    assert_eq!(type_name(&ast, types[2]), "TSArrayType");
}

#[test]
fn test_function_type_and_predicate() {
    let ast = parse_ok("let f: (a: number) => void;\nfunction isStr(x: any): x is string { return true; }");
    let stmts = statements(&ast);
    let NodeKind::VariableDeclaration { declarators, .. } = ast.kind(stmts[0]) else {
        panic!();
    };
    let NodeKind::VariableDeclarator { id, .. } = ast.kind(declarators[0]) else {
        panic!();
    };
    let NodeKind::Identifier {
        type_annotation: Some(annotation),
        ..
    } = ast.kind(*id)
    else {
        panic!();
    };
    assert_eq!(type_name(&ast, *annotation), "TSFunctionType");

    let NodeKind::FunctionDeclaration { function } = ast.kind(stmts[1]) else {
        panic!();
    };
    let NodeKind::ScriptFunction {
        return_type: Some(return_type),
        ..
    } = ast.kind(*function)
    else {
        panic!();
    };
    assert_eq!(type_name(&ast, *return_type), "TSTypePredicate");
}

// ============================================================================
// Expressions
// ============================================================================

#[test]
fn test_binary_precedence() {
    let ast = parse_ok("1 + 2 * 3;");
    let NodeKind::BinaryExpression { operator, right, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert_eq!(*operator, BinaryOperator::Add);
    assert!(matches!(
        ast.kind(*right),
        NodeKind::BinaryExpression {
            operator: BinaryOperator::Mul,
            ..
        }
    ));
}

#[test]
fn test_exponent_is_right_associative() {
    let ast = parse_ok("2 ** 3 ** 2;");
    let NodeKind::BinaryExpression { left, right, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert_eq!(type_name(&ast, *left), "NumberLiteral");
    assert!(matches!(
        ast.kind(*right),
        NodeKind::BinaryExpression {
            operator: BinaryOperator::Exp,
            ..
        }
    ));
}

#[test]
fn test_greater_than_rescans() {
    let ast = parse_ok("a >>> b >= c;");
    let NodeKind::BinaryExpression { operator, left, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert_eq!(*operator, BinaryOperator::GtEq);
    assert!(matches!(
        ast.kind(*left),
        NodeKind::BinaryExpression {
            operator: BinaryOperator::UShr,
            ..
        }
    ));

    let ast = parse_ok("x >>= 1;");
    assert!(matches!(
        ast.kind(first_expression(&ast)),
        NodeKind::AssignmentExpression {
            operator: AssignmentOperator::ShrAssign,
            ..
        }
    ));
}

#[test]
fn test_less_than_is_not_a_generic_call() {
    let ast = parse_ok("a < b;");
    assert!(matches!(
        ast.kind(first_expression(&ast)),
        NodeKind::BinaryExpression {
            operator: BinaryOperator::Lt,
            ..
        }
    ));
}

#[test]
fn test_generic_call() {
    let ast = parse_ok("f<number>(1);");
    let NodeKind::CallExpression { type_args, arguments, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert_eq!((type_args.len(), arguments.len()), (1, 1));
}

#[test]
fn test_arrow_functions() {
    let ast = parse_ok("const f = (a: number, b) => a + b;");
    let NodeKind::ArrowFunctionExpression { function } = ast.kind(first_init(&ast)) else {
        panic!();
    };
    let NodeKind::ScriptFunction { params, flags, .. } = ast.kind(*function) else {
        panic!();
    };
    assert_eq!(params.len(), 2);
    assert_eq!(*flags, FunctionFlags::ARROW | FunctionFlags::EXPRESSION_BODY);

    let ast = parse_ok("const g = async x => { await x; };");
    let NodeKind::ArrowFunctionExpression { function } = ast.kind(first_init(&ast)) else {
        panic!();
    };
    let NodeKind::ScriptFunction { flags, .. } = ast.kind(*function) else {
        panic!();
    };
    assert_eq!(*flags, FunctionFlags::ARROW | FunctionFlags::ASYNC);
}

#[test]
fn test_parenthesized_expression_is_not_arrow() {
    let ast = parse_ok("(a, b);");
    assert_eq!(type_name(&ast, first_expression(&ast)), "SequenceExpression");

    let ast = parse_ok("a ? (b) : c;");
    assert_eq!(type_name(&ast, first_expression(&ast)), "ConditionalExpression");
}

#[test]
fn test_array_destructuring_assignment() {
    let ast = parse_ok("[a, , ...b] = c;");
    let NodeKind::AssignmentExpression { left, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    let NodeKind::ArrayPattern { elements, .. } = ast.kind(*left) else {
        panic!("left is {:?}", ast.kind(*left));
    };
    let kinds: Vec<_> = elements.iter().map(|&e| type_name(&ast, e)).collect();
    assert_eq!(kinds, vec!["Identifier", "OmittedExpression", "RestElement"]);
}

#[test]
fn test_object_destructuring_with_default() {
    let ast = parse_ok("({ a, b = 1 } = obj);");
    let NodeKind::AssignmentExpression { left, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    let NodeKind::ObjectPattern { properties, .. } = ast.kind(*left) else {
        panic!();
    };
    let NodeKind::Property { value, shorthand, .. } = ast.kind(properties[1]) else {
        panic!();
    };
    assert!(shorthand);
    assert_eq!(type_name(&ast, *value), "AssignmentPattern");
}

#[test]
fn test_optional_chain() {
    let ast = parse_ok("a?.b?.(c);");
    let NodeKind::CallExpression { callee, optional, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert!(optional);
    assert!(matches!(
        ast.kind(*callee),
        NodeKind::MemberExpression { optional: true, .. }
    ));
}

#[test]
fn test_new_expression() {
    let ast = parse_ok("new Foo(a, b).bar; new Foo;");
    let stmts = statements(&ast);
    let NodeKind::MemberExpression { object, .. } = ast.kind(expression_of(&ast, stmts[0])) else {
        panic!();
    };
    let NodeKind::NewExpression { arguments, .. } = ast.kind(*object) else {
        panic!();
    };
    assert_eq!(arguments.len(), 2);
    let NodeKind::NewExpression { arguments, .. } = ast.kind(expression_of(&ast, stmts[1])) else {
        panic!();
    };
    assert!(arguments.is_empty());
}

#[test]
fn test_meta_properties() {
    let ast = parse_ok("function F() { new.target; }");
    let meta = ast
        .ids()
        .find(|&id| matches!(ast.kind(id), NodeKind::MetaProperty { .. }))
        .expect("meta property");
    assert!(matches!(
        ast.kind(meta),
        NodeKind::MetaProperty {
            kind: MetaPropertyKind::NewTarget
        }
    ));
}

#[test]
fn test_template_literal() {
    let ast = parse_ok("`a${x}b${y}c`;");
    let NodeKind::TemplateLiteral { quasis, expressions } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    let quasis: Vec<_> = quasis.iter().map(|&q| ast.str(q).to_string()).collect();
    assert_eq!(quasis, vec!["a", "b", "c"]);
    assert_eq!(expressions.len(), 2);
}

#[test]
fn test_regex_literal() {
    let ast = parse_ok("x = /ab+c/gi;");
    let NodeKind::AssignmentExpression { right, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    let NodeKind::RegExpLiteral { pattern, flags } = ast.kind(*right) else {
        panic!();
    };
    assert_eq!((ast.str(*pattern), ast.str(*flags)), ("ab+c", "gi"));
}

#[test]
fn test_as_const_and_non_null() {
    let ast = parse_ok("const x = [1, 2] as const;");
    let NodeKind::TSAsExpression { type_annotation, .. } = ast.kind(first_init(&ast)) else {
        panic!();
    };
    let NodeKind::TSTypeReference { type_name: name, .. } = ast.kind(*type_annotation) else {
        panic!();
    };
    assert_eq!(ast.str(*name), "const");

    let ast = parse_ok("x!.y;");
    let NodeKind::MemberExpression { object, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    assert_eq!(type_name(&ast, *object), "TSNonNullExpression");
}

#[test]
fn test_object_literal_members() {
    let ast = parse_ok("o = { a: 1, b, [c]: 2, m() {}, get g() { return 1; }, ...rest };");
    let NodeKind::AssignmentExpression { right, .. } = ast.kind(first_expression(&ast)) else {
        panic!();
    };
    let NodeKind::ObjectExpression { properties } = ast.kind(*right) else {
        panic!();
    };
    assert_eq!(properties.len(), 6);
    assert_eq!(type_name(&ast, properties[5]), "SpreadElement");
    assert!(matches!(
        ast.kind(properties[2]),
        NodeKind::Property { computed: true, .. }
    ));
}

// ============================================================================
// Statements and ASI
// ============================================================================

#[test]
fn test_automatic_semicolon_insertion() {
    let ast = parse_ok("let a = 1\nlet b = 2\na\n++b");
    assert_eq!(statements(&ast).len(), 4);
}

#[test]
fn test_for_variants() {
    let ast = parse_ok(
        "for (let i = 0; i < 3; i++) {}\nfor (const k in o) {}\nfor (const v of xs) {}\nfor (;;) { break; }",
    );
    let kinds: Vec<_> = statements(&ast).iter().map(|&s| type_name(&ast, s)).collect();
    assert_eq!(
        kinds,
        vec![
            "ForUpdateStatement",
            "ForInStatement",
            "ForOfStatement",
            "ForUpdateStatement"
        ]
    );
}

#[test]
fn test_in_operator_inside_for_init_parens() {
    let ast = parse_ok("for (let x = (a in b); x; ) {}");
    assert_eq!(type_name(&ast, statements(&ast)[0]), "ForUpdateStatement");
}

#[test]
fn test_labelled_continue_is_valid() {
    parse_ok("outer: for (;;) { for (;;) { continue outer; } }");
    parse_ok("a: b: while (true) { continue a; }");
}

#[test]
fn test_try_catch_finally() {
    let ast = parse_ok("try { f(); } catch (e) { g(e); } finally { h(); }");
    let NodeKind::TryStatement {
        handler, finalizer, ..
    } = ast.kind(statements(&ast)[0])
    else {
        panic!();
    };
    assert!(handler.is_some() && finalizer.is_some());
}

#[test]
fn test_switch_cases() {
    let ast = parse_ok("switch (x) { case 1: a(); break; default: b(); }");
    let NodeKind::SwitchStatement { cases, .. } = ast.kind(statements(&ast)[0]) else {
        panic!();
    };
    assert_eq!(cases.len(), 2);
    assert!(matches!(
        ast.kind(cases[1]),
        NodeKind::SwitchCaseStatement { test: None, .. }
    ));
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_break_and_continue_outside_loop() {
    assert_eq!(codes("break;"), vec![1105]);
    assert_eq!(codes("continue;"), vec![1104]);
    assert_eq!(codes("l: { continue l; }"), vec![1115]);
    assert_eq!(codes("while (x) { break missing; }"), vec![1116]);
}

#[test]
fn test_return_outside_function() {
    assert_eq!(codes("return 1;"), vec![1108]);
}

#[test]
fn test_const_without_initializer() {
    assert_eq!(codes("const x;"), vec![1155]);
    assert!(codes("declare const y: number;").is_empty());
}

#[test]
fn test_duplicate_label() {
    assert_eq!(codes("a: a: x;"), vec![1114]);
}

#[test]
fn test_missing_expression() {
    assert_eq!(codes("let x = ;"), vec![1109]);
}

#[test]
fn test_rest_parameter_must_be_last() {
    assert_eq!(codes("function f(...a, b) {}"), vec![1014]);
}

#[test]
fn test_await_outside_async() {
    assert_eq!(codes("function f() { await x; }"), vec![1308]);
    assert!(codes("async function f() { await x; }").is_empty());
}

#[test]
fn test_unsupported_features() {
    for source in [
        "enum E { A }",
        "import x from \"y\";",
        "namespace N {}",
        "let k: keyof T;",
        "f`tagged`;",
    ] {
        assert_eq!(codes(source), vec![9001], "{source}");
    }
}

#[test]
fn test_recovery_reports_every_error() {
    let codes = codes("let = = 1;\nbreak;\nreturn;");
    assert!(codes.contains(&1105));
    assert!(codes.contains(&1108));
}

#[test]
fn test_deep_nesting_is_reported() {
    let source = format!("{}1{};", "(".repeat(300), ")".repeat(300));
    let codes = std::thread::Builder::new()
        .stack_size(256 << 20)
        .spawn(move || codes(&source))
        .expect("spawn")
        .join()
        .expect("join");
    assert!(codes.contains(&1999));
}

// ============================================================================
// Traversal and dumps
// ============================================================================

#[test]
fn test_iterate_visits_children_in_source_order() {
    let ast = parse_ok("if (a) b; else c;");
    let NodeKind::IfStatement { test, consequent, alternate } = ast.kind(statements(&ast)[0]).clone() else {
        panic!("expected an if statement");
    };
    let mut seen = Vec::new();
    ast.iterate(statements(&ast)[0], |child| seen.push(child));
    assert_eq!(seen, vec![test, consequent, alternate.unwrap()]);
    for child in seen {
        assert_eq!(ast.parent(child), Some(statements(&ast)[0]));
    }
}

#[test]
fn test_update_self_splice_repoints_parents() {
    let mut ast = parse_ok("a; b; c;");
    let root = ast.root();
    let old = statements(&ast);
    let revision = ast.revision();

    let mut inserted = Vec::new();
    ast.update_self(root, |ast, child| {
        if child == old[1] {
            let first = ast.alloc(NodeKind::EmptyStatement, TextRange::default());
            let second = ast.alloc(NodeKind::EmptyStatement, TextRange::default());
            inserted = vec![first, second];
            Transform::Splice(inserted.clone())
        } else {
            Transform::Keep
        }
    });

    let new = statements(&ast);
    assert_eq!(new, vec![old[0], inserted[0], inserted[1], old[2]]);
    for &statement in &new {
        assert_eq!(ast.parent(statement), Some(root));
    }
    assert_eq!(ast.parent(old[1]), None);
    assert!(ast.revision() > revision);
}

#[test]
fn test_update_self_removes_optional_child() {
    let mut ast = parse_ok("if (a) b; else c;");
    let statement = statements(&ast)[0];
    let NodeKind::IfStatement { alternate, .. } = ast.kind(statement).clone() else {
        panic!("expected an if statement");
    };
    let alternate = alternate.unwrap();
    ast.update_self(statement, |_, child| {
        if child == alternate {
            Transform::Remove
        } else {
            Transform::Keep
        }
    });
    assert!(matches!(ast.kind(statement), NodeKind::IfStatement { alternate: None, .. }));
    assert_eq!(ast.children(statement).len(), 2);
}

#[test]
#[should_panic(expected = "is required")]
fn test_update_self_removing_required_child_panics() {
    let mut ast = parse_ok("if (a) b;");
    let statement = statements(&ast)[0];
    ast.update_self(statement, |_, _| Transform::Remove);
}

#[test]
fn test_dump_shape_round_trips() {
    let ast = parse_ok(
        "function f(a: number, ...rest: string[]): number { return a; }\n\
         class C extends Base { x = 1; m() { return [1, , 2]; } }\n\
         for (const [k, v] of items) { if (!k) continue; }\n\
         type T<U> = { a: U } | string[];",
    );
    let root = ast.root();
    let dumped = AstDumper::new(&ast).dump_to_string(root);
    let shape = DumpShape::parse(&dumped).unwrap();
    assert_eq!(shape, DumpShape::of(&ast, root));
    assert_eq!(shape.kind, "Program");
}

#[test]
fn test_dump_shape_rejects_non_nodes() {
    assert!(DumpShape::parse("[1, 2]").is_err());
    assert!(DumpShape::parse(r#"{ "loc": {} }"#).is_err());
}
