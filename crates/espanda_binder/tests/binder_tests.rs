//! Binder integration tests.
//!
//! Tests the parse -> bind pipeline: scopes, declarations, redeclaration
//! errors, reference resolution and capture analysis.

use espanda_ast::{Ast, NodeId, NodeKind};
use espanda_binder::{bind, BindResult, ScopeKind, ScopeTree, Variable, VariableFlags, VariableKind};
use espanda_core::StringInterner;
use espanda_parser::parse;

fn bind_source(source: &str) -> (Ast, BindResult) {
    let parsed = parse("test.ts", source, StringInterner::new());
    assert!(
        parsed.diagnostics.is_empty(),
        "unexpected syntax errors: {:?}",
        parsed.diagnostics.diagnostics()
    );
    let result = bind(&parsed.ast);
    (parsed.ast, result)
}

fn codes(source: &str) -> Vec<u32> {
    let (_, result) = bind_source(source);
    result.diagnostics.diagnostics().iter().map(|d| d.code).collect()
}

/// Every variable declared with `name`, in declaration order.
fn variables_named<'t>(ast: &Ast, tree: &'t ScopeTree, name: &str) -> Vec<&'t Variable> {
    tree.variables().filter(|v| ast.str(v.name) == name).collect()
}

fn variable<'t>(ast: &Ast, tree: &'t ScopeTree, name: &str) -> &'t Variable {
    let found = variables_named(ast, tree, name);
    assert_eq!(found.len(), 1, "expected exactly one variable named {name}");
    found[0]
}

/// `Identifier` nodes spelled `name`, in allocation order.
fn identifiers(ast: &Ast, name: &str) -> Vec<NodeId> {
    ast.ids()
        .filter(|&id| matches!(ast.kind(id), NodeKind::Identifier { name: n, .. } if ast.str(*n) == name))
        .collect()
}

fn function_named(ast: &Ast, name: &str) -> NodeId {
    ast.ids()
        .find(|&id| match ast.kind(id) {
            NodeKind::ScriptFunction { id: Some(ident), .. } => {
                ast.identifier_name(*ident).is_some_and(|n| ast.str(n) == name)
            }
            _ => false,
        })
        .unwrap_or_else(|| panic!("no function named {name}"))
}

// ============================================================================
// Scopes
// ============================================================================

#[test]
fn test_global_scope_is_first() {
    let (ast, result) = bind_source("let a = 1;");
    let tree = &result.scopes;
    let global = tree.global_scope();
    assert_eq!(tree.scope(global).kind, ScopeKind::Global);
    assert_eq!(tree.scope(global).parent, None);
    assert_eq!(tree.scope_of(ast.root()), Some(global));
    assert_eq!(variable(&ast, tree, "a").scope, global);
}

#[test]
fn test_function_body_shares_function_scope() {
    let (ast, result) = bind_source("function f(p) { let local = p; }");
    let tree = &result.scopes;
    let f = function_named(&ast, "f");
    let scope = tree.scope_of(f).expect("function scope");
    assert_eq!(tree.scope(scope).kind, ScopeKind::Function);
    let NodeKind::ScriptFunction { body: Some(body), .. } = ast.kind(f) else {
        panic!("function without body");
    };
    assert_eq!(tree.scope_of(*body), Some(scope));
    assert_eq!(variable(&ast, tree, "p").scope, scope);
    assert_eq!(variable(&ast, tree, "local").scope, scope);
    assert_eq!(variable(&ast, tree, "p").kind, VariableKind::Param);
}

#[test]
fn test_block_scope_for_let() {
    let (ast, result) = bind_source("{ let inner = 1; }");
    let tree = &result.scopes;
    let inner = variable(&ast, tree, "inner");
    assert_eq!(tree.scope(inner.scope).kind, ScopeKind::Block);
    assert_eq!(tree.scope(inner.scope).function_scope, tree.global_scope());
}

#[test]
fn test_loop_scope_for_loop_head() {
    let (ast, result) = bind_source("for (let i = 0; i < 3; i++) {}");
    let tree = &result.scopes;
    let i = variable(&ast, tree, "i");
    assert_eq!(tree.scope(i.scope).kind, ScopeKind::Loop);
    for ident in identifiers(&ast, "i") {
        assert_eq!(tree.reference(ident), Some(i.id));
    }
}

#[test]
fn test_catch_scope() {
    let (ast, result) = bind_source("try { } catch (e) { e; }");
    let tree = &result.scopes;
    let e = variable(&ast, tree, "e");
    assert_eq!(e.kind, VariableKind::CatchParam);
    assert_eq!(tree.scope(e.scope).kind, ScopeKind::Catch);

    let clause = ast
        .ids()
        .find(|&id| matches!(ast.kind(id), NodeKind::CatchClause { .. }))
        .expect("catch clause");
    let NodeKind::CatchClause { body, .. } = ast.kind(clause) else {
        unreachable!()
    };
    assert_eq!(tree.scope_of(*body), Some(e.scope));
    for ident in identifiers(&ast, "e") {
        assert_eq!(tree.reference(ident), Some(e.id));
    }
}

// ============================================================================
// Hoisting
// ============================================================================

#[test]
fn test_var_hoists_to_function_scope() {
    let (ast, result) = bind_source("function f(c) { if (c) { var a = 1; } return a; }");
    let tree = &result.scopes;
    let a = variable(&ast, tree, "a");
    assert_eq!(a.kind, VariableKind::Var);
    assert!(a.flags.contains(VariableFlags::HOISTED));
    assert_eq!(Some(a.scope), tree.scope_of(function_named(&ast, "f")));

    let uses = identifiers(&ast, "a");
    assert_eq!(uses.len(), 2);
    for ident in uses {
        assert_eq!(tree.reference(ident), Some(a.id));
    }
}

#[test]
fn test_use_before_declaration_resolves() {
    let (ast, result) = bind_source("g(); function g() { return h; } let h = 1;");
    let tree = &result.scopes;
    let g = variable(&ast, tree, "g");
    let h = variable(&ast, tree, "h");
    assert_eq!(g.kind, VariableKind::Function);
    for ident in identifiers(&ast, "g") {
        assert_eq!(tree.reference(ident), Some(g.id));
    }
    for ident in identifiers(&ast, "h") {
        assert_eq!(tree.reference(ident), Some(h.id));
    }
}

#[test]
fn test_var_does_not_escape_function() {
    let (ast, result) = bind_source("function f() { var hidden = 1; } hidden;");
    let tree = &result.scopes;
    let hidden = variable(&ast, tree, "hidden");
    let uses = identifiers(&ast, "hidden");
    assert_eq!(tree.reference(uses[0]), Some(hidden.id));
    // the global use is unresolved
    assert_eq!(tree.reference(uses[1]), None);
}

#[test]
fn test_initialized_flag() {
    let (ast, result) = bind_source("let a; let b = 1;");
    let tree = &result.scopes;
    assert!(!variable(&ast, tree, "a").flags.contains(VariableFlags::INITIALIZED));
    assert!(variable(&ast, tree, "b").flags.contains(VariableFlags::INITIALIZED));
}

#[test]
fn test_destructuring_declares_every_name() {
    let (ast, result) = bind_source("const { a, b: [c, ...d], e = 1 } = obj;");
    let tree = &result.scopes;
    for name in ["a", "c", "d", "e"] {
        assert_eq!(variable(&ast, tree, name).kind, VariableKind::Const, "{name}");
    }
    assert!(variables_named(&ast, tree, "b").is_empty());
}

// ============================================================================
// Redeclaration
// ============================================================================

#[test]
fn test_let_let_is_block_scoped_redeclaration() {
    assert_eq!(codes("let a = 1; let a = 2;"), vec![2451]);
}

#[test]
fn test_let_var_is_block_scoped_redeclaration() {
    assert_eq!(codes("let a = 1; var a = 2;"), vec![2451]);
    assert_eq!(codes("{ var b; } const b = 1;"), vec![2451]);
}

#[test]
fn test_duplicate_identifier() {
    assert_eq!(codes("var C; class C {}"), vec![2300]);
    assert_eq!(codes("type T = number; type T = string;"), vec![2300]);
}

#[test]
fn test_allowed_redeclarations() {
    assert!(codes("var a; var a;").is_empty());
    assert!(codes("function f() {} function f() {}").is_empty());
    assert!(codes("var g; function g() {}").is_empty());
    assert!(codes("function h(p) { var p; }").is_empty());
}

#[test]
fn test_var_redeclaration_merges() {
    let (ast, result) = bind_source("var a = 1; var a = 2;");
    let a = variable(&ast, &result.scopes, "a");
    assert_eq!(a.declarations.len(), 2);
}

#[test]
fn test_shadowing_in_inner_block_is_fine() {
    assert!(codes("let x = 1; { let x = 2; }").is_empty());
}

#[test]
fn test_interfaces_merge() {
    let (ast, result) = bind_source("interface I { a: number } interface I { b: string }");
    assert!(result.diagnostics.is_empty());
    let i = variable(&ast, &result.scopes, "I");
    assert_eq!(i.kind, VariableKind::Interface);
    assert_eq!(i.declarations.len(), 2);
}

// ============================================================================
// References
// ============================================================================

#[test]
fn test_shadowing_resolves_to_innermost() {
    let (ast, result) = bind_source("let x = 1; { let x = 2; x; }");
    let tree = &result.scopes;
    let vars = variables_named(&ast, tree, "x");
    assert_eq!(vars.len(), 2);
    let inner = vars.iter().find(|v| v.scope != tree.global_scope()).expect("inner x");
    let last_use = *identifiers(&ast, "x").last().expect("use of x");
    assert_eq!(tree.reference(last_use), Some(inner.id));
}

#[test]
fn test_type_and_value_namespaces_are_separate() {
    let (ast, result) = bind_source("type T = number; let T = 1; let v: T = T;");
    assert!(result.diagnostics.is_empty());
    let tree = &result.scopes;
    let vars = variables_named(&ast, tree, "T");
    let alias = vars.iter().find(|v| v.kind == VariableKind::TypeAlias).expect("alias");
    let value = vars.iter().find(|v| v.kind == VariableKind::Let).expect("value");

    let reference = ast
        .ids()
        .find(|&id| matches!(ast.kind(id), NodeKind::TSTypeReference { .. }))
        .expect("type reference");
    assert_eq!(tree.reference(reference), Some(alias.id));
    let use_site = *identifiers(&ast, "T").last().expect("value use");
    assert_eq!(tree.reference(use_site), Some(value.id));
}

#[test]
fn test_class_lives_in_both_namespaces() {
    let (ast, result) = bind_source("class Point {} let p: Point = new Point();");
    let tree = &result.scopes;
    let point = variable(&ast, tree, "Point");
    assert_eq!(point.kind, VariableKind::Class);
    assert_eq!(tree.lookup_type(tree.global_scope(), point.name), Some(point.id));
    assert_eq!(tree.lookup_value(tree.global_scope(), point.name), Some(point.id));
}

#[test]
fn test_member_names_are_not_references() {
    let (ast, result) = bind_source("let length = 1; let o = { length: 2 }; o.length;");
    let tree = &result.scopes;
    let length = variable(&ast, tree, "length");
    let idents = identifiers(&ast, "length");
    let resolved: Vec<_> = idents.iter().filter(|&&id| tree.reference(id).is_some()).collect();
    assert_eq!(resolved.len(), 1);
    assert_eq!(tree.reference(*resolved[0]), Some(length.id));
}

#[test]
fn test_parameter_default_sees_earlier_parameter() {
    let (ast, result) = bind_source("function f(a, b = a) { return b; }");
    let tree = &result.scopes;
    let a = variable(&ast, tree, "a");
    for ident in identifiers(&ast, "a") {
        assert_eq!(tree.reference(ident), Some(a.id));
    }
}

#[test]
fn test_named_function_expression_binds_inside() {
    let (ast, result) = bind_source("const f = function g() { return g; };");
    let tree = &result.scopes;
    let g = variable(&ast, tree, "g");
    assert_eq!(Some(g.scope), tree.scope_of(function_named(&ast, "g")));
    assert_eq!(tree.lookup_value(tree.global_scope(), g.name), None);
    for ident in identifiers(&ast, "g") {
        assert_eq!(tree.reference(ident), Some(g.id));
    }
}

#[test]
fn test_type_parameters_resolve() {
    let (ast, result) = bind_source("function id<T>(x: T): T { return x; }");
    let tree = &result.scopes;
    let t = variable(&ast, tree, "T");
    assert_eq!(t.kind, VariableKind::TypeParameter);
    let refs: Vec<_> = ast
        .ids()
        .filter(|&id| matches!(ast.kind(id), NodeKind::TSTypeReference { .. }))
        .collect();
    assert_eq!(refs.len(), 2);
    for reference in refs {
        assert_eq!(tree.reference(reference), Some(t.id));
    }
}

#[test]
fn test_signature_parameters_are_not_references() {
    let (ast, result) = bind_source("let x = 1; let cb: (x: number) => void;");
    let tree = &result.scopes;
    let outer = variables_named(&ast, tree, "x")
        .into_iter()
        .find(|v| v.kind == VariableKind::Let)
        .expect("outer x");
    let signature_param = identifiers(&ast, "x")[1];
    assert_ne!(tree.reference(signature_param), Some(outer.id));
}

// ============================================================================
// Capture analysis
// ============================================================================

#[test]
fn test_captured_local_gets_slot() {
    let (ast, result) = bind_source("function outer() { let x = 1; let y = 2; return () => x + y; }");
    let tree = &result.scopes;
    let x = variable(&ast, tree, "x");
    let y = variable(&ast, tree, "y");
    assert!(x.is_captured());
    assert_eq!(x.lex_slot, Some(0));
    assert_eq!(y.lex_slot, Some(1));
    let outer = tree.scope_of(function_named(&ast, "outer")).expect("outer scope");
    assert_eq!(tree.scope(outer).lex_env_size, 2);
}

#[test]
fn test_uncaptured_local_has_no_slot() {
    let (ast, result) = bind_source("function f() { let x = 1; return x; }");
    let x = variable(&ast, &result.scopes, "x");
    assert!(!x.is_captured());
    assert_eq!(x.lex_slot, None);
}

#[test]
fn test_globals_are_never_captured() {
    let (ast, result) = bind_source("let g = 1; function f() { return g; }");
    let tree = &result.scopes;
    let g = variable(&ast, tree, "g");
    assert!(!g.is_captured());
    assert_eq!(g.lex_slot, None);
    assert_eq!(tree.scope(tree.global_scope()).lex_env_size, 0);
}

#[test]
fn test_lex_address_skips_functions_without_environment() {
    let source = "function a() { let x = 0; function b() { let y = 0; function c() { return x + y; } } }";
    let (ast, result) = bind_source(source);
    let tree = &result.scopes;
    let x = variable(&ast, tree, "x");
    let y = variable(&ast, tree, "y");
    let c = tree.scope_of(function_named(&ast, "c")).expect("c scope");
    let b = tree.scope_of(function_named(&ast, "b")).expect("b scope");

    assert_eq!(tree.lex_address(c, y.id), Some((0, 0)));
    assert_eq!(tree.lex_address(c, x.id), Some((1, 0)));
    assert_eq!(tree.lex_address(b, x.id), Some((1, 0)));
}

#[test]
fn test_arrow_this_lives_in_enclosing_function() {
    let source = "function outer() { let n = 1; const f = () => () => this.v + n; }";
    let (ast, result) = bind_source(source);
    let tree = &result.scopes;
    let arrows: Vec<NodeId> = ast
        .ids()
        .filter(|&id| matches!(ast.kind(id), NodeKind::ScriptFunction { flags, .. } if flags.is_arrow()))
        .collect();
    assert_eq!(arrows.len(), 2);
    let outer = tree.scope_of(function_named(&ast, "outer")).expect("outer scope");
    // slot 0 is the captured `n`, `this` is appended after it
    assert_eq!(tree.scope(outer).this_slot, Some(1));
    assert_eq!(tree.scope(outer).lex_env_size, 2);
    let inner = tree.scope_of(arrows[0]).expect("inner arrow scope");
    assert_eq!(tree.this_address(inner), Some((0, 1)));
    assert_eq!(tree.this_address(outer), None);
}

#[test]
fn test_captured_parameter() {
    let (ast, result) = bind_source("function make(n) { return function () { return n; }; }");
    let n = variable(&ast, &result.scopes, "n");
    assert!(n.is_captured());
    assert_eq!(n.lex_slot, Some(0));
}
