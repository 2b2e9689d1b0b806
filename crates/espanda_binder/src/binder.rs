//! The binder implementation.
//!
//! One pre-order walk over the AST. Entering a scope-introducing node
//! declares everything the scope owns before any of its children are
//! visited:
//! - `var` declarations anywhere in a function body (hoisted to the function
//!   scope)
//! - function, class, `let`/`const`, type alias and interface declarations
//!   directly in the block
//! - parameters, type parameters and catch parameters
//!
//! so references resolve regardless of declaration order. After the walk,
//! captured variables outside the global scope get lexical slots.

use espanda_ast::{Ast, NodeId, NodeKind, ScopeId, VariableDeclarationKind, VariableId};
use espanda_core::collections::{FxHashMap, FxHashSet};
use espanda_core::intern::Atom;
use espanda_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};
use smallvec::smallvec;

use crate::scope::{Scope, ScopeKind, ScopeTree};
use crate::variable::{Variable, VariableFlags, VariableKind};

/// The output of [`bind`].
#[derive(Debug)]
pub struct BindResult {
    pub scopes: ScopeTree,
    pub diagnostics: DiagnosticCollection,
}

/// Bind a whole file.
pub fn bind(ast: &Ast) -> BindResult {
    Binder::new(ast).bind_program()
}

pub struct Binder<'a> {
    ast: &'a Ast,
    tree: ScopeTree,
    current: ScopeId,
    diagnostics: DiagnosticCollection,
    /// Function scopes whose `this` is read by a nested arrow function.
    this_captures: FxHashSet<ScopeId>,
    /// Set while visiting an instance field initializer, which runs inside
    /// the class constructor rather than the function that declares it.
    field_initializer_of: Option<ScopeId>,
}

impl<'a> Binder<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            tree: ScopeTree::default(),
            current: ScopeId::INVALID,
            diagnostics: DiagnosticCollection::new(),
            this_captures: FxHashSet::default(),
            field_initializer_of: None,
        }
    }

    #[tracing::instrument(level = "debug", skip_all, fields(file = %self.ast.file_name()))]
    pub fn bind_program(mut self) -> BindResult {
        let root = self.ast.root();
        let statements = match self.ast.kind(root) {
            NodeKind::Program { statements } => statements.clone(),
            _ => Vec::new(),
        };
        self.current = self.create_scope(ScopeKind::Global, root);
        self.hoist_vars_in(&statements);
        self.declare_block(&statements);
        for statement in statements {
            self.visit(statement);
        }
        self.assign_lex_slots();

        tracing::debug!(
            scopes = self.tree.scopes.len(),
            variables = self.tree.variables.len(),
            references = self.tree.references.len(),
            "bound"
        );
        BindResult {
            scopes: self.tree,
            diagnostics: self.diagnostics,
        }
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn create_scope(&mut self, kind: ScopeKind, node: NodeId) -> ScopeId {
        let parent = self.current.is_valid().then_some(self.current);
        let id = self.tree.scopes.alloc_with(|id| Scope {
            id,
            kind,
            parent,
            node,
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            function_scope: id,
            lex_env_size: 0,
            this_slot: None,
        });
        if !matches!(kind, ScopeKind::Function | ScopeKind::Global) {
            if let Some(parent) = parent {
                self.tree.scopes[id].function_scope = self.tree.scopes[parent].function_scope;
            }
        }
        self.tree.node_scopes.insert(node, id);
        id
    }

    /// Run `f` inside a fresh scope for `node`. The previous scope is restored
    /// afterwards.
    fn with_scope<T>(&mut self, kind: ScopeKind, node: NodeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let scope = self.create_scope(kind, node);
        let saved = std::mem::replace(&mut self.current, scope);
        let result = f(self);
        self.current = saved;
        result
    }

    fn function_scope(&self) -> ScopeId {
        self.tree.scopes[self.current].function_scope
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn report(&mut self, node: NodeId, message: &DiagnosticMessage, name: Atom) {
        let text = self.ast.str(name).to_string();
        self.diagnostics.add(Diagnostic::with_location(
            self.ast.file_name(),
            self.ast.range(node).to_span(),
            message,
            &[&text],
        ));
    }

    fn new_variable(&mut self, scope: ScopeId, name: Atom, kind: VariableKind, decl: NodeId) -> VariableId {
        let mut flags = VariableFlags::empty();
        if matches!(kind, VariableKind::Var | VariableKind::Function) {
            flags |= VariableFlags::HOISTED;
        }
        if matches!(
            kind,
            VariableKind::Param | VariableKind::Function | VariableKind::Class | VariableKind::CatchParam
        ) {
            flags |= VariableFlags::INITIALIZED;
        }
        self.tree.variables.alloc_with(|id| Variable {
            id,
            name,
            kind,
            flags,
            decl,
            declarations: smallvec![decl],
            scope,
            ts_type: None,
            lex_slot: None,
        })
    }

    /// Declare `name` in the value namespace of `scope`, merging with or
    /// rejecting an existing declaration of the same name.
    fn declare_value(&mut self, scope: ScopeId, name: Atom, kind: VariableKind, decl: NodeId) -> VariableId {
        let Some(&existing) = self.tree.scopes[scope].values.get(&name) else {
            let id = self.new_variable(scope, name, kind, decl);
            self.tree.scopes[scope].values.insert(name, id);
            return id;
        };
        let existing_kind = self.tree.variables[existing].kind;
        let merges = match (existing_kind, kind) {
            (VariableKind::Var | VariableKind::Param | VariableKind::Function, VariableKind::Var) => true,
            (VariableKind::Var | VariableKind::Function, VariableKind::Function) => true,
            _ => false,
        };
        if merges {
            let variable = &mut self.tree.variables[existing];
            variable.declarations.push(decl);
            if kind == VariableKind::Function {
                variable.kind = VariableKind::Function;
                variable.flags |= VariableFlags::INITIALIZED;
            }
        } else if is_lexical(existing_kind) || is_lexical(kind) {
            self.report(decl, &messages::CANNOT_REDECLARE_BLOCK_SCOPED_VARIABLE_0, name);
        } else {
            self.report(decl, &messages::DUPLICATE_IDENTIFIER_0, name);
        }
        existing
    }

    /// Declare `name` in the type namespace of `scope`. Interfaces merge with
    /// interfaces and classes.
    fn declare_type(&mut self, scope: ScopeId, name: Atom, kind: VariableKind, decl: NodeId, value: Option<VariableId>) {
        if let Some(&existing) = self.tree.scopes[scope].types.get(&name) {
            let existing_kind = self.tree.variables[existing].kind;
            let merges = matches!(
                (existing_kind, kind),
                (VariableKind::Interface, VariableKind::Interface)
                    | (VariableKind::Class, VariableKind::Interface)
                    | (VariableKind::Interface, VariableKind::Class)
            );
            if merges {
                self.tree.variables[existing].declarations.push(decl);
            } else {
                self.report(decl, &messages::DUPLICATE_IDENTIFIER_0, name);
            }
            return;
        }
        let id = match value {
            Some(id) => id,
            None => self.new_variable(scope, name, kind, decl),
        };
        self.tree.scopes[scope].types.insert(name, id);
    }

    fn declare_bindings(&mut self, scope: ScopeId, target: NodeId, kind: VariableKind) {
        for ident in self.ast.binding_identifiers(target) {
            if let Some(name) = self.ast.identifier_name(ident) {
                let id = self.declare_value(scope, name, kind, ident);
                self.tree.references.insert(ident, id);
            }
        }
    }

    // ========================================================================
    // Hoisting
    // ========================================================================

    /// Declare every `var` in `statements` and their nested blocks in the
    /// current function scope. Does not enter nested functions or classes.
    fn hoist_vars_in(&mut self, statements: &[NodeId]) {
        for &statement in statements {
            self.hoist_vars(statement);
        }
    }

    fn hoist_vars(&mut self, node: NodeId) {
        match self.ast.kind(node) {
            NodeKind::VariableDeclaration {
                kind: VariableDeclarationKind::Var,
                declarators,
                ..
            } => {
                let scope = self.function_scope();
                for &declarator in declarators {
                    if let NodeKind::VariableDeclarator { id, .. } = self.ast.kind(declarator) {
                        self.declare_bindings(scope, *id, VariableKind::Var);
                    }
                }
            }
            NodeKind::BlockStatement { statements } => self.hoist_vars_in(statements),
            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.hoist_vars(*consequent);
                if let Some(alternate) = alternate {
                    self.hoist_vars(*alternate);
                }
            }
            NodeKind::ForUpdateStatement { init, body, .. } => {
                if let Some(init) = init {
                    self.hoist_vars(*init);
                }
                self.hoist_vars(*body);
            }
            NodeKind::ForInStatement { left, body, .. } | NodeKind::ForOfStatement { left, body, .. } => {
                self.hoist_vars(*left);
                self.hoist_vars(*body);
            }
            NodeKind::WhileStatement { body, .. }
            | NodeKind::DoWhileStatement { body, .. }
            | NodeKind::LabelledStatement { body, .. } => self.hoist_vars(*body),
            NodeKind::SwitchStatement { cases, .. } => {
                for &case in cases {
                    if let NodeKind::SwitchCaseStatement { consequent, .. } = self.ast.kind(case) {
                        self.hoist_vars_in(consequent);
                    }
                }
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.hoist_vars(*block);
                if let Some(handler) = handler {
                    if let NodeKind::CatchClause { body, .. } = self.ast.kind(*handler) {
                        self.hoist_vars(*body);
                    }
                }
                if let Some(finalizer) = finalizer {
                    self.hoist_vars(*finalizer);
                }
            }
            NodeKind::ExportNamedDeclaration { declaration } => self.hoist_vars(*declaration),
            _ => {}
        }
    }

    /// Declare the block-level declarations of `statements` in the current
    /// scope.
    fn declare_block(&mut self, statements: &[NodeId]) {
        for &statement in statements {
            self.declare_statement(statement);
        }
    }

    fn declare_statement(&mut self, node: NodeId) {
        let scope = self.current;
        match self.ast.kind(node) {
            NodeKind::VariableDeclaration { kind, declarators, .. } => {
                let kind = match kind {
                    VariableDeclarationKind::Var => return,
                    VariableDeclarationKind::Let => VariableKind::Let,
                    VariableDeclarationKind::Const => VariableKind::Const,
                };
                for &declarator in declarators {
                    if let NodeKind::VariableDeclarator { id, .. } = self.ast.kind(declarator) {
                        self.declare_bindings(scope, *id, kind);
                    }
                }
            }
            NodeKind::FunctionDeclaration { function } => {
                let id = match self.ast.kind(*function) {
                    NodeKind::ScriptFunction { id: Some(id), .. } => *id,
                    _ => return,
                };
                if let Some(name) = self.ast.identifier_name(id) {
                    let variable = self.declare_value(scope, name, VariableKind::Function, node);
                    self.tree.references.insert(id, variable);
                }
            }
            NodeKind::ClassDeclaration { definition } => {
                let id = match self.ast.kind(*definition) {
                    NodeKind::ClassDefinition { id: Some(id), .. } => *id,
                    _ => return,
                };
                if let Some(name) = self.ast.identifier_name(id) {
                    let variable = self.declare_value(scope, name, VariableKind::Class, node);
                    self.tree.references.insert(id, variable);
                    self.declare_type(scope, name, VariableKind::Class, node, Some(variable));
                }
            }
            NodeKind::TSTypeAliasDeclaration { id, .. } => {
                self.declare_type(scope, *id, VariableKind::TypeAlias, node, None);
            }
            NodeKind::TSInterfaceDeclaration { id, .. } => {
                self.declare_type(scope, *id, VariableKind::Interface, node, None);
            }
            NodeKind::ExportNamedDeclaration { declaration }
            | NodeKind::ExportDefaultDeclaration { declaration } => self.declare_statement(*declaration),
            _ => {}
        }
    }

    fn declare_type_parameters(&mut self, type_params: Option<NodeId>) {
        let Some(type_params) = type_params else {
            return;
        };
        let NodeKind::TSTypeParameterDeclaration { params } = self.ast.kind(type_params) else {
            return;
        };
        for &param in params {
            if let NodeKind::TSTypeParameter { name, .. } = self.ast.kind(param) {
                self.declare_type(self.current, *name, VariableKind::TypeParameter, param, None);
            }
        }
    }

    // ========================================================================
    // References
    // ========================================================================

    fn resolve_identifier(&mut self, node: NodeId, name: Atom) {
        if self.ast.str(name).is_empty() {
            return;
        }
        let Some(variable) = self.tree.lookup_value(self.current, name) else {
            return;
        };
        self.tree.references.insert(node, variable);
        let declaring_function = self.tree.scopes[self.tree.variables[variable].scope].function_scope;
        let crosses_function = declaring_function != self.function_scope()
            || self.field_initializer_of == Some(self.function_scope());
        if crosses_function && !self.tree.is_global(variable) {
            self.tree.variables[variable].flags |= VariableFlags::CAPTURED;
        }
    }

    /// Arrow functions have no `this` of their own: route it through the
    /// environment of the nearest enclosing non-arrow function.
    fn capture_this(&mut self) {
        let start = self.function_scope();
        let mut scope = start;
        while self.is_arrow_scope(scope) {
            let Some(parent) = self.tree.scopes[scope].parent else {
                break;
            };
            scope = self.tree.scopes[parent].function_scope;
        }
        if scope != start {
            self.tree.this_holders.insert(start, scope);
            self.this_captures.insert(scope);
        }
    }

    fn is_arrow_scope(&self, scope: ScopeId) -> bool {
        matches!(
            self.ast.kind(self.tree.scopes[scope].node),
            NodeKind::ScriptFunction { flags, .. } if flags.is_arrow()
        )
    }

    fn resolve_type_name(&mut self, node: NodeId, name: Atom) {
        // qualified names are not resolved
        if self.ast.str(name).contains('.') {
            return;
        }
        if let Some(variable) = self.tree.lookup_type(self.current, name) {
            self.tree.references.insert(node, variable);
        }
    }

    // ========================================================================
    // The walk
    // ========================================================================

    fn visit_children(&mut self, node: NodeId) {
        for child in self.ast.children(node) {
            self.visit(child);
        }
    }

    fn visit_opt(&mut self, node: Option<NodeId>) {
        if let Some(node) = node {
            self.visit(node);
        }
    }

    fn visit(&mut self, node: NodeId) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::Identifier {
                name,
                type_annotation,
                ..
            } => {
                if !self.tree.references.contains_key(&node) {
                    self.resolve_identifier(node, *name);
                }
                self.visit_opt(*type_annotation);
            }
            NodeKind::ThisExpression => self.capture_this(),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                self.visit(*object);
                if *computed {
                    self.visit(*property);
                }
            }
            NodeKind::Property {
                key, value, computed, ..
            }
            | NodeKind::MethodDefinition {
                key, value, computed, ..
            } => {
                if *computed {
                    self.visit(*key);
                }
                self.visit(*value);
            }
            NodeKind::ClassProperty {
                key,
                value,
                type_annotation,
                computed,
                is_static,
                ..
            } => {
                if *computed {
                    self.visit(*key);
                }
                self.visit_opt(*type_annotation);
                let saved = self.field_initializer_of;
                if !*is_static {
                    self.field_initializer_of = Some(self.function_scope());
                }
                self.visit_opt(*value);
                self.field_initializer_of = saved;
            }
            NodeKind::BlockStatement { statements } => {
                self.with_scope(ScopeKind::Block, node, |b| {
                    b.declare_block(statements);
                    for &statement in statements {
                        b.visit(statement);
                    }
                });
            }
            NodeKind::ScriptFunction { .. } => self.visit_function(node),
            NodeKind::ClassDefinition {
                id,
                type_params,
                super_class,
                ctor,
                body,
            } => {
                self.visit_opt(*super_class);
                let is_expression = ast
                    .parent(node)
                    .is_some_and(|p| matches!(ast.kind(p), NodeKind::ClassExpression { .. }));
                self.with_scope(ScopeKind::Class, node, |b| {
                    // a class expression's name is visible only inside it
                    if let (Some(id), true) = (*id, is_expression) {
                        if let Some(name) = ast.identifier_name(id) {
                            let variable = b.declare_value(b.current, name, VariableKind::Class, id);
                            b.tree.references.insert(id, variable);
                        }
                    }
                    b.declare_type_parameters(*type_params);
                    b.visit_opt(*type_params);
                    b.visit_opt(*ctor);
                    for &member in body {
                        b.visit(member);
                    }
                });
            }
            NodeKind::ForUpdateStatement { init: head, .. } => {
                self.with_scope(ScopeKind::Loop, node, |b| {
                    if let Some(head) = *head {
                        b.declare_statement(head);
                    }
                    b.visit_children(node);
                });
            }
            NodeKind::ForInStatement { left, .. } | NodeKind::ForOfStatement { left, .. } => {
                self.with_scope(ScopeKind::Loop, node, |b| {
                    b.declare_statement(*left);
                    b.visit_children(node);
                });
            }
            NodeKind::WhileStatement { .. } | NodeKind::DoWhileStatement { .. } => {
                self.with_scope(ScopeKind::Loop, node, |b| b.visit_children(node));
            }
            NodeKind::SwitchStatement { discriminant, cases } => {
                self.visit(*discriminant);
                self.with_scope(ScopeKind::Block, node, |b| {
                    for &case in cases {
                        if let NodeKind::SwitchCaseStatement { consequent, .. } = ast.kind(case) {
                            b.declare_block(consequent);
                        }
                    }
                    for &case in cases {
                        b.visit(case);
                    }
                });
            }
            NodeKind::CatchClause { param, body } => {
                self.with_scope(ScopeKind::Catch, node, |b| {
                    if let Some(param) = *param {
                        b.declare_bindings(b.current, param, VariableKind::CatchParam);
                        b.visit(param);
                    }
                    // the body block shares the catch scope
                    b.tree.node_scopes.insert(*body, b.current);
                    if let NodeKind::BlockStatement { statements } = ast.kind(*body) {
                        b.declare_block(statements);
                        for &statement in statements {
                            b.visit(statement);
                        }
                    }
                });
            }
            NodeKind::VariableDeclarator { id, init } => {
                if init.is_some() {
                    for ident in ast.binding_identifiers(*id) {
                        if let Some(&variable) = self.tree.references.get(&ident) {
                            self.tree.variables[variable].flags |= VariableFlags::INITIALIZED;
                        }
                    }
                }
                self.visit(*id);
                self.visit_opt(*init);
            }
            NodeKind::TSTypeAliasDeclaration {
                type_params: Some(type_params),
                ..
            }
            | NodeKind::TSInterfaceDeclaration {
                type_params: Some(type_params),
                ..
            } => {
                self.with_scope(ScopeKind::Block, node, |b| {
                    b.declare_type_parameters(Some(*type_params));
                    b.visit_children(node);
                });
            }
            NodeKind::TSTypeReference { type_name, .. } => {
                self.resolve_type_name(node, *type_name);
                self.visit_children(node);
            }
            NodeKind::TSTypeQuery { expr_name } => {
                let text = ast.str(*expr_name);
                let head = text.split('.').next().unwrap_or(text);
                self.resolve_identifier(node, ast.intern(head));
            }
            // signature parameters are names, not references
            NodeKind::TSFunctionType {
                type_params, params, ..
            }
            | NodeKind::TSConstructorType {
                type_params, params, ..
            }
            | NodeKind::TSMethodSignature {
                type_params, params, ..
            }
            | NodeKind::TSSignatureDeclaration {
                type_params, params, ..
            } => {
                self.with_scope(ScopeKind::Block, node, |b| {
                    b.declare_type_parameters(*type_params);
                    for &param in params {
                        b.declare_bindings(b.current, param, VariableKind::Param);
                    }
                    b.visit_children(node);
                });
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_function(&mut self, node: NodeId) {
        let ast = self.ast;
        let NodeKind::ScriptFunction {
            id,
            type_params,
            params,
            return_type,
            body,
            ..
        } = ast.kind(node)
        else {
            return;
        };
        self.with_scope(ScopeKind::Function, node, |b| {
            // a function expression's own name is bound inside it
            if let Some(id) = *id {
                if !b.tree.references.contains_key(&id) {
                    if let Some(name) = ast.identifier_name(id) {
                        let variable = b.declare_value(b.current, name, VariableKind::Function, id);
                        b.tree.references.insert(id, variable);
                    }
                }
            }
            b.declare_type_parameters(*type_params);
            for &param in params {
                b.declare_bindings(b.current, param, VariableKind::Param);
            }
            let block = body.and_then(|body| match ast.kind(body) {
                NodeKind::BlockStatement { statements } => Some((body, statements)),
                _ => None,
            });
            if let Some((body, statements)) = block {
                b.tree.node_scopes.insert(body, b.current);
                b.hoist_vars_in(statements);
                b.declare_block(statements);
            }

            b.visit_opt(*type_params);
            for &param in params {
                b.visit(param);
            }
            b.visit_opt(*return_type);
            match (block, *body) {
                (Some((_, statements)), _) => {
                    for &statement in statements {
                        b.visit(statement);
                    }
                }
                (None, Some(expression)) => b.visit(expression),
                (None, None) => {}
            }
        });
    }

    // ========================================================================
    // Lexical slots
    // ========================================================================

    fn assign_lex_slots(&mut self) {
        for index in 0..self.tree.variables.len() {
            let id = VariableId(index as u32);
            let variable = &self.tree.variables[id];
            if !variable.is_captured() || variable.kind.is_type_only() || self.tree.is_global(id) {
                continue;
            }
            let function_scope = self.tree.scopes[variable.scope].function_scope;
            let slot = self.tree.scopes[function_scope].lex_env_size;
            self.tree.scopes[function_scope].lex_env_size += 1;
            self.tree.variables[id].lex_slot = Some(slot);
        }
        let mut holders: Vec<ScopeId> = self.this_captures.iter().copied().collect();
        holders.sort_unstable();
        for scope in holders {
            let slot = self.tree.scopes[scope].lex_env_size;
            self.tree.scopes[scope].lex_env_size += 1;
            self.tree.scopes[scope].this_slot = Some(slot);
        }
    }
}

fn is_lexical(kind: VariableKind) -> bool {
    matches!(kind, VariableKind::Let | VariableKind::Const)
}
