//! The type checker.
//!
//! Walks one bound [`Ast`], computes a [`TypeId`] for every expression and
//! reports type errors. A failed check records its diagnostic and continues
//! with `any`.
//!
//! Declared types are resolved lazily. A variable, alias, interface or class
//! gets its type the first time anything asks for it; the binder's reference
//! table links every use to its declaration, so resolution order does not
//! depend on source order. Expression results are memoized in the
//! [`NodeCache`], which also makes every expression report its errors once.

use espanda_ast::{
    Ast, FunctionFlags, MethodKind, NodeId, NodeKind, ScopeId, TypeId, VariableDeclarationKind, VariableId,
};
use espanda_binder::{ScopeTree, VariableKind};
use espanda_core::collections::{FxHashMap, FxHashSet};
use espanda_core::Atom;
use espanda_diagnostics::{messages, Diagnostic, DiagnosticCollection, DiagnosticMessage};

use crate::checked::CheckedTypes;
use crate::display::type_to_string;
use crate::node_cache::NodeCache;
use crate::relation::TypeRelation;
use crate::types::{ObjectDescriptor, ObjectKind, ObjectType, Property, Signature, TypeKind, TypeTable};

/// The function whose body is being checked.
#[derive(Debug, Clone)]
pub(crate) struct FunctionContext {
    pub node: NodeId,
    pub flags: FunctionFlags,
    pub declared_return: Option<TypeId>,
}

/// The two types a class declaration produces.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassTypes {
    pub instance: TypeId,
    pub constructor: TypeId,
    pub base_instance: Option<TypeId>,
    pub base_constructor: Option<TypeId>,
}

/// The class whose body is being checked.
#[derive(Debug, Clone)]
pub(crate) struct ClassContext {
    pub definition: NodeId,
    pub types: ClassTypes,
    /// Length of the function stack when the class body was entered.
    pub function_depth: usize,
    /// Checking a static property initializer.
    pub in_static: bool,
}

/// The type checker resolves types and reports type errors.
pub struct Checker<'a> {
    pub(crate) ast: &'a Ast,
    pub(crate) scopes: &'a mut ScopeTree,
    pub(crate) table: TypeTable,
    pub(crate) relation: TypeRelation,
    pub(crate) node_cache: NodeCache,
    pub(crate) diagnostics: DiagnosticCollection,
    pub(crate) no_implicit_any: bool,
    pub(crate) current_scope: ScopeId,
    /// Declaration node to the variable it declares.
    pub(crate) decl_vars: FxHashMap<NodeId, VariableId>,
    resolving_vars: FxHashSet<VariableId>,
    pub(crate) resolving_types: FxHashSet<VariableId>,
    pub(crate) reported_circular: FxHashSet<VariableId>,
    /// Types of type-namespace declarations: aliases, interfaces, class
    /// instances and type parameters.
    pub(crate) declared_types: FxHashMap<VariableId, TypeId>,
    pub(crate) generic_params: FxHashMap<VariableId, Vec<TypeId>>,
    pub(crate) generic_refs: FxHashMap<(VariableId, Vec<TypeId>), TypeId>,
    binding_targets: FxHashMap<NodeId, TypeId>,
    pub(crate) function_types: FxHashMap<NodeId, TypeId>,
    inferred_returns: FxHashMap<NodeId, TypeId>,
    inferring: FxHashSet<NodeId>,
    checked_functions: FxHashSet<NodeId>,
    /// Signatures that type the parameters of function expressions passed
    /// where a function type is expected.
    pub(crate) contextual_signatures: FxHashMap<NodeId, Signature>,
    /// Expected types of array and object literals.
    pub(crate) contextual_types: FxHashMap<NodeId, TypeId>,
    class_types: FxHashMap<NodeId, ClassTypes>,
    checked_classes: FxHashSet<NodeId>,
    /// Object types created by object literal expressions; only these widen.
    pub(crate) fresh_objects: FxHashSet<TypeId>,
    /// Narrowed variable types, one frame per guarded region.
    pub(crate) narrowed: Vec<FxHashMap<VariableId, TypeId>>,
    pub(crate) functions: Vec<FunctionContext>,
    pub(crate) classes: Vec<ClassContext>,
    /// Inside an `as const` operand.
    pub(crate) const_context: bool,
    pub(crate) regexp_type: Option<TypeId>,
}

impl<'a> Checker<'a> {
    pub fn new(ast: &'a Ast, scopes: &'a mut ScopeTree) -> Self {
        Self::with_options(ast, scopes, false, false)
    }

    pub fn with_options(
        ast: &'a Ast,
        scopes: &'a mut ScopeTree,
        strict_null_checks: bool,
        no_implicit_any: bool,
    ) -> Self {
        let mut decl_vars = FxHashMap::default();
        for variable in scopes.variables() {
            for &decl in &variable.declarations {
                decl_vars.entry(decl).or_insert(variable.id);
            }
        }
        let current_scope = scopes.global_scope();
        Self {
            ast,
            scopes,
            table: TypeTable::new(),
            relation: TypeRelation::new(strict_null_checks),
            node_cache: NodeCache::new(ast.revision()),
            diagnostics: DiagnosticCollection::new(),
            no_implicit_any,
            current_scope,
            decl_vars,
            resolving_vars: FxHashSet::default(),
            resolving_types: FxHashSet::default(),
            reported_circular: FxHashSet::default(),
            declared_types: FxHashMap::default(),
            generic_params: FxHashMap::default(),
            generic_refs: FxHashMap::default(),
            binding_targets: FxHashMap::default(),
            function_types: FxHashMap::default(),
            inferred_returns: FxHashMap::default(),
            inferring: FxHashSet::default(),
            checked_functions: FxHashSet::default(),
            contextual_signatures: FxHashMap::default(),
            contextual_types: FxHashMap::default(),
            class_types: FxHashMap::default(),
            checked_classes: FxHashSet::default(),
            fresh_objects: FxHashSet::default(),
            narrowed: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            const_context: false,
            regexp_type: None,
        }
    }

    /// Check every statement of the program rooted at `root`.
    #[tracing::instrument(level = "debug", skip_all, fields(file = self.ast.file_name()))]
    pub fn check_program(&mut self, root: NodeId) {
        self.node_cache.sync(self.ast.revision());
        let ast = self.ast;
        let NodeKind::Program { statements } = ast.kind(root) else {
            return;
        };
        for &statement in statements {
            self.check_statement(statement);
        }
        tracing::debug!(
            types = self.table.len(),
            diagnostics = self.diagnostics.len(),
            "checked program"
        );
    }

    pub fn diagnostics(&self) -> &DiagnosticCollection {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> DiagnosticCollection {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.table
    }

    /// Finish checking and keep what code generation reads back. Releases
    /// the borrow of the scope tree.
    pub fn into_types(self) -> CheckedTypes {
        let classes = self
            .class_types
            .iter()
            .map(|(&definition, types)| (definition, types.instance, types.constructor, types.base_constructor));
        let classes: Vec<_> = classes.collect();
        CheckedTypes::new(
            self.table,
            self.declared_types,
            self.function_types,
            self.inferred_returns,
            classes.into_iter(),
        )
    }

    pub fn strict_null_checks(&self) -> bool {
        self.relation.strict_null_checks()
    }

    /// The checked type of an expression or type node, if it has one.
    pub fn type_of_node(&self, node: NodeId) -> Option<TypeId> {
        self.node_cache.get(node)
    }

    pub fn type_to_string(&self, id: TypeId) -> String {
        type_to_string(&self.table, self.ast.interner(), id)
    }

    /// Forget every memoized expression type. The next check recomputes
    /// them against the current tree.
    pub fn invalidate_node_cache(&mut self) {
        self.node_cache.clear();
    }

    /// Run `f` with the scope introduced by `node` as the current scope.
    /// Nodes that introduce no scope leave the current scope unchanged.
    pub fn with_scope<T>(&mut self, node: NodeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let Some(scope) = self.scopes.scope_of(node) else {
            return f(self);
        };
        let previous = std::mem::replace(&mut self.current_scope, scope);
        let result = f(self);
        self.current_scope = previous;
        result
    }

    /// The innermost scope containing `node`.
    pub(crate) fn enclosing_scope(&self, node: NodeId) -> ScopeId {
        self.ast
            .ancestors(node)
            .find_map(|a| self.scopes.scope_of(a))
            .unwrap_or(self.current_scope)
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    pub(crate) fn error(&mut self, node: NodeId, message: &DiagnosticMessage, args: &[&str]) {
        self.diagnostics.add(Diagnostic::with_location(
            self.ast.file_name(),
            self.ast.range(node).to_span(),
            message,
            args,
        ));
    }

    pub(crate) fn unsupported(&mut self, node: NodeId, feature: &str) {
        self.error(node, &messages::FEATURE_0_IS_NOT_SUPPORTED, &[feature]);
    }

    pub(crate) fn is_assignable(&mut self, source: TypeId, target: TypeId) -> bool {
        self.relation.is_assignable_to(&self.table, source, target)
    }

    pub(crate) fn is_comparable(&mut self, source: TypeId, target: TypeId) -> bool {
        self.relation.is_comparable_to(&self.table, source, target)
    }

    /// Report 2741 or 2322 at `node` unless `source` is assignable to
    /// `target`.
    pub(crate) fn check_assignable_at(&mut self, source: TypeId, target: TypeId, node: NodeId) -> bool {
        if self.is_assignable(source, target) {
            return true;
        }
        let source_text = self.relation_display(source, target);
        let target_text = self.type_to_string(target);
        match self.missing_property(source, target) {
            Some(name) => {
                let name = self.ast.str(name);
                self.error(
                    node,
                    &messages::PROPERTY_0_IS_MISSING_IN_TYPE_1_BUT_REQUIRED_IN_TYPE_2,
                    &[name, &source_text, &target_text],
                );
            }
            None => self.error(
                node,
                &messages::TYPE_0_IS_NOT_ASSIGNABLE_TO_TYPE_1,
                &[&source_text, &target_text],
            ),
        }
        false
    }

    /// The first required property of an object `target` that an object
    /// `source` lacks.
    fn missing_property(&self, source: TypeId, target: TypeId) -> Option<Atom> {
        let source_object = self.table.object_type(source)?;
        if source_object.kind == ObjectKind::Function {
            return None;
        }
        let target_object = self.table.object_type(target)?;
        target_object
            .desc
            .properties
            .values()
            .find(|p| !p.optional && self.table.property(source, p.name).is_none())
            .map(|p| p.name)
    }

    // ========================================================================
    // Statement checking
    // ========================================================================

    pub(crate) fn check_statement(&mut self, node: NodeId) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::VariableDeclaration { declarators, .. } => {
                for &declarator in declarators {
                    self.check_variable_declarator(declarator);
                }
            }
            NodeKind::FunctionDeclaration { function } => {
                self.check_function(*function);
            }
            NodeKind::ClassDeclaration { definition } => {
                self.check_class(*definition);
            }
            NodeKind::ExpressionStatement { expression } => {
                self.check_expression(*expression);
            }
            NodeKind::BlockStatement { statements } => {
                self.with_scope(node, |c| {
                    for &statement in statements {
                        c.check_statement(statement);
                    }
                });
            }
            NodeKind::ReturnStatement { argument } => self.check_return_statement(node, *argument),
            NodeKind::IfStatement {
                test,
                consequent,
                alternate,
            } => {
                self.check_expression(*test);
                let when_true = self.narrow_condition(*test, true);
                self.with_narrowing(when_true, |c| c.check_statement(*consequent));
                if let Some(alternate) = alternate {
                    let when_false = self.narrow_condition(*test, false);
                    self.with_narrowing(when_false, |c| c.check_statement(*alternate));
                }
            }
            NodeKind::WhileStatement { test, body } => {
                self.with_scope(node, |c| {
                    c.check_expression(*test);
                    let when_true = c.narrow_condition(*test, true);
                    c.with_narrowing(when_true, |c| c.check_statement(*body));
                });
            }
            NodeKind::DoWhileStatement { body, test } => {
                self.with_scope(node, |c| {
                    c.check_statement(*body);
                    c.check_expression(*test);
                });
            }
            NodeKind::ForUpdateStatement {
                init,
                test,
                update,
                body,
            } => {
                self.with_scope(node, |c| {
                    if let Some(init) = *init {
                        if matches!(ast.kind(init), NodeKind::VariableDeclaration { .. }) {
                            c.check_statement(init);
                        } else {
                            c.check_expression(init);
                        }
                    }
                    let when_true = match *test {
                        Some(test) => {
                            c.check_expression(test);
                            c.narrow_condition(test, true)
                        }
                        None => FxHashMap::default(),
                    };
                    c.with_narrowing(when_true, |c| {
                        c.check_statement(*body);
                        if let Some(update) = *update {
                            c.check_expression(update);
                        }
                    });
                });
            }
            NodeKind::ForInStatement { left, right, body } => {
                self.with_scope(node, |c| {
                    let right_type = c.check_expression(*right);
                    let valid = c.table.all_kinds(right_type, |k| {
                        k.is_any_or_unknown() || k.is_object_like() || matches!(k, TypeKind::TypeParameter { .. })
                    });
                    if !valid {
                        let text = c.type_to_string(right_type);
                        c.error(
                            *right,
                            &messages::THE_RIGHT_HAND_SIDE_OF_A_FOR_IN_STATEMENT_MUST_BE_OF_TYPE_ANY_AN_OBJECT_TYPE_OR_A_TYPE_PARAMETER,
                            &[&text],
                        );
                    }
                    c.check_for_head(*left);
                    c.check_statement(*body);
                });
            }
            NodeKind::ForOfStatement { left, right, body, .. } => {
                self.with_scope(node, |c| {
                    let right_type = c.check_expression(*right);
                    c.iterated_type(right_type, *right);
                    c.check_for_head(*left);
                    c.check_statement(*body);
                });
            }
            NodeKind::LabelledStatement { body, .. } => self.check_statement(*body),
            NodeKind::SwitchStatement { discriminant, cases } => {
                let discriminant_type = self.check_expression(*discriminant);
                self.with_scope(node, |c| {
                    for &case in cases {
                        let NodeKind::SwitchCaseStatement { test, consequent } = ast.kind(case) else {
                            continue;
                        };
                        if let Some(test) = *test {
                            let case_type = c.check_expression(test);
                            c.check_comparison(discriminant_type, case_type, test);
                        }
                        for &statement in consequent {
                            c.check_statement(statement);
                        }
                    }
                });
            }
            NodeKind::ThrowStatement { argument } => {
                self.check_expression(*argument);
            }
            NodeKind::TryStatement {
                block,
                handler,
                finalizer,
            } => {
                self.check_statement(*block);
                if let Some(handler) = *handler {
                    if let NodeKind::CatchClause { param, body } = ast.kind(handler) {
                        self.with_scope(handler, |c| {
                            if let Some(param) = *param {
                                for ident in ast.binding_identifiers(param) {
                                    if let Some(var) = c.scopes.reference(ident) {
                                        c.type_of_variable(var);
                                    }
                                }
                            }
                            if let NodeKind::BlockStatement { statements } = ast.kind(*body) {
                                for &statement in statements {
                                    c.check_statement(statement);
                                }
                            }
                        });
                    }
                }
                if let Some(finalizer) = *finalizer {
                    self.check_statement(finalizer);
                }
            }
            NodeKind::ExportNamedDeclaration { declaration } | NodeKind::ExportDefaultDeclaration { declaration } => {
                if is_statement(ast.kind(*declaration)) {
                    self.check_statement(*declaration);
                } else {
                    self.check_expression(*declaration);
                }
            }
            NodeKind::TSTypeAliasDeclaration { .. } | NodeKind::TSInterfaceDeclaration { .. } => {
                if let Some(&var) = self.decl_vars.get(&node) {
                    self.declared_type_of(var);
                }
            }
            NodeKind::EmptyStatement
            | NodeKind::DebuggerStatement
            | NodeKind::BreakStatement { .. }
            | NodeKind::ContinueStatement { .. } => {}
            _ => {
                self.check_expression(node);
            }
        }
    }

    fn check_variable_declarator(&mut self, declarator: NodeId) {
        let ast = self.ast;
        let NodeKind::VariableDeclarator { id, init } = ast.kind(declarator) else {
            return;
        };
        let identifiers = ast.binding_identifiers(*id);
        if identifiers.is_empty() {
            if let Some(init) = *init {
                self.check_expression(init);
            }
            return;
        }
        for ident in identifiers {
            if let Some(var) = self.scopes.reference(ident) {
                self.type_of_variable(var);
            }
        }
    }

    /// Resolve the variables declared by a `for-in`/`for-of` head. An
    /// expression head is checked as an assignment target.
    fn check_for_head(&mut self, left: NodeId) {
        let ast = self.ast;
        match ast.kind(left) {
            NodeKind::VariableDeclaration { declarators, .. } => {
                for &declarator in declarators {
                    self.check_variable_declarator(declarator);
                }
            }
            _ => {
                self.check_expression(left);
            }
        }
    }

    fn check_return_statement(&mut self, node: NodeId, argument: Option<NodeId>) {
        let context = self.functions.last().cloned();
        let Some(argument) = argument else {
            return;
        };
        let declared = context
            .as_ref()
            .filter(|f| !f.flags.is_async() && !f.flags.is_generator())
            .and_then(|f| f.declared_return);
        if let Some(declared) = declared {
            self.set_contextual_type(argument, declared);
        }
        let ty = self.check_expression(argument);
        if let Some(declared) = declared {
            let g = *self.table.globals();
            if declared != g.void || !self.table.kind(ty).is_nullish() {
                self.check_assignable_at(ty, declared, argument);
            }
        }
        tracing::trace!(?node, ?ty, "return");
    }

    /// The element type a `for-of` loop over `ty` produces; 2488 when `ty`
    /// is not iterable.
    pub(crate) fn iterated_type(&mut self, ty: TypeId, node: NodeId) -> TypeId {
        let g = *self.table.globals();
        let mut elements = Vec::new();
        for member in self.table.members(ty) {
            let element = match self.table.kind(member).clone() {
                TypeKind::Array(element) => element,
                TypeKind::Tuple(items) => self.table.union(items),
                TypeKind::Any | TypeKind::Unknown | TypeKind::Never => g.any,
                TypeKind::String | TypeKind::StringLiteral(_) => g.string,
                TypeKind::Null | TypeKind::Undefined if !self.strict_null_checks() => continue,
                _ => {
                    let text = self.type_to_string(ty);
                    self.error(node, &messages::TYPE_0_MUST_HAVE_A_SYMBOL_ITERATOR_METHOD, &[&text]);
                    return g.any;
                }
            };
            elements.push(element);
        }
        let union = self.table.union(elements);
        self.widen(union)
    }

    pub(crate) fn with_narrowing<T>(
        &mut self,
        frame: FxHashMap<VariableId, TypeId>,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        self.narrowed.push(frame);
        let result = f(self);
        self.narrowed.pop();
        result
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// The declared (unnarrowed) type of a value variable.
    pub fn type_of_variable(&mut self, var: VariableId) -> TypeId {
        if let Some(ty) = self.scopes.variable(var).ts_type {
            return ty;
        }
        let g = *self.table.globals();
        if !self.resolving_vars.insert(var) {
            self.report_circular_variable(var);
            return g.any;
        }
        let saved = std::mem::take(&mut self.narrowed);
        let ty = self.compute_variable_type(var);
        self.narrowed = saved;
        self.resolving_vars.remove(&var);
        self.scopes.set_variable_type(var, ty);
        ty
    }

    fn report_circular_variable(&mut self, var: VariableId) {
        let variable = self.scopes.variable(var);
        let (name, decl) = (variable.name, variable.decl);
        let top = self.binding_top(decl).0;
        if self.type_annotation_of(top).is_some() && self.reported_circular.insert(var) {
            let name = self.ast.str(name);
            self.error(decl, &messages::_0_IS_REFERENCED_DIRECTLY_OR_INDIRECTLY_IN_ITS_OWN_TYPE_ANNOTATION, &[name]);
        }
    }

    fn compute_variable_type(&mut self, var: VariableId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let variable = self.scopes.variable(var);
        let (kind, decl) = (variable.kind, variable.decl);
        let declarations = variable.declarations.clone();
        match kind {
            VariableKind::Function => {
                let functions: Vec<NodeId> = declarations
                    .iter()
                    .filter_map(|&d| match ast.kind(d) {
                        NodeKind::FunctionDeclaration { function } => Some(*function),
                        NodeKind::Identifier { .. } => ast
                            .parent(d)
                            .filter(|&p| matches!(ast.kind(p), NodeKind::ScriptFunction { .. })),
                        _ => None,
                    })
                    .collect();
                match functions.as_slice() {
                    [] => g.any,
                    [function] => self.function_type(*function),
                    _ => self.overloaded_function_type(&functions),
                }
            }
            VariableKind::Class => match self.class_definition_of(decl) {
                Some(definition) => self.class_types(definition).constructor,
                None => g.any,
            },
            VariableKind::Var
            | VariableKind::Let
            | VariableKind::Const
            | VariableKind::Param
            | VariableKind::CatchParam => self.binding_type(decl),
            VariableKind::TypeAlias | VariableKind::Interface | VariableKind::TypeParameter => g.any,
        }
    }

    pub(crate) fn class_definition_of(&self, decl: NodeId) -> Option<NodeId> {
        match self.ast.kind(decl) {
            NodeKind::ClassDeclaration { definition } => Some(*definition),
            NodeKind::Identifier { .. } => self
                .ast
                .parent(decl)
                .filter(|&p| matches!(self.ast.kind(p), NodeKind::ClassDefinition { .. })),
            _ => None,
        }
    }

    /// Climb from a binding identifier to the outermost pattern node it sits
    /// in. Returns that node and the path down to `ident`.
    fn binding_top(&self, ident: NodeId) -> (NodeId, Vec<NodeId>) {
        let ast = self.ast;
        let mut path = vec![ident];
        let mut top = ident;
        while let Some(parent) = ast.parent(top) {
            let climb = match ast.kind(parent) {
                NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } | NodeKind::RestElement { .. } => true,
                NodeKind::Property { .. } => ast
                    .parent(parent)
                    .is_some_and(|p| matches!(ast.kind(p), NodeKind::ObjectPattern { .. })),
                NodeKind::AssignmentPattern { left, .. } => *left == top,
                _ => false,
            };
            if !climb {
                break;
            }
            top = parent;
            path.push(top);
        }
        path.reverse();
        (top, path)
    }

    /// The type of the variable bound by `ident`, navigating destructuring
    /// patterns from the type of the whole binding target.
    fn binding_type(&mut self, ident: NodeId) -> TypeId {
        let (top, path) = self.binding_top(ident);
        let mut ty = self.binding_target_type(top);
        for step in path.windows(2) {
            ty = self.binding_element_type(step[0], step[1], ty, step[0] == top);
        }
        ty
    }

    fn binding_target_type(&mut self, top: NodeId) -> TypeId {
        if let Some(&ty) = self.binding_targets.get(&top) {
            return ty;
        }
        let ty = self.compute_binding_target_type(top);
        self.binding_targets.insert(top, ty);
        ty
    }

    fn compute_binding_target_type(&mut self, top: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let Some(parent) = ast.parent(top) else {
            return g.any;
        };
        match ast.kind(parent) {
            NodeKind::VariableDeclarator { init, .. } => {
                let declaration = ast.parent(parent);
                let (is_const, ambient) = match declaration.map(|d| ast.kind(d)) {
                    Some(NodeKind::VariableDeclaration { kind, declare, .. }) => {
                        (*kind == VariableDeclarationKind::Const, *declare)
                    }
                    _ => (false, false),
                };
                if let Some(head) = declaration.and_then(|d| self.loop_head_type(d)) {
                    return head;
                }
                let annotation = self.type_annotation_of(top);
                match (annotation, *init) {
                    (Some(annotation), Some(init)) => {
                        let declared = self.type_from_node(annotation);
                        self.set_contextual_type(init, declared);
                        let ty = self.check_expression(init);
                        self.check_assignable_at(ty, declared, top);
                        declared
                    }
                    (Some(annotation), None) => self.type_from_node(annotation),
                    (None, Some(init)) => {
                        let ty = self.check_expression(init);
                        let keep_literal = is_const && matches!(ast.kind(top), NodeKind::Identifier { .. });
                        if keep_literal && self.is_literal_like(ty) {
                            ty
                        } else {
                            self.widen(ty)
                        }
                    }
                    (None, None) => {
                        if self.no_implicit_any && !ambient {
                            if let Some(name) = ast.identifier_name(top) {
                                self.error(top, &messages::VARIABLE_0_IMPLICITLY_HAS_AN_1_TYPE, &[ast.str(name), "any"]);
                            }
                        }
                        g.any
                    }
                }
            }
            NodeKind::ScriptFunction { .. } => self.parameter_type(parent, top),
            NodeKind::CatchClause { .. } => match self.type_annotation_of(top) {
                Some(annotation) => self.type_from_node(annotation),
                None => g.any,
            },
            NodeKind::TSFunctionType { .. }
            | NodeKind::TSConstructorType { .. }
            | NodeKind::TSMethodSignature { .. }
            | NodeKind::TSSignatureDeclaration { .. } => self.signature_parameter_type(top),
            _ => g.any,
        }
    }

    /// The type of a `for-in`/`for-of` head declaration.
    fn loop_head_type(&mut self, declaration: NodeId) -> Option<TypeId> {
        let ast = self.ast;
        let statement = ast.parent(declaration)?;
        match ast.kind(statement) {
            NodeKind::ForInStatement { left, .. } if *left == declaration => Some(self.table.globals().string),
            NodeKind::ForOfStatement { left, right, .. } if *left == declaration => {
                let right_type = self.check_expression(*right);
                let g = *self.table.globals();
                // element diagnostics are reported by the statement itself
                let saved = self.diagnostics.len();
                let element = self.iterated_type(right_type, *right);
                self.diagnostics.truncate(saved);
                Some(if element == g.never { g.any } else { element })
            }
            _ => None,
        }
    }

    /// The annotation written on a binding target.
    pub(crate) fn type_annotation_of(&self, target: NodeId) -> Option<NodeId> {
        match self.ast.kind(target) {
            NodeKind::Identifier { type_annotation, .. }
            | NodeKind::ArrayPattern { type_annotation, .. }
            | NodeKind::ObjectPattern { type_annotation, .. }
            | NodeKind::RestElement { type_annotation, .. } => *type_annotation,
            NodeKind::AssignmentPattern { left, .. } => self.type_annotation_of(*left),
            _ => None,
        }
    }

    fn binding_element_type(&mut self, node: NodeId, next: NodeId, ty: TypeId, is_top: bool) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        match ast.kind(node) {
            NodeKind::ArrayPattern { elements, .. } => {
                let index = elements.iter().position(|&e| e == next).unwrap_or(0);
                if matches!(ast.kind(next), NodeKind::RestElement { .. }) {
                    return match self.table.kind(ty).clone() {
                        TypeKind::Array(_) => ty,
                        TypeKind::Tuple(items) => self.table.tuple(items.get(index..).unwrap_or_default().to_vec()),
                        _ => g.any_array,
                    };
                }
                self.element_type_at(ty, index)
            }
            NodeKind::ObjectPattern { .. } => match ast.kind(next) {
                NodeKind::Property { key, computed, .. } => {
                    if *computed {
                        self.check_expression(*key);
                        return g.any;
                    }
                    match self.property_name(*key) {
                        Some(name) => self.property_of_type(ty, name, Some(*key)),
                        None => g.any,
                    }
                }
                NodeKind::RestElement { .. } => {
                    self.unsupported(next, "object rest");
                    g.any
                }
                _ => g.any,
            },
            NodeKind::AssignmentPattern { right, .. } if !is_top => {
                let default = self.check_expression(*right);
                let default = self.widen(default);
                if self.table.kind(ty).is_any_or_unknown() {
                    return default;
                }
                let defined: Vec<TypeId> = self
                    .table
                    .members(ty)
                    .into_iter()
                    .filter(|&m| m != g.undefined)
                    .collect();
                let defined = self.table.union(defined);
                self.table.union([defined, default])
            }
            _ => ty,
        }
    }

    /// The type of element `index` of an array-like type.
    pub(crate) fn element_type_at(&mut self, ty: TypeId, index: usize) -> TypeId {
        let g = *self.table.globals();
        let mut elements = Vec::new();
        for member in self.table.members(ty) {
            elements.push(match self.table.kind(member) {
                TypeKind::Array(element) => *element,
                TypeKind::Tuple(items) => items.get(index).copied().unwrap_or(g.undefined),
                TypeKind::String | TypeKind::StringLiteral(_) => g.string,
                _ => g.any,
            });
        }
        self.table.union(elements)
    }

    fn parameter_type(&mut self, function: NodeId, top: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let (annotation, default) = match ast.kind(top) {
            NodeKind::AssignmentPattern { left, right } => (self.type_annotation_of(*left), Some(*right)),
            _ => (self.type_annotation_of(top), None),
        };
        let is_rest = matches!(ast.kind(top), NodeKind::RestElement { .. });
        let optional = matches!(ast.kind(top), NodeKind::Identifier { optional: true, .. });
        let ty = match (annotation, default) {
            (Some(annotation), default) => {
                let declared = self.type_from_node(annotation);
                if let Some(default) = default {
                    let default_type = self.check_expression(default);
                    self.check_assignable_at(default_type, declared, default);
                }
                declared
            }
            (None, Some(default)) => {
                let default_type = self.check_expression(default);
                self.widen(default_type)
            }
            (None, None) => match self.contextual_parameter_type(function, top) {
                Some(ty) => ty,
                None if is_rest => g.any_array,
                None => {
                    if self.no_implicit_any {
                        let name = match ast.identifier_name(top) {
                            Some(name) => ast.str(name).to_string(),
                            None => ast.source()[ast.range(top).to_range()].to_string(),
                        };
                        self.error(top, &messages::PARAMETER_0_IMPLICITLY_HAS_AN_1_TYPE, &[&name, "any"]);
                    }
                    g.any
                }
            },
        };
        if optional && self.strict_null_checks() {
            self.table.union([ty, g.undefined])
        } else {
            ty
        }
    }

    fn contextual_parameter_type(&mut self, function: NodeId, top: NodeId) -> Option<TypeId> {
        let NodeKind::ScriptFunction { params, .. } = self.ast.kind(function) else {
            return None;
        };
        let signature = self.contextual_signatures.get(&function)?;
        let index = params.iter().position(|&p| p == top)?;
        if matches!(self.ast.kind(top), NodeKind::RestElement { .. }) {
            return signature.rest;
        }
        match signature.params.get(index) {
            Some(param) => Some(param.ty),
            None => {
                let rest = signature.rest?;
                let element = match self.table.kind(rest) {
                    TypeKind::Array(element) => *element,
                    _ => self.table.globals().any,
                };
                Some(element)
            }
        }
    }

    /// Parameters of signature types (`(x: number) => void`) only have
    /// annotations.
    fn signature_parameter_type(&mut self, top: NodeId) -> TypeId {
        let g = *self.table.globals();
        let is_rest = matches!(self.ast.kind(top), NodeKind::RestElement { .. });
        let optional = matches!(self.ast.kind(top), NodeKind::Identifier { optional: true, .. });
        let ty = match self.type_annotation_of(top) {
            Some(annotation) => self.type_from_node(annotation),
            None if is_rest => g.any_array,
            None => {
                if self.no_implicit_any {
                    if let Some(name) = self.ast.identifier_name(top) {
                        let name = self.ast.str(name);
                        self.error(top, &messages::PARAMETER_0_IMPLICITLY_HAS_AN_1_TYPE, &[name, "any"]);
                    }
                }
                g.any
            }
        };
        if optional && self.strict_null_checks() {
            self.table.union([ty, g.undefined])
        } else {
            ty
        }
    }

    /// Whether `ty` is a literal or a union of literals.
    fn is_literal_like(&self, ty: TypeId) -> bool {
        self.table.all_kinds(ty, |k| k.is_literal())
    }

    /// Widen literal types for a mutable location: literals become their
    /// primitive, fresh object literals widen their properties, and outside
    /// `strictNullChecks` a lone `null`/`undefined` becomes `any`.
    pub(crate) fn widen(&mut self, ty: TypeId) -> TypeId {
        let g = *self.table.globals();
        let strict = self.strict_null_checks();
        match self.table.kind(ty).clone() {
            TypeKind::NumberLiteral(_)
            | TypeKind::StringLiteral(_)
            | TypeKind::BooleanLiteral(_)
            | TypeKind::BigIntLiteral(_) => self.table.base_type_of_literal(ty),
            TypeKind::Null | TypeKind::Undefined if !strict => g.any,
            TypeKind::Union(members) => {
                let has_other = members.iter().any(|&m| !self.table.kind(m).is_nullish());
                let kept: Vec<TypeId> = members
                    .into_iter()
                    .filter(|&m| strict || !has_other || !self.table.kind(m).is_nullish())
                    .collect();
                let widened: Vec<TypeId> = kept.into_iter().map(|m| self.widen(m)).collect();
                self.table.union(widened)
            }
            TypeKind::Array(element) => {
                let element = self.widen(element);
                self.table.array(element)
            }
            TypeKind::Object(mut object) if self.fresh_objects.contains(&ty) => {
                let mut changed = false;
                for property in object.desc.properties.values_mut() {
                    if property.readonly {
                        continue;
                    }
                    let widened = self.widen(property.ty);
                    changed |= widened != property.ty;
                    property.ty = widened;
                }
                if !changed {
                    return ty;
                }
                self.table.alloc(TypeKind::Object(object))
            }
            _ => ty,
        }
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Check a function's body and settle its return type. Returns the
    /// function type.
    pub(crate) fn check_function(&mut self, function: NodeId) -> TypeId {
        let ty = self.function_type(function);
        self.check_function_body(function);
        self.return_type_of(function);
        ty
    }

    /// The type of a `ScriptFunction`: one call signature. An unannotated
    /// return type is left as the resolving sentinel and inferred on demand.
    pub(crate) fn function_type(&mut self, function: NodeId) -> TypeId {
        if let Some(&ty) = self.function_types.get(&function) {
            return ty;
        }
        let ast = self.ast;
        let g = *self.table.globals();
        let NodeKind::ScriptFunction {
            id,
            type_params,
            params,
            return_type,
            body,
            ..
        } = ast.kind(function)
        else {
            return g.any;
        };
        // registered first so recursive references see the shell
        let shell = self.table.alloc(TypeKind::Any);
        self.function_types.insert(function, shell);

        let type_params = self.with_scope(function, |c| c.type_parameters(*type_params));
        let mut signature = self.with_scope(function, |c| c.signature_from_params(function, params));
        signature.type_params = type_params;
        signature.return_type = match (*return_type, *body) {
            (Some(annotation), _) => self.with_scope(function, |c| c.type_from_node(annotation)),
            (None, Some(_)) => {
                signature.decl = Some(function);
                g.resolving_return_type
            }
            (None, None) => g.any,
        };
        if let Some(&inferred) = self.inferred_returns.get(&function) {
            signature.return_type = inferred;
            signature.decl = None;
        }
        let name = id.and_then(|id| ast.identifier_name(id));
        self.table.set_kind(
            shell,
            TypeKind::Object(ObjectType {
                kind: ObjectKind::Function,
                name,
                type_args: Vec::new(),
                desc: ObjectDescriptor {
                    call_signatures: vec![signature],
                    ..ObjectDescriptor::default()
                },
            }),
        );
        shell
    }

    /// Build parameter list, rest type and minimum argument count.
    pub(crate) fn signature_from_params(&mut self, owner: NodeId, params: &[NodeId]) -> Signature {
        let ast = self.ast;
        let g = *self.table.globals();
        let mut signature = Signature::new(Vec::new(), g.any);
        let mut min_arg_count = 0;
        for &param in params {
            let ty = match ast.kind(owner) {
                NodeKind::ScriptFunction { .. } => self.binding_target_type(param),
                _ => self.signature_parameter_type(param),
            };
            match ast.kind(param) {
                NodeKind::RestElement { .. } => {
                    signature.rest = Some(ty);
                    break;
                }
                kind => {
                    let optional = matches!(
                        kind,
                        NodeKind::AssignmentPattern { .. } | NodeKind::Identifier { optional: true, .. }
                    );
                    let name = match kind {
                        NodeKind::Identifier { name, .. } => *name,
                        NodeKind::AssignmentPattern { left, .. } => {
                            ast.identifier_name(*left).unwrap_or_else(|| ast.intern("__0"))
                        }
                        _ => ast.intern("__0"),
                    };
                    signature.params.push(crate::types::Param { name, ty, optional });
                    if !optional {
                        min_arg_count = signature.params.len();
                    }
                }
            }
        }
        signature.min_arg_count = min_arg_count as u32;
        signature
    }

    fn overloaded_function_type(&mut self, functions: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let declared: Vec<NodeId> = functions
            .iter()
            .copied()
            .filter(|&f| matches!(ast.kind(f), NodeKind::ScriptFunction { body: None, .. }))
            .collect();
        let visible = if declared.is_empty() { functions.to_vec() } else { declared };
        let mut signatures = Vec::new();
        for function in visible {
            let ty = self.function_type(function);
            signatures.extend(self.table.call_signatures(ty).iter().cloned());
        }
        let name = functions.first().and_then(|&f| match ast.kind(f) {
            NodeKind::ScriptFunction { id: Some(id), .. } => ast.identifier_name(*id),
            _ => None,
        });
        self.table.object(
            ObjectKind::Function,
            name,
            ObjectDescriptor {
                call_signatures: signatures,
                ..ObjectDescriptor::default()
            },
        )
    }

    /// Check a function body once, with its own narrowing state.
    pub(crate) fn check_function_body(&mut self, function: NodeId) {
        if !self.checked_functions.insert(function) {
            return;
        }
        let ast = self.ast;
        let NodeKind::ScriptFunction {
            params,
            return_type,
            body,
            flags,
            ..
        } = ast.kind(function)
        else {
            return;
        };
        self.function_type(function);
        let declared_return = return_type.map(|r| self.with_scope(function, |c| c.type_from_node(r)));

        let saved_narrowing = std::mem::take(&mut self.narrowed);
        let pushed_class = self.enter_member_class(function);
        self.functions.push(FunctionContext {
            node: function,
            flags: *flags,
            declared_return,
        });
        self.with_scope(function, |c| {
            for &param in params {
                for ident in ast.binding_identifiers(param) {
                    if let Some(var) = c.scopes.reference(ident) {
                        c.type_of_variable(var);
                    }
                }
            }
            match body.map(|b| (b, ast.kind(b))) {
                Some((_, NodeKind::BlockStatement { statements })) => {
                    for &statement in statements {
                        c.check_statement(statement);
                    }
                }
                Some((expression, _)) => {
                    if let Some(declared) = declared_return {
                        c.set_contextual_type(expression, declared);
                    }
                    let ty = c.check_expression(expression);
                    if let Some(declared) = declared_return.filter(|_| !flags.is_async()) {
                        c.check_assignable_at(ty, declared, expression);
                    }
                }
                None => {}
            }
        });
        self.functions.pop();
        if pushed_class {
            self.classes.pop();
        }
        self.narrowed = saved_narrowing;

        if let (Some(declared), Some(annotation), Some(body)) = (declared_return, *return_type, *body) {
            if matches!(ast.kind(body), NodeKind::BlockStatement { .. }) && !flags.is_generator() {
                self.check_return_paths(body, declared, annotation, flags.is_async());
            }
        }
    }

    /// 2534 for a `never` function whose end is reachable, 2355 for a
    /// value-returning function without any `return` or `throw`.
    fn check_return_paths(&mut self, body: NodeId, declared: TypeId, annotation: NodeId, is_async: bool) {
        let g = *self.table.globals();
        if declared == g.never {
            if self.can_complete_normally(body) {
                self.error(annotation, &messages::A_FUNCTION_RETURNING_NEVER_CANNOT_HAVE_A_REACHABLE_END_POINT, &[]);
            }
            return;
        }
        let allows_no_value = is_async
            || self
                .table
                .contains_kind(declared, |k| matches!(k, TypeKind::Any | TypeKind::Void | TypeKind::Undefined | TypeKind::Unknown));
        if !allows_no_value && !self.contains_return_or_throw(body) {
            self.error(
                annotation,
                &messages::A_FUNCTION_WHOSE_DECLARED_TYPE_IS_NEITHER_VOID_NOR_ANY_MUST_RETURN_A_VALUE,
                &[],
            );
        }
    }

    fn contains_return_or_throw(&self, node: NodeId) -> bool {
        let ast = self.ast;
        let mut found = false;
        ast.iterate(node, |child| {
            if found {
                return;
            }
            found = match ast.kind(child) {
                NodeKind::ReturnStatement { .. } | NodeKind::ThrowStatement { .. } => true,
                NodeKind::ScriptFunction { .. } | NodeKind::ClassDefinition { .. } => false,
                _ => self.contains_return_or_throw(child),
            };
        });
        found
    }

    /// Conservative reachability of the end of a statement.
    fn can_complete_normally(&self, node: NodeId) -> bool {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::ReturnStatement { .. } | NodeKind::ThrowStatement { .. } => false,
            NodeKind::BlockStatement { statements } => statements.iter().all(|&s| self.can_complete_normally(s)),
            NodeKind::IfStatement {
                consequent,
                alternate: Some(alternate),
                ..
            } => self.can_complete_normally(*consequent) || self.can_complete_normally(*alternate),
            NodeKind::WhileStatement { test, body } => {
                !matches!(ast.kind(*test), NodeKind::BooleanLiteral { value: true }) || self.contains_break(*body)
            }
            NodeKind::ForUpdateStatement { test: None, body, .. } => self.contains_break(*body),
            NodeKind::TryStatement { block, handler, .. } => {
                self.can_complete_normally(*block) || handler.is_some_and(|h| self.can_complete_normally(h))
            }
            NodeKind::CatchClause { body, .. } => self.can_complete_normally(*body),
            _ => true,
        }
    }

    fn contains_break(&self, node: NodeId) -> bool {
        let ast = self.ast;
        let mut found = false;
        ast.iterate(node, |child| {
            found = found
                || match ast.kind(child) {
                    NodeKind::BreakStatement { .. } => true,
                    NodeKind::ScriptFunction { .. } => false,
                    _ => self.contains_break(child),
                };
        });
        found
    }

    /// The declared or inferred return type of a function.
    pub(crate) fn return_type_of(&mut self, function: NodeId) -> TypeId {
        let ast = self.ast;
        match ast.kind(function) {
            NodeKind::ScriptFunction {
                return_type: Some(annotation),
                ..
            } => self.with_scope(function, |c| c.type_from_node(*annotation)),
            NodeKind::ScriptFunction { body: Some(_), .. } => self.infer_return_type(function),
            _ => self.table.globals().any,
        }
    }

    /// Infer a return type from the `return` statements of the body, not
    /// descending into nested functions. While inference is in progress the
    /// function answers the resolving sentinel.
    pub(crate) fn infer_return_type(&mut self, function: NodeId) -> TypeId {
        if let Some(&ty) = self.inferred_returns.get(&function) {
            return ty;
        }
        let g = *self.table.globals();
        if !self.inferring.insert(function) {
            return g.resolving_return_type;
        }
        self.check_function_body(function);

        let ast = self.ast;
        let ty = match ast.kind(function) {
            NodeKind::ScriptFunction { flags, .. } if flags.is_async() || flags.is_generator() => g.any,
            NodeKind::ScriptFunction { body: Some(body), id, .. } => {
                let mut collected = Vec::new();
                if matches!(ast.kind(*body), NodeKind::BlockStatement { .. }) {
                    let mut returns = Vec::new();
                    collect_return_statements(ast, *body, &mut returns);
                    let mut has_bare = false;
                    for ret in returns {
                        match ast.kind(ret) {
                            NodeKind::ReturnStatement { argument: Some(argument) } => {
                                let ty = match self.node_cache.get(*argument) {
                                    Some(ty) => ty,
                                    None => self.check_expression(*argument),
                                };
                                collected.push(ty);
                            }
                            _ => has_bare = true,
                        }
                    }
                    if has_bare && !collected.is_empty() {
                        collected.push(g.undefined);
                    }
                } else {
                    let ty = match self.node_cache.get(*body) {
                        Some(ty) => ty,
                        None => self.check_expression(*body),
                    };
                    collected.push(ty);
                }

                if collected.contains(&g.resolving_return_type) {
                    if self.no_implicit_any {
                        let name = id
                            .and_then(|id| ast.identifier_name(id))
                            .map_or("anonymous", |n| ast.str(n));
                        let at = id.unwrap_or(function);
                        self.error(
                            at,
                            &messages::_0_IMPLICITLY_HAS_RETURN_TYPE_ANY_BECAUSE_IT_IS_REFERENCED_IN_ITS_RETURN_EXPRESSIONS,
                            &[name],
                        );
                    }
                    g.any
                } else if collected.is_empty() {
                    g.void
                } else {
                    let union = self.table.union(collected);
                    self.widen(union)
                }
            }
            _ => g.any,
        };

        self.inferring.remove(&function);
        self.inferred_returns.insert(function, ty);
        if let Some(&function_type) = self.function_types.get(&function) {
            if let TypeKind::Object(object) = self.table.kind_mut(function_type) {
                for signature in object.desc.call_signatures.iter_mut() {
                    if signature.decl == Some(function) {
                        signature.return_type = ty;
                        signature.decl = None;
                    }
                }
            }
        }
        tracing::trace!(?function, ?ty, "inferred return type");
        ty
    }

    /// `signature` with a lazily inferred return type settled.
    pub(crate) fn resolved_signature(&mut self, signature: &Signature) -> Signature {
        let mut signature = signature.clone();
        if let Some(function) = signature.decl {
            if signature.return_type == self.table.globals().resolving_return_type {
                signature.return_type = self.infer_return_type(function);
                if signature.return_type != self.table.globals().resolving_return_type {
                    signature.decl = None;
                }
            }
        }
        signature
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Build the instance and constructor types of a class. Member types
    /// that need their initializers are filled in by [`Checker::check_class`].
    pub(crate) fn class_types(&mut self, definition: NodeId) -> ClassTypes {
        if let Some(&types) = self.class_types.get(&definition) {
            return types;
        }
        let ast = self.ast;
        let g = *self.table.globals();
        let NodeKind::ClassDefinition {
            id,
            type_params,
            super_class,
            ctor,
            body,
        } = ast.kind(definition)
        else {
            return ClassTypes {
                instance: g.any,
                constructor: g.any,
                base_instance: None,
                base_constructor: None,
            };
        };
        let name = id.and_then(|id| ast.identifier_name(id));
        let mut types = ClassTypes {
            instance: self.table.alloc(TypeKind::Any),
            constructor: self.table.alloc(TypeKind::Any),
            base_instance: None,
            base_constructor: None,
        };
        self.class_types.insert(definition, types);

        let class_var = self.class_variable(definition);
        let type_params = self.with_scope(definition, |c| c.type_parameters(*type_params));
        if let Some(var) = class_var {
            if !type_params.is_empty() {
                self.generic_params.insert(var, type_params.clone());
            }
            self.declared_types.insert(var, types.instance);
        }

        let mut instance_desc = ObjectDescriptor::default();
        let mut static_desc = ObjectDescriptor::default();
        let mut base_construct = Vec::new();
        if let Some(super_class) = *super_class {
            let base = self.check_expression(super_class);
            let signatures = self.table.construct_signatures(base).to_vec();
            if let Some(first) = signatures.first() {
                types.base_instance = Some(first.return_type);
                types.base_constructor = Some(base);
                if let Some(object) = self.table.object_type(first.return_type) {
                    instance_desc.properties = object.desc.properties.clone();
                }
                if let Some(object) = self.table.object_type(base) {
                    static_desc.properties = object.desc.properties.clone();
                }
                base_construct = signatures;
            }
        }

        self.with_scope(definition, |c| {
            for &member in body {
                c.declare_class_member(member, &mut instance_desc, &mut static_desc);
            }
        });

        let construct_signatures = match ctor.and_then(|ctor| self.method_function(ctor)) {
            Some(function) => {
                let shell = self.function_type(function);
                let mut signature = self
                    .table
                    .call_signatures(shell)
                    .first()
                    .cloned()
                    .unwrap_or_else(|| Signature::new(Vec::new(), g.any));
                signature.return_type = types.instance;
                signature.decl = None;
                signature.type_params = type_params.clone();
                vec![signature]
            }
            None if !base_construct.is_empty() => base_construct
                .into_iter()
                .map(|mut signature| {
                    signature.return_type = types.instance;
                    signature.type_params = type_params.clone();
                    signature
                })
                .collect(),
            None => vec![Signature {
                type_params: type_params.clone(),
                ..Signature::new(Vec::new(), types.instance)
            }],
        };
        static_desc.construct_signatures = construct_signatures;

        if let Some(var) = class_var {
            self.merge_interface_declarations(var, &mut instance_desc);
        }

        self.table.set_kind(
            types.instance,
            TypeKind::Object(ObjectType {
                kind: ObjectKind::ClassInstance,
                name,
                type_args: type_params,
                desc: instance_desc,
            }),
        );
        self.table.set_kind(
            types.constructor,
            TypeKind::Object(ObjectType {
                kind: ObjectKind::Constructor,
                name,
                type_args: Vec::new(),
                desc: static_desc,
            }),
        );
        self.class_types.insert(definition, types);
        tracing::trace!(?definition, "built class types");
        types
    }

    fn class_variable(&self, definition: NodeId) -> Option<VariableId> {
        let ast = self.ast;
        let parent = ast.parent(definition)?;
        if matches!(ast.kind(parent), NodeKind::ClassDeclaration { .. }) {
            return self.decl_vars.get(&parent).copied();
        }
        match ast.kind(definition) {
            NodeKind::ClassDefinition { id: Some(id), .. } => self.decl_vars.get(id).copied(),
            _ => None,
        }
    }

    /// The `ScriptFunction` of a method definition.
    pub(crate) fn method_function(&self, method: NodeId) -> Option<NodeId> {
        let ast = self.ast;
        let NodeKind::MethodDefinition { value, .. } = ast.kind(method) else {
            return None;
        };
        match ast.kind(*value) {
            NodeKind::FunctionExpression { function } => Some(*function),
            NodeKind::ScriptFunction { .. } => Some(*value),
            _ => None,
        }
    }

    fn declare_class_member(
        &mut self,
        member: NodeId,
        instance: &mut ObjectDescriptor,
        statics: &mut ObjectDescriptor,
    ) {
        let ast = self.ast;
        let g = *self.table.globals();
        match ast.kind(member) {
            NodeKind::ClassProperty {
                key,
                type_annotation,
                is_static,
                readonly,
                optional,
                computed: false,
                ..
            } => {
                let Some(name) = self.property_name(*key) else {
                    return;
                };
                let ty = match type_annotation {
                    Some(annotation) => self.type_from_node(*annotation),
                    None => g.any,
                };
                let desc = if *is_static { statics } else { instance };
                desc.properties.insert(
                    name,
                    Property {
                        name,
                        ty,
                        optional: *optional,
                        readonly: *readonly,
                    },
                );
            }
            NodeKind::MethodDefinition {
                kind,
                key,
                is_static,
                computed: false,
                ..
            } => {
                let (Some(name), Some(function)) = (self.property_name(*key), self.method_function(member)) else {
                    return;
                };
                let desc = if *is_static { statics } else { instance };
                match kind {
                    MethodKind::Method => {
                        let ty = self.function_type(function);
                        let is_overload = matches!(ast.kind(function), NodeKind::ScriptFunction { body: None, .. });
                        let existing_overloads = desc
                            .properties
                            .get(&name)
                            .map(|p| p.ty)
                            .filter(|&t| self.table.object_type(t).is_some_and(|o| o.kind == ObjectKind::Function));
                        match existing_overloads {
                            // an implementation after overloads stays hidden
                            Some(_) if !is_overload => {}
                            Some(previous) if is_overload => {
                                let mut signatures = self.table.call_signatures(previous).to_vec();
                                signatures.extend(self.table.call_signatures(ty).iter().cloned());
                                let merged = self.table.object(
                                    ObjectKind::Function,
                                    Some(name),
                                    ObjectDescriptor {
                                        call_signatures: signatures,
                                        ..ObjectDescriptor::default()
                                    },
                                );
                                desc.properties.insert(name, Property::new(name, merged));
                            }
                            _ => {
                                desc.properties.insert(name, Property::new(name, ty));
                            }
                        }
                    }
                    MethodKind::Get => {
                        let ty = match ast.kind(function) {
                            NodeKind::ScriptFunction {
                                return_type: Some(annotation),
                                ..
                            } => self.type_from_node(*annotation),
                            _ => g.any,
                        };
                        let has_setter = desc.properties.contains_key(&name);
                        desc.properties.insert(
                            name,
                            Property {
                                readonly: !has_setter,
                                ..Property::new(name, ty)
                            },
                        );
                    }
                    MethodKind::Set => match desc.properties.get_mut(&name) {
                        Some(getter) => getter.readonly = false,
                        None => {
                            let shell = self.function_type(function);
                            let ty = self
                                .table
                                .call_signatures(shell)
                                .first()
                                .and_then(|s| s.params.first())
                                .map_or(g.any, |p| p.ty);
                            desc.properties.insert(name, Property::new(name, ty));
                        }
                    },
                    MethodKind::Constructor => {}
                }
            }
            _ => {}
        }
    }

    /// Check initializers and method bodies of a class, once. Unannotated
    /// property and getter types are settled here.
    pub(crate) fn check_class(&mut self, definition: NodeId) -> ClassTypes {
        let types = self.class_types(definition);
        if !self.checked_classes.insert(definition) {
            return types;
        }
        let ast = self.ast;
        let NodeKind::ClassDefinition { ctor, body, .. } = ast.kind(definition) else {
            return types;
        };
        self.classes.push(ClassContext {
            definition,
            types,
            function_depth: self.functions.len(),
            in_static: false,
        });
        self.with_scope(definition, |c| {
            if let Some(function) = ctor.and_then(|ctor| c.method_function(ctor)) {
                c.check_function(function);
            }
            for &member in body {
                c.check_class_member(member, types);
            }
        });
        self.classes.pop();
        types
    }

    fn check_class_member(&mut self, member: NodeId, types: ClassTypes) {
        let ast = self.ast;
        match ast.kind(member) {
            NodeKind::ClassProperty {
                key,
                value,
                type_annotation,
                is_static,
                computed,
                ..
            } => {
                if *computed {
                    self.check_expression(*key);
                }
                let Some(value) = *value else {
                    return;
                };
                if let Some(class) = self.classes.last_mut() {
                    class.in_static = *is_static;
                }
                let declared = type_annotation.map(|a| self.type_from_node(a));
                if let Some(declared) = declared {
                    self.set_contextual_type(value, declared);
                }
                let ty = self.check_expression(value);
                if let Some(class) = self.classes.last_mut() {
                    class.in_static = false;
                }
                match declared {
                    Some(declared) => {
                        self.check_assignable_at(ty, declared, value);
                    }
                    None if !*computed => {
                        let owner = if *is_static { types.constructor } else { types.instance };
                        let widened = self.widen(ty);
                        if let Some(name) = self.property_name(*key) {
                            self.set_member_type(owner, name, widened);
                        }
                    }
                    None => {}
                }
            }
            NodeKind::MethodDefinition {
                kind,
                key,
                is_static,
                computed,
                ..
            } => {
                if *computed {
                    self.check_expression(*key);
                }
                let Some(function) = self.method_function(member) else {
                    return;
                };
                self.check_function(function);
                let unannotated = matches!(ast.kind(function), NodeKind::ScriptFunction { return_type: None, .. });
                if *kind == MethodKind::Get && unannotated && !*computed {
                    let ty = self.return_type_of(function);
                    let owner = if *is_static { types.constructor } else { types.instance };
                    if let Some(name) = self.property_name(*key) {
                        self.set_member_type(owner, name, ty);
                    }
                }
            }
            _ => {}
        }
    }

    fn set_member_type(&mut self, owner: TypeId, name: Atom, ty: TypeId) {
        if let TypeKind::Object(object) = self.table.kind_mut(owner) {
            if let Some(property) = object.desc.properties.get_mut(&name) {
                property.ty = ty;
            }
        }
    }

    /// Push the class of a method being checked out of order, so `this`
    /// resolves inside it. Returns whether a context was pushed.
    fn enter_member_class(&mut self, function: NodeId) -> bool {
        let ast = self.ast;
        let definition = ast
            .parent(function)
            .and_then(|value| ast.parent(value))
            .filter(|&method| matches!(ast.kind(method), NodeKind::MethodDefinition { .. }))
            .and_then(|method| ast.parent(method))
            .filter(|&class| matches!(ast.kind(class), NodeKind::ClassDefinition { .. }));
        let Some(definition) = definition else {
            return false;
        };
        if self.classes.last().is_some_and(|c| c.definition == definition) {
            return false;
        }
        let types = self.class_types(definition);
        self.classes.push(ClassContext {
            definition,
            types,
            function_depth: self.functions.len(),
            in_static: false,
        });
        true
    }

    /// The type of `this` at the current position.
    pub(crate) fn this_type(&self) -> TypeId {
        let g = *self.table.globals();
        let Some(class) = self.classes.last() else {
            return g.any;
        };
        let ast = self.ast;
        let nearest = self.functions[class.function_depth.min(self.functions.len())..]
            .iter()
            .rev()
            .find(|f| !f.flags.is_arrow());
        match nearest {
            None if class.in_static => class.types.constructor,
            None => class.types.instance,
            Some(function) => {
                let is_member = ast
                    .parent(function.node)
                    .and_then(|value| ast.parent(value))
                    .is_some_and(|method| matches!(ast.kind(method), NodeKind::MethodDefinition { .. }));
                if !is_member {
                    g.any
                } else if function.flags.contains(FunctionFlags::STATIC) {
                    class.types.constructor
                } else {
                    class.types.instance
                }
            }
        }
    }

    /// The static name of a property key: identifiers, string and number
    /// literals.
    pub(crate) fn property_name(&self, key: NodeId) -> Option<Atom> {
        let ast = self.ast;
        match ast.kind(key) {
            NodeKind::Identifier { name, .. } => Some(*name),
            NodeKind::StringLiteral { value } => Some(*value),
            NodeKind::NumberLiteral { value } => Some(ast.intern(&espanda_core::format_number(*value))),
            _ => None,
        }
    }
}

/// `ReturnStatement`s of a function body, not descending into nested
/// functions or classes.
fn collect_return_statements(ast: &Ast, node: NodeId, out: &mut Vec<NodeId>) {
    ast.iterate(node, |child| match ast.kind(child) {
        NodeKind::ScriptFunction { .. } | NodeKind::ClassDefinition { .. } => {}
        NodeKind::ReturnStatement { .. } => out.push(child),
        _ => collect_return_statements(ast, child, out),
    });
}

fn is_statement(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::VariableDeclaration { .. }
            | NodeKind::FunctionDeclaration { .. }
            | NodeKind::ClassDeclaration { .. }
            | NodeKind::TSTypeAliasDeclaration { .. }
            | NodeKind::TSInterfaceDeclaration { .. }
    )
}
