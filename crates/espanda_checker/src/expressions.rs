//! Expression checking: literals, names, member access, calls, operators,
//! and control-flow narrowing of variables in guarded regions.

use espanda_ast::{
    AssignmentOperator, BinaryOperator, FunctionFlags, MetaPropertyKind, NodeId, NodeKind, PropertyKind, TypeId,
    UnaryOperator, VariableId,
};
use espanda_binder::VariableKind;
use espanda_core::collections::FxHashMap;
use espanda_core::Atom;
use espanda_diagnostics::messages;

use crate::checker::Checker;
use crate::facts::{filter_type, TypeFacts};
use crate::instantiate::Instantiator;
use crate::types::{ObjectDescriptor, ObjectKind, Property, Signature, TypeKind};

/// Value names the checker accepts without a declaration.
const GLOBAL_VALUES: &[&str] = &[
    "console",
    "Math",
    "JSON",
    "Object",
    "Array",
    "String",
    "Number",
    "Boolean",
    "Symbol",
    "BigInt",
    "Promise",
    "Error",
    "TypeError",
    "RangeError",
    "globalThis",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "Date",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "RegExp",
    "Reflect",
    "print",
    "arguments",
];

const OBJECT_MEMBERS: &[&str] = &[
    "constructor",
    "toString",
    "toLocaleString",
    "valueOf",
    "hasOwnProperty",
    "isPrototypeOf",
    "propertyIsEnumerable",
];

const FUNCTION_MEMBERS: &[&str] = &["apply", "call", "bind", "prototype", "arguments", "caller"];

const ARRAY_MEMBERS: &[&str] = &[
    "push", "pop", "shift", "unshift", "slice", "splice", "concat", "join", "reverse", "sort", "indexOf",
    "lastIndexOf", "includes", "find", "findIndex", "findLast", "findLastIndex", "filter", "map", "forEach",
    "reduce", "reduceRight", "some", "every", "fill", "keys", "values", "entries", "flat", "flatMap", "at",
    "copyWithin", "toString", "toLocaleString",
];

const STRING_MEMBERS: &[&str] = &[
    "charAt", "charCodeAt", "codePointAt", "concat", "includes", "endsWith", "startsWith", "indexOf",
    "lastIndexOf", "localeCompare", "match", "matchAll", "normalize", "padEnd", "padStart", "repeat",
    "replace", "replaceAll", "search", "slice", "split", "substring", "substr", "toLowerCase",
    "toUpperCase", "toLocaleLowerCase", "toLocaleUpperCase", "trim", "trimStart", "trimEnd", "at",
    "toString", "valueOf",
];

/// Which signature list a callee is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CallKind {
    Call,
    Construct,
}

impl<'a> Checker<'a> {
    /// The type of an expression. Each node is checked once; later queries
    /// answer from the node cache.
    pub(crate) fn check_expression(&mut self, node: NodeId) -> TypeId {
        if let Some(ty) = self.node_cache.get(node) {
            return ty;
        }
        let ty = self.compute_expression_type(node);
        self.node_cache.insert(node, ty);
        ty
    }

    fn compute_expression_type(&mut self, node: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        match ast.kind(node) {
            NodeKind::NumberLiteral { value } => self.table.number_literal(*value),
            NodeKind::StringLiteral { value } => self.table.string_literal(*value),
            NodeKind::BooleanLiteral { value } => self.table.boolean_literal(*value),
            NodeKind::NullLiteral => g.null,
            NodeKind::BigIntLiteral { value } => {
                let normalized = normalize_bigint(ast.str(*value));
                let atom = ast.intern(&normalized);
                self.table.bigint_literal(atom)
            }
            NodeKind::RegExpLiteral { .. } => self.regexp_type(),
            NodeKind::TemplateLiteral { expressions, .. } => {
                for &expression in expressions {
                    self.check_expression(expression);
                }
                g.string
            }
            NodeKind::Identifier { name, .. } => self.check_identifier(node, *name),
            NodeKind::ThisExpression => self.this_type(),
            NodeKind::SuperExpression => self.super_type(),
            NodeKind::ArrayExpression { elements } => self.check_array_literal(node, elements),
            NodeKind::ObjectExpression { properties } => self.check_object_literal(node, properties),
            NodeKind::SpreadElement { argument } => {
                let ty = self.check_expression(*argument);
                self.iterated_type(ty, *argument)
            }
            NodeKind::OmittedExpression => g.undefined,
            NodeKind::FunctionExpression { function } | NodeKind::ArrowFunctionExpression { function } => {
                self.check_function(*function)
            }
            NodeKind::ClassExpression { definition } => self.check_class(*definition).constructor,
            NodeKind::UnaryExpression { operator, argument } => self.check_unary(*operator, *argument),
            NodeKind::UpdateExpression { argument, .. } => self.check_update(*argument),
            NodeKind::BinaryExpression { operator, left, right } => self.check_binary(node, *operator, *left, *right),
            NodeKind::AssignmentExpression { operator, left, right } => {
                self.check_assignment(node, *operator, *left, *right)
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                self.check_expression(*test);
                let when_true = self.narrow_condition(*test, true);
                let consequent_type = self.with_narrowing(when_true, |c| c.check_expression(*consequent));
                let when_false = self.narrow_condition(*test, false);
                let alternate_type = self.with_narrowing(when_false, |c| c.check_expression(*alternate));
                self.table.union([consequent_type, alternate_type])
            }
            NodeKind::SequenceExpression { expressions } => {
                let mut last = g.undefined;
                for &expression in expressions {
                    last = self.check_expression(expression);
                }
                last
            }
            NodeKind::CallExpression {
                callee,
                type_args,
                arguments,
                optional,
            } => self.check_call_expression(node, *callee, type_args, arguments, *optional),
            NodeKind::NewExpression {
                callee,
                type_args,
                arguments,
            } => self.check_new_expression(node, *callee, type_args, arguments),
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                optional,
            } => self.check_member_expression(*object, *property, *computed, *optional),
            NodeKind::AwaitExpression { argument } => match argument {
                Some(argument) => self.check_expression(*argument),
                None => g.undefined,
            },
            NodeKind::YieldExpression { argument, .. } => {
                if let Some(argument) = argument {
                    self.check_expression(*argument);
                }
                g.any
            }
            NodeKind::MetaProperty { kind } => {
                if *kind == MetaPropertyKind::ImportMeta {
                    self.unsupported(node, "import.meta");
                }
                g.any
            }
            NodeKind::TSAsExpression {
                expression,
                type_annotation,
            } => self.check_as_expression(*expression, *type_annotation),
            NodeKind::TSNonNullExpression { expression } => {
                let ty = self.check_expression(*expression);
                self.table.non_nullable(ty)
            }
            NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } | NodeKind::AssignmentPattern { .. } => {
                self.check_destructuring_target(node);
                g.any
            }
            _ => g.any,
        }
    }

    // ========================================================================
    // Contextual typing
    // ========================================================================

    /// Record the type an expression is expected to have. Function
    /// expressions take their parameter types from it; array and object
    /// literals pass it on to their elements.
    pub(crate) fn set_contextual_type(&mut self, node: NodeId, ty: TypeId) {
        let ast = self.ast;
        match ast.kind(node) {
            NodeKind::FunctionExpression { function } | NodeKind::ArrowFunctionExpression { function } => {
                if self.contextual_signatures.contains_key(function) || self.function_types.contains_key(function) {
                    return;
                }
                let non_null = self.table.non_nullable(ty);
                let signature = self
                    .signatures_of(non_null, CallKind::Call)
                    .and_then(|signatures| signatures.into_iter().next());
                if let Some(signature) = signature {
                    self.contextual_signatures.insert(*function, signature);
                }
            }
            NodeKind::ArrayExpression { .. } | NodeKind::ObjectExpression { .. } => {
                self.contextual_types.entry(node).or_insert(ty);
            }
            NodeKind::ConditionalExpression {
                consequent, alternate, ..
            } => {
                self.set_contextual_type(*consequent, ty);
                self.set_contextual_type(*alternate, ty);
            }
            _ => {}
        }
    }

    /// The expected type of element `index` of an array literal.
    fn contextual_element_type(&self, contextual: TypeId, index: usize) -> Option<TypeId> {
        self.table.members(contextual).into_iter().find_map(|m| match self.table.kind(m) {
            TypeKind::Array(element) => Some(*element),
            TypeKind::Tuple(items) => items.get(index).copied(),
            _ => None,
        })
    }

    // ========================================================================
    // Literals and names
    // ========================================================================

    pub(crate) fn regexp_type(&mut self) -> TypeId {
        if let Some(ty) = self.regexp_type {
            return ty;
        }
        let ast = self.ast;
        let g = *self.table.globals();
        let mut desc = ObjectDescriptor::default();
        for (name, ty) in [
            ("source", g.string),
            ("flags", g.string),
            ("global", g.boolean),
            ("ignoreCase", g.boolean),
            ("multiline", g.boolean),
            ("sticky", g.boolean),
            ("unicode", g.boolean),
            ("lastIndex", g.number),
            ("test", g.any),
            ("exec", g.any),
        ] {
            let name = ast.intern(name);
            let readonly = !matches!(ast.str(name), "lastIndex" | "test" | "exec");
            desc.properties.insert(
                name,
                Property {
                    readonly,
                    ..Property::new(name, ty)
                },
            );
        }
        let ty = self.table.object(ObjectKind::Interface, Some(ast.intern("RegExp")), desc);
        self.regexp_type = Some(ty);
        ty
    }

    fn check_identifier(&mut self, node: NodeId, name: Atom) -> TypeId {
        let g = *self.table.globals();
        let Some(var) = self.scopes.reference(node) else {
            return self.check_unresolved_name(node, name);
        };
        if self.scopes.variable(var).kind.is_type_only() {
            let text = self.ast.str(name);
            self.error(node, &messages::_0_ONLY_REFERS_TO_A_TYPE_BUT_IS_BEING_USED_AS_A_VALUE_HERE, &[text]);
            return g.any;
        }
        if let Some(narrowed) = self.narrowed.iter().rev().find_map(|frame| frame.get(&var).copied()) {
            return narrowed;
        }
        self.type_of_variable(var)
    }

    pub(crate) fn check_unresolved_name(&mut self, node: NodeId, name: Atom) -> TypeId {
        let g = *self.table.globals();
        let text = self.ast.str(name);
        match text {
            "" => g.any,
            "undefined" => g.undefined,
            "NaN" | "Infinity" => g.number,
            _ if GLOBAL_VALUES.contains(&text) => g.any,
            _ => {
                let scope = self.enclosing_scope(node);
                if self.scopes.lookup_type(scope, name).is_some() {
                    self.error(node, &messages::_0_ONLY_REFERS_TO_A_TYPE_BUT_IS_BEING_USED_AS_A_VALUE_HERE, &[text]);
                } else {
                    self.error(node, &messages::CANNOT_FIND_NAME_0, &[text]);
                }
                g.any
            }
        }
    }

    fn super_type(&self) -> TypeId {
        let g = *self.table.globals();
        let Some(class) = self.classes.last() else {
            return g.any;
        };
        let types = class.types;
        if self.this_type() == types.constructor {
            types.base_constructor.unwrap_or(g.any)
        } else {
            types.base_instance.unwrap_or(g.any)
        }
    }

    fn check_array_literal(&mut self, node: NodeId, elements: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let contextual = self.contextual_types.get(&node).copied();
        let tuple_context = self.const_context
            || contextual.is_some_and(|c| self.table.contains_kind(c, |k| matches!(k, TypeKind::Tuple(_))));
        let mut types = Vec::with_capacity(elements.len());
        let mut has_spread = false;
        for (index, &element) in elements.iter().enumerate() {
            if matches!(ast.kind(element), NodeKind::SpreadElement { .. }) {
                has_spread = true;
            } else if let Some(expected) = contextual.and_then(|c| self.contextual_element_type(c, index)) {
                self.set_contextual_type(element, expected);
            }
            types.push(self.check_expression(element));
        }
        if tuple_context && !has_spread {
            return self.table.tuple(types);
        }
        if types.is_empty() {
            return g.any_array;
        }
        let element = self.table.union(types);
        self.table.array(element)
    }

    fn check_object_literal(&mut self, node: NodeId, properties: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let contextual = self.contextual_types.get(&node).copied();
        let mut desc = ObjectDescriptor::default();
        let mut spread_any = false;
        for &property in properties {
            match ast.kind(property) {
                NodeKind::Property {
                    kind,
                    key,
                    value,
                    computed,
                    ..
                } => {
                    let name = if *computed {
                        let key_type = self.check_expression(*key);
                        match self.table.kind(key_type) {
                            TypeKind::StringLiteral(atom) => Some(*atom),
                            TypeKind::NumberLiteral(n) => Some(ast.intern(&espanda_core::format_number(*n))),
                            _ => None,
                        }
                    } else {
                        self.property_name(*key)
                    };
                    let expected = name.and_then(|n| contextual.and_then(|c| self.table.property(c, n).map(|p| p.ty)));
                    match kind {
                        PropertyKind::Init | PropertyKind::Method => {
                            if let Some(expected) = expected {
                                self.set_contextual_type(*value, expected);
                            }
                            let ty = self.check_expression(*value);
                            if let Some(name) = name {
                                desc.properties.insert(
                                    name,
                                    Property {
                                        readonly: self.const_context,
                                        ..Property::new(name, ty)
                                    },
                                );
                            }
                        }
                        PropertyKind::Get => {
                            self.check_expression(*value);
                            let ty = match function_of(ast.kind(*value)) {
                                Some(function) => self.return_type_of(function),
                                None => g.any,
                            };
                            if let Some(name) = name {
                                let has_setter = desc.properties.contains_key(&name);
                                desc.properties.insert(
                                    name,
                                    Property {
                                        readonly: !has_setter,
                                        ..Property::new(name, ty)
                                    },
                                );
                            }
                        }
                        PropertyKind::Set => {
                            let setter = self.check_expression(*value);
                            let Some(name) = name else {
                                continue;
                            };
                            match desc.properties.get_mut(&name) {
                                Some(getter) => getter.readonly = false,
                                None => {
                                    let ty = self
                                        .table
                                        .call_signatures(setter)
                                        .first()
                                        .and_then(|s| s.params.first())
                                        .map_or(g.any, |p| p.ty);
                                    desc.properties.insert(name, Property::new(name, ty));
                                }
                            }
                        }
                    }
                }
                NodeKind::SpreadElement { argument } => {
                    let ty = self.check_expression(*argument);
                    if self.table.kind(ty).is_any_or_unknown() {
                        spread_any = true;
                    } else if let Some(object) = self.table.object_type(ty) {
                        let spread: Vec<Property> = object.desc.properties.values().cloned().collect();
                        for property in spread {
                            desc.properties.insert(property.name, property);
                        }
                    }
                }
                _ => {}
            }
        }
        if spread_any {
            return g.any;
        }
        let ty = self.table.object(ObjectKind::ObjectLiteral, None, desc);
        self.fresh_objects.insert(ty);
        ty
    }

    fn check_as_expression(&mut self, expression: NodeId, annotation: NodeId) -> TypeId {
        let ast = self.ast;
        let is_const = matches!(
            ast.kind(annotation),
            NodeKind::TSTypeReference { type_name, .. } if ast.str(*type_name) == "const"
        );
        if is_const {
            let saved = std::mem::replace(&mut self.const_context, true);
            let ty = self.check_expression(expression);
            self.const_context = saved;
            return ty;
        }
        let target = self.type_from_node(annotation);
        self.set_contextual_type(expression, target);
        let source = self.check_expression(expression);
        let widened = self.widen(source);
        if !self.is_comparable(widened, target) && !self.is_comparable(source, target) {
            let source_text = self.type_to_string(widened);
            let target_text = self.type_to_string(target);
            self.error(
                expression,
                &messages::CONVERSION_OF_TYPE_0_TO_TYPE_1_MAY_BE_A_MISTAKE,
                &[&source_text, &target_text],
            );
        }
        target
    }

    // ========================================================================
    // Property access
    // ========================================================================

    /// Whether `node` continues an optional chain (`a?.b.c`, `a?.()`).
    fn is_optional_chain(&self, node: NodeId) -> bool {
        match self.ast.kind(node) {
            NodeKind::MemberExpression { optional: true, .. } | NodeKind::CallExpression { optional: true, .. } => true,
            NodeKind::MemberExpression { object, .. } => self.is_optional_chain(*object),
            NodeKind::CallExpression { callee, .. } => self.is_optional_chain(*callee),
            _ => false,
        }
    }

    /// Report 2531/2532 when `ty` may be `null`/`undefined` under
    /// `strictNullChecks`, and continue with the non-nullable part.
    fn check_non_null(&mut self, ty: TypeId, node: NodeId) -> TypeId {
        if !self.strict_null_checks() {
            return ty;
        }
        let may_be_null = self.table.contains_kind(ty, |k| matches!(k, TypeKind::Null));
        let may_be_undefined = self.table.contains_kind(ty, |k| matches!(k, TypeKind::Undefined | TypeKind::Void));
        if may_be_null {
            self.error(node, &messages::OBJECT_IS_POSSIBLY_NULL, &[]);
        } else if may_be_undefined {
            self.error(node, &messages::OBJECT_IS_POSSIBLY_UNDEFINED, &[]);
        }
        if may_be_null || may_be_undefined {
            self.table.non_nullable(ty)
        } else {
            ty
        }
    }

    fn check_member_expression(&mut self, object: NodeId, property: NodeId, computed: bool, optional: bool) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let object_type = self.check_expression(object);
        let propagate = optional || self.is_optional_chain(object);
        let object_type = if propagate {
            self.table.non_nullable(object_type)
        } else {
            self.check_non_null(object_type, object)
        };
        let ty = if computed {
            let key_type = self.check_expression(property);
            self.element_access_type(object_type, key_type)
        } else {
            match ast.identifier_name(property) {
                Some(name) => self.property_of_type(object_type, name, Some(property)),
                None => g.any,
            }
        };
        if propagate {
            self.table.union([ty, g.undefined])
        } else {
            ty
        }
    }

    fn element_access_type(&mut self, object: TypeId, key: TypeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let key_kind = self.table.kind(key).clone();
        let mut result = Vec::new();
        for member in self.table.members(object) {
            let ty = match (self.table.kind(member).clone(), &key_kind) {
                (TypeKind::Tuple(items), TypeKind::NumberLiteral(n)) => {
                    items.get(*n as usize).copied().unwrap_or(g.undefined)
                }
                (TypeKind::Tuple(items), _) if key_kind.is_number_like() => self.table.union(items),
                (TypeKind::Array(element), _) if key_kind.is_number_like() => element,
                (TypeKind::String | TypeKind::StringLiteral(_), _) if key_kind.is_number_like() => g.string,
                (_, TypeKind::StringLiteral(name)) => self.lookup_property(member, *name).unwrap_or(g.any),
                (_, TypeKind::NumberLiteral(n)) => {
                    let name = ast.intern(&espanda_core::format_number(*n));
                    match self.lookup_property(member, name) {
                        Some(ty) => ty,
                        None => self.index_type(member, true).unwrap_or(g.any),
                    }
                }
                (TypeKind::Object(_), _) => self.index_type(member, key_kind.is_number_like()).unwrap_or(g.any),
                _ => g.any,
            };
            result.push(ty);
        }
        self.table.union(result)
    }

    fn index_type(&self, ty: TypeId, numeric: bool) -> Option<TypeId> {
        let object = self.table.object_type(ty)?;
        let desc = &object.desc;
        let index = if numeric {
            desc.number_index.as_ref().or(desc.string_index.as_ref())
        } else {
            desc.string_index.as_ref()
        };
        index.map(|i| i.ty)
    }

    /// The type of property `name` on `ty`. Reports 2339 at `report_at`
    /// when some member of `ty` lacks it.
    pub(crate) fn property_of_type(&mut self, ty: TypeId, name: Atom, report_at: Option<NodeId>) -> TypeId {
        let g = *self.table.globals();
        let mut found = Vec::new();
        let mut missing = false;
        for member in self.table.members(ty) {
            match self.lookup_property(member, name) {
                Some(ty) => found.push(ty),
                None => missing = true,
            }
        }
        if missing {
            if let Some(node) = report_at {
                let text = self.type_to_string(ty);
                let name = self.ast.str(name);
                self.error(node, &messages::PROPERTY_0_DOES_NOT_EXIST_ON_TYPE_1, &[name, &text]);
            }
            return g.any;
        }
        self.table.union(found)
    }

    fn lookup_property(&mut self, ty: TypeId, name: Atom) -> Option<TypeId> {
        let g = *self.table.globals();
        let text = self.ast.str(name);
        match self.table.kind(ty).clone() {
            TypeKind::Any | TypeKind::Unknown | TypeKind::Never => Some(g.any),
            TypeKind::Null | TypeKind::Undefined | TypeKind::Void => Some(g.any),
            TypeKind::TypeParameter { constraint, .. } => match constraint {
                Some(constraint) => self.lookup_property(constraint, name),
                None => OBJECT_MEMBERS.contains(&text).then_some(g.any),
            },
            TypeKind::Object(_) | TypeKind::Intersection(_) => {
                if let Some(property) = self.table.property(ty, name).cloned() {
                    return Some(if property.optional && self.strict_null_checks() {
                        self.table.union([property.ty, g.undefined])
                    } else {
                        property.ty
                    });
                }
                if let Some(index) = self.index_type(ty, false) {
                    return Some(index);
                }
                let callable = !self.table.call_signatures(ty).is_empty()
                    || !self.table.construct_signatures(ty).is_empty();
                if callable {
                    match text {
                        "length" => return Some(g.number),
                        "name" => return Some(g.string),
                        _ if FUNCTION_MEMBERS.contains(&text) => return Some(g.any),
                        _ => {}
                    }
                }
                OBJECT_MEMBERS.contains(&text).then_some(g.any)
            }
            TypeKind::Array(_) | TypeKind::Tuple(_) => match text {
                "length" => Some(g.number),
                _ if ARRAY_MEMBERS.contains(&text) || OBJECT_MEMBERS.contains(&text) => Some(g.any),
                _ => None,
            },
            TypeKind::String | TypeKind::StringLiteral(_) => match text {
                "length" => Some(g.number),
                _ if STRING_MEMBERS.contains(&text) || OBJECT_MEMBERS.contains(&text) => Some(g.any),
                _ => None,
            },
            TypeKind::NonPrimitive => OBJECT_MEMBERS.contains(&text).then_some(g.any),
            TypeKind::Union(_) => Some(self.property_of_type(ty, name, None)),
            _ => Some(g.any),
        }
    }

    fn is_readonly_property(&self, ty: TypeId, name: Atom) -> bool {
        self.table
            .members(ty)
            .into_iter()
            .any(|m| self.table.property(m, name).is_some_and(|p| p.readonly))
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Signatures of a callee. `None` means the callee is untyped (`any`)
    /// and any call is allowed.
    pub(crate) fn signatures_of(&self, ty: TypeId, kind: CallKind) -> Option<Vec<Signature>> {
        match self.table.kind(ty) {
            TypeKind::Any | TypeKind::Unknown | TypeKind::Never => None,
            TypeKind::TypeParameter {
                constraint: Some(constraint),
                ..
            } => self.signatures_of(*constraint, kind),
            TypeKind::Union(members) => {
                let mut first = None;
                for &member in members {
                    let signatures = self.signatures_of(member, kind)?;
                    if signatures.is_empty() {
                        return Some(Vec::new());
                    }
                    first.get_or_insert(signatures);
                }
                Some(first.unwrap_or_default())
            }
            TypeKind::Intersection(members) => {
                let mut all = Vec::new();
                for &member in members {
                    all.extend(self.signatures_of(member, kind)?);
                }
                Some(all)
            }
            TypeKind::Object(_) => Some(match kind {
                CallKind::Call => self.table.call_signatures(ty).to_vec(),
                CallKind::Construct => self.table.construct_signatures(ty).to_vec(),
            }),
            _ => Some(Vec::new()),
        }
    }

    fn check_call_expression(
        &mut self,
        node: NodeId,
        callee: NodeId,
        type_args: &[NodeId],
        arguments: &[NodeId],
        optional: bool,
    ) -> TypeId {
        let g = *self.table.globals();
        if matches!(self.ast.kind(callee), NodeKind::SuperExpression) {
            return self.check_super_call(node, arguments);
        }
        let callee_type = self.check_expression(callee);
        let propagate = optional || self.is_optional_chain(callee);
        let callee_type = if propagate {
            self.table.non_nullable(callee_type)
        } else {
            self.check_non_null(callee_type, callee)
        };
        let ty = match self.signatures_of(callee_type, CallKind::Call) {
            None => {
                self.check_untyped_arguments(arguments);
                g.any
            }
            Some(signatures) if signatures.is_empty() => {
                self.error(callee, &messages::THIS_EXPRESSION_IS_NOT_CALLABLE, &[]);
                self.check_untyped_arguments(arguments);
                g.any
            }
            Some(signatures) => self.resolve_call(node, &signatures, type_args, arguments),
        };
        if propagate {
            self.table.union([ty, g.undefined])
        } else {
            ty
        }
    }

    fn check_new_expression(&mut self, node: NodeId, callee: NodeId, type_args: &[NodeId], arguments: &[NodeId]) -> TypeId {
        let g = *self.table.globals();
        let callee_type = self.check_expression(callee);
        match self.signatures_of(callee_type, CallKind::Construct) {
            None => {
                self.check_untyped_arguments(arguments);
                g.any
            }
            Some(signatures) if signatures.is_empty() => {
                self.error(callee, &messages::THIS_EXPRESSION_IS_NOT_CONSTRUCTABLE, &[]);
                self.check_untyped_arguments(arguments);
                g.any
            }
            Some(signatures) => self.resolve_call(node, &signatures, type_args, arguments),
        }
    }

    fn check_super_call(&mut self, node: NodeId, arguments: &[NodeId]) -> TypeId {
        let g = *self.table.globals();
        let base = self.classes.last().and_then(|c| c.types.base_constructor);
        let signatures = base.map(|b| self.table.construct_signatures(b).to_vec()).unwrap_or_default();
        if signatures.is_empty() {
            self.check_untyped_arguments(arguments);
        } else {
            self.resolve_call(node, &signatures, &[], arguments);
        }
        g.void
    }

    fn check_untyped_arguments(&mut self, arguments: &[NodeId]) {
        for &argument in arguments {
            self.check_expression(argument);
        }
    }

    /// Pick the signature a call resolves to, check its arguments, and
    /// return the (instantiated) return type.
    fn resolve_call(&mut self, node: NodeId, signatures: &[Signature], type_args: &[NodeId], arguments: &[NodeId]) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        let signatures: Vec<Signature> = signatures.iter().map(|s| self.resolved_signature(s)).collect();
        let explicit: Vec<TypeId> = type_args.iter().map(|&a| self.type_from_node(a)).collect();
        let has_spread = arguments
            .iter()
            .any(|&a| matches!(ast.kind(a), NodeKind::SpreadElement { .. }));
        let argc = arguments.len();

        let candidates: Vec<&Signature> = signatures
            .iter()
            .filter(|s| has_spread || (argc >= s.min_arg_count as usize && (s.rest.is_some() || argc <= s.params.len())))
            .collect();

        match candidates.as_slice() {
            [] => {
                self.check_untyped_arguments(arguments);
                self.report_arity(node, &signatures, argc);
                match signatures.first() {
                    Some(first) if first.type_params.is_empty() => first.return_type,
                    _ => g.any,
                }
            }
            [only] => {
                let only = (*only).clone();
                let (instantiated, _) = self.check_call_arguments(&only, &explicit, arguments, true);
                instantiated.return_type
            }
            _ => {
                let candidates: Vec<Signature> = candidates.into_iter().cloned().collect();
                for candidate in &candidates {
                    let (instantiated, ok) = self.check_call_arguments(candidate, &explicit, arguments, false);
                    if ok {
                        return instantiated.return_type;
                    }
                }
                self.error(node, &messages::NO_OVERLOAD_MATCHES_THIS_CALL, &[]);
                g.any
            }
        }
    }

    fn report_arity(&mut self, node: NodeId, signatures: &[Signature], argc: usize) {
        let min = signatures.iter().map(|s| s.min_arg_count as usize).min().unwrap_or(0);
        let got = argc.to_string();
        if signatures.iter().any(|s| s.rest.is_some()) {
            self.error(node, &messages::EXPECTED_AT_LEAST_0_ARGUMENTS_BUT_GOT_1, &[&min.to_string(), &got]);
            return;
        }
        let max = signatures.iter().map(|s| s.params.len()).max().unwrap_or(0);
        if min == max {
            self.error(node, &messages::EXPECTED_0_ARGUMENTS_BUT_GOT_1, &[&min.to_string(), &got]);
        } else {
            self.error(
                node,
                &messages::EXPECTED_0_1_ARGUMENTS_BUT_GOT_2,
                &[&min.to_string(), &max.to_string(), &got],
            );
        }
    }

    /// Instantiate a candidate signature for the given arguments and check
    /// each argument against its parameter. Returns the instantiated
    /// signature and whether every argument was assignable.
    fn check_call_arguments(
        &mut self,
        signature: &Signature,
        explicit: &[TypeId],
        arguments: &[NodeId],
        report: bool,
    ) -> (Signature, bool) {
        let ast = self.ast;
        let mut signature = signature.clone();
        if !signature.type_params.is_empty() {
            let args = if explicit.is_empty() {
                self.infer_type_arguments(&signature, arguments)
            } else {
                self.fill_type_arguments(&signature.type_params, explicit)
            };
            let mut instantiator = Instantiator::from_pairs(&signature.type_params, &args);
            signature = instantiator.instantiate_signature(&mut self.table, &signature);
        }
        for (index, &argument) in arguments.iter().enumerate() {
            if let NodeKind::SpreadElement { .. } = ast.kind(argument) {
                self.check_expression(argument);
                continue;
            }
            let expected = self.parameter_type_at(&signature, index);
            if let Some(expected) = expected {
                self.set_contextual_type(argument, expected);
            }
            let actual = self.check_expression(argument);
            let Some(expected) = expected else {
                continue;
            };
            if !self.is_assignable(actual, expected) {
                if report {
                    let actual_text = self.relation_display(actual, expected);
                    let expected_text = self.type_to_string(expected);
                    self.error(
                        argument,
                        &messages::ARGUMENT_OF_TYPE_0_IS_NOT_ASSIGNABLE_TO_PARAMETER_OF_TYPE_1,
                        &[&actual_text, &expected_text],
                    );
                }
                return (signature, false);
            }
        }
        (signature, true)
    }

    /// How a source type is named in a relation error: literals are shown
    /// widened unless the target mentions literals.
    pub(crate) fn relation_display(&mut self, source: TypeId, target: TypeId) -> String {
        let shown = if self.table.contains_kind(target, |k| k.is_literal()) {
            source
        } else {
            self.widen(source)
        };
        self.type_to_string(shown)
    }

    pub(crate) fn parameter_type_at(&self, signature: &Signature, index: usize) -> Option<TypeId> {
        if let Some(param) = signature.params.get(index) {
            return Some(param.ty);
        }
        let rest = signature.rest?;
        match self.table.kind(rest) {
            TypeKind::Array(element) => Some(*element),
            TypeKind::Tuple(items) => items.get(index - signature.params.len()).copied(),
            _ => Some(self.table.globals().any),
        }
    }

    /// Explicit type arguments, padded with defaults, constraints or
    /// `unknown`.
    pub(crate) fn fill_type_arguments(&mut self, params: &[TypeId], explicit: &[TypeId]) -> Vec<TypeId> {
        let g = *self.table.globals();
        let mut args: Vec<TypeId> = explicit.iter().copied().take(params.len()).collect();
        for &param in &params[args.len()..] {
            let fallback = match self.table.kind(param) {
                TypeKind::TypeParameter { default, constraint, .. } => default.or(*constraint).unwrap_or(g.unknown),
                _ => g.unknown,
            };
            let mut instantiator = Instantiator::from_pairs(&params[..args.len()], &args);
            let fallback = instantiator.instantiate(&mut self.table, fallback);
            args.push(fallback);
        }
        args
    }

    /// Infer type arguments from argument types. Context-sensitive function
    /// arguments are checked last, against parameter types instantiated with
    /// what the other arguments already fixed.
    fn infer_type_arguments(&mut self, signature: &Signature, arguments: &[NodeId]) -> Vec<TypeId> {
        let ast = self.ast;
        let params = signature.type_params.clone();
        let mut candidates: FxHashMap<TypeId, Vec<TypeId>> = FxHashMap::default();
        let mut deferred = Vec::new();
        for (index, &argument) in arguments.iter().enumerate() {
            if matches!(ast.kind(argument), NodeKind::SpreadElement { .. }) {
                continue;
            }
            let Some(expected) = self.parameter_type_at(signature, index) else {
                continue;
            };
            if self.is_context_sensitive(argument) {
                deferred.push((argument, expected));
                continue;
            }
            let actual = self.check_expression(argument);
            self.infer_from_types(&params, actual, expected, &mut candidates, 0);
        }
        for (argument, expected) in deferred {
            let partial = self.inferred_arguments(&params, &candidates, false);
            let mut instantiator = Instantiator::from_pairs(&params, &partial);
            let contextual = instantiator.instantiate(&mut self.table, expected);
            self.set_contextual_type(argument, contextual);
            let actual = self.check_expression(argument);
            self.infer_from_types(&params, actual, expected, &mut candidates, 0);
        }
        self.inferred_arguments(&params, &candidates, true)
    }

    fn inferred_arguments(
        &mut self,
        params: &[TypeId],
        candidates: &FxHashMap<TypeId, Vec<TypeId>>,
        finalize: bool,
    ) -> Vec<TypeId> {
        let g = *self.table.globals();
        let mut args = Vec::with_capacity(params.len());
        for &param in params {
            let arg = match candidates.get(&param) {
                Some(found) if !found.is_empty() => {
                    let union = self.table.union(found.iter().copied());
                    self.widen(union)
                }
                _ if !finalize => param,
                _ => match self.table.kind(param) {
                    TypeKind::TypeParameter { default, constraint, .. } => {
                        default.or(*constraint).unwrap_or(g.unknown)
                    }
                    _ => g.unknown,
                },
            };
            args.push(arg);
        }
        args
    }

    fn infer_from_types(
        &mut self,
        params: &[TypeId],
        source: TypeId,
        target: TypeId,
        candidates: &mut FxHashMap<TypeId, Vec<TypeId>>,
        depth: u32,
    ) {
        if depth > 8 || source == target {
            return;
        }
        if params.contains(&target) {
            candidates.entry(target).or_default().push(source);
            return;
        }
        match self.table.kind(target).clone() {
            TypeKind::Array(target_element) => match self.table.kind(source).clone() {
                TypeKind::Array(source_element) => {
                    self.infer_from_types(params, source_element, target_element, candidates, depth + 1)
                }
                TypeKind::Tuple(items) => {
                    for item in items {
                        self.infer_from_types(params, item, target_element, candidates, depth + 1);
                    }
                }
                _ => {}
            },
            TypeKind::Tuple(targets) => {
                if let TypeKind::Tuple(sources) = self.table.kind(source).clone() {
                    for (s, t) in sources.into_iter().zip(targets) {
                        self.infer_from_types(params, s, t, candidates, depth + 1);
                    }
                }
            }
            TypeKind::Union(members) => {
                let naked: Vec<TypeId> = members.iter().copied().filter(|m| params.contains(m)).collect();
                if let [param] = naked.as_slice() {
                    let others: Vec<TypeId> = members.iter().copied().filter(|m| !params.contains(m)).collect();
                    let remaining: Vec<TypeId> = self
                        .table
                        .members(source)
                        .into_iter()
                        .filter(|&s| !others.contains(&s))
                        .collect();
                    if !remaining.is_empty() {
                        let remaining = self.table.union(remaining);
                        candidates.entry(*param).or_default().push(remaining);
                    }
                } else {
                    for member in members {
                        self.infer_from_types(params, source, member, candidates, depth + 1);
                    }
                }
            }
            TypeKind::Object(target_object) => {
                let Some(source_object) = self.table.object_type(source).cloned() else {
                    return;
                };
                for property in target_object.desc.properties.values() {
                    if let Some(found) = source_object.desc.properties.get(&property.name) {
                        self.infer_from_types(params, found.ty, property.ty, candidates, depth + 1);
                    }
                }
                let pairs = source_object
                    .desc
                    .call_signatures
                    .first()
                    .zip(target_object.desc.call_signatures.first());
                if let Some((s, t)) = pairs {
                    let s = self.resolved_signature(s);
                    for (sp, tp) in s.params.iter().zip(&t.params) {
                        self.infer_from_types(params, sp.ty, tp.ty, candidates, depth + 1);
                    }
                    self.infer_from_types(params, s.return_type, t.return_type, candidates, depth + 1);
                }
            }
            _ => {}
        }
    }

    /// Function expressions with an unannotated parameter take their types
    /// from context.
    fn is_context_sensitive(&self, node: NodeId) -> bool {
        let ast = self.ast;
        let Some(function) = function_of(ast.kind(node)) else {
            return false;
        };
        let NodeKind::ScriptFunction { params, .. } = ast.kind(function) else {
            return false;
        };
        params.iter().any(|&p| self.type_annotation_of(p).is_none())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    /// Numeric operand check: number, bigint, `any`, and outside
    /// `strictNullChecks` also `null`/`undefined`.
    fn is_arithmetic_operand(&self, ty: TypeId) -> bool {
        let strict = self.strict_null_checks();
        self.table.all_kinds(ty, |k| {
            k.is_number_like() || k.is_bigint_like() || matches!(k, TypeKind::Any | TypeKind::Never) || (!strict && k.is_nullish())
        })
    }

    fn check_unary(&mut self, operator: UnaryOperator, argument: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        match operator {
            UnaryOperator::Not | UnaryOperator::Delete => {
                self.check_expression(argument);
                g.boolean
            }
            UnaryOperator::Typeof => {
                self.check_expression(argument);
                g.string
            }
            UnaryOperator::Void => {
                self.check_expression(argument);
                g.undefined
            }
            UnaryOperator::Plus => {
                self.check_expression(argument);
                g.number
            }
            UnaryOperator::Minus | UnaryOperator::BitNot => {
                let ty = self.check_expression(argument);
                if operator == UnaryOperator::Minus {
                    match ast.kind(argument) {
                        NodeKind::NumberLiteral { value } => return self.table.number_literal(-value),
                        NodeKind::BigIntLiteral { .. } => {
                            if let TypeKind::BigIntLiteral(atom) = self.table.kind(ty) {
                                let negated = ast.intern(&format!("-{}", ast.str(*atom)));
                                return self.table.bigint_literal(negated);
                            }
                        }
                        _ => {}
                    }
                }
                if self.table.kind(ty).is_any_or_unknown() && !matches!(self.table.kind(ty), TypeKind::Unknown) {
                    return g.number;
                }
                if !self.is_arithmetic_operand(ty) {
                    self.error(
                        argument,
                        &messages::AN_ARITHMETIC_OPERAND_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE,
                        &[],
                    );
                    return g.number;
                }
                if self.table.all_kinds(ty, |k| k.is_bigint_like()) {
                    g.bigint
                } else {
                    g.number
                }
            }
        }
    }

    fn check_update(&mut self, argument: NodeId) -> TypeId {
        let ast = self.ast;
        let g = *self.table.globals();
        if !matches!(
            ast.kind(argument),
            NodeKind::Identifier { .. } | NodeKind::MemberExpression { .. }
        ) {
            self.check_expression(argument);
            self.error(
                argument,
                &messages::THE_OPERAND_OF_AN_INCREMENT_OR_DECREMENT_OPERATOR_MUST_BE_A_VARIABLE_OR_A_PROPERTY_ACCESS,
                &[],
            );
            return g.number;
        }
        let ty = self.check_assignment_target(argument).unwrap_or(g.any);
        if !self.is_arithmetic_operand(ty) {
            self.error(
                argument,
                &messages::AN_ARITHMETIC_OPERAND_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE,
                &[],
            );
            return g.number;
        }
        if self.table.all_kinds(ty, |k| k.is_bigint_like()) {
            g.bigint
        } else {
            g.number
        }
    }

    fn check_binary(&mut self, node: NodeId, operator: BinaryOperator, left: NodeId, right: NodeId) -> TypeId {
        let g = *self.table.globals();
        if operator.is_logical() {
            return self.check_logical(operator, left, right);
        }
        let left_type = self.check_expression(left);
        let right_type = self.check_expression(right);
        match operator {
            BinaryOperator::Add => self.check_addition(node, left_type, right_type),
            op if op.is_arithmetic() => self.check_arithmetic(node, op, left, right, left_type, right_type),
            op if op.is_relational() => {
                self.check_relational(node, op, left_type, right_type);
                g.boolean
            }
            op if op.is_equality() => {
                self.check_comparison(left_type, right_type, node);
                g.boolean
            }
            BinaryOperator::In => {
                let valid_left = self.table.all_kinds(left_type, |k| {
                    k.is_any_or_unknown() || k.is_string_like() || k.is_number_like() || matches!(k, TypeKind::Symbol)
                });
                if !valid_left {
                    self.error(
                        left,
                        &messages::THE_LEFT_HAND_SIDE_OF_AN_IN_EXPRESSION_MUST_BE_OF_TYPE_ANY_STRING_NUMBER_OR_SYMBOL,
                        &[],
                    );
                }
                if self.table.contains_kind(right_type, |k| k.is_primitive()) {
                    self.error(right, &messages::THE_RIGHT_HAND_SIDE_OF_AN_IN_EXPRESSION_MUST_NOT_BE_A_PRIMITIVE, &[]);
                }
                g.boolean
            }
            BinaryOperator::InstanceOf => {
                if self.table.all_kinds(left_type, |k| k.is_primitive()) {
                    self.error(
                        left,
                        &messages::THE_LEFT_HAND_SIDE_OF_AN_INSTANCEOF_EXPRESSION_MUST_BE_OF_TYPE_ANY_AN_OBJECT_TYPE_OR_A_TYPE_PARAMETER,
                        &[],
                    );
                }
                g.boolean
            }
            _ => g.any,
        }
    }

    fn report_operator(&mut self, node: NodeId, operator: &str, left: TypeId, right: TypeId) {
        let left = self.table.base_type_of_literal(left);
        let right = self.table.base_type_of_literal(right);
        let left_text = self.type_to_string(left);
        let right_text = self.type_to_string(right);
        self.error(
            node,
            &messages::OPERATOR_0_CANNOT_BE_APPLIED_TO_TYPES_1_AND_2,
            &[operator, &left_text, &right_text],
        );
    }

    fn check_addition(&mut self, node: NodeId, left: TypeId, right: TypeId) -> TypeId {
        let g = *self.table.globals();
        let strict = self.strict_null_checks();
        let number_like = |k: &TypeKind| k.is_number_like() || (!strict && k.is_nullish());
        if self.table.all_kinds(left, |k| k.is_string_like()) || self.table.all_kinds(right, |k| k.is_string_like()) {
            return g.string;
        }
        if self.table.all_kinds(left, number_like) && self.table.all_kinds(right, number_like) {
            return g.number;
        }
        if self.table.all_kinds(left, |k| k.is_bigint_like()) && self.table.all_kinds(right, |k| k.is_bigint_like()) {
            return g.bigint;
        }
        let is_any = |k: &TypeKind| matches!(k, TypeKind::Any);
        if self.table.contains_kind(left, is_any) || self.table.contains_kind(right, is_any) {
            return g.any;
        }
        self.report_operator(node, "+", left, right);
        g.any
    }

    fn check_arithmetic(
        &mut self,
        node: NodeId,
        operator: BinaryOperator,
        left: NodeId,
        right: NodeId,
        left_type: TypeId,
        right_type: TypeId,
    ) -> TypeId {
        let g = *self.table.globals();
        let left_ok = self.is_arithmetic_operand(left_type);
        let right_ok = self.is_arithmetic_operand(right_type);
        if !left_ok {
            self.error(
                left,
                &messages::THE_LEFT_HAND_SIDE_OF_AN_ARITHMETIC_OPERATION_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE,
                &[],
            );
        }
        if !right_ok {
            self.error(
                right,
                &messages::THE_RIGHT_HAND_SIDE_OF_AN_ARITHMETIC_OPERATION_MUST_BE_OF_TYPE_ANY_NUMBER_BIGINT_OR_AN_ENUM_TYPE,
                &[],
            );
        }
        if !left_ok || !right_ok {
            return g.number;
        }
        let left_bigint = self.table.all_kinds(left_type, |k| k.is_bigint_like());
        let right_bigint = self.table.all_kinds(right_type, |k| k.is_bigint_like());
        let left_number = self.table.all_kinds(left_type, |k| k.is_number_like());
        let right_number = self.table.all_kinds(right_type, |k| k.is_number_like());
        if (left_bigint && right_number) || (left_number && right_bigint) {
            self.report_operator(node, operator.as_str(), left_type, right_type);
            return g.any;
        }
        if left_bigint && right_bigint {
            g.bigint
        } else {
            g.number
        }
    }

    fn check_relational(&mut self, node: NodeId, operator: BinaryOperator, left: TypeId, right: TypeId) {
        let any = |k: &TypeKind| matches!(k, TypeKind::Any);
        if self.table.contains_kind(left, any) || self.table.contains_kind(right, any) {
            return;
        }
        let strict = self.strict_null_checks();
        let numeric = |k: &TypeKind| k.is_number_like() || k.is_bigint_like() || (!strict && k.is_nullish());
        let ok = (self.table.all_kinds(left, numeric) && self.table.all_kinds(right, numeric))
            || (self.table.all_kinds(left, |k| k.is_string_like()) && self.table.all_kinds(right, |k| k.is_string_like()))
            || self.is_comparable(left, right);
        if !ok {
            self.report_operator(node, operator.as_str(), left, right);
        }
    }

    /// Equality operands must overlap. `null`/`undefined` compare with
    /// anything.
    pub(crate) fn check_comparison(&mut self, left: TypeId, right: TypeId, node: NodeId) {
        let nullish = |k: &TypeKind| k.is_nullish() || k.is_any_or_unknown();
        if self.table.all_kinds(left, nullish) || self.table.all_kinds(right, nullish) {
            return;
        }
        if !self.is_comparable(left, right) && !self.is_comparable(right, left) {
            let left_text = self.type_to_string(left);
            let right_text = self.type_to_string(right);
            self.error(
                node,
                &messages::THIS_COMPARISON_APPEARS_TO_BE_UNINTENTIONAL_BECAUSE_THE_TYPES_0_AND_1_HAVE_NO_OVERLAP,
                &[&left_text, &right_text],
            );
        }
    }

    fn check_logical(&mut self, operator: BinaryOperator, left: NodeId, right: NodeId) -> TypeId {
        let ast = self.ast;
        let left_type = self.check_expression(left);
        match operator {
            BinaryOperator::LogicalAnd => {
                let when_true = self.narrow_condition(left, true);
                let right_type = self.with_narrowing(when_true, |c| c.check_expression(right));
                let falsy = filter_type(&mut self.table, ast.interner(), left_type, TypeFacts::FALSY);
                self.table.union([falsy, right_type])
            }
            BinaryOperator::LogicalOr => {
                let when_false = self.narrow_condition(left, false);
                let right_type = self.with_narrowing(when_false, |c| c.check_expression(right));
                let truthy = filter_type(&mut self.table, ast.interner(), left_type, TypeFacts::TRUTHY);
                self.table.union([truthy, right_type])
            }
            _ => {
                let right_type = self.check_expression(right);
                let defined = self.table.non_nullable(left_type);
                self.table.union([defined, right_type])
            }
        }
    }

    fn check_assignment(&mut self, node: NodeId, operator: AssignmentOperator, left: NodeId, right: NodeId) -> TypeId {
        let g = *self.table.globals();
        let target = self.check_assignment_target(left);
        let result = match operator.binary_operator() {
            None => {
                if let Some(target) = target {
                    self.set_contextual_type(right, target);
                }
                let value = self.check_expression(right);
                if let Some(target) = target {
                    self.check_assignable_at(value, target, left);
                }
                value
            }
            Some(binary) => {
                let current = target.unwrap_or(g.any);
                let value = self.check_expression(right);
                let result = match binary {
                    BinaryOperator::Add => self.check_addition(node, current, value),
                    BinaryOperator::LogicalAnd | BinaryOperator::LogicalOr => self.table.union([current, value]),
                    BinaryOperator::Nullish => {
                        let defined = self.table.non_nullable(current);
                        self.table.union([defined, value])
                    }
                    op => self.check_arithmetic(node, op, left, right, current, value),
                };
                if let Some(target) = target {
                    self.check_assignable_at(result, target, left);
                }
                result
            }
        };
        // an assignment ends any narrowing of the variable in this region
        if let Some(var) = self.narrowable_reference(left) {
            let declared = self.type_of_variable(var);
            if let Some(frame) = self.narrowed.last_mut() {
                frame.insert(var, declared);
            }
        }
        result
    }

    /// The declared type of an assignment target. Reports 2364 for targets
    /// that cannot be assigned, 2588 for constants and 2540 for read-only
    /// properties.
    pub(crate) fn check_assignment_target(&mut self, target: NodeId) -> Option<TypeId> {
        let ast = self.ast;
        match ast.kind(target) {
            NodeKind::Identifier { name, .. } => {
                let (ty, is_const) = match self.scopes.reference(target) {
                    Some(var) => (self.type_of_variable(var), self.scopes.variable(var).kind == VariableKind::Const),
                    None => (self.check_unresolved_name(target, *name), false),
                };
                self.node_cache.insert(target, ty);
                if is_const {
                    let text = ast.str(*name);
                    self.error(target, &messages::CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_CONSTANT, &[text]);
                    return None;
                }
                Some(ty)
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
                ..
            } => {
                let ty = self.check_expression(target);
                if !*computed {
                    let object_type = self.check_expression(*object);
                    let name = ast.identifier_name(*property);
                    let in_constructor = matches!(ast.kind(*object), NodeKind::ThisExpression)
                        && self
                            .functions
                            .iter()
                            .rev()
                            .find(|f| !f.flags.is_arrow())
                            .is_some_and(|f| f.flags.contains(FunctionFlags::CONSTRUCTOR));
                    if let Some(name) = name {
                        if !in_constructor && self.is_readonly_property(object_type, name) {
                            let text = ast.str(name);
                            self.error(
                                *property,
                                &messages::CANNOT_ASSIGN_TO_0_BECAUSE_IT_IS_A_READ_ONLY_PROPERTY,
                                &[text],
                            );
                        }
                    }
                }
                Some(ty)
            }
            NodeKind::TSAsExpression { expression, .. } | NodeKind::TSNonNullExpression { expression } => {
                self.check_assignment_target(*expression)
            }
            NodeKind::ArrayPattern { .. } | NodeKind::ObjectPattern { .. } => {
                self.check_destructuring_target(target);
                None
            }
            _ => {
                self.check_expression(target);
                self.error(
                    target,
                    &messages::THE_LEFT_HAND_SIDE_OF_AN_ASSIGNMENT_EXPRESSION_MUST_BE_A_VARIABLE_OR_A_PROPERTY_ACCESS,
                    &[],
                );
                None
            }
        }
    }

    /// The leaves of a destructuring assignment are assignment targets.
    fn check_destructuring_target(&mut self, pattern: NodeId) {
        let ast = self.ast;
        match ast.kind(pattern) {
            NodeKind::ArrayPattern { elements, .. } => {
                for &element in elements {
                    if !matches!(ast.kind(element), NodeKind::OmittedExpression) {
                        self.check_destructuring_target(element);
                    }
                }
            }
            NodeKind::ObjectPattern { properties, .. } => {
                for &property in properties {
                    match ast.kind(property) {
                        NodeKind::Property { value, .. } => self.check_destructuring_target(*value),
                        _ => self.check_destructuring_target(property),
                    }
                }
            }
            NodeKind::AssignmentPattern { left, right } => {
                self.check_expression(*right);
                self.check_destructuring_target(*left);
            }
            NodeKind::RestElement { argument, .. } => self.check_destructuring_target(*argument),
            _ => {
                self.check_assignment_target(pattern);
            }
        }
    }

    // ========================================================================
    // Narrowing
    // ========================================================================

    /// Variable types implied by `condition` evaluating to `assume_true`.
    pub(crate) fn narrow_condition(&mut self, condition: NodeId, assume_true: bool) -> FxHashMap<VariableId, TypeId> {
        let mut frame = FxHashMap::default();
        self.narrow_into(condition, assume_true, &mut frame);
        frame
    }

    fn narrowable_reference(&self, node: NodeId) -> Option<VariableId> {
        if !matches!(self.ast.kind(node), NodeKind::Identifier { .. }) {
            return None;
        }
        let var = self.scopes.reference(node)?;
        matches!(
            self.scopes.variable(var).kind,
            VariableKind::Var | VariableKind::Let | VariableKind::Const | VariableKind::Param | VariableKind::CatchParam
        )
        .then_some(var)
    }

    fn current_type(&mut self, var: VariableId, frame: &FxHashMap<VariableId, TypeId>) -> TypeId {
        if let Some(&ty) = frame.get(&var) {
            return ty;
        }
        if let Some(ty) = self.narrowed.iter().rev().find_map(|f| f.get(&var).copied()) {
            return ty;
        }
        self.type_of_variable(var)
    }

    fn narrow_by_facts(&mut self, var: VariableId, facts: TypeFacts, frame: &mut FxHashMap<VariableId, TypeId>) {
        let ast = self.ast;
        let current = self.current_type(var, frame);
        let narrowed = filter_type(&mut self.table, ast.interner(), current, facts);
        frame.insert(var, narrowed);
    }

    fn narrow_into(&mut self, condition: NodeId, assume_true: bool, frame: &mut FxHashMap<VariableId, TypeId>) {
        let ast = self.ast;
        match ast.kind(condition) {
            NodeKind::Identifier { .. } => {
                if let Some(var) = self.narrowable_reference(condition) {
                    let facts = if assume_true { TypeFacts::TRUTHY } else { TypeFacts::FALSY };
                    self.narrow_by_facts(var, facts, frame);
                }
            }
            NodeKind::UnaryExpression {
                operator: UnaryOperator::Not,
                argument,
            } => self.narrow_into(*argument, !assume_true, frame),
            NodeKind::BinaryExpression { operator, left, right } => match operator {
                BinaryOperator::LogicalAnd if assume_true => {
                    self.narrow_into(*left, true, frame);
                    self.narrow_into(*right, true, frame);
                }
                BinaryOperator::LogicalOr if !assume_true => {
                    self.narrow_into(*left, false, frame);
                    self.narrow_into(*right, false, frame);
                }
                op if op.is_equality() => {
                    let equal = matches!(op, BinaryOperator::StrictEq | BinaryOperator::Eq) == assume_true;
                    let strict = matches!(op, BinaryOperator::StrictEq | BinaryOperator::StrictNotEq);
                    self.narrow_equality(*left, *right, equal, strict, frame);
                    self.narrow_equality(*right, *left, equal, strict, frame);
                }
                _ => {}
            },
            _ => {}
        }
    }

    /// Narrow the reference on `subject` by comparing it with `other`.
    fn narrow_equality(
        &mut self,
        subject: NodeId,
        other: NodeId,
        equal: bool,
        strict: bool,
        frame: &mut FxHashMap<VariableId, TypeId>,
    ) {
        let ast = self.ast;
        let g = *self.table.globals();

        // typeof x === "tag"
        if let NodeKind::UnaryExpression {
            operator: UnaryOperator::Typeof,
            argument,
        } = ast.kind(subject)
        {
            let (Some(var), NodeKind::StringLiteral { value }) = (self.narrowable_reference(*argument), ast.kind(other))
            else {
                return;
            };
            let tag = ast.str(*value);
            let current = self.current_type(var, frame);
            if equal && self.table.kind(current).is_any_or_unknown() {
                let primitive = match tag {
                    "string" => Some(g.string),
                    "number" => Some(g.number),
                    "bigint" => Some(g.bigint),
                    "boolean" => Some(g.boolean),
                    "symbol" => Some(g.symbol),
                    "undefined" => Some(g.undefined),
                    _ => None,
                };
                if let Some(primitive) = primitive {
                    frame.insert(var, primitive);
                }
                return;
            }
            if let Some(facts) = TypeFacts::for_typeof(tag, equal) {
                self.narrow_by_facts(var, facts, frame);
            }
            return;
        }

        let Some(var) = self.narrowable_reference(subject) else {
            return;
        };
        let other_is_undefined = matches!(
            ast.kind(other),
            NodeKind::Identifier { name, .. } if ast.str(*name) == "undefined" && self.scopes.reference(other).is_none()
        );
        let facts = match ast.kind(other) {
            NodeKind::NullLiteral if strict => Some(if equal { TypeFacts::EQ_NULL } else { TypeFacts::NE_NULL }),
            _ if other_is_undefined && strict => Some(if equal {
                TypeFacts::EQ_UNDEFINED
            } else {
                TypeFacts::NE_UNDEFINED
            }),
            NodeKind::NullLiteral => Some(if equal {
                TypeFacts::EQ_UNDEFINED_OR_NULL
            } else {
                TypeFacts::NE_UNDEFINED_OR_NULL
            }),
            _ if other_is_undefined => Some(if equal {
                TypeFacts::EQ_UNDEFINED_OR_NULL
            } else {
                TypeFacts::NE_UNDEFINED_OR_NULL
            }),
            _ => None,
        };
        if let Some(facts) = facts {
            self.narrow_by_facts(var, facts, frame);
            return;
        }

        // x === literal
        let is_literal = matches!(
            ast.kind(other),
            NodeKind::NumberLiteral { .. } | NodeKind::StringLiteral { .. } | NodeKind::BooleanLiteral { .. }
        );
        if !strict || !is_literal {
            return;
        }
        let literal = self.check_expression(other);
        let current = self.current_type(var, frame);
        if self.table.kind(current).is_any_or_unknown() {
            return;
        }
        let narrowed = if equal {
            if self.is_assignable(literal, current) {
                literal
            } else {
                return;
            }
        } else {
            let kept: Vec<TypeId> = self
                .table
                .members(current)
                .into_iter()
                .filter(|&m| m != literal)
                .collect();
            self.table.union(kept)
        };
        frame.insert(var, narrowed);
    }
}

/// The `ScriptFunction` inside a function or arrow expression.
fn function_of(kind: &NodeKind) -> Option<NodeId> {
    match kind {
        NodeKind::FunctionExpression { function } | NodeKind::ArrowFunctionExpression { function } => Some(*function),
        _ => None,
    }
}

/// Canonical decimal text of a bigint literal; prefixed forms that do not
/// fit in 128 bits keep their source spelling.
fn normalize_bigint(text: &str) -> String {
    let (digits, radix) = match text.get(..2) {
        Some("0x" | "0X") => (&text[2..], 16),
        Some("0o" | "0O") => (&text[2..], 8),
        Some("0b" | "0B") => (&text[2..], 2),
        _ => (text, 10),
    };
    let digits: String = digits.chars().filter(|&c| c != '_').collect();
    match u128::from_str_radix(&digits, radix) {
        Ok(value) => value.to_string(),
        Err(_) => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_bigint;

    #[test]
    fn test_normalize_bigint() {
        assert_eq!(normalize_bigint("0x10"), "16");
        assert_eq!(normalize_bigint("007"), "7");
        assert_eq!(normalize_bigint("0b101"), "5");
        assert_eq!(normalize_bigint("123"), "123");
    }
}
