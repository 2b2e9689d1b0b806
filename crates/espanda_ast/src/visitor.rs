//! Child enumeration and in-place rewriting.
//!
//! [`NodeKind::for_each_slot`] is the single source of truth for which
//! fields of a node hold children and in what order. `iterate`, `children`,
//! `update_self` and the dumper are all built on it, so a new node kind only
//! has to be described once here.

use crate::ast::Ast;
use crate::node::NodeKind;
use crate::types::NodeId;

/// A child-holding field, read only.
#[derive(Debug, Clone, Copy)]
pub enum Slot<'a> {
    Required(NodeId),
    Optional(Option<NodeId>),
    List(&'a [NodeId]),
}

/// A child-holding field, writable.
#[derive(Debug)]
pub enum SlotMut<'a> {
    Required(&'a mut NodeId),
    Optional(&'a mut Option<NodeId>),
    List(&'a mut Vec<NodeId>),
}

/// What an `update_self` callback wants done with one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    Keep,
    Replace(NodeId),
    /// Only for optional fields and list elements.
    Remove,
    /// Only for list elements. An empty splice is a removal.
    Splice(Vec<NodeId>),
}

macro_rules! one {
    ($f:ident, $name:literal, $id:expr) => {
        $f($name, Slot::Required(*$id))
    };
}
macro_rules! opt {
    ($f:ident, $name:literal, $id:expr) => {
        $f($name, Slot::Optional(*$id))
    };
}
macro_rules! list {
    ($f:ident, $name:literal, $ids:expr) => {
        $f($name, Slot::List($ids))
    };
}

impl NodeKind {
    /// Call `f` once per child field, in source order, with the field's dump
    /// name.
    pub fn for_each_slot<'a>(&'a self, f: &mut dyn FnMut(&'static str, Slot<'a>)) {
        use NodeKind::*;
        match self {
            Program { statements } => list!(f, "statements", statements),

            NumberLiteral { .. }
            | StringLiteral { .. }
            | BooleanLiteral { .. }
            | NullLiteral
            | BigIntLiteral { .. }
            | RegExpLiteral { .. }
            | ThisExpression
            | SuperExpression
            | OmittedExpression
            | MetaProperty { .. }
            | EmptyStatement
            | BreakStatement { .. }
            | ContinueStatement { .. }
            | DebuggerStatement
            | TSKeywordType { .. }
            | TSTypeQuery { .. }
            | TSImportType { .. } => {}

            TemplateLiteral { expressions, .. } => list!(f, "expressions", expressions),
            Identifier { type_annotation, .. } => opt!(f, "typeAnnotation", type_annotation),
            ArrayExpression { elements } => list!(f, "elements", elements),
            ObjectExpression { properties } => list!(f, "properties", properties),
            Property { key, value, .. } => {
                one!(f, "key", key);
                one!(f, "value", value);
            }
            SpreadElement { argument } => one!(f, "argument", argument),
            FunctionExpression { function } | ArrowFunctionExpression { function } => {
                one!(f, "function", function)
            }
            ClassExpression { definition } => one!(f, "definition", definition),
            UnaryExpression { argument, .. } | UpdateExpression { argument, .. } => {
                one!(f, "argument", argument)
            }
            BinaryExpression { left, right, .. } | AssignmentExpression { left, right, .. } => {
                one!(f, "left", left);
                one!(f, "right", right);
            }
            ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                one!(f, "test", test);
                one!(f, "consequent", consequent);
                one!(f, "alternate", alternate);
            }
            SequenceExpression { expressions } => list!(f, "expressions", expressions),
            CallExpression {
                callee,
                type_args,
                arguments,
                ..
            }
            | NewExpression {
                callee,
                type_args,
                arguments,
            } => {
                one!(f, "callee", callee);
                list!(f, "typeArguments", type_args);
                list!(f, "arguments", arguments);
            }
            MemberExpression {
                object, property, ..
            } => {
                one!(f, "object", object);
                one!(f, "property", property);
            }
            AwaitExpression { argument } | YieldExpression { argument, .. } => {
                opt!(f, "argument", argument)
            }
            TSAsExpression {
                expression,
                type_annotation,
            } => {
                one!(f, "expression", expression);
                one!(f, "typeAnnotation", type_annotation);
            }
            TSNonNullExpression { expression } => one!(f, "expression", expression),

            ArrayPattern {
                elements,
                type_annotation,
            } => {
                list!(f, "elements", elements);
                opt!(f, "typeAnnotation", type_annotation);
            }
            ObjectPattern {
                properties,
                type_annotation,
            } => {
                list!(f, "properties", properties);
                opt!(f, "typeAnnotation", type_annotation);
            }
            AssignmentPattern { left, right } => {
                one!(f, "left", left);
                one!(f, "right", right);
            }
            RestElement {
                argument,
                type_annotation,
            } => {
                one!(f, "argument", argument);
                opt!(f, "typeAnnotation", type_annotation);
            }

            ScriptFunction {
                id,
                type_params,
                params,
                return_type,
                body,
                ..
            } => {
                opt!(f, "id", id);
                opt!(f, "typeParameters", type_params);
                list!(f, "params", params);
                opt!(f, "returnType", return_type);
                opt!(f, "body", body);
            }
            ClassDefinition {
                id,
                type_params,
                super_class,
                ctor,
                body,
            } => {
                opt!(f, "id", id);
                opt!(f, "typeParameters", type_params);
                opt!(f, "superClass", super_class);
                opt!(f, "constructor", ctor);
                list!(f, "body", body);
            }
            MethodDefinition { key, value, .. } => {
                one!(f, "key", key);
                one!(f, "value", value);
            }
            ClassProperty {
                key,
                value,
                type_annotation,
                ..
            } => {
                one!(f, "key", key);
                opt!(f, "typeAnnotation", type_annotation);
                opt!(f, "value", value);
            }

            BlockStatement { statements } => list!(f, "statements", statements),
            ExpressionStatement { expression } => one!(f, "expression", expression),
            VariableDeclaration { declarators, .. } => list!(f, "declarations", declarators),
            VariableDeclarator { id, init } => {
                one!(f, "id", id);
                opt!(f, "init", init);
            }
            FunctionDeclaration { function } => one!(f, "function", function),
            ClassDeclaration { definition } => one!(f, "definition", definition),
            ReturnStatement { argument } => opt!(f, "argument", argument),
            IfStatement {
                test,
                consequent,
                alternate,
            } => {
                one!(f, "test", test);
                one!(f, "consequent", consequent);
                opt!(f, "alternate", alternate);
            }
            ForUpdateStatement {
                init,
                test,
                update,
                body,
            } => {
                opt!(f, "init", init);
                opt!(f, "test", test);
                opt!(f, "update", update);
                one!(f, "body", body);
            }
            ForInStatement { left, right, body } | ForOfStatement { left, right, body, .. } => {
                one!(f, "left", left);
                one!(f, "right", right);
                one!(f, "body", body);
            }
            WhileStatement { test, body } => {
                one!(f, "test", test);
                one!(f, "body", body);
            }
            DoWhileStatement { body, test } => {
                one!(f, "body", body);
                one!(f, "test", test);
            }
            LabelledStatement { body, .. } => one!(f, "body", body),
            SwitchStatement {
                discriminant,
                cases,
            } => {
                one!(f, "discriminant", discriminant);
                list!(f, "cases", cases);
            }
            SwitchCaseStatement { test, consequent } => {
                opt!(f, "test", test);
                list!(f, "consequent", consequent);
            }
            ThrowStatement { argument } => one!(f, "argument", argument),
            TryStatement {
                block,
                handler,
                finalizer,
            } => {
                one!(f, "block", block);
                opt!(f, "handler", handler);
                opt!(f, "finalizer", finalizer);
            }
            CatchClause { param, body } => {
                opt!(f, "param", param);
                one!(f, "body", body);
            }
            ExportDefaultDeclaration { declaration } | ExportNamedDeclaration { declaration } => {
                one!(f, "declaration", declaration)
            }

            TSTypeAliasDeclaration {
                type_params,
                type_annotation,
                ..
            } => {
                opt!(f, "typeParameters", type_params);
                one!(f, "typeAnnotation", type_annotation);
            }
            TSInterfaceDeclaration {
                type_params,
                extends,
                body,
                ..
            } => {
                opt!(f, "typeParameters", type_params);
                list!(f, "extends", extends);
                list!(f, "body", body);
            }
            TSInterfaceHeritage { expression } => one!(f, "expression", expression),
            TSTypeParameterDeclaration { params } => list!(f, "params", params),
            TSTypeParameter {
                constraint,
                default,
                ..
            } => {
                opt!(f, "constraint", constraint);
                opt!(f, "default", default);
            }
            TSLiteralType { literal } => one!(f, "literal", literal),
            TSTypeReference { type_args, .. } => list!(f, "typeArguments", type_args),
            TSUnionType { types } | TSIntersectionType { types } => list!(f, "types", types),
            TSArrayType { element_type } => one!(f, "elementType", element_type),
            TSTupleType { element_types } => list!(f, "elementTypes", element_types),
            TSFunctionType {
                type_params,
                params,
                return_type,
            }
            | TSConstructorType {
                type_params,
                params,
                return_type,
            } => {
                opt!(f, "typeParameters", type_params);
                list!(f, "params", params);
                one!(f, "returnType", return_type);
            }
            TSTypeLiteral { members } => list!(f, "members", members),
            TSPropertySignature {
                type_annotation, ..
            } => opt!(f, "typeAnnotation", type_annotation),
            TSMethodSignature {
                type_params,
                params,
                return_type,
                ..
            }
            | TSSignatureDeclaration {
                type_params,
                params,
                return_type,
                ..
            } => {
                opt!(f, "typeParameters", type_params);
                list!(f, "params", params);
                opt!(f, "returnType", return_type);
            }
            TSIndexSignature {
                key_type,
                type_annotation,
                ..
            } => {
                one!(f, "keyType", key_type);
                one!(f, "typeAnnotation", type_annotation);
            }
            TSParenthesizedType { type_annotation } => one!(f, "typeAnnotation", type_annotation),
            TSTypePredicate {
                type_annotation, ..
            } => opt!(f, "typeAnnotation", type_annotation),
        }
    }

    /// Mutable counterpart of [`NodeKind::for_each_slot`]; same order.
    pub fn for_each_slot_mut(&mut self, f: &mut dyn FnMut(&'static str, SlotMut<'_>)) {
        use NodeKind::*;
        macro_rules! one {
            ($name:literal, $id:expr) => {
                f($name, SlotMut::Required($id))
            };
        }
        macro_rules! opt {
            ($name:literal, $id:expr) => {
                f($name, SlotMut::Optional($id))
            };
        }
        macro_rules! list {
            ($name:literal, $ids:expr) => {
                f($name, SlotMut::List($ids))
            };
        }
        match self {
            Program { statements } => list!("statements", statements),

            NumberLiteral { .. }
            | StringLiteral { .. }
            | BooleanLiteral { .. }
            | NullLiteral
            | BigIntLiteral { .. }
            | RegExpLiteral { .. }
            | ThisExpression
            | SuperExpression
            | OmittedExpression
            | MetaProperty { .. }
            | EmptyStatement
            | BreakStatement { .. }
            | ContinueStatement { .. }
            | DebuggerStatement
            | TSKeywordType { .. }
            | TSTypeQuery { .. }
            | TSImportType { .. } => {}

            TemplateLiteral { expressions, .. } => list!("expressions", expressions),
            Identifier { type_annotation, .. } => opt!("typeAnnotation", type_annotation),
            ArrayExpression { elements } => list!("elements", elements),
            ObjectExpression { properties } => list!("properties", properties),
            Property { key, value, .. } => {
                one!("key", key);
                one!("value", value);
            }
            SpreadElement { argument } => one!("argument", argument),
            FunctionExpression { function } | ArrowFunctionExpression { function } => {
                one!("function", function)
            }
            ClassExpression { definition } => one!("definition", definition),
            UnaryExpression { argument, .. } | UpdateExpression { argument, .. } => {
                one!("argument", argument)
            }
            BinaryExpression { left, right, .. } | AssignmentExpression { left, right, .. } => {
                one!("left", left);
                one!("right", right);
            }
            ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                one!("test", test);
                one!("consequent", consequent);
                one!("alternate", alternate);
            }
            SequenceExpression { expressions } => list!("expressions", expressions),
            CallExpression {
                callee,
                type_args,
                arguments,
                ..
            }
            | NewExpression {
                callee,
                type_args,
                arguments,
            } => {
                one!("callee", callee);
                list!("typeArguments", type_args);
                list!("arguments", arguments);
            }
            MemberExpression {
                object, property, ..
            } => {
                one!("object", object);
                one!("property", property);
            }
            AwaitExpression { argument } | YieldExpression { argument, .. } => {
                opt!("argument", argument)
            }
            TSAsExpression {
                expression,
                type_annotation,
            } => {
                one!("expression", expression);
                one!("typeAnnotation", type_annotation);
            }
            TSNonNullExpression { expression } => one!("expression", expression),

            ArrayPattern {
                elements,
                type_annotation,
            } => {
                list!("elements", elements);
                opt!("typeAnnotation", type_annotation);
            }
            ObjectPattern {
                properties,
                type_annotation,
            } => {
                list!("properties", properties);
                opt!("typeAnnotation", type_annotation);
            }
            AssignmentPattern { left, right } => {
                one!("left", left);
                one!("right", right);
            }
            RestElement {
                argument,
                type_annotation,
            } => {
                one!("argument", argument);
                opt!("typeAnnotation", type_annotation);
            }

            ScriptFunction {
                id,
                type_params,
                params,
                return_type,
                body,
                ..
            } => {
                opt!("id", id);
                opt!("typeParameters", type_params);
                list!("params", params);
                opt!("returnType", return_type);
                opt!("body", body);
            }
            ClassDefinition {
                id,
                type_params,
                super_class,
                ctor,
                body,
            } => {
                opt!("id", id);
                opt!("typeParameters", type_params);
                opt!("superClass", super_class);
                opt!("constructor", ctor);
                list!("body", body);
            }
            MethodDefinition { key, value, .. } => {
                one!("key", key);
                one!("value", value);
            }
            ClassProperty {
                key,
                value,
                type_annotation,
                ..
            } => {
                one!("key", key);
                opt!("typeAnnotation", type_annotation);
                opt!("value", value);
            }

            BlockStatement { statements } => list!("statements", statements),
            ExpressionStatement { expression } => one!("expression", expression),
            VariableDeclaration { declarators, .. } => list!("declarations", declarators),
            VariableDeclarator { id, init } => {
                one!("id", id);
                opt!("init", init);
            }
            FunctionDeclaration { function } => one!("function", function),
            ClassDeclaration { definition } => one!("definition", definition),
            ReturnStatement { argument } => opt!("argument", argument),
            IfStatement {
                test,
                consequent,
                alternate,
            } => {
                one!("test", test);
                one!("consequent", consequent);
                opt!("alternate", alternate);
            }
            ForUpdateStatement {
                init,
                test,
                update,
                body,
            } => {
                opt!("init", init);
                opt!("test", test);
                opt!("update", update);
                one!("body", body);
            }
            ForInStatement { left, right, body } | ForOfStatement { left, right, body, .. } => {
                one!("left", left);
                one!("right", right);
                one!("body", body);
            }
            WhileStatement { test, body } => {
                one!("test", test);
                one!("body", body);
            }
            DoWhileStatement { body, test } => {
                one!("body", body);
                one!("test", test);
            }
            LabelledStatement { body, .. } => one!("body", body),
            SwitchStatement {
                discriminant,
                cases,
            } => {
                one!("discriminant", discriminant);
                list!("cases", cases);
            }
            SwitchCaseStatement { test, consequent } => {
                opt!("test", test);
                list!("consequent", consequent);
            }
            ThrowStatement { argument } => one!("argument", argument),
            TryStatement {
                block,
                handler,
                finalizer,
            } => {
                one!("block", block);
                opt!("handler", handler);
                opt!("finalizer", finalizer);
            }
            CatchClause { param, body } => {
                opt!("param", param);
                one!("body", body);
            }
            ExportDefaultDeclaration { declaration } | ExportNamedDeclaration { declaration } => {
                one!("declaration", declaration)
            }

            TSTypeAliasDeclaration {
                type_params,
                type_annotation,
                ..
            } => {
                opt!("typeParameters", type_params);
                one!("typeAnnotation", type_annotation);
            }
            TSInterfaceDeclaration {
                type_params,
                extends,
                body,
                ..
            } => {
                opt!("typeParameters", type_params);
                list!("extends", extends);
                list!("body", body);
            }
            TSInterfaceHeritage { expression } => one!("expression", expression),
            TSTypeParameterDeclaration { params } => list!("params", params),
            TSTypeParameter {
                constraint,
                default,
                ..
            } => {
                opt!("constraint", constraint);
                opt!("default", default);
            }
            TSLiteralType { literal } => one!("literal", literal),
            TSTypeReference { type_args, .. } => list!("typeArguments", type_args),
            TSUnionType { types } | TSIntersectionType { types } => list!("types", types),
            TSArrayType { element_type } => one!("elementType", element_type),
            TSTupleType { element_types } => list!("elementTypes", element_types),
            TSFunctionType {
                type_params,
                params,
                return_type,
            }
            | TSConstructorType {
                type_params,
                params,
                return_type,
            } => {
                opt!("typeParameters", type_params);
                list!("params", params);
                one!("returnType", return_type);
            }
            TSTypeLiteral { members } => list!("members", members),
            TSPropertySignature {
                type_annotation, ..
            } => opt!("typeAnnotation", type_annotation),
            TSMethodSignature {
                type_params,
                params,
                return_type,
                ..
            }
            | TSSignatureDeclaration {
                type_params,
                params,
                return_type,
                ..
            } => {
                opt!("typeParameters", type_params);
                list!("params", params);
                opt!("returnType", return_type);
            }
            TSIndexSignature {
                key_type,
                type_annotation,
                ..
            } => {
                one!("keyType", key_type);
                one!("typeAnnotation", type_annotation);
            }
            TSParenthesizedType { type_annotation } => one!("typeAnnotation", type_annotation),
            TSTypePredicate {
                type_annotation, ..
            } => opt!("typeAnnotation", type_annotation),
        }
    }

    /// Visit every child id in source order.
    pub fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        self.for_each_slot(&mut |_, slot| match slot {
            Slot::Required(id) => f(id),
            Slot::Optional(id) => {
                if let Some(id) = id {
                    f(id)
                }
            }
            Slot::List(ids) => ids.iter().copied().for_each(&mut f),
        });
    }
}

impl Ast {
    /// Call `cb` once per immediate child of `id`, in source order.
    pub fn iterate(&self, id: NodeId, cb: impl FnMut(NodeId)) {
        self.kind(id).for_each_child(cb);
    }

    /// Immediate children of `id`, in source order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.iterate(id, |child| out.push(child));
        out
    }

    /// Visit `id` and all of its descendants, parents before children.
    pub fn walk_preorder(&self, id: NodeId, cb: &mut dyn FnMut(NodeId)) {
        cb(id);
        for child in self.children(id) {
            self.walk_preorder(child, cb);
        }
    }

    /// Rewrite the children of `id` in place.
    ///
    /// `cb` sees each child in source order and may allocate new nodes
    /// through the `&mut Ast` it receives. While it runs, the node `id`
    /// itself reads as an `EmptyStatement`.
    ///
    /// # Panics
    ///
    /// Removing a required child, or splicing anything other than exactly
    /// one node into a required slot (or more than one into an optional
    /// slot), breaks the tree's shape and panics.
    pub fn update_self(&mut self, id: NodeId, mut cb: impl FnMut(&mut Ast, NodeId) -> Transform) {
        let before = self.children(id);
        let mut kind = std::mem::replace(&mut self.node_mut(id).kind, NodeKind::EmptyStatement);
        let owner = kind.type_name();

        kind.for_each_slot_mut(&mut |field, slot| match slot {
            SlotMut::Required(child) => match cb(self, *child) {
                Transform::Keep => {}
                Transform::Replace(new) => *child = new,
                Transform::Splice(nodes) if nodes.len() == 1 => *child = nodes[0],
                Transform::Remove | Transform::Splice(_) => {
                    panic!("update_self: `{owner}.{field}` is required and cannot be removed")
                }
            },
            SlotMut::Optional(child) => {
                if let Some(current) = *child {
                    match cb(self, current) {
                        Transform::Keep => {}
                        Transform::Replace(new) => *child = Some(new),
                        Transform::Remove => *child = None,
                        Transform::Splice(nodes) => match nodes.as_slice() {
                            [] => *child = None,
                            [one] => *child = Some(*one),
                            _ => panic!("update_self: `{owner}.{field}` holds at most one node"),
                        },
                    }
                }
            }
            SlotMut::List(children) => {
                let old = std::mem::take(children);
                for current in old {
                    match cb(self, current) {
                        Transform::Keep => children.push(current),
                        Transform::Replace(new) => children.push(new),
                        Transform::Remove => {}
                        Transform::Splice(nodes) => children.extend(nodes),
                    }
                }
            }
        });

        self.node_mut(id).kind = kind;
        let after = self.children(id);
        for old in before {
            if !after.contains(&old) {
                self.node_mut(old).parent = None;
            }
        }
        for child in after {
            self.node_mut(child).parent = Some(id);
        }
        self.bump_revision();
    }
}
