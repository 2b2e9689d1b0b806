//! The closed set of node kinds.
//!
//! Child links are [`NodeId`]s into the owning [`Ast`](crate::Ast). Names,
//! labels and string values are interned [`Atom`]s.

use crate::operators::*;
use crate::types::{FunctionFlags, NodeId};
use espanda_core::intern::Atom;
use espanda_core::text::TextRange;

/// One node of the tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub range: TextRange,
    /// Back link to the owning node. `None` for the root and for nodes that
    /// were detached by a rewrite.
    pub parent: Option<NodeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableDeclarationKind {
    Var,
    Let,
    Const,
}

impl VariableDeclarationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            VariableDeclarationKind::Var => "var",
            VariableDeclarationKind::Let => "let",
            VariableDeclarationKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Init,
    Get,
    Set,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Constructor,
    Method,
    Get,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaPropertyKind {
    NewTarget,
    ImportMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Call,
    Construct,
}

/// Keyword type annotations (`number`, `string`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordType {
    Any,
    Unknown,
    Number,
    String,
    Boolean,
    BigInt,
    Symbol,
    Object,
    Void,
    Undefined,
    Null,
    Never,
}

impl KeywordType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeywordType::Any => "any",
            KeywordType::Unknown => "unknown",
            KeywordType::Number => "number",
            KeywordType::String => "string",
            KeywordType::Boolean => "boolean",
            KeywordType::BigInt => "bigint",
            KeywordType::Symbol => "symbol",
            KeywordType::Object => "object",
            KeywordType::Void => "void",
            KeywordType::Undefined => "undefined",
            KeywordType::Null => "null",
            KeywordType::Never => "never",
        }
    }

    pub fn from_str(s: &str) -> Option<KeywordType> {
        Some(match s {
            "any" => KeywordType::Any,
            "unknown" => KeywordType::Unknown,
            "number" => KeywordType::Number,
            "string" => KeywordType::String,
            "boolean" => KeywordType::Boolean,
            "bigint" => KeywordType::BigInt,
            "symbol" => KeywordType::Symbol,
            "object" => KeywordType::Object,
            "void" => KeywordType::Void,
            "undefined" => KeywordType::Undefined,
            "null" => KeywordType::Null,
            "never" => KeywordType::Never,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Program {
        statements: Vec<NodeId>,
    },

    // ---- literals ----
    NumberLiteral {
        value: f64,
    },
    StringLiteral {
        value: Atom,
    },
    BooleanLiteral {
        value: bool,
    },
    NullLiteral,
    BigIntLiteral {
        value: Atom,
    },
    RegExpLiteral {
        pattern: Atom,
        flags: Atom,
    },
    /// `` `a${x}b` ``: `quasis.len() == expressions.len() + 1`.
    TemplateLiteral {
        quasis: Vec<Atom>,
        expressions: Vec<NodeId>,
    },

    // ---- expressions ----
    /// Also used for binding names (with an optional type annotation) and
    /// for non-computed property keys.
    Identifier {
        name: Atom,
        type_annotation: Option<NodeId>,
        optional: bool,
    },
    ThisExpression,
    SuperExpression,
    ArrayExpression {
        elements: Vec<NodeId>,
    },
    ObjectExpression {
        properties: Vec<NodeId>,
    },
    Property {
        kind: PropertyKind,
        key: NodeId,
        value: NodeId,
        computed: bool,
        shorthand: bool,
    },
    SpreadElement {
        argument: NodeId,
    },
    /// A hole in an array literal or array pattern.
    OmittedExpression,
    FunctionExpression {
        function: NodeId,
    },
    ArrowFunctionExpression {
        function: NodeId,
    },
    ClassExpression {
        definition: NodeId,
    },
    UnaryExpression {
        operator: UnaryOperator,
        argument: NodeId,
    },
    UpdateExpression {
        operator: UpdateOperator,
        prefix: bool,
        argument: NodeId,
    },
    BinaryExpression {
        operator: BinaryOperator,
        left: NodeId,
        right: NodeId,
    },
    AssignmentExpression {
        operator: AssignmentOperator,
        left: NodeId,
        right: NodeId,
    },
    ConditionalExpression {
        test: NodeId,
        consequent: NodeId,
        alternate: NodeId,
    },
    SequenceExpression {
        expressions: Vec<NodeId>,
    },
    CallExpression {
        callee: NodeId,
        type_args: Vec<NodeId>,
        arguments: Vec<NodeId>,
        optional: bool,
    },
    NewExpression {
        callee: NodeId,
        type_args: Vec<NodeId>,
        arguments: Vec<NodeId>,
    },
    /// `object.property` or `object[property]`. A non-computed property is an
    /// `Identifier` node that is a name, not a reference.
    MemberExpression {
        object: NodeId,
        property: NodeId,
        computed: bool,
        optional: bool,
    },
    AwaitExpression {
        argument: Option<NodeId>,
    },
    YieldExpression {
        argument: Option<NodeId>,
        delegate: bool,
    },
    MetaProperty {
        kind: MetaPropertyKind,
    },
    TSAsExpression {
        expression: NodeId,
        type_annotation: NodeId,
    },
    TSNonNullExpression {
        expression: NodeId,
    },

    // ---- patterns ----
    ArrayPattern {
        elements: Vec<NodeId>,
        type_annotation: Option<NodeId>,
    },
    ObjectPattern {
        properties: Vec<NodeId>,
        type_annotation: Option<NodeId>,
    },
    AssignmentPattern {
        left: NodeId,
        right: NodeId,
    },
    RestElement {
        argument: NodeId,
        type_annotation: Option<NodeId>,
    },

    // ---- functions and classes ----
    ScriptFunction {
        id: Option<NodeId>,
        type_params: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        /// A `BlockStatement`, an expression for expression-bodied arrows,
        /// or `None` for signatures without a body.
        body: Option<NodeId>,
        flags: FunctionFlags,
    },
    ClassDefinition {
        id: Option<NodeId>,
        type_params: Option<NodeId>,
        super_class: Option<NodeId>,
        /// The explicit constructor `MethodDefinition`, if any.
        ctor: Option<NodeId>,
        body: Vec<NodeId>,
    },
    MethodDefinition {
        kind: MethodKind,
        key: NodeId,
        value: NodeId,
        is_static: bool,
        computed: bool,
    },
    ClassProperty {
        key: NodeId,
        value: Option<NodeId>,
        type_annotation: Option<NodeId>,
        is_static: bool,
        readonly: bool,
        optional: bool,
        computed: bool,
    },

    // ---- statements ----
    BlockStatement {
        statements: Vec<NodeId>,
    },
    EmptyStatement,
    ExpressionStatement {
        expression: NodeId,
    },
    VariableDeclaration {
        kind: VariableDeclarationKind,
        declarators: Vec<NodeId>,
        declare: bool,
    },
    VariableDeclarator {
        id: NodeId,
        init: Option<NodeId>,
    },
    FunctionDeclaration {
        function: NodeId,
    },
    ClassDeclaration {
        definition: NodeId,
    },
    ReturnStatement {
        argument: Option<NodeId>,
    },
    IfStatement {
        test: NodeId,
        consequent: NodeId,
        alternate: Option<NodeId>,
    },
    ForUpdateStatement {
        init: Option<NodeId>,
        test: Option<NodeId>,
        update: Option<NodeId>,
        body: NodeId,
    },
    ForInStatement {
        left: NodeId,
        right: NodeId,
        body: NodeId,
    },
    ForOfStatement {
        left: NodeId,
        right: NodeId,
        body: NodeId,
        is_await: bool,
    },
    WhileStatement {
        test: NodeId,
        body: NodeId,
    },
    DoWhileStatement {
        body: NodeId,
        test: NodeId,
    },
    BreakStatement {
        label: Option<Atom>,
    },
    ContinueStatement {
        label: Option<Atom>,
    },
    LabelledStatement {
        label: Atom,
        body: NodeId,
    },
    SwitchStatement {
        discriminant: NodeId,
        cases: Vec<NodeId>,
    },
    /// `case test:` or `default:` when `test` is `None`.
    SwitchCaseStatement {
        test: Option<NodeId>,
        consequent: Vec<NodeId>,
    },
    ThrowStatement {
        argument: NodeId,
    },
    TryStatement {
        block: NodeId,
        handler: Option<NodeId>,
        finalizer: Option<NodeId>,
    },
    CatchClause {
        param: Option<NodeId>,
        body: NodeId,
    },
    DebuggerStatement,
    ExportDefaultDeclaration {
        declaration: NodeId,
    },
    ExportNamedDeclaration {
        declaration: NodeId,
    },

    // ---- TypeScript declarations ----
    TSTypeAliasDeclaration {
        id: Atom,
        type_params: Option<NodeId>,
        type_annotation: NodeId,
    },
    TSInterfaceDeclaration {
        id: Atom,
        type_params: Option<NodeId>,
        extends: Vec<NodeId>,
        body: Vec<NodeId>,
    },
    TSInterfaceHeritage {
        expression: NodeId,
    },
    TSTypeParameterDeclaration {
        params: Vec<NodeId>,
    },
    TSTypeParameter {
        name: Atom,
        constraint: Option<NodeId>,
        default: Option<NodeId>,
    },

    // ---- TypeScript type nodes ----
    TSKeywordType {
        keyword: KeywordType,
    },
    TSLiteralType {
        literal: NodeId,
    },
    TSTypeReference {
        type_name: Atom,
        type_args: Vec<NodeId>,
    },
    TSUnionType {
        types: Vec<NodeId>,
    },
    TSIntersectionType {
        types: Vec<NodeId>,
    },
    TSArrayType {
        element_type: NodeId,
    },
    TSTupleType {
        element_types: Vec<NodeId>,
    },
    TSFunctionType {
        type_params: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: NodeId,
    },
    TSConstructorType {
        type_params: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: NodeId,
    },
    TSTypeLiteral {
        members: Vec<NodeId>,
    },
    TSPropertySignature {
        key: Atom,
        type_annotation: Option<NodeId>,
        optional: bool,
        readonly: bool,
    },
    TSMethodSignature {
        key: Atom,
        type_params: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
        optional: bool,
    },
    TSSignatureDeclaration {
        kind: SignatureKind,
        type_params: Option<NodeId>,
        params: Vec<NodeId>,
        return_type: Option<NodeId>,
    },
    TSIndexSignature {
        param_name: Atom,
        key_type: NodeId,
        type_annotation: NodeId,
        readonly: bool,
    },
    TSParenthesizedType {
        type_annotation: NodeId,
    },
    TSTypeQuery {
        expr_name: Atom,
    },
    TSTypePredicate {
        parameter_name: Atom,
        type_annotation: Option<NodeId>,
        asserts: bool,
    },
    TSImportType {
        argument: Atom,
        qualifier: Option<Atom>,
    },
}

impl NodeKind {
    /// The kind name used by dumps (`"BinaryExpression"`, `"TSNumberKeyword"`).
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Program { .. } => "Program",
            NodeKind::NumberLiteral { .. } => "NumberLiteral",
            NodeKind::StringLiteral { .. } => "StringLiteral",
            NodeKind::BooleanLiteral { .. } => "BooleanLiteral",
            NodeKind::NullLiteral => "NullLiteral",
            NodeKind::BigIntLiteral { .. } => "BigIntLiteral",
            NodeKind::RegExpLiteral { .. } => "RegExpLiteral",
            NodeKind::TemplateLiteral { .. } => "TemplateLiteral",
            NodeKind::Identifier { .. } => "Identifier",
            NodeKind::ThisExpression => "ThisExpression",
            NodeKind::SuperExpression => "SuperExpression",
            NodeKind::ArrayExpression { .. } => "ArrayExpression",
            NodeKind::ObjectExpression { .. } => "ObjectExpression",
            NodeKind::Property { .. } => "Property",
            NodeKind::SpreadElement { .. } => "SpreadElement",
            NodeKind::OmittedExpression => "OmittedExpression",
            NodeKind::FunctionExpression { .. } => "FunctionExpression",
            NodeKind::ArrowFunctionExpression { .. } => "ArrowFunctionExpression",
            NodeKind::ClassExpression { .. } => "ClassExpression",
            NodeKind::UnaryExpression { .. } => "UnaryExpression",
            NodeKind::UpdateExpression { .. } => "UpdateExpression",
            NodeKind::BinaryExpression { .. } => "BinaryExpression",
            NodeKind::AssignmentExpression { .. } => "AssignmentExpression",
            NodeKind::ConditionalExpression { .. } => "ConditionalExpression",
            NodeKind::SequenceExpression { .. } => "SequenceExpression",
            NodeKind::CallExpression { .. } => "CallExpression",
            NodeKind::NewExpression { .. } => "NewExpression",
            NodeKind::MemberExpression { .. } => "MemberExpression",
            NodeKind::AwaitExpression { .. } => "AwaitExpression",
            NodeKind::YieldExpression { .. } => "YieldExpression",
            NodeKind::MetaProperty { .. } => "MetaProperty",
            NodeKind::TSAsExpression { .. } => "TSAsExpression",
            NodeKind::TSNonNullExpression { .. } => "TSNonNullExpression",
            NodeKind::ArrayPattern { .. } => "ArrayPattern",
            NodeKind::ObjectPattern { .. } => "ObjectPattern",
            NodeKind::AssignmentPattern { .. } => "AssignmentPattern",
            NodeKind::RestElement { .. } => "RestElement",
            NodeKind::ScriptFunction { .. } => "ScriptFunction",
            NodeKind::ClassDefinition { .. } => "ClassDefinition",
            NodeKind::MethodDefinition { .. } => "MethodDefinition",
            NodeKind::ClassProperty { .. } => "ClassProperty",
            NodeKind::BlockStatement { .. } => "BlockStatement",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::ExpressionStatement { .. } => "ExpressionStatement",
            NodeKind::VariableDeclaration { .. } => "VariableDeclaration",
            NodeKind::VariableDeclarator { .. } => "VariableDeclarator",
            NodeKind::FunctionDeclaration { .. } => "FunctionDeclaration",
            NodeKind::ClassDeclaration { .. } => "ClassDeclaration",
            NodeKind::ReturnStatement { .. } => "ReturnStatement",
            NodeKind::IfStatement { .. } => "IfStatement",
            NodeKind::ForUpdateStatement { .. } => "ForUpdateStatement",
            NodeKind::ForInStatement { .. } => "ForInStatement",
            NodeKind::ForOfStatement { .. } => "ForOfStatement",
            NodeKind::WhileStatement { .. } => "WhileStatement",
            NodeKind::DoWhileStatement { .. } => "DoWhileStatement",
            NodeKind::BreakStatement { .. } => "BreakStatement",
            NodeKind::ContinueStatement { .. } => "ContinueStatement",
            NodeKind::LabelledStatement { .. } => "LabelledStatement",
            NodeKind::SwitchStatement { .. } => "SwitchStatement",
            NodeKind::SwitchCaseStatement { .. } => "SwitchCase",
            NodeKind::ThrowStatement { .. } => "ThrowStatement",
            NodeKind::TryStatement { .. } => "TryStatement",
            NodeKind::CatchClause { .. } => "CatchClause",
            NodeKind::DebuggerStatement => "DebuggerStatement",
            NodeKind::ExportDefaultDeclaration { .. } => "ExportDefaultDeclaration",
            NodeKind::ExportNamedDeclaration { .. } => "ExportNamedDeclaration",
            NodeKind::TSTypeAliasDeclaration { .. } => "TSTypeAliasDeclaration",
            NodeKind::TSInterfaceDeclaration { .. } => "TSInterfaceDeclaration",
            NodeKind::TSInterfaceHeritage { .. } => "TSInterfaceHeritage",
            NodeKind::TSTypeParameterDeclaration { .. } => "TSTypeParameterDeclaration",
            NodeKind::TSTypeParameter { .. } => "TSTypeParameter",
            NodeKind::TSKeywordType { keyword } => match keyword {
                KeywordType::Any => "TSAnyKeyword",
                KeywordType::Unknown => "TSUnknownKeyword",
                KeywordType::Number => "TSNumberKeyword",
                KeywordType::String => "TSStringKeyword",
                KeywordType::Boolean => "TSBooleanKeyword",
                KeywordType::BigInt => "TSBigintKeyword",
                KeywordType::Symbol => "TSSymbolKeyword",
                KeywordType::Object => "TSObjectKeyword",
                KeywordType::Void => "TSVoidKeyword",
                KeywordType::Undefined => "TSUndefinedKeyword",
                KeywordType::Null => "TSNullKeyword",
                KeywordType::Never => "TSNeverKeyword",
            },
            NodeKind::TSLiteralType { .. } => "TSLiteralType",
            NodeKind::TSTypeReference { .. } => "TSTypeReference",
            NodeKind::TSUnionType { .. } => "TSUnionType",
            NodeKind::TSIntersectionType { .. } => "TSIntersectionType",
            NodeKind::TSArrayType { .. } => "TSArrayType",
            NodeKind::TSTupleType { .. } => "TSTupleType",
            NodeKind::TSFunctionType { .. } => "TSFunctionType",
            NodeKind::TSConstructorType { .. } => "TSConstructorType",
            NodeKind::TSTypeLiteral { .. } => "TSTypeLiteral",
            NodeKind::TSPropertySignature { .. } => "TSPropertySignature",
            NodeKind::TSMethodSignature { .. } => "TSMethodSignature",
            NodeKind::TSSignatureDeclaration { kind, .. } => match kind {
                SignatureKind::Call => "TSCallSignatureDeclaration",
                SignatureKind::Construct => "TSConstructSignatureDeclaration",
            },
            NodeKind::TSIndexSignature { .. } => "TSIndexSignature",
            NodeKind::TSParenthesizedType { .. } => "TSParenthesizedType",
            NodeKind::TSTypeQuery { .. } => "TSTypeQuery",
            NodeKind::TSTypePredicate { .. } => "TSTypePredicate",
            NodeKind::TSImportType { .. } => "TSImportType",
        }
    }

    /// Type annotation nodes, which never produce a runtime value.
    pub fn is_type_node(&self) -> bool {
        matches!(
            self,
            NodeKind::TSKeywordType { .. }
                | NodeKind::TSLiteralType { .. }
                | NodeKind::TSTypeReference { .. }
                | NodeKind::TSUnionType { .. }
                | NodeKind::TSIntersectionType { .. }
                | NodeKind::TSArrayType { .. }
                | NodeKind::TSTupleType { .. }
                | NodeKind::TSFunctionType { .. }
                | NodeKind::TSConstructorType { .. }
                | NodeKind::TSTypeLiteral { .. }
                | NodeKind::TSParenthesizedType { .. }
                | NodeKind::TSTypeQuery { .. }
                | NodeKind::TSTypePredicate { .. }
                | NodeKind::TSImportType { .. }
        )
    }

    /// Nodes that are the target of an unlabelled `continue`.
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::ForUpdateStatement { .. }
                | NodeKind::ForInStatement { .. }
                | NodeKind::ForOfStatement { .. }
                | NodeKind::WhileStatement { .. }
                | NodeKind::DoWhileStatement { .. }
        )
    }

    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            NodeKind::NumberLiteral { .. }
                | NodeKind::StringLiteral { .. }
                | NodeKind::BooleanLiteral { .. }
                | NodeKind::NullLiteral
                | NodeKind::BigIntLiteral { .. }
        )
    }
}
