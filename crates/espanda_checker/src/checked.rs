//! The types a finished check hands on to code generation.

use espanda_ast::{Ast, NodeId, NodeKind, TypeId, VariableId};
use espanda_binder::Variable;
use espanda_core::collections::FxHashMap;

use crate::types::{Signature, TypeTable};

/// A checker's type table together with the declaration-to-type maps
/// needed to read it without the checker: declared types of the type
/// namespace, function and class types by declaration, and the return
/// types that were inferred after their signature was built.
#[derive(Debug, Clone)]
pub struct CheckedTypes {
    table: TypeTable,
    declared: FxHashMap<VariableId, TypeId>,
    function_types: FxHashMap<NodeId, TypeId>,
    function_nodes: FxHashMap<TypeId, NodeId>,
    inferred_returns: FxHashMap<NodeId, TypeId>,
    /// `ClassDefinition` to its constructor type.
    class_constructors: FxHashMap<NodeId, TypeId>,
    /// Instance type to constructor type.
    instance_classes: FxHashMap<TypeId, TypeId>,
    /// Constructor type to the constructor type it extends.
    class_bases: FxHashMap<TypeId, TypeId>,
}

impl CheckedTypes {
    pub(crate) fn new(
        table: TypeTable,
        declared: FxHashMap<VariableId, TypeId>,
        function_types: FxHashMap<NodeId, TypeId>,
        inferred_returns: FxHashMap<NodeId, TypeId>,
        classes: impl Iterator<Item = (NodeId, TypeId, TypeId, Option<TypeId>)>,
    ) -> Self {
        let function_nodes = function_types.iter().map(|(&node, &ty)| (ty, node)).collect();
        let mut class_constructors = FxHashMap::default();
        let mut instance_classes = FxHashMap::default();
        let mut class_bases = FxHashMap::default();
        for (definition, instance, constructor, base) in classes {
            class_constructors.insert(definition, constructor);
            instance_classes.insert(instance, constructor);
            if let Some(base) = base {
                class_bases.insert(constructor, base);
            }
        }
        Self {
            table,
            declared,
            function_types,
            function_nodes,
            inferred_returns,
            class_constructors,
            instance_classes,
            class_bases,
        }
    }

    pub fn table(&self) -> &TypeTable {
        &self.table
    }

    /// The type an alias, interface or class declares, if it was resolved.
    pub fn declared_type(&self, var: VariableId) -> Option<TypeId> {
        self.declared.get(&var).copied()
    }

    /// The value type of `variable`. Functions and classes the program never
    /// referenced by name are found through their declarations.
    pub fn value_type(&self, ast: &Ast, variable: &Variable) -> Option<TypeId> {
        if variable.ts_type.is_some() {
            return variable.ts_type;
        }
        match ast.kind(variable.decl) {
            NodeKind::FunctionDeclaration { function } => self.function_types.get(function).copied(),
            NodeKind::ClassDeclaration { definition } => self.class_constructors.get(definition).copied(),
            _ => None,
        }
    }

    /// The `ScriptFunction` a function type was built from.
    pub fn function_node(&self, ty: TypeId) -> Option<NodeId> {
        self.function_nodes.get(&ty).copied()
    }

    /// The return type of `signature`, with a lazily inferred one settled.
    pub fn return_type(&self, signature: &Signature) -> TypeId {
        let g = self.table.globals();
        if signature.return_type != g.resolving_return_type {
            return signature.return_type;
        }
        signature
            .decl
            .and_then(|decl| self.inferred_returns.get(&decl).copied())
            .unwrap_or(g.any)
    }

    /// The constructor type of the class `instance` is an instance of.
    pub fn class_of_instance(&self, instance: TypeId) -> Option<TypeId> {
        self.instance_classes.get(&instance).copied()
    }

    /// The constructor type a class constructor extends.
    pub fn base_class(&self, constructor: TypeId) -> Option<TypeId> {
        self.class_bases.get(&constructor).copied()
    }
}
