//! Ids shared by every phase and the flag sets stored on nodes.

use espanda_core::define_index;

define_index! {
    /// Index of a node in its [`Ast`](crate::Ast). Assigned in allocation
    /// order, so a child always has a smaller id than its parent.
    pub struct NodeId;
}

define_index! {
    /// Index of a scope in the binder's scope tree.
    pub struct ScopeId;
}

define_index! {
    /// Index of a variable in the binder's scope tree.
    pub struct VariableId;
}

define_index! {
    /// Index of a type in the checker's type table.
    pub struct TypeId;
}

bitflags::bitflags! {
    /// Properties of a `ScriptFunction`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u16 {
        const ASYNC           = 1 << 0;
        const GENERATOR       = 1 << 1;
        const ARROW           = 1 << 2;
        const CONSTRUCTOR     = 1 << 3;
        const METHOD          = 1 << 4;
        const GETTER          = 1 << 5;
        const SETTER          = 1 << 6;
        /// Arrow function whose body is a single expression.
        const EXPRESSION_BODY = 1 << 7;
        /// Signature only (`declare function f(): void;`, overloads).
        const DECLARE         = 1 << 8;
        const STATIC          = 1 << 9;
    }
}

impl FunctionFlags {
    pub fn is_async(self) -> bool {
        self.contains(FunctionFlags::ASYNC)
    }

    pub fn is_generator(self) -> bool {
        self.contains(FunctionFlags::GENERATOR)
    }

    pub fn is_arrow(self) -> bool {
        self.contains(FunctionFlags::ARROW)
    }
}
