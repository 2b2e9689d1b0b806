//! Variables: one per declared name per scope.

use espanda_ast::{NodeId, ScopeId, TypeId, VariableId};
use espanda_core::intern::Atom;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Var,
    Let,
    Const,
    Param,
    Function,
    Class,
    CatchParam,
    TypeAlias,
    Interface,
    TypeParameter,
}

impl VariableKind {
    /// `let`, `const` and `class` bindings: one declaration per scope and a
    /// temporal dead zone.
    pub fn is_block_scoped(self) -> bool {
        matches!(self, VariableKind::Let | VariableKind::Const | VariableKind::Class)
    }

    /// Kinds that live in the type namespace only.
    pub fn is_type_only(self) -> bool {
        matches!(
            self,
            VariableKind::TypeAlias | VariableKind::Interface | VariableKind::TypeParameter
        )
    }

    pub fn is_const(self) -> bool {
        matches!(self, VariableKind::Const)
    }
}

bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VariableFlags: u8 {
        /// Referenced from a function nested inside the declaring one.
        const CAPTURED    = 1 << 0;
        /// Has an initializer, or is a parameter/function/class.
        const INITIALIZED = 1 << 1;
        /// Declared before its position in the source (`var`, functions).
        const HOISTED     = 1 << 2;
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub id: VariableId,
    pub name: Atom,
    pub kind: VariableKind,
    pub flags: VariableFlags,
    /// First declaration: the binding `Identifier` for variables and
    /// parameters, the declaration node for functions, classes and types.
    pub decl: NodeId,
    /// Every declaration merged into this variable (overloads, interface
    /// merging, repeated `var`).
    pub declarations: SmallVec<[NodeId; 1]>,
    pub scope: ScopeId,
    /// Set by the checker once the declared or inferred type is known.
    pub ts_type: Option<TypeId>,
    /// Slot in the declaring function's lexical environment, for captured
    /// variables outside the global scope.
    pub lex_slot: Option<u32>,
}

impl Variable {
    pub fn is_captured(&self) -> bool {
        self.flags.contains(VariableFlags::CAPTURED)
    }
}
