//! The scope tree produced by binding.

use espanda_ast::{NodeId, ScopeId, TypeId, VariableId};
use espanda_core::collections::FxHashMap;
use espanda_core::index::IndexArena;
use espanda_core::intern::Atom;

use crate::variable::Variable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Function,
    Block,
    Loop,
    Catch,
    Class,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    /// The node that introduced the scope.
    pub node: NodeId,
    pub values: FxHashMap<Atom, VariableId>,
    pub types: FxHashMap<Atom, VariableId>,
    /// Nearest enclosing `Function` or `Global` scope, possibly itself.
    pub function_scope: ScopeId,
    /// Number of lexical environment slots; only function scopes own one.
    pub lex_env_size: u32,
    /// Slot holding `this` for arrow functions nested in this function.
    pub this_slot: Option<u32>,
}

impl Scope {
    pub fn is_function_scope(&self) -> bool {
        matches!(self.kind, ScopeKind::Function | ScopeKind::Global)
    }
}

/// Scopes, variables and resolved references of one file.
#[derive(Debug, Clone, Default)]
pub struct ScopeTree {
    pub(crate) scopes: IndexArena<ScopeId, Scope>,
    pub(crate) variables: IndexArena<VariableId, Variable>,
    pub(crate) node_scopes: FxHashMap<NodeId, ScopeId>,
    pub(crate) references: FxHashMap<NodeId, VariableId>,
    /// Arrow function scope -> the function scope whose `this` it uses.
    pub(crate) this_holders: FxHashMap<ScopeId, ScopeId>,
}

impl ScopeTree {
    pub fn global_scope(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn variable(&self, id: VariableId) -> &Variable {
        &self.variables[id]
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter()
    }

    pub fn set_variable_type(&mut self, id: VariableId, ty: TypeId) {
        self.variables[id].ts_type = Some(ty);
    }

    /// The scope introduced by `node`, if it introduces one.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.node_scopes.get(&node).copied()
    }

    /// The variable an `Identifier` (or type reference) resolved to.
    /// Unresolved names are globals and have no entry.
    pub fn reference(&self, node: NodeId) -> Option<VariableId> {
        self.references.get(&node).copied()
    }

    pub fn lookup_value(&self, from: ScopeId, name: Atom) -> Option<VariableId> {
        self.ancestors(from).find_map(|s| self.scopes[s].values.get(&name).copied())
    }

    pub fn lookup_type(&self, from: ScopeId, name: Atom) -> Option<VariableId> {
        self.ancestors(from).find_map(|s| self.scopes[s].types.get(&name).copied())
    }

    /// `from` and its enclosing scopes, innermost first.
    pub fn ancestors(&self, from: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(from), move |&s| self.scopes[s].parent)
    }

    pub fn is_global(&self, variable: VariableId) -> bool {
        self.scopes[self.variables[variable].scope].kind == ScopeKind::Global
    }

    /// Environment hops from code running in function scope `from` to the
    /// environment holding `variable`, counting only function scopes that
    /// own an environment. `None` if the variable has no slot.
    pub fn lex_address(&self, from: ScopeId, variable: VariableId) -> Option<(u32, u32)> {
        let var = &self.variables[variable];
        let slot = var.lex_slot?;
        let target = self.scopes[var.scope].function_scope;
        Some((self.env_hops(from, target)?, slot))
    }

    /// Where an arrow function running in `from` finds its `this`. `None`
    /// outside arrow functions and for arrows that never mention `this`.
    pub fn this_address(&self, from: ScopeId) -> Option<(u32, u32)> {
        let function = self.scopes[from].function_scope;
        let holder = *self.this_holders.get(&function)?;
        let slot = self.scopes[holder].this_slot?;
        Some((self.env_hops(from, holder)?, slot))
    }

    /// Size of the environment a function scope creates on entry.
    pub fn env_size(&self, function: ScopeId) -> u32 {
        self.scopes[function].lex_env_size
    }

    fn env_hops(&self, from: ScopeId, target: ScopeId) -> Option<u32> {
        let mut level = 0;
        let mut scope = self.scopes[from].function_scope;
        while scope != target {
            if self.scopes[scope].lex_env_size > 0 {
                level += 1;
            }
            let parent = self.scopes[scope].parent?;
            scope = self.scopes[parent].function_scope;
        }
        Some(level)
    }
}
