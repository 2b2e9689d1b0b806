//! espanda_binder: scope analysis.
//!
//! Walks the AST once, builds the [`ScopeTree`] (scopes, variables, and the
//! variable every identifier resolves to), hoists `var` and function
//! declarations, reports redeclarations, and assigns lexical environment
//! slots to variables captured by nested functions.

mod binder;
mod scope;
mod variable;

pub use binder::{bind, BindResult, Binder};
pub use scope::{Scope, ScopeKind, ScopeTree};
pub use variable::{Variable, VariableFlags, VariableKind};
