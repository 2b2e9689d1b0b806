//! espanda_checker: the type checker.
//!
//! Gives every expression and declaration a type from the [`TypeTable`],
//! checks assignability, call arity and argument types, operators, return
//! paths and class members, narrows variables inside guarded regions, and
//! reports TypeScript-numbered diagnostics. Constructs the checker does not
//! model are reported with 9001 and never silently accepted.

mod checked;
mod checker;
mod display;
mod expressions;
mod facts;
mod instantiate;
mod node_cache;
mod relation;
mod type_nodes;
mod types;

pub use checked::CheckedTypes;
pub use checker::Checker;
pub use display::type_to_string;
pub use facts::{filter_type, type_facts, TypeFacts};
pub use instantiate::Instantiator;
pub use node_cache::NodeCache;
pub use relation::{RelationKind, TypeRelation};
pub use types::{
    GlobalTypesHolder, IndexInfo, ObjectDescriptor, ObjectKind, ObjectType, Param, Property, Signature, Type,
    TypeKind, TypeTable,
};
