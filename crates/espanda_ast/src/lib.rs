//! espanda_ast: the syntax tree.
//!
//! Nodes live in an index arena owned by [`Ast`]; children and parents are
//! [`NodeId`]s. The node set is closed ([`NodeKind`]) and every pass over it
//! (iterate, dump, check, compile) is an exhaustive `match`.

pub mod ast;
pub mod dump;
pub mod node;
pub mod operators;
pub mod types;
pub mod visitor;

pub use ast::Ast;
pub use dump::{AstDumper, DumpError, DumpShape};
pub use node::*;
pub use operators::*;
pub use types::*;
pub use visitor::{Slot, SlotMut, Transform};
