//! espanda_parser: recursive descent parser for the TypeScript subset.
//!
//! Turns scanner tokens into an [`espanda_ast::Ast`]. Syntax errors are
//! collected rather than fatal; after an error the parser resynchronizes at
//! the next statement and keeps going, so one run reports every problem in a
//! file.

mod expressions;
mod parser;
mod precedence;
mod type_nodes;
mod utilities;

pub use parser::{parse, ParseResult, Parser};
