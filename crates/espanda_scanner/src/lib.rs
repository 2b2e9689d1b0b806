//! espanda_scanner: the lexer.
//!
//! Produces [`Token`]s on demand for the parser. Regular expressions,
//! template continuations and multi-character `>` operators depend on
//! parser context and are produced by the `rescan_*` methods.

mod scanner;
mod token;

pub use scanner::{Scanner, ScannerState};
pub use token::{Token, TokenFlags, TokenKind};
