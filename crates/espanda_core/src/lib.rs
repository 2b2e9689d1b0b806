//! espanda_core: shared building blocks for the espanda front end.
//!
//! Index arenas, string interning, source positions and the hash
//! collections every later phase reuses.

pub mod collections;
pub mod index;
pub mod intern;
pub mod number;
pub mod text;

pub use index::{ArenaIndex, IndexArena};
pub use intern::{Atom, InternedString, StringInterner};
pub use number::format_number;
pub use text::{LineMap, TextRange, TextSpan};

#[doc(hidden)]
pub use serde as __serde;
