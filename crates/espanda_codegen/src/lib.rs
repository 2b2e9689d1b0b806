//! espanda_codegen: lowers a bound AST to register-based bytecode.
//!
//! [`compile`] turns one file into a [`CompiledProgram`]: the top-level
//! function `func_main_0`, one [`CompiledFunction`] per function, method
//! and constructor reachable from it, and the literal buffers they use.
//! Each function is emitted by a `PandaGen`, which owns the instruction
//! list, labels, registers and the stack of dynamic contexts that
//! `break`, `continue` and `return` unwind through. [`compile_with_types`]
//! additionally records the checked types of the top-level bindings.

mod classes;
mod context;
mod dynamic_context;
mod error;
mod expressions;
mod function_builder;
mod functions;
mod insn;
mod literals;
mod lreference;
mod pandagen;
mod program;
mod statements;
mod type_recorder;

pub use context::{compile, compile_with_types, CodegenOptions, MAIN_FUNCTION};
pub use error::{CompileError, CompileResult};
pub use insn::{Insn, Label, Opcode, Operand, Operands, VReg};
pub use pandagen::{MAX_REGISTERS, IMPLICIT_PARAMS};
pub use program::{
    CatchTable, CompiledFunction, CompiledProgram, FunctionKind, LabelTargetEntry, LiteralBuffer, LiteralValue,
    ResumePoint, SuspendKind, TypeInfo, TypedBinding,
};
pub use type_recorder::{PrimitiveType, UserTypeTag, USER_TYPE_INDEX_HEAD};
