use thiserror::Error;

/// Fatal code generation errors. Code generation stops at the first one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A `break` or `continue` with no enclosing statement it can target.
    #[error("{file}:{offset}: no enclosing target for '{statement}'")]
    UnresolvedJumpTarget {
        file: String,
        offset: u32,
        statement: String,
    },

    #[error("{file}:{offset}: {feature} is not supported by the code generator")]
    Unsupported {
        file: String,
        offset: u32,
        feature: String,
    },

    #[error("function '{function}' needs more than {limit} registers")]
    RegisterOverflow { function: String, limit: u32 },
}

pub type CompileResult<T = ()> = Result<T, CompileError>;
