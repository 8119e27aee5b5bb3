// This module defines error types for the tapec compiler using the thiserror crate for
// idiomatic Rust error handling. ParseError covers the two structural failures of the loop
// matcher (an opened loop that is never closed and a loop end without an open loop); its
// messages match the diagnostics printed by the command line tool. IrError covers verifier
// failures of an intermediate program. CompileError is the umbrella enum used by the driver,
// the backends and the linker, converting from the narrower errors with #[from] so that every
// layer can propagate with `?`. CompileResult<T> is a convenience alias.

//! Error types for the tapec compiler.

use thiserror::Error;

use crate::ir::BlockId;

/// Structural errors found while matching loops.
///
/// Carries no position information; the emission engine logs where it stopped.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("Loop was not ended!")]
    NoLoopEnd,

    #[error("Loop was not started!")]
    NoLoopStart,
}

/// Verifier failures of an intermediate program.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IrError {
    #[error("block {block} has no terminator")]
    UnterminatedBlock { block: BlockId },

    #[error("block {block} has an operation after its terminator")]
    OperationAfterTerminator { block: BlockId },

    #[error("block {block} branches to unknown block {target}")]
    UnknownTarget { block: BlockId, target: BlockId },

    #[error("expected exactly one underflow block, found {count}")]
    ErrorPathCount { count: usize },

    #[error("module has no blocks")]
    Empty,
}

/// Main error type for a compilation run.
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Parsing Error: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid intermediate program: {0}")]
    Ir(#[from] IrError),

    #[error("Code generation failed: {0}")]
    Encoding(#[from] crate::x64::EncodingError),

    #[error("Object emission failed: {0}")]
    Object(#[from] object::write::Error),

    #[error("Execution failed: {0}")]
    Vm(#[from] crate::vm::VmError),

    #[error("Linking failed: {reason}")]
    Link { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
