// This module defines the IrBuilder trait, the construction interface between the emission
// engine and whatever turns its output into something executable. The engine never touches a
// concrete program representation: it creates blocks, positions the builder, and appends
// operations from a small vocabulary (tape allocation, cell load/store, 8-bit cell arithmetic,
// 64-bit pointer arithmetic, calls into the tape and input runtimes, conditional and
// unconditional branches, and the two process exits). Any backend, whether an in-memory
// intermediate program, an interpreter, or a native code generator, implements this trait to
// receive the emitted program. Block handles are opaque associated types.

//! Backend-agnostic program construction.
//!
//! The machine model seen through this interface has three pieces of state:
//! the tape (base and capacity), a 64-bit pointer index into it, and an 8-bit
//! accumulator used to carry a cell value between operations.

use std::fmt;

/// Arithmetic applied to the accumulator or the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
}

impl ArithOp {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
        }
    }
}

/// Branch conditions understood by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// The accumulator is not zero.
    CellNonZero,
    /// The pointer index is zero.
    PointerZero,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::CellNonZero => write!(f, "cell.nz"),
            Condition::PointerZero => write!(f, "ptr.z"),
        }
    }
}

/// Runtime operations reached by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeCall {
    /// Double the tape when the pointer has reached its capacity.
    GrowTape,
    /// Fetch the next input byte into the accumulator.
    ReadByte,
    /// Write the accumulator to standard output.
    WriteByte,
}

impl RuntimeCall {
    /// Symbol name used by native backends and the textual listing.
    pub const fn symbol(self) -> &'static str {
        match self {
            RuntimeCall::GrowTape => "tapec_grow",
            RuntimeCall::ReadByte => "tapec_input",
            RuntimeCall::WriteByte => "putchar",
        }
    }
}

/// Construction interface implemented by every program representation.
///
/// Operations are appended to the block the builder is positioned at.
/// Terminators (`branch`, `cond_branch`, `ret`, `abort_underflow`) end a
/// block; the caller repositions before appending again.
pub trait IrBuilder {
    type Block: Copy + Eq + fmt::Debug;

    /// Create a new, empty block. Names need not be unique.
    fn create_block(&mut self, name: &'static str) -> Self::Block;

    /// Direct subsequent operations into `block`.
    fn position_at_end(&mut self, block: Self::Block);

    /// Block currently receiving operations.
    fn current_block(&self) -> Self::Block;

    /// Allocate a zeroed tape of `cells` bytes and reset the pointer.
    fn allocate_tape(&mut self, cells: u64);

    /// accumulator <- tape[pointer]
    fn load_cell(&mut self);

    /// tape[pointer] <- accumulator
    fn store_cell(&mut self);

    /// accumulator <- accumulator op amount, wrapping at 256.
    fn cell_arith(&mut self, op: ArithOp, amount: u8);

    /// pointer <- pointer op amount.
    fn pointer_arith(&mut self, op: ArithOp, amount: u64);

    fn call(&mut self, target: RuntimeCall);

    fn branch(&mut self, target: Self::Block);

    fn cond_branch(&mut self, cond: Condition, then_block: Self::Block, else_block: Self::Block);

    /// Normal process exit.
    fn ret(&mut self, status: i32);

    /// Write the underflow diagnostic and exit with status 1.
    fn abort_underflow(&mut self);
}
