// This module defines the concrete intermediate program that the emission engine produces
// through the ModuleBuilder. A Module is a single function made of basic blocks; each Block
// holds a list of straight-line operations over the tape machine state and exactly one
// terminator. The representation is small: tape allocation, cell load/store,
// wrapping 8-bit cell arithmetic, 64-bit pointer arithmetic, named runtime calls, and the
// four terminators (jump, conditional branch, return, underflow abort). Both backends, the
// interpreter in crate::vm and the x86-64 code generator in crate::x64, consume this form.
// The module also provides a textual listing, predecessor queries and a structural verifier.

//! Intermediate program representation.

pub mod builder;
mod print;
mod verify;

pub use builder::ModuleBuilder;
pub use crate::core::builder::{ArithOp, Condition, RuntimeCall};

use std::fmt;

/// Dense block index, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}", self.0)
    }
}

/// Straight-line operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    AllocateTape(u64),
    LoadCell,
    StoreCell,
    CellArith(ArithOp, u8),
    PointerArith(ArithOp, u64),
    Call(RuntimeCall),
}

/// Block terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    Branch {
        cond: Condition,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return(i32),
    AbortUnderflow,
}

impl Terminator {
    pub fn successors(&self) -> impl Iterator<Item = BlockId> {
        let succs = match *self {
            Terminator::Jump(target) => [Some(target), None],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => [Some(then_block), Some(else_block)],
            Terminator::Return(_) | Terminator::AbortUnderflow => [None, None],
        };
        succs.into_iter().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub name: &'static str,
    pub ops: Vec<Op>,
    pub terminator: Terminator,
}

/// A complete intermediate program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    name: String,
    blocks: Vec<Block>,
}

impl Module {
    /// Assemble a module from finished blocks. Block 0 is the entry.
    ///
    /// No checks are made here; see [`Module::verify`].
    pub fn from_blocks(name: impl Into<String>, blocks: Vec<Block>) -> Self {
        Self {
            name: name.into(),
            blocks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> BlockId {
        BlockId(0)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.index())
    }

    /// Iterate `(id, block)` pairs in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (BlockId, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .map(|(idx, block)| (BlockId(idx as u32), block))
    }

    /// Blocks whose terminator can transfer control to `target`.
    pub fn predecessors(&self, target: BlockId) -> Vec<BlockId> {
        self.iter()
            .filter(|(_, block)| block.terminator.successors().any(|succ| succ == target))
            .map(|(id, _)| id)
            .collect()
    }

    /// Entry test blocks of all loops, in source order.
    pub fn loop_headers(&self) -> Vec<BlockId> {
        self.iter()
            .filter(|(_, block)| block.name == "loop")
            .map(|(id, _)| id)
            .collect()
    }

    /// The shared underflow block, if present.
    pub fn error_block(&self) -> Option<BlockId> {
        self.iter()
            .find(|(_, block)| block.terminator == Terminator::AbortUnderflow)
            .map(|(id, _)| id)
    }

    /// Total number of straight-line operations.
    pub fn op_count(&self) -> usize {
        self.blocks.iter().map(|block| block.ops.len()).sum()
    }
}
