//! Textual listing of a [`Module`].
//!
//! ```text
//! module "hello"
//! block0 entry:
//!   alloc 4
//!   load
//!   cell.add 4
//!   store
//!   ret 0
//! block1 error:
//!   abort.underflow
//! ```

use std::fmt;

use super::{Module, Op, Terminator};

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::AllocateTape(cells) => write!(f, "alloc {cells}"),
            Op::LoadCell => write!(f, "load"),
            Op::StoreCell => write!(f, "store"),
            Op::CellArith(op, amount) => write!(f, "cell.{} {amount}", op.mnemonic()),
            Op::PointerArith(op, amount) => write!(f, "ptr.{} {amount}", op.mnemonic()),
            Op::Call(target) => write!(f, "call {}", target.symbol()),
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(target) => write!(f, "jmp {target}"),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "br {cond} {then_block}, {else_block}"),
            Terminator::Return(status) => write!(f, "ret {status}"),
            Terminator::AbortUnderflow => write!(f, "abort.underflow"),
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "module {:?}", self.name)?;
        for (id, block) in self.iter() {
            writeln!(f, "{id} {}:", block.name)?;
            for op in &block.ops {
                writeln!(f, "  {op}")?;
            }
            writeln!(f, "  {}", block.terminator)?;
        }
        Ok(())
    }
}
