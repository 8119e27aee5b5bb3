//! [`IrBuilder`] implementation producing a [`Module`].

use super::{Block, BlockId, Module, Op, Terminator};
use crate::core::builder::{ArithOp, Condition, IrBuilder, RuntimeCall};
use crate::core::error::IrError;

#[derive(Debug)]
struct BlockData {
    name: &'static str,
    ops: Vec<Op>,
    terminator: Option<Terminator>,
    appended_after_terminator: bool,
}

/// Builds a [`Module`] block by block.
///
/// Misuse (appending to a terminated block, appending before any block
/// exists) is recorded and reported by [`ModuleBuilder::finish`].
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    blocks: Vec<BlockData>,
    current: BlockId,
    detached: bool,
}

impl ModuleBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            blocks: Vec::new(),
            current: BlockId(0),
            detached: false,
        }
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn current_data(&mut self) -> Option<&mut BlockData> {
        let data = self.blocks.get_mut(self.current.index());
        if data.is_none() {
            self.detached = true;
        }
        data
    }

    fn push(&mut self, op: Op) {
        if let Some(data) = self.current_data() {
            if data.terminator.is_some() {
                data.appended_after_terminator = true;
            }
            data.ops.push(op);
        }
    }

    fn terminate(&mut self, terminator: Terminator) {
        if let Some(data) = self.current_data() {
            if data.terminator.is_some() {
                data.appended_after_terminator = true;
            } else {
                data.terminator = Some(terminator);
            }
        }
    }

    /// Finish construction and verify the result.
    pub fn finish(self) -> Result<Module, IrError> {
        if self.blocks.is_empty() || self.detached {
            return Err(IrError::Empty);
        }

        let mut blocks = Vec::with_capacity(self.blocks.len());
        for (idx, data) in self.blocks.into_iter().enumerate() {
            let id = BlockId(idx as u32);
            if data.appended_after_terminator {
                return Err(IrError::OperationAfterTerminator { block: id });
            }
            let terminator = data.terminator.ok_or(IrError::UnterminatedBlock { block: id })?;
            blocks.push(Block {
                name: data.name,
                ops: data.ops,
                terminator,
            });
        }

        let module = Module::from_blocks(self.name, blocks);
        module.verify()?;
        Ok(module)
    }
}

impl IrBuilder for ModuleBuilder {
    type Block = BlockId;

    fn create_block(&mut self, name: &'static str) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            name,
            ops: Vec::new(),
            terminator: None,
            appended_after_terminator: false,
        });
        id
    }

    fn position_at_end(&mut self, block: BlockId) {
        self.current = block;
    }

    fn current_block(&self) -> BlockId {
        self.current
    }

    fn allocate_tape(&mut self, cells: u64) {
        self.push(Op::AllocateTape(cells));
    }

    fn load_cell(&mut self) {
        self.push(Op::LoadCell);
    }

    fn store_cell(&mut self) {
        self.push(Op::StoreCell);
    }

    fn cell_arith(&mut self, op: ArithOp, amount: u8) {
        self.push(Op::CellArith(op, amount));
    }

    fn pointer_arith(&mut self, op: ArithOp, amount: u64) {
        self.push(Op::PointerArith(op, amount));
    }

    fn call(&mut self, target: RuntimeCall) {
        self.push(Op::Call(target));
    }

    fn branch(&mut self, target: BlockId) {
        self.terminate(Terminator::Jump(target));
    }

    fn cond_branch(&mut self, cond: Condition, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
    }

    fn ret(&mut self, status: i32) {
        self.terminate(Terminator::Return(status));
    }

    fn abort_underflow(&mut self) {
        self.terminate(Terminator::AbortUnderflow);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_terminated_blocks() {
        let mut builder = ModuleBuilder::new("test");
        let entry = builder.create_block("entry");
        let error = builder.create_block("error");
        builder.position_at_end(entry);
        builder.allocate_tape(4);
        builder.ret(0);
        builder.position_at_end(error);
        builder.abort_underflow();

        let module = builder.finish().unwrap();
        assert_eq!(module.blocks().len(), 2);
        assert_eq!(module.blocks()[0].ops, vec![Op::AllocateTape(4)]);
        assert_eq!(module.error_block(), Some(error));
    }

    #[test]
    fn reports_unterminated_block() {
        let mut builder = ModuleBuilder::new("test");
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);
        builder.load_cell();
        assert_eq!(
            builder.finish(),
            Err(IrError::UnterminatedBlock { block: entry })
        );
    }

    #[test]
    fn reports_operation_after_terminator() {
        let mut builder = ModuleBuilder::new("test");
        let entry = builder.create_block("entry");
        builder.position_at_end(entry);
        builder.ret(0);
        builder.store_cell();
        assert_eq!(
            builder.finish(),
            Err(IrError::OperationAfterTerminator { block: entry })
        );
    }

    #[test]
    fn reports_missing_insertion_point() {
        let mut builder = ModuleBuilder::new("test");
        builder.load_cell();
        builder.create_block("entry");
        assert_eq!(builder.finish(), Err(IrError::Empty));
    }
}
