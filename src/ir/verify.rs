use super::{Module, Terminator};
use crate::core::error::IrError;

impl Module {
    /// Check branch targets and the single underflow path.
    ///
    /// Termination of every block is guaranteed by construction of
    /// [`Block`](super::Block); this checks what the type cannot.
    pub fn verify(&self) -> Result<(), IrError> {
        if self.blocks.is_empty() {
            return Err(IrError::Empty);
        }

        for (id, block) in self.iter() {
            for target in block.terminator.successors() {
                if self.block(target).is_none() {
                    return Err(IrError::UnknownTarget { block: id, target });
                }
            }
        }

        let count = self
            .blocks
            .iter()
            .filter(|block| block.terminator == Terminator::AbortUnderflow)
            .count();
        if count != 1 {
            return Err(IrError::ErrorPathCount { count });
        }
        Ok(())
    }
}
