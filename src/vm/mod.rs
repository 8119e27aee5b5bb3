// This module implements the interpreter backend. Machine executes a verified Module block by
// block against the runtime state machines in crate::runtime: the growable Tape and the line
// buffered InputCursor, plus the 8-bit accumulator of the intermediate program's machine model.
// Standard input, standard output and the error stream are injected as generic reader/writer
// parameters so tests can drive programs with in-memory buffers. The underflow terminator writes
// the fixed diagnostic to the error writer and yields exit status 1. An optional step limit
// turns runaway loops into an error instead of a hang.

//! Interpreter backend.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::core::builder::{ArithOp, Condition, RuntimeCall};
use crate::core::compiler::Backend;
use crate::core::error::CompileResult;
use crate::ir::{BlockId, Module, Op, Terminator};
use crate::runtime::{InputCursor, Tape, UNDERFLOW_EXIT_STATUS, UNDERFLOW_MESSAGE};

#[derive(Error, Debug)]
pub enum VmError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("step limit of {limit} blocks exceeded")]
    StepLimitExceeded { limit: u64 },

    #[error("tape accessed before allocation")]
    TapeNotAllocated,

    #[error("pointer {pointer} outside tape of {capacity} cells")]
    PointerOutOfBounds { pointer: usize, capacity: usize },

    #[error("jump to unknown {0}")]
    UnknownBlock(BlockId),
}

/// Executes intermediate programs.
pub struct Machine<R, W, E> {
    input: InputCursor<R>,
    output: W,
    errors: E,
    tape: Option<Tape>,
    acc: u8,
    steps: u64,
    step_limit: Option<u64>,
}

impl<R: BufRead, W: Write, E: Write> Machine<R, W, E> {
    pub fn new(input: R, output: W, errors: E) -> Self {
        Self {
            input: InputCursor::new(input),
            output,
            errors,
            tape: None,
            acc: 0,
            steps: 0,
            step_limit: None,
        }
    }

    /// Fail once more than `limit` blocks have been entered.
    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }

    /// Tape left behind by the last run.
    pub fn tape(&self) -> Option<&Tape> {
        self.tape.as_ref()
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn errors(&self) -> &E {
        &self.errors
    }

    /// Blocks entered during the last run.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn into_parts(self) -> (W, E) {
        (self.output, self.errors)
    }

    /// Run `module` to completion and return its exit status.
    pub fn run(&mut self, module: &Module) -> Result<i32, VmError> {
        self.tape = None;
        self.acc = 0;
        self.steps = 0;

        let mut current = module.entry();
        let status = loop {
            self.steps += 1;
            if let Some(limit) = self.step_limit {
                if self.steps > limit {
                    self.output.flush()?;
                    return Err(VmError::StepLimitExceeded { limit });
                }
            }

            let block = module.block(current).ok_or(VmError::UnknownBlock(current))?;
            for op in &block.ops {
                self.execute(*op)?;
            }

            current = match block.terminator {
                Terminator::Jump(target) => target,
                Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                } => {
                    if self.test(cond)? {
                        then_block
                    } else {
                        else_block
                    }
                }
                Terminator::Return(status) => break status,
                Terminator::AbortUnderflow => {
                    self.errors.write_all(UNDERFLOW_MESSAGE.as_bytes())?;
                    self.errors.flush()?;
                    break UNDERFLOW_EXIT_STATUS;
                }
            };
        };

        self.output.flush()?;
        log::debug!("vm finished {} with status {status} after {} blocks", module.name(), self.steps);
        Ok(status)
    }

    fn tape_mut(&mut self) -> Result<&mut Tape, VmError> {
        self.tape.as_mut().ok_or(VmError::TapeNotAllocated)
    }

    /// Tape whose pointer addresses an allocated cell.
    fn cell_tape(&mut self) -> Result<&mut Tape, VmError> {
        let tape = self.tape_mut()?;
        if !tape.in_bounds() {
            return Err(VmError::PointerOutOfBounds {
                pointer: tape.pointer(),
                capacity: tape.capacity(),
            });
        }
        Ok(tape)
    }

    fn execute(&mut self, op: Op) -> Result<(), VmError> {
        match op {
            Op::AllocateTape(cells) => self.tape = Some(Tape::with_capacity(cells as usize)),
            Op::LoadCell => self.acc = self.cell_tape()?.get(),
            Op::StoreCell => {
                let acc = self.acc;
                self.cell_tape()?.set(acc);
            }
            Op::CellArith(ArithOp::Add, amount) => self.acc = self.acc.wrapping_add(amount),
            Op::CellArith(ArithOp::Sub, amount) => self.acc = self.acc.wrapping_sub(amount),
            Op::PointerArith(op, amount) => self.move_pointer(op, amount)?,
            Op::Call(RuntimeCall::GrowTape) => self.tape_mut()?.grow(),
            Op::Call(RuntimeCall::ReadByte) => self.acc = self.input.read_byte()?,
            Op::Call(RuntimeCall::WriteByte) => self.output.write_all(&[self.acc])?,
        }
        Ok(())
    }

    fn move_pointer(&mut self, op: ArithOp, amount: u64) -> Result<(), VmError> {
        let tape = self.tape_mut()?;
        match op {
            ArithOp::Add => tape.step_right(amount as usize),
            // Left moves are guarded by a preceding PointerZero branch.
            ArithOp::Sub => {
                for _ in 0..amount {
                    if tape.move_left_guarded().is_err() {
                        log::warn!("unguarded left move at cell 0 ignored");
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    fn test(&mut self, cond: Condition) -> Result<bool, VmError> {
        Ok(match cond {
            Condition::CellNonZero => self.acc != 0,
            Condition::PointerZero => self.tape_mut()?.pointer() == 0,
        })
    }
}

impl<R: BufRead, W: Write, E: Write> Backend for Machine<R, W, E> {
    type Output = i32;

    fn name(&self) -> &'static str {
        "vm"
    }

    fn compile(&mut self, module: &Module) -> CompileResult<i32> {
        Ok(self.run(module)?)
    }
}
