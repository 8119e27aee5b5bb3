//! Source language front end.
//!
//! The language has eight single-character instructions acting on a tape of
//! byte cells. [`filter`] turns raw text into a [`Program`], and [`emitter`]
//! walks that program once to build the intermediate program through an
//! [`IrBuilder`](crate::core::IrBuilder).

pub mod emitter;
pub mod filter;

pub use emitter::{emit, EmissionState, EmitSummary, LoopFrame};
pub use filter::{filter_source, filter_source_in};

use std::fmt;

/// One source instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instruction {
    MoveRight,
    MoveLeft,
    Increment,
    Decrement,
    Output,
    Input,
    LoopStart,
    LoopEnd,
}

impl Instruction {
    /// Map a source character to its instruction, `None` for comment text.
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '>' => Some(Self::MoveRight),
            '<' => Some(Self::MoveLeft),
            '+' => Some(Self::Increment),
            '-' => Some(Self::Decrement),
            '.' => Some(Self::Output),
            ',' => Some(Self::Input),
            '[' => Some(Self::LoopStart),
            ']' => Some(Self::LoopEnd),
            _ => None,
        }
    }

    /// Source character of this instruction.
    pub const fn as_char(self) -> char {
        match self {
            Self::MoveRight => '>',
            Self::MoveLeft => '<',
            Self::Increment => '+',
            Self::Decrement => '-',
            Self::Output => '.',
            Self::Input => ',',
            Self::LoopStart => '[',
            Self::LoopEnd => ']',
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An ordered, read-only instruction sequence.
///
/// The slice usually lives in a [`CompilationSession`](crate::core::CompilationSession)
/// arena, but any borrowed slice works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Program<'a> {
    instructions: &'a [Instruction],
}

impl<'a> Program<'a> {
    pub fn new(instructions: &'a [Instruction]) -> Self {
        Self { instructions }
    }

    pub fn instructions(&self) -> &'a [Instruction] {
        self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Instruction> {
        self.instructions.get(index).copied()
    }
}

impl fmt::Display for Program<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in self.instructions {
            write!(f, "{inst}")?;
        }
        Ok(())
    }
}
