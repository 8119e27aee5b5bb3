// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession owns a reference to the arena that holds the filtered program for the
// whole compilation, so every later phase borrows one immutable instruction slice with the
// session lifetime instead of cloning it. The session also gathers SessionStats: source
// instruction counts per kind, emitted operations and blocks, how much the run-length merge
// saved, loop counts and nesting depth, guarded left moves, and the native code size when the
// x86-64 backend runs. Statistics live behind a RefCell so phases holding only a shared
// session reference can record them. SessionStats renders a readable summary via Display.

//! Arena-based compilation session management.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

use crate::bf::{filter_source_in, EmitSummary, Instruction, Program};
use crate::ir::Module;

/// Arena-based compilation session.
///
/// All per-compilation data with the program's lifetime is placed in the
/// arena and shares the session lifetime.
pub struct CompilationSession<'arena> {
    arena: &'arena Bump,
    stats: RefCell<SessionStats>,
}

impl<'arena> CompilationSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Run the source filter, placing the instructions in the arena.
    pub fn parse_program(&self, source: &str) -> Program<'arena> {
        let instructions = filter_source_in(self.arena, source);

        let mut stats = self.stats.borrow_mut();
        stats.source_instructions += instructions.len();
        for &inst in instructions.iter() {
            *stats.instruction_counts.entry(inst).or_insert(0) += 1;
        }
        log::debug!("filtered {} instructions from {} bytes", instructions.len(), source.len());

        Program::new(instructions)
    }

    /// Record the outcome of one emission pass.
    pub fn record_emission(&self, summary: &EmitSummary) {
        let mut stats = self.stats.borrow_mut();
        stats.merged_runs += summary.merged_runs;
        stats.merged_instructions += summary.merged_instructions;
        stats.loops += summary.loops;
        stats.guarded_moves += summary.guarded_moves;
        stats.max_loop_depth = stats.max_loop_depth.max(summary.max_depth);
    }

    /// Record the size of a finished intermediate program.
    pub fn record_module(&self, module: &Module) {
        let mut stats = self.stats.borrow_mut();
        stats.blocks += module.blocks().len();
        stats.ops += module.op_count();
    }

    /// Record native code produced by a backend.
    pub fn record_code_size(&self, bytes: usize) {
        self.stats.borrow_mut().code_size += bytes;
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Instructions left after filtering.
    pub source_instructions: usize,

    /// Count of each instruction kind in the source.
    pub instruction_counts: HashMap<Instruction, usize>,

    /// Runs of identical cell updates merged into one operation.
    pub merged_runs: usize,

    /// Cell updates removed by merging.
    pub merged_instructions: usize,

    pub loops: usize,

    pub max_loop_depth: usize,

    /// Left moves that received an underflow guard.
    pub guarded_moves: usize,

    /// Blocks in the intermediate program.
    pub blocks: usize,

    /// Straight-line operations in the intermediate program.
    pub ops: usize,

    /// Native code size (bytes).
    pub code_size: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Source instructions: {}", self.source_instructions)?;
        writeln!(
            f,
            "  Merged runs: {} ({} instructions saved)",
            self.merged_runs, self.merged_instructions
        )?;
        writeln!(f, "  Loops: {} (max depth {})", self.loops, self.max_loop_depth)?;
        writeln!(f, "  Guarded left moves: {}", self.guarded_moves)?;
        writeln!(f, "  Blocks: {}", self.blocks)?;
        writeln!(f, "  Operations: {}", self.ops)?;
        if self.code_size > 0 {
            writeln!(f, "  Native code size: {} bytes", self.code_size)?;
        }

        if !self.instruction_counts.is_empty() {
            writeln!(f, "  Instruction breakdown:")?;
            let mut sorted: Vec<_> = self.instruction_counts.iter().collect();
            sorted.sort_by_key(|(inst, count)| (std::cmp::Reverse(**count), inst.as_char()));

            for (inst, count) in sorted {
                writeln!(f, "    {inst}: {count}")?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let arena = Bump::new();
        let session = CompilationSession::new(&arena);

        let stats = session.stats();
        assert_eq!(stats.source_instructions, 0);
        assert_eq!(stats.loops, 0);
        assert!(stats.instruction_counts.is_empty());
    }

    #[test]
    fn test_program_lives_in_arena() {
        let arena = Bump::new();
        let session = CompilationSession::new(&arena);
        let before = arena.allocated_bytes();

        let program = session.parse_program("+ + [ - ] comment");
        assert_eq!(program.len(), 5);
        assert_eq!(program.to_string(), "++[-]");
        assert!(arena.allocated_bytes() >= before);
    }

    #[test]
    fn test_instruction_breakdown() {
        let arena = Bump::new();
        let session = CompilationSession::new(&arena);
        session.parse_program("+++>>.");

        let stats = session.stats();
        assert_eq!(stats.source_instructions, 6);
        assert_eq!(stats.instruction_counts[&Instruction::Increment], 3);
        assert_eq!(stats.instruction_counts[&Instruction::MoveRight], 2);
        assert_eq!(stats.instruction_counts[&Instruction::Output], 1);
    }

    #[test]
    fn test_statistics_display() {
        let arena = Bump::new();
        let session = CompilationSession::new(&arena);
        session.parse_program("++");
        session.record_emission(&EmitSummary {
            merged_runs: 1,
            merged_instructions: 1,
            loops: 2,
            guarded_moves: 0,
            max_depth: 2,
        });
        session.record_code_size(96);

        let output = session.stats().to_string();
        assert!(output.contains("Merged runs: 1 (1 instructions saved)"));
        assert!(output.contains("Loops: 2 (max depth 2)"));
        assert!(output.contains("Native code size: 96 bytes"));
        assert!(output.contains("+: 2"));
    }
}
