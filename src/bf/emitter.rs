// This module implements the loop and emission engine that translates a filtered instruction
// sequence into structured control flow through an IrBuilder. It makes a single left-to-right
// pass over the program. Each loop opens a LoopFrame holding its entry test, body and merge
// blocks; frames live on an explicit stack inside EmissionState so deeply nested input cannot
// exhaust the native call stack, while the frame discipline is exactly that of one recursive
// activation per nesting level. Runs of identical increment or decrement instructions are
// merged into a single wrapping add or subtract. Left moves branch to the process-wide
// underflow block before touching the pointer. Unbalanced loops surface as ParseError.

//! Loop matching and emission.

use log::{debug, trace};

use super::{Instruction, Program};
use crate::core::builder::{ArithOp, Condition, IrBuilder, RuntimeCall};
use crate::core::error::ParseError;

/// Control points of one open loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopFrame<B> {
    /// Program index of the loop's `[`.
    pub start: usize,
    /// Entry test, also the back-edge target.
    pub entry: B,
    pub body: B,
    /// Merge point; emission continues here after the loop closes.
    pub exit: B,
}

/// Counters gathered during one emission pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitSummary {
    /// Runs of two or more identical cell updates that were merged.
    pub merged_runs: usize,
    /// Cell updates removed by merging.
    pub merged_instructions: usize,
    pub loops: usize,
    pub guarded_moves: usize,
    pub max_depth: usize,
}

/// Mutable emission state threaded through [`emit`].
///
/// The cursor only moves forward. The frame stack holds one entry per loop
/// currently open at the cursor.
#[derive(Debug)]
pub struct EmissionState<'p, B> {
    program: Program<'p>,
    cursor: usize,
    frames: Vec<LoopFrame<B>>,
    error_block: B,
    summary: EmitSummary,
}

impl<'p, B: Copy> EmissionState<'p, B> {
    /// Start at instruction 0 with no open loop.
    ///
    /// `error_block` is the single underflow path shared by every left move.
    pub fn new(program: Program<'p>, error_block: B) -> Self {
        Self {
            program,
            cursor: 0,
            frames: Vec::new(),
            error_block,
            summary: EmitSummary::default(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn summary(&self) -> EmitSummary {
        self.summary
    }

    /// Length of the run of `inst` starting at the cursor.
    fn run_length(&self, inst: Instruction) -> usize {
        self.program.instructions()[self.cursor..]
            .iter()
            .take_while(|&&next| next == inst)
            .count()
    }
}

/// Emit the program from the state's cursor to the end.
///
/// On success every loop has been closed and the builder is positioned at
/// the block following the last instruction; the caller adds the epilogue.
pub fn emit<B: IrBuilder>(
    state: &mut EmissionState<'_, B::Block>,
    builder: &mut B,
) -> Result<(), ParseError> {
    while let Some(inst) = state.program.get(state.cursor) {
        trace!("emit {} at {}", inst, state.cursor);
        match inst {
            Instruction::MoveRight => {
                builder.pointer_arith(ArithOp::Add, 1);
                builder.call(RuntimeCall::GrowTape);
            }
            Instruction::MoveLeft => {
                let move_left = builder.create_block("move_left");
                builder.cond_branch(Condition::PointerZero, state.error_block, move_left);
                builder.position_at_end(move_left);
                builder.pointer_arith(ArithOp::Sub, 1);
                state.summary.guarded_moves += 1;
            }
            Instruction::Increment | Instruction::Decrement => {
                let run = state.run_length(inst);
                let op = if inst == Instruction::Increment {
                    ArithOp::Add
                } else {
                    ArithOp::Sub
                };
                builder.load_cell();
                builder.cell_arith(op, (run % 256) as u8);
                builder.store_cell();
                if run > 1 {
                    state.summary.merged_runs += 1;
                    state.summary.merged_instructions += run - 1;
                }
                // Leave the cursor on the last instruction of the run.
                state.cursor += run - 1;
            }
            Instruction::Output => {
                builder.load_cell();
                builder.call(RuntimeCall::WriteByte);
            }
            Instruction::Input => {
                builder.call(RuntimeCall::ReadByte);
                builder.store_cell();
            }
            Instruction::LoopStart => open_loop(state, builder),
            Instruction::LoopEnd => close_loop(state, builder)?,
        }
        state.cursor += 1;
    }

    if let Some(frame) = state.frames.last() {
        debug!("loop opened at {} is never closed", frame.start);
        return Err(ParseError::NoLoopEnd);
    }
    Ok(())
}

fn open_loop<B: IrBuilder>(state: &mut EmissionState<'_, B::Block>, builder: &mut B) {
    let entry = builder.create_block("loop");
    let body = builder.create_block("then");
    let exit = builder.create_block("merge");

    builder.branch(entry);
    builder.position_at_end(entry);
    builder.load_cell();
    builder.cond_branch(Condition::CellNonZero, body, exit);
    builder.position_at_end(body);

    state.frames.push(LoopFrame {
        start: state.cursor,
        entry,
        body,
        exit,
    });
    state.summary.loops += 1;
    state.summary.max_depth = state.summary.max_depth.max(state.frames.len());
}

fn close_loop<B: IrBuilder>(
    state: &mut EmissionState<'_, B::Block>,
    builder: &mut B,
) -> Result<(), ParseError> {
    let Some(frame) = state.frames.pop() else {
        debug!("loop end at {} has no open loop", state.cursor);
        return Err(ParseError::NoLoopStart);
    };
    builder.branch(frame.entry);
    builder.position_at_end(frame.exit);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bf::filter_source;

    /// Builder that records calls as strings.
    #[derive(Default)]
    struct Recorder {
        blocks: usize,
        current: usize,
        log: Vec<String>,
    }

    impl IrBuilder for Recorder {
        type Block = usize;

        fn create_block(&mut self, _name: &'static str) -> usize {
            self.blocks += 1;
            self.blocks - 1
        }
        fn position_at_end(&mut self, block: usize) {
            self.current = block;
            self.log.push(format!("at {block}"));
        }
        fn current_block(&self) -> usize {
            self.current
        }
        fn allocate_tape(&mut self, cells: u64) {
            self.log.push(format!("alloc {cells}"));
        }
        fn load_cell(&mut self) {
            self.log.push("load".into());
        }
        fn store_cell(&mut self) {
            self.log.push("store".into());
        }
        fn cell_arith(&mut self, op: ArithOp, amount: u8) {
            self.log.push(format!("cell {} {amount}", op.mnemonic()));
        }
        fn pointer_arith(&mut self, op: ArithOp, amount: u64) {
            self.log.push(format!("ptr {} {amount}", op.mnemonic()));
        }
        fn call(&mut self, target: RuntimeCall) {
            self.log.push(format!("call {}", target.symbol()));
        }
        fn branch(&mut self, target: usize) {
            self.log.push(format!("br {target}"));
        }
        fn cond_branch(&mut self, cond: Condition, then_block: usize, else_block: usize) {
            self.log.push(format!("br {cond} {then_block} {else_block}"));
        }
        fn ret(&mut self, status: i32) {
            self.log.push(format!("ret {status}"));
        }
        fn abort_underflow(&mut self) {
            self.log.push("abort".into());
        }
    }

    fn run(source: &str) -> (Result<(), ParseError>, Recorder, EmitSummary) {
        let instructions = filter_source(source);
        let mut recorder = Recorder::default();
        let error = recorder.create_block("error");
        let mut state = EmissionState::new(Program::new(&instructions), error);
        let result = emit(&mut state, &mut recorder);
        (result, recorder, state.summary())
    }

    #[test]
    fn merges_increment_run() {
        let (result, recorder, summary) = run("++++");
        assert!(result.is_ok());
        assert_eq!(recorder.log, vec!["load", "cell add 4", "store"]);
        assert_eq!(summary.merged_runs, 1);
        assert_eq!(summary.merged_instructions, 3);
    }

    #[test]
    fn merge_stops_at_different_kind() {
        let (_, recorder, _) = run("++-+");
        assert_eq!(
            recorder.log,
            vec![
                "load", "cell add 2", "store",
                "load", "cell sub 1", "store",
                "load", "cell add 1", "store",
            ]
        );
    }

    #[test]
    fn run_length_wraps_at_256() {
        let source = "-".repeat(257);
        let (_, recorder, _) = run(&source);
        assert_eq!(recorder.log, vec!["load", "cell sub 1", "store"]);
    }

    #[test]
    fn left_move_shares_error_block() {
        let (result, recorder, summary) = run("<<");
        assert!(result.is_ok());
        assert_eq!(
            recorder.log,
            vec![
                "br ptr.z 0 1", "at 1", "ptr sub 1",
                "br ptr.z 0 2", "at 2", "ptr sub 1",
            ]
        );
        assert_eq!(summary.guarded_moves, 2);
    }

    #[test]
    fn loop_has_entry_test_back_edge_and_merge() {
        let (result, recorder, summary) = run("[-]");
        assert!(result.is_ok());
        assert_eq!(
            recorder.log,
            vec![
                "br 1", "at 1", "load", "br cell.nz 2 3", "at 2",
                "load", "cell sub 1", "store",
                "br 1", "at 3",
            ]
        );
        assert_eq!(summary.loops, 1);
    }

    #[test]
    fn nested_loops_close_innermost_first() {
        let (result, recorder, summary) = run("[[]]");
        assert!(result.is_ok());
        // Inner loop blocks are 4..=6, outer loop blocks are 1..=3.
        let back_edges: Vec<_> = recorder
            .log
            .iter()
            .filter(|entry| *entry == "br 4" || *entry == "br 1")
            .cloned()
            .collect();
        assert_eq!(back_edges, vec!["br 1", "br 4", "br 4", "br 1"]);
        assert!(recorder.log.ends_with(&["br 4".into(), "at 6".into(), "br 1".into(), "at 3".into()]));
        assert_eq!(summary.max_depth, 2);
    }

    #[test]
    fn unmatched_loop_start_fails() {
        assert_eq!(run("[").0, Err(ParseError::NoLoopEnd));
        assert_eq!(run("+[[]").0, Err(ParseError::NoLoopEnd));
    }

    #[test]
    fn unmatched_loop_end_fails() {
        assert_eq!(run("]").0, Err(ParseError::NoLoopStart));
        assert_eq!(run("[]]").0, Err(ParseError::NoLoopStart));
        assert_eq!(run("][").0, Err(ParseError::NoLoopStart));
    }

    #[test]
    fn cursor_reaches_end() {
        let instructions = filter_source("+>-<[.,]");
        let mut recorder = Recorder::default();
        let mut state = EmissionState::new(Program::new(&instructions), 0);
        emit(&mut state, &mut recorder).unwrap();
        assert_eq!(state.cursor(), instructions.len());
        assert_eq!(state.depth(), 0);
    }
}
