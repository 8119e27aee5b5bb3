// This module defines the compiler driver and the Backend trait. The driver wraps the emission
// engine with the program prologue and epilogue: it creates the entry block and the single
// process-wide underflow block, allocates the initial tape, runs one emission pass, returns 0
// from wherever emission stopped, and terminates the underflow block with the diagnostic abort.
// emit_program works against any IrBuilder; Compiler::lower pairs it with ModuleBuilder to
// produce a verified Module and records statistics in the session. The Backend trait is the
// narrow boundary to whatever consumes a Module: the interpreter, or the native code generator
// that turns it into an object file.

//! Compiler driver.
//!
//! Typical flow:
//! ```text
//! session.parse_program(source)      // source filter
//! compiler.lower(name, program)      // emission engine -> Module
//! compiler.compile_with(&module, &mut backend)
//! ```

use super::builder::IrBuilder;
use super::error::{CompileResult, ParseError};
use super::session::CompilationSession;
use crate::bf::{emit, EmissionState, EmitSummary, Program};
use crate::ir::{Module, ModuleBuilder};
use crate::runtime::INITIAL_TAPE_CAPACITY;

/// Consumer of a finished intermediate program.
pub trait Backend {
    type Output;

    fn name(&self) -> &'static str;

    fn compile(&mut self, module: &Module) -> CompileResult<Self::Output>;
}

/// Emit `program` with prologue, epilogue and the shared underflow block.
///
/// Block 0 is the entry and block 1 the underflow path.
pub fn emit_program<B: IrBuilder>(
    program: Program<'_>,
    builder: &mut B,
) -> Result<EmitSummary, ParseError> {
    let entry = builder.create_block("entry");
    let error = builder.create_block("error");

    builder.position_at_end(entry);
    builder.allocate_tape(INITIAL_TAPE_CAPACITY as u64);

    let mut state = EmissionState::new(program, error);
    emit(&mut state, builder)?;
    builder.ret(0);

    builder.position_at_end(error);
    builder.abort_underflow();

    Ok(state.summary())
}

/// Architecture independent compiler driver.
pub struct Compiler<'s, 'arena> {
    session: &'s CompilationSession<'arena>,
}

impl<'s, 'arena> Compiler<'s, 'arena> {
    pub fn new(session: &'s CompilationSession<'arena>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &'s CompilationSession<'arena> {
        self.session
    }

    /// Build and verify the intermediate program for `program`.
    ///
    /// Structural errors abort before any module is produced.
    pub fn lower(&self, name: &str, program: Program<'_>) -> CompileResult<Module> {
        log::debug!("lowering {name}: {} instructions", program.len());

        let mut builder = ModuleBuilder::new(name);
        let summary = emit_program(program, &mut builder)?;
        let module = builder.finish()?;

        self.session.record_emission(&summary);
        self.session.record_module(&module);
        log::debug!(
            "lowered {name}: {} blocks, {} ops, {} loops",
            module.blocks().len(),
            module.op_count(),
            summary.loops
        );
        Ok(module)
    }

    /// Hand a finished module to `backend`.
    pub fn compile_with<B: Backend>(&self, module: &Module, backend: &mut B) -> CompileResult<B::Output> {
        log::debug!("running {} backend on {}", backend.name(), module.name());
        backend.compile(module)
    }
}
