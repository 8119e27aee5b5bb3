//! tapec - ahead-of-time compiler for the eight-instruction tape language.
//!
//! Source text is filtered down to the eight instruction characters, lowered
//! by a single-pass emission engine into a small block-structured
//! intermediate program, and handed to a backend: the interpreter in [`vm`]
//! or the x86-64 code generator in [`x64`], whose ELF object [`link`] turns
//! into an executable.
//!
//! # Primary Usage
//!
//! ```
//! use bumpalo::Bump;
//! use tapec::core::{CompilationSession, Compiler};
//! use tapec::vm::Machine;
//!
//! let arena = Bump::new();
//! let session = CompilationSession::new(&arena);
//! let compiler = Compiler::new(&session);
//!
//! let module = compiler.lower("hello", session.parse_program("++++++[>++++++++<-]>+.")).unwrap();
//! let mut vm = Machine::new(&b""[..], Vec::new(), Vec::new());
//! assert_eq!(compiler.compile_with(&module, &mut vm).unwrap(), 0);
//! assert_eq!(vm.output(), b"1");
//! ```
//!
//! # Architecture
//!
//! - [`bf`] - Instruction set, source filter and emission engine
//! - [`core`] - Session, errors, the `IrBuilder` trait and the compiler driver
//! - [`ir`] - Intermediate program, its builder, verifier and listing
//! - [`runtime`] - Tape and input models shared by the backends
//! - [`vm`] - Interpreter backend
//! - [`x64`] - x86-64 code generation and ELF output
//! - [`link`] - External link step
//! - [`driver`] - Command line compilation flow

pub mod bf;
pub mod core;
pub mod driver;
pub mod ir;
pub mod link;
pub mod runtime;
pub mod vm;
pub mod x64;

use std::io::{BufRead, Write};

use bumpalo::Bump;

pub use crate::core::{
    Backend, CompilationSession, CompileError, CompileResult, Compiler, IrBuilder, ParseError,
    SessionStats,
};
pub use crate::ir::Module;
pub use crate::link::Linker;
pub use crate::vm::Machine;
pub use crate::x64::{NativeBackend, NativeObject};

/// Lower `source` to a verified intermediate program.
pub fn lower_source(name: &str, source: &str) -> CompileResult<Module> {
    let arena = Bump::new();
    let session = CompilationSession::new(&arena);
    Compiler::new(&session).lower(name, session.parse_program(source))
}

/// Compile `source` and interpret it with the given streams.
///
/// Returns the program's exit status.
pub fn run_source<R: BufRead, W: Write, E: Write>(
    source: &str,
    input: R,
    output: W,
    errors: E,
) -> CompileResult<i32> {
    let module = lower_source("main", source)?;
    let mut machine = Machine::new(input, output, errors);
    Ok(machine.run(&module)?)
}

/// Compile `source` to an x86-64 ELF relocatable object.
pub fn compile_to_object(name: &str, source: &str) -> CompileResult<NativeObject> {
    let module = lower_source(name, source)?;
    NativeBackend::new().with_source_name(name).compile(&module)
}
