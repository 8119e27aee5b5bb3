// This module serves as the central hub for tapec's core infrastructure, the pieces shared by
// the front end and every backend. It exports the session (arena ownership of the filtered
// program and compilation statistics), the error taxonomy, the IrBuilder construction trait
// that keeps the emission engine independent of any concrete program representation, and the
// compiler driver with its Backend trait.

//! Core tapec infrastructure.
//!
//! - [`session`]: arena-backed [`CompilationSession`] and [`SessionStats`]
//! - [`error`]: [`ParseError`], [`IrError`], [`CompileError`]
//! - [`builder`]: the [`IrBuilder`] trait
//! - [`compiler`]: [`Compiler`] driver and the [`Backend`] trait

pub mod builder;
pub mod compiler;
pub mod error;
pub mod session;

pub use builder::{ArithOp, Condition, IrBuilder, RuntimeCall};
pub use compiler::{emit_program, Backend, Compiler};
pub use error::{CompileError, CompileResult, IrError, ParseError};
pub use session::{CompilationSession, SessionStats};
