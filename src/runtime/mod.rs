//! Runtime model of compiled programs.
//!
//! These types are the executable reference for the behavior every backend
//! must reproduce: the interpreter uses them directly and the native backend
//! emits machine code with the same state transitions.

pub mod input;
pub mod tape;

pub use input::InputCursor;
pub use tape::{Tape, TapeUnderflow};

/// Cells allocated at program start.
pub const INITIAL_TAPE_CAPACITY: usize = 4;

/// Diagnostic written to the error stream when the pointer would go below 0.
pub const UNDERFLOW_MESSAGE: &str = "Error: Cannot move pointer to negative cell!\n";

/// Exit status after the underflow diagnostic.
pub const UNDERFLOW_EXIT_STATUS: i32 = 1;
