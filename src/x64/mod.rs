// This module is the native x86-64 backend. NativeBackend implements the Backend trait: it lowers
// a verified Module to machine code with the iced-x86 code assembler (codegen and encoder) and
// packages the result as an ELF relocatable object with the object crate (object). The object
// defines a global `main` following the System V ABI, references libc for memory management,
// line input and output, and is turned into an executable by crate::link.

//! x86-64 native backend.
//!
//! - [`encoder`]: iced-x86 wrapper with labels and relocation sites
//! - [`codegen`]: lowering of a [`Module`] to `main` plus runtime helpers
//! - [`object`]: ELF relocatable output

pub mod codegen;
pub mod encoder;
pub mod object;

pub use codegen::{lower_module, ENTRY_SYMBOL};
pub use encoder::{EncodingError, MachineCode, X64Encoder};
pub use self::object::write_object;

use crate::core::compiler::Backend;
use crate::core::error::CompileResult;
use crate::ir::Module;

/// A finished relocatable object.
#[derive(Debug, Clone)]
pub struct NativeObject {
    /// ELF file contents.
    pub bytes: Vec<u8>,
    /// Size of the `.text` payload.
    pub code_size: usize,
}

/// Backend producing x86-64 ELF objects.
#[derive(Debug, Default)]
pub struct NativeBackend {
    source_name: Option<String>,
}

impl NativeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `name` as the object's source file.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }
}

impl Backend for NativeBackend {
    type Output = NativeObject;

    fn name(&self) -> &'static str {
        "x86-64"
    }

    fn compile(&mut self, module: &Module) -> CompileResult<NativeObject> {
        let code = lower_module(module)?;
        let source_name = self.source_name.as_deref().unwrap_or(module.name());
        let bytes = write_object(&code, source_name)?;
        log::info!(
            "generated {} bytes of code, {} byte object for {}",
            code.bytes.len(),
            bytes.len(),
            module.name()
        );
        Ok(NativeObject {
            bytes,
            code_size: code.bytes.len(),
        })
    }
}
