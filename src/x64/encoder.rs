// This module wraps the iced-x86 CodeAssembler for the native backend. X64Encoder owns the
// assembler, hands out labels for blocks and functions, and records relocation sites. Sites
// that reference something outside the text section (libc functions through the PLT, the stdin
// and stderr data objects through the GOT, and the input state kept in .bss) are emitted as raw
// instruction bytes with a zero displacement, because the assembler only resolves labels inside
// the code it assembles. Each such site remembers the index of its byte-declaration instruction;
// after assembly the instruction offsets reported by the block encoder turn that index into the
// byte offset of the 32-bit field the object writer relocates. finalize produces MachineCode:
// the bytes, the function extents and the resolved fixups.

//! x86-64 instruction encoding using iced-x86.

use iced_x86::code_asm::{CodeAssembler, CodeLabel};
use iced_x86::{BlockEncoderOptions, IcedError};
use thiserror::Error;

/// Error types for instruction encoding.
#[derive(Error, Debug)]
pub enum EncodingError {
    /// Assembly error from iced-x86.
    #[error("Assembly error: {0}")]
    Assembly(#[from] IcedError),

    /// A relocation site was dropped by the block encoder.
    #[error("relocation site {index} has no offset")]
    MissingOffset { index: usize },
}

/// Fields of the input state object kept in `.bss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateSlot {
    /// `char *` line buffer owned by getline.
    Line,
    /// `size_t` capacity of the line buffer.
    LineCapacity,
    /// Bytes held by the current line, 0 at end of input.
    LineLength,
    /// Read position within the current line.
    LineOffset,
}

impl StateSlot {
    pub const fn offset(self) -> u64 {
        match self {
            StateSlot::Line => 0,
            StateSlot::LineCapacity => 8,
            StateSlot::LineLength => 16,
            StateSlot::LineOffset => 24,
        }
    }
}

/// Size in bytes of the `.bss` input state object.
pub const STATE_SIZE: u64 = 32;

/// What a relocated 32-bit field refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixupTarget {
    /// `call rel32` to an external function.
    Call(&'static str),
    /// RIP-relative load of the GOT entry of an external data object.
    GotEntry(&'static str),
    /// RIP-relative access to a field of the input state.
    State(StateSlot),
}

/// A resolved relocation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fixup {
    /// Byte offset of the 32-bit field in the code.
    pub offset: u64,
    pub target: FixupTarget,
}

/// A function placed in the code buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionExtent {
    pub name: &'static str,
    pub offset: u64,
    pub size: u64,
    /// Exported from the object.
    pub global: bool,
}

/// Output of [`X64Encoder::finalize`].
#[derive(Debug, Clone, Default)]
pub struct MachineCode {
    pub bytes: Vec<u8>,
    pub functions: Vec<FunctionExtent>,
    pub fixups: Vec<Fixup>,
}

impl MachineCode {
    pub fn function(&self, name: &str) -> Option<&FunctionExtent> {
        self.functions.iter().find(|function| function.name == name)
    }
}

struct PendingFixup {
    instruction: usize,
    field: u64,
    target: FixupTarget,
}

struct PendingFunction {
    name: &'static str,
    start: CodeLabel,
    global: bool,
}

/// x86-64 instruction encoder using iced-x86.
pub struct X64Encoder {
    assembler: CodeAssembler,
    fixups: Vec<PendingFixup>,
    functions: Vec<PendingFunction>,
}

impl X64Encoder {
    pub fn new() -> Result<Self, EncodingError> {
        Ok(Self {
            assembler: CodeAssembler::new(64)?,
            fixups: Vec::new(),
            functions: Vec::new(),
        })
    }

    /// Direct access for ordinary instructions.
    pub fn asm(&mut self) -> &mut CodeAssembler {
        &mut self.assembler
    }

    pub fn create_label(&mut self) -> CodeLabel {
        self.assembler.create_label()
    }

    /// Bind `label` to the next emitted instruction.
    pub fn place_label(&mut self, label: &mut CodeLabel) -> Result<(), EncodingError> {
        self.assembler.set_label(label)?;
        Ok(())
    }

    /// Start a function at the next emitted instruction, binding `start`.
    ///
    /// A function runs until the next one starts or the code ends.
    pub fn begin_function(
        &mut self,
        name: &'static str,
        global: bool,
        start: &mut CodeLabel,
    ) -> Result<(), EncodingError> {
        self.assembler.set_label(start)?;
        self.functions.push(PendingFunction {
            name,
            start: *start,
            global,
        });
        Ok(())
    }

    /// Emit pre-encoded instruction bytes whose last four bytes are a
    /// displacement to relocate.
    fn emit_site(&mut self, bytes: &[u8], target: FixupTarget) -> Result<(), EncodingError> {
        let instruction = self.assembler.instructions().len();
        self.fixups.push(PendingFixup {
            instruction,
            field: (bytes.len() - 4) as u64,
            target,
        });
        self.assembler.db(bytes)?;
        Ok(())
    }

    /// `call symbol` through the PLT.
    pub fn call_external(&mut self, symbol: &'static str) -> Result<(), EncodingError> {
        self.emit_site(&[0xE8, 0, 0, 0, 0], FixupTarget::Call(symbol))
    }

    /// `mov reg, [rip + symbol@GOTPCREL]`, leaving the object's address in `reg`.
    pub fn load_got_address(&mut self, reg: Gpr, symbol: &'static str) -> Result<(), EncodingError> {
        self.emit_site(&rip_relative(0x8B, reg), FixupTarget::GotEntry(symbol))
    }

    /// `mov reg, [rip + state.slot]`
    pub fn load_state(&mut self, reg: Gpr, slot: StateSlot) -> Result<(), EncodingError> {
        self.emit_site(&rip_relative(0x8B, reg), FixupTarget::State(slot))
    }

    /// `mov [rip + state.slot], reg`
    pub fn store_state(&mut self, slot: StateSlot, reg: Gpr) -> Result<(), EncodingError> {
        self.emit_site(&rip_relative(0x89, reg), FixupTarget::State(slot))
    }

    /// `cmp reg, [rip + state.slot]`
    pub fn compare_state(&mut self, reg: Gpr, slot: StateSlot) -> Result<(), EncodingError> {
        self.emit_site(&rip_relative(0x3B, reg), FixupTarget::State(slot))
    }

    /// `lea reg, [rip + state.slot]`
    pub fn address_of_state(&mut self, reg: Gpr, slot: StateSlot) -> Result<(), EncodingError> {
        self.emit_site(&rip_relative(0x8D, reg), FixupTarget::State(slot))
    }

    /// Assemble everything emitted so far.
    pub fn finalize(mut self) -> Result<MachineCode, EncodingError> {
        let result = self
            .assembler
            .assemble_options(0, BlockEncoderOptions::RETURN_NEW_INSTRUCTION_OFFSETS)?;

        let mut starts = Vec::with_capacity(self.functions.len());
        for function in &self.functions {
            starts.push(result.label_ip(&function.start)?);
        }
        let code_len = result.inner.code_buffer.len() as u64;
        let functions = self
            .functions
            .iter()
            .enumerate()
            .map(|(index, function)| {
                let offset = starts[index];
                let end = starts.get(index + 1).copied().unwrap_or(code_len);
                FunctionExtent {
                    name: function.name,
                    offset,
                    size: end - offset,
                    global: function.global,
                }
            })
            .collect();

        let offsets = &result.inner.new_instruction_offsets;
        let mut fixups = Vec::with_capacity(self.fixups.len());
        for pending in &self.fixups {
            let start = offsets
                .get(pending.instruction)
                .copied()
                .filter(|&offset| offset != u32::MAX)
                .ok_or(EncodingError::MissingOffset { index: pending.instruction })?;
            fixups.push(Fixup {
                offset: u64::from(start) + pending.field,
                target: pending.target,
            });
        }

        log::trace!("assembled {code_len} bytes with {} fixups", fixups.len());
        Ok(MachineCode {
            bytes: result.inner.code_buffer,
            functions,
            fixups,
        })
    }
}

/// The legacy registers usable in raw RIP-relative sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gpr {
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
}

impl Gpr {
    const fn encoding(self) -> u8 {
        match self {
            Gpr::Rax => 0,
            Gpr::Rcx => 1,
            Gpr::Rdx => 2,
            Gpr::Rsi => 6,
            Gpr::Rdi => 7,
        }
    }
}

/// REX.W opcode ModRM(00, reg, 101) disp32
fn rip_relative(opcode: u8, reg: Gpr) -> [u8; 7] {
    let modrm = (reg.encoding() << 3) | 0b101;
    [0x48, opcode, modrm, 0, 0, 0, 0]
}
