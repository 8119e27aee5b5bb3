// This module lowers a verified Module to x86-64 machine code. The generated `main` pins the
// machine model to callee-saved registers for its whole lifetime: rbx holds the tape base, r12
// the pointer index, r13 the tape capacity, and al is the accumulator. r14 is scratch that
// survives calls. Each block gets a label; terminators become jumps and conditional jumps, with
// the jump to the next block in layout order elided when the block already emitted code. Every
// return funnels into one exit sequence that frees the tape and the input line buffer before
// restoring registers. Two local helpers follow main: tapec_grow doubles the tape with realloc
// and zero-fills the new half when the pointer has reached the capacity, and tapec_input
// implements the line-buffered input model against the state object in .bss. The underflow
// diagnostic is placed as bytes after the helpers and addressed with a RIP-relative lea.

//! Module to machine code lowering.

use iced_x86::code_asm::*;

use super::encoder::{EncodingError, Gpr, MachineCode, StateSlot, X64Encoder};
use crate::core::builder::{ArithOp, Condition, RuntimeCall};
use crate::ir::{Module, Op, Terminator};
use crate::runtime::{UNDERFLOW_EXIT_STATUS, UNDERFLOW_MESSAGE};

/// Name of the exported entry point.
pub const ENTRY_SYMBOL: &str = "main";

struct Labels {
    blocks: Vec<CodeLabel>,
    exit: CodeLabel,
    grow: CodeLabel,
    input: CodeLabel,
    message: CodeLabel,
}

/// Lower `module` to machine code containing `main` and the runtime helpers.
pub fn lower_module(module: &Module) -> Result<MachineCode, EncodingError> {
    let mut encoder = X64Encoder::new()?;
    let mut labels = Labels {
        blocks: module.blocks().iter().map(|_| encoder.create_label()).collect(),
        exit: encoder.create_label(),
        grow: encoder.create_label(),
        input: encoder.create_label(),
        message: encoder.create_label(),
    };

    let mut main = encoder.create_label();
    encoder.begin_function(ENTRY_SYMBOL, true, &mut main)?;
    emit_prologue(&mut encoder)?;
    let count = module.blocks().len();
    for (index, (id, block)) in module.iter().enumerate() {
        encoder.place_label(&mut labels.blocks[id.index()])?;
        for op in &block.ops {
            emit_op(&mut encoder, &labels, *op)?;
        }
        let next = (index + 1 < count).then_some(index + 1);
        emit_terminator(&mut encoder, &labels, block.terminator, next, !block.ops.is_empty())?;
    }
    encoder.place_label(&mut labels.exit)?;
    emit_exit(&mut encoder)?;

    encoder.begin_function(RuntimeCall::GrowTape.symbol(), false, &mut labels.grow)?;
    emit_grow_helper(&mut encoder)?;

    encoder.begin_function(RuntimeCall::ReadByte.symbol(), false, &mut labels.input)?;
    emit_input_helper(&mut encoder)?;

    encoder.place_label(&mut labels.message)?;
    let mut message = UNDERFLOW_MESSAGE.as_bytes().to_vec();
    message.push(0);
    encoder.asm().db(&message)?;

    let code = encoder.finalize()?;
    log::debug!(
        "lowered {} to {} bytes of x86-64 ({} relocation sites)",
        module.name(),
        code.bytes.len(),
        code.fixups.len()
    );
    Ok(code)
}

fn emit_prologue(encoder: &mut X64Encoder) -> Result<(), EncodingError> {
    let a = encoder.asm();
    a.push(rbp)?;
    a.mov(rbp, rsp)?;
    // Four pushes keep rsp 16-byte aligned for calls.
    a.push(rbx)?;
    a.push(r12)?;
    a.push(r13)?;
    a.push(r14)?;
    Ok(())
}

/// Status in eax.
fn emit_exit(encoder: &mut X64Encoder) -> Result<(), EncodingError> {
    encoder.asm().mov(r14d, eax)?;
    encoder.asm().mov(rdi, rbx)?;
    encoder.call_external("free")?;
    encoder.load_state(Gpr::Rdi, StateSlot::Line)?;
    encoder.call_external("free")?;

    let a = encoder.asm();
    a.mov(eax, r14d)?;
    a.pop(r14)?;
    a.pop(r13)?;
    a.pop(r12)?;
    a.pop(rbx)?;
    a.pop(rbp)?;
    a.ret()?;
    Ok(())
}

fn emit_op(encoder: &mut X64Encoder, labels: &Labels, op: Op) -> Result<(), EncodingError> {
    match op {
        Op::AllocateTape(cells) => {
            encoder.asm().mov(rdi, cells)?;
            encoder.asm().mov(esi, 1u32)?;
            encoder.call_external("calloc")?;
            let a = encoder.asm();
            a.mov(rbx, rax)?;
            a.mov(r13, cells)?;
            a.xor(r12d, r12d)?;
        }
        Op::LoadCell => encoder.asm().mov(al, byte_ptr(rbx + r12))?,
        Op::StoreCell => encoder.asm().mov(byte_ptr(rbx + r12), al)?,
        Op::CellArith(ArithOp::Add, amount) => encoder.asm().add(al, i32::from(amount))?,
        Op::CellArith(ArithOp::Sub, amount) => encoder.asm().sub(al, i32::from(amount))?,
        Op::PointerArith(op, amount) => emit_pointer_arith(encoder, op, amount)?,
        Op::Call(RuntimeCall::GrowTape) => encoder.asm().call(labels.grow)?,
        Op::Call(RuntimeCall::ReadByte) => encoder.asm().call(labels.input)?,
        Op::Call(RuntimeCall::WriteByte) => {
            encoder.asm().movzx(r14d, al)?;
            encoder.asm().mov(edi, r14d)?;
            encoder.call_external(RuntimeCall::WriteByte.symbol())?;
            encoder.asm().mov(eax, r14d)?;
        }
    }
    Ok(())
}

fn emit_pointer_arith(encoder: &mut X64Encoder, op: ArithOp, amount: u64) -> Result<(), EncodingError> {
    let a = encoder.asm();
    match i32::try_from(amount) {
        Ok(imm) => match op {
            ArithOp::Add => a.add(r12, imm)?,
            ArithOp::Sub => a.sub(r12, imm)?,
        },
        Err(_) => {
            a.mov(r14, amount)?;
            match op {
                ArithOp::Add => a.add(r12, r14)?,
                ArithOp::Sub => a.sub(r12, r14)?,
            }
        }
    }
    Ok(())
}

fn emit_terminator(
    encoder: &mut X64Encoder,
    labels: &Labels,
    terminator: Terminator,
    next: Option<usize>,
    has_code: bool,
) -> Result<(), EncodingError> {
    let falls_into = |target: usize| has_code && next == Some(target);
    match terminator {
        Terminator::Jump(target) => {
            if !falls_into(target.index()) {
                encoder.asm().jmp(labels.blocks[target.index()])?;
            }
        }
        Terminator::Branch {
            cond,
            then_block,
            else_block,
        } => {
            let a = encoder.asm();
            match cond {
                Condition::CellNonZero => {
                    a.test(al, al)?;
                    a.jne(labels.blocks[then_block.index()])?;
                }
                Condition::PointerZero => {
                    a.test(r12, r12)?;
                    a.je(labels.blocks[then_block.index()])?;
                }
            }
            // The test above counts as code for the fallthrough.
            if next != Some(else_block.index()) {
                a.jmp(labels.blocks[else_block.index()])?;
            }
        }
        Terminator::Return(status) => {
            let a = encoder.asm();
            a.mov(eax, status)?;
            a.jmp(labels.exit)?;
        }
        Terminator::AbortUnderflow => {
            encoder.asm().lea(rdi, ptr(labels.message))?;
            encoder.load_got_address(Gpr::Rsi, "stderr")?;
            encoder.asm().mov(rsi, qword_ptr(rsi))?;
            encoder.call_external("fputs")?;
            let a = encoder.asm();
            a.mov(eax, UNDERFLOW_EXIT_STATUS)?;
            a.jmp(labels.exit)?;
        }
    }
    Ok(())
}

/// tapec_grow: double the tape when r12 == r13. Preserves rax.
fn emit_grow_helper(encoder: &mut X64Encoder) -> Result<(), EncodingError> {
    let mut done = encoder.create_label();

    let a = encoder.asm();
    a.cmp(r12, r13)?;
    a.jne(done)?;
    a.push(rax)?;
    a.mov(rdi, rbx)?;
    a.mov(rsi, r13)?;
    a.shl(rsi, 1u32)?;
    encoder.call_external("realloc")?;

    let a = encoder.asm();
    a.mov(rbx, rax)?;
    a.mov(rdi, rbx)?;
    a.add(rdi, r13)?;
    a.xor(esi, esi)?;
    a.mov(rdx, r13)?;
    encoder.call_external("memset")?;

    let a = encoder.asm();
    a.shl(r13, 1u32)?;
    a.pop(rax)?;
    encoder.place_label(&mut done)?;
    encoder.asm().ret()?;
    Ok(())
}

/// tapec_input: next input byte in eax.
///
/// Refills when the offset has reached the line length, then advances the
/// offset before reading; a position at or past the length yields 0.
fn emit_input_helper(encoder: &mut X64Encoder) -> Result<(), EncodingError> {
    let mut have_line = encoder.create_label();
    let mut stored = encoder.create_label();
    let mut read = encoder.create_label();
    let mut out = encoder.create_label();

    encoder.asm().sub(rsp, 8i32)?;
    encoder.load_state(Gpr::Rax, StateSlot::LineOffset)?;
    encoder.compare_state(Gpr::Rax, StateSlot::LineLength)?;
    encoder.asm().jl(have_line)?;

    encoder.address_of_state(Gpr::Rdi, StateSlot::Line)?;
    encoder.address_of_state(Gpr::Rsi, StateSlot::LineCapacity)?;
    encoder.load_got_address(Gpr::Rdx, "stdin")?;
    encoder.asm().mov(rdx, qword_ptr(rdx))?;
    encoder.call_external("getline")?;
    // getline returns -1 at end of input.
    encoder.asm().test(rax, rax)?;
    encoder.asm().jns(stored)?;
    encoder.asm().xor(eax, eax)?;
    encoder.place_label(&mut stored)?;
    encoder.store_state(StateSlot::LineLength, Gpr::Rax)?;
    encoder.asm().xor(eax, eax)?;
    encoder.store_state(StateSlot::LineOffset, Gpr::Rax)?;

    encoder.place_label(&mut have_line)?;
    encoder.load_state(Gpr::Rax, StateSlot::LineOffset)?;
    encoder.asm().inc(rax)?;
    encoder.store_state(StateSlot::LineOffset, Gpr::Rax)?;
    encoder.compare_state(Gpr::Rax, StateSlot::LineLength)?;
    encoder.asm().jl(read)?;
    encoder.asm().xor(eax, eax)?;
    encoder.asm().jmp(out)?;

    encoder.place_label(&mut read)?;
    encoder.load_state(Gpr::Rcx, StateSlot::Line)?;
    encoder.asm().movzx(eax, byte_ptr(rcx + rax))?;

    encoder.place_label(&mut out)?;
    encoder.asm().add(rsp, 8i32)?;
    encoder.asm().ret()?;
    Ok(())
}
