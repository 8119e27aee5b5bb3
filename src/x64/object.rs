//! ELF relocatable object output.
//!
//! The object has one `.text` section holding `main` and the local runtime
//! helpers, one `.bss` object with the input state, undefined symbols for
//! every libc function and data object the code references, and an empty
//! `.note.GNU-stack` marking the stack non-executable.

use hashbrown::HashMap;
use object::write::{Object, Relocation, StandardSection, Symbol, SymbolId, SymbolSection};
use object::{
    Architecture, BinaryFormat, Endianness, RelocationEncoding, RelocationFlags, RelocationKind,
    SectionKind, SymbolFlags, SymbolKind, SymbolScope,
};

use super::encoder::{FixupTarget, MachineCode, STATE_SIZE};

/// Name of the local `.bss` symbol holding the input state.
pub const STATE_SYMBOL: &str = "tapec_input_state";

fn undefined_symbol(name: &str, kind: SymbolKind) -> Symbol {
    Symbol {
        name: name.as_bytes().to_vec(),
        value: 0,
        size: 0,
        kind,
        scope: SymbolScope::Dynamic,
        weak: false,
        section: SymbolSection::Undefined,
        flags: SymbolFlags::None,
    }
}

/// Build an x86-64 ELF relocatable object from `code`.
///
/// `source_name` becomes the object's file symbol.
pub fn write_object(code: &MachineCode, source_name: &str) -> Result<Vec<u8>, object::write::Error> {
    let mut obj = Object::new(BinaryFormat::Elf, Architecture::X86_64, Endianness::Little);
    obj.add_file_symbol(source_name.as_bytes().to_vec());

    let text = obj.section_id(StandardSection::Text);
    let text_offset = obj.append_section_data(text, &code.bytes, 16);

    for function in &code.functions {
        obj.add_symbol(Symbol {
            name: function.name.as_bytes().to_vec(),
            value: text_offset + function.offset,
            size: function.size,
            kind: SymbolKind::Text,
            scope: if function.global {
                SymbolScope::Linkage
            } else {
                SymbolScope::Compilation
            },
            weak: false,
            section: SymbolSection::Section(text),
            flags: SymbolFlags::None,
        });
    }

    let bss = obj.section_id(StandardSection::UninitializedData);
    let state_offset = obj.append_section_bss(bss, STATE_SIZE, 8);
    let state = obj.add_symbol(Symbol {
        name: STATE_SYMBOL.as_bytes().to_vec(),
        value: state_offset,
        size: STATE_SIZE,
        kind: SymbolKind::Data,
        scope: SymbolScope::Compilation,
        weak: false,
        section: SymbolSection::Section(bss),
        flags: SymbolFlags::None,
    });

    let mut externals: HashMap<&'static str, SymbolId> = HashMap::new();
    for fixup in &code.fixups {
        // The field is the last four bytes of its instruction, so the CPU adds
        // the displacement to the address just past it.
        let (symbol, kind, addend) = match fixup.target {
            FixupTarget::Call(name) => {
                let symbol = *externals
                    .entry(name)
                    .or_insert_with(|| obj.add_symbol(undefined_symbol(name, SymbolKind::Text)));
                (symbol, RelocationKind::PltRelative, -4)
            }
            FixupTarget::GotEntry(name) => {
                let symbol = *externals
                    .entry(name)
                    .or_insert_with(|| obj.add_symbol(undefined_symbol(name, SymbolKind::Data)));
                (symbol, RelocationKind::GotRelative, -4)
            }
            FixupTarget::State(slot) => (state, RelocationKind::Relative, slot.offset() as i64 - 4),
        };
        obj.add_relocation(
            text,
            Relocation {
                offset: text_offset + fixup.offset,
                symbol,
                addend,
                flags: RelocationFlags::Generic {
                    kind,
                    encoding: RelocationEncoding::Generic,
                    size: 32,
                },
            },
        )?;
    }

    obj.add_section(
        Vec::new(),
        b".note.GNU-stack".to_vec(),
        SectionKind::Elf(object::elf::SHT_PROGBITS),
    );

    log::debug!(
        "object: {} bytes of text, {} relocations, {} external symbols",
        code.bytes.len(),
        code.fixups.len(),
        externals.len()
    );
    obj.write()
}
