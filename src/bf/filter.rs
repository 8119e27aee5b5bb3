//! Source filter: keep the eight instruction characters, drop everything else.

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use super::Instruction;

/// Filter `source` into a heap vector.
pub fn filter_source(source: &str) -> Vec<Instruction> {
    source.chars().filter_map(Instruction::from_char).collect()
}

/// Filter `source` into a slice owned by `arena`.
pub fn filter_source_in<'arena>(arena: &'arena Bump, source: &str) -> &'arena [Instruction] {
    let mut instructions = BumpVec::with_capacity_in(source.len(), arena);
    instructions.extend(source.chars().filter_map(Instruction::from_char));
    instructions.into_bump_slice()
}

#[cfg(test)]
mod tests {
    use super::*;
    use Instruction::*;

    #[test]
    fn maps_every_instruction_character() {
        assert_eq!(
            filter_source("><+-.,[]"),
            vec![MoveRight, MoveLeft, Increment, Decrement, Output, Input, LoopStart, LoopEnd]
        );
    }

    #[test]
    fn ignores_comment_text() {
        let source = "add two: ++ (then print) .\n# done ]";
        assert_eq!(filter_source(source), vec![Increment, Increment, Output, LoopEnd]);
        assert!(filter_source("hello world\n").is_empty());
    }

    #[test]
    fn arena_and_heap_filters_agree() {
        let arena = Bump::new();
        let source = "+[->+<]>. comment ,";
        assert_eq!(filter_source_in(&arena, source), filter_source(source).as_slice());
    }
}
