//! Growable tape.

use thiserror::Error;

use super::INITIAL_TAPE_CAPACITY;

/// A left move was attempted at cell 0.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("pointer moved left of cell 0")]
pub struct TapeUnderflow;

/// Byte cells plus the pointer index.
///
/// The pointer is always in `[0, capacity)` between operations. Capacity
/// starts at [`INITIAL_TAPE_CAPACITY`], doubles on demand and never shrinks.
/// Grown memory is zero-filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tape {
    cells: Vec<u8>,
    pointer: usize,
    growth_events: usize,
}

impl Tape {
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_TAPE_CAPACITY)
    }

    pub fn with_capacity(cells: usize) -> Self {
        Self {
            cells: vec![0; cells.max(1)],
            pointer: 0,
            growth_events: 0,
        }
    }

    pub fn pointer(&self) -> usize {
        self.pointer
    }

    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of times the tape has doubled.
    pub fn growth_events(&self) -> usize {
        self.growth_events
    }

    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn get(&self) -> u8 {
        self.cells[self.pointer]
    }

    pub fn set(&mut self, value: u8) {
        self.cells[self.pointer] = value;
    }

    /// Advance the pointer, growing when it reaches the capacity.
    pub fn move_right(&mut self) {
        self.step_right(1);
        self.grow();
    }

    /// Advance the pointer without growing.
    ///
    /// The pointer may equal the capacity afterwards; [`Tape::grow`] must
    /// run before the next cell access.
    pub fn step_right(&mut self, cells: usize) {
        self.pointer += cells;
    }

    /// Whether the pointer addresses an allocated cell.
    pub fn in_bounds(&self) -> bool {
        self.pointer < self.cells.len()
    }

    /// Double the capacity if the pointer has reached it.
    pub fn grow(&mut self) {
        if self.pointer == self.cells.len() {
            let doubled = self.cells.len() * 2;
            self.cells.resize(doubled, 0);
            self.growth_events += 1;
            log::trace!("tape grown to {doubled} cells");
        }
    }

    /// Step the pointer left, refusing to pass cell 0.
    pub fn move_left_guarded(&mut self) -> Result<(), TapeUnderflow> {
        if self.pointer == 0 {
            return Err(TapeUnderflow);
        }
        self.pointer -= 1;
        Ok(())
    }
}

impl Default for Tape {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_four_zeroed_cells() {
        let tape = Tape::new();
        assert_eq!(tape.capacity(), 4);
        assert_eq!(tape.pointer(), 0);
        assert_eq!(tape.cells(), &[0, 0, 0, 0]);
    }

    #[test]
    fn capacity_doubles_per_growth_event() {
        let mut tape = Tape::new();
        for step in 1..=40 {
            tape.move_right();
            assert!(tape.pointer() < tape.capacity(), "pointer escaped at step {step}");
            assert_eq!(tape.capacity(), 4 << tape.growth_events());
        }
        assert_eq!(tape.growth_events(), 4);
        assert_eq!(tape.capacity(), 64);
    }

    #[test]
    fn growth_preserves_written_cells() {
        let mut tape = Tape::new();
        for value in 1..=10u8 {
            tape.set(value);
            tape.move_right();
        }
        assert_eq!(&tape.cells()[..10], &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
        assert!(tape.cells()[10..].iter().all(|&cell| cell == 0));
    }

    #[test]
    fn left_of_zero_is_refused() {
        let mut tape = Tape::new();
        assert_eq!(tape.move_left_guarded(), Err(TapeUnderflow));
        assert_eq!(tape.pointer(), 0);

        tape.move_right();
        assert_eq!(tape.move_left_guarded(), Ok(()));
        assert_eq!(tape.move_left_guarded(), Err(TapeUnderflow));
        assert_eq!(tape.pointer(), 0);
    }
}
