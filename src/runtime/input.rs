//! Line-buffered input cursor shared by every input instruction.

use std::io::{self, BufRead};

/// Buffered line plus read offset.
///
/// One input step refills the buffer when the offset has reached the end of
/// the buffered line, then advances the offset and returns the byte at the
/// new offset. The advance happens before the read, so the first byte of a
/// freshly read line is never returned: after a refill with `"A\n"` the
/// first value is `b'\n'`. Reading at the end of the line yields 0, like
/// the terminating NUL of a C string. When the reader is exhausted the
/// buffer stays empty and the step yields 0; the next step tries again.
#[derive(Debug)]
pub struct InputCursor<R> {
    reader: R,
    line: Vec<u8>,
    offset: usize,
    refills: usize,
}

impl<R: BufRead> InputCursor<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            offset: 0,
            refills: 0,
        }
    }

    /// Perform one input step.
    pub fn read_byte(&mut self) -> io::Result<u8> {
        if self.offset >= self.line.len() {
            self.refill()?;
        }
        self.offset += 1;
        Ok(self.line.get(self.offset).copied().unwrap_or(0))
    }

    fn refill(&mut self) -> io::Result<()> {
        self.line.clear();
        let read = self.reader.read_until(b'\n', &mut self.line)?;
        self.offset = 0;
        self.refills += 1;
        if read == 0 {
            log::debug!("input exhausted, returning 0");
        }
        Ok(())
    }

    pub fn line(&self) -> &[u8] {
        &self.line
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Lines requested from the reader so far, including empty reads.
    pub fn refills(&self) -> usize {
        self.refills
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}
