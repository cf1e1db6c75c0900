//! Genetic String Codec
//!
//! Cursor-based reader and writer for the fixed-layout genome format.
//! Multi-byte fields are little-endian. The reader performs the length check
//! once up front so a short genome never touches machine state.

use crate::error::{OciError, OciResult};
use crate::vm::memory::Word;

/// Reads machine fields from a genetic string in layout order
#[derive(Debug)]
pub struct GenomeReader<'a> {
    bytes: &'a [u8],
    cursor: usize,
    expected: usize,
}

impl<'a> GenomeReader<'a> {
    /// Wrap a genome, failing if it holds fewer than `expected` bytes
    pub fn new(bytes: &'a [u8], expected: usize) -> OciResult<Self> {
        if bytes.len() < expected {
            return Err(OciError::MalformedGenome {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(GenomeReader {
            bytes,
            cursor: 0,
            expected,
        })
    }

    pub fn read_u8(&mut self) -> OciResult<u8> {
        let v = *self.bytes.get(self.cursor).ok_or_else(|| self.short())?;
        self.cursor += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> OciResult<u16> {
        let low = self.read_u8()? as u16;
        let high = self.read_u8()? as u16;
        Ok((high << 8) | low)
    }

    /// Fill `dst` word by word
    pub fn read_words<W: Word>(&mut self, dst: &mut [W]) -> OciResult<()> {
        let len = dst.len() * W::BYTES;
        let end = self.cursor + len;
        let src = self.bytes.get(self.cursor..end).ok_or_else(|| self.short())?;
        for (cell, chunk) in dst.iter_mut().zip(src.chunks_exact(W::BYTES)) {
            *cell = W::from_le_slice(chunk);
        }
        self.cursor = end;
        Ok(())
    }

    /// Bytes consumed so far
    pub fn consumed(&self) -> usize {
        self.cursor
    }

    /// Bytes present beyond the required layout
    pub fn trailing(&self) -> usize {
        self.bytes.len().saturating_sub(self.expected)
    }

    fn short(&self) -> OciError {
        OciError::MalformedGenome {
            expected: self.expected,
            actual: self.bytes.len(),
        }
    }
}

/// Serializes machine fields in layout order
#[derive(Debug, Default)]
pub struct GenomeWriter {
    bytes: Vec<u8>,
}

impl GenomeWriter {
    pub fn with_capacity(size: usize) -> Self {
        GenomeWriter {
            bytes: Vec::with_capacity(size),
        }
    }

    pub fn write_u8(&mut self, v: u8) {
        self.bytes.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.bytes.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_words<W: Word>(&mut self, words: &[W]) {
        for w in words {
            w.extend_le(&mut self.bytes);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}
