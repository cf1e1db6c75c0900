//! Output Sink
//!
//! Append-only byte buffer that is the machine's only observable side
//! channel. Storage grows in fixed blocks and never shrinks; each run rewinds
//! the cursor and overwrites from offset zero.

/// Allocation unit appended when the buffer is full
pub const OUTPUT_BLOCK: usize = 1024;

/// Source that can be read byte-wise by address, for masked emission
pub trait ByteSource {
    fn byte_at(&self, index: usize) -> u8;
}

impl ByteSource for [u8] {
    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        self[index]
    }
}

/// 16-bit words viewed as little-endian bytes
impl ByteSource for [u16] {
    #[inline]
    fn byte_at(&self, index: usize) -> u8 {
        let word = self[index >> 1];
        if index & 1 == 0 {
            word as u8
        } else {
            (word >> 8) as u8
        }
    }
}

#[derive(Debug, Default)]
pub struct OutputSink {
    buf: Vec<u8>,
    len: usize,
}

impl OutputSink {
    pub fn new() -> Self {
        OutputSink {
            buf: vec![0; OUTPUT_BLOCK],
            len: 0,
        }
    }

    #[inline]
    pub fn emit(&mut self, byte: u8) {
        if self.len == self.buf.len() {
            self.buf.resize(self.buf.len() + OUTPUT_BLOCK, 0);
        }
        self.buf[self.len] = byte;
        self.len += 1;
    }

    /// Emit a 16-bit word, low byte first
    #[inline]
    pub fn emit_word(&mut self, word: u16) {
        let [low, high] = word.to_le_bytes();
        self.emit(low);
        self.emit(high);
    }

    /// Emit `count` bytes of `source` starting at `offset`, masking every
    /// index with `mask`
    pub fn emit_masked<S: ByteSource + ?Sized>(
        &mut self,
        source: &S,
        offset: usize,
        count: usize,
        mask: usize,
    ) {
        for i in 0..count {
            self.emit(source.byte_at(offset.wrapping_add(i) & mask));
        }
    }

    /// Rewind the cursor without releasing storage
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Bytes written in the current run
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated storage, always a multiple of `OUTPUT_BLOCK`
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}
