//! VM Memory Model
//!
//! Fixed-size, power-of-two memory segments. Every access goes through
//! `touch`, which masks the address into range and notifies the segment's
//! probe. Out-of-range addresses are never an error: they wrap.

use std::fmt::Debug;

use crate::error::OciResult;
use crate::genome::{GenomeReader, GenomeWriter};

use super::probe::Probe;

/// Machine word stored in a segment
pub trait Word: Copy + Default + PartialEq + Debug + Send + 'static {
    /// Width in the genetic string
    const BYTES: usize;

    /// Decode from exactly `BYTES` little-endian bytes
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian encoding
    fn extend_le(self, out: &mut Vec<u8>);

    /// Value as an address
    fn as_index(self) -> usize;
}

impl Word for u8 {
    const BYTES: usize = 1;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0]
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.push(self);
    }

    #[inline]
    fn as_index(self) -> usize {
        self as usize
    }
}

impl Word for u16 {
    const BYTES: usize = 2;

    #[inline]
    fn from_le_slice(bytes: &[u8]) -> Self {
        u16::from_le_bytes([bytes[0], bytes[1]])
    }

    fn extend_le(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn as_index(self) -> usize {
        self as usize
    }
}

/// A memory segment of `W` words with wraparound addressing
#[derive(Debug)]
pub struct Segment<W: Word, P: Probe> {
    cells: Vec<W>,
    mask: usize,
    probe: P,
}

impl<W: Word, P: Probe> Segment<W, P> {
    /// Allocate a zeroed segment. `size` must already be validated as a
    /// power of two.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Segment {
            cells: vec![W::default(); size],
            mask: size - 1,
            probe: P::with_len(size),
        }
    }

    /// Instrumented access to the cell at `addr` modulo the segment size
    #[inline(always)]
    pub fn touch(&mut self, addr: usize) -> &mut W {
        let index = addr & self.mask;
        self.probe.hit(index);
        &mut self.cells[index]
    }

    #[inline(always)]
    pub fn read(&mut self, addr: usize) -> W {
        *self.touch(addr)
    }

    #[inline(always)]
    pub fn write(&mut self, addr: usize, value: W) {
        *self.touch(addr) = value;
    }

    /// Uninstrumented read
    pub fn peek(&self, addr: usize) -> W {
        self.cells[addr & self.mask]
    }

    pub fn cells(&self) -> &[W] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Per-address touch counts; empty when uninstrumented
    pub fn touches(&self) -> &[u64] {
        self.probe.counts()
    }

    /// Addresses touched at least once since the last reset
    pub fn distinct_touched(&self) -> usize {
        self.probe.distinct()
    }

    pub fn reset_touches(&mut self) {
        self.probe.reset();
    }

    /// Overwrite the contents from a genome
    pub fn load(&mut self, genome: &mut GenomeReader<'_>) -> OciResult<()> {
        genome.read_words(&mut self.cells)
    }

    pub fn save(&self, genome: &mut GenomeWriter) {
        genome.write_words(&self.cells);
    }

    /// Bytes this segment occupies in a genetic string
    pub fn genome_bytes(&self) -> usize {
        self.cells.len() * W::BYTES
    }
}
