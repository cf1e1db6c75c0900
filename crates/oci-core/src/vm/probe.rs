//! Instrumentation probes
//!
//! A probe is chosen as a type parameter when a machine is built. `NoProbe`
//! is zero-sized and every call on it compiles away, so uninstrumented
//! machines pay nothing on the memory hot path. `TouchCounter` counts hits
//! per index and is used both for per-address touch counts and for the
//! per-instruction occurrence histogram.

use std::fmt::Debug;

pub trait Probe: Debug + Send {
    /// True when the probe records anything
    const ENABLED: bool;

    /// Create a probe covering `len` indices
    fn with_len(len: usize) -> Self;

    /// Record one hit at `index` (already in range)
    fn hit(&mut self, index: usize);

    /// Zero all counters
    fn reset(&mut self);

    /// Per-index hit counts (empty when disabled)
    fn counts(&self) -> &[u64];

    /// Number of indices hit at least once since the last reset
    fn distinct(&self) -> usize;
}

/// Disabled instrumentation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl Probe for NoProbe {
    const ENABLED: bool = false;

    #[inline(always)]
    fn with_len(_len: usize) -> Self {
        NoProbe
    }

    #[inline(always)]
    fn hit(&mut self, _index: usize) {}

    #[inline(always)]
    fn reset(&mut self) {}

    fn counts(&self) -> &[u64] {
        &[]
    }

    fn distinct(&self) -> usize {
        0
    }
}

/// Counting instrumentation
#[derive(Debug, Clone, Default)]
pub struct TouchCounter {
    counts: Vec<u64>,
    distinct: usize,
}

impl Probe for TouchCounter {
    const ENABLED: bool = true;

    fn with_len(len: usize) -> Self {
        TouchCounter {
            counts: vec![0; len],
            distinct: 0,
        }
    }

    #[inline]
    fn hit(&mut self, index: usize) {
        let count = &mut self.counts[index];
        if *count == 0 {
            self.distinct += 1;
        }
        *count += 1;
    }

    fn reset(&mut self) {
        self.counts.iter_mut().for_each(|c| *c = 0);
        self.distinct = 0;
    }

    fn counts(&self) -> &[u64] {
        &self.counts
    }

    fn distinct(&self) -> usize {
        self.distinct
    }
}
