//! Timing-jitter PRNG.
//!
//! Click and release durations are randomized so injected input carries
//! human-like timing. Cryptographic quality is irrelevant; determinism is
//! not: the default generator is a fixed-seed LCG so a test harness sees
//! the same timing on every run. The trait seam lets tests substitute a
//! fixed sequence.

use crate::config::JITTER_SEED;

/// Source of timing jitter.
pub trait JitterRng {
    fn next_u32(&mut self) -> u32;

    /// Uniform draw from the half-open range `[lo, hi)`.
    fn next_range(&mut self, lo: u32, hi: u32) -> u32 {
        debug_assert!(lo < hi);
        lo + self.next_u32() % (hi - lo)
    }
}

/// Linear congruential generator with the classic libc `rand()` constants.
/// Yields 15-bit values, which is plenty for millisecond jitter windows.
#[derive(Clone, Debug)]
pub struct Lcg {
    state: u32,
}

impl Lcg {
    pub const fn new(seed: u32) -> Self {
        Self { state: seed }
    }
}

impl Default for Lcg {
    fn default() -> Self {
        Self::new(JITTER_SEED)
    }
}

impl JitterRng for Lcg {
    fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.state >> 16) & 0x7FFF
    }
}
