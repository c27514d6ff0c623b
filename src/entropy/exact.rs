//! Exact windowed entropy from full histograms
//!
//! Keeps one counter per distinct address seen in the window. Memory grows
//! with address fan-out, so this is the ground truth used to validate
//! [`EntropyEstimator`](super::EntropyEstimator), not a line-rate path.

use crate::error::Result;
use crate::math;
use crate::traits::WindowEntropy;
use std::collections::HashMap;
use xxhash_rust::xxh3::Xxh3Builder;

type Histogram = HashMap<u32, u32, Xxh3Builder>;

/// Exact Shannon entropy of source and destination addresses, in bits
///
/// # Example
///
/// ```
/// use ddosd::entropy::ExactEntropy;
///
/// let mut exact = ExactEntropy::new();
/// for src in [1, 2, 3, 4] {
///     exact.update(src, 99);
/// }
///
/// assert_eq!(exact.src_entropy(), 2.0);
/// assert_eq!(exact.dst_entropy(), 0.0);
/// ```
#[derive(Debug)]
pub struct ExactEntropy {
    packets: u64,
    src_histogram: Histogram,
    dst_histogram: Histogram,
}

impl Default for ExactEntropy {
    fn default() -> Self {
        Self::new()
    }
}

impl ExactEntropy {
    pub fn new() -> Self {
        Self {
            packets: 0,
            src_histogram: HashMap::with_hasher(Xxh3Builder::new()),
            dst_histogram: HashMap::with_hasher(Xxh3Builder::new()),
        }
    }

    /// Account one packet
    pub fn update(&mut self, src: u32, dst: u32) {
        self.packets += 1;
        *self.src_histogram.entry(src).or_insert(0) += 1;
        *self.dst_histogram.entry(dst).or_insert(0) += 1;
    }

    /// Clear both histograms and the packet counter
    pub fn reset(&mut self) {
        self.packets = 0;
        self.src_histogram.clear();
        self.dst_histogram.clear();
    }

    /// Source address entropy in bits; `0.0` for an empty window
    pub fn src_entropy(&self) -> f64 {
        entropy(&self.src_histogram, self.packets)
    }

    /// Destination address entropy in bits; `0.0` for an empty window
    pub fn dst_entropy(&self) -> f64 {
        entropy(&self.dst_histogram, self.packets)
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    /// Distinct source addresses in this window
    pub fn distinct_sources(&self) -> usize {
        self.src_histogram.len()
    }

    /// Distinct destination addresses in this window
    pub fn distinct_destinations(&self) -> usize {
        self.dst_histogram.len()
    }
}

/// `log2(N) - (1/N)·Σ c·log2(c)`
fn entropy(histogram: &Histogram, packets: u64) -> f64 {
    if packets == 0 {
        return 0.0;
    }

    let n = packets as f64;
    let weighted: f64 = histogram
        .values()
        .map(|&count| {
            let c = count as f64;
            c * math::log2(c)
        })
        .sum();

    math::log2(n) - weighted / n
}

impl WindowEntropy for ExactEntropy {
    type Value = f64;

    fn update(&mut self, src: u32, dst: u32) -> Result<()> {
        ExactEntropy::update(self, src, dst);
        Ok(())
    }

    fn reset(&mut self) {
        ExactEntropy::reset(self)
    }

    fn src_entropy(&self) -> f64 {
        ExactEntropy::src_entropy(self)
    }

    fn dst_entropy(&self) -> f64 {
        ExactEntropy::dst_entropy(self)
    }

    fn packets(&self) -> u64 {
        self.packets
    }
}
