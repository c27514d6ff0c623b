//! Core traits for windowed entropy
//!
//! The approximate estimator and the exact baseline share the
//! [`WindowEntropy`] interface so windowing code can drive either.

use crate::error::Result;
use core::fmt::Debug;

/// Source and destination entropy of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntropyPair<T> {
    pub src: T,
    pub dst: T,
}

impl<T> EntropyPair<T> {
    pub fn new(src: T, dst: T) -> Self {
        Self { src, dst }
    }

    /// Apply `f` to both directions
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> EntropyPair<U> {
        EntropyPair {
            src: f(self.src),
            dst: f(self.dst),
        }
    }
}

/// Per-window entropy of source and destination address distributions
pub trait WindowEntropy: Debug {
    /// Entropy representation (fixed-point or floating-point)
    type Value: Copy + Debug;

    /// Account one packet
    fn update(&mut self, src: u32, dst: u32) -> Result<()>;

    /// Start a new window
    fn reset(&mut self);

    /// Entropy of the source address distribution
    fn src_entropy(&self) -> Self::Value;

    /// Entropy of the destination address distribution
    fn dst_entropy(&self) -> Self::Value;

    /// Packets accounted since the last reset
    fn packets(&self) -> u64;

    /// Check if no packet was accounted in this window
    fn is_empty(&self) -> bool {
        self.packets() == 0
    }

    /// Both entropies at once
    fn entropy(&self) -> EntropyPair<Self::Value> {
        EntropyPair::new(self.src_entropy(), self.dst_entropy())
    }
}
