//! Sketch-based windowed entropy estimator
//!
//! Windowed Shannon entropy is `H = log2(M) - S / M` with
//! `S = Σ c_i·log2(c_i)` over per-address counts `c_i` in a window of `M`
//! packets. The sum telescopes: adding `f(c) = c·log2(c) - (c-1)·log2(c-1)`
//! every time an address reaches count `c` rebuilds `S` one packet at a time.
//! The estimator keeps no per-address state; the running count comes from a
//! [`CountSketch`] and `f` from a [`RangeLookupTable`].

use crate::error::{Error, Result};
use crate::lookup::RangeLookupTable;
use crate::math::{self, ENTROPY_FRAC_BITS};
use crate::sketch::{CountSketch, SketchCoefficients};
use crate::traits::WindowEntropy;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Telescoping entropy term `f(x) = x·log2(x) - (x-1)·log2(x-1)` in Q4,
/// rounded to the nearest integer; zero below 2.
pub fn entropy_term(x: u32) -> u32 {
    entropy_term_with_precision(x, ENTROPY_FRAC_BITS)
}

/// Telescoping entropy term with `frac_bits` fractional bits.
///
/// Values that do not fit a `u32` saturate, which starts at around 26
/// fractional bits for the largest `x`.
pub fn entropy_term_with_precision(x: u32, frac_bits: u32) -> u32 {
    if x < 2 {
        return 0;
    }
    let x = x as f64;
    let scale = (1u64 << frac_bits.min(32)) as f64;
    math::round(scale * (x * math::log2(x) - (x - 1.0) * math::log2(x - 1.0))) as u32
}

/// O(1)-memory approximate entropy of source and destination addresses
///
/// Entropies are reported in Q4 fixed point (bits × 16). The window size must
/// be a power of two so the division by `M` is a shift.
///
/// Call [`reset`](EntropyEstimator::reset) once per completed window. Feeding
/// more than `window_size` packets without a reset lets sketch estimates
/// outgrow the lookup table, and [`update`](EntropyEstimator::update) fails
/// with [`Error::NotFound`].
///
/// # Example
///
/// ```
/// use ddosd::entropy::EntropyEstimator;
///
/// let mut estimator = EntropyEstimator::with_seed(1024, 5, 4096, 7).unwrap();
///
/// for i in 0..1024u32 {
///     // 256 sources, one victim
///     estimator.update(0x0a00_0000 | (i % 256), 0xc0a8_0001).unwrap();
/// }
///
/// // log2(256) = 8 bits = 128 in Q4
/// let src = estimator.src_entropy();
/// assert!(src > 112 && src < 144);
/// assert!(estimator.dst_entropy() <= 2);
///
/// estimator.reset();
/// ```
#[derive(Clone, Debug)]
pub struct EntropyEstimator {
    window_size: u32,
    /// `log2(window_size)`, exact
    log2_window: u8,
    src_sketch: CountSketch,
    dst_sketch: CountSketch,
    /// `entropy_term` over `[0, window_size]`
    table: RangeLookupTable<u32>,
    /// Running Q4 sum of source-side terms
    src_sum: u64,
    /// Running Q4 sum of destination-side terms
    dst_sum: u64,
    packets: u64,
}

impl EntropyEstimator {
    /// Create an estimator whose sketches draw coefficients from the
    /// thread-local RNG
    #[cfg(feature = "std")]
    pub fn new(window_size: u32, depth: usize, width: usize) -> Result<Self> {
        Self::with_rng(window_size, depth, width, &mut rand::thread_rng())
    }

    /// Create an estimator whose sketches draw coefficients from a ChaCha8
    /// stream seeded with `seed`
    pub fn with_seed(window_size: u32, depth: usize, width: usize, seed: u64) -> Result<Self> {
        Self::with_rng(window_size, depth, width, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create an estimator whose sketches draw independent coefficients from
    /// `rng`, source sketch first
    pub fn with_rng<R: Rng + ?Sized>(
        window_size: u32,
        depth: usize,
        width: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let log2_window = log2_window(window_size)?;
        let src_sketch = CountSketch::with_rng(depth, width, rng)?;
        let dst_sketch = CountSketch::with_rng(depth, width, rng)?;
        Self::from_sketches(window_size, log2_window, src_sketch, dst_sketch)
    }

    /// Create an estimator whose source and destination sketches share
    /// `coefficients`
    pub fn with_coefficients(
        window_size: u32,
        width: usize,
        coefficients: SketchCoefficients,
    ) -> Result<Self> {
        let log2_window = log2_window(window_size)?;
        let src_sketch = CountSketch::with_coefficients(width, coefficients.clone())?;
        let dst_sketch = CountSketch::with_coefficients(width, coefficients)?;
        Self::from_sketches(window_size, log2_window, src_sketch, dst_sketch)
    }

    fn from_sketches(
        window_size: u32,
        log2_window: u8,
        src_sketch: CountSketch,
        dst_sketch: CountSketch,
    ) -> Result<Self> {
        let table = RangeLookupTable::build(entropy_term, window_size, 1)?;

        debug!(
            window_size,
            depth = src_sketch.depth(),
            width = src_sketch.width(),
            table_entries = table.len(),
            "entropy estimator ready"
        );

        Ok(Self {
            window_size,
            log2_window,
            src_sketch,
            dst_sketch,
            table,
            src_sum: 0,
            dst_sum: 0,
            packets: 0,
        })
    }

    /// Account one packet.
    ///
    /// Non-positive sketch estimates are collision noise and contribute
    /// nothing.
    pub fn update(&mut self, src: u32, dst: u32) -> Result<()> {
        self.packets += 1;
        self.src_sum += accumulate(&mut self.src_sketch, &self.table, src)?;
        self.dst_sum += accumulate(&mut self.dst_sketch, &self.table, dst)?;
        Ok(())
    }

    /// Start a new window: advance both sketch epochs and clear the sums
    pub fn reset(&mut self) {
        self.src_sketch.reset();
        self.dst_sketch.reset();
        self.src_sum = 0;
        self.dst_sum = 0;
        self.packets = 0;
    }

    /// Source address entropy in Q4
    pub fn src_entropy(&self) -> u32 {
        self.readout(self.src_sum)
    }

    /// Destination address entropy in Q4
    pub fn dst_entropy(&self) -> u32 {
        self.readout(self.dst_sum)
    }

    /// `log2(M) - S / M` with both terms in Q4, saturating at zero
    fn readout(&self, sum: u64) -> u32 {
        let log2_m = (self.log2_window as u64) << ENTROPY_FRAC_BITS;
        log2_m.saturating_sub(sum >> self.log2_window) as u32
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    pub fn log2_window(&self) -> u8 {
        self.log2_window
    }

    /// Packets accounted since the last reset
    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn depth(&self) -> usize {
        self.src_sketch.depth()
    }

    pub fn width(&self) -> usize {
        self.src_sketch.width()
    }

    /// Lookup table for the entropy term
    pub fn table(&self) -> &RangeLookupTable<u32> {
        &self.table
    }

    /// Memory usage in bytes
    pub fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.src_sketch.size_bytes()
            + self.dst_sketch.size_bytes()
            + self.table.size_bytes()
    }
}

fn accumulate(sketch: &mut CountSketch, table: &RangeLookupTable<u32>, key: u32) -> Result<u64> {
    let estimate = sketch.update(key);
    if estimate <= 0 {
        return Ok(0);
    }

    table.get(estimate as u32).map(u64::from).inspect_err(|err| {
        warn!(key, estimate, %err, "entropy term lookup failed; window not reset in time?");
    })
}

fn log2_window(window_size: u32) -> Result<u8> {
    if !window_size.is_power_of_two() {
        return Err(Error::WindowNotPowerOfTwo(window_size));
    }
    Ok(window_size.trailing_zeros() as u8)
}

impl WindowEntropy for EntropyEstimator {
    type Value = u32;

    fn update(&mut self, src: u32, dst: u32) -> Result<()> {
        EntropyEstimator::update(self, src, dst)
    }

    fn reset(&mut self) {
        EntropyEstimator::reset(self)
    }

    fn src_entropy(&self) -> u32 {
        EntropyEstimator::src_entropy(self)
    }

    fn dst_entropy(&self) -> u32 {
        EntropyEstimator::dst_entropy(self)
    }

    fn packets(&self) -> u64 {
        self.packets
    }
}
