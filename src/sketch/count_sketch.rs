//! Count sketch with signed counters and epoch-tagged cells
//!
//! The count sketch estimates per-key frequencies by hashing each key to one
//! bucket per row and adding a pseudo-random ±1 sign there. Reading the
//! bucket back through the same sign gives an unbiased row estimate, and the
//! median over rows bounds the damage done by colliding keys.

use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Prime modulus shared by every affine hash in the sketch
pub const LARGE_PRIME: u32 = 179_424_691;

/// One affine hash `(multiplier * key + offset) mod LARGE_PRIME`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RowHash {
    pub multiplier: u32,
    pub offset: u32,
}

impl RowHash {
    pub fn new(multiplier: u32, offset: u32) -> Self {
        Self { multiplier, offset }
    }

    /// Draw a multiplier uniformly from `[1, LARGE_PRIME]` and an offset
    /// coprime to it.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let multiplier = rng.gen_range(1..=LARGE_PRIME);
        let offset = relative_prime(multiplier, rng);
        Self { multiplier, offset }
    }

    #[inline]
    fn apply(&self, key: u32) -> u64 {
        (self.multiplier as u64 * key as u64 + self.offset as u64) % LARGE_PRIME as u64
    }

    /// Bucket index in `[0, width)`
    #[inline]
    pub fn bucket(&self, key: u32, width: usize) -> usize {
        (self.apply(key) % width as u64) as usize
    }

    /// Sign in `{-1, +1}`
    #[inline]
    pub fn sign(&self, key: u32) -> i32 {
        2 * (self.apply(key) % 2) as i32 - 1
    }
}

/// Per-row hash coefficients for the bucket family and the sign family
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SketchCoefficients {
    bucket: Vec<RowHash>,
    sign: Vec<RowHash>,
}

impl SketchCoefficients {
    /// Pair an explicit bucket family with an explicit sign family.
    ///
    /// Both families must have the same number of rows, and at least one.
    pub fn new(bucket: Vec<RowHash>, sign: Vec<RowHash>) -> Result<Self> {
        if bucket.is_empty() {
            return Err(Error::CoefficientCount {
                family: "bucket",
                expected: 1,
                found: 0,
            });
        }
        if sign.len() != bucket.len() {
            return Err(Error::CoefficientCount {
                family: "sign",
                expected: bucket.len(),
                found: sign.len(),
            });
        }
        Ok(Self { bucket, sign })
    }

    /// Draw `depth` independent rows for each family.
    pub fn random<R: Rng + ?Sized>(depth: usize, rng: &mut R) -> Self {
        let mut bucket = Vec::with_capacity(depth);
        let mut sign = Vec::with_capacity(depth);
        for _ in 0..depth {
            bucket.push(RowHash::random(rng));
            sign.push(RowHash::random(rng));
        }
        Self { bucket, sign }
    }

    /// Number of rows
    pub fn depth(&self) -> usize {
        self.bucket.len()
    }

    /// Bucket-selecting hash family
    pub fn bucket(&self) -> &[RowHash] {
        &self.bucket
    }

    /// Sign-selecting hash family
    pub fn sign(&self) -> &[RowHash] {
        &self.sign
    }
}

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

/// Sample a value in `[1, LARGE_PRIME]` and divide out every factor it
/// shares with `n`.
fn relative_prime<R: Rng + ?Sized>(n: u32, rng: &mut R) -> u32 {
    let mut r = rng.gen_range(1..=LARGE_PRIME);
    let mut t = gcd(r, n);
    while t > 1 {
        r /= t;
        t = gcd(r, n);
    }
    r
}

/// Counter cell; the counter is live only while `epoch` matches the sketch
#[derive(Clone, Copy, Debug, Default)]
struct Cell {
    counter: i32,
    epoch: u32,
}

/// Count sketch over 32-bit keys with O(1) reset
///
/// Every [`update`](CountSketch::update) both increments the key and returns
/// its estimated frequency after the increment. Estimates are noisy and may be
/// zero or negative when colliding keys cancel out.
///
/// [`reset`](CountSketch::reset) bumps a generation counter instead of clearing
/// the table; cells carrying an older generation read as zero the next time
/// they are touched.
///
/// # Example
///
/// ```
/// use ddosd::sketch::CountSketch;
///
/// let mut sketch = CountSketch::with_seed(5, 1024, 42).unwrap();
///
/// assert_eq!(sketch.update(0x0a00_0001), 1);
/// assert_eq!(sketch.update(0x0a00_0001), 2);
///
/// sketch.reset();
/// assert_eq!(sketch.update(0x0a00_0001), 1);
/// ```
#[derive(Clone, Debug)]
pub struct CountSketch {
    /// Number of rows (hash functions)
    depth: usize,
    /// Width of each row
    width: usize,
    /// Current generation
    epoch: u32,
    coefficients: SketchCoefficients,
    /// Row-major `depth * width` cells
    cells: Vec<Cell>,
    /// Scratch space for row estimates
    estimates: Vec<i32>,
}

impl CountSketch {
    /// Create a sketch with coefficients drawn from the thread-local RNG
    #[cfg(feature = "std")]
    pub fn new(depth: usize, width: usize) -> Result<Self> {
        Self::with_rng(depth, width, &mut rand::thread_rng())
    }

    /// Create a sketch with coefficients drawn from a ChaCha8 stream seeded
    /// with `seed`
    pub fn with_seed(depth: usize, width: usize, seed: u64) -> Result<Self> {
        Self::with_rng(depth, width, &mut ChaCha8Rng::seed_from_u64(seed))
    }

    /// Create a sketch with coefficients drawn from `rng`
    pub fn with_rng<R: Rng + ?Sized>(depth: usize, width: usize, rng: &mut R) -> Result<Self> {
        check_dimensions(depth, width)?;
        Self::with_coefficients(width, SketchCoefficients::random(depth, rng))
    }

    /// Create a sketch from explicit coefficients; depth is taken from them
    pub fn with_coefficients(width: usize, coefficients: SketchCoefficients) -> Result<Self> {
        let depth = coefficients.depth();
        check_dimensions(depth, width)?;

        debug!(depth, width, "count sketch allocated");

        Ok(Self {
            depth,
            width,
            epoch: 0,
            coefficients,
            cells: vec![Cell::default(); depth * width],
            estimates: Vec::with_capacity(depth),
        })
    }

    /// Get the depth of the sketch
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Get the width of the sketch
    pub fn width(&self) -> usize {
        self.width
    }

    /// Current generation; advanced by every reset
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Hash coefficients in use
    pub fn coefficients(&self) -> &SketchCoefficients {
        &self.coefficients
    }

    /// Increment `key` and return the median of the row estimates of its
    /// frequency.
    ///
    /// For an even depth the two middle estimates are averaged, truncating
    /// toward zero.
    pub fn update(&mut self, key: u32) -> i32 {
        self.estimates.clear();

        for row in 0..self.depth {
            let bucket = self.coefficients.bucket[row].bucket(key, self.width);
            let sign = self.coefficients.sign[row].sign(key);
            let cell = &mut self.cells[row * self.width + bucket];

            if cell.epoch != self.epoch {
                cell.counter = sign;
                cell.epoch = self.epoch;
            } else {
                cell.counter += sign;
            }

            self.estimates.push(sign * cell.counter);
        }

        self.estimates.sort_unstable();
        let mid = self.depth / 2;
        if self.depth % 2 == 0 {
            ((self.estimates[mid - 1] as i64 + self.estimates[mid] as i64) / 2) as i32
        } else {
            self.estimates[mid]
        }
    }

    /// Logically zero every counter
    pub fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            // generation wrapped: old tags could alias the new epoch
            self.cells.fill(Cell::default());
        }
    }

    /// Memory usage in bytes
    pub fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.cells.len() * core::mem::size_of::<Cell>()
            + 2 * self.depth * core::mem::size_of::<RowHash>()
            + self.estimates.capacity() * core::mem::size_of::<i32>()
    }
}

fn check_dimensions(depth: usize, width: usize) -> Result<()> {
    if depth == 0 || width == 0 {
        return Err(Error::InvalidDimensions { depth, width });
    }
    Ok(())
}
