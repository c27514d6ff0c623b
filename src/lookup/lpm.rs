//! Longest-prefix-match lookup table over the 32-bit domain
//!
//! The table replaces a scalar function with a piecewise-constant
//! approximation. The domain is tiled left to right with power-of-two aligned
//! blocks, each as large as the error budget allows, so flat stretches of the
//! function cost one entry and steep stretches fall back to single points.
//! Queries probe prefix lengths from most to least specific.

use crate::error::{Error, Result};
use core::fmt;
use tracing::debug;

#[cfg(feature = "std")]
use std::collections::BTreeMap;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;

/// Power-of-two aligned interval `[base, base + 2^(32 - prefix_len) - 1]`
///
/// Ordered by base, then prefix length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeKey {
    pub base: u32,
    pub prefix_len: u8,
}

impl RangeKey {
    /// Key of length `prefix_len` covering `x`
    #[inline]
    pub fn covering(x: u32, prefix_len: u8) -> Self {
        Self {
            base: x & prefix_mask(prefix_len),
            prefix_len,
        }
    }

    /// Number of points in the interval
    pub fn span(&self) -> u64 {
        1u64 << (32 - self.prefix_len as u32)
    }

    /// Last point of the interval
    pub fn last(&self) -> u32 {
        (self.base as u64 + self.span() - 1) as u32
    }

    pub fn contains(&self, x: u32) -> bool {
        x >= self.base && x <= self.last()
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.prefix_len)
    }
}

#[inline]
fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len if len >= 32 => u32::MAX,
        len => !(u32::MAX >> len),
    }
}

/// Values a [`RangeLookupTable`] can store
///
/// Block representatives are the floored midpoint of the endpoint values, and
/// a block is accepted when its endpoint values differ by at most the error
/// budget. Both are computed in a wider type so they never overflow.
pub trait TableValue: Copy + fmt::Debug {
    /// `floor((self + other) / 2)`
    fn floor_midpoint(self, other: Self) -> Self;

    /// `|self - other| <= max_error`
    fn within(self, other: Self, max_error: Self) -> bool;
}

macro_rules! impl_table_value {
    ($wide:ty => $($t:ty),*) => {
        $(
            impl TableValue for $t {
                #[inline]
                fn floor_midpoint(self, other: Self) -> Self {
                    ((self as $wide + other as $wide) >> 1) as $t
                }

                #[inline]
                fn within(self, other: Self, max_error: Self) -> bool {
                    let diff = if self > other {
                        self as $wide - other as $wide
                    } else {
                        other as $wide - self as $wide
                    };
                    diff <= max_error as $wide
                }
            }
        )*
    };
}

impl_table_value!(u128 => u8, u16, u32, u64);
impl_table_value!(i128 => i8, i16, i32, i64);

/// Compressed approximation of `f` over `[0, max]` answered by
/// longest-prefix match
///
/// # Error bound
///
/// Each stored value is within `max_error` of `f` at both endpoints of its
/// block. Interior points are not checked, so for a function that is not
/// monotone inside a block the approximation can be looser than `max_error`.
///
/// # Example
///
/// ```
/// use ddosd::lookup::RangeLookupTable;
///
/// let table = RangeLookupTable::build(|x| x / 100, 1000, 0u32).unwrap();
///
/// assert_eq!(table.get(250).unwrap(), 2);
/// assert!(table.len() < 1001);
/// ```
#[derive(Clone, Debug)]
pub struct RangeLookupTable<T> {
    entries: BTreeMap<RangeKey, T>,
    max: u32,
}

impl<T: TableValue> RangeLookupTable<T> {
    /// Build the table greedily from 0 to `max`.
    ///
    /// At each frontier point the largest aligned block starting there whose
    /// endpoint values differ by at most `max_error` is stored under its
    /// midpoint value. When even a two-point block fails, the point is stored
    /// exactly under a full-length key.
    ///
    /// Blocks may extend past `max`; `f` is evaluated at their last point.
    pub fn build<F>(f: F, max: u32, max_error: T) -> Result<Self>
    where
        F: Fn(u32) -> T,
    {
        if max == u32::MAX {
            return Err(Error::InvalidDomain(max));
        }

        let mut entries = BTreeMap::new();
        let mut x: u64 = 0;

        while x <= max as u64 {
            let frontier = x as u32;
            let mut stored = false;

            for prefix_len in 1..32u8 {
                let key = RangeKey::covering(frontier, prefix_len);
                if key.base < frontier {
                    continue;
                }

                let last = key.last();
                let f_base = f(key.base);
                let f_last = f(last);
                if f_base.within(f_last, max_error) {
                    entries.insert(key, f_base.floor_midpoint(f_last));
                    x = last as u64 + 1;
                    stored = true;
                    break;
                }
            }

            if !stored {
                entries.insert(RangeKey::covering(frontier, 32), f(frontier));
                x += 1;
            }
        }

        debug!(entries = entries.len(), max, "range lookup table built");

        Ok(Self { entries, max })
    }

    /// Look up the approximation of `f(x)`.
    ///
    /// Fails with [`Error::NotFound`] when no stored block covers `x`, which
    /// only happens outside the built domain.
    pub fn get(&self, x: u32) -> Result<T> {
        (0..=32u8)
            .rev()
            .find_map(|prefix_len| self.entries.get(&RangeKey::covering(x, prefix_len)))
            .copied()
            .ok_or(Error::NotFound(x))
    }
}

impl<T> RangeLookupTable<T> {
    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upper bound of the built domain
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Stored blocks, ordered by base then prefix length
    pub fn entries(&self) -> impl Iterator<Item = (&RangeKey, &T)> {
        self.entries.iter()
    }

    /// Memory usage in bytes
    pub fn size_bytes(&self) -> usize {
        core::mem::size_of::<Self>()
            + self.entries.len() * (core::mem::size_of::<RangeKey>() + core::mem::size_of::<T>())
    }
}

/// One `base/prefix_len value` line per block
impl<T: fmt::Display> fmt::Display for RangeLookupTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.entries {
            writeln!(f, "{} {}", key, value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_mask() {
        assert_eq!(prefix_mask(0), 0);
        assert_eq!(prefix_mask(1), 0x8000_0000);
        assert_eq!(prefix_mask(24), 0xffff_ff00);
        assert_eq!(prefix_mask(32), u32::MAX);
    }

    #[test]
    fn test_range_key() {
        let key = RangeKey::covering(0x1234, 24);
        assert_eq!(key.base, 0x1200);
        assert_eq!(key.span(), 256);
        assert_eq!(key.last(), 0x12ff);
        assert!(key.contains(0x12ab));
        assert!(!key.contains(0x1300));

        let top = RangeKey::covering(u32::MAX, 1);
        assert_eq!(top.last(), u32::MAX);
        assert_eq!(RangeKey::covering(0, 0).span(), 1 << 32);
        assert_eq!(top.to_string(), "2147483648/1");
    }

    #[test]
    fn test_table_value() {
        assert_eq!(u32::MAX.floor_midpoint(u32::MAX), u32::MAX);
        assert_eq!(3u32.floor_midpoint(6), 4);
        // floor, not truncation toward zero
        assert_eq!((-3i32).floor_midpoint(0), -2);
        assert_eq!((-7i64).floor_midpoint(-2), -5);
        assert_eq!(i8::MIN.floor_midpoint(i8::MAX), -1);
        assert!(10u32.within(11, 1));
        assert!(!10u32.within(12, 1));
        assert!(i64::MIN.within(i64::MIN + 1, 1));
    }

    #[test]
    fn test_exact_identity() {
        let table = RangeLookupTable::build(|x| x, 100, 0u32).unwrap();

        // no two consecutive points share a value, so every point is a singleton
        assert_eq!(table.len(), 101);
        for x in 0..=100 {
            assert_eq!(table.get(x).unwrap(), x);
        }
        assert!(table.entries().all(|(key, _)| key.prefix_len == 32));
    }

    #[test]
    fn test_constant_collapses() {
        let table = RangeLookupTable::build(|_| 7u32, 1000, 0).unwrap();

        assert_eq!(table.len(), 1);
        let (key, value) = table.entries().next().unwrap();
        assert_eq!(*key, RangeKey { base: 0, prefix_len: 1 });
        assert_eq!(*value, 7);
        assert_eq!(table.get(999).unwrap(), 7);
    }

    #[test]
    fn test_step_function() {
        let table = RangeLookupTable::build(|x| x / 100, 1000, 0u32).unwrap();

        for x in 0..=1000 {
            assert_eq!(table.get(x).unwrap(), x / 100, "mismatch at {}", x);
        }
        assert!(table.len() < 100, "step function used {} entries", table.len());
    }

    #[test]
    fn test_blocks_tile_without_overlap() {
        let table = RangeLookupTable::build(|x| x / 7, 5000, 3u32).unwrap();

        let mut next = 0u64;
        for (key, _) in table.entries() {
            assert_eq!(key.base as u64, next, "gap or overlap before {}", key);
            next = key.last() as u64 + 1;
        }
        assert!(next > 5000);
    }

    #[test]
    fn test_endpoint_error_bound() {
        let f = |x: u32| (x as u64 * x as u64 / 1000) as u32;
        let table = RangeLookupTable::build(f, 2000, 4u32).unwrap();

        for (key, value) in table.entries() {
            assert!(f(key.base).within(*value, 4));
            assert!(f(key.last()).within(*value, 4));
        }
    }

    #[test]
    fn test_not_found_outside_domain() {
        let table = RangeLookupTable::build(|x| x, 3, 0u32).unwrap();

        assert_eq!(table.get(3).unwrap(), 3);
        let err = table.get(4).unwrap_err();
        assert_eq!(err, Error::NotFound(4));
        assert!(err.is_not_found());
    }

    #[test]
    fn test_invalid_domain() {
        assert_eq!(
            RangeLookupTable::build(|x| x, u32::MAX, 0u32).unwrap_err(),
            Error::InvalidDomain(u32::MAX)
        );
    }

    #[test]
    fn test_signed_values() {
        let table = RangeLookupTable::build(|x| 50 - x as i32, 100, 0i32).unwrap();
        assert_eq!(table.get(0).unwrap(), 50);
        assert_eq!(table.get(100).unwrap(), -50);
    }

    #[test]
    fn test_dump() {
        let table = RangeLookupTable::build(|x| x, 2, 0u32).unwrap();
        assert_eq!(table.to_string(), "0/32 0\n1/32 1\n2/32 2\n");
    }
}
