//! Math function wrappers for std/no_std compatibility
//!
//! Uses standard library math when available, falls back to libm for no_std.
//! Also holds the fixed-point scales shared by the estimator and the
//! characterizer.

/// Fractional bits of entropy values (Q4)
pub const ENTROPY_FRAC_BITS: u32 = 4;

/// Fractional bits of EWMA/EWMMD values (Q14)
pub const BASELINE_FRAC_BITS: u32 = 14;

#[cfg(feature = "std")]
#[inline]
pub fn log2(x: f64) -> f64 {
    x.log2()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn log2(x: f64) -> f64 {
    libm::log2(x)
}

/// Round half away from zero
#[cfg(feature = "std")]
#[inline]
pub fn round(x: f64) -> f64 {
    x.round()
}

#[cfg(not(feature = "std"))]
#[inline]
pub fn round(x: f64) -> f64 {
    libm::round(x)
}

/// Convert a Q4 entropy value to bits
#[inline]
pub fn q4_to_f64(value: u32) -> f64 {
    value as f64 / (1u32 << ENTROPY_FRAC_BITS) as f64
}

/// Convert a Q14 baseline value to bits
#[inline]
pub fn q14_to_f64(value: u32) -> f64 {
    value as f64 / (1u32 << BASELINE_FRAC_BITS) as f64
}
