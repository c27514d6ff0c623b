//! Windowed entropy of address distributions
//!
//! # Algorithms
//!
//! - [`EntropyEstimator`]: constant-memory Q4 estimate from two count sketches
//!   and a lookup table of the telescoping entropy term
//! - [`ExactEntropy`]: floating-point ground truth from full histograms
//!   (requires the `exact` feature)
//!
//! # Example
//!
//! ```
//! use ddosd::entropy::{EntropyEstimator, ExactEntropy};
//!
//! let mut estimator = EntropyEstimator::with_seed(64, 5, 1024, 1).unwrap();
//! let mut exact = ExactEntropy::new();
//!
//! for i in 0..64u32 {
//!     estimator.update(i % 8, 1).unwrap();
//!     exact.update(i % 8, 1);
//! }
//!
//! // Q4 estimate against bits
//! let approx = estimator.src_entropy() as f64 / 16.0;
//! assert!((approx - exact.src_entropy()).abs() < 0.5);
//! ```

mod estimator;
#[cfg(feature = "exact")]
mod exact;

pub use estimator::{entropy_term, entropy_term_with_precision, EntropyEstimator};
#[cfg(feature = "exact")]
#[cfg_attr(docsrs, doc(cfg(feature = "exact")))]
pub use exact::ExactEntropy;
