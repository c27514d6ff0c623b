//! Frequency sketches
//!
//! This module provides the randomized frequency estimator that feeds the
//! entropy estimator.
//!
//! # Algorithms
//!
//! - [`CountSketch`]: signed count sketch with median readout and epoch reset
//!
//! # Example
//!
//! ```
//! use ddosd::sketch::{CountSketch, RowHash, SketchCoefficients};
//!
//! // explicit coefficients make the sketch fully reproducible
//! let coefficients = SketchCoefficients::new(
//!     vec![RowHash::new(3, 7), RowHash::new(11, 5), RowHash::new(13, 2)],
//!     vec![RowHash::new(17, 3), RowHash::new(19, 8), RowHash::new(23, 1)],
//! )
//! .unwrap();
//! let mut sketch = CountSketch::with_coefficients(256, coefficients).unwrap();
//!
//! let estimate = sketch.update(0xc0a8_0101);
//! println!("estimated count: {}", estimate);
//! ```

mod count_sketch;

pub use count_sketch::{CountSketch, RowHash, SketchCoefficients, LARGE_PRIME};
