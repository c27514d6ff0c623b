//! Precomputed function tables
//!
//! This module provides a range-compressed lookup table that stands in for
//! expensive scalar functions (logarithms, in practice) on the per-packet
//! path.
//!
//! # Example
//!
//! ```
//! use ddosd::lookup::RangeLookupTable;
//!
//! // integer square root, tolerating an error of 1
//! let table = RangeLookupTable::build(|x| (x as f64).sqrt() as u32, 10_000, 1u32).unwrap();
//!
//! let root = table.get(2500).unwrap();
//! assert!((49..=51).contains(&root));
//! println!("{} blocks cover [0, {}]", table.len(), table.max());
//! ```

mod lpm;

pub use lpm::{RangeKey, RangeLookupTable, TableValue};
