//! Entropy-series anomaly detection
//!
//! This module turns a per-window entropy series into alarm decisions.
//!
//! # Components
//!
//! - [`TrafficCharacterizer`]: fixed-point EWMA/EWMMD baseline (Q14)
//! - [`AlarmRule`]: sensitivity `k/8` and training period
//! - [`AnomalyDetector`]: applies the rule and withholds alarmed windows
//!   from the baseline
//!
//! # Example
//!
//! ```
//! use ddosd::anomaly::{AlarmRule, AnomalyDetector};
//!
//! // alpha = 0.125, k = 2.0, ten training windows
//! let mut detector = AnomalyDetector::new(32, AlarmRule::new(16, 10));
//!
//! for (src, dst) in [(150, 140), (152, 138), (149, 141)] {
//!     let verdict = detector.observe(src, dst);
//!     println!("window {} alarm={}", verdict.window, verdict.alarm);
//! }
//! ```

mod characterizer;
mod detector;

pub use characterizer::{Baseline, Phase, TrafficCharacterizer};
pub use detector::{AlarmRule, AnomalyDetector, Verdict};
