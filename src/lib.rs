//! # ddosd
//!
//! Entropy-based detection of volumetric DDoS attacks.
//!
//! A flood from many spoofed sources against one victim widens the source
//! address distribution and narrows the destination distribution. ddosd
//! tracks the Shannon entropy of both over fixed-size packet windows and
//! raises an alarm when either moves too far from its learned baseline.
//!
//! ## Features
//!
//! - **Count Sketch**: signed frequency sketch with epoch-based O(1) reset
//! - **Range Lookup Table**: longest-prefix-match table approximating a
//!   function within a bounded error
//! - **Entropy Estimation**: constant-memory Q4 entropy per window, plus an
//!   exact histogram calculator for ground truth
//! - **Anomaly Detection**: integer EWMA/EWMMD baselines with a `k`-deviation
//!   alarm rule
//! - **Windowing**: pipelines that close windows, report and reset
//!
//! ## Quick Start
//!
//! ```rust
//! use ddosd::prelude::*;
//!
//! let estimator = EntropyEstimator::with_seed(256, 4, 1024, 7).unwrap();
//! let anomaly = AnomalyDetector::new(32, AlarmRule::new(24, 8));
//! let mut detector = Detector::new(estimator, anomaly);
//!
//! for i in 0..256u32 * 20 {
//!     // legitimate traffic: a few hundred hosts talking to a few servers
//!     let src = 0x0a00_0000 | (i.wrapping_mul(2_654_435_761) % 300);
//!     let dst = 0xc0a8_0000 | (i % 16);
//!     if let Some(verdict) = detector.push(src, dst).unwrap() {
//!         println!("window {}: src={} dst={} alarm={}",
//!             verdict.window, verdict.src_entropy, verdict.dst_entropy, verdict.alarm);
//!     }
//! }
//! ```
//!
//! ## Fixed-Point Formats
//!
//! Entropies are Q4 (`bits * 16`) and baselines are Q14 (`bits * 16384`).
//! Use [`math::q4_to_f64`] and [`math::q14_to_f64`] to convert.
//!
//! ## Feature Flags
//!
//! - `std` (default): standard library support, thread-local RNG constructors
//! - `exact` (default): exact entropy calculator and windowing pipelines
//! - `anomaly` (default): characterizer and alarm rule
//! - `serde`: serialization of reports, verdicts and configuration
//! - `full`: everything

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod error;
pub mod math;
pub mod traits;

pub mod config;
pub mod entropy;
pub mod lookup;
pub mod sketch;

#[cfg(feature = "anomaly")]
#[cfg_attr(docsrs, doc(cfg(feature = "anomaly")))]
pub mod anomaly;

#[cfg(feature = "exact")]
#[cfg_attr(docsrs, doc(cfg(feature = "exact")))]
pub mod window;

#[cfg(all(test, feature = "std"))]
mod testing;

pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::traits::*;

    pub use crate::config::{BankConfig, DetectorConfig, SweepConfig};
    pub use crate::entropy::EntropyEstimator;
    pub use crate::lookup::RangeLookupTable;
    pub use crate::sketch::{CountSketch, SketchCoefficients};

    #[cfg(feature = "exact")]
    pub use crate::entropy::ExactEntropy;
    #[cfg(feature = "exact")]
    pub use crate::window::{EntropyPipeline, Packet, WindowReport};

    #[cfg(feature = "anomaly")]
    pub use crate::anomaly::{AlarmRule, AnomalyDetector, TrafficCharacterizer, Verdict};

    #[cfg(all(feature = "exact", feature = "anomaly"))]
    pub use crate::window::Detector;
}

pub use entropy::EntropyEstimator;
pub use error::{Error, Result};
pub use sketch::CountSketch;

#[cfg(feature = "anomaly")]
pub use anomaly::AnomalyDetector;
