//! Construction parameters
//!
//! Plain parameter structs describing an estimator sweep and an anomaly
//! detector. With the `serde` feature they deserialize from the JSON layout
//! used by capture tooling:
//!
//! ```json
//! {
//!   "window_size": 1024,
//!   "baseline": true,
//!   "estimators": {
//!     "depth_levels": [3, 5],
//!     "width_levels": [256, 1024],
//!     "repetitions": 2
//!   }
//! }
//! ```
//!
//! Reading and parsing files is left to the caller.

use crate::error::{Error, Result};
use crate::sketch::{RowHash, SketchCoefficients};

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
extern crate alloc;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[cfg(feature = "anomaly")]
use crate::anomaly::{AlarmRule, AnomalyDetector};
#[cfg(feature = "exact")]
use crate::entropy::EntropyEstimator;
#[cfg(feature = "exact")]
use crate::window::EntropyPipeline;
#[cfg(feature = "exact")]
use rand::Rng;

/// Parallel multiplier (`a`) and offset (`b`) arrays of one hash family
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefficientArrays {
    pub a: Vec<u32>,
    pub b: Vec<u32>,
}

impl CoefficientArrays {
    fn rows(&self, family: &'static str) -> Result<Vec<RowHash>> {
        if self.a.len() != self.b.len() {
            return Err(Error::CoefficientCount {
                family,
                expected: self.a.len(),
                found: self.b.len(),
            });
        }
        Ok(self
            .a
            .iter()
            .zip(&self.b)
            .map(|(&multiplier, &offset)| RowHash::new(multiplier, offset))
            .collect())
    }
}

/// Explicit coefficients for the bucket (`h`) and sign (`g`) families
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoefficientSet {
    pub h: CoefficientArrays,
    pub g: CoefficientArrays,
}

impl CoefficientSet {
    pub fn to_coefficients(&self) -> Result<SketchCoefficients> {
        SketchCoefficients::new(self.h.rows("bucket")?, self.g.rows("sign")?)
    }
}

impl From<&SketchCoefficients> for CoefficientSet {
    fn from(coefficients: &SketchCoefficients) -> Self {
        let arrays = |rows: &[RowHash]| CoefficientArrays {
            a: rows.iter().map(|row| row.multiplier).collect(),
            b: rows.iter().map(|row| row.offset).collect(),
        };
        Self {
            h: arrays(coefficients.bucket()),
            g: arrays(coefficients.sign()),
        }
    }
}

/// Grid of estimator configurations
///
/// Estimators are instantiated depth-major, then width, then repetition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SweepConfig {
    pub depth_levels: Vec<u32>,
    pub width_levels: Vec<u32>,
    pub repetitions: u32,
    /// One set per depth level; random coefficients when absent
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub coefficients: Option<Vec<CoefficientSet>>,
}

impl SweepConfig {
    /// Number of estimators the sweep produces
    pub fn len(&self) -> usize {
        self.depth_levels.len() * self.width_levels.len() * self.repetitions as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Explicit coefficients per depth level, checked against the depths
    pub fn resolved_coefficients(&self) -> Result<Option<Vec<SketchCoefficients>>> {
        let Some(sets) = &self.coefficients else {
            return Ok(None);
        };
        if sets.len() != self.depth_levels.len() {
            return Err(Error::CoefficientSetCount {
                depths: self.depth_levels.len(),
                sets: sets.len(),
            });
        }

        sets.iter()
            .zip(&self.depth_levels)
            .map(|(set, &depth)| {
                let coefficients = set.to_coefficients()?;
                if coefficients.depth() != depth as usize {
                    return Err(Error::CoefficientCount {
                        family: "bucket",
                        expected: depth as usize,
                        found: coefficients.depth(),
                    });
                }
                Ok(coefficients)
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }
}

/// Window, exact baseline and estimator sweep
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BankConfig {
    pub window_size: u32,
    /// Attach an exact baseline calculator
    #[cfg_attr(feature = "serde", serde(default))]
    pub baseline: bool,
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub estimators: Option<SweepConfig>,
}

#[cfg(feature = "exact")]
impl BankConfig {
    /// Build the pipeline, drawing random coefficients from the thread-local RNG
    pub fn build(&self) -> Result<EntropyPipeline> {
        self.build_with_rng(&mut rand::thread_rng())
    }

    /// Build the pipeline, drawing random coefficients from `rng`
    pub fn build_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<EntropyPipeline> {
        let mut pipeline = EntropyPipeline::new(self.window_size)?;
        if self.baseline {
            pipeline = pipeline.with_baseline();
        }

        let Some(sweep) = &self.estimators else {
            return Ok(pipeline);
        };
        let explicit = sweep.resolved_coefficients()?;

        for (index, &depth) in sweep.depth_levels.iter().enumerate() {
            for &width in &sweep.width_levels {
                for _ in 0..sweep.repetitions {
                    let estimator = match &explicit {
                        Some(sets) => EntropyEstimator::with_coefficients(
                            self.window_size,
                            width as usize,
                            sets[index].clone(),
                        )?,
                        None => EntropyEstimator::with_rng(
                            self.window_size,
                            depth as usize,
                            width as usize,
                            rng,
                        )?,
                    };
                    pipeline.add_estimator(estimator)?;
                }
            }
        }

        Ok(pipeline)
    }
}

/// Anomaly detector parameters in their real-valued form
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    /// Windows absorbed before alarms are raised
    pub training_length: u32,
    /// EWMA weight of the newest window, in `[0, 1)`
    pub smoothing_coefficient: f64,
    /// Threshold width in deviations, in `[0, 32)`
    pub sensitivity_coefficient: f64,
}

impl DetectorConfig {
    /// Smoothing coefficient in 1/256 units
    pub fn alpha(&self) -> Result<u8> {
        to_fixed("smoothing", self.smoothing_coefficient, 256.0)
    }

    /// Sensitivity coefficient in 1/8 units
    pub fn k(&self) -> Result<u8> {
        to_fixed("sensitivity", self.sensitivity_coefficient, 8.0)
    }

    #[cfg(feature = "anomaly")]
    pub fn rule(&self) -> Result<AlarmRule> {
        Ok(AlarmRule::new(self.k()?, self.training_length))
    }

    #[cfg(feature = "anomaly")]
    pub fn detector(&self) -> Result<AnomalyDetector> {
        Ok(AnomalyDetector::new(self.alpha()?, self.rule()?))
    }
}

fn to_fixed(name: &'static str, value: f64, scale: f64) -> Result<u8> {
    let scaled = crate::math::round(value * scale);
    if !(0.0..=u8::MAX as f64).contains(&scaled) {
        return Err(Error::InvalidCoefficient { name, value });
    }
    Ok(scaled as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explicit_set(depth: u32) -> CoefficientSet {
        CoefficientSet {
            h: CoefficientArrays {
                a: (1..=depth).map(|i| i * 7919).collect(),
                b: (1..=depth).collect(),
            },
            g: CoefficientArrays {
                a: (1..=depth).map(|i| i * 104_729).collect(),
                b: (1..=depth).map(|i| i + 3).collect(),
            },
        }
    }

    #[test]
    fn test_detector_config_fixed_point() {
        let config = DetectorConfig {
            training_length: 10,
            smoothing_coefficient: 0.125,
            sensitivity_coefficient: 1.5,
        };
        assert_eq!(config.alpha().unwrap(), 32);
        assert_eq!(config.k().unwrap(), 12);
    }

    #[test]
    fn test_detector_config_out_of_range() {
        let config = DetectorConfig {
            training_length: 0,
            smoothing_coefficient: 1.0,
            sensitivity_coefficient: -1.0,
        };
        assert_eq!(
            config.alpha().unwrap_err(),
            Error::InvalidCoefficient {
                name: "smoothing",
                value: 1.0
            }
        );
        assert!(config.k().is_err());

        let nan = DetectorConfig {
            smoothing_coefficient: f64::NAN,
            ..config
        };
        assert!(nan.alpha().is_err());
    }

    #[cfg(feature = "anomaly")]
    #[test]
    fn test_detector_from_config() {
        let config = DetectorConfig {
            training_length: 7,
            smoothing_coefficient: 0.25,
            sensitivity_coefficient: 3.0,
        };
        let detector = config.detector().unwrap();
        assert_eq!(detector.characterizer().alpha(), 64);
        assert_eq!(detector.rule(), AlarmRule::new(24, 7));
    }

    #[test]
    fn test_coefficient_set_round_trip() {
        let set = explicit_set(3);
        let coefficients = set.to_coefficients().unwrap();

        assert_eq!(coefficients.depth(), 3);
        assert_eq!(coefficients.bucket()[1], RowHash::new(15_838, 2));
        assert_eq!(CoefficientSet::from(&coefficients), set);
    }

    #[test]
    fn test_ragged_arrays() {
        let mut set = explicit_set(3);
        set.g.b.pop();
        assert_eq!(
            set.to_coefficients().unwrap_err(),
            Error::CoefficientCount {
                family: "sign",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_sweep_coefficient_checks() {
        let mut sweep = SweepConfig {
            depth_levels: vec![3, 5],
            width_levels: vec![64],
            repetitions: 1,
            coefficients: Some(vec![explicit_set(3)]),
        };
        assert_eq!(
            sweep.resolved_coefficients().unwrap_err(),
            Error::CoefficientSetCount { depths: 2, sets: 1 }
        );

        sweep.coefficients = Some(vec![explicit_set(3), explicit_set(4)]);
        assert!(sweep.resolved_coefficients().is_err());

        sweep.coefficients = Some(vec![explicit_set(3), explicit_set(5)]);
        assert_eq!(sweep.resolved_coefficients().unwrap().unwrap().len(), 2);
    }

    #[cfg(feature = "exact")]
    #[test]
    fn test_build_sweep_order() {
        use rand::SeedableRng;

        let config = BankConfig {
            window_size: 256,
            baseline: true,
            estimators: Some(SweepConfig {
                depth_levels: vec![3, 5],
                width_levels: vec![128, 512],
                repetitions: 2,
                coefficients: None,
            }),
        };

        let mut rng = rand_chacha::ChaCha8Rng::seed_from_u64(4);
        let pipeline = config.build_with_rng(&mut rng).unwrap();

        assert!(pipeline.baseline().is_some());
        let shape: Vec<(usize, usize)> = pipeline
            .estimators()
            .iter()
            .map(|e| (e.depth(), e.width()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (3, 128),
                (3, 128),
                (3, 512),
                (3, 512),
                (5, 128),
                (5, 128),
                (5, 512),
                (5, 512)
            ]
        );
    }

    #[cfg(feature = "exact")]
    #[test]
    fn test_build_rejects_bad_window() {
        let config = BankConfig {
            window_size: 1000,
            ..Default::default()
        };
        assert_eq!(
            config.build().unwrap_err(),
            Error::WindowNotPowerOfTwo(1000)
        );
    }
}
