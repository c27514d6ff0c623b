//! Fixed-size packet windows
//!
//! Drives entropy calculators over a packet stream: every `window_size`
//! accounted packets the window closes, its entropies are reported and every
//! member is reset. The capture layer supplies already-parsed
//! [`Packet`]s; nothing here knows about wire formats.

use crate::entropy::{EntropyEstimator, ExactEntropy};
use crate::error::{Error, Result};
use crate::traits::{EntropyPair, WindowEntropy};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{trace, warn};

#[cfg(feature = "anomaly")]
use crate::anomaly::{AnomalyDetector, Verdict};

/// One parsed packet
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Packet {
    pub src: u32,
    pub dst: u32,
    /// Capture time in microseconds
    pub timestamp_us: u64,
}

impl Packet {
    pub fn new(src: u32, dst: u32, timestamp_us: u64) -> Self {
        Self {
            src,
            dst,
            timestamp_us,
        }
    }
}

/// Entropies of one closed window
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowReport {
    /// 0-based window number
    pub index: u64,
    /// Timestamp of the last packet in the window
    pub timestamp_us: u64,
    /// Packets accounted in the window
    pub packets: u32,
    /// Exact entropies in bits, if a baseline is attached
    pub baseline: Option<EntropyPair<f64>>,
    /// Q4 estimates, one per estimator in insertion order
    pub estimates: Vec<EntropyPair<u32>>,
}

/// Bernoulli packet sampler
#[derive(Clone, Debug)]
struct Sampler {
    probability: f64,
    rng: ChaCha8Rng,
}

/// Exact baseline plus a bank of estimators sharing one window
///
/// Windows close once `window_size` packets have been accounted. With
/// sampling enabled only sampled packets are accounted.
///
/// # Example
///
/// ```
/// use ddosd::entropy::EntropyEstimator;
/// use ddosd::window::{EntropyPipeline, Packet};
///
/// let mut pipeline = EntropyPipeline::new(4)
///     .unwrap()
///     .with_baseline()
///     .with_estimator(EntropyEstimator::with_seed(4, 3, 64, 1).unwrap())
///     .unwrap();
///
/// let mut reports = Vec::new();
/// for (i, src) in [1, 2, 3, 4, 5, 5, 5, 5].into_iter().enumerate() {
///     if let Some(report) = pipeline.push(Packet::new(src, 9, i as u64)).unwrap() {
///         reports.push(report);
///     }
/// }
///
/// assert_eq!(reports.len(), 2);
/// assert_eq!(reports[0].baseline.unwrap().src, 2.0);
/// assert_eq!(reports[1].baseline.unwrap().src, 0.0);
/// ```
#[derive(Debug)]
pub struct EntropyPipeline {
    window_size: u32,
    baseline: Option<ExactEntropy>,
    estimators: Vec<EntropyEstimator>,
    sampler: Option<Sampler>,
    /// Packets accounted in the open window
    packets: u32,
    windows: u64,
    last_timestamp_us: u64,
}

impl EntropyPipeline {
    /// Create an empty pipeline; `window_size` must be a power of two
    pub fn new(window_size: u32) -> Result<Self> {
        if !window_size.is_power_of_two() {
            return Err(Error::WindowNotPowerOfTwo(window_size));
        }
        Ok(Self {
            window_size,
            baseline: None,
            estimators: Vec::new(),
            sampler: None,
            packets: 0,
            windows: 0,
            last_timestamp_us: 0,
        })
    }

    /// Attach an exact baseline calculator
    pub fn with_baseline(mut self) -> Self {
        self.baseline = Some(ExactEntropy::new());
        self
    }

    /// Append an estimator with the same window size
    pub fn with_estimator(mut self, estimator: EntropyEstimator) -> Result<Self> {
        self.add_estimator(estimator)?;
        Ok(self)
    }

    /// Account each packet with probability `probability`, drawing from a
    /// ChaCha8 stream seeded with `seed`
    pub fn with_sampling(mut self, probability: f64, seed: u64) -> Result<Self> {
        if !(probability > 0.0 && probability <= 1.0) {
            return Err(Error::InvalidSamplingProbability(probability));
        }
        self.sampler = Some(Sampler {
            probability,
            rng: ChaCha8Rng::seed_from_u64(seed),
        });
        Ok(self)
    }

    /// Append an estimator with the same window size
    pub fn add_estimator(&mut self, estimator: EntropyEstimator) -> Result<()> {
        if estimator.window_size() != self.window_size {
            return Err(Error::WindowMismatch {
                expected: self.window_size,
                found: estimator.window_size(),
            });
        }
        self.estimators.push(estimator);
        Ok(())
    }

    /// Account one packet, returning the report of the window it completes.
    ///
    /// An estimator failure aborts the open window: every member is reset
    /// and the error is returned.
    pub fn push(&mut self, packet: Packet) -> Result<Option<WindowReport>> {
        if let Some(sampler) = &mut self.sampler {
            if !sampler.rng.gen_bool(sampler.probability) {
                return Ok(None);
            }
        }

        if let Err(err) = self.account(&packet) {
            warn!(window = self.windows, %err, "window aborted");
            self.reset_members();
            return Err(err);
        }

        self.packets += 1;
        self.last_timestamp_us = packet.timestamp_us;

        if self.packets == self.window_size {
            return Ok(Some(self.close()));
        }
        Ok(None)
    }

    fn account(&mut self, packet: &Packet) -> Result<()> {
        if let Some(baseline) = &mut self.baseline {
            baseline.update(packet.src, packet.dst);
        }
        for estimator in &mut self.estimators {
            estimator.update(packet.src, packet.dst)?;
        }
        Ok(())
    }

    /// Close a trailing partial window, if any.
    ///
    /// Estimates of a partial window are biased low: the readout still
    /// divides by the full window size.
    pub fn finish(&mut self) -> Option<WindowReport> {
        if self.packets == 0 {
            return None;
        }
        Some(self.close())
    }

    fn close(&mut self) -> WindowReport {
        let report = WindowReport {
            index: self.windows,
            timestamp_us: self.last_timestamp_us,
            packets: self.packets,
            baseline: self.baseline.as_ref().map(WindowEntropy::entropy),
            estimates: self.estimators.iter().map(WindowEntropy::entropy).collect(),
        };

        trace!(
            window = report.index,
            packets = report.packets,
            baseline = ?report.baseline,
            estimates = ?report.estimates,
            "window closed"
        );

        self.windows += 1;
        self.reset_members();
        report
    }

    fn reset_members(&mut self) {
        self.packets = 0;
        if let Some(baseline) = &mut self.baseline {
            baseline.reset();
        }
        for estimator in &mut self.estimators {
            estimator.reset();
        }
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Windows closed so far
    pub fn windows(&self) -> u64 {
        self.windows
    }

    /// Packets accounted in the open window
    pub fn pending(&self) -> u32 {
        self.packets
    }

    pub fn baseline(&self) -> Option<&ExactEntropy> {
        self.baseline.as_ref()
    }

    pub fn estimators(&self) -> &[EntropyEstimator] {
        &self.estimators
    }
}

/// Single estimator feeding an anomaly detector
///
/// # Example
///
/// ```
/// use ddosd::anomaly::{AlarmRule, AnomalyDetector};
/// use ddosd::entropy::EntropyEstimator;
/// use ddosd::window::Detector;
///
/// let estimator = EntropyEstimator::with_seed(256, 5, 2048, 3).unwrap();
/// let mut detector = Detector::new(estimator, AnomalyDetector::new(32, AlarmRule::new(24, 2)));
///
/// for i in 0..1024u32 {
///     if let Some(verdict) = detector.push(i % 64, i % 16).unwrap() {
///         assert!(!verdict.alarm);
///     }
/// }
/// assert_eq!(detector.anomaly().windows(), 4);
/// ```
#[cfg(feature = "anomaly")]
#[cfg_attr(docsrs, doc(cfg(feature = "anomaly")))]
#[derive(Debug)]
pub struct Detector {
    estimator: EntropyEstimator,
    anomaly: AnomalyDetector,
}

#[cfg(feature = "anomaly")]
impl Detector {
    pub fn new(estimator: EntropyEstimator, anomaly: AnomalyDetector) -> Self {
        Self { estimator, anomaly }
    }

    /// Account one packet; at each window boundary judge the window and
    /// start the next one.
    ///
    /// An estimator failure resets the window and is returned.
    pub fn push(&mut self, src: u32, dst: u32) -> Result<Option<Verdict>> {
        if let Err(err) = self.estimator.update(src, dst) {
            warn!(window = self.anomaly.windows() + 1, %err, "window aborted");
            self.estimator.reset();
            return Err(err);
        }

        if self.estimator.packets() < self.estimator.window_size() as u64 {
            return Ok(None);
        }
        Ok(Some(self.close()))
    }

    /// Judge a trailing partial window, if any.
    ///
    /// Entropies of a partial window are biased low: the readout still
    /// divides by the full window size.
    pub fn finish(&mut self) -> Option<Verdict> {
        if self.estimator.packets() == 0 {
            return None;
        }
        Some(self.close())
    }

    fn close(&mut self) -> Verdict {
        let packets = self.estimator.packets();
        let verdict = self
            .anomaly
            .observe(self.estimator.src_entropy(), self.estimator.dst_entropy());

        trace!(
            window = verdict.window,
            packets,
            src_entropy = verdict.src_entropy,
            dst_entropy = verdict.dst_entropy,
            alarm = verdict.alarm,
            "window closed"
        );

        self.estimator.reset();
        verdict
    }

    pub fn estimator(&self) -> &EntropyEstimator {
        &self.estimator
    }

    pub fn anomaly(&self) -> &AnomalyDetector {
        &self.anomaly
    }
}
