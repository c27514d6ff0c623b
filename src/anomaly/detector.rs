//! Alarm decisions around a traffic characterizer
//!
//! A window is anomalous when source entropy rises above its baseline by more
//! than `k/8` deviations, or destination entropy falls below its baseline by
//! more than `k/8` deviations. Alarmed windows are kept out of the baseline so
//! an ongoing attack cannot teach the detector that it is normal.

use super::characterizer::{Baseline, TrafficCharacterizer};
use crate::math::BASELINE_FRAC_BITS;
use tracing::{info, warn};

/// Threshold rule and training period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlarmRule {
    /// Sensitivity in eighths of a deviation
    pub k: u8,
    /// Windows absorbed unconditionally before alarms are raised
    pub training_windows: u32,
}

impl AlarmRule {
    pub fn new(k: u8, training_windows: u32) -> Self {
        Self { k, training_windows }
    }

    /// Upper bound for Q14 source entropy
    pub fn src_threshold(&self, baseline: Baseline) -> u64 {
        baseline.ewma as u64 + self.margin(baseline)
    }

    /// Lower bound for Q14 destination entropy
    pub fn dst_threshold(&self, baseline: Baseline) -> u64 {
        (baseline.ewma as u64).saturating_sub(self.margin(baseline))
    }

    fn margin(&self, baseline: Baseline) -> u64 {
        (self.k as u64 * baseline.ewmmd as u64) >> 3
    }

    /// Whether Q4 entropies breach the thresholds of the given baselines
    pub fn breached(&self, src: Baseline, dst: Baseline, src_entropy: u32, dst_entropy: u32) -> bool {
        let src_sample = (src_entropy as u64) << BASELINE_FRAC_BITS;
        let dst_sample = (dst_entropy as u64) << BASELINE_FRAC_BITS;
        src_sample > self.src_threshold(src) || dst_sample < self.dst_threshold(dst)
    }
}

/// Outcome of one observed window
///
/// Carries the window's Q4 entropies, the Q14 baselines after the window was
/// (or was not) absorbed, and the alarm flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Verdict {
    /// 1-based window number
    pub window: u64,
    pub src_entropy: u32,
    pub src: Baseline,
    pub dst_entropy: u32,
    pub dst: Baseline,
    pub alarm: bool,
}

/// Characterizer plus decision rule
///
/// # Example
///
/// ```
/// use ddosd::anomaly::{AlarmRule, AnomalyDetector};
///
/// let mut detector = AnomalyDetector::new(64, AlarmRule::new(16, 4));
///
/// for _ in 0..10 {
///     assert!(!detector.observe(150, 140).alarm);
/// }
///
/// // spoofed sources flood a single victim
/// let verdict = detector.observe(230, 20);
/// assert!(verdict.alarm);
/// assert_eq!(verdict.src.ewma, 150 << 14);
/// ```
#[derive(Clone, Debug)]
pub struct AnomalyDetector {
    characterizer: TrafficCharacterizer,
    rule: AlarmRule,
    windows: u64,
    alarms: u64,
}

impl AnomalyDetector {
    pub fn new(alpha: u8, rule: AlarmRule) -> Self {
        Self::with_characterizer(TrafficCharacterizer::new(alpha), rule)
    }

    pub fn with_characterizer(characterizer: TrafficCharacterizer, rule: AlarmRule) -> Self {
        Self {
            characterizer,
            rule,
            windows: 0,
            alarms: 0,
        }
    }

    /// Judge one window's Q4 entropies against the current baseline, then
    /// absorb them unless they raised an alarm.
    ///
    /// No alarm is raised during the training period or before the first
    /// window has been absorbed.
    pub fn observe(&mut self, src_entropy: u32, dst_entropy: u32) -> Verdict {
        let was_armed = self.is_armed();
        self.windows += 1;

        let armed = self.windows > self.rule.training_windows as u64
            && self.characterizer.is_trained();
        let alarm = armed
            && self.rule.breached(
                self.characterizer.src(),
                self.characterizer.dst(),
                src_entropy,
                dst_entropy,
            );

        if alarm {
            self.alarms += 1;
            warn!(
                window = self.windows,
                src_entropy,
                dst_entropy,
                src_ewma = self.characterizer.src().ewma,
                dst_ewma = self.characterizer.dst().ewma,
                "entropy anomaly"
            );
        } else {
            self.characterizer.update(src_entropy, dst_entropy);
        }

        if !was_armed && self.is_armed() {
            info!(windows = self.windows, "training period complete");
        }

        Verdict {
            window: self.windows,
            src_entropy,
            src: self.characterizer.src(),
            dst_entropy,
            dst: self.characterizer.dst(),
            alarm,
        }
    }

    pub fn characterizer(&self) -> &TrafficCharacterizer {
        &self.characterizer
    }

    pub fn rule(&self) -> AlarmRule {
        self.rule
    }

    /// Windows observed so far
    pub fn windows(&self) -> u64 {
        self.windows
    }

    /// Windows that raised an alarm
    pub fn alarms(&self) -> u64 {
        self.alarms
    }

    /// Whether the training period is over
    pub fn is_armed(&self) -> bool {
        self.windows >= self.rule.training_windows as u64 && self.characterizer.is_trained()
    }
}
