//! Fixed-point EWMA/EWMMD traffic baseline
//!
//! Tracks an exponentially weighted moving average of each entropy series
//! and an exponentially weighted moving mean absolute deviation around it.
//! All state is Q14 and every step is integer shifts and multiplies, so
//! results are reproducible bit for bit.

use crate::math::BASELINE_FRAC_BITS;

/// Q14 mean and mean absolute deviation of one entropy series
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Baseline {
    pub ewma: u32,
    pub ewmmd: u32,
}

impl Baseline {
    fn seed(entropy: u32) -> Self {
        Self {
            ewma: entropy << BASELINE_FRAC_BITS,
            ewmmd: 0,
        }
    }

    /// One smoothing step with weight `alpha / 256` on the new sample.
    ///
    /// `entropy` is Q4; `(alpha·entropy) << 6` is the Q14 weighted sample.
    fn step(&mut self, alpha: u8, entropy: u32) {
        let alpha = alpha as u32;
        let keep = 256 - alpha;
        let sample = entropy << BASELINE_FRAC_BITS;

        self.ewma = (alpha.wrapping_mul(entropy) << 6)
            .wrapping_add(keep.wrapping_mul(self.ewma) >> 8);

        let diff = self.ewma.abs_diff(sample);
        self.ewmmd = (alpha.wrapping_mul(diff) >> 8)
            .wrapping_add(keep.wrapping_mul(self.ewmmd) >> 8);
    }
}

/// Lifecycle of a characterizer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No observation yet
    Untrained,
    /// At least one observation absorbed
    Trained,
}

/// Online baseline of source and destination entropy
///
/// The first [`update`](TrafficCharacterizer::update) seeds both averages
/// with the observed values and zero deviation; later updates smooth with
/// weight `alpha / 256`.
///
/// # Example
///
/// ```
/// use ddosd::anomaly::TrafficCharacterizer;
///
/// let mut characterizer = TrafficCharacterizer::new(32);
///
/// characterizer.update(120, 90);
/// assert_eq!(characterizer.src().ewma, 120 << 14);
/// assert_eq!(characterizer.src().ewmmd, 0);
///
/// characterizer.update(136, 90);
/// assert!(characterizer.src().ewma > 120 << 14);
/// assert!(characterizer.src().ewmmd > 0);
/// ```
#[derive(Clone, Debug)]
pub struct TrafficCharacterizer {
    alpha: u8,
    phase: Phase,
    src: Baseline,
    dst: Baseline,
}

impl TrafficCharacterizer {
    /// Create an untrained characterizer with smoothing `alpha / 256`
    pub fn new(alpha: u8) -> Self {
        Self {
            alpha,
            phase: Phase::Untrained,
            src: Baseline::default(),
            dst: Baseline::default(),
        }
    }

    /// Absorb one window's Q4 entropies
    pub fn update(&mut self, src_entropy: u32, dst_entropy: u32) {
        match self.phase {
            Phase::Untrained => {
                self.src = Baseline::seed(src_entropy);
                self.dst = Baseline::seed(dst_entropy);
                self.phase = Phase::Trained;
            }
            Phase::Trained => {
                self.src.step(self.alpha, src_entropy);
                self.dst.step(self.alpha, dst_entropy);
            }
        }
    }

    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_trained(&self) -> bool {
        self.phase == Phase::Trained
    }

    /// Source entropy baseline (Q14)
    pub fn src(&self) -> Baseline {
        self.src
    }

    /// Destination entropy baseline (Q14)
    pub fn dst(&self) -> Baseline {
        self.dst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_update_seeds_baseline() {
        for alpha in [0u8, 1, 64, 128, 255] {
            let mut characterizer = TrafficCharacterizer::new(alpha);
            assert_eq!(characterizer.phase(), Phase::Untrained);

            characterizer.update(137, 42);

            assert!(characterizer.is_trained());
            assert_eq!(characterizer.src(), Baseline { ewma: 137 << 14, ewmmd: 0 });
            assert_eq!(characterizer.dst(), Baseline { ewma: 42 << 14, ewmmd: 0 });
        }
    }

    #[test]
    fn test_half_life_step_values() {
        let mut characterizer = TrafficCharacterizer::new(128);
        characterizer.update(100, 50);

        let expected = [
            (2_457_600, 409_600),
            (2_867_200, 409_600),
            (3_072_000, 307_200),
            (3_174_400, 204_800),
            (3_225_600, 128_000),
        ];
        for (ewma, ewmmd) in expected {
            characterizer.update(200, 50);
            assert_eq!(characterizer.src(), Baseline { ewma, ewmmd });
            assert_eq!(characterizer.dst(), Baseline { ewma: 50 << 14, ewmmd: 0 });
        }
    }

    #[test]
    fn test_half_life_converges() {
        let mut characterizer = TrafficCharacterizer::new(128);
        characterizer.update(100, 50);
        for _ in 0..40 {
            characterizer.update(200, 50);
        }

        // floor division leaves the mean one unit short of 200 << 14
        assert_eq!(characterizer.src().ewma, (200 << 14) - 1);
        assert_eq!(characterizer.src().ewmmd, 0);
    }

    #[test]
    fn test_steady_input_is_fixed_point() {
        let mut characterizer = TrafficCharacterizer::new(128);
        for _ in 0..10 {
            characterizer.update(311, 17);
        }
        assert_eq!(characterizer.src(), Baseline { ewma: 311 << 14, ewmmd: 0 });
        assert_eq!(characterizer.dst(), Baseline { ewma: 17 << 14, ewmmd: 0 });
    }

    #[test]
    fn test_zero_alpha_freezes_baseline() {
        let mut characterizer = TrafficCharacterizer::new(0);
        characterizer.update(100, 100);
        characterizer.update(400, 10);

        assert_eq!(characterizer.src(), Baseline { ewma: 100 << 14, ewmmd: 0 });
        assert_eq!(characterizer.dst(), Baseline { ewma: 100 << 14, ewmmd: 0 });
    }
}
