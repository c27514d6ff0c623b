//! Error types for ddosd.

use thiserror::Error;

/// Errors raised by sketch, table and detector construction, and by
/// lookup misses on the estimator path.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Sketch depth or width is zero
    #[error("sketch dimensions must be positive: depth {depth}, width {width}")]
    InvalidDimensions { depth: usize, width: usize },

    /// Explicit hash coefficients do not provide one row per sketch row
    #[error("{family} hash family: expected {expected} coefficient rows, found {found}")]
    CoefficientCount {
        family: &'static str,
        expected: usize,
        found: usize,
    },

    /// Window size is zero or not a power of two
    #[error("window size {0} is not a power of two")]
    WindowNotPowerOfTwo(u32),

    /// Estimator window does not match the pipeline window
    #[error("estimator window {found} does not match pipeline window {expected}")]
    WindowMismatch { expected: u32, found: u32 },

    /// Lookup table domain bound cannot be covered
    #[error("lookup table domain bound {0} is out of range")]
    InvalidDomain(u32),

    /// No lookup table entry covers the queried point
    #[error("no lookup table entry covers {0}")]
    NotFound(u32),

    /// Smoothing or sensitivity coefficient does not fit its fixed-point encoding
    #[error("{name} coefficient {value} does not fit its fixed-point encoding")]
    InvalidCoefficient { name: &'static str, value: f64 },

    /// Sampling probability outside (0, 1]
    #[error("sampling probability must be in (0, 1], got {0}")]
    InvalidSamplingProbability(f64),

    /// Sweep configuration coefficient sets do not line up with depth levels
    #[error("{depths} depth levels configured but {sets} coefficient sets supplied")]
    CoefficientSetCount { depths: usize, sets: usize },
}

impl Error {
    /// Whether this is a lookup miss.
    ///
    /// A miss means the queried value lies outside the table's built domain.
    /// The table is immutable, so retrying the same query cannot succeed.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

/// Result type alias for ddosd operations.
pub type Result<T> = core::result::Result<T, Error>;
