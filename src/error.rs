//! Error types for orbital mechanics operations.

use crate::frames::Frame;

/// Errors that can occur during orbital mechanics operations.
///
/// Recoverable mathematical failures surface through this enum; iteration
/// caps are only errors when the residual tolerance was not met. An
/// interpolator queried outside its window returns `None` rather than an
/// error, by contract.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Classical elements were requested from a non-inertial frame.
    #[error("classical elements require an inertial frame, got {0}")]
    FrameNotInertial(Frame),

    /// A matrix factorization or inversion encountered a zero pivot.
    #[error("singular matrix in {operation}")]
    SingularMatrix {
        /// The operation that failed (e.g. "inverse", "cholesky").
        operation: &'static str,
    },

    /// Vector or matrix shapes do not agree.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The required dimension.
        expected: usize,
        /// The dimension supplied.
        actual: usize,
    },

    /// Gibbs initial orbit determination received positions spanning more
    /// than the coplanarity limit.
    #[error("positions deviate {deviation_deg:.3}° from coplanar (limit {limit_deg}°)")]
    NotCoplanar {
        /// Observed deviation from the common plane, degrees.
        deviation_deg: f64,
        /// The configured limit, degrees.
        limit_deg: f64,
    },

    /// Lambert or Gooding iteration exhausted its budget without reaching
    /// tolerance.
    #[error("no convergence after {iterations} iterations")]
    LambertNoConvergence {
        /// Iterations performed before giving up.
        iterations: usize,
    },

    /// The analytic TLE propagator reported a failure.
    #[error("propagator failure: {0}")]
    PropagatorFailure(#[from] Sgp4Error),

    /// An adaptive integrator rejected a single step too many times.
    #[error("step rejected {rejections} consecutive times")]
    StepRejectionLimit {
        /// Consecutive rejections before giving up.
        rejections: usize,
    },

    /// A two-line element set could not be parsed.
    #[error("invalid TLE line {line}: {reason}")]
    InvalidTle {
        /// Which line of the element set (1 or 2).
        line: u8,
        /// What was wrong with it.
        reason: String,
    },
}

/// Result type for orbital mechanics operations.
pub type Result<T> = std::result::Result<T, Error>;

/// SGP4 failure modes, numbered as in the Vallado 2006 reference code.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sgp4Error {
    /// Mean elements invalid: `e ≥ 1`, `e < −0.001`, or `a < 0.95` Earth
    /// radii.
    #[error("mean elements out of range")]
    MeanElementsBad,

    /// Mean motion is not positive.
    #[error("mean motion not positive")]
    MeanMotionNonPositive,

    /// Perturbed eccentricity left `[0, 1]`.
    #[error("perturbed elements out of range")]
    PertElementsBad,

    /// Semi-latus rectum went negative.
    #[error("semi-latus rectum negative")]
    NegativeSemiLatus,

    /// Epoch elements are sub-orbital.
    #[error("epoch elements are sub-orbital")]
    SubOrbital,

    /// The satellite has decayed.
    #[error("satellite has decayed")]
    Decayed,
}

impl Sgp4Error {
    /// Numeric exit code matching the reference implementation.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::MeanElementsBad => 1,
            Self::MeanMotionNonPositive => 2,
            Self::PertElementsBad => 3,
            Self::NegativeSemiLatus => 4,
            Self::SubOrbital => 5,
            Self::Decayed => 6,
        }
    }

    /// Reconstruct from a reference exit code, if it names a failure.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::MeanElementsBad),
            2 => Some(Self::MeanMotionNonPositive),
            3 => Some(Self::PertElementsBad),
            4 => Some(Self::NegativeSemiLatus),
            5 => Some(Self::SubOrbital),
            6 => Some(Self::Decayed),
            _ => None,
        }
    }
}
