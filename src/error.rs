//! Error taxonomy for gradient removal.
//!
//! Every failure is fatal and reported synchronously; the pipeline never
//! returns a partially cleaned recording.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradientError {
    #[error("event label {label:?} not found in markers")]
    UnknownLabel { label: String },

    #[error("need at least 2 {label:?} markers to compute the repetition time, found {found}")]
    InsufficientMarkers { label: String, found: usize },

    #[error("window [{start}, {}) exceeds recording length {n_times}", .start + .len)]
    OutOfBounds { start: usize, len: usize, n_times: usize },

    #[error("first two markers at samples {first} and {second} give a non-positive cycle length")]
    NonPositiveCycle { first: usize, second: usize },

    #[error("marker {index} is not after the previous marker")]
    UnorderedMarkers { index: usize },

    #[error("gap of {gap} samples before marker {index} does not match cycle length {expected}")]
    IrregularSpacing { index: usize, gap: usize, expected: usize },

    #[error("baseline ({start}, {end}) s lies outside the cycle [0, {cycle_seconds}] s")]
    BaselineOutOfRange { start: f64, end: f64, cycle_seconds: f64 },

    #[error("baseline interval maps to an empty sample range")]
    EmptyBaseline,

    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch { expected: Vec<usize>, got: Vec<usize> },

    #[error("invalid sampling rate: {0} Hz")]
    InvalidSamplingRate(f64),

    #[error("window length must be at least 1")]
    InvalidWindow,

    #[error("gradient removal cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, GradientError>;
