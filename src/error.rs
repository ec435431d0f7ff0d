//! Error taxonomy shared by every minimizer in the crate.
//!
//! Hard failures (exhausted budgets, failed bracketing, invalid input) surface as [`Error`].
//! Running out of iterations inside Brent's method is *not* an error: those solvers report
//! [`Status::IterationLimitReached`](crate::Status) and hand back their best estimate.

use derive_builder::UninitializedFieldError;
use thiserror::Error;

/// Errors raised by the minimizers.
#[derive(Debug, Error)]
pub enum Error {
    /// The solver performed more iterations than its configured cap.
    #[error("iteration limit of {0} exceeded")]
    IterationLimit(usize),

    /// The objective (or gradient) was evaluated more often than allowed.
    #[error("evaluation limit of {0} exceeded")]
    EvaluationLimit(usize),

    /// No sign change of the directional derivative was found before the step overflowed.
    #[error("unable to bracket minimum in line search")]
    BracketingFailed,

    /// The search interval is empty or inverted.
    #[error("lower bound {lower} must be strictly below upper bound {upper}")]
    InvalidBounds { lower: f64, upper: f64 },

    /// Two vectors that must describe the same space have different lengths.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// A coordinate of the start point lies outside its box bounds.
    #[error("start point coordinate {index} ({value}) lies outside its bounds")]
    StartOutOfBounds { index: usize, value: f64 },

    /// A zero step in the start configuration would produce two equal vertices.
    #[error("equal vertices {0} and {next} in simplex configuration", next = .0 + 1)]
    DegenerateSimplex(usize),

    /// A configuration value failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A builder field had no value and no default.
    #[error("configuration field `{0}` must be initialized")]
    UninitializedField(&'static str),

    /// A fallible objective callback reported an error.
    #[error("objective error: {0}")]
    Objective(Box<dyn std::error::Error + Send + Sync>),
}

impl From<UninitializedFieldError> for Error {
    fn from(err: UninitializedFieldError) -> Self {
        Error::UninitializedField(err.field_name())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::InvalidConfig(msg)
    }
}

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
