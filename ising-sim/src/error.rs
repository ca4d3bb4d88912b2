use thiserror::Error;

/// Errors raised by lattice construction, parameter updates and runs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IsingError {
    #[error("invalid lattice dimension {0} (expected 1..={})", crate::geometry::MAX_DIMENSION)]
    InvalidDimension(i64),
    #[error("temperature must be a finite positive number, got {0}")]
    NonPositiveTemperature(f64),
    #[error("external field must be finite, got {0}")]
    NonFiniteField(f64),
    #[error("spin value must be +1 or -1, got {0}")]
    InvalidSpin(i8),
    #[error("site ({i}, {j}) is outside a {n}x{n} lattice")]
    IndexOutOfRange { i: usize, j: usize, n: usize },
    #[error("expected {expected} spins, got {actual}")]
    SpinCountMismatch { expected: usize, actual: usize },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("interrupted")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, IsingError>;
