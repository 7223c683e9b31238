//! Error types for the infinite sheds model.

use thiserror::Error;

/// Errors raised while configuring or evaluating the model.
///
/// Degenerate geometry (near-flat rows, sun on the horizon, zero GHI) is not an
/// error: those cases are resolved numerically inside the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShedsError {
    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("Series length mismatch: {name} has {actual} values, expected {expected}")]
    LengthMismatch {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Unknown transposition model: {0}")]
    UnknownTranspositionModel(String),

    #[error("Transposition failed: {0}")]
    Transposition(String),
}

pub type Result<T> = std::result::Result<T, ShedsError>;

#[cfg(feature = "python")]
impl From<ShedsError> for pyo3::PyErr {
    fn from(e: ShedsError) -> Self {
        pyo3::exceptions::PyValueError::new_err(e.to_string())
    }
}
