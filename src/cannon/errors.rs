//! Errors for Cannon label inference (model contract, spectra, and dataset
//! shape checks).
//!
//! This module defines [`CannonError`], the fatal error type for the label
//! inference stack. Everything here is a caller mistake detected *before* any
//! star is solved. Per-star convergence problems are not errors; they are
//! carried as `StarFit::Failed` with an [`OptError`] reason.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy).
//! - `star` indices refer to row order in the dataset's flux/ivar tables.
use crate::optimization::errors::OptError;
#[cfg(feature = "python-bindings")]
use pyo3::{PyErr, exceptions::PyValueError};

/// Crate-wide result alias for operations that may produce [`CannonError`].
pub type CannonResult<T> = Result<T, CannonError>;

/// Unified error type for label inference.
#[derive(Debug, Clone, PartialEq)]
pub enum CannonError {
    // ---- Model contract ----
    /// The model must describe at least one label and one pixel.
    EmptyModel { nlabels: usize, npixels: usize },

    /// Coefficient matrix has the wrong number of columns for `nlabels`.
    CoefficientShapeMismatch { nlabels: usize, expected_cols: usize, actual_cols: usize },

    /// Scatter vector length differs from the pixel count.
    ScatterLengthMismatch { expected: usize, actual: usize },

    /// Pivot vector length differs from the label count.
    PivotLengthMismatch { expected: usize, actual: usize },

    /// A coefficient is NaN/±inf.
    NonFiniteCoefficient { pixel: usize, column: usize, value: f64 },

    /// Scatter must be finite and ≥ 0.
    InvalidScatter { pixel: usize, value: f64 },

    /// A pivot value is NaN/±inf.
    NonFinitePivot { index: usize, value: f64 },

    // ---- Spectra / dataset ----
    /// A spectrum row does not match the model's pixel count.
    SpectrumLengthMismatch { star: usize, expected: usize, actual: usize },

    /// Flux and ivar tables disagree on the number of stars.
    StarCountMismatch { flux_rows: usize, ivar_rows: usize },

    /// Flux and ivar tables disagree on the number of pixels.
    PixelCountMismatch { flux_cols: usize, ivar_cols: usize },

    /// Inverse variance must be finite and ≥ 0.
    InvalidIvar { star: usize, pixel: usize, value: f64 },

    /// Flux must be finite wherever the pixel carries weight.
    NonFiniteFlux { star: usize, pixel: usize, value: f64 },

    /// The label table being written has the wrong shape.
    LabelTableShapeMismatch { expected: (usize, usize), actual: (usize, usize) },

    /// Star identifier count differs from the number of spectra.
    IdCountMismatch { expected: usize, actual: usize },

    // ---- Solver inputs ----
    /// Initial guess length differs from the label count.
    InitialGuessLengthMismatch { expected: usize, actual: usize },

    /// Initial guess entries must be finite.
    NonFiniteInitialGuess { index: usize, value: f64 },

    /// Optimizer configuration was rejected.
    InvalidOptions { reason: OptError },
}

impl std::error::Error for CannonError {}

impl std::fmt::Display for CannonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Model contract ----
            CannonError::EmptyModel { nlabels, npixels } => {
                write!(f, "Model needs at least one label and one pixel; got {nlabels} labels, {npixels} pixels")
            }
            CannonError::CoefficientShapeMismatch { nlabels, expected_cols, actual_cols } => {
                write!(
                    f,
                    "Coefficient matrix for {nlabels} labels needs {expected_cols} columns, got {actual_cols}"
                )
            }
            CannonError::ScatterLengthMismatch { expected, actual } => {
                write!(f, "Scatter length mismatch: expected {expected}, got {actual}")
            }
            CannonError::PivotLengthMismatch { expected, actual } => {
                write!(f, "Pivot length mismatch: expected {expected}, got {actual}")
            }
            CannonError::NonFiniteCoefficient { pixel, column, value } => {
                write!(f, "Coefficient at pixel {pixel}, column {column} is non-finite: {value}")
            }
            CannonError::InvalidScatter { pixel, value } => {
                write!(f, "Scatter at pixel {pixel} must be finite and >= 0, got {value}")
            }
            CannonError::NonFinitePivot { index, value } => {
                write!(f, "Pivot at index {index} is non-finite: {value}")
            }
            // ---- Spectra / dataset ----
            CannonError::SpectrumLengthMismatch { star, expected, actual } => {
                write!(f, "Spectrum of star {star} has {actual} pixels, model has {expected}")
            }
            CannonError::StarCountMismatch { flux_rows, ivar_rows } => {
                write!(f, "Flux has {flux_rows} stars but ivar has {ivar_rows}")
            }
            CannonError::PixelCountMismatch { flux_cols, ivar_cols } => {
                write!(f, "Flux has {flux_cols} pixels but ivar has {ivar_cols}")
            }
            CannonError::InvalidIvar { star, pixel, value } => {
                write!(f, "Inverse variance of star {star} at pixel {pixel} must be finite and >= 0, got {value}")
            }
            CannonError::NonFiniteFlux { star, pixel, value } => {
                write!(f, "Flux of star {star} at weighted pixel {pixel} is non-finite: {value}")
            }
            CannonError::LabelTableShapeMismatch { expected, actual } => {
                write!(f, "Label table shape mismatch: expected {expected:?}, got {actual:?}")
            }
            CannonError::IdCountMismatch { expected, actual } => {
                write!(f, "Star id count mismatch: expected {expected}, got {actual}")
            }
            // ---- Solver inputs ----
            CannonError::InitialGuessLengthMismatch { expected, actual } => {
                write!(f, "Initial guess length mismatch: expected {expected}, got {actual}")
            }
            CannonError::NonFiniteInitialGuess { index, value } => {
                write!(f, "Initial guess at index {index} is non-finite: {value}")
            }
            CannonError::InvalidOptions { reason } => {
                write!(f, "Invalid optimizer options: {reason}")
            }
        }
    }
}

impl From<OptError> for CannonError {
    fn from(reason: OptError) -> CannonError {
        CannonError::InvalidOptions { reason }
    }
}

/// Convert a [`CannonError`] into a Python `ValueError` with the error message.
#[cfg(feature = "python-bindings")]
impl From<CannonError> for PyErr {
    fn from(err: CannonError) -> PyErr {
        PyValueError::new_err(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Optimizer configuration errors are wrapped, and messages name the
    // offending quantity.
    //
    // Given
    // -----
    // - `OptError::NoTolerancesProvided` and a pivot length mismatch.
    //
    // Expect
    // ------
    // - `InvalidOptions` carrying the original error; readable messages.
    fn opt_errors_wrap_into_invalid_options() {
        let err: CannonError = OptError::NoTolerancesProvided.into();
        assert_eq!(err, CannonError::InvalidOptions { reason: OptError::NoTolerancesProvided });
        assert!(err.to_string().contains("No tolerances provided"));

        let msg = CannonError::PivotLengthMismatch { expected: 3, actual: 2 }.to_string();
        assert!(msg.contains("expected 3"));
    }
}
