//! cannon::model — trained spectral model (coefficients, scatter, pivot).
//!
//! Purpose
//! -------
//! Hold the output of a previously trained Cannon model in a validated,
//! read-only container. The model predicts the flux at pixel `p` for
//! (pivot-relative) labels `l` as
//!
//! ```text
//! f_p(l) = c[p, 0] + Σ_k c[p, 1 + k] · lvec(l)[k]
//! ```
//!
//! where `lvec` is the quadratic label vector.
//!
//! Invariants & assumptions
//! ------------------------
//! - `coefficients` is `npixels × (1 + F(nlabels))` with `F(n) = n + n(n+1)/2`.
//! - `scatter` has length `npixels`, finite and nonnegative.
//! - `pivot` has length `nlabels`, finite.
//! - `nlabels ≥ 1`, `npixels ≥ 1`, every coefficient finite.
//!
//! Conventions
//! -----------
//! - Column 0 of `coefficients` is the offset term. Columns `1..` follow the
//!   label-vector ordering of [`label_vector`](crate::cannon::label_vector).
//! - Construction fails fast with [`CannonError`]; once built, a model is
//!   never mutated by inference.
//!
//! Testing notes
//! -------------
//! - Unit tests cover the happy path, each
//!   shape rejection, and flux prediction on a hand-checked example.
use crate::cannon::{
    errors::{CannonError, CannonResult},
    label_vector::{feature_len, label_vector},
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};

/// `SpectralModel` — validated Cannon model parameters.
///
/// Fields
/// ------
/// - `coefficients`: `Array2<f64>` of shape `npixels × (1 + F(nlabels))`.
/// - `scatter`: `Array1<f64>` intrinsic per-pixel scatter.
/// - `pivot`: `Array1<f64>` reference label values.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralModel {
    coefficients: Array2<f64>,
    scatter: Array1<f64>,
    pivot: Array1<f64>,
}

impl SpectralModel {
    /// Construct a validated model. `nlabels` is taken from `pivot.len()`.
    ///
    /// Errors
    /// ------
    /// - `CannonError::EmptyModel` when there are no labels or no pixels.
    /// - `CannonError::CoefficientShapeMismatch` when the column count is not
    ///   `1 + F(nlabels)`.
    /// - `CannonError::ScatterLengthMismatch` when `scatter.len() != npixels`.
    /// - `CannonError::NonFiniteCoefficient`, `CannonError::InvalidScatter`,
    ///   `CannonError::NonFinitePivot` for bad entries (first offender).
    pub fn new(
        coefficients: Array2<f64>, scatter: Array1<f64>, pivot: Array1<f64>,
    ) -> CannonResult<Self> {
        let nlabels = pivot.len();
        let npixels = coefficients.nrows();
        if nlabels == 0 || npixels == 0 {
            return Err(CannonError::EmptyModel { nlabels, npixels });
        }
        let expected_cols = 1 + feature_len(nlabels);
        if coefficients.ncols() != expected_cols {
            return Err(CannonError::CoefficientShapeMismatch {
                nlabels,
                expected_cols,
                actual_cols: coefficients.ncols(),
            });
        }
        if scatter.len() != npixels {
            return Err(CannonError::ScatterLengthMismatch {
                expected: npixels,
                actual: scatter.len(),
            });
        }
        for ((pixel, column), &value) in coefficients.indexed_iter() {
            if !value.is_finite() {
                return Err(CannonError::NonFiniteCoefficient { pixel, column, value });
            }
        }
        for (pixel, &value) in scatter.iter().enumerate() {
            if !value.is_finite() || value < 0.0 {
                return Err(CannonError::InvalidScatter { pixel, value });
            }
        }
        for (index, &value) in pivot.iter().enumerate() {
            if !value.is_finite() {
                return Err(CannonError::NonFinitePivot { index, value });
            }
        }
        Ok(Self { coefficients, scatter, pivot })
    }

    /// Construct a model whose label count is fixed independently of the
    /// pivot, checking the pivot against it.
    ///
    /// Errors
    /// ------
    /// - `CannonError::PivotLengthMismatch` when `pivot.len() != nlabels`.
    /// - Everything [`SpectralModel::new`] returns.
    pub fn for_labels(
        nlabels: usize, coefficients: Array2<f64>, scatter: Array1<f64>, pivot: Array1<f64>,
    ) -> CannonResult<Self> {
        if pivot.len() != nlabels {
            return Err(CannonError::PivotLengthMismatch { expected: nlabels, actual: pivot.len() });
        }
        Self::new(coefficients, scatter, pivot)
    }

    pub fn nlabels(&self) -> usize {
        self.pivot.len()
    }

    pub fn npixels(&self) -> usize {
        self.coefficients.nrows()
    }

    pub fn coefficients(&self) -> ArrayView2<'_, f64> {
        self.coefficients.view()
    }

    pub fn scatter(&self) -> ArrayView1<'_, f64> {
        self.scatter.view()
    }

    pub fn pivot(&self) -> ArrayView1<'_, f64> {
        self.pivot.view()
    }

    /// Offset column `c[:, 0]`.
    pub fn offsets(&self) -> ArrayView1<'_, f64> {
        self.coefficients.column(0)
    }

    /// Label-dependent part `c[:, 1..]`, shape `npixels × F(nlabels)`.
    pub fn design(&self) -> ArrayView2<'_, f64> {
        self.coefficients.slice(s![.., 1..])
    }

    /// Predicted flux for pivot-relative labels.
    ///
    /// `labels.len()` must equal `nlabels`; a mismatch is a programmer error
    /// and panics inside the matrix product.
    pub fn predict_flux(&self, labels: ArrayView1<f64>) -> Array1<f64> {
        &self.offsets() + &self.design().dot(&label_vector(labels))
    }
}
