//! inference::covariance — parameter covariance from a weighted Jacobian.
//!
//! Purpose
//! -------
//! Convert the weighted residual Jacobian `J` at a least-squares optimum into
//! the parameter covariance `(JᵀJ)⁻¹`. Residuals are assumed to be scaled by
//! their *absolute* standard deviations, so the result is not rescaled by the
//! reduced chi-square.
//!
//! Key behaviors
//! -------------
//! - Form the information matrix `JᵀJ` and copy it into a
//!   `nalgebra::DMatrix` (`fill_dmatrix`).
//! - Invert it through a symmetric eigendecomposition
//!   `JᵀJ = Q Λ Qᵀ`, giving `Σ = Q Λ⁻¹ Qᵀ`.
//! - Refuse to invert when the smallest eigenvalue is at most
//!   [`EIGEN_EPS`] times the largest: the parameters are not identifiable
//!   and a pseudoinverse would silently report meaningless variances.
//!
//! Invariants & assumptions
//! ------------------------
//! - `J` has shape `m × n` with `m` residuals and `n` parameters, and all
//!   entries are finite (validated upstream by the optimizer).
//! - The returned matrix is exactly symmetric: entry `(i, j)` and `(j, i)`
//!   are computed by the same sum.
//!
//! Conventions
//! -----------
//! - Errors are reported via [`OptResult<T>`]; singular information maps to
//!   [`OptError::SingularInformation`].
//! - No explicit matrix inverse is formed.
//!
//! Testing notes
//! -------------
//! - Unit tests cover agreement with analytic inverses for diagonal and
//!   dense 2×2 systems, and rejection of rank-deficient Jacobians.
use crate::optimization::errors::{OptError, OptResult};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Relative eigenvalue floor below which `JᵀJ` is treated as singular.
pub const EIGEN_EPS: f64 = 1e-14;

/// covariance_from_jacobian — `(JᵀJ)⁻¹` for an absolute-sigma fit.
///
/// Parameters
/// ----------
/// - `jacobian`: `&Array2<f64>`
///   Weighted residual Jacobian at `θ̂`, shape `m × n`.
///
/// Returns
/// -------
/// `OptResult<Array2<f64>>`
///   The `n × n` covariance matrix of `θ̂`.
///
/// Errors
/// ------
/// - `OptError::SingularInformation`
///   When the largest eigenvalue of `JᵀJ` is not positive, or the smallest
///   is at most `EIGEN_EPS` times the largest.
///
/// Notes
/// -----
/// - The implemented formula is
///   `Σ[i,j] = Σ_k Q[i,k] Q[j,k] / λ_k`.
///
/// Examples
/// --------
/// ```rust
/// # use ndarray::array;
/// # use rust_cannon::inference::covariance::covariance_from_jacobian;
/// let j = array![[2.0, 0.0], [0.0, 1.0], [0.0, 0.0]];
/// let cov = covariance_from_jacobian(&j).unwrap();
/// assert!((cov[[0, 0]] - 0.25).abs() < 1e-12);
/// assert!((cov[[1, 1]] - 1.0).abs() < 1e-12);
/// ```
pub fn covariance_from_jacobian(jacobian: &Array2<f64>) -> OptResult<Array2<f64>> {
    let info = jacobian.t().dot(jacobian);
    let n = info.ncols();
    let mut info_nalg = DMatrix::<f64>::zeros(n, n);
    fill_dmatrix(&info, &mut info_nalg);

    let eigen_decomp = info_nalg.symmetric_eigen();
    let q = eigen_decomp.eigenvectors;
    let eigenvals = eigen_decomp.eigenvalues;
    let largest = eigenvals.iter().fold(f64::NEG_INFINITY, |m, &l| m.max(l));
    let smallest = eigenvals.iter().fold(f64::INFINITY, |m, &l| m.min(l));
    if !(largest > 0.0) || !largest.is_finite() || smallest <= EIGEN_EPS * largest {
        return Err(OptError::SingularInformation { eigenvalue: smallest, largest });
    }

    let mut cov = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in i..n {
            let v: f64 =
                eigenvals.iter().enumerate().map(|(k, &l)| q[(i, k)] * q[(j, k)] / l).sum();
            cov[[i, j]] = v;
            cov[[j, i]] = v;
        }
    }
    Ok(cov)
}

/// Diagonal of a covariance matrix.
pub fn covariance_diagonal(cov: &Array2<f64>) -> Array1<f64> {
    cov.diag().to_owned()
}

// ---- Helper methods ----

/// Copy a symmetric `ndarray` matrix into a preallocated `DMatrix`.
///
/// Both matrices must be `n×n`; mismatched shapes are a programmer error and
/// panic on out-of-bounds indexing.
fn fill_dmatrix(info: &Array2<f64>, info_nalg: &mut DMatrix<f64>) {
    let n = info.ncols();
    for j in 0..n {
        for i in j..n {
            info_nalg[(i, j)] = info[[i, j]];
            info_nalg[(j, i)] = info[[j, i]];
        }
    }
}
