//! Validation helpers for least-squares optimization.
//!
//! This module centralizes common consistency checks used across the
//! optimizer interface:
//!
//! - **Tolerance checks**: [`verify_tol`] ensures numeric tolerances are
//!   finite and strictly positive when provided.
//! - **Damping checks**: [`verify_damping`] and [`verify_damping_factor`].
//! - **Initial guess**: [`validate_theta0`] enforces finite entries.
//! - **Residuals / Jacobians**: [`validate_residuals`] and
//!   [`validate_jacobian`] enforce dimensions and finite entries.
//! - **Parameter estimates**: [`validate_theta_hat`] ensures a candidate
//!   `theta_hat` exists and contains only finite values.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::types::{JacobianMatrix, Residuals, Theta},
};

/// Which tolerance a value belongs to, used to pick the error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TolKind {
    Cost,
    Step,
    Grad,
}

/// Validate an optional stopping tolerance.
///
/// - Accepts `None` (no stopping rule of that kind).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`], [`OptError::InvalidTolStep`] or
/// [`OptError::InvalidTolGrad`] depending on `kind`.
pub fn verify_tol(tol: Option<f64>, kind: TolKind) -> OptResult<()> {
    let Some(tol) = tol else {
        return Ok(());
    };
    let reason = if !tol.is_finite() {
        "Tolerance must be finite."
    } else if tol <= 0.0 {
        "Tolerance must be positive."
    } else {
        return Ok(());
    };
    Err(match kind {
        TolKind::Cost => OptError::InvalidTolCost { tol, reason },
        TolKind::Step => OptError::InvalidTolStep { tol, reason },
        TolKind::Grad => OptError::InvalidTolGrad { tol, reason },
    })
}

/// Validate the initial damping `λ₀`.
///
/// # Errors
/// Returns [`OptError::InvalidDamping`] if `λ₀` is non-finite or ≤ 0.
pub fn verify_damping(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidDamping { value, reason: "Damping must be finite." });
    }
    if value <= 0.0 {
        return Err(OptError::InvalidDamping { value, reason: "Damping must be positive." });
    }
    Ok(())
}

/// Validate a damping update factor.
///
/// # Errors
/// Returns [`OptError::InvalidDampingFactor`] if the factor is non-finite or
/// not strictly greater than one.
pub fn verify_damping_factor(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::InvalidDampingFactor {
            value,
            reason: "Damping factor must be finite.",
        });
    }
    if value <= 1.0 {
        return Err(OptError::InvalidDampingFactor {
            value,
            reason: "Damping factor must be greater than one.",
        });
    }
    Ok(())
}

/// Validate an initial parameter vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::ThetaLengthMismatch`] if `theta.len() != dim`.
/// - [`OptError::InvalidThetaInput`] for the first non-finite entry.
pub fn validate_theta0(theta: &Theta, dim: usize) -> OptResult<()> {
    if theta.len() != dim {
        return Err(OptError::ThetaLengthMismatch { expected: dim, actual: theta.len() });
    }
    for (index, &value) in theta.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidThetaInput { index, value });
        }
    }
    Ok(())
}

/// Validate a residual vector.
///
/// # Errors
/// - [`OptError::EmptyResiduals`] if there are no residuals.
/// - [`OptError::InvalidResidual`] for the first non-finite entry.
pub fn validate_residuals(residuals: &Residuals) -> OptResult<()> {
    if residuals.is_empty() {
        return Err(OptError::EmptyResiduals);
    }
    for (index, &value) in residuals.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidResidual { index, value });
        }
    }
    Ok(())
}

/// Validate the shape and entries of a residual Jacobian.
///
/// # Checks
/// 1. Matrix dimensions must equal `rows × cols`.
/// 2. All entries must be finite (no NaN or ±∞).
///
/// # Errors
/// - [`OptError::JacobianDimMismatch`] if dimensions do not match.
/// - [`OptError::InvalidJacobian`] if any entry is non-finite, with offending
///   row/col indices and value.
pub fn validate_jacobian(jacobian: &JacobianMatrix, rows: usize, cols: usize) -> OptResult<()> {
    if jacobian.nrows() != rows || jacobian.ncols() != cols {
        return Err(OptError::JacobianDimMismatch {
            expected: (rows, cols),
            found: (jacobian.nrows(), jacobian.ncols()),
        });
    }
    for ((row, col), &value) in jacobian.indexed_iter() {
        if !value.is_finite() {
            return Err(OptError::InvalidJacobian { row, col, value });
        }
    }
    Ok(())
}

/// Validate and unwrap an estimated parameter vector (`theta_hat`).
///
/// # Errors
/// - [`OptError::MissingThetaHat`] if no vector was provided.
/// - [`OptError::InvalidThetaHat`] if any element is non-finite.
pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    match theta_hat {
        Some(t) => {
            for (index, &value) in t.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidThetaHat {
                        index,
                        value,
                        reason: "Parameter estimates must be finite.",
                    });
                }
            }
            Ok(t)
        }
        None => Err(OptError::MissingThetaHat),
    }
}

/// Validate that a scalar cost is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_cost(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}
