//! least_squares::types — shared numeric aliases and solver constants.
//!
//! Purpose
//! -------
//! Centralize the core numeric types used by the least-squares optimizer so
//! the rest of the optimization code can stay agnostic to `ndarray` and
//! Argmin generics.
//!
//! Invariants & assumptions
//! ------------------------
//! - All optimizer vectors and matrices are `ndarray` containers over `f64`.
//! - `Cost` is always `½‖r(θ)‖²` for the weighted residual vector `r`.
//! - `JacobianMatrix` has shape `m × n` where `m` is the residual count and
//!   `n = Theta.len()`.
//!
//! Testing notes
//! -------------
//! - This module only defines type aliases and constants; correctness is
//!   exercised by the solver and adapter tests.
use argmin::core::IterState;
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Parameter vector `θ` for least-squares optimization.
pub type Theta = Array1<f64>;

/// Gradient vector `∇c(θ) = Jᵀr` of the cost.
pub type Grad = Array1<f64>;

/// Weighted residual vector `r(θ)`.
pub type Residuals = Array1<f64>;

/// Dense residual Jacobian `∂r/∂θ` with one row per residual.
pub type JacobianMatrix = Array2<f64>;

/// Scalar objective value `½‖r(θ)‖²`.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps human-readable counter names (e.g., `"operator_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Argmin iteration state used by the Levenberg–Marquardt solver.
pub type LmState = IterState<Theta, Grad, (), (), (), f64>;

/// Default initial damping `λ₀` for Levenberg–Marquardt.
pub const DEFAULT_LAMBDA0: f64 = 1e-3;

/// Default factor applied to `λ` after a rejected step.
pub const DEFAULT_LAMBDA_UP: f64 = 10.0;

/// Default factor dividing `λ` after an accepted step.
pub const DEFAULT_LAMBDA_DOWN: f64 = 10.0;

/// Floor for the damping parameter.
pub const LAMBDA_MIN: f64 = 1e-12;

/// Ceiling for the damping parameter; exceeding it aborts the iteration.
pub const LAMBDA_MAX: f64 = 1e16;
