//! optimization — nonlinear least squares on `argmin` and its error surface.
//!
//! Purpose
//! -------
//! Provide the numerical layer used to fit labels: a Levenberg–Marquardt
//! solver for `min_θ ½‖r(θ)‖²` behind a small trait-based API, plus a single
//! error/result surface for configuration, numerical, and backend failures.
//!
//! Key behaviors
//! -------------
//! - Expose [`least_squares::minimize`], which validates inputs, runs the
//!   solver, and returns a [`least_squares::FitOutcome`] carrying the
//!   solution, final cost, and the Jacobian at the solution.
//! - Normalize every failure (bad tolerances, non-finite residuals, singular
//!   normal matrices, iteration caps, raw `argmin` errors) into
//!   [`errors::OptError`] with the alias [`errors::OptResult`].
//!
//! Invariants & assumptions
//! ------------------------
//! - Only a solver-declared convergence counts as success. Reaching the
//!   iteration cap is returned as `OptError::NotConverged`.
//! - Residuals and Jacobians are validated for shape and finiteness on every
//!   evaluation; invalid states are errors, not panics.
//!
//! Conventions
//! -----------
//! - Parameters, residuals, and Jacobians use the `ndarray` aliases in
//!   [`least_squares::types`].
//! - This module performs no I/O and no logging; callers report progress.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules cover option validation, the argmin
//!   adapter (analytic and finite-difference Jacobians), solver behavior on
//!   linear, Rosenbrock, and degenerate problems, and the public entry point.

pub mod errors;
pub mod least_squares;

pub mod prelude {
    pub use super::errors::{OptError, OptResult};
    pub use super::least_squares::prelude::*;
}
