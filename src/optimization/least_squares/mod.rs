//! least_squares — argmin-powered weighted nonlinear least squares.
//!
//! Purpose
//! -------
//! Provide a Levenberg–Marquardt optimization layer for problems of the form
//! `min_θ ½‖r(θ)‖²`, where `r(θ)` are residuals already divided by their
//! per-observation standard deviations. Callers implement [`LeastSquares`]
//! and invoke [`minimize`].
//!
//! Key behaviors
//! -------------
//! - Bridge user models into `argmin` via [`adapter::ArgMinAdapter`]
//!   (`Operator`, `Jacobian`, `CostFunction`), with central/forward
//!   finite-difference Jacobians when no analytic one is provided.
//! - Run the custom [`lm::LevenbergMarquardt`] solver through
//!   `argmin::core::Executor` in [`run::run_lm`].
//! - Normalize results into a [`FitOutcome`] that also carries the weighted
//!   Jacobian at `θ̂` for covariance estimation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Only solver convergence produces a [`FitOutcome`]; every other
//!   termination (iteration cap, singular normal matrix, damping exhausted)
//!   is an [`OptError`](crate::optimization::errors::OptError).
//! - Configuration types ([`Tolerances`], [`LMOptions`]) are validated on
//!   construction.
//!
//! Conventions
//! -----------
//! - This module never logs. Callers decide what to report.
//! - Errors bubble up as `OptResult<T>`; nothing here panics or uses
//!   `unsafe`.
//!
//! Testing notes
//! -------------
//! - Unit tests in submodules cover adapter plumbing and FD fallback,
//!   solver convergence and failure modes, and outcome validation.

pub mod adapter;
pub mod api;
pub mod lm;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::lm::LevenbergMarquardt;
pub use self::traits::{FitOutcome, LMOptions, LeastSquares, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, JacobianMatrix, Residuals, Theta};

pub mod prelude {
    pub use super::api::minimize;
    pub use super::traits::{FitOutcome, LMOptions, LeastSquares, Tolerances};
    pub use super::types::{JacobianMatrix, Residuals, Theta};
}
