//! inference — parameter uncertainty after a least-squares fit.
//!
//! Purpose
//! -------
//! Turn the residual Jacobian at a fitted optimum into a parameter covariance
//! matrix via the inverse of the Gauss–Newton information `JᵀJ`.
//!
//! Invariants & assumptions
//! ------------------------
//! - The Jacobian is of the noise-weighted residuals, so `(JᵀJ)⁻¹` is the
//!   covariance without a further variance factor.
//! - Singular or ill-conditioned information matrices are reported as
//!   `OptError::SingularInformation`; no pseudo-inverse is attempted.
//!
//! Testing notes
//! -------------
//! - Unit tests in [`covariance`] check a hand-computed inverse and the
//!   rejection of rank-deficient and non-finite inputs.

pub mod covariance;

pub use self::covariance::{covariance_diagonal, covariance_from_jacobian};
