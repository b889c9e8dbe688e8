//! Adapter that exposes a user `LeastSquares` model as an `argmin` problem.
//!
//! The weighted residual vector `r(θ)` is served through `Operator`, its
//! Jacobian through `Jacobian`, and the scalar objective `½‖r(θ)‖²` through
//! `CostFunction`. If the model does not provide an analytic Jacobian we
//! finite-difference the residual closure instead.
use std::cell::RefCell;

use crate::optimization::{
    errors::OptError,
    least_squares::{
        traits::LeastSquares,
        types::{Cost, JacobianMatrix, Residuals, Theta},
        validation::{validate_jacobian, validate_residuals},
    },
};
use argmin::core::{CostFunction, Error, Jacobian, Operator};
use finitediff::FiniteDiff;

/// Bridges a user `LeastSquares` model to `argmin`.
///
/// - `Operator::apply` returns the validated residuals `r(θ)`.
/// - `Jacobian::jacobian` returns `∂r/∂θ`, analytic or finite-difference.
/// - `CostFunction::cost` returns `½ r·r`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: LeastSquares> {
    pub f: &'a F,
    pub data: &'a F::Data,
}

impl<'a, F: LeastSquares> Operator for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Residuals;

    /// Evaluate the weighted residuals at `θ`.
    ///
    /// # Errors
    /// Propagates any `OptError` from the user's `residuals` and rejects
    /// empty or non-finite residual vectors.
    fn apply(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let r = self.f.residuals(theta, self.data)?;
        validate_residuals(&r)?;
        Ok(r)
    }
}

impl<'a, F: LeastSquares> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    fn cost(&self, theta: &Self::Param) -> Result<Self::Output, Error> {
        let r = self.apply(theta)?;
        Ok(half_squared_norm(&r))
    }
}

impl<'a, F: LeastSquares> Jacobian for ArgMinAdapter<'a, F> {
    type Param = Theta;
    type Jacobian = JacobianMatrix;

    /// Evaluate the residual Jacobian at `θ`.
    ///
    /// Behavior:
    /// - If the user implements `jacobian(θ, data)`, validate and return it.
    /// - Otherwise, finite-difference the residual closure:
    ///   - try *central* differences first,
    ///   - if a residual evaluation failed or the result is not finite,
    ///     retry once with *forward* differences.
    ///
    /// Implementation notes:
    /// - The FD closure must return a plain vector, so errors are captured in
    ///   `closure_err` and the closure returns a `NaN` vector of the right
    ///   length instead.
    ///
    /// # Errors
    /// - Propagates user errors from `jacobian` (other than
    ///   `JacobianNotImplemented`).
    /// - Propagates the first error raised by a residual evaluation during FD.
    /// - Returns validation errors for wrong shape or non-finite entries.
    fn jacobian(&self, theta: &Self::Param) -> Result<Self::Jacobian, Error> {
        let dim = theta.len();
        match self.f.jacobian(theta, self.data) {
            Ok(j) => {
                let rows = self.apply(theta)?.len();
                validate_jacobian(&j, rows, dim)?;
                Ok(j)
            }
            Err(OptError::JacobianNotImplemented) => {
                let rows = self.apply(theta)?.len();
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let resid_func = |theta: &Theta| -> Residuals {
                    match self.apply(theta) {
                        Ok(r) => r,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            Residuals::from_elem(rows, f64::NAN)
                        }
                    }
                };
                let fd_jac = residual_major(theta.central_jacobian(&resid_func));
                if closure_err.borrow().is_none() && validate_jacobian(&fd_jac, rows, dim).is_ok() {
                    return Ok(fd_jac);
                }
                closure_err.replace(None);
                let fd_jac = residual_major(theta.forward_jacobian(&resid_func));
                if let Some(err) = closure_err.take() {
                    return Err(err);
                }
                validate_jacobian(&fd_jac, rows, dim)?;
                Ok(fd_jac)
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl<'a, F: LeastSquares> ArgMinAdapter<'a, F> {
    /// Construct a new adapter over a user `LeastSquares` model and its data.
    pub fn new(f: &'a F, data: &'a F::Data) -> Self {
        Self { f, data }
    }
}

/// `½ r·r`
pub fn half_squared_norm(r: &Residuals) -> Cost {
    0.5 * r.dot(r)
}

// finitediff returns parameters × residuals; argmin expects residuals ×
// parameters. Shape is checked afterwards by `validate_jacobian`.
fn residual_major(jac: JacobianMatrix) -> JacobianMatrix {
    jac.reversed_axes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::errors::OptResult;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array2, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Residual/cost plumbing through `Operator` and `CostFunction`.
    // - Analytic Jacobian passthrough and the finite-difference fallback.
    // - Error propagation out of the finite-difference closure.
    //
    // They intentionally DO NOT cover:
    // - Solver iteration logic (see `lm` tests).
    // -------------------------------------------------------------------------

    /// r(θ) = [θ0 - 1, 2·θ1 + θ0², 3]
    struct Quad;

    impl LeastSquares for Quad {
        type Data = ();

        fn residuals(&self, theta: &Theta, _: &()) -> OptResult<Residuals> {
            Ok(array![theta[0] - 1.0, 2.0 * theta[1] + theta[0] * theta[0], 3.0])
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    struct QuadAnalytic;

    impl LeastSquares for QuadAnalytic {
        type Data = ();

        fn residuals(&self, theta: &Theta, data: &()) -> OptResult<Residuals> {
            Quad.residuals(theta, data)
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }

        fn jacobian(&self, theta: &Theta, _: &()) -> OptResult<JacobianMatrix> {
            Ok(array![[1.0, 0.0], [2.0 * theta[0], 2.0], [0.0, 0.0]])
        }
    }

    /// Rosenbrock residuals: r(θ) = [10(θ1 − θ0²), 1 − θ0].
    struct Rosen;

    impl LeastSquares for Rosen {
        type Data = ();

        fn residuals(&self, theta: &Theta, _: &()) -> OptResult<Residuals> {
            Ok(array![10.0 * (theta[1] - theta[0] * theta[0]), 1.0 - theta[0]])
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    /// Fails whenever θ0 > 0.
    struct Fragile;

    impl LeastSquares for Fragile {
        type Data = ();

        fn residuals(&self, theta: &Theta, _: &()) -> OptResult<Residuals> {
            if theta[0] > 0.0 {
                return Err(OptError::InvalidThetaInput { index: 0, value: theta[0] });
            }
            Ok(array![theta[0], theta[1]])
        }

        fn check(&self, _: &Theta, _: &()) -> OptResult<()> {
            Ok(())
        }
    }

    #[test]
    // Purpose
    // -------
    // The cost is half the squared residual norm.
    //
    // Given
    // -----
    // - `Quad` at θ = [0, 0], residuals [-1, 0, 3].
    //
    // Expect
    // ------
    // - cost = ½(1 + 0 + 9) = 5.
    fn cost_is_half_squared_residual_norm() {
        let adapter = ArgMinAdapter::new(&Quad, &());
        let c = adapter.cost(&array![0.0, 0.0]).unwrap();
        assert_abs_diff_eq!(c, 5.0, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // The finite-difference Jacobian agrees with the analytic one.
    //
    // Given
    // -----
    // - `Quad` (no analytic Jacobian) and `QuadAnalytic` at θ = [0.7, -0.2].
    //
    // Expect
    // ------
    // - Both Jacobians are 3×2 and agree to FD accuracy.
    fn fd_jacobian_matches_analytic() {
        let theta = array![0.7, -0.2];
        let fd = ArgMinAdapter::new(&Quad, &()).jacobian(&theta).unwrap();
        let exact = ArgMinAdapter::new(&QuadAnalytic, &()).jacobian(&theta).unwrap();
        assert_eq!(fd.dim(), (3, 2));
        for (a, b) in fd.iter().zip(exact.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // The finite-difference Jacobian of a square problem is laid out as
    // residuals × parameters, not transposed.
    //
    // Given
    // -----
    // - `Rosen` (2 residuals, 2 parameters) at θ = [−1.2, 1].
    //
    // Expect
    // ------
    // - J ≈ [[24, 10], [−1, 0]].
    fn fd_jacobian_square_problem_is_not_transposed() {
        let fd = ArgMinAdapter::new(&Rosen, &()).jacobian(&array![-1.2, 1.0]).unwrap();
        let exact: Array2<f64> = array![[24.0, 10.0], [-1.0, 0.0]];
        assert_eq!(fd.dim(), (2, 2));
        for (a, b) in fd.iter().zip(exact.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-5);
        }
    }

    #[test]
    // Purpose
    // -------
    // A residual error raised inside the FD closure surfaces as an error.
    //
    // Given
    // -----
    // - `Fragile` at θ = [0, 0]: the base point is fine but any positive
    //   perturbation of θ0 fails.
    //
    // Expect
    // ------
    // - `jacobian` returns the captured `InvalidThetaInput`.
    fn fd_jacobian_propagates_closure_error() {
        let adapter = ArgMinAdapter::new(&Fragile, &());
        let err = adapter.jacobian(&array![0.0, 0.0]).unwrap_err();
        assert!(matches!(OptError::from(err), OptError::InvalidThetaInput { index: 0, .. }));
    }

    #[test]
    // Purpose
    // -------
    // Parameter-major output is always transposed, including square input.
    //
    // Given
    // -----
    // - A 2×3 matrix and a 2×2 matrix.
    //
    // Expect
    // ------
    // - `residual_major` returns the transpose of each.
    fn residual_major_always_transposes() {
        let j: Array2<f64> = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(residual_major(j.clone()), j.t().to_owned());
        let sq: Array2<f64> = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(residual_major(sq.clone()), array![[1.0, 3.0], [2.0, 4.0]]);
    }
}
