//! High-level entry point for minimizing a user-provided `LeastSquares` model.
//!
//! Wraps the model in an `ArgMinAdapter`, builds a Levenberg–Marquardt
//! solver from the options, and delegates the run to `run_lm`.
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        adapter::ArgMinAdapter,
        lm::LevenbergMarquardt,
        run::run_lm,
        traits::{FitOutcome, LMOptions, LeastSquares},
        types::Theta,
        validation::validate_theta0,
    },
};

/// Minimize `½‖r(θ)‖²` with Levenberg–Marquardt.
///
/// # Behavior
/// - Validates the initial guess (finite entries) and calls
///   `f.check(theta0, data)`.
/// - Wraps `(f, data)` in an `ArgMinAdapter`.
/// - Builds a [`LevenbergMarquardt`] solver from `opts`.
/// - Calls `run_lm`, which configures the executor and returns a
///   [`FitOutcome`].
///
/// # Errors
/// - Propagates any error from `f.check` or initial-guess validation.
/// - Propagates solver failures (singular normal matrix, exhausted damping).
/// - Returns `NotConverged` if the iteration cap is hit first.
///
/// # Example
/// ```
/// use ndarray::array;
/// use rust_cannon::optimization::errors::OptResult;
/// use rust_cannon::optimization::least_squares::{
///     minimize, LMOptions, LeastSquares, Residuals, Theta,
/// };
///
/// struct Offset;
/// impl LeastSquares for Offset {
///     type Data = Residuals;
///     fn residuals(&self, theta: &Theta, data: &Residuals) -> OptResult<Residuals> {
///         Ok(data.mapv(|y| theta[0] - y))
///     }
///     fn check(&self, _: &Theta, _: &Residuals) -> OptResult<()> {
///         Ok(())
///     }
/// }
///
/// let data = array![1.0, 2.0, 3.0];
/// let out = minimize(&Offset, array![0.0], &data, &LMOptions::default())?;
/// assert!((out.theta_hat[0] - 2.0).abs() < 1e-8);
/// # Ok::<(), rust_cannon::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: LeastSquares>(
    f: &F, theta0: Theta, data: &F::Data, opts: &LMOptions,
) -> OptResult<FitOutcome> {
    validate_theta0(&theta0, theta0.len())?;
    f.check(&theta0, data)?;
    let problem = ArgMinAdapter::new(f, data);
    let solver = LevenbergMarquardt::new(opts);
    run_lm(theta0, opts, problem, solver)
}
