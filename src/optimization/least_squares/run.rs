//! Execution helper that runs the Levenberg–Marquardt solver on a
//! least-squares problem and returns a crate-friendly [`FitOutcome`].
use crate::optimization::{
    errors::OptResult,
    least_squares::{
        adapter::ArgMinAdapter,
        lm::LevenbergMarquardt,
        traits::{FitOutcome, LMOptions, LeastSquares},
        types::Theta,
    },
};
use argmin::core::{Executor, Jacobian, State};

/// Run the solver for a least-squares problem.
///
/// Wires up:
/// - the user model via [`ArgMinAdapter`],
/// - the [`LevenbergMarquardt`] solver,
/// - initial parameter `theta0`,
/// - optional `max_iters`,
///
/// then executes the solver, re-evaluates the Jacobian at the best parameter
/// and converts the result into [`FitOutcome`].
///
/// # Arguments
/// - `theta0`: Initial parameter vector. It is **consumed** and set on the
///   optimizer state via `state.param(theta0)`.
/// - `opts`: Optimizer options (tolerances, damping, max iters).
/// - `problem`: An [`ArgMinAdapter`] wrapping the user's model and data.
/// - `solver`: A constructed [`LevenbergMarquardt`] solver.
///
/// # Errors
/// - Propagates any `argmin` runtime error (including crate errors raised
///   inside the solver, e.g. a singular normal matrix) via
///   `From<argmin::core::Error>`.
/// - Returns `NotConverged` when the run stopped for any reason other than
///   solver convergence.
/// - Propagates validation errors encountered when constructing
///   [`FitOutcome`].
pub fn run_lm<'a, F: LeastSquares>(
    theta0: Theta, opts: &LMOptions, problem: ArgMinAdapter<'a, F>, solver: LevenbergMarquardt,
) -> OptResult<FitOutcome> {
    let evaluator = ArgMinAdapter::new(problem.f, problem.data);
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(theta0));
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let theta_hat = result.take_best_param();
    let jacobian = match &theta_hat {
        Some(theta) => evaluator.jacobian(theta)?,
        None => Default::default(),
    };
    FitOutcome::new(
        theta_hat,
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
        jacobian,
    )
}
