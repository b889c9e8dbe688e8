//! least_squares::lm — Levenberg–Marquardt as an `argmin` solver.
//!
//! Purpose
//! -------
//! Minimize `c(θ) = ½‖r(θ)‖²` for a weighted residual vector `r(θ)` using
//! Marquardt-scaled damping of the Gauss–Newton normal equations:
//!
//! ```text
//! (JᵀJ + λ·diag(JᵀJ)) δ = −Jᵀr
//! ```
//!
//! Key behaviors
//! -------------
//! - Each `next_iter` performs exactly one *accepted* step (or declares
//!   convergence). Rejected trial steps only raise `λ` and are retried
//!   inside the same iteration.
//! - The step-size test applies only to accepted steps, so a run of
//!   rejections can never be mistaken for convergence; it ends in
//!   [`OptError::DampingExhausted`] instead.
//! - Convergence is reported through `Solver::terminate` as
//!   `TerminationReason::SolverConverged`. Running out of iterations is left
//!   to `argmin` and surfaces as `MaxItersReached`.
//! - A Jacobian column that is identically zero (a parameter the residuals
//!   do not depend on) is a hard error: the normal matrix is singular and no
//!   amount of damping makes the estimate meaningful.
//!
//! Invariants & assumptions
//! ------------------------
//! - The problem exposes `Operator<Param = Theta, Output = Residuals>` and
//!   `Jacobian<Param = Theta, Jacobian = JacobianMatrix>`.
//! - `λ` stays inside `[LAMBDA_MIN, LAMBDA_MAX]`; exceeding the ceiling
//!   aborts with [`OptError::DampingExhausted`].
//! - The solver is deterministic: the same problem and `θ₀` always give the
//!   same sequence of iterates.
//!
//! Testing notes
//! -------------
//! - Unit tests run the solver through `argmin::core::Executor` on small
//!   linear and nonlinear problems with known minimizers.
use crate::optimization::{
    errors::OptError,
    least_squares::{
        adapter::half_squared_norm,
        traits::LMOptions,
        types::{Grad, JacobianMatrix, LAMBDA_MAX, LAMBDA_MIN, LmState, Residuals, Theta},
        validation::validate_cost,
    },
};
use argmin::core::{
    ArgminError, Error, Jacobian, KV, Operator, Problem, Solver, TerminationReason,
    TerminationStatus,
};
use argmin_math::ArgminL2Norm;
use nalgebra::{DMatrix, DVector};

/// Levenberg–Marquardt solver state.
///
/// Built from [`LMOptions`]; the damping `λ` evolves during a run and is
/// reset to `lambda0` by `init`.
#[derive(Debug, Clone)]
pub struct LevenbergMarquardt {
    lambda0: f64,
    lambda: f64,
    lambda_up: f64,
    lambda_down: f64,
    tol_cost: Option<f64>,
    tol_step: Option<f64>,
    tol_grad: Option<f64>,
    residuals: Option<Residuals>,
    converged: bool,
}

impl LevenbergMarquardt {
    /// Construct a solver from validated options.
    pub fn new(opts: &LMOptions) -> Self {
        Self {
            lambda0: opts.lambda0,
            lambda: opts.lambda0,
            lambda_up: opts.lambda_up,
            lambda_down: opts.lambda_down,
            tol_cost: opts.tols.tol_cost,
            tol_step: opts.tols.tol_step,
            tol_grad: opts.tols.tol_grad,
            residuals: None,
            converged: false,
        }
    }

    /// Current damping parameter.
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    fn finish(&mut self, state: LmState, theta: Theta, cost: f64, grad: Grad) -> LmState {
        self.converged = true;
        state.param(theta).cost(cost).gradient(grad)
    }
}

impl<O> Solver<O, LmState> for LevenbergMarquardt
where
    O: Operator<Param = Theta, Output = Residuals>
        + Jacobian<Param = Theta, Jacobian = JacobianMatrix>,
{
    const NAME: &'static str = "Levenberg-Marquardt";

    fn init(
        &mut self, problem: &mut Problem<O>, mut state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "Levenberg-Marquardt requires an initial parameter vector".to_string(),
        })?;
        let r = problem.apply(&theta)?;
        let cost = half_squared_norm(&r);
        validate_cost(cost)?;
        self.lambda = self.lambda0;
        self.residuals = Some(r);
        self.converged = false;
        Ok((state.param(theta).cost(cost), None))
    }

    fn next_iter(
        &mut self, problem: &mut Problem<O>, mut state: LmState,
    ) -> Result<(LmState, Option<KV>), Error> {
        let theta = state.take_param().ok_or_else(|| ArgminError::NotInitialized {
            text: "Levenberg-Marquardt state lost its parameter vector".to_string(),
        })?;
        let r = match self.residuals.take() {
            Some(r) => r,
            None => problem.apply(&theta)?,
        };
        let cost = half_squared_norm(&r);
        let jac = problem.jacobian(&theta)?;
        let grad: Grad = jac.t().dot(&r);

        if let Some(tol) = self.tol_grad {
            let grad_inf = grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
            if grad_inf <= tol {
                self.residuals = Some(r);
                return Ok((self.finish(state, theta, cost, grad), None));
            }
        }

        let normal = jac.t().dot(&jac);
        for (column, &d) in normal.diag().iter().enumerate() {
            if !d.is_finite() || d <= 0.0 {
                return Err(OptError::SingularNormalMatrix { column }.into());
            }
        }

        loop {
            if self.lambda > LAMBDA_MAX {
                return Err(OptError::DampingExhausted { lambda: self.lambda }.into());
            }
            let Some(delta) = damped_step(&normal, &grad, self.lambda) else {
                self.lambda *= self.lambda_up;
                continue;
            };

            let candidate = &theta + &delta;
            let r_new = match problem.apply(&candidate) {
                Ok(r_new) => r_new,
                Err(e) => match OptError::from(e) {
                    // Trial point left the finite region; treat as a rejected step.
                    OptError::InvalidResidual { .. } => {
                        self.lambda *= self.lambda_up;
                        continue;
                    }
                    other => return Err(other.into()),
                },
            };
            let cost_new = half_squared_norm(&r_new);

            if cost_new < cost {
                let small_drop = self.tol_cost.is_some_and(|tol| cost - cost_new <= tol * cost);
                let small_step = self
                    .tol_step
                    .is_some_and(|tol| delta.l2_norm() <= tol * (1.0 + theta.l2_norm()));
                self.converged = small_drop || small_step;
                self.lambda = (self.lambda / self.lambda_down).max(LAMBDA_MIN);
                self.residuals = Some(r_new);
                return Ok((state.param(candidate).cost(cost_new).gradient(grad), None));
            }
            // A rejected step only signals a plateau while damping is at or
            // below its starting value; heavier damping merely shrinks the step.
            if self.lambda <= self.lambda0
                && self.tol_cost.is_some_and(|tol| (cost_new - cost).abs() <= tol * cost)
            {
                self.residuals = Some(r);
                return Ok((self.finish(state, theta, cost, grad), None));
            }
            self.lambda *= self.lambda_up;
        }
    }

    fn terminate(&mut self, _state: &LmState) -> TerminationStatus {
        if self.converged {
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        } else {
            TerminationStatus::NotTerminated
        }
    }
}

/// Solve `(N + λ·diag N) δ = −g` by Cholesky; `None` if the damped matrix is
/// not numerically positive definite.
fn damped_step(normal: &JacobianMatrix, grad: &Grad, lambda: f64) -> Option<Theta> {
    let n = grad.len();
    let a = DMatrix::from_fn(n, n, |i, j| {
        if i == j { normal[(i, j)] * (1.0 + lambda) } else { normal[(i, j)] }
    });
    let b = DVector::from_iterator(n, grad.iter().map(|g| -g));
    let delta = a.cholesky()?.solve(&b);
    if delta.iter().all(|d| d.is_finite()) {
        Some(Theta::from_iter(delta.iter().copied()))
    } else {
        None
    }
}
