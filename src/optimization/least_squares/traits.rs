//! Public API surface for weighted nonlinear least squares.
//!
//! - [`LeastSquares`]: trait users implement for their model.
//! - [`LMOptions`] and [`Tolerances`]: configuration for the optimizer.
//! - [`FitOutcome`]: normalized result returned by the high-level `minimize` API.
//!
//! Convention: we *minimize* `c(θ) = ½‖r(θ)‖²` where `r(θ)` are residuals
//! already divided by their per-observation standard deviations. If an
//! analytic Jacobian is provided it must be `∂r/∂θ` of those weighted
//! residuals.
use crate::optimization::{
    errors::{OptError, OptResult},
    least_squares::{
        types::{
            Cost, DEFAULT_LAMBDA0, DEFAULT_LAMBDA_DOWN, DEFAULT_LAMBDA_UP, FnEvalMap, Grad,
            JacobianMatrix, Residuals, Theta,
        },
        validation::{
            TolKind, validate_cost, validate_theta_hat, verify_damping, verify_damping_factor,
            verify_tol,
        },
    },
};
use argmin::core::{TerminationReason, TerminationStatus};
use argmin_math::ArgminL2Norm;

/// User-implemented weighted least-squares interface.
///
/// - `type Data`: per-problem data carried into `residuals`/`jacobian`/`check`.
///
/// Required:
/// - `residuals(&Theta, &Data) -> OptResult<Residuals>`: evaluate the
///   weighted residuals `r(θ)`.
/// - `check(&Theta, &Data) -> OptResult<()>`: validation hook to reject
///   obviously invalid `θ`/`data` pairs. Called once before optimization.
///
/// Optional:
/// - `jacobian(&Theta, &Data) -> OptResult<JacobianMatrix>`: analytic
///   `∂r/∂θ`. If not implemented, central finite differences are used.
pub trait LeastSquares {
    type Data;

    // Required methods
    fn residuals(&self, theta: &Theta, data: &Self::Data) -> OptResult<Residuals>;
    fn check(&self, theta: &Theta, data: &Self::Data) -> OptResult<()>;

    // Optional methods
    fn jacobian(&self, _theta: &Theta, _data: &Self::Data) -> OptResult<JacobianMatrix> {
        Err(OptError::JacobianNotImplemented)
    }
}

/// Numerical tolerances and iteration limits used by the optimizer.
///
/// - `tol_cost`: converge when an accepted step reduces the cost by less
///   than `tol_cost · c(θ)`, or when a rejected step changes it by less than
///   that amount.
/// - `tol_step`: converge when `‖δ‖ ≤ tol_step · (1 + ‖θ‖)`.
/// - `tol_grad`: converge when `‖Jᵀr‖_∞ ≤ tol_grad`.
/// - `max_iter`: hard cap on the number of iterations. Hitting it is a
///   failure, not a convergence.
///
/// Any field can be `None` but **at least one** of the four must be provided
/// (see [`Tolerances::new`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_cost: Option<f64>,
    pub tol_step: Option<f64>,
    pub tol_grad: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    /// Construct validated tolerances.
    ///
    /// # Rules
    /// - At least one of the four fields must be `Some`.
    /// - If provided, tolerances must be **finite and strictly positive**.
    /// - If provided, `max_iter` must be `> 0`.
    ///
    /// # Errors
    /// - [`OptError::NoTolerancesProvided`] if all four are `None`.
    /// - [`OptError::InvalidTolCost`] / [`OptError::InvalidTolStep`] /
    ///   [`OptError::InvalidTolGrad`] for non-finite or non-positive tolerances.
    /// - [`OptError::InvalidMaxIter`] if `max_iter == 0`.
    pub fn new(
        tol_cost: Option<f64>, tol_step: Option<f64>, tol_grad: Option<f64>,
        max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_cost.is_none() && tol_step.is_none() && tol_grad.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol(tol_cost, TolKind::Cost)?;
        verify_tol(tol_step, TolKind::Step)?;
        verify_tol(tol_grad, TolKind::Grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_cost, tol_step, tol_grad, max_iter })
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self { tol_cost: Some(1e-12), tol_step: Some(1e-12), tol_grad: Some(1e-14), max_iter: Some(200) }
    }
}

/// Optimizer-level configuration.
///
/// Fields:
/// - `tols: Tolerances` — numerical tolerances and iteration limits.
/// - `lambda0` — initial Levenberg–Marquardt damping.
/// - `lambda_up` — factor multiplying `λ` after a rejected step.
/// - `lambda_down` — factor dividing `λ` after an accepted step.
///
/// Default:
/// - `tols`: see [`Tolerances::default`]
/// - `lambda0 = 1e-3`, `lambda_up = 10`, `lambda_down = 10`
#[derive(Debug, Clone, PartialEq)]
pub struct LMOptions {
    pub tols: Tolerances,
    pub lambda0: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
}

impl LMOptions {
    /// Create a new set of optimizer options.
    ///
    /// `None` damping settings fall back to the crate defaults.
    ///
    /// # Errors
    /// - [`OptError::InvalidDamping`] if `lambda0` is non-finite or ≤ 0.
    /// - [`OptError::InvalidDampingFactor`] if a factor is non-finite or ≤ 1.
    pub fn new(
        tols: Tolerances, lambda0: Option<f64>, lambda_up: Option<f64>, lambda_down: Option<f64>,
    ) -> OptResult<Self> {
        let lambda0 = lambda0.unwrap_or(DEFAULT_LAMBDA0);
        let lambda_up = lambda_up.unwrap_or(DEFAULT_LAMBDA_UP);
        let lambda_down = lambda_down.unwrap_or(DEFAULT_LAMBDA_DOWN);
        verify_damping(lambda0)?;
        verify_damping_factor(lambda_up)?;
        verify_damping_factor(lambda_down)?;
        Ok(Self { tols, lambda0, lambda_up, lambda_down })
    }
}

impl Default for LMOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            lambda0: DEFAULT_LAMBDA0,
            lambda_up: DEFAULT_LAMBDA_UP,
            lambda_down: DEFAULT_LAMBDA_DOWN,
        }
    }
}

/// Canonical result returned by `minimize`.
///
/// - `theta_hat`: best parameter vector found.
/// - `cost`: best cost `½‖r(θ̂)‖²`.
/// - `status`: human-readable termination status string.
/// - `iterations`: number of optimizer iterations performed.
/// - `fn_evals`: function-evaluation counters reported by `argmin`.
/// - `grad_norm`: norm of the last available gradient `Jᵀr`, if present.
/// - `jacobian`: weighted residual Jacobian evaluated at `theta_hat`.
///
/// A `FitOutcome` only exists for runs whose solver reported convergence;
/// every other termination is an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FitOutcome {
    pub theta_hat: Theta,
    pub cost: Cost,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
    pub jacobian: JacobianMatrix,
}

impl FitOutcome {
    /// Build a validated [`FitOutcome`] from raw solver state.
    ///
    /// Performs:
    /// - termination check: only `SolverConverged` is accepted,
    /// - `theta_hat` check via `validate_theta_hat` (present and all finite),
    /// - `cost` check via `validate_cost` (finite),
    /// - `grad_norm` computation if a gradient was recorded.
    ///
    /// # Errors
    /// - [`OptError::NotConverged`] for any other termination status,
    ///   including the iteration cap.
    /// - Propagates validation errors for `theta_hat` or `cost`.
    pub fn new(
        theta_hat_opt: Option<Theta>, cost: f64, termination: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>, jacobian: JacobianMatrix,
    ) -> OptResult<Self> {
        let iterations = iterations as usize;
        match termination {
            TerminationStatus::Terminated(TerminationReason::SolverConverged) => {}
            TerminationStatus::NotTerminated => {
                return Err(OptError::NotConverged {
                    iterations,
                    status: "Not terminated".to_string(),
                });
            }
            other => {
                return Err(OptError::NotConverged { iterations, status: format!("{other:?}") });
            }
        }
        let theta_hat = validate_theta_hat(theta_hat_opt)?;
        validate_cost(cost)?;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self {
            theta_hat,
            cost,
            status: format!("{:?}", TerminationReason::SolverConverged),
            iterations,
            fn_evals,
            grad_norm,
            jacobian,
        })
    }
}
