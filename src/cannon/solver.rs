//! cannon::solver — weighted nonlinear least-squares fit of one star.
//!
//! Purpose
//! -------
//! Recover the labels of a single star by inverting the spectral model:
//!
//! ```text
//! min_θ Σ_p ((A_p · lvec(θ) − y_p) / σ_p)²
//! ```
//!
//! with `y = flux − c[:, 0]` (pivot-relative target), `A = c[:, 1..]`, and
//! `σ_p` the effective per-pixel standard deviation. The fit is delegated to
//! the Levenberg–Marquardt optimizer with an analytic Jacobian, and the
//! covariance is `(JᵀJ)⁻¹` of the weighted Jacobian (absolute sigma).
//!
//! Key behaviors
//! -------------
//! - Shape violations are returned as `Err(CannonError)` before any work.
//! - Every optimizer or covariance failure becomes [`StarFit::Failed`] with
//!   the reason attached. A failure is never an `Err`.
//! - The chi-square `Σ_p r_p² · ivar_p / (1 + ivar_p · s_p²)` is computed
//!   for converged fits at the fitted labels and for failed fits at the
//!   sentinel labels.
//!
//! Invariants & assumptions
//! ------------------------
//! - Labels in a [`StarFit`] are *pivot-relative*; the driver adds the pivot.
//! - Non-finite flux is only tolerated at masked pixels (`ivar == 0`); it is
//!   replaced by the model offset so the residual there is finite and the
//!   pixel still carries the `LARGE` weight.
//! - Deterministic: no randomness and a fixed summation order.
use crate::{
    cannon::{
        data::validate_spectrum,
        errors::{CannonError, CannonResult},
        label_vector::{label_vector, label_vector_jacobian},
        model::SpectralModel,
        variance::effective_sigmas,
    },
    inference::covariance::{covariance_diagonal, covariance_from_jacobian},
    optimization::{
        errors::{OptError, OptResult},
        least_squares::{JacobianMatrix, LMOptions, LeastSquares, Residuals, Theta, minimize},
    },
};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Value written for labels and covariance entries of a failed fit.
pub const FAILED_FIT_SENTINEL: f64 = -9999.0;

/// Outcome of fitting one star.
#[derive(Debug, Clone, PartialEq)]
pub enum StarFit {
    /// The optimizer converged and the information matrix was invertible.
    Converged {
        /// Pivot-relative labels.
        labels: Array1<f64>,
        /// `nlabels × nlabels` label covariance.
        covariance: Array2<f64>,
        chi_square: f64,
        iterations: usize,
    },
    /// The fit did not produce usable labels.
    Failed { reason: OptError, chi_square: f64 },
}

impl StarFit {
    pub fn is_converged(&self) -> bool {
        matches!(self, StarFit::Converged { .. })
    }

    pub fn chi_square(&self) -> f64 {
        match self {
            StarFit::Converged { chi_square, .. } | StarFit::Failed { chi_square, .. } => {
                *chi_square
            }
        }
    }

    /// Materialize the dense per-star result.
    ///
    /// Converged fits get `pivot` added to their labels. Failed fits produce
    /// [`FAILED_FIT_SENTINEL`] for every label and every entry of the full
    /// `nlabels × nlabels` covariance, with no pivot added.
    pub fn materialize(&self, pivot: ArrayView1<f64>) -> InferenceResult {
        match self {
            StarFit::Converged { labels, covariance, chi_square, .. } => InferenceResult {
                labels: labels + &pivot,
                covariance_diagonal: covariance_diagonal(covariance),
                covariance: covariance.clone(),
                chi_square: *chi_square,
            },
            StarFit::Failed { chi_square, .. } => InferenceResult {
                labels: Array1::from_elem(pivot.len(), FAILED_FIT_SENTINEL),
                covariance_diagonal: Array1::from_elem(pivot.len(), FAILED_FIT_SENTINEL),
                covariance: sentinel_covariance(pivot.len()),
                chi_square: *chi_square,
            },
        }
    }
}

/// Dense per-star result as written into the output tables.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceResult {
    /// Labels with the pivot added back (or sentinel).
    pub labels: Array1<f64>,
    pub covariance_diagonal: Array1<f64>,
    /// Full `nlabels × nlabels` label covariance.
    pub covariance: Array2<f64>,
    pub chi_square: f64,
}

/// `nlabels × nlabels` covariance reported for a failed fit.
pub fn sentinel_covariance(nlabels: usize) -> Array2<f64> {
    Array2::from_elem((nlabels, nlabels), FAILED_FIT_SENTINEL)
}

/// Per-star fitting data: pivot-relative target and effective sigmas.
#[derive(Debug, Clone)]
pub struct PixelData {
    pub target: Array1<f64>,
    pub sigma: Array1<f64>,
}

/// Quadratic label model `A · lvec(θ)` as a least-squares problem.
#[derive(Debug, Clone)]
pub struct QuadraticLabelModel<'m> {
    design: ArrayView2<'m, f64>,
    nlabels: usize,
}

impl<'m> QuadraticLabelModel<'m> {
    pub fn new(model: &'m SpectralModel) -> Self {
        Self { design: model.design(), nlabels: model.nlabels() }
    }

    /// Unweighted residuals `A · lvec(θ) − y`.
    fn raw_residuals(&self, theta: ArrayView1<f64>, target: &Array1<f64>) -> Array1<f64> {
        self.design.dot(&label_vector(theta)) - target
    }
}

impl<'m> LeastSquares for QuadraticLabelModel<'m> {
    type Data = PixelData;

    fn residuals(&self, theta: &Theta, data: &PixelData) -> OptResult<Residuals> {
        Ok(self.raw_residuals(theta.view(), &data.target) / &data.sigma)
    }

    fn check(&self, theta: &Theta, _data: &PixelData) -> OptResult<()> {
        if theta.len() != self.nlabels {
            return Err(OptError::ThetaLengthMismatch {
                expected: self.nlabels,
                actual: theta.len(),
            });
        }
        Ok(())
    }

    fn jacobian(&self, theta: &Theta, data: &PixelData) -> OptResult<JacobianMatrix> {
        let mut jac = self.design.dot(&label_vector_jacobian(theta.view()));
        for (mut row, &s) in jac.axis_iter_mut(Axis(0)).zip(data.sigma.iter()) {
            row /= s;
        }
        Ok(jac)
    }
}

/// Solves one star at a time against a fixed model and options.
#[derive(Debug, Clone)]
pub struct LabelSolver<'m> {
    model: &'m SpectralModel,
    problem: QuadraticLabelModel<'m>,
    opts: LMOptions,
}

impl<'m> LabelSolver<'m> {
    pub fn new(model: &'m SpectralModel, opts: LMOptions) -> Self {
        Self { model, problem: QuadraticLabelModel::new(model), opts }
    }

    pub fn model(&self) -> &SpectralModel {
        self.model
    }

    /// Fit one star's labels.
    ///
    /// Parameters
    /// ----------
    /// - `star`: row index, used only in error reports.
    /// - `flux`, `ivar`: the star's spectrum, length `npixels`.
    /// - `initial_guess`: pivot-relative starting labels, length `nlabels`.
    ///
    /// Returns
    /// -------
    /// `CannonResult<StarFit>`
    ///   `Ok` for both converged and failed fits.
    ///
    /// Errors
    /// ------
    /// - `CannonError::InitialGuessLengthMismatch` /
    ///   `CannonError::NonFiniteInitialGuess` for a bad starting point.
    /// - Any error from [`validate_spectrum`].
    pub fn solve(
        &self, star: usize, flux: ArrayView1<f64>, ivar: ArrayView1<f64>,
        initial_guess: ArrayView1<f64>,
    ) -> CannonResult<StarFit> {
        validate_initial_guess(initial_guess, self.model.nlabels())?;
        validate_spectrum(star, self.model.npixels(), flux, ivar)?;

        let data = self.pixel_data(flux, ivar);
        let fit = minimize(&self.problem, initial_guess.to_owned(), &data, &self.opts)
            .and_then(|out| {
                let covariance = covariance_from_jacobian(&out.jacobian)?;
                Ok((out, covariance))
            });
        Ok(match fit {
            Ok((out, covariance)) => {
                let chi_square = self.chi_square(out.theta_hat.view(), &data.target, ivar);
                StarFit::Converged {
                    labels: out.theta_hat,
                    covariance,
                    chi_square,
                    iterations: out.iterations,
                }
            }
            Err(reason) => {
                let sentinel = Array1::from_elem(self.model.nlabels(), FAILED_FIT_SENTINEL);
                let chi_square = self.chi_square(sentinel.view(), &data.target, ivar);
                StarFit::Failed { reason, chi_square }
            }
        })
    }

    fn pixel_data(&self, flux: ArrayView1<f64>, ivar: ArrayView1<f64>) -> PixelData {
        let offsets = self.model.offsets();
        let target = Array1::from_iter(flux.iter().zip(offsets.iter()).zip(ivar.iter()).map(
            |((&f, &c0), &iv)| if iv == 0.0 && !f.is_finite() { 0.0 } else { f - c0 },
        ));
        let sigma = effective_sigmas(ivar, self.model.scatter());
        PixelData { target, sigma }
    }

    /// `Σ_p (A_p · lvec(θ) − y_p)² · ivar_p / (1 + ivar_p · s_p²)`
    fn chi_square(&self, labels: ArrayView1<f64>, target: &Array1<f64>, ivar: ArrayView1<f64>) -> f64 {
        let resid = self.problem.raw_residuals(labels, target);
        resid
            .iter()
            .zip(ivar.iter())
            .zip(self.model.scatter().iter())
            .map(|((&r, &iv), &s)| r * r * iv / (1.0 + iv * s * s))
            .sum()
    }
}

/// Check a starting label vector against the model's label count.
pub fn validate_initial_guess(guess: ArrayView1<f64>, nlabels: usize) -> CannonResult<()> {
    if guess.len() != nlabels {
        return Err(CannonError::InitialGuessLengthMismatch {
            expected: nlabels,
            actual: guess.len(),
        });
    }
    for (index, &value) in guess.iter().enumerate() {
        if !value.is_finite() {
            return Err(CannonError::NonFiniteInitialGuess { index, value });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cannon::label_vector::feature_len, optimization::least_squares::Tolerances};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-trip recovery of labels from a noiseless synthetic spectrum.
    // - Sentinel output for a degenerate (all-zero) model.
    // - Iteration cap treated as failure.
    // - Precondition errors.
    // - Masked pixels with non-finite flux.
    //
    // They intentionally DO NOT cover:
    // - Aggregation across stars (see `driver` tests).
    // -------------------------------------------------------------------------

    /// Two-label model over 8 pixels with varied linear and quadratic terms.
    fn two_label_coeffs() -> Array2<f64> {
        let npix = 8;
        let mut c = Array2::<f64>::zeros((npix, 1 + feature_len(2)));
        for p in 0..npix {
            let t = p as f64;
            c[[p, 0]] = 1.0;
            c[[p, 1]] = 0.5 + 0.1 * t;
            c[[p, 2]] = -0.3 + 0.05 * t;
            c[[p, 3]] = 0.02 * (p % 3) as f64;
            c[[p, 4]] = 0.01 * ((p + 1) % 2) as f64;
            c[[p, 5]] = -0.015 * (p % 4) as f64;
        }
        c
    }

    fn two_label_model() -> SpectralModel {
        SpectralModel::new(two_label_coeffs(), Array1::zeros(8), array![0.0, 0.0]).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // A noiseless spectrum generated from known labels is inverted exactly.
    //
    // Given
    // -----
    // - Flux = model(0.4, −0.25), ivar = 1, scatter = 0, start at (0, 0).
    //
    // Expect
    // ------
    // - Labels within 1e-6, chi-square ≈ 0, finite positive variances.
    fn round_trip_recovers_labels() {
        // Arrange
        let model = two_label_model();
        let truth = array![0.4, -0.25];
        let flux = model.predict_flux(truth.view());
        let ivar = Array1::<f64>::ones(8);
        let solver = LabelSolver::new(&model, LMOptions::default());

        // Act
        let fit = solver.solve(0, flux.view(), ivar.view(), array![0.0, 0.0].view()).unwrap();

        // Assert
        match fit {
            StarFit::Converged { labels, covariance, chi_square, .. } => {
                assert_abs_diff_eq!(labels[0], 0.4, epsilon = 1e-6);
                assert_abs_diff_eq!(labels[1], -0.25, epsilon = 1e-6);
                assert!(chi_square < 1e-10);
                assert!(covariance[[0, 0]] > 0.0 && covariance[[1, 1]] > 0.0);
            }
            other => panic!("Expected convergence, got {other:?}"),
        }
    }

    #[test]
    // Purpose
    // -------
    // A model whose coefficients do not depend on the labels is a failure,
    // and materializes as the sentinel everywhere.
    //
    // Given
    // -----
    // - Coefficients all zero except the offset column; nonzero flux.
    //
    // Expect
    // ------
    // - `StarFit::Failed`; materialized labels, variances, and the full 2×2
    //   covariance are −9999; the chi-square is finite.
    fn degenerate_model_yields_sentinel() {
        let mut c = Array2::<f64>::zeros((8, 1 + feature_len(2)));
        c.column_mut(0).fill(1.0);
        let model = SpectralModel::new(c, Array1::zeros(8), array![5.0, 1.0]).unwrap();
        let solver = LabelSolver::new(&model, LMOptions::default());
        let flux = Array1::from_elem(8, 1.5);
        let ivar = Array1::<f64>::ones(8);

        let fit = solver.solve(0, flux.view(), ivar.view(), array![0.0, 0.0].view()).unwrap();

        assert!(!fit.is_converged());
        let out = fit.materialize(model.pivot());
        assert_eq!(out.labels, array![FAILED_FIT_SENTINEL, FAILED_FIT_SENTINEL]);
        assert_eq!(out.covariance_diagonal, array![FAILED_FIT_SENTINEL, FAILED_FIT_SENTINEL]);
        assert_eq!(out.covariance.dim(), (2, 2));
        assert!(out.covariance.iter().all(|&v| v == FAILED_FIT_SENTINEL));
        assert_abs_diff_eq!(out.chi_square, 8.0 * 0.25, epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is a failure, not a partial result.
    //
    // Given
    // -----
    // - The round-trip problem with `max_iter = 1`.
    //
    // Expect
    // ------
    // - `StarFit::Failed` with `NotConverged`.
    fn iteration_cap_is_failure() {
        let model = two_label_model();
        let flux = model.predict_flux(array![0.4, -0.25].view());
        let ivar = Array1::<f64>::ones(8);
        let tols = Tolerances::new(Some(1e-12), Some(1e-12), Some(1e-14), Some(1)).unwrap();
        let opts = LMOptions::new(tols, None, None, None).unwrap();
        let solver = LabelSolver::new(&model, opts);

        let fit = solver.solve(0, flux.view(), ivar.view(), array![0.0, 0.0].view()).unwrap();

        assert!(matches!(
            fit,
            StarFit::Failed { reason: OptError::NotConverged { .. }, .. }
        ));
    }

    #[test]
    // Purpose
    // -------
    // Shape violations are errors, not failed fits.
    //
    // Given
    // -----
    // - A 3-entry initial guess for a 2-label model, then a 7-pixel flux.
    //
    // Expect
    // ------
    // - `InitialGuessLengthMismatch`, then `SpectrumLengthMismatch`.
    fn preconditions_are_errors() {
        let model = two_label_model();
        let solver = LabelSolver::new(&model, LMOptions::default());
        let flux = Array1::<f64>::ones(8);
        let ivar = Array1::<f64>::ones(8);
        assert_eq!(
            solver.solve(0, flux.view(), ivar.view(), array![0.0, 0.0, 0.0].view()),
            Err(CannonError::InitialGuessLengthMismatch { expected: 2, actual: 3 })
        );
        let short = Array1::<f64>::ones(7);
        assert_eq!(
            solver.solve(4, short.view(), ivar.view(), array![0.0, 0.0].view()),
            Err(CannonError::SpectrumLengthMismatch { star: 4, expected: 8, actual: 7 })
        );
    }

    #[test]
    // Purpose
    // -------
    // A masked pixel with NaN flux does not disturb the fit or chi-square.
    //
    // Given
    // -----
    // - The round-trip spectrum with pixel 3 set to NaN and `ivar[3] = 0`.
    //
    // Expect
    // ------
    // - Convergence near the true labels and a finite chi-square.
    fn masked_nan_flux_is_ignored() {
        let model = two_label_model();
        let mut flux = model.predict_flux(array![0.4, -0.25].view());
        let mut ivar = Array1::<f64>::ones(8);
        flux[3] = f64::NAN;
        ivar[3] = 0.0;
        let solver = LabelSolver::new(&model, LMOptions::default());

        let fit = solver.solve(0, flux.view(), ivar.view(), array![0.0, 0.0].view()).unwrap();

        match fit {
            StarFit::Converged { labels, chi_square, .. } => {
                assert_abs_diff_eq!(labels[0], 0.4, epsilon = 1e-3);
                assert_abs_diff_eq!(labels[1], -0.25, epsilon = 1e-3);
                assert!(chi_square.is_finite());
            }
            other => panic!("Expected convergence, got {other:?}"),
        }
    }
}
