//! cannon::driver — label inference over every star of a test set.
//!
//! Purpose
//! -------
//! Run the [`LabelSolver`] for each star of a [`TestSet`], collect the
//! per-star fits, materialize the dense output tables (pivot added back,
//! sentinel for failures), and overwrite the dataset's label table once.
//!
//! Key behaviors
//! -------------
//! - All shape checks (model vs. dataset pixel count, initial-guess length,
//!   label-table shape, every spectrum row) run before any star is solved.
//!   Any violation is returned as `Err` and the dataset is left untouched.
//! - Stars are independent. With `InferenceOptions::parallel` they are
//!   solved on the `rayon` pool; otherwise sequentially. Both paths collect
//!   into star order and produce identical results.
//! - A failed star never aborts the batch; it is recorded as
//!   [`StarFit::Failed`] and written as `-9999.0`.
//!
//! Conventions
//! -----------
//! - Output row `i` corresponds to dataset row `i`.
//! - Logging is left to the injected [`InferenceObserver`].
use crate::cannon::{
    data::{TestSet, validate_spectrum},
    errors::{CannonError, CannonResult},
    model::SpectralModel,
    observer::{InferenceObserver, NoopObserver},
    options::InferenceOptions,
    solver::{LabelSolver, StarFit, validate_initial_guess},
};
use ndarray::{Array1, Array2, ArrayView1};
use rayon::prelude::*;

/// Aggregated result of a label-inference run.
///
/// Fields
/// ------
/// - `labels`: `nstars × nlabels`, pivot added back; `-9999.0` rows for
///   failed stars. This is the table written into the dataset.
/// - `covariance_diagonals`: `nstars × nlabels` label variances.
/// - `chi_squares`: `nstars` chi-square values.
/// - `fits`: per-star tagged outcomes, in star order.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceReport {
    pub labels: Array2<f64>,
    pub covariance_diagonals: Array2<f64>,
    pub chi_squares: Array1<f64>,
    pub fits: Vec<StarFit>,
}

impl InferenceReport {
    pub fn nstars(&self) -> usize {
        self.fits.len()
    }

    pub fn n_failed(&self) -> usize {
        self.fits.iter().filter(|f| !f.is_converged()).count()
    }

    /// Indices of stars whose fit failed.
    pub fn failed_stars(&self) -> Vec<usize> {
        self.fits.iter().enumerate().filter(|(_, f)| !f.is_converged()).map(|(i, _)| i).collect()
    }
}

/// infer_labels_with — full label inference with an explicit observer.
///
/// Parameters
/// ----------
/// - `model`: trained [`SpectralModel`].
/// - `dataset`: test set; its label table is overwritten on success.
/// - `initial_guess`: pivot-relative starting labels shared by every star.
/// - `opts`: solver options and parallelism switch.
/// - `observer`: receives start / per-star / finish events.
///
/// Returns
/// -------
/// `CannonResult<InferenceReport>`
///
/// Errors
/// ------
/// - `CannonError::SpectrumLengthMismatch` when the dataset's pixel count
///   differs from the model's (reported for star 0), or any other
///   [`validate_spectrum`] error for the first bad row.
/// - `CannonError::StarCountMismatch` when flux and ivar disagree in rows.
/// - `CannonError::InitialGuessLengthMismatch` /
///   `CannonError::NonFiniteInitialGuess`.
/// - `CannonError::LabelTableShapeMismatch` when the dataset would reject an
///   `nstars × nlabels` table.
pub fn infer_labels_with<D, O>(
    model: &SpectralModel, dataset: &mut D, initial_guess: ArrayView1<f64>,
    opts: &InferenceOptions, observer: &O,
) -> CannonResult<InferenceReport>
where
    D: TestSet + ?Sized,
    O: InferenceObserver + ?Sized,
{
    let nlabels = model.nlabels();
    let npixels = model.npixels();
    validate_initial_guess(initial_guess, nlabels)?;

    let flux = dataset.test_flux();
    let ivar = dataset.test_ivar();
    let nstars = flux.nrows();
    if ivar.nrows() != nstars {
        return Err(CannonError::StarCountMismatch { flux_rows: nstars, ivar_rows: ivar.nrows() });
    }
    for star in 0..nstars {
        validate_spectrum(star, npixels, flux.row(star), ivar.row(star))?;
    }
    dataset.check_label_table((nstars, nlabels))?;

    observer.on_start(nstars, nlabels);
    let solver = LabelSolver::new(model, opts.lm.clone());
    let solve_star = |star: usize| -> CannonResult<StarFit> {
        let fit = solver.solve(star, flux.row(star), ivar.row(star), initial_guess)?;
        observer.on_star(star, &fit);
        Ok(fit)
    };
    let fits: Vec<StarFit> = if opts.parallel {
        (0..nstars).into_par_iter().map(solve_star).collect::<CannonResult<_>>()?
    } else {
        (0..nstars).map(solve_star).collect::<CannonResult<_>>()?
    };

    let report = aggregate(model, fits);
    observer.on_finish(nstars, report.n_failed());
    dataset.set_test_label_vals(report.labels.clone())?;
    Ok(report)
}

/// infer_labels — label inference returning `(covariance_diagonals, chi_squares)`.
///
/// Thin wrapper over [`infer_labels_with`] with default options and no
/// observer. The inferred labels are written into `dataset`.
///
/// # Errors
/// Same as [`infer_labels_with`].
pub fn infer_labels<D: TestSet + ?Sized>(
    model: &SpectralModel, dataset: &mut D, initial_guess: ArrayView1<f64>,
) -> CannonResult<(Array2<f64>, Array1<f64>)> {
    let report =
        infer_labels_with(model, dataset, initial_guess, &InferenceOptions::default(), &NoopObserver)?;
    Ok((report.covariance_diagonals, report.chi_squares))
}

// ---- Helper methods ----

fn aggregate(model: &SpectralModel, fits: Vec<StarFit>) -> InferenceReport {
    let nstars = fits.len();
    let nlabels = model.nlabels();
    let mut labels = Array2::<f64>::zeros((nstars, nlabels));
    let mut covariance_diagonals = Array2::<f64>::zeros((nstars, nlabels));
    let mut chi_squares = Array1::<f64>::zeros(nstars);
    for (star, fit) in fits.iter().enumerate() {
        let out = fit.materialize(model.pivot());
        labels.row_mut(star).assign(&out.labels);
        covariance_diagonals.row_mut(star).assign(&out.covariance_diagonal);
        chi_squares[star] = out.chi_square;
    }
    InferenceReport { labels, covariance_diagonals, chi_squares, fits }
}
