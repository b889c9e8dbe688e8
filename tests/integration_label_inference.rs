//! Integration tests for batch label inference.
//!
//! Purpose
//! -------
//! - Validate the end-to-end path from a trained model and a set of spectra,
//!   through per-star Levenberg–Marquardt fits, to the aggregated label,
//!   variance, and chi-square tables written back into the dataset.
//!
//! Coverage
//! --------
//! - `cannon::model::SpectralModel` with a non-trivial pivot.
//! - `cannon::driver`:
//!   - Recovery of known labels over several stars.
//!   - Isolation of a failing star inside a batch and full overwrite of a
//!     pre-existing label table.
//!   - Determinism and parallel/sequential agreement.
//!   - Upfront shape errors.
//! - `cannon::data::TestSet` implemented by a caller-defined container.
//!
//! Exclusions
//! ----------
//! - Low-level building blocks (label vector, variance, LM solver internals,
//!   covariance) are covered by unit tests.
//! - Python bindings.
use approx::assert_abs_diff_eq;
use ndarray::{Array1, Array2, ArrayView2, array};
use rust_cannon::cannon::{
    CannonError, CannonResult, Dataset, FAILED_FIT_SENTINEL, InferenceOptions, SpectralModel,
    StarFit, TestSet, TracingObserver, feature_len, infer_labels, infer_labels_with,
};

const NPIX: usize = 12;

/// Purpose
/// -------
/// Two-label model over `NPIX` pixels with distinct linear responses and
/// small quadratic terms, pivoted at a realistic (Teff, logg).
///
/// Invariants
/// ----------
/// - The linear columns are independent, so the information matrix is
///   nonsingular near the pivot.
fn two_label_model() -> SpectralModel {
    let mut c = Array2::<f64>::zeros((NPIX, 1 + feature_len(2)));
    for p in 0..NPIX {
        let t = p as f64 / NPIX as f64;
        c[[p, 0]] = 1.0 - 0.1 * t;
        c[[p, 1]] = 0.6 * (1.0 - t);
        c[[p, 2]] = -0.4 + 0.8 * t * t;
        c[[p, 3]] = 0.03 * t;
        c[[p, 4]] = -0.02 + 0.01 * t;
        c[[p, 5]] = 0.015 * (1.0 - t);
    }
    SpectralModel::new(c, Array1::from_elem(NPIX, 0.01), array![4500.0, 2.5]).unwrap()
}

/// Noiseless spectra for the given pivot-relative labels, one row per star.
fn spectra_for(model: &SpectralModel, labels: &[[f64; 2]]) -> Array2<f64> {
    let mut flux = Array2::<f64>::zeros((labels.len(), NPIX));
    for (star, l) in labels.iter().enumerate() {
        flux.row_mut(star).assign(&model.predict_flux(array![l[0], l[1]].view()));
    }
    flux
}

#[test]
// Purpose
// -------
// Known labels are recovered for every star and reported in absolute units.
//
// Given
// -----
// - Four stars at pivot-relative labels spread around the pivot, unit ivar,
//   small intrinsic scatter.
//
// Expect
// ------
// - Label table ≈ pivot + truth within 1e-6 for every star.
// - Chi-square ≈ 0 and finite positive variances.
fn recovers_labels_for_every_star() {
    // Arrange
    let model = two_label_model();
    let truth = [[0.3, -0.2], [-0.25, 0.15], [0.05, 0.35], [0.0, 0.0]];
    let flux = spectra_for(&model, &truth);
    let mut ds = Dataset::from_spectra(flux, Array2::ones((truth.len(), NPIX))).unwrap();

    // Act
    let (errs, chisq) = infer_labels(&model, &mut ds, array![0.0, 0.0].view()).unwrap();

    // Assert
    let table = ds.label_vals().unwrap();
    for (star, l) in truth.iter().enumerate() {
        assert_abs_diff_eq!(table[[star, 0]], 4500.0 + l[0], epsilon = 1e-6);
        assert_abs_diff_eq!(table[[star, 1]], 2.5 + l[1], epsilon = 1e-6);
        assert!(chisq[star] < 1e-10);
        assert!(errs.row(star).iter().all(|&v| v.is_finite() && v > 0.0));
    }
}

#[test]
// Purpose
// -------
// A star that fails to converge is isolated: its neighbours still succeed
// and the whole pre-existing label table is replaced.
//
// Given
// -----
// - An iteration cap of one. Stars 0 and 2 sit exactly at the starting
//   point and converge on the first iteration; star 1 is far from it and
//   cannot.
// - The dataset already holds a label table filled with 7.0.
//
// Expect
// ------
// - Rows 0 and 2 equal the pivot; row 1 is the sentinel, not pivot-shifted.
// - No 7.0 survives; the report lists star 1 as the only failure.
fn failing_star_is_isolated_and_table_is_overwritten() {
    // Arrange
    let model = two_label_model();
    let flux = spectra_for(&model, &[[0.0, 0.0], [0.45, -0.4], [0.0, 0.0]]);
    let mut ds = Dataset::from_spectra(flux, Array2::ones((3, NPIX))).unwrap();
    ds.set_test_label_vals(Array2::from_elem((3, 2), 7.0)).unwrap();
    let opts = InferenceOptions::with_max_iter(1).unwrap();

    // Act
    let report =
        infer_labels_with(&model, &mut ds, array![0.0, 0.0].view(), &opts, &TracingObserver)
            .unwrap();

    // Assert
    let table = ds.label_vals().unwrap();
    assert_eq!(table.row(0), array![4500.0, 2.5]);
    assert_eq!(table.row(1), array![FAILED_FIT_SENTINEL, FAILED_FIT_SENTINEL]);
    assert_eq!(table.row(2), array![4500.0, 2.5]);
    assert!(table.iter().all(|&v| v != 7.0));
    assert_eq!(report.failed_stars(), vec![1]);
    assert!(matches!(report.fits[1], StarFit::Failed { .. }));
    assert_eq!(report.covariance_diagonals.row(1), array![FAILED_FIT_SENTINEL, FAILED_FIT_SENTINEL]);
    assert!(report.chi_squares[1].is_finite() && report.chi_squares[1] > 0.0);
}

#[test]
// Purpose
// -------
// Inference is deterministic and independent of the execution mode.
//
// Given
// -----
// - Six stars with masked pixels carrying NaN flux in one of them.
//
// Expect
// ------
// - Two parallel runs and one sequential run produce identical reports.
fn parallel_and_sequential_runs_agree() {
    // Arrange
    let model = two_label_model();
    let truth = [[0.1, 0.1], [-0.2, 0.3], [0.35, -0.05], [0.0, -0.3], [0.2, 0.2], [-0.1, -0.1]];
    let mut flux = spectra_for(&model, &truth);
    let mut ivar = Array2::<f64>::ones((truth.len(), NPIX));
    flux[[4, 3]] = f64::NAN;
    ivar[[4, 3]] = 0.0;
    let guess = array![0.0, 0.0];

    // Act
    let mut ds_a = Dataset::from_spectra(flux.clone(), ivar.clone()).unwrap();
    let mut ds_b = ds_a.clone();
    let mut ds_c = ds_a.clone();
    let par = InferenceOptions::default();
    let seq = InferenceOptions::default().sequential();
    let a = infer_labels_with(&model, &mut ds_a, guess.view(), &par, &TracingObserver).unwrap();
    let b = infer_labels_with(&model, &mut ds_b, guess.view(), &par, &TracingObserver).unwrap();
    let c = infer_labels_with(&model, &mut ds_c, guess.view(), &seq, &TracingObserver).unwrap();

    // Assert
    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(ds_a.label_vals(), ds_c.label_vals());
    assert_eq!(a.n_failed(), 0);
    assert_abs_diff_eq!(a.labels[[2, 0]], 4500.35, epsilon = 1e-6);
}

#[test]
// Purpose
// -------
// Structural mismatches abort the batch before any star is solved.
//
// Given
// -----
// - A 1-label initial guess for a 2-label model.
// - Spectra one pixel shorter than the model.
//
// Expect
// ------
// - The matching `CannonError`; label table untouched.
fn shape_mismatches_abort_upfront() {
    let model = two_label_model();
    let mut ds = Dataset::from_spectra(Array2::ones((2, NPIX)), Array2::ones((2, NPIX))).unwrap();
    assert_eq!(
        infer_labels(&model, &mut ds, array![0.0].view()),
        Err(CannonError::InitialGuessLengthMismatch { expected: 2, actual: 1 })
    );
    assert!(ds.label_vals().is_none());

    let mut short =
        Dataset::from_spectra(Array2::ones((2, NPIX - 1)), Array2::ones((2, NPIX - 1))).unwrap();
    assert_eq!(
        infer_labels(&model, &mut short, array![0.0, 0.0].view()),
        Err(CannonError::SpectrumLengthMismatch { star: 0, expected: NPIX, actual: NPIX - 1 })
    );
    assert!(short.label_vals().is_none());
}

/// Caller-owned container that stores inferred labels as plain rows.
struct Catalogue {
    flux: Array2<f64>,
    ivar: Array2<f64>,
    labels: Vec<Vec<f64>>,
}

impl TestSet for Catalogue {
    fn test_flux(&self) -> ArrayView2<'_, f64> {
        self.flux.view()
    }

    fn test_ivar(&self) -> ArrayView2<'_, f64> {
        self.ivar.view()
    }

    fn set_test_label_vals(&mut self, labels: Array2<f64>) -> CannonResult<()> {
        self.labels = labels.rows().into_iter().map(|r| r.to_vec()).collect();
        Ok(())
    }
}

#[test]
// Purpose
// -------
// Any `TestSet` implementation can receive the inferred labels.
//
// Given
// -----
// - A caller-defined container with two stars.
//
// Expect
// ------
// - Its label rows hold the absolute labels.
fn custom_test_set_receives_labels() {
    let model = two_label_model();
    let flux = spectra_for(&model, &[[0.2, -0.1], [-0.15, 0.05]]);
    let mut cat = Catalogue { flux, ivar: Array2::ones((2, NPIX)), labels: Vec::new() };

    infer_labels(&model, &mut cat, array![0.0, 0.0].view()).unwrap();

    assert_eq!(cat.labels.len(), 2);
    assert_abs_diff_eq!(cat.labels[0][0], 4500.2, epsilon = 1e-6);
    assert_abs_diff_eq!(cat.labels[1][1], 2.55, epsilon = 1e-6);
}
