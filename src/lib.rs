//! rust_cannon — label inference for stellar spectra with The Cannon.
//!
//! Purpose
//! -------
//! Serve as the crate root for Rust callers and as the PyO3 bridge that
//! exposes label inference to Python via the `_rust_cannon` extension module
//! when the `python-bindings` feature is enabled.
//!
//! Key behaviors
//! -------------
//! - Re-export the core modules: `cannon` (model, dataset, per-star solver,
//!   batch driver), `optimization` (Levenberg–Marquardt on `argmin`), and
//!   `inference` (covariance from the Jacobian).
//! - Define the `infer_labels` `#[pyfunction]` and the `#[pymodule]`
//!   initializer for `_rust_cannon`.
//!
//! Invariants & assumptions
//! ------------------------
//! - All numerical work happens in the inner modules; this file performs only
//!   FFI glue, input conversion, and error mapping.
//! - The GIL is released while stars are being solved.
//!
//! Conventions
//! -----------
//! - Errors from core Rust code are propagated as rich error types internally
//!   and converted to Python `ValueError`s at the PyO3 boundary.
//!
//! Downstream usage
//! ----------------
//! - Native Rust code should depend on [`cannon`] directly and can ignore the
//!   items guarded by the `python-bindings` feature.
//!
//! Testing notes
//! -------------
//! - Core behavior is covered by unit tests in the inner modules and by the
//!   integration tests under `tests/`.

pub mod cannon;
pub mod inference;
pub mod optimization;
pub mod utils;

#[cfg(feature = "python-bindings")]
use numpy::{IntoPyArray, PyArray1, PyArray2};

#[cfg(feature = "python-bindings")]
use pyo3::{prelude::*, types::PyAny};

#[cfg(feature = "python-bindings")]
use crate::{
    cannon::{
        data::Dataset, driver::infer_labels_with, model::SpectralModel,
        observer::TracingObserver,
    },
    utils::{extract_f64_matrix, extract_f64_vector, extract_inference_options},
};

/// Tuple of `(labels, errs, chisq)` NumPy arrays returned to Python.
#[cfg(feature = "python-bindings")]
type PyInferenceOutput<'py> =
    (Bound<'py, PyArray2<f64>>, Bound<'py, PyArray2<f64>>, Bound<'py, PyArray1<f64>>);

/// infer_labels — Python entry point for batch label inference.
///
/// Parameters
/// ----------
/// - `coeffs`: `npixels × (1 + F(nlabels))` model coefficients.
/// - `scatters`: `npixels` intrinsic scatter.
/// - `pivots`: `nlabels` label pivot.
/// - `test_flux`, `test_ivar`: `nstars × npixels` spectra.
/// - `starting_guess`: `nlabels` pivot-relative starting labels.
/// - `max_iter`: optional iteration cap (default 200).
/// - `parallel`: solve stars on the thread pool (default `True`).
///
/// Returns
/// -------
/// `(labels, errs, chisq)` with shapes `(nstars, nlabels)`, `(nstars,
/// nlabels)`, and `(nstars,)`. Failed stars carry `-9999.0` labels.
///
/// Errors
/// ------
/// - `TypeError` for inputs that are not float arrays.
/// - `ValueError` for any shape or value violation.
#[cfg(feature = "python-bindings")]
#[pyfunction]
#[pyo3(
    name = "infer_labels",
    signature = (coeffs, scatters, pivots, test_flux, test_ivar, starting_guess, max_iter = None, parallel = true),
    text_signature = "(coeffs, scatters, pivots, test_flux, test_ivar, starting_guess, /, max_iter=None, parallel=True)"
)]
#[allow(clippy::too_many_arguments)]
fn py_infer_labels<'py>(
    py: Python<'py>, coeffs: &Bound<'py, PyAny>, scatters: &Bound<'py, PyAny>,
    pivots: &Bound<'py, PyAny>, test_flux: &Bound<'py, PyAny>, test_ivar: &Bound<'py, PyAny>,
    starting_guess: &Bound<'py, PyAny>, max_iter: Option<usize>, parallel: bool,
) -> PyResult<PyInferenceOutput<'py>> {
    let coeffs = extract_f64_matrix("coeffs", coeffs)?;
    let scatters = extract_f64_vector("scatters", scatters)?;
    let pivots = extract_f64_vector("pivots", pivots)?;
    let flux = extract_f64_matrix("test_flux", test_flux)?;
    let ivar = extract_f64_matrix("test_ivar", test_ivar)?;
    let guess = extract_f64_vector("starting_guess", starting_guess)?;
    let opts = extract_inference_options(max_iter, parallel)?;

    let model = SpectralModel::new(coeffs, scatters, pivots)?;
    let mut dataset = Dataset::from_spectra(flux, ivar)?;

    let report = py.allow_threads(|| {
        infer_labels_with(&model, &mut dataset, guess.view(), &opts, &TracingObserver)
    })?;

    Ok((
        report.labels.into_pyarray(py),
        report.covariance_diagonals.into_pyarray(py),
        report.chi_squares.into_pyarray(py),
    ))
}

/// _rust_cannon — PyO3 module initializer.
///
/// Registers `infer_labels` on the extension module. Invoked by Python when
/// the compiled extension is imported.
#[cfg(feature = "python-bindings")]
#[pymodule]
fn _rust_cannon<'py>(_py: Python<'py>, m: &Bound<'py, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(py_infer_labels, m)?)?;
    Ok(())
}
