//! utils — Python argument conversion for the PyO3 bindings.
//!
//! Accepts NumPy arrays, pandas objects (via `to_numpy`), or plain nested
//! sequences of floats, and converts them to owned `ndarray` buffers so the
//! heavy work can run with the GIL released.
#[cfg(feature = "python-bindings")]
use ndarray::{Array1, Array2};

#[cfg(feature = "python-bindings")]
use pyo3::{
    exceptions::{PyTypeError, PyValueError},
    prelude::*,
    types::PyAny,
};

#[cfg(feature = "python-bindings")]
use numpy::{PyReadonlyArray1, PyReadonlyArray2};

#[cfg(feature = "python-bindings")]
use crate::cannon::options::InferenceOptions;

/// Convert a 1-D array-like of `float64` into an owned [`Array1`].
///
/// Errors
/// ------
/// - `TypeError` when the object is not a NumPy array, pandas Series, or
///   sequence of floats.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_vector<'py>(name: &str, raw: &Bound<'py, PyAny>) -> PyResult<Array1<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray1<f64>>() {
        return Ok(arr.as_array().to_owned());
    }

    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray1<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }

    let vec: Vec<f64> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name}: expected a 1-D numpy.ndarray, pandas.Series, or sequence of float64"
        ))
    })?;
    Ok(Array1::from(vec))
}

/// Convert a 2-D array-like of `float64` into an owned [`Array2`].
///
/// Errors
/// ------
/// - `TypeError` when the object is not a NumPy array, pandas DataFrame, or
///   nested sequence of floats.
/// - `ValueError` when a nested sequence is ragged.
#[cfg(feature = "python-bindings")]
pub fn extract_f64_matrix<'py>(name: &str, raw: &Bound<'py, PyAny>) -> PyResult<Array2<f64>> {
    if let Ok(arr) = raw.extract::<PyReadonlyArray2<f64>>() {
        return Ok(arr.as_array().to_owned());
    }

    if let Ok(obj) = raw.call_method("to_numpy", (false,), None) {
        if let Ok(arr) = obj.extract::<PyReadonlyArray2<f64>>() {
            return Ok(arr.as_array().to_owned());
        }
    }

    let rows: Vec<Vec<f64>> = raw.extract().map_err(|_| {
        PyTypeError::new_err(format!(
            "{name}: expected a 2-D numpy.ndarray, pandas.DataFrame, or nested sequence of float64"
        ))
    })?;
    let ncols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != ncols) {
        return Err(PyValueError::new_err(format!("{name}: rows must all have the same length")));
    }
    let nrows = rows.len();
    let flat: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((nrows, ncols), flat)
        .map_err(|e| PyValueError::new_err(format!("{name}: {e}")))
}

/// Build [`InferenceOptions`] from the optional Python keyword arguments.
///
/// Errors
/// ------
/// - `ValueError` when `max_iter == 0`.
#[cfg(feature = "python-bindings")]
pub fn extract_inference_options(
    max_iter: Option<usize>, parallel: bool,
) -> PyResult<InferenceOptions> {
    let opts = match max_iter {
        Some(n) => InferenceOptions::with_max_iter(n)?,
        None => InferenceOptions::default(),
    };
    Ok(InferenceOptions { parallel, ..opts })
}
