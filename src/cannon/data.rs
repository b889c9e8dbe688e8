//! cannon::data — test-set spectra and the label table inference writes.
//!
//! Purpose
//! -------
//! Define the dataset seam the inference driver depends on ([`TestSet`]) and
//! a concrete, validated container for it ([`Dataset`]). The driver reads
//! flux and inverse-variance tables and writes back one label table; it
//! never needs anything else from a dataset.
//!
//! Key behaviors
//! -------------
//! - [`Dataset::new`] enforces matching flux/ivar shapes, a consistent star
//!   id count, finite nonnegative inverse variances, and finite flux at
//!   every weighted pixel.
//! - [`TestSet::set_test_label_vals`] replaces the label table wholesale
//!   after checking its shape.
//!
//! Invariants & assumptions
//! ------------------------
//! - Row `i` of `flux`, `ivar`, and the label table all refer to star `i`.
//! - Flux at masked pixels (`ivar == 0`) may be NaN/±inf; those pixels are
//!   down-weighted by the solver and never inspected.
//!
//! Testing notes
//! -------------
//! - Unit tests cover construction failures and the label-table shape guard.
use crate::cannon::errors::{CannonError, CannonResult};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Dataset seam used by label inference.
pub trait TestSet {
    /// `nstars × npixels` flux table.
    fn test_flux(&self) -> ArrayView2<'_, f64>;

    /// `nstars × npixels` inverse-variance table.
    fn test_ivar(&self) -> ArrayView2<'_, f64>;

    /// Replace the inferred-label table with `labels` (`nstars × nlabels`).
    fn set_test_label_vals(&mut self, labels: Array2<f64>) -> CannonResult<()>;

    /// Check that a label table of `shape` would be accepted by
    /// [`TestSet::set_test_label_vals`], without writing anything.
    fn check_label_table(&self, shape: (usize, usize)) -> CannonResult<()> {
        let nstars = self.test_flux().nrows();
        if shape.0 != nstars {
            return Err(CannonError::LabelTableShapeMismatch {
                expected: (nstars, shape.1),
                actual: shape,
            });
        }
        Ok(())
    }
}

/// Validate one star's spectrum against a pixel count.
///
/// Errors
/// ------
/// - `CannonError::SpectrumLengthMismatch` when either row has the wrong
///   length.
/// - `CannonError::InvalidIvar` for a NaN, infinite, or negative inverse
///   variance.
/// - `CannonError::NonFiniteFlux` for a non-finite flux at a pixel with
///   `ivar > 0`.
pub fn validate_spectrum(
    star: usize, npixels: usize, flux: ArrayView1<f64>, ivar: ArrayView1<f64>,
) -> CannonResult<()> {
    for len in [flux.len(), ivar.len()] {
        if len != npixels {
            return Err(CannonError::SpectrumLengthMismatch { star, expected: npixels, actual: len });
        }
    }
    for (pixel, (&f, &iv)) in flux.iter().zip(ivar.iter()).enumerate() {
        if !iv.is_finite() || iv < 0.0 {
            return Err(CannonError::InvalidIvar { star, pixel, value: iv });
        }
        if iv > 0.0 && !f.is_finite() {
            return Err(CannonError::NonFiniteFlux { star, pixel, value: f });
        }
    }
    Ok(())
}

/// `Dataset` — spectra of stars whose labels are to be inferred.
///
/// Fields
/// ------
/// - `ids`: one identifier per star (row).
/// - `label_names`: names of the inferred labels, in model order. May be
///   empty, in which case any label count is accepted.
/// - `flux`, `ivar`: `nstars × npixels` tables.
/// - `label_vals`: the inferred label table, `None` until inference runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    ids: Vec<String>,
    label_names: Vec<String>,
    flux: Array2<f64>,
    ivar: Array2<f64>,
    label_vals: Option<Array2<f64>>,
}

impl Dataset {
    /// Construct a validated dataset.
    ///
    /// Errors
    /// ------
    /// - `CannonError::StarCountMismatch` / `CannonError::PixelCountMismatch`
    ///   when flux and ivar disagree in shape.
    /// - `CannonError::IdCountMismatch` when `ids.len() != nstars`.
    /// - Any error from [`validate_spectrum`] for the first bad row.
    pub fn new(
        ids: Vec<String>, label_names: Vec<String>, flux: Array2<f64>, ivar: Array2<f64>,
    ) -> CannonResult<Self> {
        if flux.nrows() != ivar.nrows() {
            return Err(CannonError::StarCountMismatch {
                flux_rows: flux.nrows(),
                ivar_rows: ivar.nrows(),
            });
        }
        if flux.ncols() != ivar.ncols() {
            return Err(CannonError::PixelCountMismatch {
                flux_cols: flux.ncols(),
                ivar_cols: ivar.ncols(),
            });
        }
        if ids.len() != flux.nrows() {
            return Err(CannonError::IdCountMismatch { expected: flux.nrows(), actual: ids.len() });
        }
        let npixels = flux.ncols();
        for (star, (f, iv)) in flux.rows().into_iter().zip(ivar.rows()).enumerate() {
            validate_spectrum(star, npixels, f, iv)?;
        }
        Ok(Self { ids, label_names, flux, ivar, label_vals: None })
    }

    /// Build a dataset with generated ids `"0"`, `"1"`, ... and no label names.
    pub fn from_spectra(flux: Array2<f64>, ivar: Array2<f64>) -> CannonResult<Self> {
        let ids = (0..flux.nrows()).map(|i| i.to_string()).collect();
        Self::new(ids, Vec::new(), flux, ivar)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn nstars(&self) -> usize {
        self.flux.nrows()
    }

    pub fn npixels(&self) -> usize {
        self.flux.ncols()
    }

    /// Inferred labels, once written.
    pub fn label_vals(&self) -> Option<ArrayView2<'_, f64>> {
        self.label_vals.as_ref().map(|l| l.view())
    }

    /// Move the inferred label table out, leaving `None`.
    pub fn take_label_vals(&mut self) -> Option<Array2<f64>> {
        self.label_vals.take()
    }
}

impl TestSet for Dataset {
    fn test_flux(&self) -> ArrayView2<'_, f64> {
        self.flux.view()
    }

    fn test_ivar(&self) -> ArrayView2<'_, f64> {
        self.ivar.view()
    }

    fn set_test_label_vals(&mut self, labels: Array2<f64>) -> CannonResult<()> {
        self.check_label_table(labels.dim())?;
        self.label_vals = Some(labels);
        Ok(())
    }

    fn check_label_table(&self, shape: (usize, usize)) -> CannonResult<()> {
        let expected_cols = if self.label_names.is_empty() { shape.1 } else { self.label_names.len() };
        let expected = (self.nstars(), expected_cols);
        if shape != expected {
            return Err(CannonError::LabelTableShapeMismatch { expected, actual: shape });
        }
        Ok(())
    }
}
