//! cannon::variance — effective per-pixel uncertainty.
//!
//! Combines observational noise (inverse variance) with the model's intrinsic
//! scatter in quadrature. Pixels with zero inverse variance are masked by a
//! large sentinel standard deviation so they contribute almost nothing to a
//! fit without being dropped from it.
use ndarray::{Array1, ArrayView1};

/// Standard deviation assigned to masked (`ivar == 0`) pixels.
pub const LARGE: f64 = 200.0;

/// Reciprocal of [`LARGE`].
pub const SMALL: f64 = 1.0 / LARGE;

/// Effective standard deviation of one pixel.
///
/// - `ivar == 0` gives [`LARGE`] regardless of `scatter`.
/// - otherwise `sqrt(1/ivar + scatter²)`.
pub fn effective_sigma(ivar: f64, scatter: f64) -> f64 {
    if ivar == 0.0 {
        return LARGE;
    }
    (1.0 / ivar + scatter * scatter).sqrt()
}

/// [`effective_sigma`] over a spectrum row. Lengths must match.
pub fn effective_sigmas(ivar: ArrayView1<f64>, scatter: ArrayView1<f64>) -> Array1<f64> {
    Array1::from_iter(ivar.iter().zip(scatter.iter()).map(|(&iv, &s)| effective_sigma(iv, s)))
}
