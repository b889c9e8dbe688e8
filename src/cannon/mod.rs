//! cannon — stellar label inference against a trained quadratic spectral model.
//!
//! Purpose
//! -------
//! Given a trained Cannon model (per-pixel coefficients, intrinsic scatter,
//! label pivot) and a set of observed spectra with inverse variances, find
//! for each star the labels whose predicted spectrum best matches the
//! observation in a noise-weighted least-squares sense. Report the labels,
//! their variances, and a chi-square goodness of fit.
//!
//! Key behaviors
//! -------------
//! - [`label_vector`] maps labels to the quadratic feature vector
//!   `[l₀..l_{n-1}, l_i·l_j (i ≤ j)]`.
//! - [`variance`] combines observational noise and model scatter, masking
//!   zero-ivar pixels with a large sentinel sigma.
//! - [`solver::LabelSolver`] fits one star with Levenberg–Marquardt and
//!   derives the covariance from the Jacobian at the solution.
//! - [`driver::infer_labels`] runs every star (optionally on `rayon`),
//!   isolates failures as `-9999.0` rows, and overwrites the dataset's
//!   label table.
//!
//! Invariants & assumptions
//! ------------------------
//! - Labels are fitted relative to the model pivot and returned in absolute
//!   units (pivot added back) for converged stars only.
//! - Per-star failures never abort a batch. Structural (shape) errors abort
//!   before any star is solved.
//!
//! Testing notes
//! -------------
//! - Each submodule carries unit tests; `tests/integration_label_inference.rs`
//!   exercises whole batches including mixed success/failure.
pub mod data;
pub mod driver;
pub mod errors;
pub mod label_vector;
pub mod model;
pub mod observer;
pub mod options;
pub mod solver;
pub mod variance;

pub use self::data::{Dataset, TestSet};
pub use self::driver::{InferenceReport, infer_labels, infer_labels_with};
pub use self::errors::{CannonError, CannonResult};
pub use self::label_vector::{feature_len, label_vector};
pub use self::model::SpectralModel;
pub use self::observer::{InferenceObserver, NoopObserver, TracingObserver};
pub use self::options::InferenceOptions;
pub use self::solver::{
    FAILED_FIT_SENTINEL, InferenceResult, LabelSolver, StarFit, sentinel_covariance,
};
pub use self::variance::{LARGE, SMALL};

pub mod prelude {
    pub use super::{
        CannonError, CannonResult, Dataset, InferenceOptions, InferenceReport, SpectralModel,
        TestSet, infer_labels, infer_labels_with,
    };
}
