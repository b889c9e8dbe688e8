//! cannon::options — configuration for label inference.
use crate::{
    cannon::errors::CannonResult,
    optimization::least_squares::{LMOptions, Tolerances},
};

/// Configuration for a label-inference run.
///
/// Fields
/// ------
/// - `lm`: Levenberg–Marquardt options used for every star.
/// - `parallel`: solve stars concurrently on the `rayon` pool when `true`.
///   Results are identical either way.
///
/// Default: [`LMOptions::default`] and `parallel = true`.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOptions {
    pub lm: LMOptions,
    pub parallel: bool,
}

impl InferenceOptions {
    pub fn new(lm: LMOptions, parallel: bool) -> Self {
        Self { lm, parallel }
    }

    /// Default options with a different iteration cap.
    ///
    /// # Errors
    /// - `CannonError::InvalidOptions` wrapping `OptError::InvalidMaxIter`
    ///   when `max_iter == 0`.
    pub fn with_max_iter(max_iter: usize) -> CannonResult<Self> {
        let d = Tolerances::default();
        let tols = Tolerances::new(d.tol_cost, d.tol_step, d.tol_grad, Some(max_iter))?;
        Ok(Self { lm: LMOptions { tols, ..LMOptions::default() }, parallel: true })
    }

    /// Same options, sequential execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for InferenceOptions {
    fn default() -> Self {
        Self { lm: LMOptions::default(), parallel: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cannon::errors::CannonError, optimization::errors::OptError};

    #[test]
    // Purpose
    // -------
    // An iteration cap of zero is rejected; a positive cap is wired through.
    //
    // Given
    // -----
    // - `with_max_iter(0)` and `with_max_iter(7)`.
    //
    // Expect
    // ------
    // - `InvalidOptions(InvalidMaxIter)`, then `max_iter == Some(7)`.
    fn with_max_iter_validates_cap() {
        assert!(matches!(
            InferenceOptions::with_max_iter(0),
            Err(CannonError::InvalidOptions { reason: OptError::InvalidMaxIter { .. } })
        ));
        let opts = InferenceOptions::with_max_iter(7).unwrap().sequential();
        assert_eq!(opts.lm.tols.max_iter, Some(7));
        assert!(!opts.parallel);
    }
}
