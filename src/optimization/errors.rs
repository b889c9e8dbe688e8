use argmin::core::{ArgminError, Error};

/// Crate-wide result alias for optimizer operations.
pub type OptResult<T> = Result<T, OptError>;

#[derive(Debug, Clone, PartialEq)]
pub enum OptError {
    // ---- Residuals ----
    /// Residual vector must be non-empty.
    EmptyResiduals,

    /// Residual elements need to be finite.
    InvalidResidual {
        index: usize,
        value: f64,
    },

    // ---- Jacobian ----
    /// Implies that FD should be used
    JacobianNotImplemented,

    /// Jacobian dimensions do not match (residuals × parameters).
    JacobianDimMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    /// Jacobian values need to be finite.
    InvalidJacobian {
        row: usize,
        col: usize,
        value: f64,
    },

    // ---- LMOptions ----
    /// Cost reduction tolerance needs to be positive and finite.
    InvalidTolCost {
        tol: f64,
        reason: &'static str,
    },
    /// Step size tolerance needs to be positive and finite.
    InvalidTolStep {
        tol: f64,
        reason: &'static str,
    },
    /// Gradient tolerance needs to be positive and finite.
    InvalidTolGrad {
        tol: f64,
        reason: &'static str,
    },
    /// Maximum iterations needs to be positive.
    InvalidMaxIter {
        max_iter: usize,
        reason: &'static str,
    },
    /// At least one tolerance must be provided.
    NoTolerancesProvided,

    /// Initial damping must be positive and finite.
    InvalidDamping {
        value: f64,
        reason: &'static str,
    },

    /// Damping update factors must be finite and greater than one.
    InvalidDampingFactor {
        value: f64,
        reason: &'static str,
    },

    // ---- Initial guess ----
    /// Parameter dimension does not match the problem.
    ThetaLengthMismatch {
        expected: usize,
        actual: usize,
    },

    /// Unconstrained optimization input must have finite values.
    InvalidThetaInput {
        index: usize,
        value: f64,
    },

    // ---- Cost function ----
    /// Cost function returned a non-finite value.
    NonFiniteCost {
        value: f64,
    },

    // ---- Levenberg-Marquardt ----
    /// A column of the Jacobian vanished; the parameter is not identifiable.
    SingularNormalMatrix {
        column: usize,
    },

    /// Damping grew past its ceiling without finding a cost reduction.
    DampingExhausted {
        lambda: f64,
    },

    /// Solver stopped without satisfying any convergence criterion.
    NotConverged {
        iterations: usize,
        status: String,
    },

    // ---- Optimizer outcome ----
    /// Estimated parameters must be finite.
    InvalidThetaHat {
        index: usize,
        value: f64,
        reason: &'static str,
    },

    /// Theta hat is missing
    MissingThetaHat,

    // ---- Covariance ----
    /// Information matrix `JᵀJ` is singular or not positive definite.
    SingularInformation {
        eigenvalue: f64,
        largest: f64,
    },

    // ---- Backend ----
    /// Error raised by `argmin` itself rather than by this crate.
    Backend {
        kind: BackendKind,
        text: String,
    },
}

/// Category of an `argmin`-originated failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    InvalidParameter,
    NotImplemented,
    NotInitialized,
    ConditionViolated,
    CheckpointNotFound,
    PotentialBug,
    ImpossibleError,
    /// Anything argmin reports that is not an `ArgminError`.
    Other,
}

impl std::error::Error for OptError {}

impl std::fmt::Display for OptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Residuals ----
            OptError::EmptyResiduals => {
                write!(f, "Residual vector is empty")
            }
            OptError::InvalidResidual { index, value } => {
                write!(f, "Invalid residual at index {index}: {value}, must be finite")
            }

            // ---- Jacobian ----
            OptError::JacobianNotImplemented => {
                write!(f, "Analytic Jacobian not implemented")
            }
            OptError::JacobianDimMismatch { expected, found } => {
                write!(f, "Jacobian dimension mismatch: expected {expected:?}, found {found:?}")
            }
            OptError::InvalidJacobian { row, col, value } => {
                write!(f, "Invalid Jacobian at ({row}, {col}): {value}, must be finite")
            }

            // ---- LMOptions ----
            OptError::InvalidTolCost { tol, reason } => {
                write!(f, "Invalid cost reduction tolerance {tol}: {reason}")
            }
            OptError::InvalidTolStep { tol, reason } => {
                write!(f, "Invalid step tolerance {tol}: {reason}")
            }
            OptError::InvalidTolGrad { tol, reason } => {
                write!(f, "Invalid gradient tolerance {tol}: {reason}")
            }
            OptError::InvalidMaxIter { max_iter, reason } => {
                write!(f, "Invalid maximum iterations {max_iter}: {reason}")
            }
            OptError::NoTolerancesProvided => {
                write!(f, "No tolerances provided")
            }
            OptError::InvalidDamping { value, reason } => {
                write!(f, "Invalid initial damping {value}: {reason}")
            }
            OptError::InvalidDampingFactor { value, reason } => {
                write!(f, "Invalid damping factor {value}: {reason}")
            }

            // ---- Initial guess ----
            OptError::ThetaLengthMismatch { expected, actual } => {
                write!(f, "Theta length mismatch: expected {expected}, actual {actual}")
            }
            OptError::InvalidThetaInput { index, value } => {
                write!(f, "Invalid theta input at index {index}: {value}, must be finite")
            }

            // ---- Cost function ----
            OptError::NonFiniteCost { value } => {
                write!(f, "Non-finite cost value: {value}")
            }

            // ---- Levenberg-Marquardt ----
            OptError::SingularNormalMatrix { column } => {
                write!(f, "Normal matrix is singular: Jacobian column {column} vanishes")
            }
            OptError::DampingExhausted { lambda } => {
                write!(f, "No cost reduction found before damping reached {lambda:e}")
            }
            OptError::NotConverged { iterations, status } => {
                write!(f, "Solver did not converge after {iterations} iterations: {status}")
            }

            // ---- Optimizer outcome ----
            OptError::InvalidThetaHat { index, value, reason } => {
                write!(f, "Invalid estimated parameter at index {index}: {value}: {reason}")
            }
            OptError::MissingThetaHat => {
                write!(f, "Missing estimated parameters (theta hat)")
            }

            // ---- Covariance ----
            OptError::SingularInformation { eigenvalue, largest } => {
                write!(
                    f,
                    "Information matrix is singular: eigenvalue {eigenvalue:e} against largest {largest:e}"
                )
            }

            // ---- Backend ----
            OptError::Backend { kind, text } => {
                write!(f, "argmin backend error ({kind:?}): {text}")
            }
        }
    }
}

impl From<Error> for OptError {
    fn from(original_err: Error) -> Self {
        // Our own errors travel through argmin boxed; unwrap them first.
        let original_err = match original_err.downcast::<OptError>() {
            Ok(opt_err) => return opt_err,
            Err(err) => err,
        };
        let (kind, text) = match original_err.downcast::<ArgminError>() {
            Ok(err) => {
                let text = err.to_string();
                let kind = match err {
                    ArgminError::InvalidParameter { .. } => BackendKind::InvalidParameter,
                    ArgminError::NotImplemented { .. } => BackendKind::NotImplemented,
                    ArgminError::NotInitialized { .. } => BackendKind::NotInitialized,
                    ArgminError::ConditionViolated { .. } => BackendKind::ConditionViolated,
                    ArgminError::CheckpointNotFound { .. } => BackendKind::CheckpointNotFound,
                    ArgminError::PotentialBug { .. } => BackendKind::PotentialBug,
                    ArgminError::ImpossibleError { .. } => BackendKind::ImpossibleError,
                    _ => BackendKind::Other,
                };
                (kind, text)
            }
            Err(err) => (BackendKind::Other, err.to_string()),
        };
        OptError::Backend { kind, text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Round-tripping crate errors through argmin's boxed `Error`.
    // - Tagging of argmin's own error variants with a `BackendKind`.
    //
    // They intentionally DO NOT cover:
    // - Display strings beyond a smoke check.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure an `OptError` raised inside an argmin callback comes back out
    // unchanged rather than flattened into `BackendError`.
    //
    // Given
    // -----
    // - `OptError::SingularNormalMatrix { column: 1 }` boxed into `Error`.
    //
    // Expect
    // ------
    // - `OptError::from` recovers the identical variant.
    fn from_error_recovers_boxed_opt_error() {
        // Arrange
        let boxed: Error = OptError::SingularNormalMatrix { column: 1 }.into();

        // Act
        let err = OptError::from(boxed);

        // Assert
        assert_eq!(err, OptError::SingularNormalMatrix { column: 1 });
    }

    #[test]
    // Purpose
    // -------
    // Verify that argmin's own errors are tagged with their category.
    //
    // Given
    // -----
    // - An `ArgminError::ConditionViolated` converted into `Error`.
    //
    // Expect
    // ------
    // - `OptError::Backend` with `BackendKind::ConditionViolated`, message kept.
    fn from_error_maps_argmin_condition_violated() {
        // Arrange
        let boxed: Error = ArgminError::ConditionViolated { text: "bad".to_string() }.into();

        // Act
        let err = OptError::from(boxed);

        // Assert
        assert!(matches!(
            &err,
            OptError::Backend { kind: BackendKind::ConditionViolated, text } if text.contains("bad")
        ));
        assert!(err.to_string().contains("ConditionViolated"));
    }
}
