//! cannon::label_vector — quadratic feature expansion of a label tuple.
//!
//! Purpose
//! -------
//! Map `n` (pivot-relative) labels to the `F(n) = n + n(n+1)/2` features the
//! spectral model is linear in: the labels themselves followed by every
//! product `l_i · l_j` with `i ≤ j`, enumerated row by row over the upper
//! triangle of the outer product (diagonal included).
//!
//! Invariants & assumptions
//! ------------------------
//! - Output ordering is fixed and must match the column layout of the
//!   model coefficients (after the leading offset column).
//! - Pure functions: no allocation beyond the returned arrays and no
//!   failure modes for finite input.
//!
//! Testing notes
//! -------------
//! - Unit tests check lengths, ordering on a concrete 3-label example, and
//!   the analytic Jacobian against central differences.
use ndarray::{Array1, Array2, ArrayView1};

/// Number of features `F(n) = n + n(n+1)/2` for `nlabels` labels.
pub fn feature_len(nlabels: usize) -> usize {
    nlabels + nlabels * (nlabels + 1) / 2
}

/// Expand labels into the linear-then-quadratic feature vector.
///
/// For labels `(a, b, c)` the output is
/// `[a, b, c, a², ab, ac, b², bc, c²]`.
///
/// # Examples
/// ```
/// # use ndarray::array;
/// # use rust_cannon::cannon::label_vector::label_vector;
/// let v = label_vector(array![1.0, 2.0].view());
/// assert_eq!(v, array![1.0, 2.0, 1.0, 2.0, 4.0]);
/// ```
pub fn label_vector(labels: ArrayView1<f64>) -> Array1<f64> {
    let n = labels.len();
    let mut out = Array1::<f64>::zeros(feature_len(n));
    for (i, &l) in labels.iter().enumerate() {
        out[i] = l;
    }
    let mut k = n;
    for i in 0..n {
        for j in i..n {
            out[k] = labels[i] * labels[j];
            k += 1;
        }
    }
    out
}

/// Derivative of [`label_vector`] with respect to the labels.
///
/// Returns an `F(n) × n` matrix. Linear rows are unit vectors; the row for
/// `l_i · l_j` holds `l_j` in column `i` and `l_i` in column `j` (so `2 l_i`
/// on the diagonal terms).
pub fn label_vector_jacobian(labels: ArrayView1<f64>) -> Array2<f64> {
    let n = labels.len();
    let mut jac = Array2::<f64>::zeros((feature_len(n), n));
    for i in 0..n {
        jac[[i, i]] = 1.0;
    }
    let mut k = n;
    for i in 0..n {
        for j in i..n {
            jac[[k, i]] += labels[j];
            jac[[k, j]] += labels[i];
            k += 1;
        }
    }
    jac
}
