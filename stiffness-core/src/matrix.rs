//! Symbolic matrices and the stiffness skeleton.
//!
//! A [`SymbolicMatrix`] is a dense `nalgebra` matrix of [`Expr`] entries. The
//! skeleton built by [`symbolic_matrix`] is the starting point of every
//! stiffness, derivative and compliance matrix: physical expressions are
//! substituted into its named entries.

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::types::Dim;
use nalgebra::DMatrix;
use std::collections::{BTreeMap, BTreeSet};

/// Dense matrix of symbolic entries.
pub type SymbolicMatrix = DMatrix<Expr>;

/// Name of the skeleton entry at 1-based position (i, j).
pub fn element_name(i: usize, j: usize) -> String {
    format!("C{i}{j}")
}

/// Build the generic stiffness skeleton for `dim`.
///
/// The matrix is `(3*dim - 3)` square. Entry (i, j) (1-based) holds the
/// symbol `C{i}{j}`, folded to `C{min}{max}` unless `asymmetrical` is set.
/// Only the diagonal and the upper-left `dim x dim` normal block carry
/// symbols; every other entry is 0.
///
/// # Example
///
/// ```
/// use stiffness_core::matrix::symbolic_matrix;
/// use stiffness_core::types::Dim;
///
/// let m = symbolic_matrix(Dim::Two, false);
/// assert_eq!(m[(1, 0)].to_string(), "C12");
/// assert!(m[(2, 0)].is_zero());
/// ```
pub fn symbolic_matrix(dim: Dim, asymmetrical: bool) -> SymbolicMatrix {
    let n = dim.voigt_len();
    let d = dim.n();

    DMatrix::from_fn(n, n, |row, col| {
        let (mut i, mut j) = (row + 1, col + 1);
        if !asymmetrical {
            (i, j) = (i.min(j), i.max(j));
        }
        if i == j || (i <= d && j <= d) {
            Expr::symbol(element_name(i, j))
        } else {
            Expr::zero()
        }
    })
}

/// Names of all symbols appearing in a matrix.
pub fn free_symbols(matrix: &SymbolicMatrix) -> BTreeSet<String> {
    matrix.iter().flat_map(Expr::free_symbols).collect()
}

/// Substitute named symbols in every entry.
pub fn subs(matrix: &SymbolicMatrix, table: &BTreeMap<String, Expr>) -> SymbolicMatrix {
    matrix.map(|e| e.subs(table))
}

/// Whether `m[(i, j)] == m[(j, i)]` holds structurally for every entry.
pub fn is_symmetric(matrix: &SymbolicMatrix) -> bool {
    matrix.is_square()
        && (0..matrix.nrows())
            .all(|i| (0..i).all(|j| matrix[(i, j)] == matrix[(j, i)]))
}

/// Symbolic matrix product.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the inner dimensions differ.
pub fn matmul(a: &SymbolicMatrix, b: &SymbolicMatrix) -> Result<SymbolicMatrix> {
    if a.ncols() != b.nrows() {
        return Err(Error::ShapeMismatch(format!(
            "cannot multiply {}x{} by {}x{}",
            a.nrows(),
            a.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    Ok(DMatrix::from_fn(a.nrows(), b.ncols(), |i, j| {
        Expr::sum((0..a.ncols()).map(|k| &a[(i, k)] * &b[(k, j)]))
    }))
}

/// Evaluate every entry numerically.
///
/// # Errors
///
/// Propagates the first entry that fails to evaluate.
pub fn evaluate(matrix: &SymbolicMatrix, values: &BTreeMap<String, f64>) -> Result<DMatrix<f64>> {
    let mut out = DMatrix::zeros(matrix.nrows(), matrix.ncols());
    for j in 0..matrix.ncols() {
        for i in 0..matrix.nrows() {
            out[(i, j)] = matrix[(i, j)].eval(values)?;
        }
    }
    Ok(out)
}
