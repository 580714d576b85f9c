//! Elastic differential operators and Voigt conversions.
//!
//! - [`divergence`] (D): stress divergence, tensor -> vector
//! - [`symmetric_gradient`] (S): strain, vector -> compact tensor
//! - [`vec`] / [`tensor`]: square <-> Voigt forms
//! - [`apply`]: stiffness-type matrix times a Voigt field
//! - [`gather`]: stack a vector and a tensor field into one column
//!
//! A velocity-stress update reads
//! `divergence(&apply(c.matrix(), &symmetric_gradient(&v)?)?)`.

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::field::{Field, TensorField, VectorField};
use crate::matrix::SymbolicMatrix;
use crate::types::Dim;
use nalgebra::DMatrix;

fn require_tensor(field: &Field) -> Result<&TensorField> {
    field.as_tensor().ok_or(Error::NotTensorValued)
}

fn require_vector(field: &Field) -> Result<&VectorField> {
    field.as_vector().ok_or(Error::NotVectorValued)
}

/// Stress divergence D.
///
/// Component `j` of the result is `sum_i d(M[j, i]) / d(axis_i)`. Compact
/// input is expanded with [`tensor`] first.
///
/// # Errors
///
/// Returns [`Error::NotTensorValued`] for vector input.
pub fn divergence(field: &Field) -> Result<Field> {
    let t = require_tensor(field)?;
    let square = if t.is_compact() {
        tensor_form(t)?
    } else {
        t.clone()
    };

    let dims = square.space_dimensions();
    let components = (0..dims.len())
        .map(|j| {
            dims.iter()
                .enumerate()
                .map(|(i, d)| square[(j, i)].diff(d.name()))
                .sum::<Expr>()
        })
        .collect();

    Ok(VectorField::from_components(t.name(), dims.to_vec(), components)?.into())
}

/// Symmetric gradient S, returned in Voigt form.
///
/// Normal components are `d(v_k)/d(x_k)`; shear components follow the Voigt
/// order (3D: yz, xz, xy; 2D: xy) as `d(v_a)/d(x_b) + d(v_b)/d(x_a)`.
///
/// # Errors
///
/// Returns [`Error::NotVectorValued`] for tensor input.
pub fn symmetric_gradient(field: &Field) -> Result<Field> {
    let v = require_vector(field)?;
    let dims = v.space_dimensions();
    let dim = Dim::new(dims.len())?;

    let components = dim.voigt_order().iter().map(|&(a, b)| {
        if a == b {
            v[a].diff(dims[a].name())
        } else {
            v[a].diff(dims[b].name()) + v[b].diff(dims[a].name())
        }
    });
    let components = DMatrix::from_iterator(dim.voigt_len(), 1, components);

    Ok(TensorField::from_matrix(v.name(), dims.to_vec(), components)?.into())
}

/// Square tensor to Voigt form.
///
/// # Errors
///
/// - [`Error::NotTensorValued`] for vector input
/// - [`Error::AlreadyVoigt`] if the tensor is already compact
pub fn vec(field: &Field) -> Result<Field> {
    let t = require_tensor(field)?;
    if t.is_compact() {
        return Err(Error::AlreadyVoigt);
    }
    let order = t.dim().voigt_order();
    let components = DMatrix::from_iterator(order.len(), 1, order.iter().map(|&ij| t[ij].clone()));
    Ok(TensorField::from_matrix(t.name(), t.space_dimensions().to_vec(), components)?.into())
}

/// Voigt form to symmetric square tensor.
///
/// # Errors
///
/// - [`Error::NotTensorValued`] for vector input
/// - [`Error::AlreadyTensor`] if the tensor is already square
pub fn tensor(field: &Field) -> Result<Field> {
    let t = require_tensor(field)?;
    if !t.is_compact() {
        return Err(Error::AlreadyTensor);
    }
    Ok(tensor_form(t)?.into())
}

/// Expand a compact tensor; the caller has checked the form.
fn tensor_form(t: &TensorField) -> Result<TensorField> {
    let dim = t.dim();
    let n = dim.n();
    let mut m = DMatrix::from_element(n, n, Expr::zero());
    for (k, &(i, j)) in dim.voigt_order().iter().enumerate() {
        m[(i, j)] = t[k].clone();
        m[(j, i)] = t[k].clone();
    }
    TensorField::from_matrix(t.name(), t.space_dimensions().to_vec(), m)
}

/// Multiply a stiffness-type matrix with a tensor field in Voigt form.
///
/// Square tensors are converted with [`vec`] first. The result is compact.
///
/// # Errors
///
/// - [`Error::NotTensorValued`] for vector input
/// - [`Error::ShapeMismatch`] if the matrix size differs from the Voigt length
pub fn apply(matrix: &SymbolicMatrix, field: &Field) -> Result<Field> {
    let compact = if require_tensor(field)?.is_compact() {
        field.clone()
    } else {
        vec(field)?
    };
    let t = require_tensor(&compact)?;
    let k = t.shape().0;
    if matrix.shape() != (k, k) {
        return Err(Error::ShapeMismatch(format!(
            "{}x{} matrix applied to a Voigt field of length {k}",
            matrix.nrows(),
            matrix.ncols()
        )));
    }

    let components = DMatrix::from_fn(k, 1, |i, _| {
        Expr::sum((0..k).map(|j| &matrix[(i, j)] * &t[j]))
    });
    Ok(TensorField::from_matrix(t.name(), t.space_dimensions().to_vec(), components)?.into())
}

/// Operand of [`gather`].
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// Integer placeholder, broadcast to the required length.
    Constant(i64),
    /// A field.
    Field(&'a Field),
}

impl From<i64> for Operand<'_> {
    fn from(v: i64) -> Self {
        Operand::Constant(v)
    }
}

impl From<i32> for Operand<'_> {
    fn from(v: i32) -> Self {
        Operand::Constant(i64::from(v))
    }
}

impl<'a> From<&'a Field> for Operand<'a> {
    fn from(f: &'a Field) -> Self {
        Operand::Field(f)
    }
}

/// Stack a vector field `a1` and a tensor field `a2` into one column.
///
/// Either operand may be an integer, broadcast to the vector length
/// (`len(a2.space_dimensions)`) or the Voigt length (`3n - 3` with
/// `n = len(a1.space_dimensions)`).
///
/// # Errors
///
/// - [`Error::InvalidOperand`] if `a1` is not a vector field or integer, `a2`
///   is not a tensor field or integer, or both are integers
/// - [`Error::ShapeMismatch`] if `a2` is a square tensor
pub fn gather<'a>(a1: impl Into<Operand<'a>>, a2: impl Into<Operand<'a>>) -> Result<SymbolicMatrix> {
    let (a1, a2) = (a1.into(), a2.into());

    if let Operand::Field(f) = a1 {
        if !f.is_vector_valued() {
            return Err(Error::InvalidOperand("a1 must be a vector field or an integer".into()));
        }
    }
    if let Operand::Field(f) = a2 {
        if !f.is_tensor_valued() {
            return Err(Error::InvalidOperand("a2 must be a tensor field or an integer".into()));
        }
    }

    let (first, second): (Vec<Expr>, Vec<Expr>) = match (a1, a2) {
        (Operand::Constant(_), Operand::Constant(_)) => {
            return Err(Error::InvalidOperand(
                "a1 and a2 cannot both be integers".into(),
            ));
        }
        (Operand::Constant(c), Operand::Field(t)) => {
            let n = t.space_dimensions().len();
            (broadcast(c, n), column(require_tensor(t)?)?)
        }
        (Operand::Field(v), Operand::Constant(c)) => {
            let n = v.space_dimensions().len();
            (require_vector(v)?.components().to_vec(), broadcast(c, 3 * n - 3))
        }
        (Operand::Field(v), Operand::Field(t)) => (
            require_vector(v)?.components().to_vec(),
            column(require_tensor(t)?)?,
        ),
    };

    let len = first.len() + second.len();
    Ok(DMatrix::from_iterator(len, 1, first.into_iter().chain(second)))
}

fn broadcast(value: i64, len: usize) -> Vec<Expr> {
    vec![Expr::Num(value as f64); len]
}

fn column(t: &TensorField) -> Result<Vec<Expr>> {
    if !t.is_compact() {
        let (r, c) = t.shape();
        return Err(Error::ShapeMismatch(format!(
            "cannot stack a {r}x{c} tensor under a column vector; convert it with vec first"
        )));
    }
    Ok(t.components().iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::space_dimensions;

    fn axes(dim: Dim) -> Vec<crate::field::Dimension> {
        space_dimensions(dim)
    }

    fn d(f: &str, axis: &str) -> Expr {
        Expr::function(f).diff(axis)
    }

    #[test]
    fn test_divergence_rejects_vector() {
        let v: Field = VectorField::new("v", axes(Dim::Two)).unwrap().into();
        assert_eq!(divergence(&v).unwrap_err(), Error::NotTensorValued);
    }

    #[test]
    fn test_symmetric_gradient_rejects_tensor() {
        let t: Field = TensorField::new("tau", axes(Dim::Two)).unwrap().into();
        assert_eq!(symmetric_gradient(&t).unwrap_err(), Error::NotVectorValued);
    }

    #[test]
    fn test_divergence_2d() {
        let t: Field = TensorField::new("tau", axes(Dim::Two)).unwrap().into();
        let out = divergence(&t).unwrap();
        let v = out.as_vector().unwrap();
        assert_eq!(v[0], d("tau_xx", "x") + d("tau_xy", "y"));
        assert_eq!(v[1], d("tau_xy", "x") + d("tau_yy", "y"));
    }

    #[test]
    fn test_divergence_expands_compact() {
        let square: Field = TensorField::new("tau", axes(Dim::Three)).unwrap().into();
        let compact = vec(&square).unwrap();
        assert_eq!(divergence(&compact).unwrap(), divergence(&square).unwrap());
    }

    #[test]
    fn test_symmetric_gradient_3d_order() {
        let v: Field = VectorField::new("v", axes(Dim::Three)).unwrap().into();
        let s = symmetric_gradient(&v).unwrap();
        let t = s.as_tensor().unwrap();
        assert_eq!(t.shape(), (6, 1));
        assert_eq!(t[0], d("v_x", "x"));
        assert_eq!(t[2], d("v_z", "z"));
        assert_eq!(t[3], d("v_y", "z") + d("v_z", "y"));
        assert_eq!(t[4], d("v_x", "z") + d("v_z", "x"));
        assert_eq!(t[5], d("v_x", "y") + d("v_y", "x"));
    }

    #[test]
    fn test_zero_fields() {
        for dim in [Dim::Two, Dim::Three] {
            let t: Field = TensorField::zeros("tau", axes(dim), false).unwrap().into();
            let div = divergence(&t).unwrap();
            assert!(div.is_vector_valued());
            assert_eq!(div.space_dimensions().len(), dim.n());
            assert!(div.is_zero());

            let v: Field = VectorField::zeros("v", axes(dim)).unwrap().into();
            let s = symmetric_gradient(&v).unwrap();
            assert_eq!(s.as_tensor().unwrap().shape(), (dim.voigt_len(), 1));
            assert!(s.is_zero());
        }
    }

    #[test]
    fn test_voigt_round_trip() {
        for dim in [Dim::Two, Dim::Three] {
            let compact: Field = TensorField::voigt("tau", axes(dim)).unwrap().into();
            assert_eq!(vec(&tensor(&compact).unwrap()).unwrap(), compact);

            let square: Field = TensorField::new("tau", axes(dim)).unwrap().into();
            assert_eq!(tensor(&vec(&square).unwrap()).unwrap(), square);
        }
    }

    #[test]
    fn test_already_in_form() {
        let square: Field = TensorField::new("tau", axes(Dim::Two)).unwrap().into();
        let compact = vec(&square).unwrap();
        assert_eq!(tensor(&square).unwrap_err(), Error::AlreadyTensor);
        assert_eq!(vec(&compact).unwrap_err(), Error::AlreadyVoigt);

        let v: Field = VectorField::new("v", axes(Dim::Two)).unwrap().into();
        assert_eq!(vec(&v).unwrap_err(), Error::NotTensorValued);
        assert_eq!(tensor(&v).unwrap_err(), Error::NotTensorValued);
    }

    #[test]
    fn test_gather_broadcast() {
        for dim in [Dim::Two, Dim::Three] {
            let n = dim.n();
            let v: Field = VectorField::new("v", axes(dim)).unwrap().into();
            let g = gather(&v, 0).unwrap();
            assert_eq!(g.shape(), (n + 3 * n - 3, 1));
            assert_eq!(g[0], Expr::function("v_x"));
            assert!(g.iter().skip(n).all(Expr::is_zero));

            let t: Field = TensorField::voigt("tau", axes(dim)).unwrap().into();
            let g = gather(2, &t).unwrap();
            assert_eq!(g.shape(), (n + 3 * n - 3, 1));
            assert!(g.iter().take(n).all(|e| *e == Expr::Num(2.0)));
            assert_eq!(g[n], Expr::function("tau_xx"));
        }
    }

    #[test]
    fn test_gather_invalid() {
        assert!(matches!(gather(0, 0), Err(Error::InvalidOperand(_))));

        let v: Field = VectorField::new("v", axes(Dim::Two)).unwrap().into();
        let t: Field = TensorField::new("tau", axes(Dim::Two)).unwrap().into();
        assert!(matches!(gather(&t, 0), Err(Error::InvalidOperand(_))));
        assert!(matches!(gather(&v, &v), Err(Error::InvalidOperand(_))));
        assert!(matches!(gather(&v, &t), Err(Error::ShapeMismatch(_))));

        let compact = vec(&t).unwrap();
        assert_eq!(gather(&v, &compact).unwrap().nrows(), 5);
    }

    #[test]
    fn test_apply_shape_mismatch() {
        let m = crate::matrix::symbolic_matrix(Dim::Three, false);
        let t: Field = TensorField::voigt("tau", axes(Dim::Two)).unwrap().into();
        assert!(matches!(apply(&m, &t), Err(Error::ShapeMismatch(_))));
    }

    #[test]
    fn test_apply_skeleton() {
        let m = crate::matrix::symbolic_matrix(Dim::Two, false);
        let e: Field = TensorField::voigt("e", axes(Dim::Two)).unwrap().into();
        let s = apply(&m, &e).unwrap();
        let t = s.as_tensor().unwrap();
        let (exx, eyy, exy) = (
            Expr::function("e_xx"),
            Expr::function("e_yy"),
            Expr::function("e_xy"),
        );
        assert_eq!(t[0], Expr::symbol("C11") * &exx + Expr::symbol("C12") * &eyy);
        assert_eq!(t[2], Expr::symbol("C33") * &exy);
    }
}
