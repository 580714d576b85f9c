//! Stiffness matrix construction and derivative access.
//!
//! [`build_stiffness`] is the factory entry point: it resolves the
//! parameterization, substitutes the model's parameters into the skeleton and
//! attaches the analytic derivative and compliance matrices.
//!
//! Derivatives are requested by name through [`StiffnessMatrix::derivative`].
//! Physical derivatives (`dlam`, `dvp`, ...) are built with the matrix;
//! raw-element derivatives (`dC12`, ...) are 0/1 indicator matrices built on
//! request from the asymmetrical skeleton.

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::matrix::{free_symbols, subs, symbolic_matrix, SymbolicMatrix};
use crate::model::ElasticParameters;
use crate::parameterization::{raw_element_names, MatrixKind, Parameterization, Variables};
use crate::types::Dim;
use std::collections::BTreeMap;
use tracing::{debug, trace};

const KIND: &str = "StiffnessMatrix";

/// Where a named derivative comes from.
#[derive(Debug, Clone, PartialEq)]
enum DerivativeSource {
    /// Chain-rule derivative built with the stiffness matrix.
    Physical(SymbolicMatrix),
    /// Indicator of one raw skeleton element, built on request.
    Element(String),
}

/// Lookup table of legal derivative names for one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivativeTable {
    dim: Dim,
    entries: BTreeMap<String, DerivativeSource>,
}

impl DerivativeTable {
    /// Table holding every raw-element name of `dim` plus the given physical
    /// derivatives.
    pub fn new(dim: Dim, physical: impl IntoIterator<Item = (String, SymbolicMatrix)>) -> Self {
        let mut entries: BTreeMap<String, DerivativeSource> = element_derivative_names(dim)
            .into_iter()
            .map(|name| {
                let element = name[1..].to_string();
                (name, DerivativeSource::Element(element))
            })
            .collect();
        for (name, matrix) in physical {
            entries.insert(name, DerivativeSource::Physical(matrix));
        }
        Self { dim, entries }
    }

    /// All legal names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Resolve a derivative by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDerivative`] for names outside the table.
    pub fn resolve(&self, name: &str) -> Result<SymbolicMatrix> {
        match self.entries.get(name) {
            Some(DerivativeSource::Physical(matrix)) => Ok(matrix.clone()),
            Some(DerivativeSource::Element(element)) => {
                trace!(element = %element, dim = %self.dim, "building indicator derivative");
                Ok(indicator_matrix(self.dim, element))
            }
            None => Err(Error::UnknownDerivative {
                name: name.to_string(),
                kind: KIND.to_string(),
            }),
        }
    }
}

/// Legal raw-element derivative names for `dim` (`dC11`, `dC12`, ...).
pub fn element_derivative_names(dim: Dim) -> Vec<String> {
    free_symbols(&symbolic_matrix(dim, true))
        .into_iter()
        .map(|s| format!("d{s}"))
        .collect()
}

/// 0/1 matrix marking where the asymmetrical skeleton holds `element`.
pub fn indicator_matrix(dim: Dim, element: &str) -> SymbolicMatrix {
    symbolic_matrix(dim, true).map(|c| {
        if c.name() == Some(element) {
            Expr::one()
        } else {
            Expr::zero()
        }
    })
}

/// Raw-element derivative by name, without a stiffness matrix.
///
/// # Errors
///
/// Returns [`Error::UnknownDerivative`] if `name` is not `d` followed by a
/// skeleton element of `dim`.
pub fn indicator_derivative(dim: Dim, name: &str) -> Result<SymbolicMatrix> {
    DerivativeTable::new(dim, std::iter::empty()).resolve(name)
}

/// A populated stiffness matrix with its derivative and compliance matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct StiffnessMatrix {
    parameterization: Parameterization,
    dim: Dim,
    matrix: SymbolicMatrix,
    derivatives: DerivativeTable,
    inverse: Option<SymbolicMatrix>,
}

impl StiffnessMatrix {
    /// Build the stiffness matrix of `model` in the given parameterization.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingParameter`] if a physical parameterization
    /// finds the model incomplete. Missing raw elements default to zero.
    pub fn new<M: ElasticParameters + ?Sized>(
        model: &M,
        parameterization: Parameterization,
    ) -> Result<Self> {
        let dim = model.dim();
        debug!(parameterization = %parameterization, dim = %dim, "building stiffness matrix");

        if parameterization == Parameterization::CElements {
            let skeleton = symbolic_matrix(dim, parameterization.asymmetrical());
            let matrix = subs(&skeleton, &raw_elements(model, dim));
            return Ok(Self {
                parameterization,
                dim,
                matrix,
                derivatives: DerivativeTable::new(dim, std::iter::empty()),
                inverse: None,
            });
        }

        let vars = Variables::resolve(model, parameterization)?;
        let build = |kind: MatrixKind| {
            parameterization
                .table(kind)
                .map(|table| subs(&symbolic_matrix(dim, false), &table.expand(dim, &vars)))
        };

        let matrix = build(MatrixKind::Stiffness).ok_or_else(|| {
            Error::UnsupportedParameterization(parameterization.to_string())
        })?;
        let physical = parameterization.derivative_names().iter().filter_map(|&name| {
            build(MatrixKind::Derivative(name)).map(|m| (name.to_string(), m))
        });
        let derivatives = DerivativeTable::new(dim, physical);
        let inverse = build(MatrixKind::Inverse);

        debug!(
            parameterization = %parameterization,
            derivatives = ?parameterization.derivative_names(),
            has_inverse = inverse.is_some(),
            "stiffness matrix ready"
        );

        Ok(Self {
            parameterization,
            dim,
            matrix,
            derivatives,
            inverse,
        })
    }

    /// Parameterization the matrix was built with.
    pub fn parameterization(&self) -> Parameterization {
        self.parameterization
    }

    /// Spatial dimensionality.
    pub fn dim(&self) -> Dim {
        self.dim
    }

    /// The populated matrix.
    pub fn matrix(&self) -> &SymbolicMatrix {
        &self.matrix
    }

    /// Analytic compliance (`lam-mu` and `vp-vs-rho` only).
    pub fn inverse(&self) -> Option<&SymbolicMatrix> {
        self.inverse.as_ref()
    }

    /// Derivative matrix by name: `dlam`, `dvp`, `dIs`, ... or a raw element
    /// such as `dC12`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownDerivative`] for illegal names.
    pub fn derivative(&self, name: &str) -> Result<SymbolicMatrix> {
        self.derivatives.resolve(name)
    }

    /// Every name [`derivative`](Self::derivative) accepts.
    pub fn derivative_names(&self) -> impl Iterator<Item = &str> {
        self.derivatives.names()
    }
}

impl std::ops::Index<(usize, usize)> for StiffnessMatrix {
    type Output = Expr;

    fn index(&self, index: (usize, usize)) -> &Expr {
        &self.matrix[index]
    }
}

/// Raw elements read off the model, zero where the model has none.
fn raw_elements<M: ElasticParameters + ?Sized>(model: &M, dim: Dim) -> BTreeMap<String, Expr> {
    raw_element_names(dim)
        .iter()
        .map(|&name| {
            let value = model.parameter(name).unwrap_or_else(|| {
                debug!(element = name, "raw element not set on model, using 0");
                Expr::zero()
            });
            (name.to_string(), value)
        })
        .collect()
}

/// Build a stiffness matrix from a registry key.
///
/// # Errors
///
/// - [`Error::UnsupportedParameterization`] for unknown keys
/// - [`Error::MissingParameter`] if the model lacks a required parameter
///
/// # Example
///
/// ```
/// use stiffness_core::model::ElasticModel;
/// use stiffness_core::stiffness::build_stiffness;
/// use stiffness_core::types::Dim;
///
/// let model = ElasticModel::lame(Dim::Two, 2.0, 1.0);
/// let c = build_stiffness(&model, "lam-mu").unwrap();
/// assert_eq!(c[(0, 0)].as_num(), Some(4.0));
/// assert!(build_stiffness(&model, "E-nu").is_err());
/// ```
pub fn build_stiffness<M: ElasticParameters + ?Sized>(
    model: &M,
    parameterization: &str,
) -> Result<StiffnessMatrix> {
    StiffnessMatrix::new(model, parameterization.parse()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{evaluate, is_symmetric};
    use crate::model::ElasticModel;
    use approx::assert_relative_eq;
    use nalgebra::DMatrix;

    fn numeric(m: &SymbolicMatrix) -> DMatrix<f64> {
        evaluate(m, &BTreeMap::new()).unwrap()
    }

    fn count_ones(m: &SymbolicMatrix) -> usize {
        m.iter().filter(|e| e.as_num() == Some(1.0)).count()
    }

    #[test]
    fn test_shapes_and_symmetry() {
        for dim in [Dim::Two, Dim::Three] {
            let model = ElasticModel::velocity(dim, 2.0, 1.0, 1.5);
            for p in Parameterization::ALL {
                let c = StiffnessMatrix::new(&model, p).unwrap();
                let n = dim.voigt_len();
                assert_eq!(c.matrix().shape(), (n, n), "{p} {dim}");
                assert!(is_symmetric(c.matrix()), "{p} {dim}");
            }
        }
    }

    #[test]
    fn test_acoustic_limit_2d() {
        let model = ElasticModel::new(Dim::Two)
            .with_parameter("vp", 1.5)
            .with_parameter("vs", 0.0)
            .with_parameter("rho", 1.0);
        let c = build_stiffness(&model, "vp-vs-rho").unwrap();
        let expected = DMatrix::from_row_slice(3, 3, &[2.25, 2.25, 0.0, 2.25, 2.25, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(numeric(c.matrix()), expected);
    }

    #[test]
    fn test_lame_values_3d() {
        let c = build_stiffness(&ElasticModel::lame(Dim::Three, 2.0, 1.0), "lam-mu").unwrap();
        let m = numeric(c.matrix());
        assert_relative_eq!(m[(0, 0)], 4.0);
        assert_relative_eq!(m[(1, 2)], 2.0);
        assert_relative_eq!(m[(3, 3)], 1.0);
        assert_relative_eq!(m[(0, 3)], 0.0);
    }

    #[test]
    fn test_parameterizations_agree() {
        let model = ElasticModel::velocity(Dim::Three, 3.0, 1.5, 2.0);
        let reference = numeric(build_stiffness(&model, "lam-mu").unwrap().matrix());
        for key in ["vp-vs-rho", "Ip-Is-rho"] {
            let m = numeric(build_stiffness(&model, key).unwrap().matrix());
            assert!((m - &reference).abs().max() < 1e-12, "{key}");
        }
    }

    #[test]
    fn test_unsupported_parameterization() {
        let model = ElasticModel::lame(Dim::Two, 1.0, 1.0);
        assert_eq!(
            build_stiffness(&model, "E-nu").unwrap_err(),
            Error::UnsupportedParameterization("E-nu".into())
        );
    }

    #[test]
    fn test_missing_parameter() {
        let model = ElasticModel::lame(Dim::Two, 1.0, 1.0);
        assert_eq!(
            build_stiffness(&model, "vp-vs-rho").unwrap_err(),
            Error::MissingParameter("vp".into())
        );
    }

    #[test]
    fn test_c_elements_defaults_to_zero() {
        let model = ElasticModel::new(Dim::Two)
            .with_parameter("C11", 5.0)
            .with_parameter("C12", 1.0)
            .with_parameter("C21", 3.0);
        let c = build_stiffness(&model, "C-elements").unwrap();
        let m = numeric(c.matrix());
        assert_relative_eq!(m[(0, 0)], 5.0);
        assert_relative_eq!(m[(0, 1)], 1.0);
        assert_relative_eq!(m[(1, 0)], 3.0);
        assert_relative_eq!(m[(1, 1)], 0.0);
        assert_relative_eq!(m[(2, 2)], 0.0);
        assert!(!is_symmetric(c.matrix()));
        assert!(c.inverse().is_none());
    }

    #[test]
    fn test_physical_derivatives_attached() {
        let model = ElasticModel::velocity(Dim::Two, 2.0, 1.0, 1.5);

        let lm = build_stiffness(&model, "lam-mu").unwrap();
        let dmu = numeric(&lm.derivative("dmu").unwrap());
        assert_eq!(dmu, DMatrix::from_row_slice(3, 3, &[2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0]));
        let dlam = numeric(&lm.derivative("dlam").unwrap());
        assert_eq!(dlam, DMatrix::from_row_slice(3, 3, &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0]));
        assert!(lm.derivative("dvp").is_err());

        let vv = build_stiffness(&model, "vp-vs-rho").unwrap();
        let dvs = numeric(&vv.derivative("dvs").unwrap());
        // 2*rho*vs = 3, -4*rho*vs = -6
        assert_relative_eq!(dvs[(2, 2)], 3.0);
        assert_relative_eq!(dvs[(0, 1)], -6.0);
        assert_relative_eq!(dvs[(0, 0)], 0.0);

        let ii = build_stiffness(&model, "Ip-Is-rho").unwrap();
        let dis = numeric(&ii.derivative("dIs").unwrap());
        assert_relative_eq!(dis[(1, 0)], -2.0);
        assert!(ii.inverse().is_none());
    }

    fn with_values(dim: Dim, values: &[(&str, f64)]) -> ElasticModel {
        values
            .iter()
            .fold(ElasticModel::new(dim), |m, &(name, v)| m.with_parameter(name, v))
    }

    #[test]
    fn test_derivatives_match_finite_differences() {
        let h = 1e-5;
        let cases: [(&str, &[(&str, f64)]); 3] = [
            ("lam-mu", &[("lam", 2.3), ("mu", 1.1)]),
            ("vp-vs-rho", &[("vp", 2.5), ("vs", 1.2), ("rho", 1.8)]),
            ("Ip-Is-rho", &[("vp", 2.5), ("vs", 1.2), ("Ip", 4.5), ("Is", 2.16)]),
        ];

        for dim in [Dim::Two, Dim::Three] {
            for (key, values) in cases {
                let c = build_stiffness(&with_values(dim, values), key).unwrap();
                for &name in c.parameterization().derivative_names() {
                    let var = &name[1..];
                    let shifted = |delta: f64| {
                        let v: Vec<(&str, f64)> = values
                            .iter()
                            .map(|&(n, x)| (n, if n == var { x + delta } else { x }))
                            .collect();
                        numeric(build_stiffness(&with_values(dim, &v), key).unwrap().matrix())
                    };
                    // Central difference is exact for these quadratic forms up to rounding
                    let fd = (shifted(h) - shifted(-h)) / (2.0 * h);
                    let analytic = numeric(&c.derivative(name).unwrap());
                    assert!((fd - analytic).abs().max() < 1e-6, "{key} {dim} {name}");
                }
            }
        }
    }

    #[test]
    fn test_impedance_derivative_values() {
        let model = with_values(Dim::Two, &[("vp", 2.5), ("vs", 1.2), ("Ip", 4.5), ("Is", 2.16)]);
        let c = build_stiffness(&model, "Ip-Is-rho").unwrap();
        let dip = numeric(&c.derivative("dIp").unwrap());
        assert_eq!(
            dip,
            DMatrix::from_row_slice(3, 3, &[2.5, 2.5, 0.0, 2.5, 2.5, 0.0, 0.0, 0.0, 0.0])
        );
        let dis = numeric(&c.derivative("dIs").unwrap());
        assert_relative_eq!(dis[(2, 2)], 1.2);
        assert_relative_eq!(dis[(0, 1)], -2.4);
    }

    #[test]
    fn test_inverse_identity() {
        for dim in [Dim::Two, Dim::Three] {
            let model = ElasticModel::velocity(dim, 3.0, 1.5, 2.0);
            for key in ["lam-mu", "vp-vs-rho"] {
                let c = build_stiffness(&model, key).unwrap();
                let m = numeric(c.matrix());
                let inv = numeric(c.inverse().unwrap());
                let eye = DMatrix::<f64>::identity(dim.voigt_len(), dim.voigt_len());
                assert!((&inv * &m - &eye).abs().max() < 1e-12, "{key} {dim}");
            }
        }
    }

    #[test]
    fn test_indicator_derivative_3d() {
        let model = ElasticModel::new(Dim::Three).with_parameter("C12", 7.0);
        let c = build_stiffness(&model, "C-elements").unwrap();
        let d = c.derivative("dC12").unwrap();
        assert_eq!(d.shape(), (6, 6));
        assert_eq!(count_ones(&d), 1);
        assert_eq!(d[(0, 1)], Expr::one());
        assert!(d.iter().all(|e| e.is_zero() || *e == Expr::one()));
    }

    #[test]
    fn test_indicator_available_on_physical_matrix() {
        let c = build_stiffness(&ElasticModel::lame(Dim::Two, 1.0, 1.0), "lam-mu").unwrap();
        let d = c.derivative("dC33").unwrap();
        assert_eq!(count_ones(&d), 1);
        assert_eq!(d[(2, 2)], Expr::one());
        // 3D-only element is illegal in 2D
        assert!(c.derivative("dC44").is_err());
    }

    #[test]
    fn test_unknown_derivative() {
        let c = build_stiffness(&ElasticModel::new(Dim::Three), "C-elements").unwrap();
        assert_eq!(
            c.derivative("dFoo").unwrap_err(),
            Error::UnknownDerivative {
                name: "dFoo".into(),
                kind: "StiffnessMatrix".into()
            }
        );
    }

    #[test]
    fn test_legal_names() {
        let names: Vec<String> = element_derivative_names(Dim::Two);
        assert_eq!(names, vec!["dC11", "dC12", "dC21", "dC22", "dC33"]);
        assert_eq!(element_derivative_names(Dim::Three).len(), 12);

        let c = build_stiffness(&ElasticModel::lame(Dim::Two, 1.0, 1.0), "lam-mu").unwrap();
        let all: Vec<&str> = c.derivative_names().collect();
        assert!(all.contains(&"dlam"));
        assert!(all.contains(&"dC21"));
        assert_eq!(all.len(), 7);
    }

    #[test]
    fn test_indicator_derivative_free_function() {
        let d = indicator_derivative(Dim::Two, "dC21").unwrap();
        assert_eq!(d[(1, 0)], Expr::one());
        assert!(indicator_derivative(Dim::Two, "C21").is_err());
    }
}
