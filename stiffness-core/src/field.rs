//! Symbolic vector and tensor wavefields.
//!
//! Fields are thin containers of [`Expr`] components tied to an ordered set of
//! space dimensions. A tensor field is either square (`n x n`) or compact
//! (Voigt column of length `3n - 3`).

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::types::Dim;
use nalgebra::DMatrix;
use std::fmt;

/// A named spatial axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dimension {
    name: String,
}

impl Dimension {
    /// Create an axis.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Axis name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Default axes `x, y` or `x, y, z`.
pub fn space_dimensions(dim: Dim) -> Vec<Dimension> {
    ["x", "y", "z"][..dim.n()].iter().map(|&n| Dimension::new(n)).collect()
}

fn check_dims(dims: &[Dimension]) -> Result<Dim> {
    Dim::new(dims.len())
}

/// Vector-valued field (one component per space dimension).
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    name: String,
    space_dimensions: Vec<Dimension>,
    components: Vec<Expr>,
}

impl VectorField {
    /// Field with one symbolic function per axis, named `{name}_{axis}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedDimension`] unless there are 2 or 3 axes.
    pub fn new(name: impl Into<String>, space_dimensions: Vec<Dimension>) -> Result<Self> {
        let name = name.into();
        check_dims(&space_dimensions)?;
        let components = space_dimensions
            .iter()
            .map(|d| Expr::function(format!("{name}_{d}")))
            .collect();
        Ok(Self {
            name,
            space_dimensions,
            components,
        })
    }

    /// Field with explicit components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the component count differs from
    /// the number of axes.
    pub fn from_components(
        name: impl Into<String>,
        space_dimensions: Vec<Dimension>,
        components: Vec<Expr>,
    ) -> Result<Self> {
        check_dims(&space_dimensions)?;
        if components.len() != space_dimensions.len() {
            return Err(Error::ShapeMismatch(format!(
                "vector field needs {} components, got {}",
                space_dimensions.len(),
                components.len()
            )));
        }
        Ok(Self {
            name: name.into(),
            space_dimensions,
            components,
        })
    }

    /// Field with all components zero.
    pub fn zeros(name: impl Into<String>, space_dimensions: Vec<Dimension>) -> Result<Self> {
        let n = space_dimensions.len();
        Self::from_components(name, space_dimensions, vec![Expr::zero(); n])
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered spatial axes.
    pub fn space_dimensions(&self) -> &[Dimension] {
        &self.space_dimensions
    }

    /// Components in axis order.
    pub fn components(&self) -> &[Expr] {
        &self.components
    }

    /// Whether every component is the literal zero.
    pub fn is_zero(&self) -> bool {
        self.components.iter().all(Expr::is_zero)
    }
}

impl std::ops::Index<usize> for VectorField {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.components[index]
    }
}

/// Tensor-valued field, square or compact (Voigt column).
#[derive(Debug, Clone, PartialEq)]
pub struct TensorField {
    name: String,
    space_dimensions: Vec<Dimension>,
    components: DMatrix<Expr>,
}

impl TensorField {
    /// Symmetric square field with one function per independent entry,
    /// named `{name}_{ai}{aj}` with `i <= j`.
    pub fn new(name: impl Into<String>, space_dimensions: Vec<Dimension>) -> Result<Self> {
        let name = name.into();
        let dim = check_dims(&space_dimensions)?;
        let n = dim.n();
        let components = DMatrix::from_fn(n, n, |i, j| {
            let (a, b) = (i.min(j), i.max(j));
            Expr::function(format!("{name}_{}{}", space_dimensions[a], space_dimensions[b]))
        });
        Ok(Self {
            name,
            space_dimensions,
            components,
        })
    }

    /// Compact field with one function per Voigt component.
    pub fn voigt(name: impl Into<String>, space_dimensions: Vec<Dimension>) -> Result<Self> {
        let name = name.into();
        let dim = check_dims(&space_dimensions)?;
        let components = DMatrix::from_iterator(
            dim.voigt_len(),
            1,
            dim.voigt_order().iter().map(|&(a, b)| {
                Expr::function(format!("{name}_{}{}", space_dimensions[a], space_dimensions[b]))
            }),
        );
        Ok(Self {
            name,
            space_dimensions,
            components,
        })
    }

    /// Field with explicit components, square `n x n` or compact `(3n-3) x 1`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] for any other shape.
    pub fn from_matrix(
        name: impl Into<String>,
        space_dimensions: Vec<Dimension>,
        components: DMatrix<Expr>,
    ) -> Result<Self> {
        let dim = check_dims(&space_dimensions)?;
        let shape = components.shape();
        if shape != (dim.n(), dim.n()) && shape != (dim.voigt_len(), 1) {
            return Err(Error::ShapeMismatch(format!(
                "{}x{} tensor for {dim}: expected {n}x{n} or {k}x1",
                shape.0,
                shape.1,
                n = dim.n(),
                k = dim.voigt_len()
            )));
        }
        Ok(Self {
            name: name.into(),
            space_dimensions,
            components,
        })
    }

    /// Field with all entries zero.
    pub fn zeros(
        name: impl Into<String>,
        space_dimensions: Vec<Dimension>,
        compact: bool,
    ) -> Result<Self> {
        let dim = check_dims(&space_dimensions)?;
        let (r, c) = if compact {
            (dim.voigt_len(), 1)
        } else {
            (dim.n(), dim.n())
        };
        Self::from_matrix(name, space_dimensions, DMatrix::from_element(r, c, Expr::zero()))
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered spatial axes.
    pub fn space_dimensions(&self) -> &[Dimension] {
        &self.space_dimensions
    }

    /// Dimensionality implied by the axes.
    pub fn dim(&self) -> Dim {
        match self.space_dimensions.len() {
            2 => Dim::Two,
            _ => Dim::Three,
        }
    }

    /// Component matrix.
    pub fn components(&self) -> &DMatrix<Expr> {
        &self.components
    }

    /// (rows, cols).
    pub fn shape(&self) -> (usize, usize) {
        self.components.shape()
    }

    /// Whether the field is in Voigt (column) form.
    pub fn is_compact(&self) -> bool {
        self.components.nrows() != self.components.ncols()
    }

    /// Whether every entry is the literal zero.
    pub fn is_zero(&self) -> bool {
        self.components.iter().all(Expr::is_zero)
    }
}

impl std::ops::Index<(usize, usize)> for TensorField {
    type Output = Expr;

    fn index(&self, index: (usize, usize)) -> &Expr {
        &self.components[index]
    }
}

/// Linear (column-major) access, used for compact fields.
impl std::ops::Index<usize> for TensorField {
    type Output = Expr;

    fn index(&self, index: usize) -> &Expr {
        &self.components[index]
    }
}

/// A wavefield of either kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Vector(VectorField),
    Tensor(TensorField),
}

impl Field {
    /// Tensor capability flag.
    pub fn is_tensor_valued(&self) -> bool {
        matches!(self, Field::Tensor(_))
    }

    /// Vector capability flag.
    pub fn is_vector_valued(&self) -> bool {
        matches!(self, Field::Vector(_))
    }

    /// Ordered spatial axes.
    pub fn space_dimensions(&self) -> &[Dimension] {
        match self {
            Field::Vector(v) => v.space_dimensions(),
            Field::Tensor(t) => t.space_dimensions(),
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        match self {
            Field::Vector(v) => v.name(),
            Field::Tensor(t) => t.name(),
        }
    }

    /// Tensor payload, if tensor-valued.
    pub fn as_tensor(&self) -> Option<&TensorField> {
        match self {
            Field::Tensor(t) => Some(t),
            Field::Vector(_) => None,
        }
    }

    /// Vector payload, if vector-valued.
    pub fn as_vector(&self) -> Option<&VectorField> {
        match self {
            Field::Vector(v) => Some(v),
            Field::Tensor(_) => None,
        }
    }

    /// Whether every component is the literal zero.
    pub fn is_zero(&self) -> bool {
        match self {
            Field::Vector(v) => v.is_zero(),
            Field::Tensor(t) => t.is_zero(),
        }
    }
}

impl From<VectorField> for Field {
    fn from(v: VectorField) -> Self {
        Field::Vector(v)
    }
}

impl From<TensorField> for Field {
    fn from(t: TensorField) -> Self {
        Field::Tensor(t)
    }
}
