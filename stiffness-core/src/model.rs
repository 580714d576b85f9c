//! Physical model contract and a concrete elastic model.
//!
//! The stiffness factory only needs a dimensionality and named parameters,
//! expressed by the [`ElasticParameters`] trait. [`ElasticModel`] is the
//! concrete implementation used by the presets: named symbolic parameters plus,
//! optionally, per-point values on a regular grid.

use crate::error::{Error, Result};
use crate::expr::Expr;
use crate::matrix::{evaluate, SymbolicMatrix};
use crate::types::Dim;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::collections::BTreeMap;

/// What a model must expose to populate a stiffness matrix.
pub trait ElasticParameters {
    /// Spatial dimensionality.
    fn dim(&self) -> Dim;

    /// Named physical parameter (`lam`, `vp`, `C12`, ...), if the model defines it.
    fn parameter(&self, name: &str) -> Option<Expr>;
}

/// Regular grid geometry carried alongside gridded parameter values.
///
/// Only `shape` drives evaluation. The remaining fields record the preset
/// configuration for callers that build a discretization on top of the
/// model; nothing in this crate reads them.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    /// Number of points per axis.
    pub shape: Vec<usize>,
    /// Grid spacing per axis (recorded only).
    pub spacing: Vec<f64>,
    /// Coordinates of the first point (recorded only).
    pub origin: Vec<f64>,
    /// Absorbing boundary width in points (recorded only; no padding is applied).
    pub nbl: usize,
    /// Spatial discretization order for downstream stencils (recorded only).
    pub space_order: usize,
}

impl Grid {
    /// Total number of points.
    pub fn n_points(&self) -> usize {
        self.shape.iter().product()
    }
}

/// Elastic model with named parameters.
#[derive(Debug, Clone)]
pub struct ElasticModel {
    dim: Dim,
    parameters: BTreeMap<String, Expr>,
    grid: Option<Grid>,
    /// Per-point values, row-major over `grid.shape`.
    values: BTreeMap<String, Vec<f64>>,
}

impl ElasticModel {
    /// Create an empty model.
    pub fn new(dim: Dim) -> Self {
        Self {
            dim,
            parameters: BTreeMap::new(),
            grid: None,
            values: BTreeMap::new(),
        }
    }

    /// Set a named parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Isotropic model with numeric Lamé parameters.
    pub fn lame(dim: Dim, lam: f64, mu: f64) -> Self {
        Self::new(dim).with_parameter("lam", lam).with_parameter("mu", mu)
    }

    /// Isotropic model with numeric wave speeds and density.
    ///
    /// Derived `lam`, `mu`, `Ip` and `Is` are exposed as well so every
    /// parameterization can be built from the same model.
    pub fn velocity(dim: Dim, vp: f64, vs: f64, rho: f64) -> Self {
        Self::new(dim)
            .with_parameter("vp", vp)
            .with_parameter("vs", vs)
            .with_parameter("rho", rho)
            .with_parameter("lam", rho * (vp * vp - 2.0 * vs * vs))
            .with_parameter("mu", rho * vs * vs)
            .with_parameter("Ip", rho * vp)
            .with_parameter("Is", rho * vs)
    }

    /// Model whose `vp`, `vs` and `rho` vary in space, with the derived
    /// `lam`, `mu`, `Ip` and `Is` expressed through them.
    pub fn velocity_functions(dim: Dim) -> Self {
        let vp = Expr::function("vp");
        let vs = Expr::function("vs");
        let rho = Expr::function("rho");
        Self::new(dim)
            .with_parameter("lam", &rho * (&vp * &vp - 2.0 * &vs * &vs))
            .with_parameter("mu", &rho * &vs * &vs)
            .with_parameter("Ip", &rho * &vp)
            .with_parameter("Is", &rho * &vs)
            .with_parameter("vp", vp)
            .with_parameter("vs", vs)
            .with_parameter("rho", rho)
    }

    /// Attach gridded values for the model's functions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ShapeMismatch`] if the grid rank differs from the
    /// model dimensionality or a value array has the wrong length.
    pub fn with_grid(mut self, grid: Grid, values: BTreeMap<String, Vec<f64>>) -> Result<Self> {
        if grid.shape.len() != self.dim.n() {
            return Err(Error::ShapeMismatch(format!(
                "{}-dimensional grid for a {} model",
                grid.shape.len(),
                self.dim
            )));
        }
        let n = grid.n_points();
        if let Some((name, v)) = values.iter().find(|(_, v)| v.len() != n) {
            return Err(Error::ShapeMismatch(format!(
                "'{name}' has {} values, grid has {n} points",
                v.len()
            )));
        }
        self.grid = Some(grid);
        self.values = values;
        Ok(self)
    }

    /// Grid geometry, if the model is gridded.
    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    /// Gridded values of one function.
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.values.get(name).map(Vec::as_slice)
    }

    /// Value bindings at one grid point.
    pub fn bindings_at(&self, point: usize) -> BTreeMap<String, f64> {
        self.values
            .iter()
            .filter_map(|(name, v)| v.get(point).map(|x| (name.clone(), *x)))
            .collect()
    }

    /// Evaluate a symbolic matrix at every grid point.
    ///
    /// Points are evaluated in parallel; the result is in row-major point order.
    ///
    /// # Errors
    ///
    /// - [`Error::ShapeMismatch`] if the model has no grid
    /// - any evaluation error from an entry (e.g. an unbound symbol)
    pub fn evaluate(&self, matrix: &SymbolicMatrix) -> Result<Vec<DMatrix<f64>>> {
        let grid = self
            .grid
            .as_ref()
            .ok_or_else(|| Error::ShapeMismatch("model has no grid values".into()))?;

        (0..grid.n_points())
            .into_par_iter()
            .map(|point| evaluate(matrix, &self.bindings_at(point)))
            .collect()
    }
}

impl ElasticParameters for ElasticModel {
    fn dim(&self) -> Dim {
        self.dim
    }

    fn parameter(&self, name: &str) -> Option<Expr> {
        self.parameters.get(name).cloned()
    }
}
